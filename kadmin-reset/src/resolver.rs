// Copyright ⓒ 2025 Peter Morgan <peter.james.morgan@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use kadmin_cluster::{ClusterMetadata, ClusterOffsets, Topition};
use tracing::{debug, instrument};

use crate::{Error, OffsetSpec, Result};

/// Resolves an [`OffsetSpec`] into a concrete offset for each topition.
#[derive(Clone, Debug)]
pub struct Resolver<C> {
    cluster: C,
}

impl<C> Resolver<C>
where
    C: ClusterMetadata + ClusterOffsets,
{
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    /// Resolve every topition, in order.
    ///
    /// An absolute offset is used as is, without consulting the cluster. A
    /// timestamp with no record at or after it resolves to the log end.
    #[instrument(skip_all, fields(spec = %spec, topitions = topitions.len()))]
    pub async fn resolve(
        &self,
        topitions: &[Topition],
        spec: OffsetSpec,
    ) -> Result<Vec<(Topition, i64)>> {
        let mut resolved = Vec::with_capacity(topitions.len());

        for topition in topitions {
            let offset = self
                .offset(topition, spec)
                .await
                .inspect(|offset| debug!(%topition, offset))?;

            resolved.push((topition.to_owned(), offset));
        }

        Ok(resolved)
    }

    async fn offset(&self, topition: &Topition, spec: OffsetSpec) -> Result<i64> {
        let offset = match spec {
            OffsetSpec::Earliest => self.cluster.log_start(topition).await,

            OffsetSpec::Latest => self.cluster.log_end(topition).await,

            OffsetSpec::Absolute(offset) => return Ok(offset),

            OffsetSpec::Timestamp(timestamp) => {
                match self
                    .cluster
                    .offset_for_timestamp(topition, timestamp)
                    .await
                {
                    Ok(Some(offset)) => Ok(offset),
                    Ok(None) => self.cluster.log_end(topition).await,
                    Err(error) => Err(error),
                }
            }
        };

        match offset {
            Err(kadmin_cluster::Error::UnknownTopicOrPartition(_)) => {
                Err(self.absent(topition).await)
            }

            otherwise => otherwise.map_err(Into::into),
        }
    }

    /// Explain a topition the cluster does not recognise.
    async fn absent(&self, topition: &Topition) -> Error {
        match self.cluster.partitions(topition.topic()).await {
            Ok(partitions) => Error::InvalidPartition {
                topic: topition.topic().into(),
                partition: topition.partition(),
                count: partitions.len(),
            },

            Err(error) => error.into(),
        }
    }
}
