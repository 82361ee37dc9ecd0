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

use std::collections::BTreeMap;

use kadmin_cluster::{Cluster, CommitStatus, Topition};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::{
    Error, OffsetSpec, PartitionTarget, ResetRequest, ResetResult, Resolver, Result, Validator,
};

/// Resets the committed offsets of a consumer group.
///
/// Nothing is mutated until every target has been validated and resolved.
/// The resolved offsets are then committed together, and should the cluster
/// reject any of them, the offsets that were committed are restored. When the
/// commit itself fails, every targeted offset is restored.
#[derive(Clone, Debug)]
pub struct Reset<C> {
    validator: Validator<C>,
    resolver: Resolver<C>,
    cluster: C,
    cancellation: CancellationToken,
}

impl<C> Reset<C>
where
    C: Cluster,
{
    pub fn new(cluster: C) -> Self {
        Self {
            validator: Validator::new(cluster.clone()),
            resolver: Resolver::new(cluster.clone()),
            cluster,
            cancellation: CancellationToken::new(),
        }
    }

    /// Abandon the reset when `cancellation` fires before offsets are committed.
    pub fn cancellation(self, cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            ..self
        }
    }

    /// Reset from a wire request.
    pub async fn reset(&self, group_id: &str, request: &ResetRequest) -> Result<Vec<ResetResult>> {
        let spec = OffsetSpec::try_from(request)?;
        self.reset_consumer_group_offsets(group_id, spec, &request.topics)
            .await
    }

    #[instrument(skip_all, fields(group_id = group_id, spec = %spec))]
    pub async fn reset_consumer_group_offsets(
        &self,
        group_id: &str,
        spec: OffsetSpec,
        targets: &[PartitionTarget],
    ) -> Result<Vec<ResetResult>> {
        debug!(?targets);

        let resolved = tokio::select! {
            biased;

            () = self.cancellation.cancelled() => Err(Error::Cancelled),

            resolved = self.prepare(group_id, spec, targets) => resolved,
        }?;

        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.validator.inactive(group_id).await?;

        self.apply(group_id, &resolved).await.map(|()| {
            resolved
                .iter()
                .map(|(topition, offset)| ResetResult::new(topition, *offset))
                .collect()
        })
    }

    async fn prepare(
        &self,
        group_id: &str,
        spec: OffsetSpec,
        targets: &[PartitionTarget],
    ) -> Result<Vec<(Topition, i64)>> {
        let topitions = self.validator.validate(group_id, targets).await?;
        self.resolver.resolve(&topitions, spec).await
    }

    async fn apply(&self, group_id: &str, resolved: &[(Topition, i64)]) -> Result<()> {
        let topitions = resolved
            .iter()
            .map(|(topition, _)| topition.to_owned())
            .collect::<Vec<_>>();

        let previous = self.cluster.committed(group_id, &topitions).await?;
        debug!(?previous);

        let statuses = match self.cluster.commit(group_id, resolved).await {
            Ok(statuses) => statuses,

            Err(error) => {
                // how much of the commit landed is unknown
                error!(group_id, %error, "commit");
                self.restore(group_id, &previous, topitions.iter().cloned())
                    .await;

                return Err(if error.is_retryable() {
                    Error::ClusterUnavailable(error)
                } else {
                    Error::PartialApplyFailure {
                        group_id: group_id.into(),
                        failed: topitions,
                    }
                });
            }
        };

        let (committed, rejected): (Vec<_>, Vec<_>) = statuses
            .into_iter()
            .partition(|(_, status)| status.is_committed());

        if rejected.is_empty() {
            return Ok(());
        }

        for (topition, status) in &rejected {
            if let CommitStatus::Rejected(reason) = status {
                error!(group_id, %topition, reason);
            }
        }

        self.restore(
            group_id,
            &previous,
            committed.into_iter().map(|(topition, _)| topition),
        )
        .await;

        Err(Error::PartialApplyFailure {
            group_id: group_id.into(),
            failed: rejected.into_iter().map(|(topition, _)| topition).collect(),
        })
    }

    /// Put back the offsets that were in place before a failed commit.
    async fn restore(
        &self,
        group_id: &str,
        previous: &BTreeMap<Topition, i64>,
        committed: impl Iterator<Item = Topition>,
    ) {
        let (recommit, delete): (Vec<_>, Vec<_>) = committed
            .map(|topition| {
                let offset = previous.get(&topition).copied();
                (topition, offset)
            })
            .partition(|(_, offset)| offset.is_some());

        let recommit = recommit
            .into_iter()
            .filter_map(|(topition, offset)| offset.map(|offset| (topition, offset)))
            .collect::<Vec<_>>();

        let delete = delete
            .into_iter()
            .map(|(topition, _)| topition)
            .collect::<Vec<_>>();

        debug!(?recommit, ?delete);

        if !recommit.is_empty() {
            match self.cluster.commit(group_id, &recommit).await {
                Ok(statuses) => {
                    for (topition, status) in statuses {
                        if let CommitStatus::Rejected(reason) = status {
                            warn!(group_id, %topition, reason, "restore");
                        }
                    }
                }

                Err(err) => error!(group_id, ?err, "restore"),
            }
        }

        if !delete.is_empty() {
            if let Err(err) = self.cluster.delete(group_id, &delete).await {
                error!(group_id, ?err, "restore");
            }
        }
    }
}
