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

use std::collections::BTreeSet;

use kadmin_cluster::{ClusterMetadata, GroupMembership, Topic, Topition};
use tracing::{debug, instrument};

use crate::{Error, PartitionTarget, Result};

/// Checks a reset request against the cluster before anything is mutated.
#[derive(Clone, Debug)]
pub struct Validator<C> {
    cluster: C,
}

impl<C> Validator<C>
where
    C: ClusterMetadata + GroupMembership,
{
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    /// Validate the targets of a reset, returning the topitions to reset.
    ///
    /// Every topic must exist before any partition is checked. Explicit
    /// partitions must be within the partition count of their topic, a
    /// target without partitions, or with an empty list of partitions,
    /// expands to every partition. Topitions are
    /// in target order then ascending partition, each appearing once.
    /// Finally the group must have no connected clients.
    #[instrument(skip_all, fields(group_id = group_id, targets = targets.len()))]
    pub async fn validate(
        &self,
        group_id: &str,
        targets: &[PartitionTarget],
    ) -> Result<Vec<Topition>> {
        if targets.is_empty() {
            return Err(Error::NoTargets);
        }

        let mut topics = Vec::with_capacity(targets.len());

        for target in targets {
            let topic = self
                .cluster
                .topic(&target.topic)
                .await?
                .ok_or_else(|| Error::UnknownTopic(target.topic.clone()))?;

            topics.push(topic);
        }

        let mut seen = BTreeSet::new();
        let mut topitions = vec![];

        for (target, topic) in targets.iter().zip(topics.iter()) {
            for partition in Self::partitions(target, topic)? {
                let topition = Topition::new(topic.name.as_str(), partition);

                if seen.insert(topition.clone()) {
                    topitions.push(topition);
                }
            }
        }

        self.inactive(group_id).await?;

        debug!(?topitions);
        Ok(topitions)
    }

    /// Fail when the group has connected clients.
    pub async fn inactive(&self, group_id: &str) -> Result<()> {
        if self.cluster.has_active_members(group_id).await? {
            Err(Error::GroupHasActiveMembers(group_id.into()))
        } else {
            Ok(())
        }
    }

    fn partitions(target: &PartitionTarget, topic: &Topic) -> Result<Vec<i32>> {
        let count = topic.partitions.len();

        let Some(requested) = target
            .partitions
            .as_ref()
            .filter(|partitions| !partitions.is_empty())
        else {
            let mut partitions = topic.partitions.clone();
            partitions.sort_unstable();
            return Ok(partitions);
        };

        let mut partitions = requested.clone();
        partitions.sort_unstable();
        partitions.dedup();

        if let Some(partition) = partitions
            .iter()
            .copied()
            .find(|partition| {
                usize::try_from(*partition)
                    .ok()
                    .is_none_or(|index| index >= count)
            })
        {
            return Err(Error::InvalidPartition {
                topic: topic.name.clone(),
                partition,
                count,
            });
        }

        Ok(partitions)
    }
}
