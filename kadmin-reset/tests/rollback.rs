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

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use crate::common::{Error, consumed, engine, init_tracing, produce, topic, unique};
use kadmin_cluster::{
    ClusterMetadata, ClusterOffsets, CommitStatus, ConsumerGroup, GroupMembership, GroupOffsets,
    Result, Topic, Topition, memory::Engine,
};
use kadmin_reset::{OffsetSpec, PartitionTarget, Reset};
use pretty_assertions::assert_eq;

mod common;

/// Rejects every commit to one topition, delegating everything else.
#[derive(Clone, Debug)]
struct Rejecting {
    engine: Engine,
    rejected: Topition,
}

#[async_trait]
impl ClusterMetadata for Rejecting {
    async fn topic(&self, name: &str) -> Result<Option<Topic>> {
        self.engine.topic(name).await
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        self.engine.partitions(topic).await
    }

    async fn topics(&self) -> Result<Vec<Topic>> {
        self.engine.topics().await
    }
}

#[async_trait]
impl ClusterOffsets for Rejecting {
    async fn log_start(&self, topition: &Topition) -> Result<i64> {
        self.engine.log_start(topition).await
    }

    async fn log_end(&self, topition: &Topition) -> Result<i64> {
        self.engine.log_end(topition).await
    }

    async fn offset_for_timestamp(
        &self,
        topition: &Topition,
        timestamp: SystemTime,
    ) -> Result<Option<i64>> {
        self.engine.offset_for_timestamp(topition, timestamp).await
    }
}

#[async_trait]
impl GroupMembership for Rejecting {
    async fn has_active_members(&self, group_id: &str) -> Result<bool> {
        self.engine.has_active_members(group_id).await
    }

    async fn groups(&self) -> Result<Vec<ConsumerGroup>> {
        self.engine.groups().await
    }
}

#[async_trait]
impl GroupOffsets for Rejecting {
    async fn commit(
        &self,
        group_id: &str,
        offsets: &[(Topition, i64)],
    ) -> Result<Vec<(Topition, CommitStatus)>> {
        let (rejected, accepted): (Vec<_>, Vec<_>) = offsets
            .iter()
            .cloned()
            .partition(|(topition, _)| *topition == self.rejected);

        let mut statuses = self.engine.commit(group_id, &accepted).await?;

        statuses.extend(rejected.into_iter().map(|(topition, _)| {
            (
                topition,
                CommitStatus::Rejected("not the leader for this partition".into()),
            )
        }));

        Ok(statuses)
    }

    async fn committed(
        &self,
        group_id: &str,
        topitions: &[Topition],
    ) -> Result<BTreeMap<Topition, i64>> {
        self.engine.committed(group_id, topitions).await
    }

    async fn delete(&self, group_id: &str, topitions: &[Topition]) -> Result<()> {
        self.engine.delete(group_id, topitions).await
    }
}

#[tokio::test]
async fn rejected_commit_restores_previous_offsets() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let engine = engine().await?;
    let topic = topic(&engine, 3)?;
    let group_id = unique("group");

    let topitions = (0..3)
        .map(|partition| Topition::new(topic.as_str(), partition))
        .collect::<Vec<_>>();

    for topition in &topitions {
        produce(
            &engine,
            topition,
            5,
            SystemTime::now() - Duration::from_secs(60),
        )?;
    }

    _ = engine
        .commit(&group_id, &[(topitions[0].clone(), 2)])
        .await?;

    let cluster = Rejecting {
        engine: engine.clone(),
        rejected: topitions[2].clone(),
    };

    let error = Reset::new(cluster)
        .reset_consumer_group_offsets(
            &group_id,
            OffsetSpec::Absolute(1),
            &[PartitionTarget::new(topic.as_str(), None)],
        )
        .await
        .expect_err("partial failure");

    assert!(matches!(
        error,
        kadmin_reset::Error::PartialApplyFailure { ref failed, .. }
            if failed == &[topitions[2].clone()]
    ));
    assert!(!error.is_client_error());

    let committed = engine.committed(&group_id, &topitions).await?;
    assert_eq!(BTreeMap::from([(topitions[0].clone(), 2)]), committed);

    Ok(())
}

#[tokio::test]
async fn accepted_commits_are_kept() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let engine = engine().await?;
    let topic = topic(&engine, 2)?;
    let other = unique("other");
    engine.create_topic(&other, 1, vec![])?;

    let group_id = unique("group");

    let cluster = Rejecting {
        engine: engine.clone(),
        rejected: Topition::new(other.as_str(), 0),
    };

    let results = Reset::new(cluster)
        .reset_consumer_group_offsets(
            &group_id,
            OffsetSpec::Absolute(0),
            &[PartitionTarget::new(topic.as_str(), None)],
        )
        .await?;

    assert_eq!(2, results.len());
    assert_eq!(
        2,
        engine
            .committed(
                &group_id,
                &[
                    Topition::new(topic.as_str(), 0),
                    Topition::new(topic.as_str(), 1)
                ]
            )
            .await?
            .len()
    );

    Ok(())
}

/// The first commit lands only its first offset before failing with `error`.
#[derive(Clone, Debug)]
struct Interrupted {
    engine: Engine,
    error: kadmin_cluster::Error,
    interrupted: Arc<AtomicBool>,
}

impl Interrupted {
    fn new(engine: Engine, error: kadmin_cluster::Error) -> Self {
        Self {
            engine,
            error,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl ClusterMetadata for Interrupted {
    async fn topic(&self, name: &str) -> Result<Option<Topic>> {
        self.engine.topic(name).await
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        self.engine.partitions(topic).await
    }

    async fn topics(&self) -> Result<Vec<Topic>> {
        self.engine.topics().await
    }
}

#[async_trait]
impl ClusterOffsets for Interrupted {
    async fn log_start(&self, topition: &Topition) -> Result<i64> {
        self.engine.log_start(topition).await
    }

    async fn log_end(&self, topition: &Topition) -> Result<i64> {
        self.engine.log_end(topition).await
    }

    async fn offset_for_timestamp(
        &self,
        topition: &Topition,
        timestamp: SystemTime,
    ) -> Result<Option<i64>> {
        self.engine.offset_for_timestamp(topition, timestamp).await
    }
}

#[async_trait]
impl GroupMembership for Interrupted {
    async fn has_active_members(&self, group_id: &str) -> Result<bool> {
        self.engine.has_active_members(group_id).await
    }

    async fn groups(&self) -> Result<Vec<ConsumerGroup>> {
        self.engine.groups().await
    }
}

#[async_trait]
impl GroupOffsets for Interrupted {
    async fn commit(
        &self,
        group_id: &str,
        offsets: &[(Topition, i64)],
    ) -> Result<Vec<(Topition, CommitStatus)>> {
        if self.interrupted.swap(true, Ordering::SeqCst) {
            return self.engine.commit(group_id, offsets).await;
        }

        _ = self
            .engine
            .commit(group_id, &offsets[..offsets.len().min(1)])
            .await?;

        Err(self.error.clone())
    }

    async fn committed(
        &self,
        group_id: &str,
        topitions: &[Topition],
    ) -> Result<BTreeMap<Topition, i64>> {
        self.engine.committed(group_id, topitions).await
    }

    async fn delete(&self, group_id: &str, topitions: &[Topition]) -> Result<()> {
        self.engine.delete(group_id, topitions).await
    }
}

#[tokio::test]
async fn failed_commit_restores_every_target() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let engine = engine().await?;
    let (group_id, topitions) = consumed(&engine)?;

    let cluster = Interrupted::new(
        engine.clone(),
        kadmin_cluster::Error::Message("connection reset mid commit".into()),
    );

    let error = Reset::new(cluster)
        .reset_consumer_group_offsets(
            &group_id,
            OffsetSpec::Absolute(1),
            &[PartitionTarget::new(topitions[0].topic(), None)],
        )
        .await
        .expect_err("interrupted commit");

    assert!(matches!(
        error,
        kadmin_reset::Error::PartialApplyFailure { ref failed, .. }
            if failed == &topitions
    ));
    assert!(!error.is_client_error());
    assert!(!error.is_retryable());

    assert_eq!(
        BTreeMap::from([(topitions[0].clone(), 5), (topitions[1].clone(), 5)]),
        engine.committed(&group_id, &topitions).await?
    );

    Ok(())
}

#[tokio::test]
async fn unavailable_during_commit_restores_every_target() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let engine = engine().await?;
    let (group_id, topitions) = consumed(&engine)?;

    let cluster = Interrupted::new(
        engine.clone(),
        kadmin_cluster::Error::Unavailable("leader election in progress".into()),
    );

    let error = Reset::new(cluster)
        .reset_consumer_group_offsets(
            &group_id,
            OffsetSpec::Earliest,
            &[PartitionTarget::new(topitions[0].topic(), None)],
        )
        .await
        .expect_err("unavailable");

    assert!(matches!(
        error,
        kadmin_reset::Error::ClusterUnavailable(kadmin_cluster::Error::Unavailable(_))
    ));
    assert!(error.is_retryable());

    assert_eq!(
        BTreeMap::from([(topitions[0].clone(), 5), (topitions[1].clone(), 5)]),
        engine.committed(&group_id, &topitions).await?
    );

    Ok(())
}
