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

//! An in-memory cluster.
//!
//! Selected with a `memory://` URL. A `file:///path/cluster.json` URL loads
//! the cluster from a JSON snapshot, which [`Engine::persist`] writes back.

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    marker::PhantomData,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    ClusterMetadata, ClusterOffsets, CommitStatus, ConfigEntry, ConsumerGroup, Error,
    GroupMembership, GroupOffsets, GroupState, Result, Topic, Topition, TopitionOffset,
};

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
struct PartitionLog {
    log_start: i64,

    // record timestamps from log_start onwards
    timestamps: Vec<SystemTime>,
}

impl PartitionLog {
    fn log_end(&self) -> i64 {
        self.log_start + self.timestamps.len() as i64
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
struct TopicLog {
    configs: Vec<ConfigEntry>,
    partitions: Vec<PartitionLog>,
}

impl TopicLog {
    fn topic(&self, name: &str) -> Topic {
        Topic::default()
            .name(name)
            .partitions((0..).take(self.partitions.len()).collect())
            .configs(self.configs.clone())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
struct Group {
    members: BTreeSet<String>,
    offsets: BTreeMap<String, BTreeMap<i32, i64>>,
}

impl Group {
    fn consumer_group(&self, group_id: &str) -> ConsumerGroup {
        ConsumerGroup::default()
            .group_id(Some(group_id.into()))
            .state(if self.members.is_empty() {
                GroupState::Empty
            } else {
                GroupState::Stable
            })
            .members(self.members.iter().cloned().collect())
            .offsets(
                self.offsets
                    .iter()
                    .flat_map(|(topic, partitions)| {
                        partitions.iter().map(|(partition, offset)| {
                            TopitionOffset::new(Topition::new(topic.as_str(), *partition), *offset)
                        })
                    })
                    .collect(),
            )
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
struct State {
    topics: BTreeMap<String, TopicLog>,
    groups: BTreeMap<String, Group>,
}

impl State {
    fn partition(&self, topition: &Topition) -> Result<&PartitionLog> {
        self.topics
            .get(topition.topic())
            .zip(usize::try_from(topition.partition()).ok())
            .and_then(|(topic, partition)| topic.partitions.get(partition))
            .ok_or_else(|| Error::UnknownTopicOrPartition(topition.to_owned()))
    }

    fn partition_mut(&mut self, topition: &Topition) -> Result<&mut PartitionLog> {
        self.topics
            .get_mut(topition.topic())
            .zip(usize::try_from(topition.partition()).ok())
            .and_then(|(topic, partition)| topic.partitions.get_mut(partition))
            .ok_or_else(|| Error::UnknownTopicOrPartition(topition.to_owned()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Engine {
    state: Arc<Mutex<State>>,
    snapshot: Option<PathBuf>,
}

impl Engine {
    pub fn builder() -> Builder<PhantomData<Url>> {
        Builder::default()
    }

    pub fn create_topic(&self, name: &str, partitions: i32, configs: Vec<ConfigEntry>) -> Result<()> {
        debug!(name, partitions, ?configs);

        let partitions = usize::try_from(partitions)
            .ok()
            .filter(|partitions| *partitions > 0)
            .ok_or_else(|| Error::Message(format!("invalid partition count: {partitions}")))?;

        self.state.lock().map_err(Into::into).and_then(|mut state| {
            if state.topics.contains_key(name) {
                Err(Error::Message(format!("topic already exists: {name}")))
            } else {
                _ = state.topics.insert(
                    name.into(),
                    TopicLog {
                        configs,
                        partitions: vec![PartitionLog::default(); partitions],
                    },
                );
                Ok(())
            }
        })
    }

    /// Append a record, returning its offset.
    pub fn produce(&self, topition: &Topition, timestamp: SystemTime) -> Result<i64> {
        self.state.lock().map_err(Into::into).and_then(|mut state| {
            state.partition_mut(topition).map(|log| {
                let offset = log.log_end();
                log.timestamps.push(timestamp);
                offset
            })
        })
    }

    /// Discard records before `offset`, returning the new log start.
    pub fn truncate(&self, topition: &Topition, offset: i64) -> Result<i64> {
        self.state.lock().map_err(Into::into).and_then(|mut state| {
            state.partition_mut(topition).map(|log| {
                let log_start = offset.clamp(log.log_start, log.log_end());
                _ = log
                    .timestamps
                    .drain(..(log_start - log.log_start) as usize);
                log.log_start = log_start;
                log_start
            })
        })
    }

    pub fn join(&self, group_id: &str, member_id: &str) -> Result<()> {
        debug!(group_id, member_id);

        self.state.lock().map_err(Into::into).map(|mut state| {
            _ = state
                .groups
                .entry(group_id.into())
                .or_default()
                .members
                .insert(member_id.into());
        })
    }

    pub fn leave(&self, group_id: &str, member_id: &str) -> Result<bool> {
        debug!(group_id, member_id);

        self.state.lock().map_err(Into::into).map(|mut state| {
            state
                .groups
                .get_mut(group_id)
                .is_some_and(|group| group.members.remove(member_id))
        })
    }

    /// Read every partition of a topic from the committed offset of the group
    /// to the log end, committing the log end. A missing or out of range
    /// committed offset starts from the log start. Returns the number of
    /// records read.
    pub fn consume(&self, group_id: &str, topic: &str) -> Result<i64> {
        self.state.lock().map_err(Into::into).and_then(|mut state| {
            let bounds = state
                .topics
                .get(topic)
                .map(|log| {
                    (0..)
                        .zip(log.partitions.iter())
                        .map(|(partition, log)| (partition, log.log_start, log.log_end()))
                        .collect::<Vec<(i32, i64, i64)>>()
                })
                .ok_or_else(|| Error::UnknownTopic(topic.into()))?;

            let offsets = state
                .groups
                .entry(group_id.into())
                .or_default()
                .offsets
                .entry(topic.into())
                .or_default();

            let mut records = 0;

            for (partition, log_start, log_end) in bounds {
                let position = offsets
                    .get(&partition)
                    .copied()
                    .filter(|offset| (log_start..=log_end).contains(offset))
                    .unwrap_or(log_start);

                records += log_end - position;
                _ = offsets.insert(partition, log_end);
            }

            debug!(group_id, topic, records);
            Ok(records)
        })
    }

    /// Write the cluster to its snapshot file, when it has one.
    pub async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.snapshot else {
            return Ok(());
        };

        let contents = self
            .state
            .lock()
            .map_err(Error::from)
            .and_then(|state| serde_json::to_vec_pretty(&*state).map_err(Error::from))?;

        fs::write(path, contents)
            .await
            .inspect(|_| debug!(?path))
            .map_err(Into::into)
    }
}

/// An [`Engine`] builder
#[derive(Clone, Debug, Default)]
pub struct Builder<S> {
    storage: S,
}

impl<S> Builder<S> {
    pub fn storage(self, storage: Url) -> Builder<Url> {
        debug!(%storage);
        Builder { storage }
    }
}

impl Builder<Url> {
    pub async fn build(self) -> Result<Engine> {
        match self.storage.scheme() {
            "memory" => Ok(Engine::default()),

            "file" => {
                let path = self
                    .storage
                    .to_file_path()
                    .map_err(|()| Error::UnsupportedStorageUrl(self.storage.clone()))?;

                let state = match fs::read(&path).await {
                    Ok(contents) => serde_json::from_slice(&contents)?,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => State::default(),
                    Err(err) => return Err(err.into()),
                };

                Ok(Engine {
                    state: Arc::new(Mutex::new(state)),
                    snapshot: Some(path),
                })
            }

            _unsupported => Err(Error::UnsupportedStorageUrl(self.storage.clone())),
        }
    }
}

#[async_trait]
impl ClusterMetadata for Engine {
    #[instrument(skip_all)]
    async fn topic(&self, name: &str) -> Result<Option<Topic>> {
        self.state
            .lock()
            .map_err(Into::into)
            .map(|state| state.topics.get(name).map(|log| log.topic(name)))
    }

    #[instrument(skip_all)]
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        self.state.lock().map_err(Into::into).and_then(|state| {
            state
                .topics
                .get(topic)
                .map(|log| log.topic(topic).partitions)
                .ok_or_else(|| Error::UnknownTopic(topic.into()))
        })
    }

    #[instrument(skip_all)]
    async fn topics(&self) -> Result<Vec<Topic>> {
        self.state.lock().map_err(Into::into).map(|state| {
            state
                .topics
                .iter()
                .map(|(name, log)| log.topic(name))
                .collect()
        })
    }
}

#[async_trait]
impl ClusterOffsets for Engine {
    #[instrument(skip_all)]
    async fn log_start(&self, topition: &Topition) -> Result<i64> {
        self.state
            .lock()
            .map_err(Into::into)
            .and_then(|state| state.partition(topition).map(|log| log.log_start))
    }

    #[instrument(skip_all)]
    async fn log_end(&self, topition: &Topition) -> Result<i64> {
        self.state
            .lock()
            .map_err(Into::into)
            .and_then(|state| state.partition(topition).map(PartitionLog::log_end))
    }

    #[instrument(skip_all)]
    async fn offset_for_timestamp(
        &self,
        topition: &Topition,
        timestamp: SystemTime,
    ) -> Result<Option<i64>> {
        self.state.lock().map_err(Into::into).and_then(|state| {
            state.partition(topition).map(|log| {
                log.timestamps
                    .iter()
                    .position(|produced| *produced >= timestamp)
                    .map(|position| log.log_start + position as i64)
            })
        })
    }
}

#[async_trait]
impl GroupMembership for Engine {
    #[instrument(skip_all)]
    async fn has_active_members(&self, group_id: &str) -> Result<bool> {
        self.state.lock().map_err(Into::into).map(|state| {
            state
                .groups
                .get(group_id)
                .is_some_and(|group| !group.members.is_empty())
        })
    }

    #[instrument(skip_all)]
    async fn groups(&self) -> Result<Vec<ConsumerGroup>> {
        self.state.lock().map_err(Into::into).map(|state| {
            state
                .groups
                .iter()
                .map(|(group_id, group)| group.consumer_group(group_id))
                .collect()
        })
    }
}

#[async_trait]
impl GroupOffsets for Engine {
    #[instrument(skip_all)]
    async fn commit(
        &self,
        group_id: &str,
        offsets: &[(Topition, i64)],
    ) -> Result<Vec<(Topition, CommitStatus)>> {
        debug!(group_id, ?offsets);

        self.state.lock().map_err(Into::into).map(|mut state| {
            let mut responses = vec![];

            for (topition, offset) in offsets {
                if let Err(error) = state.partition(topition) {
                    responses.push((topition.to_owned(), CommitStatus::Rejected(error.to_string())));
                    continue;
                }

                _ = state
                    .groups
                    .entry(group_id.into())
                    .or_default()
                    .offsets
                    .entry(topition.topic().into())
                    .or_default()
                    .insert(topition.partition(), *offset);

                responses.push((topition.to_owned(), CommitStatus::Committed));
            }

            responses
        })
    }

    #[instrument(skip_all)]
    async fn committed(
        &self,
        group_id: &str,
        topitions: &[Topition],
    ) -> Result<BTreeMap<Topition, i64>> {
        self.state.lock().map_err(Into::into).map(|state| {
            state
                .groups
                .get(group_id)
                .map(|group| {
                    topitions
                        .iter()
                        .filter_map(|topition| {
                            group
                                .offsets
                                .get(topition.topic())
                                .and_then(|partitions| partitions.get(&topition.partition()))
                                .map(|offset| (topition.to_owned(), *offset))
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    #[instrument(skip_all)]
    async fn delete(&self, group_id: &str, topitions: &[Topition]) -> Result<()> {
        debug!(group_id, ?topitions);

        self.state.lock().map_err(Into::into).map(|mut state| {
            if let Some(group) = state.groups.get_mut(group_id) {
                for topition in topitions {
                    if let Some(partitions) = group.offsets.get_mut(topition.topic()) {
                        _ = partitions.remove(&topition.partition());

                        if partitions.is_empty() {
                            _ = group.offsets.remove(topition.topic());
                        }
                    }
                }
            }
        })
    }
}
