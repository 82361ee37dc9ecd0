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
//
//! Cluster Abstraction
//!
//! The administration operations consume a cluster through four narrow
//! traits: [`ClusterMetadata`], [`ClusterOffsets`], [`GroupMembership`] and
//! [`GroupOffsets`]. Anything implementing all four is a [`Cluster`].
//!
//! [`memory::Engine`] is an in-memory cluster, optionally backed by a JSON
//! snapshot file. [`Bounded`] wraps any cluster with a per call timeout and
//! a bounded retry of transient failures.
//!
//! ```
//! # use kadmin_cluster::{Bounded, ClusterMetadata, Error, memory::Engine};
//! # use std::time::Duration;
//! # use url::Url;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let engine = Engine::builder()
//!     .storage(Url::parse("memory://kadmin/")?)
//!     .build()
//!     .await?;
//!
//! engine.create_topic("abc", 3, vec![])?;
//!
//! let cluster = Bounded::new(engine)
//!     .timeout(Duration::from_secs(5))
//!     .retries(3);
//!
//! assert_eq!(vec![0, 1, 2], cluster.partitions("abc").await?);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
    io, result,
    sync::{Arc, PoisonError},
    time::{Duration, SystemTime},
};
use url::Url;

mod bounded;
pub mod memory;

pub use bounded::Bounded;

/// Cluster Errors
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    Io(Arc<io::Error>),
    Message(String),
    Poison,
    SerdeJson(Arc<serde_json::Error>),
    Timeout(Duration),
    Unavailable(String),
    UnknownTopic(String),
    UnknownTopicOrPartition(Topition),
    UnsupportedStorageUrl(Url),
    Url(#[from] url::ParseError),
}

impl Error {
    /// Timeouts and connection failures may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Timeout(timeout) => write!(f, "cluster call timed out after {timeout:?}"),
            Self::Unavailable(reason) => write!(f, "cluster unavailable: {reason}"),
            Self::UnknownTopic(topic) => write!(f, "unknown topic: {topic}"),
            Self::UnknownTopicOrPartition(topition) => {
                write!(f, "unknown topic or partition: {topition}")
            }
            error => write!(f, "{error:?}"),
        }
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_value: PoisonError<T>) -> Self {
        Self::Poison
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::SerdeJson(Arc::new(value))
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

/// Topic Partition (topition)
///
/// A topic partition pair.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Topition {
    topic: String,
    partition: i32,
}

impl Topition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        let topic = topic.into();
        Self { topic, partition }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }
}

impl Display for Topition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// Topic Partition Offset
///
/// A topic partition with an offset.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TopitionOffset {
    topition: Topition,
    offset: i64,
}

impl TopitionOffset {
    pub fn new(topition: Topition, offset: i64) -> Self {
        Self { topition, offset }
    }

    pub fn topition(&self) -> &Topition {
        &self.topition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

/// Config Entry
///
/// A value of `None` is distinct from the key being absent from the topic.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Option<String>,
}

impl ConfigEntry {
    pub fn key(self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self
        }
    }

    pub fn value(self, value: Option<String>) -> Self {
        Self { value, ..self }
    }
}

/// Topic
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Topic {
    pub name: String,
    pub partitions: Vec<i32>,
    pub configs: Vec<ConfigEntry>,
}

impl Topic {
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn partitions(self, partitions: Vec<i32>) -> Self {
        Self { partitions, ..self }
    }

    pub fn configs(self, configs: Vec<ConfigEntry>) -> Self {
        Self { configs, ..self }
    }

    /// The configuration entry for `key`, if the topic has one.
    pub fn config(&self, key: &str) -> Option<&ConfigEntry> {
        self.configs.iter().find(|entry| entry.key == key)
    }
}

/// Group State
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum GroupState {
    #[default]
    Unknown,
    PreparingRebalance,
    CompletingRebalance,
    Stable,
    Dead,
    Empty,
}

impl Display for GroupState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::PreparingRebalance => f.write_str("PreparingRebalance"),
            Self::CompletingRebalance => f.write_str("CompletingRebalance"),
            Self::Stable => f.write_str("Stable"),
            Self::Dead => f.write_str("Dead"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Consumer Group
///
/// A group id of `None` only arises from malformed input.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ConsumerGroup {
    pub group_id: Option<String>,
    pub state: GroupState,
    pub members: Vec<String>,
    pub offsets: Vec<TopitionOffset>,
}

impl ConsumerGroup {
    pub fn group_id(self, group_id: Option<String>) -> Self {
        Self { group_id, ..self }
    }

    pub fn state(self, state: GroupState) -> Self {
        Self { state, ..self }
    }

    pub fn members(self, members: Vec<String>) -> Self {
        Self { members, ..self }
    }

    pub fn offsets(self, offsets: Vec<TopitionOffset>) -> Self {
        Self { offsets, ..self }
    }
}

/// The outcome of committing an offset for a single topition.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CommitStatus {
    Committed,
    Rejected(String),
}

impl CommitStatus {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Topic and partition metadata.
#[async_trait]
pub trait ClusterMetadata: Clone + Debug + Send + Sync + 'static {
    /// The named topic, or `None` when the cluster has no such topic.
    async fn topic(&self, name: &str) -> Result<Option<Topic>>;

    /// The partition indices of a topic in ascending order.
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>>;

    /// Every topic in the cluster.
    async fn topics(&self) -> Result<Vec<Topic>>;
}

/// Partition log positions.
#[async_trait]
pub trait ClusterOffsets: Clone + Debug + Send + Sync + 'static {
    /// The oldest retained offset of the partition.
    async fn log_start(&self, topition: &Topition) -> Result<i64>;

    /// The offset of the next record to be written (the high watermark).
    async fn log_end(&self, topition: &Topition) -> Result<i64>;

    /// The offset of the first record with a timestamp at or after `timestamp`.
    async fn offset_for_timestamp(
        &self,
        topition: &Topition,
        timestamp: SystemTime,
    ) -> Result<Option<i64>>;
}

/// Consumer group liveness.
#[async_trait]
pub trait GroupMembership: Clone + Debug + Send + Sync + 'static {
    /// Whether any consumer is currently connected to the group.
    async fn has_active_members(&self, group_id: &str) -> Result<bool>;

    /// Every consumer group known to the cluster.
    async fn groups(&self) -> Result<Vec<ConsumerGroup>>;
}

/// Consumer group committed offsets.
#[async_trait]
pub trait GroupOffsets: Clone + Debug + Send + Sync + 'static {
    /// Commit offsets for a group, reporting an outcome per topition.
    async fn commit(
        &self,
        group_id: &str,
        offsets: &[(Topition, i64)],
    ) -> Result<Vec<(Topition, CommitStatus)>>;

    /// The committed offsets of the group, for those topitions that have one.
    async fn committed(
        &self,
        group_id: &str,
        topitions: &[Topition],
    ) -> Result<BTreeMap<Topition, i64>>;

    /// Remove any committed offset of the group for these topitions.
    async fn delete(&self, group_id: &str, topitions: &[Topition]) -> Result<()>;
}

/// A cluster provides every collaborator interface.
pub trait Cluster: ClusterMetadata + ClusterOffsets + GroupMembership + GroupOffsets {}

impl<T> Cluster for T where T: ClusterMetadata + ClusterOffsets + GroupMembership + GroupOffsets {}
