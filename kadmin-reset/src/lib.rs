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

//! Consumer group offset reset
//!
//! A reset moves the committed offsets of a consumer group to positions
//! described by an [`OffsetSpec`]: the earliest or latest offset of each
//! partition, an absolute offset, or the first offset at a point in time.
//!
//! The [`Validator`] checks that the requested topics and partitions exist
//! and that the group has no connected clients. The [`Resolver`] turns the
//! offset specification into a concrete offset for each partition. [`Reset`]
//! composes both, then commits every resolved offset or none of them.
//!
//! ```
//! # use kadmin_cluster::{Topition, memory::Engine};
//! # use kadmin_reset::{Error, OffsetSpec, PartitionTarget, Reset};
//! # use std::time::SystemTime;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let engine = Engine::default();
//! engine.create_topic("abc", 1, vec![])?;
//! _ = engine.produce(&Topition::new("abc", 0), SystemTime::now())?;
//!
//! let results = Reset::new(engine)
//!     .reset_consumer_group_offsets(
//!         "g",
//!         OffsetSpec::Latest,
//!         &[PartitionTarget::new("abc", None)],
//!     )
//!     .await?;
//!
//! assert_eq!(1, results[0].offset);
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{self, Display, Formatter},
    result,
};

use kadmin_cluster::Topition;

mod offset;
mod reset;
mod resolver;
mod validator;

pub use offset::{OffsetSpec, PartitionTarget, ResetRequest, ResetResponse, ResetResult};
pub use reset::Reset;
pub use resolver::Resolver;
pub use validator::Validator;

/// Offset Reset Errors
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    Cancelled,
    Cluster(kadmin_cluster::Error),
    ClusterUnavailable(kadmin_cluster::Error),
    Forbidden,
    GroupHasActiveMembers(String),

    InvalidOffsetValue {
        mode: String,
        value: Option<String>,
    },

    InvalidPartition {
        topic: String,
        partition: i32,
        count: usize,
    },

    NoTargets,

    PartialApplyFailure {
        group_id: String,
        failed: Vec<Topition>,
    },

    Unauthorized,
    UnknownTopic(String),
}

impl Error {
    /// Errors caused by the request, detected before any mutation.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Forbidden
                | Self::GroupHasActiveMembers(_)
                | Self::InvalidOffsetValue { .. }
                | Self::InvalidPartition { .. }
                | Self::NoTargets
                | Self::Unauthorized
                | Self::UnknownTopic(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ClusterUnavailable(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("Offset reset cancelled"),

            Self::Cluster(error) => write!(f, "Cluster error: {error}"),

            Self::ClusterUnavailable(error) => write!(f, "Cluster unavailable: {error}"),

            Self::Forbidden => f.write_str("Forbidden"),

            Self::GroupHasActiveMembers(group_id) => write!(
                f,
                "Consumer group {group_id} has connected clients, offsets may only be reset \
                 when a group has no connected clients"
            ),

            Self::InvalidOffsetValue {
                mode,
                value: Some(value),
            } => write!(f, "Invalid {mode} offset value: {value}"),

            Self::InvalidOffsetValue { mode, value: None } => {
                write!(f, "Missing value for {mode} offset")
            }

            Self::InvalidPartition {
                topic,
                partition,
                count,
            } => write!(
                f,
                "Topic {topic}, partition {partition} is not valid (partition count {count})"
            ),

            Self::NoTargets => f.write_str("Request contained no topics"),

            Self::PartialApplyFailure { group_id, failed } => {
                write!(f, "Offset reset of consumer group {group_id} failed for")?;

                for topition in failed {
                    write!(f, " {topition}")?;
                }

                Ok(())
            }

            Self::Unauthorized => f.write_str("Unauthorized"),

            Self::UnknownTopic(topic) => write!(f, "Request contained an unknown topic: {topic}"),
        }
    }
}

impl From<kadmin_cluster::Error> for Error {
    fn from(value: kadmin_cluster::Error) -> Self {
        match value {
            kadmin_cluster::Error::UnknownTopic(topic) => Self::UnknownTopic(topic),
            error if error.is_retryable() => Self::ClusterUnavailable(error),
            error => Self::Cluster(error),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn client_facing_messages() {
        assert_eq!(
            "Request contained an unknown topic: topic1",
            Error::UnknownTopic("topic1".into()).to_string()
        );

        assert_eq!(
            "Topic topic1, partition 5 is not valid (partition count 3)",
            Error::InvalidPartition {
                topic: "topic1".into(),
                partition: 5,
                count: 3
            }
            .to_string()
        );

        assert!(
            Error::GroupHasActiveMembers("g".into())
                .to_string()
                .contains("connected clients")
        );
    }

    #[test]
    fn classification() {
        assert!(Error::NoTargets.is_client_error());
        assert!(!Error::NoTargets.is_retryable());

        let unavailable =
            Error::from(kadmin_cluster::Error::Timeout(Duration::from_millis(30_000)));
        assert!(unavailable.is_retryable());
        assert!(!unavailable.is_client_error());

        assert!(matches!(
            Error::from(kadmin_cluster::Error::UnknownTopic("abc".into())),
            Error::UnknownTopic(topic) if topic == "abc"
        ));

        assert!(matches!(
            Error::from(kadmin_cluster::Error::Poison),
            Error::Cluster(kadmin_cluster::Error::Poison)
        ));

        assert!(!Error::Cancelled.is_client_error());
    }
}
