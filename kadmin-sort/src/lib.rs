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

//! Ordering of topics and consumer groups
//!
//! A resource is sorted by an [`OrderKey`]. Each key knows how to extract a
//! [`Value`] from a resource, and whether that value is compared case
//! insensitively or numerically. A value that cannot be resolved (a missing
//! config entry, a null value, a missing group id) never orders before or
//! after anything in a pairwise [`compare`].
//!
//! ```
//! use kadmin_cluster::Topic;
//! use kadmin_sort::{SortDirection, TopicOrderKey, sort_topics};
//!
//! let topics = vec![
//!     Topic::default().name("pqr").partitions(vec![0]),
//!     Topic::default().name("ABC").partitions(vec![0, 1, 2]),
//! ];
//!
//! let sorted = sort_topics(topics, TopicOrderKey::Name, SortDirection::Asc);
//! assert_eq!("ABC", sorted[0].name);
//! ```

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    result,
    str::FromStr,
};

use kadmin_cluster::{ConsumerGroup, Topic};
use serde::{Deserialize, Serialize};
use tracing::debug;

mod key;

pub use key::{Comparison, ConsumerGroupOrderKey, OrderKey, TopicOrderKey, Value};

#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    UnknownOrderKey(String),
    UnknownSortDirection(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOrderKey(key) => write!(f, "unknown order key: {key}"),
            Self::UnknownSortDirection(direction) => {
                write!(f, "unknown sort direction: {direction}")
            }
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::UnknownSortDirection(s.into())),
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// Compare two resources by `key` in ascending order.
///
/// Returns [`Ordering::Equal`] unless the key resolves for both resources.
pub fn compare<K>(a: &K::Resource, b: &K::Resource, key: K) -> Ordering
where
    K: OrderKey,
{
    match (key.value(a), key.value(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Sort resources by `key` in `direction`.
///
/// The sort is stable. Resources with an unresolved key keep their relative
/// input order and follow every resolved resource, in either direction.
pub fn sort<K>(resources: Vec<K::Resource>, key: K, direction: SortDirection) -> Vec<K::Resource>
where
    K: OrderKey,
{
    let mut keyed = resources
        .into_iter()
        .map(|resource| (key.value(&resource), resource))
        .collect::<Vec<_>>();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    debug!(
        key = key.as_str(),
        %direction,
        resources = keyed.len(),
        unresolved = keyed.iter().filter(|(value, _)| value.is_none()).count()
    );

    keyed.into_iter().map(|(_, resource)| resource).collect()
}

pub fn sort_topics(topics: Vec<Topic>, key: TopicOrderKey, direction: SortDirection) -> Vec<Topic> {
    sort(topics, key, direction)
}

pub fn sort_consumer_groups(
    groups: Vec<ConsumerGroup>,
    key: ConsumerGroupOrderKey,
    direction: SortDirection,
) -> Vec<ConsumerGroup> {
    sort(groups, key, direction)
}
