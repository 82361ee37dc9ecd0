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
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use kadmin_cluster::{ConsumerGroup, Topic};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

/// How the values of an order key are compared.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Comparison {
    CaseInsensitive,
    Numeric,
}

impl Comparison {
    fn value(self, raw: &str) -> Option<Value> {
        match self {
            Self::CaseInsensitive => Some(Value::Text(raw.to_lowercase())),
            Self::Numeric => raw.trim().parse().ok().map(Value::Number),
        }
    }
}

/// A comparable value extracted from a resource.
///
/// Text is held case folded. Values of one order key are always the same variant.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Text(String),
    Number(i64),
}

/// A sortable field of a resource.
pub trait OrderKey: Copy + Debug {
    type Resource;

    /// The literal name of the field, also used for config lookup.
    fn as_str(&self) -> &'static str;

    fn comparison(&self) -> Comparison;

    /// The value of this field, or `None` when it cannot be resolved.
    fn value(&self, resource: &Self::Resource) -> Option<Value>;
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum TopicOrderKey {
    #[default]
    #[serde(rename = "name")]
    Name,

    #[serde(rename = "partitions")]
    Partitions,

    #[serde(rename = "retention.ms")]
    RetentionMs,

    #[serde(rename = "retention.bytes")]
    RetentionBytes,
}

impl OrderKey for TopicOrderKey {
    type Resource = Topic;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Partitions => "partitions",
            Self::RetentionMs => "retention.ms",
            Self::RetentionBytes => "retention.bytes",
        }
    }

    fn comparison(&self) -> Comparison {
        match self {
            Self::Name => Comparison::CaseInsensitive,
            Self::Partitions | Self::RetentionMs | Self::RetentionBytes => Comparison::Numeric,
        }
    }

    fn value(&self, topic: &Topic) -> Option<Value> {
        match self {
            Self::Name => Some(topic.name.as_str())
                .filter(|name| !name.is_empty())
                .and_then(|name| self.comparison().value(name)),

            Self::Partitions => i64::try_from(topic.partitions.len())
                .ok()
                .map(Value::Number),

            Self::RetentionMs | Self::RetentionBytes => topic
                .config(self.as_str())
                .and_then(|entry| entry.value.as_deref())
                .and_then(|raw| {
                    self.comparison().value(raw).or_else(|| {
                        debug!(topic = %topic.name, key = self.as_str(), raw, "unparsable");
                        None
                    })
                }),
        }
    }
}

impl FromStr for TopicOrderKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "partitions" => Ok(Self::Partitions),
            "retention.ms" => Ok(Self::RetentionMs),
            "retention.bytes" => Ok(Self::RetentionBytes),
            otherwise => Err(Error::UnknownOrderKey(otherwise.into())),
        }
    }
}

impl Display for TopicOrderKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum ConsumerGroupOrderKey {
    #[default]
    #[serde(rename = "name")]
    Name,
}

impl OrderKey for ConsumerGroupOrderKey {
    type Resource = ConsumerGroup;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
        }
    }

    fn comparison(&self) -> Comparison {
        match self {
            Self::Name => Comparison::CaseInsensitive,
        }
    }

    fn value(&self, group: &ConsumerGroup) -> Option<Value> {
        match self {
            Self::Name => group
                .group_id
                .as_deref()
                .and_then(|group_id| self.comparison().value(group_id)),
        }
    }
}

impl FromStr for ConsumerGroupOrderKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            otherwise => Err(Error::UnknownOrderKey(otherwise.into())),
        }
    }
}

impl Display for ConsumerGroupOrderKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
