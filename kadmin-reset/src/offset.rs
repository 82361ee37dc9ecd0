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
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use kadmin_cluster::Topition;
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime,
    format_description::well_known::{Iso8601, Rfc3339},
};
use tracing::debug;

use crate::{Error, Result};

/// Where the committed offsets of a group should move to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OffsetSpec {
    Earliest,
    Latest,
    Absolute(i64),
    Timestamp(SystemTime),
}

impl OffsetSpec {
    /// Parse a mode and its optional value.
    ///
    /// The mode is case insensitive. The value is ignored for `earliest` and
    /// `latest`, required for `absolute` (a non-negative integer) and
    /// `timestamp` (an RFC 3339 or ISO 8601 date time with an offset).
    pub fn parse(mode: &str, value: Option<&str>) -> Result<Self> {
        let invalid = || Error::InvalidOffsetValue {
            mode: mode.into(),
            value: value.map(String::from),
        };

        match mode.trim().to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),

            "latest" => Ok(Self::Latest),

            "absolute" => value
                .ok_or_else(invalid)
                .and_then(|value| value.trim().parse::<i64>().map_err(|_| invalid()))
                .and_then(|offset| {
                    if offset >= 0 {
                        Ok(Self::Absolute(offset))
                    } else {
                        Err(invalid())
                    }
                }),

            "timestamp" => value
                .ok_or_else(invalid)
                .and_then(|value| parse_timestamp(value.trim()).ok_or_else(invalid))
                .map(Self::Timestamp),

            _ => Err(invalid()),
        }
        .inspect(|spec| debug!(?spec))
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
            Self::Absolute(_) => "absolute",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

fn parse_timestamp(value: &str) -> Option<SystemTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(value, &Iso8601::DEFAULT))
        .inspect_err(|err| debug!(value, ?err))
        .ok()
        .map(SystemTime::from)
}

impl Display for OffsetSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(offset) => write!(f, "{}={offset}", self.mode()),
            Self::Timestamp(timestamp) => write!(
                f,
                "{}={}",
                self.mode(),
                OffsetDateTime::from(*timestamp)
                    .format(&Rfc3339)
                    .map_err(|_| fmt::Error)?
            ),
            _ => f.write_str(self.mode()),
        }
    }
}

impl TryFrom<&ResetRequest> for OffsetSpec {
    type Error = Error;

    fn try_from(value: &ResetRequest) -> Result<Self, Self::Error> {
        Self::parse(&value.offset, value.value.as_deref())
    }
}

/// A topic, with the partitions to reset, or every partition when `None` or empty.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PartitionTarget {
    pub topic: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitions: Option<Vec<i32>>,
}

impl PartitionTarget {
    pub fn new(topic: impl Into<String>, partitions: Option<Vec<i32>>) -> Self {
        Self {
            topic: topic.into(),
            partitions,
        }
    }
}

/// A reset request as it arrives on the wire.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ResetRequest {
    pub offset: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub topics: Vec<PartitionTarget>,
}

/// The offset committed for one partition.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ResetResult {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl ResetResult {
    pub fn new(topition: &Topition, offset: i64) -> Self {
        Self {
            topic: topition.topic().into(),
            partition: topition.partition(),
            offset,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ResetResponse {
    pub items: Vec<ResetResult>,
}

impl From<Vec<ResetResult>> for ResetResponse {
    fn from(items: Vec<ResetResult>) -> Self {
        Self { items }
    }
}
