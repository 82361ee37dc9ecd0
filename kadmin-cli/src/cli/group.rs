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

use std::{num::ParseIntError, path::PathBuf, result};

use crate::{Error, Result};
use clap::Subcommand;
use kadmin_cluster::GroupMembership;
use kadmin_reset::{PartitionTarget, Reset, ResetRequest, ResetResponse};
use kadmin_sort::{ConsumerGroupOrderKey, SortDirection, sort_consumer_groups};
use serde_json::Value;
use tokio::{fs, signal};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Context;

#[derive(Clone, Debug, Subcommand)]
pub(super) enum Command {
    /// List consumer groups
    List {
        /// Order by name
        #[arg(long, default_value = "name")]
        order_key: ConsumerGroupOrderKey,

        /// Order asc or desc
        #[arg(long, default_value = "asc")]
        order: SortDirection,
    },

    /// Reset the committed offsets of a consumer group without connected clients
    ResetOffset {
        /// The consumer group
        #[clap(value_parser)]
        group: String,

        /// earliest, latest, absolute or timestamp
        #[arg(long, required_unless_present = "request", conflicts_with = "request")]
        offset: Option<String>,

        /// The absolute offset, or an RFC 3339 timestamp
        #[arg(long, conflicts_with = "request")]
        value: Option<String>,

        /// A topic, optionally followed by partitions: TOPIC[:PARTITION,...]
        #[arg(
            long = "topic",
            value_parser = parse_target,
            required_unless_present = "request",
            conflicts_with = "request"
        )]
        topics: Vec<PartitionTarget>,

        /// A JSON reset request: {"offset": ..., "value": ..., "topics": [...]}
        #[arg(long)]
        request: Option<PathBuf>,
    },
}

impl Command {
    pub(super) async fn main(self, context: &Context) -> Result<Value> {
        match self {
            Command::List { order_key, order } => context
                .cluster()
                .groups()
                .await
                .map(|groups| sort_consumer_groups(groups, order_key, order))
                .map_err(Into::into)
                .and_then(|groups| serde_json::to_value(groups).map_err(Into::into)),

            Command::ResetOffset {
                group,
                offset,
                value,
                topics,
                request,
            } => {
                let request = match request {
                    Some(path) => fs::read(&path)
                        .await
                        .map_err(Error::from)
                        .and_then(|contents| {
                            serde_json::from_slice::<ResetRequest>(&contents).map_err(Error::from)
                        })?,

                    None => ResetRequest {
                        offset: offset.unwrap_or_default(),
                        value,
                        topics,
                    },
                };

                debug!(group, ?request);

                let token = CancellationToken::new();

                let interrupt = tokio::spawn({
                    let token = token.clone();

                    async move {
                        if let Ok(()) = signal::ctrl_c().await {
                            debug!("interrupted");
                            token.cancel();
                        }
                    }
                });

                let outcome = Reset::new(context.cluster().clone())
                    .cancellation(token)
                    .reset(&group, &request)
                    .await;

                interrupt.abort();

                let results = outcome?;
                context.persist().await?;

                serde_json::to_value(ResetResponse::from(results)).map_err(Into::into)
            }
        }
    }
}

/// Parse TOPIC or TOPIC:PARTITION,PARTITION,...
fn parse_target(s: &str) -> Result<PartitionTarget, ParseIntError> {
    match s.rsplit_once(':') {
        Some((topic, partitions)) => partitions
            .split(',')
            .map(|partition| partition.trim().parse::<i32>())
            .collect::<result::Result<Vec<_>, _>>()
            .map(|partitions| PartitionTarget::new(topic, Some(partitions))),

        None => Ok(PartitionTarget::new(s, None)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn targets() -> Result<(), ParseIntError> {
        assert_eq!(PartitionTarget::new("abc", None), parse_target("abc")?);

        assert_eq!(
            PartitionTarget::new("abc", Some(vec![0, 2, 1])),
            parse_target("abc:0,2,1")?
        );

        assert!(parse_target("abc:x").is_err());
        assert!(parse_target("abc:").is_err());

        Ok(())
    }
}
