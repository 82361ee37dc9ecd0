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

use std::{error::Error, str::FromStr};

use crate::Result;
use clap::Subcommand;
use kadmin_cluster::{ClusterMetadata, ConfigEntry};
use kadmin_sort::{SortDirection, TopicOrderKey, sort_topics};
use serde_json::Value;

use super::Context;

#[derive(Clone, Debug, Subcommand)]
pub(super) enum Command {
    /// List topics
    List {
        /// Order by name, partitions, retention.ms or retention.bytes
        #[arg(long, default_value = "name")]
        order_key: TopicOrderKey,

        /// Order asc or desc
        #[arg(long, default_value = "asc")]
        order: SortDirection,
    },

    /// Create a topic
    Create {
        /// The name of the topic to create
        #[clap(value_parser)]
        name: String,

        /// The number of partitions to create
        #[arg(long, default_value = "3")]
        partitions: i32,

        #[arg(long, value_parser = parse_key_val::<String, String>)]
        config: Vec<(String, String)>,
    },
}

impl Command {
    pub(super) async fn main(self, context: &Context) -> Result<Value> {
        match self {
            Command::List { order_key, order } => context
                .cluster()
                .topics()
                .await
                .map(|topics| sort_topics(topics, order_key, order))
                .map_err(Into::into)
                .and_then(|topics| serde_json::to_value(topics).map_err(Into::into)),

            Command::Create {
                name,
                partitions,
                config,
            } => {
                context.engine().create_topic(
                    &name,
                    partitions,
                    config
                        .into_iter()
                        .map(|(key, value)| ConfigEntry::default().key(key).value(Some(value)))
                        .collect(),
                )?;

                context.persist().await?;

                context
                    .cluster()
                    .topic(&name)
                    .await
                    .map_err(Into::into)
                    .and_then(|topic| serde_json::to_value(topic).map_err(Into::into))
            }
        }
    }
}

/// Parse a single key-value pair
fn parse_key_val<T, U>(s: &str) -> Result<(T, U), Box<dyn Error + Send + Sync + 'static>>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
    U: FromStr,
    U::Err: Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}
