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

#![allow(dead_code)]

use std::time::{Duration, SystemTime};

use kadmin_cluster::{ConfigEntry, Topition, memory::Engine};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, filter::ParseError};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Cluster(#[from] kadmin_cluster::Error),

    #[error(transparent)]
    ParseFilter(#[from] ParseError),

    #[error(transparent)]
    Reset(#[from] kadmin_reset::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub(crate) fn init_tracing() -> Result<DefaultGuard, Error> {
    Ok(tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_level(true)
            .with_line_number(true)
            .with_thread_names(false)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(format!("{}=debug", env!("CARGO_CRATE_NAME")).parse()?)
                    .add_directive("kadmin_reset=debug".parse()?)
                    .add_directive("kadmin_cluster=debug".parse()?),
            )
            .with_test_writer()
            .finish(),
    ))
}

pub(crate) fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

pub(crate) async fn engine() -> Result<Engine, Error> {
    Engine::builder()
        .storage(Url::parse("memory://kadmin/")?)
        .build()
        .await
        .map_err(Into::into)
}

/// A new topic with a unique name.
pub(crate) fn topic(engine: &Engine, partitions: i32) -> Result<String, Error> {
    let name = unique("topic");

    engine
        .create_topic(
            &name,
            partitions,
            vec![
                ConfigEntry::default()
                    .key("retention.ms")
                    .value(Some("604800000".into())),
            ],
        )
        .map(|()| name)
        .map_err(Into::into)
}

/// Produce `records` to a topition, all with the same timestamp.
pub(crate) fn produce(
    engine: &Engine,
    topition: &Topition,
    records: i64,
    timestamp: SystemTime,
) -> Result<(), Error> {
    for _ in 0..records {
        _ = engine.produce(topition, timestamp)?;
    }

    Ok(())
}

/// A group that has consumed both partitions of a new topic to offset 5.
pub(crate) fn consumed(engine: &Engine) -> Result<(String, Vec<Topition>), Error> {
    let topic = topic(engine, 2)?;
    let group_id = unique("group");

    let topitions = (0..2)
        .map(|partition| Topition::new(topic.as_str(), partition))
        .collect::<Vec<_>>();

    for topition in &topitions {
        produce(
            engine,
            topition,
            5,
            SystemTime::now() - Duration::from_secs(60),
        )?;
    }

    _ = engine.consume(&group_id, &topic)?;

    Ok((group_id, topitions))
}
