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
    io::{self, Write},
    process,
    time::Duration,
};

use crate::{EnvVarExp, Result, TracingFormat, logging};
use clap::{Parser, Subcommand};
use kadmin_cluster::{Bounded, memory::Engine};
use serde_json::Value;
use tracing::debug;
use url::Url;

mod group;
mod topic;

const DEFAULT_CLUSTER: &str = "memory://kadmin/";

#[derive(Clone, Debug, Parser)]
#[command(name = "kadmin", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Cluster URL: memory://kadmin/ or file:///path/to/snapshot.json
    #[arg(long, global = true, env = "KADMIN_CLUSTER", default_value = DEFAULT_CLUSTER)]
    cluster: EnvVarExp<Url>,

    /// Timeout of each cluster call in milliseconds
    #[arg(long, global = true, default_value = "30000")]
    cluster_timeout_ms: u64,

    /// Retries of a cluster call that failed with a transient error
    #[arg(long, global = true, default_value = "3")]
    cluster_retries: u32,

    /// Log format
    #[arg(long, global = true, env = "KADMIN_LOG_FORMAT", default_value = "text")]
    log_format: TracingFormat,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// List or create topics
    Topic {
        #[command(subcommand)]
        command: topic::Command,
    },

    /// List consumer groups or reset their committed offsets
    Group {
        #[command(subcommand)]
        command: group::Command,
    },
}

/// The cluster a command runs against.
#[derive(Clone, Debug)]
pub(crate) struct Context {
    engine: Engine,
    cluster: Bounded<Engine>,
}

impl Context {
    pub(crate) fn cluster(&self) -> &Bounded<Engine> {
        &self.cluster
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Save any changes to the snapshot backing the cluster.
    pub(crate) async fn persist(&self) -> Result<()> {
        self.engine.persist().await.map_err(Into::into)
    }
}

impl Cli {
    pub async fn main() -> Result<()> {
        let cli = Cli::parse();

        logging::init(cli.log_format)?;
        debug!(pid = process::id());

        let output = cli.execute().await?;

        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &output)?;
        writeln!(stdout).map_err(Into::into)
    }

    /// Run the command, returning its output.
    pub async fn execute(self) -> Result<Value> {
        let storage = self.cluster.into_inner();
        debug!(
            %storage,
            timeout_ms = self.cluster_timeout_ms,
            retries = self.cluster_retries
        );

        let engine = Engine::builder().storage(storage).build().await?;

        let context = Context {
            cluster: Bounded::new(engine.clone())
                .timeout(Duration::from_millis(self.cluster_timeout_ms))
                .retries(self.cluster_retries),
            engine,
        };

        match self.command {
            Command::Topic { command } => command.main(&context).await,
            Command::Group { command } => command.main(&context).await,
        }
        .inspect(|output| debug!(%output))
        .inspect_err(|err| debug!(?err))
    }
}
