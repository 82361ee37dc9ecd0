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

use std::{collections::HashMap, env::vars, fmt, io, result, str::FromStr, sync::Arc};

mod cli;
pub mod logging;

pub use cli::Cli;
pub use logging::TracingFormat;
use regex::{Regex, Replacer};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    Box(#[from] Box<dyn std::error::Error + Send + Sync>),
    Cluster(#[from] kadmin_cluster::Error),
    DotEnv(#[from] dotenv::Error),
    Io(Arc<io::Error>),
    Regex(#[from] regex::Error),
    Reset(#[from] kadmin_reset::Error),
    SerdeJson(#[from] serde_json::Error),
    Sort(#[from] kadmin_sort::Error),
    TryInit(#[from] tracing_subscriber::util::TryInitError),
    UnsupportedTracingFormat(String),
    Url(#[from] url::ParseError),
}

impl Error {
    /// Exit status: 2 when the request was rejected, 3 when the cluster is
    /// unavailable and the command may be tried again, otherwise 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Reset(error) if error.is_client_error() => 2,
            Self::Reset(error) if error.is_retryable() => 3,
            Self::Cluster(error) if error.is_retryable() => 3,
            _ => 1,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster(error) => write!(f, "{error}"),
            Self::Reset(error) => write!(f, "{error}"),
            Self::Sort(error) => write!(f, "{error}"),
            Self::UnsupportedTracingFormat(format) => {
                write!(f, "unsupported tracing format: {format}")
            }
            error => write!(f, "{error:?}"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

/// Environment variables available for substitution.
#[derive(Clone, Debug)]
pub struct VarRep(HashMap<String, String>);

impl From<HashMap<String, String>> for VarRep {
    fn from(value: HashMap<String, String>) -> Self {
        Self(value)
    }
}

impl VarRep {
    /// Replace every `${NAME}` with the value of `NAME`, or nothing when unset.
    pub fn replace(&self, haystack: &str) -> Result<String> {
        Regex::new(r"\$\{(?<var>[^\}]+)\}")
            .map(|re| re.replace_all(haystack, self).into_owned())
            .map_err(Into::into)
    }
}

impl Replacer for &VarRep {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        if let Some(variable) = caps.name("var")
            && let Some(value) = self.0.get(variable.as_str())
        {
            dst.push_str(value);
        }
    }
}

/// A command line value with environment variables expanded before parsing.
#[derive(Clone, Debug)]
pub struct EnvVarExp<T>(T);

impl<T> EnvVarExp<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromStr for EnvVarExp<T>
where
    T: FromStr,
    Error: From<<T as FromStr>::Err>,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VarRep::from(vars().collect::<HashMap<_, _>>())
            .replace(s)
            .and_then(|s| T::from_str(&s).map_err(Into::into))
            .map(|t| Self(t))
    }
}
