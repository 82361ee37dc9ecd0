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
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use crate::common::{Error, init_tracing};
use kadmin_cluster::{Bounded, ClusterMetadata, Result, Topic};

mod common;

#[derive(Clone, Debug)]
struct Flaky {
    failures: u32,
    error: kadmin_cluster::Error,
    delay: Option<Duration>,
    calls: Arc<AtomicU32>,
}

impl Flaky {
    fn new(failures: u32, error: kadmin_cluster::Error) -> Self {
        Self {
            failures,
            error,
            delay: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterMetadata for Flaky {
    async fn topic(&self, name: &str) -> Result<Option<Topic>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if call < self.failures {
            Err(self.error.clone())
        } else {
            Ok(Some(Topic::default().name(name).partitions(vec![0])))
        }
    }

    async fn partitions(&self, _topic: &str) -> Result<Vec<i32>> {
        Ok(vec![0])
    }

    async fn topics(&self) -> Result<Vec<Topic>> {
        Ok(vec![])
    }
}

#[tokio::test(start_paused = true)]
async fn retry_until_available() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let flaky = Flaky::new(2, kadmin_cluster::Error::Unavailable("connection refused".into()));
    let cluster = Bounded::new(flaky.clone()).retries(3);

    let topic = cluster.topic("abc").await?.expect("topic");
    assert_eq!("abc", topic.name);
    assert_eq!(3, flaky.calls());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn retries_exhausted() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let flaky = Flaky::new(u32::MAX, kadmin_cluster::Error::Unavailable("reset".into()));
    let cluster = Bounded::new(flaky.clone())
        .retries(2)
        .backoff(Duration::from_millis(5));

    let error = cluster.topic("abc").await.expect_err("unavailable");
    assert!(error.is_retryable());
    assert_eq!(3, flaky.calls());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn permanent_failures_are_not_retried() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let flaky = Flaky::new(u32::MAX, kadmin_cluster::Error::UnknownTopic("abc".into()));
    let cluster = Bounded::new(flaky.clone()).retries(5);

    assert!(matches!(
        cluster.topic("abc").await,
        Err(kadmin_cluster::Error::UnknownTopic(_))
    ));
    assert_eq!(1, flaky.calls());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_calls_time_out() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let flaky = Flaky::new(0, kadmin_cluster::Error::Poison).delay(Duration::from_secs(3_600));
    let timeout = Duration::from_secs(1);
    let cluster = Bounded::new(flaky.clone()).timeout(timeout).retries(1);

    assert!(matches!(
        cluster.topic("abc").await,
        Err(kadmin_cluster::Error::Timeout(elapsed)) if elapsed == timeout
    ));
    assert_eq!(2, flaky.calls());

    Ok(())
}
