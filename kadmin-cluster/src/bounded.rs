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

use std::{collections::BTreeMap, future::Future, time::SystemTime};

use async_trait::async_trait;
use tokio::time::{self, Duration};
use tracing::{debug, warn};

use crate::{
    ClusterMetadata, ClusterOffsets, CommitStatus, ConsumerGroup, Error, GroupMembership,
    GroupOffsets, Result, Topic, Topition,
};

const TIMEOUT_MS: u64 = 30_000;
const RETRIES: u32 = 3;
const BACKOFF_MS: u64 = 100;

/// Bounded cluster calls
///
/// Every call to the inner cluster runs under a timeout. Calls that fail with
/// a retryable error are tried again, up to `retries` more times, pausing for
/// `backoff` in between.
#[derive(Clone, Debug)]
pub struct Bounded<C> {
    inner: C,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl<C> Bounded<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            timeout: Duration::from_millis(TIMEOUT_MS),
            retries: RETRIES,
            backoff: Duration::from_millis(BACKOFF_MS),
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    pub fn backoff(self, backoff: Duration) -> Self {
        Self { backoff, ..self }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    async fn call<F, Fut, T>(&self, method: &'static str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            let outcome = time::timeout(self.timeout, f())
                .await
                .unwrap_or_else(|_elapsed| Err(Error::Timeout(self.timeout)));

            match outcome {
                Err(error) if error.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(method, attempt, %error);
                    time::sleep(self.backoff).await;
                }

                otherwise => {
                    if attempt > 0 {
                        debug!(method, attempt, ok = otherwise.is_ok());
                    }

                    return otherwise;
                }
            }
        }
    }
}

#[async_trait]
impl<C> ClusterMetadata for Bounded<C>
where
    C: ClusterMetadata,
{
    async fn topic(&self, name: &str) -> Result<Option<Topic>> {
        self.call("topic", || self.inner.topic(name)).await
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        self.call("partitions", || self.inner.partitions(topic))
            .await
    }

    async fn topics(&self) -> Result<Vec<Topic>> {
        self.call("topics", || self.inner.topics()).await
    }
}

#[async_trait]
impl<C> ClusterOffsets for Bounded<C>
where
    C: ClusterOffsets,
{
    async fn log_start(&self, topition: &Topition) -> Result<i64> {
        self.call("log_start", || self.inner.log_start(topition))
            .await
    }

    async fn log_end(&self, topition: &Topition) -> Result<i64> {
        self.call("log_end", || self.inner.log_end(topition)).await
    }

    async fn offset_for_timestamp(
        &self,
        topition: &Topition,
        timestamp: SystemTime,
    ) -> Result<Option<i64>> {
        self.call("offset_for_timestamp", || {
            self.inner.offset_for_timestamp(topition, timestamp)
        })
        .await
    }
}

#[async_trait]
impl<C> GroupMembership for Bounded<C>
where
    C: GroupMembership,
{
    async fn has_active_members(&self, group_id: &str) -> Result<bool> {
        self.call("has_active_members", || {
            self.inner.has_active_members(group_id)
        })
        .await
    }

    async fn groups(&self) -> Result<Vec<ConsumerGroup>> {
        self.call("groups", || self.inner.groups()).await
    }
}

#[async_trait]
impl<C> GroupOffsets for Bounded<C>
where
    C: GroupOffsets,
{
    async fn commit(
        &self,
        group_id: &str,
        offsets: &[(Topition, i64)],
    ) -> Result<Vec<(Topition, CommitStatus)>> {
        self.call("commit", || self.inner.commit(group_id, offsets))
            .await
    }

    async fn committed(
        &self,
        group_id: &str,
        topitions: &[Topition],
    ) -> Result<BTreeMap<Topition, i64>> {
        self.call("committed", || self.inner.committed(group_id, topitions))
            .await
    }

    async fn delete(&self, group_id: &str, topitions: &[Topition]) -> Result<()> {
        self.call("delete", || self.inner.delete(group_id, topitions))
            .await
    }
}
