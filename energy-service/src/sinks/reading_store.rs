use std::{sync::Arc, time::Duration};

use energy_client::{domain::NewReading, ReadingStore};
use futures::StreamExt;

use crate::pipeline::{Envelope, PipelineError, Sink, SinkReport};

/// Batches readings into a [`ReadingStore`], retrying failed batches with
/// linear backoff.
pub struct ReadingStoreSink {
    store: Arc<dyn ReadingStore>,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ReadingStoreSink {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        batch_size: usize,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, batch: &[Envelope<NewReading>]) -> Result<usize, PipelineError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let readings: Vec<NewReading> = batch.iter().map(|e| e.payload.clone()).collect();

        let mut attempt: u32 = 0;
        loop {
            match self.store.append_batch(&readings).await {
                Ok(ids) => {
                    metrics::counter!("store_append_batch_total").increment(ids.len() as u64);

                    // Approximate end-to-end latency from earliest received_at to now.
                    if let Some(min_received) = batch.iter().map(|e| e.received_at).min() {
                        if let Ok(dur) = std::time::SystemTime::now().duration_since(min_received) {
                            metrics::histogram!("ingest_end_to_end_latency_seconds")
                                .record(dur.as_secs_f64());
                        }
                    }

                    return Ok(ids.len());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "reading store flush failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "reading store flush failed, giving up");
                    metrics::counter!("store_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink<NewReading> for ReadingStoreSink {
    async fn run<S>(&self, mut input: S) -> Result<SinkReport, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<NewReading>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut report = SinkReport::default();
        let mut buffer: Vec<Envelope<NewReading>> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping record rejected upstream");
                    report.skipped += 1;
                    continue;
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                report.written += self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            report.written += self.flush_batch(&buffer).await?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::BTreeMap,
        sync::atomic::{AtomicU32, Ordering},
    };

    use energy_client::{domain::Reading, MemoryReadingStore, StoreError};
    use time::{macros::datetime, Duration as TimeDuration, OffsetDateTime};

    /// Fails the first `failures` batch appends, then delegates.
    struct FlakyStore {
        inner: MemoryReadingStore,
        failures: AtomicU32,
    }

    #[async_trait::async_trait]
    impl ReadingStore for FlakyStore {
        async fn append(&self, reading: &NewReading) -> Result<i64, StoreError> {
            self.inner.append(reading).await
        }

        async fn append_batch(&self, readings: &[NewReading]) -> Result<Vec<i64>, StoreError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.append_batch(readings).await
        }

        async fn range_query(
            &self,
            start: Option<OffsetDateTime>,
            end: Option<OffsetDateTime>,
        ) -> Result<Vec<Reading>, StoreError> {
            self.inner.range_query(start, end).await
        }

        async fn latest_per_device(&self) -> Result<BTreeMap<String, Reading>, StoreError> {
            self.inner.latest_per_device().await
        }
    }

    fn envelopes(n: i64) -> Vec<Result<Envelope<NewReading>, PipelineError>> {
        let t0 = datetime!(2024-01-01 00:00:00 UTC);
        (0..n)
            .map(|i| Ok(Envelope::now(NewReading::new("tv", 50.0, t0 + TimeDuration::minutes(i)))))
            .collect()
    }

    #[tokio::test]
    async fn writes_in_batches_and_counts_skips() {
        let store = Arc::new(MemoryReadingStore::new());
        let sink = ReadingStoreSink::new(store.clone(), 2, 0, Duration::from_millis(1));

        let mut items = envelopes(5);
        items.insert(1, Err(PipelineError::Transform("bad".to_string())));

        let report = sink.run(futures::stream::iter(items)).await.unwrap();
        assert_eq!(report, SinkReport { written: 5, skipped: 1 });
        assert_eq!(store.range_query(None, None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn retries_transient_store_failures() {
        let store = Arc::new(FlakyStore {
            inner: MemoryReadingStore::new(),
            failures: AtomicU32::new(2),
        });
        let sink = ReadingStoreSink::new(store.clone(), 10, 3, Duration::from_millis(1));

        let report = sink.run(futures::stream::iter(envelopes(3))).await.unwrap();
        assert_eq!(report.written, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let store = Arc::new(FlakyStore {
            inner: MemoryReadingStore::new(),
            failures: AtomicU32::new(5),
        });
        let sink = ReadingStoreSink::new(store, 10, 1, Duration::from_millis(1));

        let res = sink.run(futures::stream::iter(envelopes(3))).await;
        assert!(matches!(res, Err(PipelineError::Sink(_))));
    }

    #[test]
    fn written_batches_are_counted_as_store_append_batch_total() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                let store = Arc::new(MemoryReadingStore::new());
                let sink = ReadingStoreSink::new(store, 10, 0, Duration::from_millis(1));
                sink.run(futures::stream::iter(envelopes(3))).await.unwrap();
            })
        });

        assert!(handle.render().contains("store_append_batch_total 3"));
    }
}
