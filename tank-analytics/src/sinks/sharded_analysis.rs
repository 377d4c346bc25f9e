use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures::StreamExt;
use tank_domain::domain::Reading;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Per-asset computation run once the asset's readings are complete.
///
/// Implementations are synchronous and run on the blocking pool.
pub trait AssetAnalyzer: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Whether readings of this asset should be collected at all.
    fn accepts(&self, _asset_id: &str) -> bool {
        true
    }

    /// `None` drops the asset from the results.
    fn analyze(&self, asset_id: &str, readings: Vec<Reading>) -> Option<Self::Output>;
}

fn shard_index(key: &str, workers: usize) -> usize {
    use std::hash::{Hash, Hasher};

    let mut h = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut h);
    (h.finish() as usize) % workers.max(1)
}

/// Shards readings by asset id over `workers` tasks. Each task holds the
/// complete batch of its assets and analyzes them after the input ends, so
/// no asset is ever split across workers.
pub struct ShardedAnalysisSink<A: AssetAnalyzer> {
    analyzer: Arc<A>,
    workers: usize,
    channel_capacity: usize,
    results: Arc<Mutex<BTreeMap<String, A::Output>>>,
    rejected: Arc<AtomicUsize>,
}

impl<A: AssetAnalyzer> ShardedAnalysisSink<A> {
    pub fn new(analyzer: A, workers: usize, channel_capacity: usize) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            workers: workers.max(1),
            channel_capacity: channel_capacity.max(1),
            results: Arc::new(Mutex::new(BTreeMap::new())),
            rejected: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Per-asset outputs, ordered by asset id; filled when `run` returns.
    pub fn results(&self) -> Arc<Mutex<BTreeMap<String, A::Output>>> {
        self.results.clone()
    }

    /// Upstream items that arrived as errors and were skipped.
    pub fn rejected(&self) -> Arc<AtomicUsize> {
        self.rejected.clone()
    }
}

async fn collect_shard<A: AssetAnalyzer>(
    analyzer: Arc<A>,
    rx: mpsc::Receiver<Reading>,
) -> Result<Vec<(String, A::Output)>, PipelineError> {
    let mut incoming = ReceiverStream::new(rx);
    let mut by_asset: HashMap<String, Vec<Reading>> = HashMap::new();
    while let Some(reading) = incoming.next().await {
        by_asset.entry(reading.asset_id.clone()).or_default().push(reading);
    }

    tokio::task::spawn_blocking(move || {
        by_asset
            .into_iter()
            .filter_map(|(asset_id, readings)| {
                let out = analyzer.analyze(&asset_id, readings)?;
                Some((asset_id, out))
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| PipelineError::Sink(format!("analysis task failed: {e}")))
}

#[async_trait::async_trait]
impl<A: AssetAnalyzer> Sink<Reading> for ShardedAnalysisSink<A> {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut txs = Vec::with_capacity(self.workers);
        let mut joins = Vec::with_capacity(self.workers);

        for _ in 0..self.workers {
            let (tx, rx) = mpsc::channel::<Reading>(self.channel_capacity);
            txs.push(tx);
            joins.push(tokio::spawn(collect_shard(self.analyzer.clone(), rx)));
        }

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "skipping rejected record");
                    continue;
                }
            };
            if !self.analyzer.accepts(&env.payload.asset_id) {
                continue;
            }

            let idx = shard_index(&env.payload.asset_id, self.workers);
            if txs[idx].send(env.payload).await.is_err() {
                return Err(PipelineError::Sink("analysis worker channel closed".to_string()));
            }
        }

        drop(txs);

        let mut merged = BTreeMap::new();
        for j in joins {
            match j.await {
                Ok(Ok(outputs)) => merged.extend(outputs),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(PipelineError::Sink(format!("analysis worker join error: {e}"))),
            }
        }

        tracing::info!(assets = merged.len(), "analysis complete");
        *self.results.lock().await = merged;
        Ok(())
    }
}
