//! Worker-pool harness shared by every pipeline stage.
//!
//! A stage is a pool of symmetric workers draining one input queue. When the
//! input queue is closed and every worker has returned, the pool drops the
//! last sender of its output queue, which is the only shutdown signal the
//! next stage sees.

use crate::error::{Result, ScanError};
use crate::result::StageCounters;
use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// What a handler did with an item that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Processed,
    Skipped,
}

pub trait Stage: Send + Sync + 'static {
    type Input: Display + Send + 'static;
    type Output: Send + 'static;

    const NAME: &'static str;

    fn handle(
        &self,
        item: Self::Input,
        out: &Emitter<Self::Output>,
    ) -> impl Future<Output = Result<Handled>> + Send;
}

/// A worker's handle on the next stage's queue.
pub struct Emitter<T> {
    stage: &'static str,
    tx: mpsc::Sender<T>,
    counters: Arc<StageCounters>,
}

impl<T: Send> Emitter<T> {
    pub fn new(stage: &'static str, tx: mpsc::Sender<T>, counters: Arc<StageCounters>) -> Self {
        Self {
            stage,
            tx,
            counters,
        }
    }

    /// Blocks while the downstream queue is full.
    pub async fn emit(&self, item: T) -> Result<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| ScanError::ChannelClosed(self.stage))?;
        self.counters.record_emitted();
        Ok(())
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage,
            tx: self.tx.clone(),
            counters: self.counters.clone(),
        }
    }
}

/// Starts `workers` workers for `stage`. The returned task completes once the
/// input queue is closed and drained, at which point `output` is closed too.
pub fn spawn_stage<S: Stage>(
    stage: Arc<S>,
    workers: usize,
    input: mpsc::Receiver<S::Input>,
    output: mpsc::Sender<S::Output>,
    counters: Arc<StageCounters>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(stage = S::NAME, workers, "stage started");
        let input = Arc::new(Mutex::new(input));
        let emitter = Emitter::new(S::NAME, output, counters.clone());

        let handles: Vec<_> = (0..workers.max(1))
            .map(|worker_id| {
                let stage = stage.clone();
                let input = input.clone();
                let emitter = emitter.clone();
                let counters = counters.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, stage, input, emitter, counters).await;
                })
            })
            .collect();

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(stage = S::NAME, "worker task failed: {}", e);
            }
        }

        drop(emitter);
        debug!(stage = S::NAME, "stage finished");
    })
}

async fn run_worker<S: Stage>(
    worker_id: usize,
    stage: Arc<S>,
    input: Arc<Mutex<mpsc::Receiver<S::Input>>>,
    emitter: Emitter<S::Output>,
    counters: Arc<StageCounters>,
) {
    loop {
        let item = {
            let mut rx = input.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            break;
        };

        counters.record_received();
        let label = item.to_string();
        match stage.handle(item, &emitter).await {
            Ok(Handled::Processed) => {}
            Ok(Handled::Skipped) => counters.record_skipped(),
            Err(e) => {
                counters.record_failure(e.kind());
                warn!(stage = S::NAME, worker = worker_id, url = %label, "{} handler error: {}", S::NAME, e);
            }
        }
    }
    debug!(stage = S::NAME, worker = worker_id, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Stage for Doubler {
        type Input = u32;
        type Output = u32;
        const NAME: &'static str = "doubler";

        async fn handle(&self, item: u32, out: &Emitter<u32>) -> Result<Handled> {
            match item {
                0 => Ok(Handled::Skipped),
                13 => Err(ScanError::Parse("unlucky".to_string())),
                n => {
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    out.emit(n * 2).await?;
                    Ok(Handled::Processed)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_stage_drains_input_and_closes_output() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let counters = Arc::new(StageCounters::default());
        let stage = Arc::new(Doubler);

        let handle = spawn_stage(stage, 3, in_rx, out_tx, counters.clone());

        let producer = tokio::spawn(async move {
            for n in 0..20u32 {
                in_tx.send(n).await.unwrap();
            }
        });

        let mut outputs = Vec::new();
        while let Some(n) = out_rx.recv().await {
            outputs.push(n);
        }
        producer.await.unwrap();
        handle.await.unwrap();

        outputs.sort();
        let expected: Vec<u32> = (1..20).filter(|n| *n != 13).map(|n| n * 2).collect();
        assert_eq!(outputs, expected);

        let stats = counters.snapshot("doubler");
        assert_eq!(stats.received, 20);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.emitted, 18);
        assert_eq!(stats.failed.get("parse"), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_input_closes_output_immediately() {
        let (in_tx, in_rx) = mpsc::channel::<u32>(1);
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let stage = Arc::new(Doubler);
        let handle = spawn_stage(stage, 2, in_rx, out_tx, Arc::new(StageCounters::default()));
        drop(in_tx);

        assert_eq!(out_rx.recv().await, None);
        handle.await.unwrap();
    }
}
