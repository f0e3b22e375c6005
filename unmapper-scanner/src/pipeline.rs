//! The four-stage pipeline: pages -> scripts -> maps -> provenance.
//!
//! Each stage runs its own worker pool and talks to the next one only
//! through a bounded queue. Closing the seed queue ([`Seeder::close`]) starts
//! the shutdown cascade; [`RunningPipeline::wait`] returns after the last
//! stage has drained.

use crate::config::PipelineConfig;
use crate::error::{Result, ScanError};
use crate::maps::MapStage;
use crate::page::PageStage;
use crate::provenance::ProvenanceStage;
use crate::result::{ProvenanceRecord, RunSummary, StageCounters};
use crate::script::ScriptStage;
use crate::stage::{Stage, spawn_stage};
use crate::target::CrawlTarget;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct Pipeline {
    config: PipelineConfig,
    client: Client,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    pub fn with_client(config: PipelineConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Spawns every stage. Seeds go in through the returned [`Seeder`]; the
    /// [`RunningPipeline`] must be awaited concurrently, since the queues
    /// are bounded and back up when nothing drains the final records.
    pub fn launch(self) -> (Seeder, RunningPipeline) {
        let Pipeline { config, client } = self;
        let capacity = config.queue_capacity.max(1);
        let workers = config.workers.max(1);

        let (page_tx, page_rx) = mpsc::channel(capacity);
        let (script_tx, script_rx) = mpsc::channel(capacity);
        let (map_tx, map_rx) = mpsc::channel(capacity);
        let (info_tx, info_rx) = mpsc::channel(capacity);
        let (record_tx, record_rx) = mpsc::channel(capacity);

        let counters: Vec<(&'static str, Arc<StageCounters>)> = [
            PageStage::NAME,
            ScriptStage::NAME,
            MapStage::NAME,
            ProvenanceStage::NAME,
        ]
        .into_iter()
        .map(|name| (name, Arc::new(StageCounters::default())))
        .collect();

        info!(
            workers,
            output = %config.output_root.display(),
            "starting pipeline"
        );

        let stages = vec![
            spawn_stage(
                Arc::new(PageStage::new(client.clone())),
                workers,
                page_rx,
                script_tx,
                counters[0].1.clone(),
            ),
            spawn_stage(
                Arc::new(ScriptStage::new(client.clone(), config.chunk_size)),
                workers,
                script_rx,
                map_tx,
                counters[1].1.clone(),
            ),
            spawn_stage(
                Arc::new(MapStage::new(client, config.output_root.clone())),
                workers,
                map_rx,
                info_tx,
                counters[2].1.clone(),
            ),
            spawn_stage(
                Arc::new(ProvenanceStage::new(config.output_root.clone())),
                workers,
                info_rx,
                record_tx,
                counters[3].1.clone(),
            ),
        ];

        let seeder = Seeder { tx: page_tx };
        let running = RunningPipeline {
            records: record_rx,
            stages,
            counters,
            started_at: Utc::now(),
            output_root: config.output_root,
        };
        (seeder, running)
    }
}

/// Producer side of the page queue.
pub struct Seeder {
    tx: mpsc::Sender<CrawlTarget>,
}

impl Seeder {
    /// Parses and enqueues one seed URL. Waits while the page queue is full.
    pub async fn add(&self, raw: &str) -> Result<CrawlTarget> {
        let target = CrawlTarget::parse(raw)?;
        self.add_target(target.clone()).await?;
        Ok(target)
    }

    pub async fn add_target(&self, target: CrawlTarget) -> Result<()> {
        debug!(url = %target, "seed queued");
        self.tx
            .send(target)
            .await
            .map_err(|_| ScanError::ChannelClosed(PageStage::NAME))
    }

    /// Closes the page queue; no further seeds can be added.
    pub fn close(self) {
        drop(self);
    }
}

pub struct RunningPipeline {
    records: mpsc::Receiver<ProvenanceRecord>,
    stages: Vec<JoinHandle<()>>,
    counters: Vec<(&'static str, Arc<StageCounters>)>,
    started_at: DateTime<Utc>,
    output_root: PathBuf,
}

impl RunningPipeline {
    pub async fn wait(self) -> Result<RunSummary> {
        self.wait_with(|_| {}).await
    }

    /// Like [`wait`](Self::wait), calling `on_record` as each map completes.
    pub async fn wait_with<F>(mut self, mut on_record: F) -> Result<RunSummary>
    where
        F: FnMut(&ProvenanceRecord),
    {
        let mut records = Vec::new();
        while let Some(record) = self.records.recv().await {
            on_record(&record);
            records.push(record);
        }

        for stage in self.stages {
            stage.await?;
        }

        let summary = RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            output_root: self.output_root,
            stages: self
                .counters
                .iter()
                .map(|(name, counters)| counters.snapshot(name))
                .collect(),
            records,
        };
        info!(
            maps = summary.maps_extracted(),
            files = summary.files_written(),
            "pipeline finished"
        );
        Ok(summary)
    }
}
