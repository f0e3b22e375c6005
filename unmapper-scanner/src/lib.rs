pub mod config;
pub mod error;
pub mod http;
pub mod locator;
pub mod maps;
pub mod page;
pub mod pipeline;
pub mod provenance;
pub mod result;
pub mod sanitize;
pub mod script;
pub mod sourcemap;
pub mod stage;
pub mod target;
pub mod visited;

pub use config::PipelineConfig;
pub use error::{Result, ScanError};
pub use pipeline::{Pipeline, RunningPipeline, Seeder};
pub use result::{ProvenanceRecord, RunSummary, StageStats};
pub use sourcemap::SourceMapDocument;
pub use target::CrawlTarget;
