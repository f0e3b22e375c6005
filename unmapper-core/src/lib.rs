pub mod extract;
pub mod report;
pub mod seed;

pub use extract::{ExtractOptions, ExtractOutcome, ExtractProgressCallback, execute_extract};
pub use report::{ReportFormat, generate_report};
pub use seed::{SeedSource, SeedStats};
