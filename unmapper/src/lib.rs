pub mod commands;
// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use commands::command_argument_builder;
pub use handlers::{build_config, handle_extract, init_logging, resolve_seed_source};
