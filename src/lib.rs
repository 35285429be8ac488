pub mod config;
pub mod errors;
pub mod ir;
pub mod logging;
pub mod lsp;
pub mod workspace;

pub use config::CompletionConfig;
pub use errors::{CompletionError, CompletionResult};
pub use lsp::features::completion::{Candidate, CompletionEngine, PositionKind};
