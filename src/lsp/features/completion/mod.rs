//! Context-aware code completion for Phel
//!
//! This module provides:
//! - Classification of the cursor's syntactic position (`context`)
//! - Candidate production per position kind (`indexing`, `namespace`)
//! - The built-in API catalog and LSP item conversion (`dictionary`)
//! - Priority tiers and the stable ranking pass (`ranking`)
//! - Memoization and usage counting shared between requests (`cache`)
//! - The request pipeline tying it together (`engine`)

pub mod cache;
pub mod context;
pub mod dictionary;
pub mod engine;
pub mod indexing;
pub mod namespace;
pub mod ranking;

pub use cache::{CacheStats, CompletionCache};
pub use context::{CompletionContext, CursorPosition, PositionClassifier, PositionKind};
pub use dictionary::{Candidate, InsertionBehavior, TemplateKind};
pub use engine::{CompletionEngine, completion_items};
pub use namespace::NamespaceClause;
pub use ranking::{Priority, RankingCriteria, rank};
