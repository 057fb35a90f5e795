//! Commentarium Common Library
//!
//! Shared code for the Commentarium gateway:
//! - Database models, the site store and migrations
//! - Embedding and LLM client abstractions
//! - Completion parsing and slug derivation
//! - Resource proxy client
//! - Error types, configuration, admin auth and metrics

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod proxy;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, SiteStore};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::Generator;
pub use proxy::ResourceProxy;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
