//! samsync core library.
//!
//! This crate provides the foundational components for one-directional
//! SAM.gov to SharePoint synchronization: configuration, the SAM.gov API
//! client, the SharePoint (Graph + REST) client, the opportunity field
//! transformer, and the sync orchestrator.

pub mod config;
pub mod errors;
pub mod sam;
pub mod sharepoint;
pub mod sync;
pub mod transform;

// Re-exports for convenience.
pub use config::AppConfig;
pub use sam::SamClient;
pub use sharepoint::SharePointClient;
pub use sync::{SyncOrchestrator, SyncStats};
