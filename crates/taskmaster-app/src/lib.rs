//! Application layer logic for taskmaster.
//!
//! This crate provides the optimistic client store, the remote boundary it
//! reconciles against, listing queries, configuration, and the validating
//! service façade shared by the CLI.

pub mod client_store;
pub mod config;
pub mod remote;
pub mod service;
pub mod task_query;

#[cfg(test)]
mod scripted_remote;

// Re-exports for convenience
pub use client_store::{ClientStore, StoreState, SyncError};
pub use config::{DataConfig, ProjectConfig, ViewConfig};
pub use remote::TaskRemote;
pub use service::{SubmitError, TaskService};
pub use task_query::{TaskQuery, TaskStats};
