//! witr-core: launch-origin detection and risk warnings
//!
//! Answers "why is this process running, and is anything about it
//! suspicious?" for an already-collected snapshot of processes. Nothing here
//! talks to the operating system; a collector hands over [`Process`] records
//! and the engines work on them as pure functions.
//!
//! # Modules
//!
//! - [`models`] - Core data structures (Process, SourceInfo, Finding, etc.)
//! - [`source`] - Launch-origin detection over a process ancestry
//! - [`bind`] - Wildcard listen-address classification
//! - [`warnings`] - Rule-based risk warnings
//! - [`snapshot`] - Loading collector output
//! - [`report`] - The Report struct that aggregates analysis results
//! - [`render`] - Output formatters (human, tree, short, JSON)
//!
//! # Example
//!
//! ```
//! use witr_core::{detect, warnings, Process, SourceKind};
//!
//! let ancestry = vec![Process::new(1, "bash"), Process::new(42, "myapp")];
//! assert_eq!(detect(&ancestry).kind, SourceKind::Shell);
//! assert!(warnings(&ancestry).is_empty());
//! ```

pub mod bind;
pub mod error;
pub mod models;
pub mod render;
pub mod report;
pub mod snapshot;
pub mod source;
pub mod warnings;

// Re-export commonly used types at crate root
pub use bind::is_public_bind;
pub use error::{WitrError, WitrResult};
pub use models::{Finding, Health, Process, RiskKind, SourceInfo, SourceKind};
pub use report::Report;
pub use snapshot::Snapshot;
pub use source::{detect, LauncherTable, DEFAULT_LAUNCHERS};
pub use warnings::{warnings, IdentityMatch, WarningEngine, WarningPolicy};
