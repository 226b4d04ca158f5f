//! # DiscFit Engine - Backup Fitting Library
//!
//! A headless engine that decides which backup sets go onto which disc.
//! Designed as the foundation for multiple front ends (CLI, automation).
//!
//! ## Overview
//!
//! Given a table of items (identifier -> size in bytes) and a capacity, the
//! engine chooses a subset that fits. It features:
//! - Four greedy fit strategies: first, best, worst and alternate fit
//! - Multi-volume spanning with progress callbacks
//! - Media capacities, units and a safety cushion
//! - Per-volume checksum manifests and their verification
//! - TOML configuration
//!
//! ## Basic Usage
//!
//! ```no_run
//! use discfit_engine::{create_job, plan_job, run_job, FitAlgorithm, JobMode, MediaType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let capacity = discfit_engine::media::usable_capacity(MediaType::Cdr80.capacity_bytes(), 4.5)?;
//!
//! let mut job = create_job("/srv/backups", JobMode::Span, capacity, FitAlgorithm::WorstFit)?;
//! plan_job(&mut job)?;
//! run_job(&mut job, None)?;
//!
//! for (index, volume) in job.volumes.iter().enumerate() {
//!     println!("Disc {}: {} files", index + 1, volume.items.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The strategies also work on any identifier type directly:
//!
//! ```
//! use discfit_engine::{worst_fit, ItemTable};
//!
//! let items: ItemTable<&str> = vec![("a", 100), ("b", 100), ("c", 100)].into_iter().collect();
//! let result = worst_fit(&items, 250);
//! assert_eq!(result.items, vec!["a", "b"]);
//! assert_eq!(result.used, 200);
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (ItemTable, FitResult, SpanJob, enums)
//! - **error**: Error types and handling
//! - **fit**: The fit strategies
//! - **span**: Fitted lists and multi-volume spans
//! - **media**: Media capacities, units, cushion
//! - **fs_ops**: Size maps of directory trees
//! - **manifest**: Checksum manifests per volume
//! - **config**: TOML configuration
//! - **job**: Job orchestration (create, plan, run)
//! - **progress**: Progress callback trait

pub mod config;
pub mod error;
pub mod fit;
pub mod fs_ops;
pub mod job;
pub mod manifest;
pub mod media;
pub mod model;
pub mod progress;
pub mod span;

// Re-export main types and functions
pub use config::Config;
pub use error::EngineError;
pub use fit::{alternate_fit, best_fit, first_fit, worst_fit, FitAlgorithm, FitGoal};
pub use job::{create_job, plan_job, run_job};
pub use manifest::{ChecksumAlgorithm, ChecksumValue, VerifyOutcome};
pub use media::MediaType;
pub use model::{FitResult, Item, ItemKey, ItemTable, JobMode, JobState, SpanJob};
pub use progress::SpanProgress;
pub use span::{generate_fitted, generate_span, SpanItem};
