//! # Rastermill - Batch Image Filtering
//!
//! Rastermill applies chains of image effects to a stream of tasks. Each task
//! names a source image, a destination and an ordered list of effect codes.
//!
//! ## Features
//!
//! - **Task-level parallelism**: reader agents pull batches of tasks from a
//!   shared stream and process them on worker threads
//! - **Row-slice parallelism**: every effect is split into horizontal bands
//!   computed in parallel, with margins so results match a whole-image pass
//! - **16-bit pipeline**: pixels are processed as RGBA with 16-bit channels
//!   and saved back at the source's bit depth
//! - **Pluggable storage**: the pipeline loads and saves through the
//!   [`RasterStore`](core::store::RasterStore) trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rastermill::prelude::*;
//!
//! let tasks = r#"{"inPath": "in.png", "outPath": "out.png", "effects": ["S", "B"]}"#;
//! let source = TaskSource::from_slice(tasks.as_bytes());
//!
//! let config = EditorConfig::new().with_threads(8);
//! let orchestrator = Orchestrator::new(config, FileStore::new())?;
//! let summary = orchestrator.run(&source)?;
//! println!("{} tasks processed", summary.tasks_processed);
//! ```
//!
//! ## Effects
//!
//! | Code | Effect |
//! |------|--------|
//! | `G`  | Grayscale (channel mean, alpha kept) |
//! | `S`  | 3x3 sharpen |
//! | `E`  | 3x3 edge detection |
//! | `B`  | 3x3 box blur |
//!
//! Unrecognized codes are logged and leave the image unchanged.
//!
//! ## Architecture
//!
//! - [`core`]: rasters, row-slice geometry, storage, configuration, errors
//! - [`tasks`]: task records and the shared task stream
//! - [`filters`]: effect codes and the per-pixel effect kernels
//! - [`execution`]: orchestrator, effect-chain runner and decomposer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod filters;
pub mod tasks;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use rastermill::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::config::EditorConfig;
    pub use crate::core::error::{EditorError, EditorResult, TaskError};
    pub use crate::core::raster::{BitDepth, Plane, Raster};
    pub use crate::core::region::{RowBand, RowBands, RowSlice, SpatialExtent};
    pub use crate::core::store::{FileStore, MemoryStore, RasterStore};

    // Tasks
    pub use crate::tasks::{TaskRecord, TaskSource};

    // Filters
    pub use crate::filters::{EffectCode, EffectEngine, EffectOutcome, StencilKernel, UnknownEffect};

    // Execution
    pub use crate::execution::chain::{ChainReport, EffectChainRunner};
    pub use crate::execution::decomposer::SubImageDecomposer;
    pub use crate::execution::orchestrator::{Orchestrator, RunSummary};
    pub use crate::execution::progress::{
        CancellationToken, ProgressCallback, ProgressTracker, ProgressUpdate,
    };
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
