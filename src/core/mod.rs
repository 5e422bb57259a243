//! Core types for the rastermill pipeline.
//!
//! This module contains the foundational pieces every stage shares:
//! - Double-buffered rasters and row-slice geometry
//! - Raster storage backends
//! - Run configuration
//! - Error types

pub mod config;
pub mod error;
pub mod raster;
pub mod region;
pub mod store;

// Re-export commonly used types
pub use config::EditorConfig;
pub use error::{EditorError, EditorResult, TaskError};
pub use raster::{BitDepth, Plane, Raster};
pub use region::{RowBand, RowBands, RowSlice, SpatialExtent};
pub use store::{FileStore, MemoryStore, RasterStore};
