//! Row-slice decomposition of a single effect application.
//!
//! The raster's output plane is cut into disjoint row bands, one per worker.
//! Each worker copies its band plus a margin out of the shared read-only
//! input plane, runs the effect on that copy in isolation and writes back
//! only the band's own rows. Margin reads overlap between workers; writes
//! never do, which the borrow checker enforces through `par_chunks_mut`.

use crate::core::config::EditorConfig;
use crate::core::error::{EditorError, EditorResult};
use crate::core::raster::Raster;
use crate::core::region::{RowBands, RowSlice};
use crate::filters::{EffectCode, EffectEngine};
use rayon::prelude::*;

/// Applies effects using a fixed number of parallel row-slice workers.
pub struct SubImageDecomposer {
    threads: usize,
    min_margin: u32,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for SubImageDecomposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubImageDecomposer")
            .field("threads", &self.threads)
            .field("min_margin", &self.min_margin)
            .finish()
    }
}

impl SubImageDecomposer {
    /// Create a decomposer with its own pool of `threads` workers.
    pub fn new(threads: usize) -> EditorResult<Self> {
        if threads == 0 {
            return Err(EditorError::Config(
                "decomposition needs at least one thread".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("slice-{}", i))
            .build()
            .map_err(|e| EditorError::Config(format!("failed to build slice pool: {}", e)))?;
        Ok(Self {
            threads,
            min_margin: 0,
            pool,
        })
    }

    /// Create a decomposer from a run configuration.
    pub fn from_config(config: &EditorConfig) -> EditorResult<Self> {
        Ok(Self::new(config.threads)?.with_min_margin(config.slice_margin))
    }

    /// Carry at least `margin` rows around every slice.
    pub fn with_min_margin(mut self, margin: u32) -> Self {
        self.min_margin = margin;
        self
    }

    /// Number of row slices per effect.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Margin rows used for `effect`: its kernel half-width, or the
    /// configured minimum when that is larger.
    pub fn margin_for(&self, effect: EffectCode) -> u32 {
        effect.spatial_extent().vertical().max(self.min_margin)
    }

    /// Apply `effect` to `raster` and return once every slice has been merged.
    pub fn apply(&self, raster: &mut Raster, effect: EffectCode) -> EditorResult<()> {
        if raster.is_empty() {
            return Ok(());
        }

        let bands = RowBands::new(raster.height(), self.threads);
        let band_len = bands.band_height() as usize * raster.row_stride();
        let bands: Vec<_> = bands.collect();
        let margin = self.margin_for(effect);

        let (input, output) = raster.planes_mut();
        let output: &mut [u16] = output;

        self.pool.install(|| {
            output
                .par_chunks_mut(band_len)
                .zip(bands.par_iter())
                .try_for_each(|(rows, band)| {
                    let mut slice = RowSlice::extract(input, *band, margin)?;
                    EffectEngine::apply(slice.raster_mut(), effect);
                    slice.write_band(rows)
                })
        })
    }
}
