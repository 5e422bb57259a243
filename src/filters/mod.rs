//! Filter module.
//!
//! Contains the effect codes understood in task records and the engine that
//! applies one effect to a raster.

pub mod color;
pub mod convolution;

pub use color::grayscale;
pub use convolution::{convolve, StencilKernel, KERNEL_HALF_WIDTH};

use crate::core::raster::Raster;
use crate::core::region::SpatialExtent;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The built-in effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectCode {
    /// `G`: channel mean
    Grayscale,
    /// `S`: 3x3 sharpen
    Sharpen,
    /// `E`: 3x3 edge detection
    EdgeDetect,
    /// `B`: 3x3 box blur
    Blur,
}

impl EffectCode {
    /// Every built-in effect.
    pub const ALL: [EffectCode; 4] = [
        EffectCode::Grayscale,
        EffectCode::Sharpen,
        EffectCode::EdgeDetect,
        EffectCode::Blur,
    ];

    /// Parse a task-record code; codes are single upper-case letters.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "G" => Some(EffectCode::Grayscale),
            "S" => Some(EffectCode::Sharpen),
            "E" => Some(EffectCode::EdgeDetect),
            "B" => Some(EffectCode::Blur),
            _ => None,
        }
    }

    /// The task-record code for this effect.
    pub fn code(&self) -> &'static str {
        match self {
            EffectCode::Grayscale => "G",
            EffectCode::Sharpen => "S",
            EffectCode::EdgeDetect => "E",
            EffectCode::Blur => "B",
        }
    }

    /// The stencil behind this effect, if it is one.
    pub fn kernel(&self) -> Option<&'static StencilKernel> {
        match self {
            EffectCode::Grayscale => None,
            EffectCode::Sharpen => Some(&StencilKernel::SHARPEN),
            EffectCode::EdgeDetect => Some(&StencilKernel::EDGE_DETECT),
            EffectCode::Blur => Some(&StencilKernel::BLUR),
        }
    }

    /// Neighbourhood the effect reads around each pixel.
    pub fn spatial_extent(&self) -> SpatialExtent {
        match self.kernel() {
            Some(kernel) => SpatialExtent::symmetric(kernel.half_width()),
            None => SpatialExtent::none(),
        }
    }
}

impl fmt::Display for EffectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when a task names an effect that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("effect command '{0}' not recognized")]
pub struct UnknownEffect(pub String);

impl FromStr for EffectCode {
    type Err = UnknownEffect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectCode::from_code(s).ok_or_else(|| UnknownEffect(s.to_string()))
    }
}

/// What happened to one step of an effect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    /// The effect ran.
    Applied(EffectCode),
    /// The code was not recognized; the raster passed through unchanged.
    Skipped(String),
}

/// Applies single effects to whole rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectEngine;

impl EffectEngine {
    /// Read the raster's input plane, write the effect into its output plane.
    pub fn apply(raster: &mut Raster, effect: EffectCode) {
        let (input, output) = raster.planes_mut();
        match effect.kernel() {
            Some(kernel) => convolve(input, output, kernel),
            None => color::grayscale(input, output),
        }
    }

    /// Apply the effect named by a task-record code.
    ///
    /// Unrecognized codes log a warning and copy input to output, so the
    /// chain continues from the unchanged raster.
    pub fn apply_code(raster: &mut Raster, code: &str) -> EffectOutcome {
        match code.parse::<EffectCode>() {
            Ok(effect) => {
                Self::apply(raster, effect);
                EffectOutcome::Applied(effect)
            }
            Err(unknown) => {
                log::warn!("{}", unknown);
                raster.pass_through();
                EffectOutcome::Skipped(unknown.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_code_round_trip() {
        for effect in EffectCode::ALL {
            assert_eq!(EffectCode::from_code(effect.code()), Some(effect));
            assert_eq!(effect.to_string().parse::<EffectCode>(), Ok(effect));
        }
    }

    #[test]
    fn test_codes_are_case_sensitive() {
        assert_eq!(EffectCode::from_code("g"), None);
        assert_eq!(
            "X".parse::<EffectCode>(),
            Err(UnknownEffect("X".to_string()))
        );
    }

    #[test]
    fn test_unknown_effect_is_an_error() {
        let error: Box<dyn std::error::Error> = Box::new(UnknownEffect("Q".to_string()));
        assert_eq!(error.to_string(), "effect command 'Q' not recognized");
    }

    #[test]
    fn test_spatial_extent() {
        assert!(!EffectCode::Grayscale.spatial_extent().needs_overlap());
        for effect in [EffectCode::Sharpen, EffectCode::EdgeDetect, EffectCode::Blur] {
            assert_eq!(effect.spatial_extent().vertical(), KERNEL_HALF_WIDTH);
        }
    }

    #[test]
    fn test_apply_grayscale() {
        let mut raster = Raster::from_fn(1, 1, |_, _| Rgba([300, 600, 900, 77]));
        EffectEngine::apply(&mut raster, EffectCode::Grayscale);
        assert_eq!(*raster.output().get_pixel(0, 0), Rgba([600, 600, 600, 77]));
        // Input is untouched.
        assert_eq!(*raster.input().get_pixel(0, 0), Rgba([300, 600, 900, 77]));
    }

    #[test]
    fn test_unknown_code_is_a_no_op() {
        let mut raster = Raster::from_fn(3, 2, |x, y| Rgba([x as u16, y as u16, 5, 6]));
        let before = raster.input().clone();
        // Scribble on the output so the pass-through is observable.
        raster.planes_mut().1.put_pixel(0, 0, Rgba([9, 9, 9, 9]));

        let outcome = EffectEngine::apply_code(&mut raster, "X");
        assert_eq!(outcome, EffectOutcome::Skipped("X".to_string()));
        assert_eq!(raster.output(), &before);
    }

    #[test]
    fn test_apply_code_known() {
        let mut raster = Raster::new(2, 2);
        assert_eq!(
            EffectEngine::apply_code(&mut raster, "E"),
            EffectOutcome::Applied(EffectCode::EdgeDetect)
        );
    }
}
