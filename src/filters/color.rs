//! Point operations.

use crate::core::raster::{Plane, CHANNELS};
use crate::filters::convolution::clamp_channel;

/// Replace R, G and B with their mean; alpha is preserved.
pub fn grayscale(input: &Plane, output: &mut Plane) {
    debug_assert_eq!(input.dimensions(), output.dimensions());

    let src: &[u16] = input;
    let dst: &mut [u16] = output;
    for (from, to) in src.chunks_exact(CHANNELS).zip(dst.chunks_exact_mut(CHANNELS)) {
        let sum = u32::from(from[0]) + u32::from(from[1]) + u32::from(from[2]);
        let gray = clamp_channel(f64::from(sum) / 3.0);
        to[0] = gray;
        to[1] = gray;
        to[2] = gray;
        to[3] = from[3];
    }
}
