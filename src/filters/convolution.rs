//! 3x3 stencil filters: Sharpen, Edge Detect, Blur.
//!
//! All three share [`convolve`]. The kernel is applied flipped horizontally
//! and vertically (true discrete convolution), neighbours outside the image
//! contribute zero, and alpha is copied from the centre pixel.

use crate::core::raster::{Plane, CHANNELS, CHANNEL_MAX};

/// Rows/columns a 3x3 stencil reaches beyond the centre pixel.
pub const KERNEL_HALF_WIDTH: u32 = 1;

/// A fixed 3x3 weight matrix, indexed `[row][column]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilKernel {
    weights: [[f64; 3]; 3],
}

impl StencilKernel {
    /// Laplacian sharpen.
    pub const SHARPEN: StencilKernel = StencilKernel::new([
        [0.0, -1.0, 0.0],
        [-1.0, 5.0, -1.0],
        [0.0, -1.0, 0.0],
    ]);

    /// Eight-neighbour edge detector.
    pub const EDGE_DETECT: StencilKernel = StencilKernel::new([
        [-1.0, -1.0, -1.0],
        [-1.0, 8.0, -1.0],
        [-1.0, -1.0, -1.0],
    ]);

    /// Box blur.
    pub const BLUR: StencilKernel = StencilKernel::new([
        [1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0],
        [1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0],
        [1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0],
    ]);

    /// Create a kernel from its weights.
    pub const fn new(weights: [[f64; 3]; 3]) -> Self {
        Self { weights }
    }

    /// The unflipped weights.
    pub fn weights(&self) -> &[[f64; 3]; 3] {
        &self.weights
    }

    /// Weight applied to the neighbour at offset `(ky - 1, kx - 1)`.
    #[inline]
    pub fn flipped(&self, ky: usize, kx: usize) -> f64 {
        self.weights[2 - ky][2 - kx]
    }

    /// Half-width of the stencil.
    pub fn half_width(&self) -> u32 {
        KERNEL_HALF_WIDTH
    }
}

/// Clamp an accumulated channel into range, truncating the fraction.
#[inline]
pub(crate) fn clamp_channel(value: f64) -> u16 {
    value.clamp(0.0, CHANNEL_MAX) as u16
}

/// Convolve `input` with `kernel` into `output`.
///
/// Both planes must have the same dimensions.
pub fn convolve(input: &Plane, output: &mut Plane, kernel: &StencilKernel) {
    let (width, height) = input.dimensions();
    debug_assert_eq!(output.dimensions(), (width, height));

    let src: &[u16] = input;
    let dst: &mut [u16] = output;
    let (w, h) = (i64::from(width), i64::from(height));

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f64; 3];
            for ky in 0..3 {
                let ny = y + ky as i64 - 1;
                if ny < 0 || ny >= h {
                    continue;
                }
                for kx in 0..3 {
                    let nx = x + kx as i64 - 1;
                    if nx < 0 || nx >= w {
                        continue;
                    }
                    let weight = kernel.flipped(ky, kx);
                    let i = (ny * w + nx) as usize * CHANNELS;
                    acc[0] += weight * f64::from(src[i]);
                    acc[1] += weight * f64::from(src[i + 1]);
                    acc[2] += weight * f64::from(src[i + 2]);
                }
            }

            let o = (y * w + x) as usize * CHANNELS;
            dst[o] = clamp_channel(acc[0]);
            dst[o + 1] = clamp_channel(acc[1]);
            dst[o + 2] = clamp_channel(acc[2]);
            dst[o + 3] = src[o + 3];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn uniform(width: u32, height: u32, value: u16, alpha: u16) -> Plane {
        ImageBuffer::from_pixel(width, height, Rgba([value, value, value, alpha]))
    }

    fn run(input: &Plane, kernel: &StencilKernel) -> Plane {
        let mut output = Plane::new(input.width(), input.height());
        convolve(input, &mut output, kernel);
        output
    }

    #[test]
    fn test_kernels_are_transpose_symmetric() {
        for kernel in [StencilKernel::SHARPEN, StencilKernel::EDGE_DETECT, StencilKernel::BLUR] {
            let w = kernel.weights();
            for r in 0..3 {
                for c in 0..3 {
                    assert_eq!(w[r][c], w[c][r]);
                }
            }
        }
    }

    #[test]
    fn test_sharpen_flat_interior_is_identity() {
        let input = uniform(5, 5, 1000, 42);
        let output = run(&input, &StencilKernel::SHARPEN);
        assert_eq!(*output.get_pixel(2, 2), Rgba([1000, 1000, 1000, 42]));
    }

    #[test]
    fn test_zero_padding_at_corners() {
        let input = uniform(3, 3, 1000, 7);
        let output = run(&input, &StencilKernel::SHARPEN);
        // Corner: 5 * 1000 - two in-bounds neighbours.
        assert_eq!(output.get_pixel(0, 0)[0], 3000);
        // Edge: three in-bounds neighbours.
        assert_eq!(output.get_pixel(1, 0)[0], 2000);
        assert_eq!(output.get_pixel(1, 1)[0], 1000);
    }

    #[test]
    fn test_edge_detect_clamps() {
        let input = uniform(3, 3, 1000, 7);
        let output = run(&input, &StencilKernel::EDGE_DETECT);
        // Interior of a flat image has no edges.
        assert_eq!(output.get_pixel(1, 1)[0], 0);
        // Corner: 8000 - 3000.
        assert_eq!(output.get_pixel(0, 0)[0], 5000);

        let bright = uniform(1, 1, 60000, 1);
        let output = run(&bright, &StencilKernel::EDGE_DETECT);
        assert_eq!(*output.get_pixel(0, 0), Rgba([u16::MAX, u16::MAX, u16::MAX, 1]));
    }

    #[test]
    fn test_tiny_images_do_not_fault() {
        for (w, h) in [(1, 1), (2, 2), (1, 3), (3, 1)] {
            let input = uniform(w, h, 900, 5);
            for kernel in [StencilKernel::SHARPEN, StencilKernel::EDGE_DETECT, StencilKernel::BLUR] {
                let output = run(&input, &kernel);
                assert_eq!(output.dimensions(), (w, h));
                assert!(output.pixels().all(|p| p[3] == 5));
            }
        }
    }

    #[test]
    fn test_two_by_two_blur() {
        let input = uniform(2, 2, 900, 5);
        let output = run(&input, &StencilKernel::BLUR);
        // Every pixel sees four in-bounds neighbours (itself included).
        for pixel in output.pixels() {
            assert!((399..=400).contains(&pixel[0]), "got {}", pixel[0]);
        }
    }

    #[test]
    fn test_alpha_comes_from_centre() {
        let input = ImageBuffer::from_fn(3, 3, |x, y| Rgba([500, 500, 500, (x + 3 * y) as u16]));
        let output = run(&input, &StencilKernel::BLUR);
        for (x, y, pixel) in output.enumerate_pixels() {
            assert_eq!(pixel[3], (x + 3 * y) as u16);
        }
    }

    #[test]
    fn test_kernel_rows_map_to_image_rows() {
        // Only the weight below the centre is non-zero; after flipping, each
        // output pixel takes the value of the pixel above it.
        let kernel = StencilKernel::new([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let input = ImageBuffer::from_fn(4, 3, |x, y| Rgba([(10 * y + x) as u16, 0, 0, 1]));
        let output = run(&input, &kernel);

        for x in 0..4 {
            assert_eq!(output.get_pixel(x, 0)[0], 0);
            assert_eq!(output.get_pixel(x, 1)[0], x as u16);
            assert_eq!(output.get_pixel(x, 2)[0], (10 + x) as u16);
        }
    }

    #[test]
    fn test_clamp_channel() {
        assert_eq!(clamp_channel(-5.0), 0);
        assert_eq!(clamp_channel(70000.0), u16::MAX);
        assert_eq!(clamp_channel(12.9), 12);
    }
}
