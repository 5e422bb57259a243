//! The mutable raster that flows through an effect chain.
//!
//! A [`Raster`] owns two pixel planes of identical geometry. Every filter reads
//! the `input` plane and writes the `output` plane; between chained filters
//! the planes are swapped so the next filter sees the previous result without
//! copying pixel data.
//!
//! Channels are stored as 16-bit RGBA regardless of the source depth. The
//! depth the raster was decoded from is remembered so it can be written back
//! the same way.

use image::{DynamicImage, ImageBuffer, Rgba};

/// One pixel plane: 16-bit RGBA, row-major, no padding between rows.
pub type Plane = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// Number of subpixels per pixel.
pub const CHANNELS: usize = 4;

/// Largest value a channel can hold.
pub const CHANNEL_MAX: f64 = u16::MAX as f64;

/// Bit depth of the image a raster was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 8 bits per channel
    #[default]
    Eight,
    /// 16 bits per channel
    Sixteen,
}

/// Double-buffered image used by every effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    input: Plane,
    output: Plane,
    depth: BitDepth,
}

impl Raster {
    /// Create a fully transparent black raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_plane(Plane::new(width, height))
    }

    /// Create a raster whose planes both start out as `plane`.
    ///
    /// Seeding the output plane with the source pixels means a raster saved
    /// without running any effect reproduces its source.
    pub fn from_plane(plane: Plane) -> Self {
        Self {
            output: plane.clone(),
            input: plane,
            depth: BitDepth::Sixteen,
        }
    }

    /// Build a raster by evaluating `f` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: FnMut(u32, u32) -> Rgba<u16>,
    {
        Self::from_plane(ImageBuffer::from_fn(width, height, f))
    }

    /// Convert a decoded image, remembering its channel depth.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let color = image.color();
        let bits = color.bits_per_pixel() / u16::from(color.channel_count());
        let depth = if bits > 8 {
            BitDepth::Sixteen
        } else {
            BitDepth::Eight
        };
        Self::from_plane(image.into_rgba16()).with_depth(depth)
    }

    /// Override the depth used when the raster is encoded.
    pub fn with_depth(mut self, depth: BitDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.input.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.input.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.input.dimensions()
    }

    /// Whether the raster has no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Number of subpixels in one row of either plane.
    pub fn row_stride(&self) -> usize {
        self.width() as usize * CHANNELS
    }

    /// Source bit depth.
    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    /// The plane filters read from.
    pub fn input(&self) -> &Plane {
        &self.input
    }

    /// The plane filters write to.
    pub fn output(&self) -> &Plane {
        &self.output
    }

    /// Borrow the input plane for reading and the output plane for writing.
    pub fn planes_mut(&mut self) -> (&Plane, &mut Plane) {
        (&self.input, &mut self.output)
    }

    /// Make the last result the input of the next filter.
    pub fn swap_planes(&mut self) {
        std::mem::swap(&mut self.input, &mut self.output);
    }

    /// Copy the input plane into the output plane unchanged.
    pub fn pass_through(&mut self) {
        self.output.copy_from_slice(&self.input);
    }

    /// The output plane as an encodable image at the source depth.
    pub fn to_dynamic(&self) -> DynamicImage {
        let image = DynamicImage::ImageRgba16(self.output.clone());
        match self.depth {
            BitDepth::Sixteen => image,
            BitDepth::Eight => DynamicImage::ImageRgba8(image.into_rgba8()),
        }
    }
}
