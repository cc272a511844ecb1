// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable decoded images and borrowed pixel views.

use alloc::vec::Vec;

use kurbo::Rect;
use peniko::{Blob, ImageAlphaType, ImageData, ImageFormat};

use crate::RasterError;

/// Number of bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Returns the byte length of a tightly packed `width` x `height` RGBA8 buffer,
/// or `None` on overflow.
#[inline]
pub fn rgba8_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// A borrowed view over tightly packed, straight-alpha RGBA8 pixels.
///
/// This is the source type for every blit in the drawing interfaces; both
/// [`Image`]s and [`Surface`](crate::Surface)s can produce one.
#[derive(Copy, Clone, Debug)]
pub struct PixelsRef<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major pixel bytes, `width * 4` bytes per row.
    pub data: &'a [u8],
}

impl<'a> PixelsRef<'a> {
    /// Create a view, returning `None` if `data` does not hold exactly
    /// `width * height` RGBA8 pixels.
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Option<Self> {
        (rgba8_len(width, height)? == data.len()).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// The full pixel rectangle `(0, 0, width, height)`.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the RGBA8 value at `(x, y)`, or transparent black when the
    /// coordinate lies outside the view.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        match self.data.get(idx..idx + BYTES_PER_PIXEL) {
            Some(px) => [px[0], px[1], px[2], px[3]],
            None => [0; 4],
        }
    }
}

/// Shared handle to an immutable decoded image.
///
/// Pixels are stored as straight-alpha RGBA8 in a reference-counted
/// [`Blob`], so cloning an `Image` never copies pixel data.
#[derive(Clone, Debug)]
pub struct Image {
    width: u32,
    height: u32,
    data: Blob<u8>,
}

impl Image {
    /// Create an image from straight-alpha RGBA8 bytes.
    ///
    /// Fails with [`RasterError::InvalidSource`] if a dimension is zero or
    /// the byte length does not match.
    pub fn new(width: u32, height: u32, data: impl Into<Blob<u8>>) -> Result<Self, RasterError> {
        let data = data.into();
        if width == 0 || height == 0 || rgba8_len(width, height) != Some(data.data().len()) {
            return Err(RasterError::InvalidSource);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a peniko image into a raster image.
    ///
    /// Straight-alpha RGBA8 data is shared without copying; BGRA8 and
    /// premultiplied data are converted.
    pub fn from_image_data(image: &ImageData) -> Result<Self, RasterError> {
        let premultiplied = matches!(image.alpha_type, ImageAlphaType::AlphaPremultiplied);
        let swap_red_blue = match image.format {
            ImageFormat::Rgba8 => false,
            ImageFormat::Bgra8 => true,
            #[allow(
                unreachable_patterns,
                reason = "peniko may grow formats we cannot convert"
            )]
            _ => return Err(RasterError::InvalidSource),
        };
        if !premultiplied && !swap_red_blue {
            return Self::new(image.width, image.height, image.data.clone());
        }

        let mut pixels: Vec<u8> = image.data.data().to_vec();
        for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            if swap_red_blue {
                px.swap(0, 2);
            }
            if premultiplied {
                let alpha = px[3];
                for channel in &mut px[..3] {
                    *channel = unpremultiply(*channel, alpha);
                }
            }
        }
        Self::new(image.width, image.height, pixels)
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Borrow the pixels.
    #[inline]
    pub fn pixels(&self) -> PixelsRef<'_> {
        PixelsRef {
            width: self.width,
            height: self.height,
            data: self.data.data(),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "the quotient is clamped to [0, 255] before casting"
)]
fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let value = (u32::from(channel) * 255 + u32::from(alpha) / 2) / u32::from(alpha);
    value.min(255) as u8
}
