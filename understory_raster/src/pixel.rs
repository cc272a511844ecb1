// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pixel reads and writes.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Point;
use peniko::Color;

use crate::{Buffer, DrawContext, Raster, RasterError, Surface};

/// A color to write with [`Raster::set_pixel`].
///
/// Channels are in `[0, 1]`. When `alpha` is `None` the written pixel is
/// fully opaque.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelColor {
    /// Red channel.
    pub red: f32,
    /// Green channel.
    pub green: f32,
    /// Blue channel.
    pub blue: f32,
    /// Alpha channel, or `None` to write an opaque pixel.
    pub alpha: Option<f32>,
}

impl PixelColor {
    /// An opaque color.
    #[inline]
    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: None,
        }
    }

    /// A color with explicit alpha.
    #[inline]
    pub const fn rgba(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: Some(alpha),
        }
    }

    /// The 8-bit channels written to a surface.
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
            self.alpha.map_or(u8::MAX, channel_to_u8),
        ]
    }
}

impl From<Color> for PixelColor {
    fn from(color: Color) -> Self {
        let [red, green, blue, alpha] = color.components;
        Self::rgba(red, green, blue, alpha)
    }
}

/// Convert a normalized channel into an 8-bit value, clamping to the valid
/// range.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the value is clamped to [0, 255] before casting"
)]
fn channel_to_u8(value: f32) -> u8 {
    (value * 255.).round().clamp(0., 255.) as u8
}

/// Index of the device pixel containing `v`.
#[allow(
    clippy::cast_possible_truncation,
    reason = "pixel coordinates saturate at the i32 range"
)]
pub(crate) fn pixel_index(v: f64) -> i32 {
    v.floor() as i32
}

/// The device pixel addressed by `point`, sampling pixel centers.
fn pixel_at(point: Point) -> (i32, i32) {
    (pixel_index(point.x + 0.5), pixel_index(point.y + 0.5))
}

pub(crate) fn color_from_rgba8(px: [u8; 4]) -> Color {
    Color::new(px.map(|c| f32::from(c) / 255.))
}

impl<S: Surface> Raster<S> {
    /// Returns the color of the pixel at `point` (pixel space, origin at the
    /// top-left pixel). Points outside the raster read as transparent black.
    pub fn get_pixel(&self, point: Point) -> Color {
        let (x, y) = pixel_at(point);
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return Color::TRANSPARENT;
        };
        color_from_rgba8(self.buffer.pixels().pixel(x, y))
    }

    /// Overwrite the pixel at `point` with `color`.
    ///
    /// A color without alpha writes a fully opaque pixel. The raster must be
    /// surface-backed; image-backed rasters fail with
    /// [`RasterError::NoDrawableSurface`] until promoted with
    /// [`canvas`](Self::canvas). Points outside the raster are ignored.
    pub fn set_pixel(
        &mut self,
        point: Point,
        color: impl Into<PixelColor>,
    ) -> Result<(), RasterError> {
        let Buffer::Surface(surface) = &mut self.buffer else {
            return Err(RasterError::NoDrawableSurface);
        };
        let (x, y) = pixel_at(point);
        let ctx = surface.context();
        let mut block = ctx.get_pixels(x, y, 1, 1);
        block.copy_from_slice(&color.into().to_rgba8());
        ctx.put_pixels(x, y, 1, 1, &block);
        Ok(())
    }
}
