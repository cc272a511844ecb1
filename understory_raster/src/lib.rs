// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_raster --heading-base-level=0

//! Understory Raster: raster image items for 2D scenes.
//!
//! A [`Raster`] wraps a pixel buffer, either an immutable decoded [`Image`]
//! or a mutable drawing [`Surface`], and positions it in a vector scene with
//! an affine transform. On top of that buffer it provides:
//!
//! - **Buffer lifecycle**: resizing by resampling ([`Raster::set_size`]),
//!   lazy promotion of an image to a drawable surface ([`Raster::canvas`]),
//!   surface replacement ([`Raster::set_canvas`]), sub-image extraction,
//!   and drawing into a target context under the raster's transform.
//! - **Pixel access**: [`Raster::get_pixel`] and [`Raster::set_pixel`].
//! - **Average-color sampling**: [`Raster::average_color`] over the whole
//!   raster, a rectangle, a point, or an arbitrary (compound) shape, with
//!   each pixel weighted by its opacity.
//!
//! The crate does not rasterize anything itself. Drawing goes through the
//! [`DrawContext`] of a [`Surface`], and temporary surfaces come from a
//! [`SurfacePool`]. `understory_raster_cpu` provides software implementations
//! of both.
//!
//! # Surface ownership
//!
//! A raster exclusively owns the surface it holds and returns it to the pool
//! when the surface is replaced or the raster is [disposed](Raster::dispose).
//! Temporary surfaces are wrapped in a [`PooledSurface`] guard, which returns
//! them to the pool on every exit path, including errors, unless ownership is
//! explicitly transferred.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_raster::{PixelColor, Raster, RasterError, SurfacePool};
//! use understory_raster_cpu::CpuSurfacePool;
//!
//! let pool = CpuSurfacePool::new();
//! let mut raster = Raster::from_surface(pool.acquire(4, 4)?)?;
//! raster.set_pixel(Point::new(0., 0.), PixelColor::rgb(1., 0., 0.))?;
//!
//! // Average over the raster's left half, in parent space. Transparent
//! // pixels carry no weight, so only the red pixel counts.
//! let average = raster.average_color(&pool, Rect::new(-2., -2., 0., 2.))?;
//! assert_eq!(average.map(|c| c.components), Some([1., 0., 0., 1.]));
//! raster.dispose(&pool);
//! # Ok::<(), RasterError>(())
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod error;
mod image;
mod pixel;
mod raster;
mod sample;
mod surface;

#[cfg(test)]
mod test_support;

pub use error::{PoolError, RasterError};
pub use image::{BYTES_PER_PIXEL, Image, PixelsRef, rgba8_len};
pub use pixel::PixelColor;
pub use raster::{Buffer, POINTS_PER_INCH, Raster};
pub use sample::{
    DEFAULT_GRID_SIZE, Region, SampleOptions, ShapeRegion, ShapeStyle, alpha_weighted_average,
};
pub use surface::{DrawContext, PooledSurface, Surface, SurfacePool};
