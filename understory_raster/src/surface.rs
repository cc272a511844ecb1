// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing-surface interfaces consumed by [`Raster`](crate::Raster).
//!
//! These traits describe the collaborators a raster draws through. They are
//! deliberately close to a 2D canvas API: a [`DrawContext`] carries a
//! save/restore stack, a current transform, a clip, and can blit pixels or
//! read and write them back. A [`Surface`] owns a pixel buffer and its
//! context, and a [`SurfacePool`] hands out and reclaims surfaces.

use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};

use kurbo::{Affine, BezPath, Rect, Vec2};
use peniko::{Fill, ImageQuality};

use crate::{PixelsRef, RasterError};

/// Stateful drawing operations over a pixel buffer.
///
/// Geometry passed to drawing calls is mapped through the current transform
/// (CTM). Pixel reads and writes ([`get_pixels`](Self::get_pixels),
/// [`put_pixels`](Self::put_pixels)) address device pixels directly and
/// ignore the CTM and clip.
pub trait DrawContext {
    /// Push the current state (transform, clip, image quality).
    fn save(&mut self);

    /// Pop the most recently saved state. Unbalanced calls are ignored.
    fn restore(&mut self);

    /// Concatenate a translation onto the CTM.
    fn translate(&mut self, offset: Vec2) {
        self.transform(Affine::translate(offset));
    }

    /// Concatenate `affine` onto the CTM, so it applies before the existing
    /// transform.
    fn transform(&mut self, affine: Affine);

    /// Replace the CTM.
    fn set_transform(&mut self, affine: Affine);

    /// Intersect the current clip with the interior of `path` (in the current
    /// coordinate space), using `fill` to decide the interior of compound
    /// paths.
    fn clip(&mut self, path: &BezPath, fill: Fill);

    /// Select the filter used when blits scale their source.
    fn set_image_quality(&mut self, quality: ImageQuality);

    /// Draw the `src` rectangle of `image` into the `dst` rectangle of the
    /// current coordinate space, compositing source-over.
    fn draw_image(&mut self, image: PixelsRef<'_>, src: Rect, dst: Rect);

    /// Read a `width` x `height` block of straight-alpha RGBA8 pixels whose
    /// top-left device pixel is `(x, y)`. Pixels outside the surface read as
    /// transparent black.
    fn get_pixels(&self, x: i32, y: i32, width: u32, height: u32) -> Vec<u8>;

    /// Replace a `width` x `height` block of device pixels starting at
    /// `(x, y)`. Pixels outside the surface are dropped.
    fn put_pixels(&mut self, x: i32, y: i32, width: u32, height: u32, data: &[u8]);
}

/// A mutable pixel buffer with its own drawing context.
pub trait Surface {
    /// Drawing context bound to this surface.
    type Context: DrawContext;

    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Borrow the current pixels.
    fn pixels(&self) -> PixelsRef<'_>;

    /// The drawing context for this surface.
    ///
    /// Implementations create the context on first use and return the same
    /// one afterwards; it is dropped together with the surface.
    fn context(&mut self) -> &mut Self::Context;
}

/// Hands out reusable surfaces and takes them back.
///
/// Pools use shared references so several temporary surfaces can be held at
/// once; implementations keep their bookkeeping behind interior mutability.
pub trait SurfacePool {
    /// Surface type produced by this pool.
    type Surface: Surface;

    /// Acquire a zero-initialized surface of `width` x `height` pixels.
    fn acquire(&self, width: u32, height: u32) -> Result<Self::Surface, crate::PoolError>;

    /// Return a surface previously obtained from [`acquire`](Self::acquire).
    ///
    /// Each acquired surface must be released at most once.
    fn release(&self, surface: Self::Surface);
}

/// A surface on loan from a [`SurfacePool`].
///
/// The surface goes back to the pool when the guard is dropped, on every exit
/// path, unless ownership is taken with [`into_inner`](Self::into_inner).
pub struct PooledSurface<'p, P: SurfacePool + ?Sized> {
    pool: &'p P,
    surface: Option<P::Surface>,
}

impl<'p, P: SurfacePool + ?Sized> PooledSurface<'p, P> {
    /// Acquire a `width` x `height` surface from `pool`.
    pub fn acquire(pool: &'p P, width: u32, height: u32) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidSize { width, height });
        }
        let surface = pool.acquire(width, height)?;
        Ok(Self {
            pool,
            surface: Some(surface),
        })
    }

    /// Take the surface out of the guard; the caller becomes responsible for
    /// returning it to the pool.
    pub fn into_inner(mut self) -> P::Surface {
        self.surface
            .take()
            .expect("PooledSurface: surface is present until the guard is consumed")
    }
}

impl<P: SurfacePool + ?Sized> Deref for PooledSurface<'_, P> {
    type Target = P::Surface;

    fn deref(&self) -> &Self::Target {
        self.surface
            .as_ref()
            .expect("PooledSurface: surface is present until the guard is consumed")
    }
}

impl<P: SurfacePool + ?Sized> DerefMut for PooledSurface<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface
            .as_mut()
            .expect("PooledSurface: surface is present until the guard is consumed")
    }
}

impl<P: SurfacePool + ?Sized> Drop for PooledSurface<'_, P> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.pool.release(surface);
        }
    }
}

impl<P: SurfacePool + ?Sized> fmt::Debug for PooledSurface<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PooledSurface");
        if let Some(surface) = &self.surface {
            s.field("width", &surface.width())
                .field("height", &surface.height());
        }
        s.finish_non_exhaustive()
    }
}
