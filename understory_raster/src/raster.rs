// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The raster item and its buffer lifecycle.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Rect, Size};
use log::{debug, trace};
use peniko::{ImageData, ImageQuality};

use crate::{DrawContext, Image, PixelsRef, PooledSurface, RasterError, Surface, SurfacePool};

/// Reference resolution for [`Raster::ppi`], in points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// The authoritative pixel source of a [`Raster`].
///
/// A raster holds exactly one of these at a time. Replacing a `Surface`
/// buffer returns the old surface to its pool.
#[derive(Clone, Debug)]
pub enum Buffer<S> {
    /// An immutable decoded image.
    Image(Image),
    /// A mutable drawing surface owned by the raster.
    Surface(S),
}

impl<S: Surface> Buffer<S> {
    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        match self {
            Self::Image(image) => image.width(),
            Self::Surface(surface) => surface.width(),
        }
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        match self {
            Self::Image(image) => image.height(),
            Self::Surface(surface) => surface.height(),
        }
    }

    /// Borrow the pixels of whichever source is current.
    #[inline]
    pub fn pixels(&self) -> PixelsRef<'_> {
        match self {
            Self::Image(image) => image.pixels(),
            Self::Surface(surface) => surface.pixels(),
        }
    }

    /// Returns `true` if the buffer is a drawable surface.
    #[inline]
    pub fn is_surface(&self) -> bool {
        matches!(self, Self::Surface(_))
    }
}

impl<S> From<Image> for Buffer<S> {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

/// A raster image placed in a 2D scene.
///
/// The raster is centered on its own local origin: its pixels cover
/// `(-width / 2, -height / 2)` to `(width / 2, height / 2)` before
/// [`transform`](Self::transform) maps them into the parent space.
///
/// Operations that need new surfaces take the [`SurfacePool`] to draw them
/// from. Any surface the raster holds, including one passed to
/// [`from_surface`](Self::from_surface) or [`set_canvas`](Self::set_canvas),
/// is owned by the raster and goes back to the pool when it is replaced or
/// when the raster is [disposed](Self::dispose).
#[derive(Clone, Debug)]
pub struct Raster<S> {
    pub(crate) buffer: Buffer<S>,
    bounds: Rect,
    pub(crate) transform: Affine,
    pub(crate) quality: ImageQuality,
}

impl<S: Surface> Raster<S> {
    /// Create a raster from an image or surface.
    ///
    /// Fails with [`RasterError::InvalidSource`] if the source has a zero
    /// dimension or its pixel data does not match its dimensions.
    pub fn new(source: impl Into<Buffer<S>>) -> Result<Self, RasterError> {
        let buffer = source.into();
        let pixels = buffer.pixels();
        if pixels.is_empty() || PixelsRef::new(pixels.width, pixels.height, pixels.data).is_none()
        {
            return Err(RasterError::InvalidSource);
        }
        let size = Size::new(f64::from(pixels.width), f64::from(pixels.height));
        let bounds = Rect::from_origin_size(Point::new(-size.width / 2., -size.height / 2.), size);
        Ok(Self {
            buffer,
            bounds,
            transform: Affine::IDENTITY,
            quality: ImageQuality::Medium,
        })
    }

    /// Create a raster backed by an immutable image.
    pub fn from_image(image: Image) -> Result<Self, RasterError> {
        Self::new(Buffer::Image(image))
    }

    /// Create a raster backed by a peniko image, converting it if needed.
    pub fn from_image_data(image: &ImageData) -> Result<Self, RasterError> {
        Self::from_image(Image::from_image_data(image)?)
    }

    /// Create a raster that takes ownership of `surface`.
    pub fn from_surface(surface: S) -> Result<Self, RasterError> {
        Self::new(Buffer::Surface(surface))
    }

    /// Logical size in pixels.
    #[inline]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Bounding box in local space.
    ///
    /// Computed at construction and updated by
    /// [`transform_content`](Self::transform_content).
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Transform from local space to parent space.
    #[inline]
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Filter used when resizing, extracting sub-images, and sampling.
    #[inline]
    pub fn resample_quality(&self) -> ImageQuality {
        self.quality
    }

    /// Pin the resampling filter: [`ImageQuality::Low`] is nearest-neighbor,
    /// `Medium` and `High` are bilinear.
    pub fn set_resample_quality(&mut self, quality: ImageQuality) {
        self.quality = quality;
    }

    /// The current pixel source.
    #[inline]
    pub fn image(&self) -> &Buffer<S> {
        &self.buffer
    }

    /// Resample the raster to `width` x `height` pixels.
    ///
    /// The current pixels are scaled into a fresh surface from `pool`, which
    /// becomes the raster's buffer; a previously held surface is returned to
    /// `pool`.
    pub fn set_size<P>(&mut self, pool: &P, width: u32, height: u32) -> Result<(), RasterError>
    where
        P: SurfacePool<Surface = S> + ?Sized,
    {
        let mut next = PooledSurface::acquire(pool, width, height)?;
        {
            let source = self.buffer.pixels();
            let ctx = next.context();
            ctx.save();
            ctx.set_image_quality(self.quality);
            ctx.draw_image(
                source,
                source.bounds(),
                Rect::new(0., 0., f64::from(width), f64::from(height)),
            );
            ctx.restore();
        }
        debug!(
            "raster resized from {}x{} to {width}x{height}",
            self.width(),
            self.height()
        );
        self.replace_buffer(pool, Buffer::Surface(next.into_inner()));
        Ok(())
    }

    /// Returns the raster's drawing surface, first copying an image-backed
    /// raster into a surface from `pool`.
    pub fn canvas<P>(&mut self, pool: &P) -> Result<&mut S, RasterError>
    where
        P: SurfacePool<Surface = S> + ?Sized,
    {
        if let Buffer::Image(image) = &self.buffer {
            let mut surface = PooledSurface::acquire(pool, image.width(), image.height())?;
            let pixels = image.pixels();
            surface
                .context()
                .draw_image(pixels, pixels.bounds(), pixels.bounds());
            debug!(
                "raster promoted {}x{} image to a surface",
                pixels.width, pixels.height
            );
            self.buffer = Buffer::Surface(surface.into_inner());
        }
        match &mut self.buffer {
            Buffer::Surface(surface) => Ok(surface),
            Buffer::Image(_) => Err(RasterError::NoDrawableSurface),
        }
    }

    /// Install `surface` as the raster's buffer, returning any previously
    /// held surface to `pool`.
    pub fn set_canvas<P>(&mut self, pool: &P, surface: S) -> Result<(), RasterError>
    where
        P: SurfacePool<Surface = S> + ?Sized,
    {
        if surface.pixels().is_empty() {
            return Err(RasterError::InvalidSource);
        }
        debug!(
            "raster canvas replaced with {}x{} surface",
            surface.width(),
            surface.height()
        );
        self.replace_buffer(pool, Buffer::Surface(surface));
        Ok(())
    }

    /// Apply `matrix` to the raster's content.
    ///
    /// `matrix` is composed so that it applies before the existing transform,
    /// and the local bounds are replaced by the axis-aligned box enclosing the
    /// transformed corners.
    pub fn transform_content(&mut self, matrix: Affine) {
        self.transform *= matrix;
        self.bounds = matrix.transform_rect_bbox(self.bounds);
    }

    /// Copy `rect` (in pixel space) into a new surface from `pool`.
    ///
    /// The surface is sized to `rect`, rounded up to whole pixels. The caller
    /// owns it and is responsible for returning it to the pool.
    pub fn sub_image<P>(&self, pool: &P, rect: Rect) -> Result<P::Surface, RasterError>
    where
        P: SurfacePool + ?Sized,
    {
        let (width, height) = surface_extent(rect.abs().size());
        let mut sub = PooledSurface::acquire(pool, width, height)?;
        let dst = Rect::new(0., 0., f64::from(width), f64::from(height));
        let src = Rect::from_origin_size(rect.abs().origin(), dst.size());
        let ctx = sub.context();
        ctx.set_image_quality(self.quality);
        ctx.draw_image(self.buffer.pixels(), src, dst);
        Ok(sub.into_inner())
    }

    /// Blit `image` into the raster's surface with its top-left at `at`
    /// (pixel space).
    pub fn draw_image(&mut self, image: PixelsRef<'_>, at: Point) -> Result<(), RasterError> {
        let Buffer::Surface(surface) = &mut self.buffer else {
            return Err(RasterError::NoDrawableSurface);
        };
        let dst = Rect::from_origin_size(at, image.bounds().size());
        surface.context().draw_image(image, image.bounds(), dst);
        Ok(())
    }

    /// Draw the raster into `ctx` under its transform, centered on the local
    /// origin. The context state is restored afterwards.
    pub fn draw<C: DrawContext + ?Sized>(&self, ctx: &mut C) {
        ctx.save();
        ctx.transform(self.transform);
        let pixels = self.buffer.pixels();
        ctx.draw_image(pixels, pixels.bounds(), self.centered_rect());
        ctx.restore();
    }

    /// Effective pixels per inch along each local axis at the current
    /// transform.
    pub fn ppi(&self) -> Size {
        let origin = self.transform * Point::ZERO;
        let u = self.transform * Point::new(1., 0.) - origin;
        let v = self.transform * Point::new(0., 1.) - origin;
        Size::new(POINTS_PER_INCH / u.hypot(), POINTS_PER_INCH / v.hypot())
    }

    /// Consume the raster, returning a held surface to `pool`.
    pub fn dispose<P>(self, pool: &P)
    where
        P: SurfacePool<Surface = S> + ?Sized,
    {
        if let Buffer::Surface(surface) = self.buffer {
            trace!("raster disposed, returning surface");
            pool.release(surface);
        }
    }

    /// Consume the raster, handing its buffer to the caller.
    pub fn into_buffer(self) -> Buffer<S> {
        self.buffer
    }

    /// The pixel rectangle in local space, centered on the origin.
    pub(crate) fn centered_rect(&self) -> Rect {
        let size = self.size();
        Rect::from_origin_size(Point::new(-size.width / 2., -size.height / 2.), size)
    }

    fn replace_buffer<P>(&mut self, pool: &P, buffer: Buffer<S>)
    where
        P: SurfacePool<Surface = S> + ?Sized,
    {
        if let Buffer::Surface(previous) = core::mem::replace(&mut self.buffer, buffer) {
            trace!("returning replaced raster surface to pool");
            pool.release(previous);
        }
    }
}

/// Whole-pixel surface dimensions covering `size`, rounding up and never
/// smaller than one pixel.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "values are clamped to [1, u32::MAX] before casting"
)]
pub(crate) fn surface_extent(size: Size) -> (u32, u32) {
    let extent = |v: f64| {
        if v.is_finite() {
            v.ceil().clamp(1., f64::from(u32::MAX)) as u32
        } else {
            1
        }
    };
    (extent(size.width), extent(size.height))
}
