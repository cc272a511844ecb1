// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Average-color sampling over regions of a raster.
//!
//! Sampling captures the covered pixels into a temporary surface, scales that
//! capture down to a small fixed grid, and averages the grid with each pixel
//! weighted by its opacity. Fully transparent pixels therefore contribute
//! nothing, and a region with no opaque coverage has no average color.

use kurbo::{Affine, BezPath, Point, Rect, Shape};
use log::trace;
use peniko::{Brush, Color, Fill};

use crate::pixel::pixel_index;
use crate::raster::surface_extent;
use crate::{DrawContext, PooledSurface, Raster, RasterError, Surface, SurfacePool};

/// Default edge length of the downsampling grid.
pub const DEFAULT_GRID_SIZE: u32 = 32;

/// Read-back origin within the downsampling grid; the half-pixel offset keeps
/// reads on pixel centers.
const GRID_READ_ORIGIN: f64 = 0.5;

/// Options for [`Raster::average_color_with`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SampleOptions {
    /// Edge length in pixels of the square grid the region is scaled into
    /// before averaging. Values below one are treated as one.
    pub grid_size: u32,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

/// Presentation style of a [`ShapeRegion`].
///
/// Sampling only reads the fill rule; the paints are carried so a shape can
/// be shared with the code that renders it.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeStyle {
    /// Fill paint, if any.
    pub fill: Option<Brush>,
    /// Stroke paint, if any.
    pub stroke: Option<Brush>,
    /// Stroke width in local units.
    pub stroke_width: f64,
    /// Rule deciding the interior of compound paths.
    pub fill_rule: Fill,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            fill_rule: Fill::NonZero,
        }
    }
}

/// A closed path with a style, used to clip sampling.
#[derive(Clone, Debug, Default)]
pub struct ShapeRegion {
    /// Outline in the raster's parent space. May contain several subpaths.
    pub path: BezPath,
    /// Style of the shape.
    pub style: ShapeStyle,
}

impl ShapeRegion {
    /// Create a shape with the default style.
    pub fn new(path: BezPath) -> Self {
        Self {
            path,
            style: ShapeStyle::default(),
        }
    }

    /// Builder-style setter for the fill rule.
    #[must_use]
    pub fn with_fill_rule(mut self, fill_rule: Fill) -> Self {
        self.style.fill_rule = fill_rule;
        self
    }

    /// Bounding box of the path.
    pub fn bounds(&self) -> Rect {
        self.path.bounding_box()
    }
}

/// Area of a raster to average, in the raster's parent space.
#[derive(Copy, Clone, Debug, Default)]
pub enum Region<'a> {
    /// The entire raster, independent of its transform.
    #[default]
    Whole,
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// The one-pixel square centered on a point.
    Point(Point),
    /// The interior of a shape.
    Shape(&'a ShapeRegion),
}

impl Region<'_> {
    /// The rectangle a capture surface must cover, or `None` for
    /// [`Region::Whole`].
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Self::Whole => None,
            Self::Rect(rect) => Some(rect.abs()),
            Self::Point(pt) => Some(Rect::new(pt.x - 0.5, pt.y - 0.5, pt.x + 0.5, pt.y + 0.5)),
            Self::Shape(shape) => Some(shape.bounds()),
        }
    }

    fn shape(&self) -> Option<&ShapeRegion> {
        match self {
            Self::Shape(shape) => Some(shape),
            _ => None,
        }
    }
}

impl From<Rect> for Region<'_> {
    fn from(rect: Rect) -> Self {
        Self::Rect(rect)
    }
}

impl From<Point> for Region<'_> {
    fn from(pt: Point) -> Self {
        Self::Point(pt)
    }
}

impl<'a> From<&'a ShapeRegion> for Region<'a> {
    fn from(shape: &'a ShapeRegion) -> Self {
        Self::Shape(shape)
    }
}

impl<S: Surface> Raster<S> {
    /// Average color of `region`, weighting each pixel by its alpha.
    ///
    /// Returns `Ok(None)` when the region has no opaque coverage. Temporary
    /// surfaces come from `pool` and are returned before this call finishes,
    /// on success or failure.
    pub fn average_color<'r, P>(
        &self,
        pool: &P,
        region: impl Into<Region<'r>>,
    ) -> Result<Option<Color>, RasterError>
    where
        P: SurfacePool + ?Sized,
    {
        self.average_color_with(pool, region, SampleOptions::default())
    }

    /// [`average_color`](Self::average_color) with explicit options.
    pub fn average_color_with<'r, P>(
        &self,
        pool: &P,
        region: impl Into<Region<'r>>,
        options: SampleOptions,
    ) -> Result<Option<Color>, RasterError>
    where
        P: SurfacePool + ?Sized,
    {
        let region = region.into();
        let capture = match region.bounds() {
            Some(bounds) => Some(self.capture_region(pool, bounds, region.shape())?),
            None => None,
        };
        let source = capture
            .as_deref()
            .map_or_else(|| self.buffer.pixels(), Surface::pixels);

        let grid = options.grid_size.max(1);
        let mut samples = PooledSurface::acquire(pool, grid, grid)?;
        let ctx = samples.context();
        ctx.set_image_quality(self.quality);
        ctx.draw_image(
            source,
            source.bounds(),
            Rect::new(0., 0., f64::from(grid), f64::from(grid)),
        );
        let origin = pixel_index(GRID_READ_ORIGIN);
        let pixels = ctx.get_pixels(origin, origin, grid, grid);
        let color = alpha_weighted_average(&pixels);
        trace!(
            "sampled {}x{} source into {grid}x{grid} grid: {color:?}",
            source.width, source.height
        );
        Ok(color)
    }

    /// Render the part of the raster covered by `bounds` (clipped to `shape`)
    /// into a surface whose origin is the top-left of `bounds`.
    ///
    /// The shape only clips: its fill and stroke are never painted into the
    /// capture, so they cannot tint the average. Only its fill rule is read.
    fn capture_region<'p, P>(
        &self,
        pool: &'p P,
        bounds: Rect,
        shape: Option<&ShapeRegion>,
    ) -> Result<PooledSurface<'p, P>, RasterError>
    where
        P: SurfacePool + ?Sized,
    {
        let (width, height) = surface_extent(bounds.size());
        let mut capture = PooledSurface::acquire(pool, width, height)?;
        let delta = -bounds.origin().to_vec2();
        let ctx = capture.context();
        ctx.save();
        ctx.translate(delta);
        if let Some(shape) = shape {
            ctx.clip(&shape.path, shape.style.fill_rule);
        }
        ctx.set_transform(Affine::translate(delta) * self.transform);
        ctx.set_image_quality(self.quality);
        let pixels = self.buffer.pixels();
        ctx.draw_image(pixels, pixels.bounds(), self.centered_rect());
        ctx.restore();
        Ok(capture)
    }
}

/// Alpha-weighted mean of straight-alpha RGBA8 pixels.
///
/// Each pixel's color is weighted by `alpha / 255`. The result is opaque, or
/// `None` if every pixel is fully transparent.
pub fn alpha_weighted_average(pixels: &[u8]) -> Option<Color> {
    let mut sums = [0.0_f64; 3];
    let mut total = 0.0_f64;
    for px in pixels.chunks_exact(4) {
        let weight = f64::from(px[3]) / 255.;
        total += weight;
        for (sum, channel) in sums.iter_mut().zip(&px[..3]) {
            *sum += weight * f64::from(*channel);
        }
    }
    if total <= 0. {
        return None;
    }
    let scale = total * 255.;
    #[allow(
        clippy::cast_possible_truncation,
        reason = "averages lie in [0, 1], well within f32 precision needs"
    )]
    let [red, green, blue] = sums.map(|sum| (sum / scale) as f32);
    Some(Color::new([red, green, blue, 1.]))
}
