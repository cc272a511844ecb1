// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software drawing surface.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, BezPath, Point, Rect, Shape};
use peniko::{Fill, ImageQuality};
use smallvec::SmallVec;
use understory_raster::{BYTES_PER_PIXEL, DrawContext, PixelsRef, Surface, rgba8_len};

use crate::filter::{ImageSampler, source_over};

#[derive(Clone, Debug)]
struct DrawState {
    transform: Affine,
    /// Per-pixel coverage in `0..=255`; `None` means unclipped.
    clip: Option<Vec<u8>>,
    quality: ImageQuality,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            clip: None,
            quality: ImageQuality::Medium,
        }
    }
}

/// A straight-alpha RGBA8 pixel buffer that is also its own drawing context.
///
/// Clips are evaluated per pixel center against the path's winding number,
/// so they are aliased but honor both fill rules on compound paths.
#[derive(Clone)]
pub struct CpuSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
    state: DrawState,
    stack: SmallVec<[DrawState; 4]>,
}

impl CpuSurface {
    /// Create a transparent surface.
    ///
    /// # Panics
    ///
    /// Panics if the pixel buffer size overflows `usize` or cannot be
    /// allocated. Use [`try_new`](Self::try_new) to handle that instead.
    pub fn new(width: u32, height: u32) -> Self {
        Self::try_new(width, height).expect("CpuSurface: pixel buffer cannot be allocated")
    }

    /// Create a transparent surface, returning `None` if the pixel buffer
    /// size overflows `usize` or the allocation fails.
    pub fn try_new(width: u32, height: u32) -> Option<Self> {
        let len = rgba8_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, 0);
        Some(Self {
            width,
            height,
            data,
            state: DrawState::default(),
            stack: SmallVec::new(),
        })
    }

    /// Wrap existing straight-alpha RGBA8 pixels, returning `None` if the
    /// length does not match the dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (rgba8_len(width, height)? == data.len()).then(|| Self {
            width,
            height,
            data,
            state: DrawState::default(),
            stack: SmallVec::new(),
        })
    }

    /// The pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the surface, returning its pixel bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Zero every pixel and reset the drawing state.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.state = DrawState::default();
        self.stack.clear();
    }

    /// Current transform.
    pub fn current_transform(&self) -> Affine {
        self.state.transform
    }

    /// Depth of the save/restore stack.
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "coordinates were checked against the surface extent"
        )]
        let (x, y) = (x as usize, y as usize);
        Some(y * self.width as usize + x)
    }

    /// Pixel columns and rows whose area intersects `rect`, clamped to the
    /// surface.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "values are clamped to the surface extent"
    )]
    fn device_span(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let surface = Rect::new(0., 0., f64::from(self.width), f64::from(self.height));
        let rect = rect.intersect(surface);
        if !(rect.width() > 0. && rect.height() > 0.) {
            return None;
        }
        Some((
            rect.x0.floor() as u32,
            rect.y0.floor() as u32,
            (rect.x1.ceil() as u32).min(self.width),
            (rect.y1.ceil() as u32).min(self.height),
        ))
    }

    fn coverage(&self, index: usize) -> f64 {
        self.state
            .clip
            .as_ref()
            .map_or(1., |mask| f64::from(mask[index]) / 255.)
    }
}

fn pixel_center(x: u32, y: u32) -> Point {
    Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5)
}

impl DrawContext for CpuSurface {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn transform(&mut self, affine: Affine) {
        self.state.transform *= affine;
    }

    fn set_transform(&mut self, affine: Affine) {
        self.state.transform = affine;
    }

    fn clip(&mut self, path: &BezPath, fill: Fill) {
        let mut device = path.clone();
        device.apply_affine(self.state.transform);
        let mut mask = vec![0_u8; self.width as usize * self.height as usize];
        if let Some((x0, y0, x1, y1)) = self.device_span(device.bounding_box()) {
            for y in y0..y1 {
                let row = y as usize * self.width as usize;
                for x in x0..x1 {
                    let winding = device.winding(pixel_center(x, y));
                    let inside = if fill == Fill::EvenOdd {
                        winding % 2 != 0
                    } else {
                        winding != 0
                    };
                    if inside {
                        mask[row + x as usize] = u8::MAX;
                    }
                }
            }
        }
        if let Some(previous) = &self.state.clip {
            for (m, p) in mask.iter_mut().zip(previous) {
                *m = (*m).min(*p);
            }
        }
        self.state.clip = Some(mask);
    }

    fn set_image_quality(&mut self, quality: ImageQuality) {
        self.state.quality = quality;
    }

    fn draw_image(&mut self, image: PixelsRef<'_>, src: Rect, dst: Rect) {
        if !(dst.width() > 0. && dst.height() > 0.) {
            return;
        }
        let ctm = self.state.transform;
        if ctm.determinant() == 0. {
            return;
        }
        let Some(sampler) = ImageSampler::new(image, src, self.state.quality) else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.device_span(ctm.transform_rect_bbox(dst)) else {
            return;
        };
        let device_to_local = ctm.inverse();
        let scale = (src.width() / dst.width(), src.height() / dst.height());
        let local_to_image = |p: Point| {
            Point::new(
                src.x0 + (p.x - dst.x0) * scale.0,
                src.y0 + (p.y - dst.y0) * scale.1,
            )
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let local = device_to_local * pixel_center(x, y);
                if !dst.contains(local) {
                    continue;
                }
                let uv = local_to_image(local);
                if !sampler.covers(uv) {
                    continue;
                }
                let index = y as usize * self.width as usize + x as usize;
                let coverage = self.coverage(index);
                if coverage <= 0. {
                    continue;
                }
                let color = sampler.sample(uv);
                let offset = index * BYTES_PER_PIXEL;
                source_over(
                    &mut self.data[offset..offset + BYTES_PER_PIXEL],
                    color,
                    coverage,
                );
            }
        }
    }

    fn get_pixels(&self, x: i32, y: i32, width: u32, height: u32) -> Vec<u8> {
        let mut out = vec![0_u8; rgba8_len(width, height).unwrap_or(0)];
        for (i, px) in out.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let (col, row) = (i as u64 % u64::from(width), i as u64 / u64::from(width));
            #[allow(
                clippy::cast_possible_wrap,
                reason = "row and column are bounded by u32 dimensions"
            )]
            let (col, row) = (col as i64, row as i64);
            if let Some(index) = self.offset(i64::from(x) + col, i64::from(y) + row) {
                let offset = index * BYTES_PER_PIXEL;
                px.copy_from_slice(&self.data[offset..offset + BYTES_PER_PIXEL]);
            }
        }
        out
    }

    fn put_pixels(&mut self, x: i32, y: i32, width: u32, height: u32, data: &[u8]) {
        let count = u64::from(width) * u64::from(height);
        for (i, px) in data.chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let i = i as u64;
            if i >= count {
                break;
            }
            #[allow(
                clippy::cast_possible_wrap,
                reason = "row and column are bounded by u32 dimensions"
            )]
            let (col, row) = ((i % u64::from(width)) as i64, (i / u64::from(width)) as i64);
            if let Some(index) = self.offset(i64::from(x) + col, i64::from(y) + row) {
                let offset = index * BYTES_PER_PIXEL;
                self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(px);
            }
        }
    }
}

impl Surface for CpuSurface {
    type Context = Self;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixels(&self) -> PixelsRef<'_> {
        PixelsRef {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    fn context(&mut self) -> &mut Self {
        self
    }
}

impl fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("transform", &self.state.transform)
            .field("clipped", &self.state.clip.is_some())
            .field("save_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}
