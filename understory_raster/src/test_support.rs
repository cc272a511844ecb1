// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording surface and counting pool for unit tests.

use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::{Affine, BezPath, Rect};
use peniko::{Fill, ImageQuality};

use crate::{DrawContext, Image, PixelsRef, PoolError, Surface, SurfacePool};

/// A drawing call observed by [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Save,
    Restore,
    Transform(Affine),
    SetTransform(Affine),
    Clip(Fill),
    SetImageQuality(ImageQuality),
    DrawImage { src: Rect, dst: Rect },
}

/// Surface that records drawing calls. Blits made without a transform copy
/// pixels nearest-neighbor so pixel tests can observe them.
#[derive(Clone, Debug)]
pub(crate) struct RecordingSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
    transform: Affine,
    stack: Vec<Affine>,
    pub(crate) calls: Vec<Call>,
}

impl RecordingSurface {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
            transform: Affine::IDENTITY,
            stack: Vec::new(),
            calls: Vec::new(),
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|x| *x < self.width)?;
        let y = u32::try_from(y).ok().filter(|y| *y < self.height)?;
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "test helper with small coordinates"
)]
impl DrawContext for RecordingSurface {
    fn save(&mut self) {
        self.stack.push(self.transform);
        self.calls.push(Call::Save);
    }

    fn restore(&mut self) {
        if let Some(transform) = self.stack.pop() {
            self.transform = transform;
        }
        self.calls.push(Call::Restore);
    }

    fn transform(&mut self, affine: Affine) {
        self.transform *= affine;
        self.calls.push(Call::Transform(affine));
    }

    fn set_transform(&mut self, affine: Affine) {
        self.transform = affine;
        self.calls.push(Call::SetTransform(affine));
    }

    fn clip(&mut self, _path: &BezPath, fill: Fill) {
        self.calls.push(Call::Clip(fill));
    }

    fn set_image_quality(&mut self, quality: ImageQuality) {
        self.calls.push(Call::SetImageQuality(quality));
    }

    fn draw_image(&mut self, image: PixelsRef<'_>, src: Rect, dst: Rect) {
        self.calls.push(Call::DrawImage { src, dst });
        if self.transform != Affine::IDENTITY || dst.width() <= 0. || dst.height() <= 0. {
            return;
        }
        let (sx, sy) = (src.width() / dst.width(), src.height() / dst.height());
        for y in dst.y0 as i32..dst.y1 as i32 {
            for x in dst.x0 as i32..dst.x1 as i32 {
                let u = src.x0 + (f64::from(x) + 0.5 - dst.x0) * sx;
                let v = src.y0 + (f64::from(y) + 0.5 - dst.y0) * sy;
                if u < 0. || v < 0. {
                    continue;
                }
                let px = image.pixel(u as u32, v as u32);
                if let Some(idx) = self.index(x, y) {
                    self.data[idx..idx + 4].copy_from_slice(&px);
                }
            }
        }
    }

    fn get_pixels(&self, x: i32, y: i32, width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(width as usize * height as usize * 4);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                match self.index(x + col, y + row) {
                    Some(idx) => out.extend_from_slice(&self.data[idx..idx + 4]),
                    None => out.extend_from_slice(&[0; 4]),
                }
            }
        }
        out
    }

    fn put_pixels(&mut self, x: i32, y: i32, width: u32, height: u32, data: &[u8]) {
        for (i, px) in data.chunks_exact(4).enumerate() {
            let i = i as u32;
            if i >= width * height {
                break;
            }
            if let Some(idx) = self.index(x + (i % width) as i32, y + (i / width) as i32) {
                self.data[idx..idx + 4].copy_from_slice(px);
            }
        }
    }
}

impl Surface for RecordingSurface {
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

/// Pool that counts acquisitions and releases, optionally refusing once a
/// number of surfaces are outstanding.
#[derive(Debug, Default)]
pub(crate) struct RecordingPool {
    limit: Option<usize>,
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl RecordingPool {
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub(crate) fn acquired(&self) -> usize {
        self.acquired.get()
    }

    pub(crate) fn released(&self) -> usize {
        self.released.get()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.acquired() - self.released()
    }
}

impl SurfacePool for RecordingPool {
    type Surface = RecordingSurface;

    fn acquire(&self, width: u32, height: u32) -> Result<RecordingSurface, PoolError> {
        if self.limit.is_some_and(|limit| self.outstanding() >= limit) {
            return Err(PoolError::Exhausted { width, height });
        }
        self.acquired.set(self.acquired() + 1);
        Ok(RecordingSurface::new(width, height))
    }

    fn release(&self, _surface: RecordingSurface) {
        self.released.set(self.released() + 1);
    }
}

/// A `width` x `height` image filled with `rgba`.
pub(crate) fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> Image {
    Image::new(width, height, rgba.repeat(width as usize * height as usize))
        .expect("valid test image")
}
