// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image sampling and source-over compositing.
//!
//! Sampling and blending happen on premultiplied `f64` channels in `[0, 1]`;
//! surfaces store straight-alpha RGBA8.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};
use peniko::ImageQuality;
use understory_raster::PixelsRef;

/// Premultiplied RGBA in `[0, 1]`.
pub(crate) type Premul = [f64; 4];

/// Samples a source rectangle of an image, clamping reads to its edges.
#[derive(Debug)]
pub(crate) struct ImageSampler<'a> {
    image: PixelsRef<'a>,
    src: Rect,
    min: (i64, i64),
    max: (i64, i64),
    bilinear: bool,
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "floored coordinates are clamped to the image extent"
)]
impl<'a> ImageSampler<'a> {
    /// Returns `None` if `src` does not overlap the image.
    pub(crate) fn new(image: PixelsRef<'a>, src: Rect, quality: ImageQuality) -> Option<Self> {
        let src = src.intersect(image.bounds());
        if !(src.width() > 0. && src.height() > 0.) {
            return None;
        }
        Some(Self {
            image,
            src,
            min: (src.x0.floor() as i64, src.y0.floor() as i64),
            max: (src.x1.ceil() as i64 - 1, src.y1.ceil() as i64 - 1),
            bilinear: !matches!(quality, ImageQuality::Low),
        })
    }

    /// Returns `true` if `uv` lies in the source rectangle after clipping it
    /// to the image. Points outside it have no pixel to copy.
    pub(crate) fn covers(&self, uv: Point) -> bool {
        self.src.contains(uv)
    }

    /// Sample at image-space point `uv`. Filter taps past the source edge
    /// clamp to it.
    pub(crate) fn sample(&self, uv: Point) -> Premul {
        if !self.bilinear {
            return self.fetch(uv.x.floor() as i64, uv.y.floor() as i64);
        }
        let fx = uv.x - 0.5;
        let fy = uv.y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let top = lerp(self.fetch(x0, y0), self.fetch(x0 + 1, y0), tx);
        let bottom = lerp(self.fetch(x0, y0 + 1), self.fetch(x0 + 1, y0 + 1), tx);
        lerp(top, bottom, ty)
    }

    #[allow(
        clippy::cast_sign_loss,
        reason = "coordinates are clamped to non-negative image indices"
    )]
    fn fetch(&self, x: i64, y: i64) -> Premul {
        let x = x.clamp(self.min.0, self.max.0) as u32;
        let y = y.clamp(self.min.1, self.max.1) as u32;
        premultiply(self.image.pixel(x, y))
    }
}

fn lerp(a: Premul, b: Premul, t: f64) -> Premul {
    if t <= 0. {
        return a;
    }
    core::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

/// Convert straight RGBA8 into premultiplied unit channels.
pub(crate) fn premultiply(px: [u8; 4]) -> Premul {
    let alpha = f64::from(px[3]) / 255.;
    [
        f64::from(px[0]) / 255. * alpha,
        f64::from(px[1]) / 255. * alpha,
        f64::from(px[2]) / 255. * alpha,
        alpha,
    ]
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the value is clamped to [0, 255] before casting"
)]
fn unit_to_u8(v: f64) -> u8 {
    (v * 255.).round().clamp(0., 255.) as u8
}

/// Composite `src` over the straight-alpha pixel `dst`, scaling the source by
/// `coverage` in `[0, 1]`.
pub(crate) fn source_over(dst: &mut [u8], src: Premul, coverage: f64) {
    let src = src.map(|c| c * coverage);
    if src[3] <= 0. {
        return;
    }
    let under = premultiply([dst[0], dst[1], dst[2], dst[3]]);
    let inv = 1. - src[3];
    let out: Premul = core::array::from_fn(|i| src[i] + under[i] * inv);
    let alpha = out[3];
    if alpha <= 0. {
        dst.fill(0);
        return;
    }
    for (channel, value) in dst[..3].iter_mut().zip(&out[..3]) {
        *channel = unit_to_u8(value / alpha);
    }
    dst[3] = unit_to_u8(alpha);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const CLEAR: [u8; 4] = [0; 4];

    #[test]
    fn nearest_picks_containing_pixel() {
        let data = [RED, CLEAR].concat();
        let image = PixelsRef::new(2, 1, &data).unwrap();
        let sampler = ImageSampler::new(image, image.bounds(), ImageQuality::Low).unwrap();
        assert_eq!(sampler.sample(Point::new(0.9, 0.5)), [1., 0., 0., 1.]);
        assert_eq!(sampler.sample(Point::new(1.1, 0.5)), [0.; 4]);
    }

    #[test]
    fn bilinear_blends_premultiplied_neighbours() {
        let data = [RED, CLEAR].concat();
        let image = PixelsRef::new(2, 1, &data).unwrap();
        let sampler = ImageSampler::new(image, image.bounds(), ImageQuality::Medium).unwrap();
        assert_eq!(sampler.sample(Point::new(1.0, 0.5)), [0.5, 0., 0., 0.5]);
        // Pixel centers reproduce the pixel exactly.
        assert_eq!(sampler.sample(Point::new(0.5, 0.5)), [1., 0., 0., 1.]);
        // Reads past the edge clamp.
        assert_eq!(sampler.sample(Point::new(-3., 0.5)), [1., 0., 0., 1.]);
    }

    #[test]
    fn source_rect_limits_reads() {
        let data = [RED, CLEAR].concat();
        let image = PixelsRef::new(2, 1, &data).unwrap();
        let sampler =
            ImageSampler::new(image, Rect::new(1., 0., 2., 1.), ImageQuality::Medium).unwrap();
        assert_eq!(sampler.sample(Point::new(1.0, 0.5)), [0.; 4]);
        assert!(sampler.covers(Point::new(1.5, 0.5)));
        assert!(!sampler.covers(Point::new(0.5, 0.5)));
        assert!(ImageSampler::new(image, Rect::new(5., 5., 6., 6.), ImageQuality::Low).is_none());

        // Only the on-image part of a source rect is covered.
        let overhang =
            ImageSampler::new(image, Rect::new(-2., 0., 2., 1.), ImageQuality::Low).unwrap();
        assert!(!overhang.covers(Point::new(-0.5, 0.5)));
        assert!(overhang.covers(Point::new(0.5, 0.5)));
    }

    #[test]
    fn source_over_keeps_straight_color() {
        let mut dst = CLEAR;
        source_over(&mut dst, premultiply([0, 0, 255, 85]), 1.);
        assert_eq!(dst, [0, 0, 255, 85]);

        source_over(&mut dst, premultiply(RED), 1.);
        assert_eq!(dst, RED);

        let mut half = CLEAR;
        source_over(&mut half, [0.5, 0., 0., 0.5], 1.);
        assert_eq!(half, [255, 0, 0, 128]);

        let mut untouched = [1, 2, 3, 4];
        source_over(&mut untouched, premultiply(RED), 0.);
        assert_eq!(untouched, [1, 2, 3, 4]);
    }
}
