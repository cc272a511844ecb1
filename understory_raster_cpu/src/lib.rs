// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_raster_cpu --heading-base-level=0

//! Understory Raster CPU: software surfaces for `understory_raster`.
//!
//! This crate implements the drawing seams of `understory_raster` on the CPU:
//!
//! - [`CpuSurface`] is a straight-alpha RGBA8 pixel buffer that is also its own
//!   [`DrawContext`](understory_raster::DrawContext). It supports a transform
//!   stack, path clipping with non-zero and even-odd fill rules, and image
//!   blits with nearest-neighbor or bilinear filtering composited source-over.
//! - [`CpuSurfacePool`] hands out surfaces by size, keeps a bounded number of
//!   released surfaces for reuse, and can refuse acquisitions past configured
//!   limits ([`CpuPoolConfig`]).
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_raster::{Image, Raster, Region};
//! use understory_raster_cpu::{CpuSurface, CpuSurfacePool};
//!
//! let pool = CpuSurfacePool::new();
//!
//! // Left half red, right half blue.
//! let row = [[255_u8, 0, 0, 255], [255, 0, 0, 255], [0, 0, 255, 255], [0, 0, 255, 255]];
//! let image = Image::new(4, 4, row.concat().repeat(4)).unwrap();
//! let raster = Raster::<CpuSurface>::from_image(image).unwrap();
//!
//! let whole = raster.average_color(&pool, Region::Whole).unwrap().unwrap();
//! assert!((whole.components[0] - 0.5).abs() < 1e-3);
//!
//! let left = raster
//!     .average_color(&pool, Rect::new(-2., -2., 0., 2.))
//!     .unwrap()
//!     .unwrap();
//! assert!(left.components[0] > 0.99);
//! assert_eq!(raster.get_pixel(Point::new(1.5, 0.)).components, [0., 0., 1., 1.]);
//! assert_eq!(pool.stats().outstanding, 0);
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod filter;
mod pool;
mod surface;

pub use pool::{CpuPoolConfig, CpuSurfacePool, PoolStats};
pub use surface::CpuSurface;
