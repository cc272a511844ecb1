// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for raster operations and surface pools.

use core::fmt;

/// Error returned by a [`SurfacePool`](crate::SurfacePool) that cannot hand
/// out a surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The pool refused to provide a surface of the requested size, either
    /// because a limit was reached or because allocation failed.
    Exhausted {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { width, height } => {
                write!(f, "surface pool cannot provide a {width}x{height} surface")
            }
        }
    }
}

impl core::error::Error for PoolError {}

/// Error returned by [`Raster`](crate::Raster) operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RasterError {
    /// The construction source has no usable pixel shape: a zero dimension,
    /// a buffer whose length does not match its dimensions, or an image
    /// format that cannot be converted to straight RGBA8.
    InvalidSource,
    /// A surface was requested with a zero dimension.
    InvalidSize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The operation writes pixels, but the raster is backed by an immutable
    /// image. Call [`Raster::canvas`](crate::Raster::canvas) first.
    NoDrawableSurface,
    /// The surface pool could not provide a surface.
    ResourceExhausted {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSource => f.write_str("raster source is neither a valid image nor surface"),
            Self::InvalidSize { width, height } => {
                write!(f, "invalid raster size {width}x{height}")
            }
            Self::NoDrawableSurface => f.write_str("raster has no drawable surface"),
            Self::ResourceExhausted { width, height } => {
                write!(f, "no surface available for a {width}x{height} raster buffer")
            }
        }
    }
}

impl core::error::Error for RasterError {}

impl From<PoolError> for RasterError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { width, height } => Self::ResourceExhausted { width, height },
        }
    }
}
