// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Size-bucketed pool of [`CpuSurface`]s.

use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use hashbrown::HashMap;
use log::{debug, trace};
use understory_raster::{PoolError, Surface, SurfacePool, rgba8_len};

use crate::CpuSurface;

/// Limits and retention policy for a [`CpuSurfacePool`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CpuPoolConfig {
    /// Maximum number of surfaces on loan at once; `None` is unlimited.
    pub max_outstanding: Option<usize>,
    /// Maximum pixel count (`width * height`) of a single surface; `None` is
    /// unlimited.
    pub max_pixels: Option<u64>,
    /// Number of released surfaces kept for reuse per distinct size.
    pub max_retained_per_size: usize,
}

impl Default for CpuPoolConfig {
    fn default() -> Self {
        Self {
            max_outstanding: None,
            max_pixels: None,
            max_retained_per_size: 4,
        }
    }
}

/// Counters describing pool activity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful acquisitions.
    pub acquired: u64,
    /// Releases.
    pub released: u64,
    /// Acquisitions served from a retained surface.
    pub reused: u64,
    /// Acquisitions refused because of a limit.
    pub refused: u64,
    /// Surfaces currently on loan.
    pub outstanding: usize,
    /// Surfaces retained for reuse.
    pub retained: usize,
    /// Pixel bytes held by retained surfaces.
    pub retained_bytes: usize,
}

/// A [`SurfacePool`] of software surfaces.
///
/// Released surfaces are kept per exact size, up to
/// [`CpuPoolConfig::max_retained_per_size`], and are zeroed when handed out
/// again. The pool is single-threaded; share it by reference.
#[derive(Debug, Default)]
pub struct CpuSurfacePool {
    config: CpuPoolConfig,
    free: RefCell<HashMap<(u32, u32), Vec<CpuSurface>>>,
    stats: Cell<PoolStats>,
}

impl CpuSurfacePool {
    /// Create a pool with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with `config`.
    pub fn with_config(config: CpuPoolConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The pool's configuration.
    pub fn config(&self) -> CpuPoolConfig {
        self.config
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.get()
    }

    /// Drop every retained surface.
    pub fn trim(&self) {
        self.free.borrow_mut().clear();
        let mut stats = self.stats.get();
        stats.retained = 0;
        stats.retained_bytes = 0;
        self.stats.set(stats);
    }

    fn refuses(&self, width: u32, height: u32, stats: &PoolStats) -> bool {
        let pixels = u64::from(width) * u64::from(height);
        rgba8_len(width, height).is_none()
            || self
                .config
                .max_outstanding
                .is_some_and(|max| stats.outstanding >= max)
            || self.config.max_pixels.is_some_and(|max| pixels > max)
    }
}

impl SurfacePool for CpuSurfacePool {
    type Surface = CpuSurface;

    fn acquire(&self, width: u32, height: u32) -> Result<CpuSurface, PoolError> {
        let mut stats = self.stats.get();
        if self.refuses(width, height, &stats) {
            stats.refused += 1;
            self.stats.set(stats);
            debug!(
                "surface pool refused {width}x{height} with {} outstanding",
                stats.outstanding
            );
            return Err(PoolError::Exhausted { width, height });
        }

        let retained = self
            .free
            .borrow_mut()
            .get_mut(&(width, height))
            .and_then(Vec::pop);
        let surface = match retained {
            Some(mut surface) => {
                surface.clear();
                stats.reused += 1;
                stats.retained -= 1;
                stats.retained_bytes -= surface.data().len();
                surface
            }
            None => {
                let Some(surface) = CpuSurface::try_new(width, height) else {
                    stats.refused += 1;
                    self.stats.set(stats);
                    debug!("surface pool could not allocate {width}x{height}");
                    return Err(PoolError::Exhausted { width, height });
                };
                surface
            }
        };
        stats.acquired += 1;
        stats.outstanding += 1;
        self.stats.set(stats);
        trace!("surface pool acquired {width}x{height}");
        Ok(surface)
    }

    fn release(&self, surface: CpuSurface) {
        let mut stats = self.stats.get();
        stats.released += 1;
        stats.outstanding = stats.outstanding.saturating_sub(1);

        let size = (surface.width(), surface.height());
        let mut free = self.free.borrow_mut();
        let bucket = free.entry(size).or_default();
        if bucket.len() < self.config.max_retained_per_size {
            stats.retained += 1;
            stats.retained_bytes += surface.data().len();
            bucket.push(surface);
        }
        self.stats.set(stats);
        trace!("surface pool released {}x{}", size.0, size.1);
    }
}
