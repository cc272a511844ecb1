// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Circle, Rect, Shape};
use peniko::ImageQuality;
use understory_raster::{Image, Raster, Region, ShapeRegion};
use understory_raster_cpu::{CpuSurface, CpuSurfacePool};

fn gradient(size: u32) -> Raster<CpuSurface> {
    let mut data = Vec::with_capacity(size as usize * size as usize * 4);
    for y in 0..size {
        for x in 0..size {
            data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 128, 255]);
        }
    }
    Raster::from_image(Image::new(size, size, data).unwrap()).unwrap()
}

fn bench_average_color(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster/average_color");
    let pool = CpuSurfacePool::new();

    for size in [64_u32, 256, 1_024] {
        let raster = gradient(size);
        let half = f64::from(size) / 2.;
        let shape = ShapeRegion::new(Circle::new((0., 0.), half * 0.75).to_path(0.1));
        group.throughput(Throughput::Elements(u64::from(size) * u64::from(size)));

        group.bench_with_input(BenchmarkId::new("whole", size), &raster, |b, raster| {
            b.iter(|| black_box(raster.average_color(&pool, Region::Whole).unwrap()));
        });

        let rect = Rect::new(-half / 2., -half / 2., half / 2., half / 2.);
        group.bench_with_input(BenchmarkId::new("rect", size), &raster, |b, raster| {
            b.iter(|| black_box(raster.average_color(&pool, rect).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("shape", size), &raster, |b, raster| {
            b.iter(|| black_box(raster.average_color(&pool, &shape).unwrap()));
        });
    }
    group.finish();
}

fn bench_set_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster/set_size");
    let pool = CpuSurfacePool::new();

    for quality in [ImageQuality::Low, ImageQuality::Medium] {
        let name = if quality == ImageQuality::Low {
            "nearest"
        } else {
            "bilinear"
        };
        group.bench_function(BenchmarkId::new(name, "256->512"), |b| {
            b.iter_batched(
                || {
                    let mut raster = gradient(256);
                    raster.set_resample_quality(quality);
                    raster
                },
                |mut raster| {
                    raster.set_size(&pool, 512, 512).unwrap();
                    raster.dispose(&pool);
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_average_color, bench_set_size);
criterion_main!(benches);
