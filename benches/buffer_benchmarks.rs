//! Benchmarks for frame discovery, buffer fills, and framebuffer encoding.
//!
//! Run with: cargo bench
//!
//! Fixtures are generated into a temporary directory at start-up: 60 frames
//! of 320×240, the converter's default output.

use std::{fs, hint::black_box, path::Path};

use criterion::{BenchmarkId, Criterion};
use framecast::{
    DisplaySink, FrameBuffer, FrameSetResolver, FramebufferDisplay, frame_set::frame_file_name,
};
use image::{DynamicImage, Rgb, RgbImage};

const FRAME_COUNT: u64 = 60;

fn write_fixture_frames(directory: &Path) {
    for index in 1..=FRAME_COUNT {
        let image = RgbImage::from_fn(320, 240, |x, y| {
            Rgb([(x + index as u32) as u8, y as u8, index as u8])
        });
        image.save(directory.join(frame_file_name(index))).unwrap();
    }
}

fn benchmark_resolve(criterion: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_frames(dir.path());
    let resolver = FrameSetResolver::new(dir.path());

    criterion.bench_function("resolve 60-frame directory", |bencher| {
        bencher.iter(|| black_box(resolver.resolve()));
    });
}

fn benchmark_fill(criterion: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_frames(dir.path());
    let frames = FrameSetResolver::new(dir.path()).resolve();

    let mut group = criterion.benchmark_group("buffer fill");
    group.sample_size(20);
    for capacity in [1_usize, 15, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |bencher, &capacity| {
            let mut buffer = FrameBuffer::new(capacity);
            bencher.iter(|| black_box(buffer.fill(&frames).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_framebuffer_encoding(criterion: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let sysfs = dir.path().join("fb1");
    fs::create_dir(&sysfs).unwrap();
    fs::write(sysfs.join("virtual_size"), "320,240").unwrap();
    fs::write(sysfs.join("bits_per_pixel"), "16").unwrap();
    fs::write(dir.path().join("device"), b"").unwrap();

    let mut panel = FramebufferDisplay::new(dir.path().join("device")).with_sysfs_dir(&sysfs);
    panel.init().unwrap();

    let native = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([200, 100, 50])));
    let oversized = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([200, 100, 50])));

    criterion.bench_function("framebuffer show (native size)", |bencher| {
        bencher.iter(|| panel.show_image(black_box(&native)).unwrap());
    });

    criterion.bench_function("framebuffer show (scaled)", |bencher| {
        bencher.iter(|| panel.show_image(black_box(&oversized)).unwrap());
    });
}

criterion::criterion_group!(
    benches,
    benchmark_resolve,
    benchmark_fill,
    benchmark_framebuffer_encoding,
);
criterion::criterion_main!(benches);
