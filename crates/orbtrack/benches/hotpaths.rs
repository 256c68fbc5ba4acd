//! Hot-path benchmarks: segmentation and the two detection strategies on a
//! VGA synthetic frame, the per-cycle work of the live loop.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma, Rgb, RgbImage};

use orbtrack::detect::contour::{ContourConfig, ContourDetector};
use orbtrack::detect::voting::{VotingConfig, VotingDetector};
use orbtrack::detect::BlobDetector;
use orbtrack::segment::{hsv_mask, ColorBand};

fn ball_frame(w: u32, h: u32, center: [f32; 2], radius: f32) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([40, 40, 40]));
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, Rgb([255, 85, 0]));
            }
        }
    }
    img
}

fn gray_of(color: &RgbImage) -> GrayImage {
    image::imageops::grayscale(color)
}

fn disk_mask(w: u32, h: u32, center: [f32; 2], radius: f32) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }
    img
}

fn bench_segment(c: &mut Criterion) {
    let color = ball_frame(640, 480, [300.0, 200.0], 20.0);
    let band = ColorBand::default();
    c.bench_function("segment_vga", |b| {
        b.iter(|| hsv_mask(black_box(&color), black_box(&band)).unwrap())
    });
}

fn bench_contour(c: &mut Criterion) {
    let mask = disk_mask(640, 480, [300.0, 200.0], 20.0);
    let gray = gray_of(&ball_frame(640, 480, [300.0, 200.0], 20.0));
    let det = ContourDetector::new(ContourConfig {
        min_area: 500.0,
        max_area: 5000.0,
    });
    c.bench_function("detect_contour_vga", |b| {
        b.iter(|| det.detect(black_box(&mask), black_box(&gray)))
    });
}

fn bench_voting(c: &mut Criterion) {
    let mask = disk_mask(640, 480, [300.0, 200.0], 20.0);
    let gray = gray_of(&ball_frame(640, 480, [300.0, 200.0], 20.0));
    let det = VotingDetector::new(VotingConfig {
        r_min: 10.0,
        r_max: 32.0,
        ..VotingConfig::default()
    });
    c.bench_function("detect_voting_vga", |b| {
        b.iter(|| det.detect(black_box(&mask), black_box(&gray)))
    });
}

criterion_group!(benches, bench_segment, bench_contour, bench_voting);
criterion_main!(benches);
