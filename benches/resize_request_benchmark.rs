use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use image::{ImageFormat, Rgb, RgbImage};
use s3resize::{
    Settings,
    resize::{Dimension, ImageTransformer, OutputFormat, ResizeRequest, dimensions},
};
use std::{hint::black_box, io::Cursor};

fn fixture(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            u8::try_from(x % 256).unwrap_or_default(),
            u8::try_from(y % 256).unwrap_or_default(),
            128,
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode fixture");
    buf.into_inner()
}

pub fn parse_key(c: &mut Criterion) {
    for key in ["200x200/photos/cat.jpg", "/AUTOx480/a/b/c/d/e/f/photo.png"] {
        c.bench_with_input(BenchmarkId::new("parse", key), &key, |b, key| {
            b.iter(|| ResizeRequest::parse(black_box(key)).expect("Failed to parse key"));
        });
    }

    c.bench_function("resolve", |b| {
        b.iter(|| {
            dimensions::resolve(
                black_box(Dimension::Fixed(400)),
                black_box(Dimension::Auto),
                black_box((4032, 3024)),
            )
        });
    });
}

pub fn decode_resize(c: &mut Criterion) {
    let data = fixture(1024, 768);

    for format in [OutputFormat::Png, OutputFormat::Jpeg] {
        let transformer = ImageTransformer::new(
            &Settings::new("images", "http://images.example.com").with_format(format),
        );

        c.bench_with_input(
            BenchmarkId::new("decode_resize", format),
            &data,
            |b, data| {
                b.iter(|| {
                    transformer
                        .decode(
                            Cursor::new(data.as_slice()),
                            Dimension::Fixed(200),
                            Dimension::Auto,
                        )
                        .expect("Failed to resize")
                });
            },
        );
    }
}

criterion_group!(benches, parse_key, decode_resize);
criterion_main!(benches);
