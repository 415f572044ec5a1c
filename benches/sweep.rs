use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use trapezoid_raster::{
    fixed_from_f64, mask_composite, BoxI, ClipRegion, CompositeRequest, Drawable, LineFixed, Op,
    PointFixed, RasterConfig, SampleGrid, Tor, Trapezoid,
};

const SIZE: i32 = 512;

fn pt(x: f64, y: f64) -> PointFixed {
    PointFixed::new(fixed_from_f64(x), fixed_from_f64(y))
}

/// Overlapping slanted trapezoids across the whole canvas.
fn scene() -> Vec<Trapezoid> {
    (0..64)
        .map(|i| {
            let f = i as f64;
            let top = (f * 7.3) % 400.0;
            let bottom = top + 90.5;
            Trapezoid::new(
                fixed_from_f64(top),
                fixed_from_f64(bottom),
                LineFixed::new(pt((f * 13.7) % 300.0, top), pt((f * 5.1) % 250.0, bottom)),
                LineFixed::new(pt((f * 13.7) % 300.0 + 60.0, top), pt((f * 5.1) % 250.0 + 200.25, bottom)),
            )
        })
        .collect()
}

fn rectangles() -> Vec<Trapezoid> {
    (0..64)
        .map(|i| {
            let x = (i % 8) as f64 * 64.0;
            let y = (i / 8) as f64 * 64.0;
            Trapezoid::rect(
                fixed_from_f64(x + 0.5),
                fixed_from_f64(y + 0.5),
                fixed_from_f64(x + 60.0),
                fixed_from_f64(y + 60.0),
            )
        })
        .collect()
}

pub fn sweep(c: &mut Criterion) {
    let mut g = c.benchmark_group("sweep");
    g.sample_size(50);

    for (name, traps) in [("slanted", scene()), ("rects", rectangles())] {
        g.bench_function(format!("spans_{name}"), |b| {
            b.iter(|| {
                let mut tor =
                    Tor::new(BoxI::new(0, 0, SIZE, SIZE), 2 * traps.len(), SampleGrid::DEFAULT)
                        .unwrap();
                for t in &traps {
                    tor.add_fixed_trapezoid(t, 0, 0);
                }
                let mut sum = 0i64;
                tor.render(&mut |bx: &BoxI, c: i32| sum += bx.area() * c as i64, false);
                std::hint::black_box(sum)
            })
        });
    }
}

pub fn mask(c: &mut Criterion) {
    let mut g = c.benchmark_group("mask");
    g.sample_size(30);

    let traps = scene();
    let dst = Drawable::new(ClipRegion::from_size(SIZE, SIZE));
    let req = CompositeRequest::new(Op::Over);
    let pool = Arc::new(rayon::ThreadPoolBuilder::new().build().unwrap());

    let configs = [
        ("single", RasterConfig::default()),
        ("threaded", RasterConfig::default().with_threads(pool)),
    ];
    for (name, config) in configs {
        g.bench_function(name, |b| {
            b.iter(|| {
                let mut total = 0;
                mask_composite(&req, &dst, &traps, &config, |m| total = m.total()).unwrap();
                std::hint::black_box(total)
            })
        });
    }
}

criterion_group!(s, sweep, mask);
criterion_main!(s);
