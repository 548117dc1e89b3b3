//! Criterion benchmarks for canopy_bvh build and query throughput.

use canopy_bvh::{Heuristic, SceneBvh, ShapeBvh};
use canopy_core::{Affine3, Elements, Ray3, Vec3};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Triangle grid in the xy plane with deterministic z jitter.
fn make_grid(n: usize) -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let mut positions = Vec::new();
    let mut tris = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            let dz = ((i * 31 + j * 17) % 7) as f32 * 0.01;
            positions.push(Vec3::new(i as f32, j as f32, dz));
        }
    }
    let stride = (n + 1) as u32;
    for j in 0..n as u32 {
        for i in 0..n as u32 {
            let v00 = j * stride + i;
            tris.push([v00, v00 + 1, v00 + stride + 1]);
            tris.push([v00, v00 + stride + 1, v00 + stride]);
        }
    }
    (positions, tris)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for n in [16usize, 64] {
        let (positions, tris) = make_grid(n);
        group.throughput(Throughput::Elements(tris.len() as u64));

        for (name, heuristic) in [("sah", Heuristic::Sah), ("median", Heuristic::EqualCount)] {
            group.bench_with_input(
                BenchmarkId::new(name, tris.len()),
                &heuristic,
                |b, &heuristic| {
                    b.iter(|| {
                        let mut shape = ShapeBvh::new(
                            Elements::Triangles(&tris),
                            &positions,
                            None,
                            heuristic,
                        )
                        .unwrap();
                        shape.build();
                        black_box(shape.nodes().len())
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_intersect(c: &mut Criterion) {
    let (positions, tris) = make_grid(64);
    let mut shape =
        ShapeBvh::new(Elements::Triangles(&tris), &positions, None, Heuristic::Default).unwrap();
    shape.build();

    let rays: Vec<Ray3> = (0..1024)
        .map(|k| {
            let x = (k % 64) as f32 + 0.4;
            let y = (k / 64) as f32 * 4.0 + 0.3;
            Ray3::new(Vec3::new(x, y, 8.0), Vec3::new(0.002, -0.001, -1.0))
        })
        .collect();

    let mut group = c.benchmark_group("intersect");
    group.throughput(Throughput::Elements(rays.len() as u64));
    group.bench_function("closest_1024", |b| {
        b.iter(|| {
            let mut hits = 0;
            for ray in &rays {
                if shape.intersect(black_box(ray)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
    group.bench_function("any_1024", |b| {
        b.iter(|| {
            let mut hits = 0;
            for ray in &rays {
                if shape.hit(black_box(ray)) {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
    group.finish();
}

fn bench_neighbor(c: &mut Criterion) {
    let (positions, tris) = make_grid(64);
    let mut scene = SceneBvh::new(1, Heuristic::Default);
    scene
        .set_shape(
            0,
            Affine3::IDENTITY,
            Elements::Triangles(&tris),
            &positions,
            None,
        )
        .unwrap();
    scene.build().unwrap();

    let points: Vec<Vec3> = (0..1024)
        .map(|k| Vec3::new((k % 64) as f32 + 0.2, (k / 16) as f32, 1.5))
        .collect();

    let mut group = c.benchmark_group("neighbor");
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("nearest_1024", |b| {
        b.iter(|| {
            let mut hits = 0;
            for &pt in &points {
                if scene.neighbor(black_box(pt), 2.0, None).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_intersect, bench_neighbor);
criterion_main!(benches);
