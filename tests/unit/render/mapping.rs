use std::sync::Arc;

use super::*;
use crate::foundation::core::Affine;
use crate::raster::Plane;
use crate::render::mesh::{GridMeshBuilder, MeshBuilder};

fn pool(threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
}

fn blank(len: usize) -> TargetChannel {
    TargetChannel {
        intensity: vec![0.0; len],
        coverage: vec![0; len],
    }
}

fn half_masked(w: u32, h: u32, v: f32) -> SourceChannel {
    SourceChannel {
        image: Arc::new(Plane::new(w, h, v)),
        mask: Some(Arc::new(Plane::new(w, h, 127.5))),
    }
}

#[test]
fn identity_mesh_covers_every_pixel_once() {
    let mesh = GridMeshBuilder
        .build_mesh(&Affine::IDENTITY, 4.0, 16.0, 16.0)
        .unwrap();
    let mut t = blank(256);
    map_mesh(
        &mesh,
        &[half_masked(16, 16, 200.0)],
        &mut [&mut t],
        16,
        16,
        MapperKind::SingleChannelWithAlpha,
        true,
        &pool(3),
    )
    .unwrap();
    assert!(t.coverage.iter().all(|c| *c == 128));
    assert!(t.intensity.iter().all(|v| (*v - 100.0).abs() < 1e-3));
}

#[test]
fn rotated_mesh_never_writes_a_pixel_twice() {
    let rot = Affine::translate((20.0, 2.0)) * Affine::rotate(0.37) * Affine::scale(0.9);
    let mesh = GridMeshBuilder.build_mesh(&rot, 5.0, 30.0, 30.0).unwrap();
    let mut t = blank(48 * 48);
    map_mesh(
        &mesh,
        &[half_masked(30, 30, 50.0)],
        &mut [&mut t],
        48,
        48,
        MapperKind::SingleChannelWithAlpha,
        false,
        &pool(4),
    )
    .unwrap();
    assert!(t.coverage.iter().all(|c| *c == 0 || *c == 128));
    assert!(t.coverage.iter().filter(|c| **c == 128).count() > 400);
}

#[test]
fn thread_count_does_not_change_output() {
    let t = Affine::translate((3.3, -1.7)) * Affine::rotate(-0.2);
    let mesh = GridMeshBuilder.build_mesh(&t, 3.0, 20.0, 20.0).unwrap();
    let data: Vec<f32> = (0..400).map(|i| (i % 37) as f32 * 6.0).collect();
    let src = SourceChannel {
        image: Arc::new(Plane::from_vec(20, 20, data).unwrap()),
        mask: None,
    };
    let render = |threads| {
        let mut c = blank(24 * 24);
        map_mesh(
            &mesh,
            std::slice::from_ref(&src),
            &mut [&mut c],
            24,
            24,
            MapperKind::SingleChannel,
            true,
            &pool(threads),
        )
        .unwrap();
        c
    };
    assert_eq!(render(1), render(5));
}

#[test]
fn multi_channel_writes_each_target() {
    let mesh = GridMeshBuilder
        .build_mesh(&Affine::IDENTITY, 8.0, 8.0, 8.0)
        .unwrap();
    let a = SourceChannel {
        image: Arc::new(Plane::new(8, 8, 10.0)),
        mask: None,
    };
    let b = SourceChannel {
        image: Arc::new(Plane::new(8, 8, 20.0)),
        mask: None,
    };
    let (mut ta, mut tb) = (blank(64), blank(64));
    map_mesh(
        &mesh,
        &[a, b],
        &mut [&mut ta, &mut tb],
        8,
        8,
        MapperKind::MultiChannel,
        false,
        &pool(2),
    )
    .unwrap();
    assert!(ta.intensity.iter().all(|v| *v == 10.0));
    assert!(tb.intensity.iter().all(|v| *v == 20.0));
}

#[test]
fn mismatched_pairs_are_rejected() {
    let mesh = TransformMesh::default();
    let mut t = blank(4);
    let err = map_mesh(
        &mesh,
        &[],
        &mut [&mut t],
        2,
        2,
        MapperKind::SingleChannel,
        true,
        &pool(1),
    );
    assert!(err.is_err());
}
