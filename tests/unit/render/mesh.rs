use super::*;
use crate::transform::Polynomial2D;

fn close(a: Point, b: Point, eps: f64) -> bool {
    (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps
}

#[test]
fn grid_counts_follow_edge_length() {
    let mesh = GridMeshBuilder
        .build_mesh(&Affine::IDENTITY, 64.0, 256.0, 128.0)
        .unwrap();
    // 4 columns of width 64, 2 rows.
    assert_eq!(mesh.vertices().len(), 5 * 3);
    assert_eq!(mesh.triangles().len(), 4 * 2 * 2);
    assert_eq!(
        mesh.target_bounds().unwrap(),
        Rect::new(0.0, 0.0, 256.0, 128.0)
    );
}

#[test]
fn small_source_gets_one_cell() {
    let mesh = GridMeshBuilder
        .build_mesh(&Affine::IDENTITY, 64.0, 10.0, 3.0)
        .unwrap();
    assert_eq!(mesh.triangles().len(), 2);
    assert!(GridMeshBuilder
        .build_mesh(&Affine::IDENTITY, 64.0, 0.0, 3.0)
        .unwrap()
        .is_empty());
    assert!(GridMeshBuilder
        .build_mesh(&Affine::IDENTITY, 0.0, 10.0, 3.0)
        .is_err());
}

#[test]
fn vertices_match_direct_evaluation() {
    let warp = Polynomial2D::new(
        vec![3.0, 1.0, 0.0, 0.0005, 0.0, 0.0],
        vec![-1.0, 0.0, 1.0, 0.0, 0.0, 0.0002],
    )
    .unwrap();
    let mesh = GridMeshBuilder.build_mesh(&warp, 32.0, 200.0, 100.0).unwrap();
    for (s, t) in mesh.vertices() {
        assert!(close(warp.apply(*s), *t, 1e-12));
    }
}

#[test]
fn triangle_affine_inverts_corners() {
    let t = Affine::translate((5.0, 7.0)) * Affine::rotate(0.4) * Affine::scale(0.5);
    let mesh = GridMeshBuilder.build_mesh(&t, 16.0, 64.0, 64.0).unwrap();
    for tri in mesh.triangles() {
        for k in 0..3 {
            assert!(close(tri.target_to_source * tri.target[k], tri.source[k], 1e-9));
        }
    }
}

#[test]
fn degenerate_triangles_are_dropped() {
    let collapse = Affine::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(GridMeshBuilder
        .build_mesh(&collapse, 8.0, 16.0, 16.0)
        .unwrap()
        .is_empty());
}
