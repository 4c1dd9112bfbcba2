//! Tests for swept surface generation.

use crate::geom::{
    CurvePoint, Point3, SplineCurve, Vec3, make_gen_cyl, make_gen_cyl_piecewise, make_surf_rev,
    split_at_discontinuities, tessellate_curve,
};

fn flat_profile() -> Vec<CurvePoint> {
    tessellate_curve(
        &SplineCurve::CatmullRom {
            control_points: vec![
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(1.5, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ],
        },
        4,
    )
    .unwrap()
    .into_iter()
    .map(|mut p| {
        // Flatten the frame into the xy-plane the way a profile curve is
        // authored: zero z in position, tangent, and normal.
        p.position.z = 0.0;
        p.tangent.z = 0.0;
        p.normal.z = 0.0;
        p
    })
    .collect()
}

#[test]
fn test_revolution_closure() {
    let profile = flat_profile();
    let k = profile.len();
    let steps = 10;
    let surface = make_surf_rev(&profile, steps).unwrap();

    // k·steps vertices, closed sweep topology of 2·(k−1)·steps triangles.
    assert_eq!(surface.vertex_count(), k * steps);
    assert_eq!(surface.triangle_count(), 2 * (k - 1) * steps);

    // Index range never exceeds k·steps − 1 (the sweep wraps, it does not
    // invent vertices).
    let max_index = surface.indices.iter().flatten().copied().max().unwrap();
    assert_eq!(surface.normals.len(), surface.positions.len());
    assert!((max_index as usize) <= k * steps - 1);

    // The wrap slice references both the last and the first angular copy.
    let last_slice_start = ((steps - 1) * k) as i32;
    let references_wrap = surface
        .indices
        .iter()
        .any(|tri| tri.iter().any(|&i| i >= last_slice_start) && tri.iter().any(|&i| i < k as i32));
    assert!(references_wrap, "revolution should close around the axis");
}

#[test]
fn test_revolution_preserves_profile_radii() {
    let profile = flat_profile();
    let surface = make_surf_rev(&profile, 8).unwrap();
    // Each vertex keeps its source profile point's distance from the y-axis.
    for (v, p) in surface.positions.iter().enumerate() {
        let source = &profile[v % profile.len()];
        let expected = source.position.x.abs();
        let actual = (p.x * p.x + p.z * p.z).sqrt();
        assert!((actual - expected).abs() < 1e-9);
        assert!((p.y - source.position.y).abs() < 1e-12);
    }
}

#[test]
fn test_gen_cyl_along_spline_path() {
    let profile = flat_profile();
    let path = tessellate_curve(
        &SplineCurve::Bspline {
            control_points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 2.0, 1.0),
                Point3::new(1.0, 4.0, 0.0),
                Point3::new(0.0, 6.0, -1.0),
                Point3::new(0.0, 8.0, 0.0),
            ],
        },
        6,
    )
    .unwrap();

    let surface = make_gen_cyl(&profile, &path).unwrap();
    assert_eq!(surface.vertex_count(), profile.len() * path.len());
    assert_eq!(
        surface.triangle_count(),
        2 * (profile.len() - 1) * (path.len() - 1)
    );
    for n in &surface.normals {
        assert!((n.length() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_piecewise_pipeline_from_discontinuous_path() {
    // Build a path with a sharp 90° corner, split it, and sweep piecewise:
    // the corner must not be bridged.
    let mut path = Vec::new();
    for i in 0..6 {
        path.push(CurvePoint::at(Point3::new(f64::from(i) * 0.005, 0.0, 0.0), Vec3::X));
    }
    for i in 1..6 {
        path.push(CurvePoint::at(Point3::new(0.025, f64::from(i) * 0.005, 0.0), Vec3::Y));
    }
    let segments = split_at_discontinuities(&path);
    assert_eq!(segments.len(), 2);

    let profile = flat_profile();
    let surface = make_gen_cyl_piecewise(&profile, &segments).unwrap();
    let expected_vertices = profile.len() * (segments[0].len() + segments[1].len());
    assert_eq!(surface.vertex_count(), expected_vertices);
    let expected_triangles =
        2 * (profile.len() - 1) * ((segments[0].len() - 1) + (segments[1].len() - 1));
    assert_eq!(surface.triangle_count(), expected_triangles);
}

#[test]
fn test_flatness_is_enforced_everywhere() {
    let mut profile = flat_profile();
    profile[0].tangent.z = 0.5;
    assert!(make_surf_rev(&profile, 8).is_err());
    assert!(make_gen_cyl(&profile, &flat_profile()).is_err());
    assert!(make_gen_cyl_piecewise(&profile, &[flat_profile()]).is_err());
}
