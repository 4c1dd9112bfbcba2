//! Tests for curve tessellation across every supported family.

use crate::geom::{Point3, SplineCurve, tessellate_curve};

fn zigzag(n: usize) -> Vec<Point3> {
    (0..n)
        .map(|i| Point3::new(i as f64, if i % 2 == 0 { 0.0 } else { 1.0 }, i as f64 * 0.1))
        .collect()
}

#[test]
fn test_endpoint_inclusion_every_family() {
    // Bezier and B-spline/Catmull-Rom have different analytic endpoints, but
    // the tessellation must always include whatever the exact first and last
    // curve points are. Evaluate those directly from the curve definitions.
    let bezier_points = zigzag(7);
    let bezier = tessellate_curve(
        &SplineCurve::Bezier { control_points: bezier_points.clone() },
        5,
    )
    .unwrap();
    // Bezier interpolates its first and last control points.
    assert!(bezier.first().unwrap().position.distance_to(bezier_points[0]) < 1e-12);
    assert!(bezier.last().unwrap().position.distance_to(bezier_points[6]) < 1e-12);

    let bspline_points = zigzag(6);
    let bspline = tessellate_curve(
        &SplineCurve::Bspline { control_points: bspline_points.clone() },
        5,
    )
    .unwrap();
    // Uniform B-spline starts at (p0 + 4p1 + p2) / 6.
    let start = bspline_points[0]
        .to_vec3()
        .add(bspline_points[1].to_vec3().mul_scalar(4.0))
        .add(bspline_points[2].to_vec3())
        .mul_scalar(1.0 / 6.0);
    let end = bspline_points[3]
        .to_vec3()
        .add(bspline_points[4].to_vec3().mul_scalar(4.0))
        .add(bspline_points[5].to_vec3())
        .mul_scalar(1.0 / 6.0);
    assert!(bspline.first().unwrap().position.distance_to(Point3::from(start)) < 1e-9);
    assert!(bspline.last().unwrap().position.distance_to(Point3::from(end)) < 1e-9);

    let cr_points = zigzag(5);
    let catmull = tessellate_curve(
        &SplineCurve::CatmullRom { control_points: cr_points.clone() },
        5,
    )
    .unwrap();
    // Catmull-Rom with duplicated ends interpolates both extremes.
    assert!(catmull.first().unwrap().position.distance_to(cr_points[0]) < 1e-9);
    assert!(catmull.last().unwrap().position.distance_to(cr_points[4]) < 1e-9);

    let kappa_points =
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.5, 0.8, 0.0)];
    let kappa = tessellate_curve(
        &SplineCurve::Kappa { control_points: kappa_points.clone() },
        5,
    )
    .unwrap();
    // The closed κ-curve starts and ends at the first control point.
    assert!(kappa.first().unwrap().position.distance_to(kappa_points[0]) < 1e-9);
    assert!(kappa.last().unwrap().position.distance_to(kappa_points[0]) < 1e-9);
}

#[test]
fn test_circle_exactness() {
    let radius = 2.5;
    let intervals = 8;
    let circle = tessellate_curve(
        &SplineCurve::Circle {
            control_points: vec![Point3::new(radius, 0.0, 0.0), Point3::ORIGIN],
        },
        intervals,
    )
    .unwrap();

    assert_eq!(circle.len(), 4 * intervals as usize);
    for p in &circle {
        let r = p.position.to_vec3().length();
        assert!((r - radius).abs() < 1e-9, "sample radius {r}");
    }
    // Closed loop: first and last samples coincide angularly.
    let first = circle.first().unwrap().position;
    let last = circle.last().unwrap().position;
    assert!(first.distance_to(last) < 1e-6);
}

#[test]
fn test_piecewise_families_concatenate() {
    let seg = zigzag(4);
    let curve = tessellate_curve(
        &SplineCurve::BezierPiecewise { segments: vec![seg.clone(), seg.clone()] },
        4,
    )
    .unwrap();
    let single =
        tessellate_curve(&SplineCurve::Bezier { control_points: seg.clone() }, 4).unwrap();
    assert_eq!(curve.len(), single.len() * 2);

    let bsp_seg = zigzag(5);
    let bsp = tessellate_curve(
        &SplineCurve::BsplinePiecewise { segments: vec![bsp_seg.clone(), bsp_seg.clone()] },
        4,
    )
    .unwrap();
    let bsp_single =
        tessellate_curve(&SplineCurve::Bspline { control_points: bsp_seg }, 4).unwrap();
    assert_eq!(bsp.len(), bsp_single.len() * 2);
}

#[test]
fn test_malformed_counts_are_fatal_per_family() {
    assert!(tessellate_curve(&SplineCurve::Bezier { control_points: zigzag(6) }, 4).is_err());
    assert!(tessellate_curve(&SplineCurve::Bspline { control_points: zigzag(3) }, 4).is_err());
    assert!(
        tessellate_curve(&SplineCurve::CatmullRom { control_points: zigzag(1) }, 4).is_err()
    );
    assert!(tessellate_curve(&SplineCurve::Kappa { control_points: zigzag(2) }, 4).is_err());
    assert!(tessellate_curve(&SplineCurve::Circle { control_points: zigzag(3) }, 4).is_err());
}

#[test]
fn test_frames_unit_and_orthogonal_after_dispatch() {
    let curve = tessellate_curve(&SplineCurve::CatmullRom { control_points: zigzag(6) }, 8)
        .unwrap();
    for p in &curve {
        assert!((p.tangent.length() - 1.0).abs() < 1e-9);
        assert!((p.normal.length() - 1.0).abs() < 1e-9);
        assert!((p.binormal.length() - 1.0).abs() < 1e-9);
        assert!(p.tangent.dot(p.normal).abs() < 1e-9);
        // Right-handed frame: binormal == tangent × normal.
        let expected = p.tangent.cross(p.normal);
        assert!(expected.sub(p.binormal).length() < 1e-9);
    }
}
