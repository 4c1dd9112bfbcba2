//! End-to-end isosurface extraction from RAW volume files.

use crate::geom::{Point3, Vec3, VolumeDtype, make_iso_surface_raw};

/// Write a binary sphere volume (uint8: 255 inside, 0 outside) to a temp
/// RAW file and return its path.
fn write_sphere_volume(n: usize, radius: f64, name: &str) -> std::path::PathBuf {
    let center = (n as f64 - 1.0) / 2.0;
    let mut bytes = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let dx = x as f64 - center;
                let dy = y as f64 - center;
                let dz = z as f64 - center;
                let inside = (dx * dx + dy * dy + dz * dz).sqrt() <= radius;
                bytes.push(if inside { 255u8 } else { 0u8 });
            }
        }
    }
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, &bytes).unwrap();
    path
}

#[test]
fn test_raw_sphere_extraction_sign_consistency() {
    let n = 14;
    let radius = 4.5;
    let path = write_sphere_volume(n, radius, "geomlab_iso_sphere.raw");

    let surface = make_iso_surface_raw(
        &path,
        [n, n, n],
        0.5,
        Vec3::new(1.0, 1.0, 1.0),
        Point3::ORIGIN,
        VolumeDtype::Uint8,
    );
    std::fs::remove_file(&path).ok();

    assert!(!surface.is_empty());
    assert_eq!(surface.positions.len(), surface.normals.len());

    let c = (n as f64 - 1.0) / 2.0;
    let center = Point3::new(c, c, c);
    let cell_diagonal = 3.0f64.sqrt();
    for p in &surface.positions {
        let r = p.distance_to(center);
        assert!(
            (radius - cell_diagonal..=radius + cell_diagonal).contains(&r),
            "vertex radius {r} outside sphere shell"
        );
    }
}

#[test]
fn test_spacing_and_origin_place_surface_in_world() {
    let n = 10;
    let radius = 3.0;
    let path = write_sphere_volume(n, radius, "geomlab_iso_sphere_spaced.raw");

    let spacing = Vec3::new(2.0, 2.0, 2.0);
    let origin = Point3::new(100.0, 0.0, -50.0);
    let surface = make_iso_surface_raw(
        &path,
        [n, n, n],
        0.5,
        spacing,
        origin,
        VolumeDtype::Uint8,
    );
    std::fs::remove_file(&path).ok();

    assert!(!surface.is_empty());
    let c = (n as f64 - 1.0) / 2.0;
    let center = Point3::new(100.0 + 2.0 * c, 2.0 * c, -50.0 + 2.0 * c);
    let shell = 2.0 * radius; // radius in world units (spacing 2)
    let cell_diagonal = 2.0 * 3.0f64.sqrt();
    for p in &surface.positions {
        let r = p.distance_to(center);
        assert!((shell - cell_diagonal..=shell + cell_diagonal).contains(&r));
    }
}

#[test]
fn test_truncated_file_yields_empty_surface() {
    let path = std::env::temp_dir().join("geomlab_iso_truncated.raw");
    std::fs::write(&path, [0u8; 16]).unwrap();
    let surface = make_iso_surface_raw(
        &path,
        [8, 8, 8],
        0.5,
        Vec3::new(1.0, 1.0, 1.0),
        Point3::ORIGIN,
        VolumeDtype::Uint8,
    );
    std::fs::remove_file(&path).ok();
    assert!(surface.is_empty());
}
