//! Isosurface extraction from raw scalar volumes by marching tetrahedra.
//!
//! Each voxel cube is decomposed into six tetrahedra with a fixed
//! corner-index scheme (corner id `x + 2y + 4z`), which avoids the
//! topological ambiguities of cube-based marching. Per tetrahedron the 4-bit
//! above/below mask selects one of seven topological patterns (the fifteen
//! non-trivial masks collapse pairwise by complement symmetry): one corner
//! isolated on either side yields a triangle, a two/two split yields a quad
//! emitted as two triangles.
//!
//! Intersection points interpolate linearly by scalar value along the
//! crossing edge. Shading normals average the central-difference gradient of
//! the two edge endpoints and are direction-corrected to agree with the
//! triangle winding, which itself is oriented from the above-threshold side
//! toward the below side.

use std::path::Path;

use super::surface::GeneratedSurface;
use super::{Point3, Vec3};

/// Sample type of a raw volume file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDtype {
    Uint8,
    Uint16,
    Float32,
}

impl VolumeDtype {
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Float32 => 4,
        }
    }
}

impl std::str::FromStr for VolumeDtype {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uint8" => Ok(Self::Uint8),
            "uint16" => Ok(Self::Uint16),
            "float32" => Ok(Self::Float32),
            other => Err(VolumeError::UnsupportedDtype(other.to_owned())),
        }
    }
}

/// Errors from loading a raw scalar volume.
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("unsupported volume dtype: {0}")]
    UnsupportedDtype(String),

    #[error("volume dims must all be at least 2, got {0}x{1}x{2}")]
    DimsTooSmall(usize, usize, usize),

    #[error("volume file holds {got} bytes, expected {expected}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("failed to read volume file: {0}")]
    Io(#[from] std::io::Error),
}

/// Volume samples in their native dtype. Integer samples normalize to
/// `[0, 1]` when read.
#[derive(Debug, Clone)]
pub enum VolumeSamples {
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Float32(Vec<f32>),
}

impl VolumeSamples {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Uint8(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A scalar field sampled on a regular grid, row-major with x
/// fastest-varying.
#[derive(Debug, Clone)]
pub struct ScalarVolume {
    dims: [usize; 3],
    spacing: Vec3,
    origin: Point3,
    samples: VolumeSamples,
}

impl ScalarVolume {
    /// Wrap sample data. The sample count must equal `nx * ny * nz` and all
    /// dims must be at least 2.
    pub fn new(
        dims: [usize; 3],
        spacing: Vec3,
        origin: Point3,
        samples: VolumeSamples,
    ) -> Result<Self, VolumeError> {
        let [nx, ny, nz] = dims;
        if nx < 2 || ny < 2 || nz < 2 {
            return Err(VolumeError::DimsTooSmall(nx, ny, nz));
        }
        let expected = nx * ny * nz;
        if samples.len() != expected {
            return Err(VolumeError::SizeMismatch { expected, got: samples.len() });
        }
        Ok(Self { dims, spacing, origin, samples })
    }

    /// Load a flat binary volume file in the declared dtype.
    pub fn from_raw_file(
        path: &Path,
        dims: [usize; 3],
        dtype: VolumeDtype,
        spacing: Vec3,
        origin: Point3,
    ) -> Result<Self, VolumeError> {
        let bytes = std::fs::read(path)?;
        let voxel_count = dims[0] * dims[1] * dims[2];
        let expected = voxel_count * dtype.bytes_per_sample();
        if bytes.len() < expected {
            return Err(VolumeError::SizeMismatch { expected, got: bytes.len() });
        }

        let samples = match dtype {
            VolumeDtype::Uint8 => VolumeSamples::Uint8(bytes[..voxel_count].to_vec()),
            VolumeDtype::Uint16 => VolumeSamples::Uint16(
                bytes[..expected]
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            VolumeDtype::Float32 => VolumeSamples::Float32(
                bytes[..expected]
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        };
        Self::new(dims, spacing, origin, samples)
    }

    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Scalar value at a grid coordinate, normalized to `[0, 1]` for the
    /// integer dtypes.
    #[must_use]
    pub fn sample(&self, x: usize, y: usize, z: usize) -> f64 {
        let idx = x + self.dims[0] * (y + self.dims[1] * z);
        match &self.samples {
            VolumeSamples::Uint8(v) => f64::from(v[idx]) / 255.0,
            VolumeSamples::Uint16(v) => f64::from(v[idx]) / 65535.0,
            VolumeSamples::Float32(v) => f64::from(v[idx]),
        }
    }

    /// World-space position of a grid coordinate.
    #[must_use]
    pub fn grid_to_world(&self, x: usize, y: usize, z: usize) -> Point3 {
        self.origin.add_vec(Vec3::new(
            self.spacing.x * x as f64,
            self.spacing.y * y as f64,
            self.spacing.z * z as f64,
        ))
    }

    /// Central-difference gradient at a grid coordinate, clamped at the
    /// volume border, normalized when possible.
    #[must_use]
    pub fn gradient(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let clamp = |v: i64, hi: usize| v.clamp(0, hi as i64 - 1) as usize;
        let (x, y, z) = (x as i64, y as i64, z as i64);
        let [nx, ny, nz] = self.dims;
        let gx = 0.5
            * (self.sample(clamp(x + 1, nx), clamp(y, ny), clamp(z, nz))
                - self.sample(clamp(x - 1, nx), clamp(y, ny), clamp(z, nz)));
        let gy = 0.5
            * (self.sample(clamp(x, nx), clamp(y + 1, ny), clamp(z, nz))
                - self.sample(clamp(x, nx), clamp(y - 1, ny), clamp(z, nz)));
        let gz = 0.5
            * (self.sample(clamp(x, nx), clamp(y, ny), clamp(z + 1, nz))
                - self.sample(clamp(x, nx), clamp(y, ny), clamp(z - 1, nz)));
        let g = Vec3::new(gx, gy, gz);
        g.normalized_or(g)
    }
}

/// Fixed decomposition of a voxel cube into six tetrahedra.
/// Cube corner id `x + 2y + 4z` for `(x, y, z)` in `{0, 1}³`.
const CUBE_TETS: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 3, 2, 7],
    [0, 2, 6, 7],
    [0, 6, 4, 7],
    [0, 4, 5, 7],
    [0, 5, 1, 7],
];

#[inline]
fn cube_corner(corner: usize) -> (usize, usize, usize) {
    (corner & 1, (corner >> 1) & 1, (corner >> 2) & 1)
}

/// Extract the isosurface of a scalar volume at the given threshold.
pub fn make_iso_surface(volume: &ScalarVolume, iso: f64) -> GeneratedSurface {
    let mut surface = GeneratedSurface::default();
    let [nx, ny, nz] = volume.dims();
    if nx < 2 || ny < 2 || nz < 2 {
        return surface;
    }

    let interp = |p0: Point3, p1: Point3, s0: f64, s1: f64| -> Point3 {
        let t = ((iso - s0) / (s1 - s0 + 1e-20)).clamp(0.0, 1.0);
        p0.lerp(p1, t)
    };

    for z in 0..nz - 1 {
        for y in 0..ny - 1 {
            for x in 0..nx - 1 {
                let mut corner_pos = [Point3::ORIGIN; 8];
                let mut corner_val = [0.0f64; 8];
                let mut corner_grad = [Vec3::ZERO; 8];
                for corner in 0..8 {
                    let (dx, dy, dz) = cube_corner(corner);
                    let (xi, yi, zi) = (x + dx, y + dy, z + dz);
                    corner_pos[corner] = volume.grid_to_world(xi, yi, zi);
                    corner_val[corner] = volume.sample(xi, yi, zi);
                    corner_grad[corner] = volume.gradient(xi, yi, zi);
                }

                for tet in &CUBE_TETS {
                    let s = [
                        corner_val[tet[0]],
                        corner_val[tet[1]],
                        corner_val[tet[2]],
                        corner_val[tet[3]],
                    ];
                    let p = [
                        corner_pos[tet[0]],
                        corner_pos[tet[1]],
                        corner_pos[tet[2]],
                        corner_pos[tet[3]],
                    ];
                    let g = [
                        corner_grad[tet[0]],
                        corner_grad[tet[1]],
                        corner_grad[tet[2]],
                        corner_grad[tet[3]],
                    ];

                    let mut above: Vec<usize> = Vec::with_capacity(4);
                    let mut below: Vec<usize> = Vec::with_capacity(4);
                    for k in 0..4 {
                        if s[k] >= iso {
                            above.push(k);
                        } else {
                            below.push(k);
                        }
                    }
                    if above.is_empty() || below.is_empty() {
                        continue;
                    }

                    let edge_point = |a: usize, b: usize| interp(p[a], p[b], s[a], s[b]);
                    let edge_normal =
                        |a: usize, b: usize| g[a].lerp(g[b], 0.5).normalized_or(Vec3::Z);
                    // Winding reference: from the above (inside) side toward
                    // the below side.
                    let outward = {
                        let centroid = |set: &[usize]| {
                            let mut sum = Vec3::ZERO;
                            for &k in set {
                                sum = sum.add(p[k].to_vec3());
                            }
                            sum.mul_scalar(1.0 / set.len() as f64)
                        };
                        centroid(&below).sub(centroid(&above))
                    };

                    match (above.len(), below.len()) {
                        // One corner isolated: a single triangle caps it.
                        (1, 3) | (3, 1) => {
                            let (apex, base) = if above.len() == 1 {
                                (above[0], &below)
                            } else {
                                (below[0], &above)
                            };
                            let verts = [
                                edge_point(apex, base[0]),
                                edge_point(apex, base[1]),
                                edge_point(apex, base[2]),
                            ];
                            let normals = [
                                edge_normal(apex, base[0]),
                                edge_normal(apex, base[1]),
                                edge_normal(apex, base[2]),
                            ];
                            emit_triangle(&mut surface, verts, normals, outward);
                        }
                        // Two-by-two split: a quad as two triangles.
                        (2, 2) => {
                            let (a0, a1) = (above[0], above[1]);
                            let (b0, b1) = (below[0], below[1]);
                            let q00 = edge_point(a0, b0);
                            let q10 = edge_point(a1, b0);
                            let q11 = edge_point(a1, b1);
                            let q01 = edge_point(a0, b1);
                            let n00 = edge_normal(a0, b0);
                            let n10 = edge_normal(a1, b0);
                            let n11 = edge_normal(a1, b1);
                            let n01 = edge_normal(a0, b1);
                            emit_triangle(&mut surface, [q00, q10, q11], [n00, n10, n11], outward);
                            emit_triangle(&mut surface, [q00, q11, q01], [n00, n11, n01], outward);
                        }
                        _ => unreachable!("above/below partition of 4 corners"),
                    }
                }
            }
        }
    }

    surface
}

/// Extract an isosurface directly from a RAW volume file.
///
/// Load failures are logged and yield an empty surface; rendering nothing is
/// the defined user-visible behavior for a malformed volume.
pub fn make_iso_surface_raw(
    path: &Path,
    dims: [usize; 3],
    iso: f64,
    spacing: Vec3,
    origin: Point3,
    dtype: VolumeDtype,
) -> GeneratedSurface {
    match ScalarVolume::from_raw_file(path, dims, dtype, spacing, origin) {
        Ok(volume) => make_iso_surface(&volume, iso),
        Err(err) => {
            log::error!("failed to load RAW volume {}: {err}", path.display());
            GeneratedSurface::default()
        }
    }
}

/// Append one triangle, flipping winding to agree with `outward` and
/// direction-correcting each vertex normal against the face orientation.
fn emit_triangle(
    surface: &mut GeneratedSurface,
    verts: [Point3; 3],
    normals: [Vec3; 3],
    outward: Vec3,
) {
    let face = (verts[1] - verts[0]).cross(verts[2] - verts[0]);
    let flip = face.dot(outward) < 0.0;
    let (verts, mut normals) =
        if flip { ([verts[0], verts[2], verts[1]], [normals[0], normals[2], normals[1]]) } else { (verts, normals) };

    let face = (verts[1] - verts[0]).cross(verts[2] - verts[0]);
    if let Some(face_unit) = face.normalized() {
        for n in &mut normals {
            if n.dot(face_unit) < 0.0 {
                *n = n.neg();
            }
        }
    }

    let base = surface.positions.len() as i32;
    surface.positions.extend_from_slice(&verts);
    surface.normals.extend_from_slice(&normals);
    surface.indices.push([base, base + 1, base + 2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_volume(n: usize, radius: f64) -> ScalarVolume {
        // Binary sphere: 1 inside `radius` of the grid center, 0 outside.
        let center = (n as f64 - 1.0) / 2.0;
        let mut data = Vec::with_capacity(n * n * n);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let dx = x as f64 - center;
                    let dy = y as f64 - center;
                    let dz = z as f64 - center;
                    let inside = (dx * dx + dy * dy + dz * dz).sqrt() <= radius;
                    data.push(if inside { 1.0f32 } else { 0.0f32 });
                }
            }
        }
        ScalarVolume::new(
            [n, n, n],
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
            VolumeSamples::Float32(data),
        )
        .unwrap()
    }

    #[test]
    fn test_volume_rejects_size_mismatch() {
        let result = ScalarVolume::new(
            [4, 4, 4],
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
            VolumeSamples::Uint8(vec![0; 63]),
        );
        assert!(matches!(result, Err(VolumeError::SizeMismatch { expected: 64, got: 63 })));
    }

    #[test]
    fn test_volume_rejects_tiny_dims() {
        let result = ScalarVolume::new(
            [1, 4, 4],
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
            VolumeSamples::Uint8(vec![0; 16]),
        );
        assert!(matches!(result, Err(VolumeError::DimsTooSmall(1, 4, 4))));
    }

    #[test]
    fn test_uint8_samples_normalize() {
        let volume = ScalarVolume::new(
            [2, 2, 2],
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
            VolumeSamples::Uint8(vec![0, 255, 0, 0, 0, 0, 0, 51]),
        )
        .unwrap();
        assert!((volume.sample(1, 0, 0) - 1.0).abs() < 1e-12);
        assert!((volume.sample(1, 1, 1) - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_empty_field_gives_empty_surface() {
        let volume = ScalarVolume::new(
            [3, 3, 3],
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
            VolumeSamples::Uint8(vec![0; 27]),
        )
        .unwrap();
        assert!(make_iso_surface(&volume, 0.5).is_empty());
    }

    #[test]
    fn test_sphere_vertices_near_radius() {
        let n = 16;
        let radius = 5.0;
        let volume = sphere_volume(n, radius);
        let surface = make_iso_surface(&volume, 0.5);
        assert!(!surface.is_empty());

        let center = Point3::new((n as f64 - 1.0) / 2.0, (n as f64 - 1.0) / 2.0, (n as f64 - 1.0) / 2.0);
        let cell_diagonal = 3.0f64.sqrt();
        for p in &surface.positions {
            let r = p.distance_to(center);
            assert!(
                r >= radius - cell_diagonal && r <= radius + cell_diagonal,
                "vertex at radius {r}, expected within [{}, {}]",
                radius - cell_diagonal,
                radius + cell_diagonal,
            );
        }
    }

    #[test]
    fn test_sphere_windings_face_outward() {
        let volume = sphere_volume(12, 4.0);
        let surface = make_iso_surface(&volume, 0.5);
        let center = Point3::new(5.5, 5.5, 5.5);

        let mut outward_count = 0usize;
        for tri in &surface.indices {
            let a = surface.positions[tri[0] as usize];
            let b = surface.positions[tri[1] as usize];
            let c = surface.positions[tri[2] as usize];
            let face = (b - a).cross(c - a);
            let centroid = Point3::new(
                (a.x + b.x + c.x) / 3.0,
                (a.y + b.y + c.y) / 3.0,
                (a.z + b.z + c.z) / 3.0,
            );
            if face.dot(centroid - center) > 0.0 {
                outward_count += 1;
            }
        }
        // The winding reference is per-tetrahedron, so allow a small number
        // of borderline slivers to disagree.
        assert!(outward_count * 10 >= surface.indices.len() * 9);
    }

    #[test]
    fn test_raw_file_roundtrip() {
        let dir = std::env::temp_dir();
        let path = dir.join("geomlab_engine_test_volume.raw");
        let mut bytes = Vec::new();
        for value in 0u16..8 {
            bytes.extend_from_slice(&(value * 8192).to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        let volume = ScalarVolume::from_raw_file(
            &path,
            [2, 2, 2],
            VolumeDtype::Uint16,
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
        )
        .unwrap();
        assert!((volume.sample(0, 0, 0) - 0.0).abs() < 1e-9);
        assert!(volume.sample(1, 1, 1) > 0.8);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_raw_wrapper_returns_empty_on_missing_file() {
        let surface = make_iso_surface_raw(
            Path::new("/nonexistent/volume.raw"),
            [4, 4, 4],
            0.5,
            Vec3::new(1.0, 1.0, 1.0),
            Point3::ORIGIN,
            VolumeDtype::Uint8,
        );
        assert!(surface.is_empty());
    }
}
