//! Plain indexed triangle meshes.
//!
//! [`IndexedMesh`] is the interchange type between the loaders, the
//! simplifier, and the connectivity layer: a position buffer plus CCW
//! triangle index triples, nothing else. Connectivity-aware operations
//! (subdivision, one-ring traversal) use
//! [`MeshWithConnectivity`](super::connectivity::MeshWithConnectivity)
//! built from this type.

use super::{Point3, Vec3};

/// Errors for indexed-mesh validation.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// A triangle references a vertex index outside the position buffer.
    #[error("triangle {triangle} references out-of-bounds vertex {index}")]
    IndexOutOfBounds { triangle: usize, index: u32 },

    /// A vertex position contains NaN or infinite coordinates.
    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },
}

/// An indexed triangle mesh with counter-clockwise winding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    pub positions: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
}

impl IndexedMesh {
    #[must_use]
    pub fn new(positions: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        Self { positions, triangles }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Check the index-bounds and finiteness invariants.
    pub fn validate(&self) -> Result<(), MeshError> {
        for (i, p) in self.positions.iter().enumerate() {
            if !p.is_finite() {
                return Err(MeshError::NonFiniteVertex { index: i });
            }
        }
        let n = self.positions.len() as u32;
        for (t, tri) in self.triangles.iter().enumerate() {
            for &idx in tri {
                if idx >= n {
                    return Err(MeshError::IndexOutOfBounds { triangle: t, index: idx });
                }
            }
        }
        Ok(())
    }

    /// Count edges that belong to exactly one triangle.
    #[must_use]
    pub fn open_edge_count(&self) -> usize {
        use std::collections::HashMap;
        let mut counts: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in &self.triangles {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let key = if a <= b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts.values().filter(|&&c| c == 1).count()
    }
}

/// Area-weighted triangle normal: cross product of two edges, length equal
/// to twice the triangle area.
#[must_use]
pub fn triangle_area_normal(a: Point3, b: Point3, c: Point3) -> Vec3 {
    (b - a).cross(c - a)
}

/// Area of the triangle spanned by three points.
#[must_use]
pub fn triangle_area(a: Point3, b: Point3, c: Point3) -> f64 {
    0.5 * triangle_area_normal(a, b, c).length()
}

/// Compute per-vertex normals by accumulating area-weighted face normals
/// and normalizing the sums. Vertices not referenced by any triangle keep
/// a zero normal.
#[must_use]
pub fn compute_smooth_normals(positions: &[Point3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in triangles {
        let a = positions[tri[0] as usize];
        let b = positions[tri[1] as usize];
        let c = positions[tri[2] as usize];
        let face = triangle_area_normal(a, b, c);
        for &idx in tri {
            normals[idx as usize] = normals[idx as usize].add(face);
        }
    }
    for n in &mut normals {
        if let Some(unit) = n.normalized() {
            *n = unit;
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> IndexedMesh {
        IndexedMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_validate_accepts_unit_triangle() {
        assert!(unit_triangle().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let mut mesh = unit_triangle();
        mesh.triangles.push([0, 1, 7]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IndexOutOfBounds { triangle: 1, index: 7 })
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut mesh = unit_triangle();
        mesh.positions[1] = Point3::new(f64::NAN, 0.0, 0.0);
        assert!(matches!(mesh.validate(), Err(MeshError::NonFiniteVertex { index: 1 })));
    }

    #[test]
    fn test_open_edges_of_single_triangle() {
        assert_eq!(unit_triangle().open_edge_count(), 3);
    }

    #[test]
    fn test_smooth_normals_flat_triangle() {
        let mesh = unit_triangle();
        let normals = compute_smooth_normals(&mesh.positions, &mesh.triangles);
        for n in normals {
            assert!((n.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_triangle_area() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);
        assert!((triangle_area(a, b, c) - 2.0).abs() < 1e-12);
    }
}
