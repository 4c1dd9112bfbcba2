//! Triangle-mesh connectivity without half-edges.
//!
//! [`MeshWithConnectivity`] extends an indexed triangle mesh with per-triangle
//! neighbor tables: for triangle `i` and local edge `e` (the edge from local
//! vertex `e` to `(e+1)%3`), `neighbor_tris[i][e]` is the triangle on the
//! other side of that edge and `neighbor_edges[i][e]` the matching local edge
//! index within it, or `-1` on a boundary. The tables are an involution on
//! 2-manifold input:
//!
//! ```text
//! neighbor_tris[neighbor_tris[i][e]][neighbor_edges[i][e]] == i
//! ```
//!
//! They are rebuilt from scratch whenever topology changes; see
//! [`compute_connectivity`](MeshWithConnectivity::compute_connectivity).
//!
//! Non-manifold edges (a directed edge whose reverse has already been
//! consumed) are reported through [`ConnectivityDiagnostics`] and logged; the
//! triangle is otherwise processed as if the edge had no neighbor.

use std::collections::HashMap;

use super::mesh::{IndexedMesh, compute_smooth_normals, triangle_area_normal};
use super::{Point3, Vec3};

/// Default vertex color for freshly built meshes.
pub const BASE_VERTEX_COLOR: Vec3 = Vec3::new(0.75, 0.75, 0.75);

/// Counters collected while building connectivity tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityDiagnostics {
    /// Directed edges left without a neighbor (mesh boundary).
    pub boundary_edge_count: usize,
    /// Edges shared by more than two triangles.
    pub non_manifold_edge_count: usize,
}

/// Result of walking the one-ring around a vertex.
///
/// A closed ring carries the Loop even-vertex rule applied to the ring
/// averages; a boundary hit means the caller must leave the vertex untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OneRing {
    /// The ring closed; fields hold the repositioned vertex data.
    Closed {
        valence: usize,
        position: Point3,
        normal: Vec3,
        color: Vec3,
    },
    /// The walk crossed a boundary edge before returning to the start.
    Boundary,
}

/// A triangle mesh with parallel vertex attributes and neighbor tables.
#[derive(Debug, Clone, Default)]
pub struct MeshWithConnectivity {
    pub positions: Vec<Point3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    /// Subdivision age per vertex: 0 when created, +1 per surviving level.
    pub ages: Vec<u32>,
    pub triangles: Vec<[u32; 3]>,
    pub neighbor_tris: Vec<[i32; 3]>,
    pub neighbor_edges: Vec<[i32; 3]>,
}

impl MeshWithConnectivity {
    /// Build a connectivity mesh from an indexed mesh: default colors, zero
    /// ages, smooth normals, and freshly computed neighbor tables.
    #[must_use]
    pub fn from_mesh(mesh: &IndexedMesh) -> Self {
        let n = mesh.positions.len();
        let mut out = Self {
            positions: mesh.positions.clone(),
            normals: vec![Vec3::ZERO; n],
            colors: vec![BASE_VERTEX_COLOR; n],
            ages: vec![0; n],
            triangles: mesh.triangles.clone(),
            neighbor_tris: Vec::new(),
            neighbor_edges: Vec::new(),
        };
        out.compute_vertex_normals();
        out.compute_connectivity();
        out
    }

    /// Strip attributes and connectivity, keeping positions and triangles.
    #[must_use]
    pub fn to_indexed_mesh(&self) -> IndexedMesh {
        IndexedMesh::new(self.positions.clone(), self.triangles.clone())
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex index at local corner `j` of triangle `i`.
    #[inline]
    #[must_use]
    pub fn vertex(&self, i: usize, j: usize) -> u32 {
        self.triangles[i][j % 3]
    }

    /// Rebuild the neighbor tables from the current triangle list.
    ///
    /// Each directed edge `(v0, v1)` looks up its reverse `(v1, v0)` in a
    /// temporary map. The first occurrence records itself; the second links
    /// both triangles and marks the entry consumed. A third occurrence is a
    /// non-manifold edge: reported, and the triangle keeps `-1` there.
    pub fn compute_connectivity(&mut self) -> ConnectivityDiagnostics {
        self.neighbor_tris = vec![[-1; 3]; self.triangles.len()];
        self.neighbor_edges = vec![[-1; 3]; self.triangles.len()];

        // directed edge -> (triangle, local edge); triangle -1 = consumed
        let mut edge_map: HashMap<(u32, u32), (i32, i32)> = HashMap::new();
        let mut diagnostics = ConnectivityDiagnostics::default();

        for i in 0..self.triangles.len() {
            for j in 0..3 {
                let v0 = self.triangles[i][j];
                let v1 = self.triangles[i][(j + 1) % 3];

                match edge_map.get_mut(&(v1, v0)) {
                    None => {
                        // Reverse not seen yet; register our own direction so
                        // the neighbor can find us.
                        edge_map.insert((v0, v1), (i as i32, j as i32));
                    }
                    Some(entry) => {
                        if entry.0 == -1 {
                            diagnostics.non_manifold_edge_count += 1;
                            log::warn!(
                                "non-manifold edge ({v0}, {v1}) at triangle {i}; leaving boundary"
                            );
                        } else {
                            let (other_t, other_e) = (entry.0, entry.1);
                            self.neighbor_tris[i][j] = other_t;
                            self.neighbor_edges[i][j] = other_e;
                            self.neighbor_tris[other_t as usize][other_e as usize] = i as i32;
                            self.neighbor_edges[other_t as usize][other_e as usize] = j as i32;
                            entry.0 = -1;
                        }
                    }
                }
            }
        }

        for tri in &self.neighbor_tris {
            diagnostics.boundary_edge_count += tri.iter().filter(|&&t| t == -1).count();
        }
        diagnostics
    }

    /// Walk the ring of triangles around the vertex at corner `j` of triangle
    /// `i`, applying the Loop even-vertex rule to the collected neighbors.
    ///
    /// Crossing a boundary edge aborts the walk and returns
    /// [`OneRing::Boundary`]; the caller must then leave the vertex's data
    /// unchanged. When `debug_indices` is given, visited ring vertices are
    /// appended in walk order, with a `-1` sentinel on a boundary hit.
    #[must_use]
    pub fn traverse_one_ring(
        &self,
        i: usize,
        j: usize,
        mut debug_indices: Option<&mut Vec<i32>>,
    ) -> OneRing {
        let v0 = self.triangles[i][j] as usize;

        let start_tri = i as i32;
        let start_edge = j as i32;
        let mut ct = start_tri;
        let mut ce = start_edge;

        let mut sum_pos = Vec3::ZERO;
        let mut sum_col = Vec3::ZERO;
        let mut sum_nrm = Vec3::ZERO;
        let mut n = 0usize;

        loop {
            // Ring neighbor at the head of the edge leaving v0.
            let head = self.triangles[ct as usize][(ce as usize + 1) % 3] as usize;
            if let Some(dbg) = debug_indices.as_mut() {
                dbg.push(head as i32);
            }
            sum_pos = sum_pos.add(self.positions[head].to_vec3());
            sum_col = sum_col.add(self.colors[head]);
            sum_nrm = sum_nrm.add(self.normals[head]);
            n += 1;

            // Cross the edge that ends at v0 to reach the next triangle.
            let e_in = (ce as usize + 2) % 3;
            let nt = self.neighbor_tris[ct as usize][e_in];
            let ne = self.neighbor_edges[ct as usize][e_in];
            if nt == -1 || ne == -1 {
                if let Some(dbg) = debug_indices.as_mut() {
                    dbg.push(-1);
                }
                return OneRing::Boundary;
            }

            // The shared edge starts at v0 in the neighbor triangle.
            ct = nt;
            ce = ne;

            if ct == start_tri && ce == start_edge {
                break;
            }
            if n > self.positions.len() {
                // Malformed connectivity would loop forever otherwise.
                log::warn!("one-ring walk around vertex {v0} exceeded vertex count; aborting");
                return OneRing::Boundary;
            }
        }

        if n == 0 {
            return OneRing::Boundary;
        }

        let valence = n as f64;
        let theta = 2.0 * std::f64::consts::PI / valence;
        let beta = (5.0 / 8.0 - (3.0 / 8.0 + 0.25 * theta.cos()).powi(2)) / valence;
        let w_center = 1.0 - valence * beta;

        let position = Point3::from(
            self.positions[v0].to_vec3().mul_scalar(w_center).add(sum_pos.mul_scalar(beta)),
        );
        let color = self.colors[v0].mul_scalar(w_center).add(sum_col.mul_scalar(beta));
        let normal = self.normals[v0]
            .mul_scalar(w_center)
            .add(sum_nrm.mul_scalar(beta));
        let normal = normal.normalized_or(normal);

        OneRing::Closed { valence: n, position, normal, color }
    }

    /// Recompute vertex normals from current geometry by area-weighted
    /// face-normal accumulation.
    pub fn compute_vertex_normals(&mut self) {
        self.normals = compute_smooth_normals(&self.positions, &self.triangles);
    }

    /// Color vertices by an estimate of signed mean curvature.
    ///
    /// The discrete Laplacian (mean of one-ring neighbors minus the vertex)
    /// is projected onto the vertex normal, normalized by the given
    /// percentile of curvature magnitudes, and mapped onto a warm/cool
    /// diverging ramp around a light-grey base.
    pub fn colorize_by_curvature(&mut self, gamma: f64, percentile: f64) {
        if self.positions.is_empty() {
            return;
        }
        let percentile = percentile.clamp(0.0, 0.999);
        let base = Vec3::new(0.82, 0.82, 0.82);
        if self.colors.len() != self.positions.len() {
            self.colors = vec![base; self.positions.len()];
        }

        let mut neighbor_sum = vec![Vec3::ZERO; self.positions.len()];
        let mut valence = vec![0u32; self.positions.len()];
        {
            let mut accumulate = |a: usize, b: usize| {
                neighbor_sum[a] = neighbor_sum[a].add(self.positions[b].to_vec3());
                valence[a] += 1;
            };
            for tri in &self.triangles {
                let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
                accumulate(i0, i1);
                accumulate(i0, i2);
                accumulate(i1, i0);
                accumulate(i1, i2);
                accumulate(i2, i0);
                accumulate(i2, i1);
            }
        }

        let mut signed_curvature = vec![0.0f64; self.positions.len()];
        let mut magnitudes = Vec::with_capacity(self.positions.len());
        let mut max_abs = 0.0f64;

        for i in 0..self.positions.len() {
            if valence[i] == 0 {
                continue;
            }
            let Some(n) = self.normals[i].normalized() else {
                continue;
            };
            let mean = neighbor_sum[i].mul_scalar(1.0 / f64::from(valence[i]));
            let laplacian = mean.sub(self.positions[i].to_vec3());
            let h = -laplacian.dot(n);
            signed_curvature[i] = h;
            magnitudes.push(h.abs());
            max_abs = max_abs.max(h.abs());
        }

        if magnitudes.is_empty() || max_abs < 1e-8 {
            self.colors.fill(base);
            return;
        }

        // Percentile normalization keeps a few outliers from washing out the map.
        let nth = ((percentile * (magnitudes.len() - 1) as f64) as usize).min(magnitudes.len() - 1);
        magnitudes.sort_by(f64::total_cmp);
        let mut scale = magnitudes[nth];
        if scale < 1e-8 {
            scale = max_abs;
        }

        let warm_lo = Vec3::new(0.98, 0.68, 0.20);
        let warm_hi = Vec3::new(0.85, 0.16, 0.05);
        let cool_lo = Vec3::new(0.30, 0.80, 1.00);
        let cool_hi = Vec3::new(0.05, 0.25, 0.70);

        for i in 0..self.positions.len() {
            if valence[i] == 0 {
                self.colors[i] = base;
                continue;
            }
            let h = signed_curvature[i];
            let normalized = (h.abs() / scale).min(1.0);
            let weight = if gamma > 0.0 { normalized.powf(gamma) } else { normalized };
            if weight < 1e-4 {
                self.colors[i] = base;
                continue;
            }
            let accent = if h >= 0.0 {
                warm_lo.lerp(warm_hi, weight)
            } else {
                cool_lo.lerp(cool_hi, weight)
            };
            self.colors[i] = base.lerp(accent, weight);
        }
    }

    /// Sum of triangle areas, used by a few sanity checks.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|tri| {
                0.5 * triangle_area_normal(
                    self.positions[tri[0] as usize],
                    self.positions[tri[1] as usize],
                    self.positions[tri[2] as usize],
                )
                .length()
            })
            .sum()
    }
}
