//! One-level Loop subdivision over [`MeshWithConnectivity`].
//!
//! Each call to [`loop_subdivide`] performs exactly one subdivision level in
//! two passes:
//!
//! 1. **Odd vertices**: one new vertex per undirected edge. The default
//!    position is the edge midpoint; under the edge-rule sub-modes the
//!    interior Loop weights apply (3/8 on the endpoints, 1/8 on the two
//!    opposite apexes). Boundary edges fall back to the midpoint rule unless
//!    crude boundary handling is requested, in which case a missing opposite
//!    simply contributes zero without reweighting.
//! 2. **Even vertices**: existing vertices repositioned in place. Only the
//!    full mode moves them: interior vertices by the valence-weighted
//!    `β(n)` rule via one-ring traversal, boundary vertices by the
//!    `3/4 + 1/8 + 1/8` rule over their two boundary neighbors. A boundary
//!    hit during traversal, or fewer than two boundary neighbors, pins the
//!    vertex.
//!
//! Topology regeneration splits every triangle into four with consistent
//! winding. Vertex ages track survival: odd vertices start at 0, even
//! vertices increment. Intermediate sub-modes recolor by an age gradient;
//! the full mode recolors by estimated mean curvature. Vertex normals are
//! recomputed from the final geometry and connectivity is rebuilt before
//! returning.
//!
//! [`SubdivisionCache`] holds the level sequence 0..k the way the
//! application's render loop consumes it: mode or boundary-handling changes
//! invalidate back to the base mesh, target-level changes only subdivide the
//! missing levels.

use std::collections::HashMap;

use super::connectivity::{MeshWithConnectivity, OneRing};
use super::{Point3, Vec3};

/// Which parts of the Loop scheme are applied.
///
/// The two reduced modes exist for the teaching UI, which shows the
/// subdivision stages separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubdivisionMode {
    /// Topology split only: odd vertices at edge midpoints, even vertices
    /// passed through.
    MidpointOnly,
    /// Odd vertices use the Loop edge rule; even vertices passed through.
    EdgeRule,
    /// Full Loop subdivision: edge rule plus even-vertex repositioning.
    Full,
}

impl SubdivisionMode {
    #[must_use]
    pub fn applies_edge_rule(self) -> bool {
        matches!(self, Self::EdgeRule | Self::Full)
    }

    #[must_use]
    pub fn repositions_even_vertices(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Options for one subdivision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubdivisionOptions {
    pub mode: SubdivisionMode,
    /// When true, boundary edges and vertices get no special treatment:
    /// boundary-adjacent odd vertices use the interior weights with missing
    /// opposites contributing zero, and boundary even vertices stay put.
    pub crude_boundaries: bool,
}

impl Default for SubdivisionOptions {
    fn default() -> Self {
        Self { mode: SubdivisionMode::Full, crude_boundaries: false }
    }
}

impl SubdivisionOptions {
    #[must_use]
    pub const fn new(mode: SubdivisionMode) -> Self {
        Self { mode, crude_boundaries: false }
    }

    #[must_use]
    pub const fn crude_boundaries(mut self, crude: bool) -> Self {
        self.crude_boundaries = crude;
        self
    }
}

/// Counters from one subdivision step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubdivisionDiagnostics {
    /// New edge-midpoint vertices created this level.
    pub odd_vertices_created: usize,
    /// Odd vertices that sat on a boundary edge.
    pub boundary_odd_vertices: usize,
    /// Even vertices repositioned by the interior or boundary rule.
    pub even_vertices_repositioned: usize,
    /// Even vertices left unchanged because a boundary interrupted their
    /// ring or they lacked two boundary neighbors.
    pub even_vertices_pinned: usize,
}

/// Perform one level of Loop subdivision in place.
///
/// Vertex data is double-buffered internally: the odd and even passes read
/// the pre-subdivision buffers while writing the new ones. Connectivity and
/// vertex normals are rebuilt before returning.
pub fn loop_subdivide(
    mesh: &mut MeshWithConnectivity,
    options: SubdivisionOptions,
) -> SubdivisionDiagnostics {
    let old_vertex_count = mesh.positions.len();
    let mut diagnostics = SubdivisionDiagnostics::default();

    // undirected edge -> odd vertex index
    let mut new_vertices: HashMap<(u32, u32), u32> = HashMap::new();

    // New buffers are double-buffered: the even section (old vertex count)
    // is filled by the even pass, odd vertices append past it.
    let mut new_positions = mesh.positions.clone();
    let mut new_normals = mesh.normals.clone();
    let mut new_colors = mesh.colors.clone();
    let mut new_ages = mesh.ages.clone();

    let boundary = BoundaryInfo::collect(mesh);

    // ── odd pass ────────────────────────────────────────────────────────────
    for i in 0..mesh.triangles.len() {
        for j in 0..3 {
            let v0 = mesh.triangles[i][j];
            let v1 = mesh.triangles[i][(j + 1) % 3];
            let edge = ordered_edge(v0, v1);
            if new_vertices.contains_key(&edge) {
                continue;
            }

            let (v0, v1) = (v0 as usize, v1 as usize);
            let mut pos = mesh.positions[v0].lerp(mesh.positions[v1], 0.5);
            let mut col = mesh.colors[v0].lerp(mesh.colors[v1], 0.5);
            let mut nrm = mesh.normals[v0].lerp(mesh.normals[v1], 0.5);

            if options.mode.applies_edge_rule() {
                let edge_is_boundary = mesh.neighbor_tris[i][j] == -1;
                if edge_is_boundary {
                    diagnostics.boundary_odd_vertices += 1;
                }
                if edge_is_boundary && !options.crude_boundaries {
                    // Boundary rule for odd vertices is the plain midpoint.
                } else {
                    // Interior rule: 3/8 on the endpoints, 1/8 on the apex
                    // opposite the edge in each incident triangle. A missing
                    // apex contributes zero.
                    let opp_curr = mesh.triangles[i][(j + 2) % 3] as usize;
                    let opp_nb = {
                        let tri_nb = mesh.neighbor_tris[i][j];
                        let edge_nb = mesh.neighbor_edges[i][j];
                        if tri_nb != -1 && edge_nb != -1 {
                            Some(mesh.triangles[tri_nb as usize][(edge_nb as usize + 2) % 3] as usize)
                        } else {
                            None
                        }
                    };

                    const W_END: f64 = 3.0 / 8.0;
                    const W_OPP: f64 = 1.0 / 8.0;

                    let opp_sum = |get: &dyn Fn(usize) -> Vec3| {
                        let mut sum = get(opp_curr);
                        if let Some(nb) = opp_nb {
                            sum = sum.add(get(nb));
                        }
                        sum
                    };

                    pos = Point3::from(
                        mesh.positions[v0]
                            .to_vec3()
                            .add(mesh.positions[v1].to_vec3())
                            .mul_scalar(W_END)
                            .add(opp_sum(&|v| mesh.positions[v].to_vec3()).mul_scalar(W_OPP)),
                    );
                    col = mesh.colors[v0]
                        .add(mesh.colors[v1])
                        .mul_scalar(W_END)
                        .add(opp_sum(&|v| mesh.colors[v]).mul_scalar(W_OPP));
                    nrm = mesh.normals[v0]
                        .add(mesh.normals[v1])
                        .mul_scalar(W_END)
                        .add(opp_sum(&|v| mesh.normals[v]).mul_scalar(W_OPP));
                }
                nrm = nrm.normalized_or(nrm);
            }

            new_positions.push(pos);
            new_colors.push(col);
            new_normals.push(nrm);
            new_ages.push(0);
            new_vertices.insert(edge, (new_positions.len() - 1) as u32);
            diagnostics.odd_vertices_created += 1;
        }
    }

    // ── even pass ───────────────────────────────────────────────────────────
    let mut vertex_computed = vec![false; old_vertex_count];
    for i in 0..mesh.triangles.len() {
        for j in 0..3 {
            let v0 = mesh.triangles[i][j] as usize;
            if vertex_computed[v0] {
                continue;
            }
            vertex_computed[v0] = true;

            let mut pos = mesh.positions[v0];
            let mut col = mesh.colors[v0];
            let mut nrm = mesh.normals[v0];

            if options.mode.repositions_even_vertices() {
                if boundary.is_boundary_vertex[v0] {
                    if options.crude_boundaries {
                        diagnostics.even_vertices_pinned += 1;
                    } else {
                        // Walk connectivity outward for the two boundary
                        // neighbors, falling back to the precomputed pair.
                        let (walk0, walk1) = boundary.find_neighbors_from(mesh, i, j);
                        let b0 = walk0.or(boundary.fallback_neighbors[v0].0);
                        let b1 = walk1.or(boundary.fallback_neighbors[v0].1);
                        if let (Some(b0), Some(b1)) = (b0, b1) {
                            const W_CENTER: f64 = 3.0 / 4.0;
                            const W_SIDE: f64 = 1.0 / 8.0;
                            pos = Point3::from(
                                mesh.positions[v0]
                                    .to_vec3()
                                    .mul_scalar(W_CENTER)
                                    .add(
                                        mesh.positions[b0]
                                            .to_vec3()
                                            .add(mesh.positions[b1].to_vec3())
                                            .mul_scalar(W_SIDE),
                                    ),
                            );
                            col = mesh.colors[v0]
                                .mul_scalar(W_CENTER)
                                .add(mesh.colors[b0].add(mesh.colors[b1]).mul_scalar(W_SIDE));
                            nrm = mesh.normals[v0]
                                .mul_scalar(W_CENTER)
                                .add(mesh.normals[b0].add(mesh.normals[b1]).mul_scalar(W_SIDE));
                            nrm = nrm.normalized_or(nrm);
                            diagnostics.even_vertices_repositioned += 1;
                        } else {
                            diagnostics.even_vertices_pinned += 1;
                        }
                    }
                } else {
                    match mesh.traverse_one_ring(i, j, None) {
                        OneRing::Closed { position, normal, color, .. } => {
                            pos = position;
                            nrm = normal;
                            col = color;
                            diagnostics.even_vertices_repositioned += 1;
                        }
                        OneRing::Boundary => {
                            diagnostics.even_vertices_pinned += 1;
                        }
                    }
                }
            }

            new_positions[v0] = pos;
            new_colors[v0] = col;
            new_normals[v0] = nrm;
            new_ages[v0] = mesh.ages[v0] + 1;
        }
    }

    // ── topology regeneration: every triangle becomes four ─────────────────
    let mut new_triangles = Vec::with_capacity(mesh.triangles.len() * 4);
    for tri in &mesh.triangles {
        let even = *tri;
        let odd = [
            new_vertices[&ordered_edge(even[0], even[1])],
            new_vertices[&ordered_edge(even[1], even[2])],
            new_vertices[&ordered_edge(even[2], even[0])],
        ];
        new_triangles.push([even[0], odd[0], odd[2]]);
        new_triangles.push([even[1], odd[1], odd[0]]);
        new_triangles.push([even[2], odd[2], odd[1]]);
        new_triangles.push(odd);
    }

    mesh.positions = new_positions;
    mesh.normals = new_normals;
    mesh.colors = new_colors;
    mesh.ages = new_ages;
    mesh.triangles = new_triangles;

    if !options.mode.repositions_even_vertices() {
        colorize_by_age(mesh);
    }
    mesh.compute_vertex_normals();
    mesh.compute_connectivity();
    if options.mode.repositions_even_vertices() {
        mesh.colorize_by_curvature(0.6, 0.9);
    }

    diagnostics
}

/// Recolor vertices by subdivision age on a five-stop gradient
/// (deep blue, teal, lime, sunflower, magenta), eased toward younger ages.
pub fn colorize_by_age(mesh: &mut MeshWithConnectivity) {
    if mesh.ages.is_empty() {
        return;
    }
    let max_age = mesh.ages.iter().copied().max().unwrap_or(0);
    let denom = f64::from(max_age.max(1));

    const STOPS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
    const PALETTE: [Vec3; 5] = [
        Vec3::new(0.145, 0.196, 0.498), // deep blue
        Vec3::new(0.125, 0.615, 0.604), // teal
        Vec3::new(0.773, 0.905, 0.461), // soft lime
        Vec3::new(0.992, 0.731, 0.258), // sunflower
        Vec3::new(0.902, 0.318, 0.420), // sunset magenta
    ];

    for (color, &age) in mesh.colors.iter_mut().zip(&mesh.ages) {
        let t = (f64::from(age) / denom).clamp(0.0, 1.0).powf(0.85);
        let mut idx = 0;
        while idx + 1 < STOPS.len() && t > STOPS[idx + 1] {
            idx += 1;
        }
        let next = (idx + 1).min(STOPS.len() - 1);
        let span = STOPS[next] - STOPS[idx];
        let local = if span > 1e-6 { (t - STOPS[idx]) / span } else { 0.0 };
        *color = PALETTE[idx].lerp(PALETTE[next], local);
    }
}

#[inline]
fn ordered_edge(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Per-vertex boundary flags and fallback boundary neighbors, collected once
/// per subdivision step.
struct BoundaryInfo {
    is_boundary_vertex: Vec<bool>,
    fallback_neighbors: Vec<(Option<usize>, Option<usize>)>,
}

impl BoundaryInfo {
    fn collect(mesh: &MeshWithConnectivity) -> Self {
        let mut info = Self {
            is_boundary_vertex: vec![false; mesh.positions.len()],
            fallback_neighbors: vec![(None, None); mesh.positions.len()],
        };
        for (ti, tri) in mesh.triangles.iter().enumerate() {
            for e in 0..3 {
                if mesh.neighbor_tris[ti][e] == -1 {
                    let a = tri[e] as usize;
                    let b = tri[(e + 1) % 3] as usize;
                    info.is_boundary_vertex[a] = true;
                    info.is_boundary_vertex[b] = true;
                    info.add_fallback(a, b);
                    info.add_fallback(b, a);
                }
            }
        }
        info
    }

    fn add_fallback(&mut self, v: usize, neighbor: usize) {
        let slot = &mut self.fallback_neighbors[v];
        if slot.0.is_none() {
            slot.0 = Some(neighbor);
        } else if slot.1.is_none() && slot.0 != Some(neighbor) {
            slot.1 = Some(neighbor);
        }
    }

    /// Walk the triangles around the boundary vertex at corner `edge_idx` of
    /// triangle `tri_idx`, collecting the far endpoints of the boundary edges
    /// incident to it.
    fn find_neighbors_from(
        &self,
        mesh: &MeshWithConnectivity,
        tri_idx: usize,
        edge_idx: usize,
    ) -> (Option<usize>, Option<usize>) {
        let mut nb0: Option<usize> = None;
        let mut nb1: Option<usize> = None;
        let mut push = |candidate: usize, nb0: &mut Option<usize>, nb1: &mut Option<usize>| {
            if nb0.is_none() {
                *nb0 = Some(candidate);
            } else if nb1.is_none() && *nb0 != Some(candidate) {
                *nb1 = Some(candidate);
            }
        };

        let start_tri = tri_idx as i32;
        let start_edge = edge_idx as i32;
        let mut ct = start_tri;
        let mut ce = start_edge;
        let mut guard = 0usize;

        loop {
            let t = ct as usize;
            let e = ce as usize;
            // Edge leaving v.
            if mesh.neighbor_tris[t][e] == -1 {
                let head = mesh.triangles[t][(e + 1) % 3] as usize;
                push(head, &mut nb0, &mut nb1);
            }
            // Edge arriving at v.
            let e_in = (e + 2) % 3;
            if mesh.neighbor_tris[t][e_in] == -1 {
                let prev = mesh.triangles[t][e_in] as usize;
                push(prev, &mut nb0, &mut nb1);
            }
            if nb0.is_some() && nb1.is_some() {
                break;
            }

            let nt = mesh.neighbor_tris[t][e_in];
            let ne = mesh.neighbor_edges[t][e_in];
            if nt == -1 || ne == -1 {
                break;
            }
            ct = nt;
            ce = ne;
            guard += 1;
            if guard > mesh.triangles.len() {
                break;
            }
            if ct == start_tri && ce == start_edge {
                break;
            }
        }

        (nb0, nb1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Level cache
// ─────────────────────────────────────────────────────────────────────────────

/// Cached sequence of subdivision levels `0..=k` for one base mesh.
///
/// The render loop drives this: changing the mode or boundary handling
/// invalidates everything above the base mesh, while raising the requested
/// level only computes the missing steps.
#[derive(Debug, Default)]
pub struct SubdivisionCache {
    levels: Vec<MeshWithConnectivity>,
    options: SubdivisionOptions,
}

impl SubdivisionCache {
    #[must_use]
    pub fn new(base: MeshWithConnectivity, options: SubdivisionOptions) -> Self {
        Self { levels: vec![base], options }
    }

    /// Replace the base mesh, discarding all cached levels.
    pub fn set_base(&mut self, base: MeshWithConnectivity) {
        self.levels.clear();
        self.levels.push(base);
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn options(&self) -> SubdivisionOptions {
        self.options
    }

    /// Get subdivision level `level`, computing missing levels as needed.
    ///
    /// A change of options drops every cached level except the base before
    /// resubdividing. Returns `None` when no base mesh has been set.
    pub fn ensure_level(
        &mut self,
        level: usize,
        options: SubdivisionOptions,
    ) -> Option<&MeshWithConnectivity> {
        if self.levels.is_empty() {
            return None;
        }
        if options != self.options {
            self.levels.truncate(1);
            self.options = options;
        }
        while self.levels.len() <= level {
            let mut next = self.levels.last().cloned()?;
            loop_subdivide(&mut next, self.options);
            self.levels.push(next);
        }
        self.levels.get(level)
    }
}
