//! Mesh simplification via Garland–Heckbert quadric error metrics.
//!
//! Greedy edge-collapse decimation toward a target triangle count:
//!
//! 1. Accumulate an area-weighted plane quadric per vertex.
//! 2. Seed a min-heap with one collapse candidate per undirected edge. The
//!    candidate position minimizes the summed quadric; when the 3×3 system is
//!    near-singular the cheapest of the two endpoints and the midpoint is
//!    used instead.
//! 3. Pop candidates in cost order. Entries whose endpoints have already been
//!    merged, or whose generation stamp no longer matches the latest push for
//!    that edge, are discarded lazily; the heap is never edited in place.
//! 4. A collapse merges the higher representative into the lower via
//!    union-find, sums quadrics, moves adjacency, repositions the survivor to
//!    the stored optimum, and pushes fresh candidates for every touched edge.
//! 5. The running triangle count is estimated by the number of common
//!    neighbors of the collapsed pair (2 for an interior edge, 1 on a
//!    boundary). It decides termination only; the output mesh is rebuilt
//!    exactly afterwards, dropping degenerate and duplicate triangles.
//!    Close to the target the estimate is refreshed against the exact count
//!    and any collapse that would empty the mesh is refused, so at least one
//!    triangle always survives.
//!
//! The estimate makes the final count approximate: the result can land a few
//! triangles away from the requested target. That is accepted behavior.
//!
//! # Example
//!
//! ```no_run
//! use geomlab_engine::geom::{simplify_qem, IndexedMesh};
//!
//! # let mesh = IndexedMesh::default();
//! let result = simplify_qem(&mesh, 500).unwrap();
//! println!(
//!     "{} -> {} triangles",
//!     result.diagnostics.original_triangle_count,
//!     result.diagnostics.final_triangle_count,
//! );
//! ```

use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use super::mesh::{IndexedMesh, triangle_area};
use super::{Point3, Tolerance, Vec3};

/// Triangle area below which a face is treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

/// How close (in estimated triangles) to the target the simplifier switches
/// from the heuristic count to exact counting.
const TAIL_WINDOW: usize = 8;

/// Errors from QEM simplification.
#[derive(Debug, thiserror::Error)]
pub enum SimplifyError {
    /// The input mesh has no triangles.
    #[error("input mesh has no triangles")]
    EmptyMesh,

    /// The input mesh fails validation (bad indices or non-finite vertices).
    #[error("input mesh contains invalid geometry: {0}")]
    InvalidGeometry(#[from] super::mesh::MeshError),
}

/// Counters from one simplification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyDiagnostics {
    pub original_vertex_count: usize,
    pub original_triangle_count: usize,
    pub final_vertex_count: usize,
    pub final_triangle_count: usize,
    /// Edge collapses actually performed.
    pub edges_collapsed: usize,
    /// Heap entries discarded for a stale generation or merged endpoints.
    pub stale_entries_skipped: usize,
    /// Candidates whose linear system was near-singular and fell back to
    /// discrete evaluation of the endpoints and midpoint.
    pub singular_fallbacks: usize,
}

/// Result of a simplification run.
#[derive(Debug, Clone)]
pub struct SimplifyResult {
    pub mesh: IndexedMesh,
    pub diagnostics: SimplifyDiagnostics,
}

/// Simplify a mesh to approximately `target_triangles` triangles.
///
/// The target is clamped to at least 1. Meshes already at or below the
/// target are returned unchanged (after the usual rebuild, which still drops
/// degenerate and duplicate input triangles).
pub fn simplify_qem(
    mesh: &IndexedMesh,
    target_triangles: usize,
) -> Result<SimplifyResult, SimplifyError> {
    if mesh.triangles.is_empty() {
        return Err(SimplifyError::EmptyMesh);
    }
    mesh.validate()?;

    let target = target_triangles.max(1);
    let n = mesh.positions.len();

    let mut diagnostics = SimplifyDiagnostics {
        original_vertex_count: n,
        original_triangle_count: mesh.triangles.len(),
        ..Default::default()
    };

    // Working copy of positions: collapses reposition the surviving vertex.
    let mut positions = mesh.positions.clone();

    // Per-vertex quadrics.
    let mut quadrics = vec![Quadric::ZERO; n];
    for tri in &mesh.triangles {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let k = Quadric::from_triangle(positions[a], positions[b], positions[c]);
        quadrics[a].add_assign(&k);
        quadrics[b].add_assign(&k);
        quadrics[c].add_assign(&k);
    }

    // Undirected adjacency between vertex representatives.
    let mut neighbors: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); n];
    for tri in &mesh.triangles {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        if a != b {
            neighbors[a as usize].insert(b);
            neighbors[b as usize].insert(a);
        }
        if b != c {
            neighbors[b as usize].insert(c);
            neighbors[c as usize].insert(b);
        }
        if c != a {
            neighbors[c as usize].insert(a);
            neighbors[a as usize].insert(c);
        }
    }

    let mut union_find = UnionFind::new(n as u32);
    let mut heap: BinaryHeap<CollapseCandidate> = BinaryHeap::new();
    let mut edge_generations: HashMap<(u32, u32), u64> = HashMap::new();
    let mut global_generation: u64 = 1;

    let mut push_edge = |a: u32,
                         b: u32,
                         heap: &mut BinaryHeap<CollapseCandidate>,
                         edge_generations: &mut HashMap<(u32, u32), u64>,
                         quadrics: &[Quadric],
                         positions: &[Point3],
                         diagnostics: &mut SimplifyDiagnostics| {
        if a == b {
            return;
        }
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let summed = quadrics[a as usize].sum(&quadrics[b as usize]);
        let (optimal, fell_back) =
            optimal_collapse_position(&summed, positions[a as usize], positions[b as usize]);
        if fell_back {
            diagnostics.singular_fallbacks += 1;
        }
        let cost = summed.evaluate(optimal);
        global_generation += 1;
        edge_generations.insert((a, b), global_generation);
        heap.push(CollapseCandidate { cost, a, b, generation: global_generation, optimal });
    };

    // Seed the heap with every undirected edge once.
    for a in 0..n as u32 {
        for &b in &neighbors[a as usize] {
            if a < b {
                push_edge(a, b, &mut heap, &mut edge_generations, &quadrics, &positions, &mut diagnostics);
            }
        }
    }

    // Running triangle count estimate, seeded from unique non-degenerate
    // input triangles.
    let mut current_tris = {
        let mut seen: HashSet<(u32, u32, u32)> = HashSet::with_capacity(mesh.triangles.len() * 2);
        let mut count = 0usize;
        for tri in &mesh.triangles {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            if a == b || b == c || c == a {
                continue;
            }
            if triangle_area(positions[a as usize], positions[b as usize], positions[c as usize])
                <= DEGENERATE_AREA
            {
                continue;
            }
            if seen.insert(canonical_triangle(a, b, c)) {
                count += 1;
            }
        }
        count
    };

    while current_tris > target {
        let Some(top) = heap.pop() else {
            break;
        };
        let ra = union_find.find(top.a);
        let rb = union_find.find(top.b);
        if ra == rb {
            diagnostics.stale_entries_skipped += 1;
            continue;
        }
        let (a, b) = if ra < rb { (ra, rb) } else { (rb, ra) };
        match edge_generations.get(&(a, b)) {
            Some(&generation) if generation == top.generation => {}
            _ => {
                diagnostics.stale_entries_skipped += 1;
                continue;
            }
        }

        // Triangles removed by this collapse = common neighbors of (a, b),
        // counted over representatives. Termination heuristic only.
        let removed_along_edge = {
            let set_a = &neighbors[a as usize];
            let set_b = &neighbors[b as usize];
            if set_a.is_empty() || set_b.is_empty() {
                0
            } else {
                let (small, large) =
                    if set_a.len() <= set_b.len() { (set_a, set_b) } else { (set_b, set_a) };
                let mut large_reps: HashSet<u32> = HashSet::with_capacity(large.len() * 2);
                for &w in large {
                    let rw = union_find.find(w);
                    if rw != a && rw != b {
                        large_reps.insert(rw);
                    }
                }
                let mut common = 0usize;
                for &w in small {
                    let rw = union_find.find(w);
                    if rw == a || rw == b {
                        continue;
                    }
                    if large_reps.contains(&rw) {
                        common += 1;
                    }
                }
                common
            }
        };

        // Near the target the heuristic drifts, so switch to exact counting:
        // refuse any collapse that would delete the last triangles, and track
        // the true count from here on.
        let mut exact_tail = None;
        if current_tris <= target + TAIL_WINDOW {
            let survivors =
                surviving_triangle_count(&mesh.triangles, &mut union_find, &positions, Some((b, a, top.optimal)));
            if survivors == 0 {
                continue;
            }
            exact_tail = Some(survivors);
        }

        // Collapse b into a.
        positions[a as usize] = top.optimal;
        let qb = quadrics[b as usize];
        quadrics[a as usize].add_assign(&qb);
        union_find.link(b, a);

        let moved: Vec<u32> = neighbors[b as usize].iter().copied().collect();
        for w in moved {
            let rw = union_find.find(w);
            if rw == a {
                continue;
            }
            neighbors[rw as usize].remove(&b);
            neighbors[rw as usize].insert(a);
            neighbors[a as usize].insert(rw);
        }
        neighbors[b as usize].clear();
        neighbors[a as usize].remove(&a);

        // Refresh candidates around the merged vertex; the generation bump
        // invalidates everything pushed for these edges before.
        let around: Vec<u32> = neighbors[a as usize].iter().copied().collect();
        for w in around {
            push_edge(a, w, &mut heap, &mut edge_generations, &quadrics, &positions, &mut diagnostics);
        }

        diagnostics.edges_collapsed += 1;
        current_tris = match exact_tail {
            Some(survivors) => survivors,
            None => current_tris.saturating_sub(removed_along_edge),
        };
    }

    // Rebuild: resolve every vertex to its representative, compact indices,
    // drop degenerate and duplicate triangles.
    let mut remap: HashMap<u32, u32> = HashMap::with_capacity(n);
    let mut out_positions: Vec<Point3> = Vec::new();
    let mut out_triangles: Vec<[u32; 3]> = Vec::with_capacity(mesh.triangles.len());
    let mut emitted: HashSet<(u32, u32, u32)> = HashSet::with_capacity(mesh.triangles.len() * 2);

    for tri in &mesh.triangles {
        let a = union_find.find(tri[0]);
        let b = union_find.find(tri[1]);
        let c = union_find.find(tri[2]);
        if a == b || b == c || c == a {
            continue;
        }
        if triangle_area(positions[a as usize], positions[b as usize], positions[c as usize])
            <= DEGENERATE_AREA
        {
            continue;
        }
        if !emitted.insert(canonical_triangle(a, b, c)) {
            continue;
        }
        let mut lookup = |r: u32| -> u32 {
            *remap.entry(r).or_insert_with(|| {
                out_positions.push(positions[r as usize]);
                (out_positions.len() - 1) as u32
            })
        };
        let ia = lookup(a);
        let ib = lookup(b);
        let ic = lookup(c);
        out_triangles.push([ia, ib, ic]);
    }

    diagnostics.final_vertex_count = out_positions.len();
    diagnostics.final_triangle_count = out_triangles.len();

    Ok(SimplifyResult {
        mesh: IndexedMesh::new(out_positions, out_triangles),
        diagnostics,
    })
}

/// Count the triangles that survive representative resolution, degenerate
/// dropping, and duplicate dropping, optionally simulating one extra merge
/// of `from` into `into` at a new position.
fn surviving_triangle_count(
    triangles: &[[u32; 3]],
    union_find: &mut UnionFind,
    positions: &[Point3],
    merge: Option<(u32, u32, Point3)>,
) -> usize {
    let mut seen: HashSet<(u32, u32, u32)> = HashSet::with_capacity(triangles.len() * 2);
    let mut resolve = |idx: u32| -> u32 {
        let r = union_find.find(idx);
        match merge {
            Some((from, into, _)) if r == from => into,
            _ => r,
        }
    };
    let position_of = |r: u32| -> Point3 {
        match merge {
            Some((_, into, moved)) if r == into => moved,
            _ => positions[r as usize],
        }
    };

    let mut count = 0usize;
    for tri in triangles {
        let a = resolve(tri[0]);
        let b = resolve(tri[1]);
        let c = resolve(tri[2]);
        if a == b || b == c || c == a {
            continue;
        }
        if triangle_area(position_of(a), position_of(b), position_of(c)) <= DEGENERATE_AREA {
            continue;
        }
        if seen.insert(canonical_triangle(a, b, c)) {
            count += 1;
        }
    }
    count
}

/// Solve for the position minimizing the summed quadric.
///
/// Returns the solution of the 3×3 system from the quadric's upper-left
/// block. When the determinant magnitude is at most the singular cutoff,
/// it instead returns the cheapest of endpoint `a`, endpoint `b`, and their
/// midpoint,
/// flagged as a fallback.
fn optimal_collapse_position(q: &Quadric, a: Point3, b: Point3) -> (Point3, bool) {
    if let Some(solved) = q.minimizer() {
        return (solved, false);
    }
    let midpoint = a.lerp(b, 0.5);
    let ca = q.evaluate(a);
    let cb = q.evaluate(b);
    let cm = q.evaluate(midpoint);
    let best = if ca <= cb && ca <= cm {
        a
    } else if cb <= ca && cb <= cm {
        b
    } else {
        midpoint
    };
    (best, true)
}

#[inline]
fn canonical_triangle(a: u32, b: u32, c: u32) -> (u32, u32, u32) {
    let mut k = [a, b, c];
    k.sort_unstable();
    (k[0], k[1], k[2])
}

// ─────────────────────────────────────────────────────────────────────────────
// Quadric
// ─────────────────────────────────────────────────────────────────────────────

/// Symmetric 4×4 error quadric, stored as its 10 unique coefficients:
///
/// ```text
/// | 0 1 2 3 |
/// | 1 4 5 6 |
/// | 2 5 7 8 |
/// | 3 6 8 9 |
/// ```
#[derive(Debug, Clone, Copy)]
struct Quadric {
    data: [f64; 10],
}

impl Quadric {
    const ZERO: Self = Self { data: [0.0; 10] };

    /// Area-weighted plane quadric of a triangle. Degenerate triangles
    /// contribute nothing.
    fn from_triangle(a: Point3, b: Point3, c: Point3) -> Self {
        let cross = (b - a).cross(c - a);
        let area = 0.5 * cross.length();
        if area <= DEGENERATE_AREA {
            return Self::ZERO;
        }
        let Some(normal) = cross.normalized() else {
            return Self::ZERO;
        };
        let d = -normal.dot(a.to_vec3());
        Self::from_plane(normal, d).scaled(area)
    }

    /// Quadric of a single plane `n·x + d = 0` with unit normal.
    fn from_plane(n: Vec3, d: f64) -> Self {
        Self {
            data: [
                n.x * n.x,
                n.x * n.y,
                n.x * n.z,
                n.x * d,
                n.y * n.y,
                n.y * n.z,
                n.y * d,
                n.z * n.z,
                n.z * d,
                d * d,
            ],
        }
    }

    fn scaled(mut self, s: f64) -> Self {
        for v in &mut self.data {
            *v *= s;
        }
        self
    }

    fn add_assign(&mut self, other: &Self) {
        for (lhs, rhs) in self.data.iter_mut().zip(&other.data) {
            *lhs += rhs;
        }
    }

    fn sum(&self, other: &Self) -> Self {
        let mut out = *self;
        out.add_assign(other);
        out
    }

    /// Evaluate `vᵀ Q v` for `v = [x, y, z, 1]`.
    fn evaluate(&self, p: Point3) -> f64 {
        let q = &self.data;
        let (x, y, z) = (p.x, p.y, p.z);
        q[0] * x * x
            + 2.0 * q[1] * x * y
            + 2.0 * q[2] * x * z
            + 2.0 * q[3] * x
            + q[4] * y * y
            + 2.0 * q[5] * y * z
            + 2.0 * q[6] * y
            + q[7] * z * z
            + 2.0 * q[8] * z
            + q[9]
    }

    /// Minimizer of the quadric: solves the 3×3 system `A x = -b` built from
    /// the upper-left block and the fourth column. `None` when the system is
    /// near-singular.
    fn minimizer(&self) -> Option<Point3> {
        let q = &self.data;
        let (a00, a01, a02) = (q[0], q[1], q[2]);
        let (a11, a12) = (q[4], q[5]);
        let a22 = q[7];
        let (b0, b1, b2) = (-q[3], -q[6], -q[8]);

        let det = a00 * (a11 * a22 - a12 * a12) - a01 * (a01 * a22 - a12 * a02)
            + a02 * (a01 * a12 - a11 * a02);
        if det.abs() <= Tolerance::SINGULAR.eps || !det.is_finite() {
            return None;
        }

        let inv = 1.0 / det;
        let x = (b0 * (a11 * a22 - a12 * a12) - a01 * (b1 * a22 - a12 * b2)
            + a02 * (b1 * a12 - a11 * b2))
            * inv;
        let y = (a00 * (b1 * a22 - a12 * b2) - b0 * (a01 * a22 - a12 * a02)
            + a02 * (a01 * b2 - b1 * a02))
            * inv;
        let z = (a00 * (a11 * b2 - b1 * a12) - a01 * (a01 * b2 - b1 * a02)
            + b0 * (a01 * a12 - a11 * a02))
            * inv;
        let p = Point3::new(x, y, z);
        p.is_finite().then_some(p)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Heap candidate and union-find
// ─────────────────────────────────────────────────────────────────────────────

/// Edge-collapse candidate with min-cost priority ordering.
#[derive(Debug, Clone, Copy)]
struct CollapseCandidate {
    cost: f64,
    a: u32,
    b: u32,
    generation: u64,
    optimal: Point3,
}

impl PartialEq for CollapseCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a && self.b == other.b && self.generation == other.generation
    }
}

impl Eq for CollapseCandidate {}

impl PartialOrd for CollapseCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapseCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering for min-heap behavior (lower cost pops first).
        other.cost.partial_cmp(&self.cost).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Flat-array union-find with path compression.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new(n: u32) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Make `into` the representative of `from`.
    fn link(&mut self, from: u32, into: u32) {
        self.parent[from as usize] = into;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> IndexedMesh {
        IndexedMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
    }

    fn grid(width: usize, height: usize) -> IndexedMesh {
        let mut positions = Vec::new();
        for y in 0..=height {
            for x in 0..=width {
                positions.push(Point3::new(x as f64, y as f64, 0.0));
            }
        }
        let stride = (width + 1) as u32;
        let mut triangles = Vec::new();
        for y in 0..height as u32 {
            for x in 0..width as u32 {
                let a = y * stride + x;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                triangles.push([a, b, d]);
                triangles.push([a, d, c]);
            }
        }
        IndexedMesh::new(positions, triangles)
    }

    #[test]
    fn test_empty_mesh_is_an_error() {
        let result = simplify_qem(&IndexedMesh::default(), 10);
        assert!(matches!(result, Err(SimplifyError::EmptyMesh)));
    }

    #[test]
    fn test_tetrahedron_at_target_is_unchanged() {
        let mesh = tetrahedron();
        let result = simplify_qem(&mesh, 4).unwrap();
        assert_eq!(result.mesh.triangle_count(), 4);
        assert_eq!(result.mesh.vertex_count(), 4);
    }

    #[test]
    fn test_output_bounds_and_no_repeated_vertices() {
        let mesh = grid(6, 6);
        for target in [1usize, 8, 20, 72] {
            let result = simplify_qem(&mesh, target).unwrap();
            assert!(result.mesh.triangle_count() >= 1, "target {target}");
            assert!(result.mesh.triangle_count() <= mesh.triangle_count());
            for tri in &result.mesh.triangles {
                assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
            }
            assert!(result.mesh.validate().is_ok());
        }
    }

    #[test]
    fn test_planar_grid_collapses_cheaply() {
        // On a flat grid every collapse has near-zero quadric error, so an
        // aggressive target must actually shrink the mesh.
        let mesh = grid(8, 8);
        let result = simplify_qem(&mesh, 16).unwrap();
        assert!(result.mesh.triangle_count() < mesh.triangle_count());
        assert!(result.diagnostics.edges_collapsed > 0);
    }

    #[test]
    fn test_quadric_error_zero_on_plane() {
        let q = Quadric::from_triangle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(q.evaluate(Point3::new(0.3, 0.4, 0.0)).abs() < 1e-12);
        assert!(q.evaluate(Point3::new(0.3, 0.4, 2.0)) > 1.0);
    }

    #[test]
    fn test_singular_fallback_picks_cheapest_endpoint() {
        // A quadric from a single plane is rank-deficient: any point on the
        // plane minimizes it, so the solver must fall back.
        let q = Quadric::from_triangle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let on_plane = Point3::new(0.2, 0.2, 0.0);
        let off_plane = Point3::new(0.0, 0.0, 3.0);
        let (best, fell_back) = optimal_collapse_position(&q, on_plane, off_plane);
        assert!(fell_back);
        assert!(q.evaluate(best) <= q.evaluate(off_plane));
    }
}
