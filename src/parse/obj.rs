//! Minimal OBJ loading for triangle meshes.
//!
//! Reads `v` and `f` lines only, converts OBJ's 1-based indices to 0-based,
//! and deduplicates vertices by exact position so meshes exported with
//! per-face vertices become watertight again. Faces referencing missing
//! vertices are skipped with a log. [`load_obj`] additionally centers the
//! mesh at the origin and normalizes its scale for viewing.

use std::collections::BTreeMap;
use std::path::Path;

use crate::geom::{BBox, IndexedMesh, Point3};

/// Exact-position key with a total order, for deduplication.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PositionKey([f64; 3]);

impl Eq for PositionKey {}

impl Ord for PositionKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0[0]
            .total_cmp(&other.0[0])
            .then(self.0[1].total_cmp(&other.0[1]))
            .then(self.0[2].total_cmp(&other.0[2]))
    }
}

impl PartialOrd for PositionKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse OBJ text into an indexed mesh with deduplicated vertices.
///
/// Slash-separated face tokens (`f v/vt/vn ...`) are tolerated; only the
/// vertex index is used. Lines that don't parse are ignored.
#[must_use]
pub fn parse_obj(text: &str) -> IndexedMesh {
    let mut positions: Vec<Point3> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();

    for line in text.lines() {
        let line = line.replace('/', " ");
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> =
                    tokens.by_ref().take(3).filter_map(|t| t.parse().ok()).collect();
                if coords.len() == 3 {
                    positions.push(Point3::new(coords[0], coords[1], coords[2]));
                }
            }
            Some("f") => {
                let indices: Vec<usize> =
                    tokens.by_ref().take(3).filter_map(|t| t.parse::<usize>().ok()).collect();
                if indices.len() == 3 && indices.iter().all(|&i| i >= 1) {
                    faces.push([indices[0] - 1, indices[1] - 1, indices[2] - 1]);
                }
            }
            _ => {}
        }
    }

    // Deduplicate by exact position, keeping first-seen order.
    let mut unique: BTreeMap<PositionKey, u32> = BTreeMap::new();
    let mut remap: Vec<u32> = Vec::with_capacity(positions.len());
    let mut out_positions: Vec<Point3> = Vec::new();
    for p in &positions {
        let key = PositionKey(p.to_array());
        let index = *unique.entry(key).or_insert_with(|| {
            out_positions.push(*p);
            (out_positions.len() - 1) as u32
        });
        remap.push(index);
    }

    let mut triangles = Vec::with_capacity(faces.len());
    for face in faces {
        if face.iter().any(|&i| i >= remap.len()) {
            log::warn!("skipping OBJ face with out-of-range vertex index");
            continue;
        }
        triangles.push([remap[face[0]], remap[face[1]], remap[face[2]]]);
    }

    IndexedMesh::new(out_positions, triangles)
}

/// Center a mesh at the origin and scale it so its bounding-box diagonal
/// becomes 10 units, the size the viewer expects.
pub fn center_and_scale(mesh: &mut IndexedMesh) {
    let Some(bbox) = BBox::from_points(&mesh.positions) else {
        return;
    };
    let diagonal = bbox.diagonal();
    if diagonal <= 0.0 {
        return;
    }
    let scale = 10.0 / diagonal;
    let center = bbox.center();
    for p in &mut mesh.positions {
        *p = Point3::new(
            (p.x - center.x) * scale,
            (p.y - center.y) * scale,
            (p.z - center.z) * scale,
        );
    }
}

/// Load an OBJ file, deduplicate, and normalize it for viewing.
pub fn load_obj(path: &Path) -> std::io::Result<IndexedMesh> {
    let text = std::fs::read_to_string(path)?;
    let mut mesh = parse_obj(&text);
    center_and_scale(&mut mesh);
    Ok(mesh)
}
