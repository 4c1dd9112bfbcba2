//! Minimal ASCII PLY loading.
//!
//! Supports the header subset real scan exports use: `element vertex` /
//! `element face`, ascii format, vertex positions as the first three
//! properties. Non-triangular faces are skipped with a log; binary PLY is
//! rejected.

use std::path::Path;

use crate::geom::{IndexedMesh, Point3};

#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    #[error("not a PLY file")]
    NotPly,

    #[error("only ASCII PLY is supported")]
    NotAscii,

    #[error("unexpected end of file in {section}")]
    UnexpectedEof { section: &'static str },

    #[error("failed to read PLY file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse ASCII PLY text into an indexed mesh.
pub fn parse_ply(text: &str) -> Result<IndexedMesh, PlyError> {
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some("ply") {
        return Err(PlyError::NotPly);
    }

    let mut vertex_count = 0usize;
    let mut face_count = 0usize;
    let mut ascii = false;

    for line in lines.by_ref() {
        let line = line.trim();
        if line == "end_header" {
            break;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("format") => {
                ascii = tokens.next() == Some("ascii");
                if !ascii {
                    return Err(PlyError::NotAscii);
                }
            }
            Some("element") => {
                let what = tokens.next();
                let count = tokens.next().and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
                match what {
                    Some("vertex") => vertex_count = count,
                    Some("face") => face_count = count,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    let mut positions = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let line = lines.next().ok_or(PlyError::UnexpectedEof { section: "vertices" })?;
        let coords: Vec<f64> =
            line.split_whitespace().take(3).filter_map(|t| t.parse().ok()).collect();
        if coords.len() == 3 {
            positions.push(Point3::new(coords[0], coords[1], coords[2]));
        } else {
            positions.push(Point3::ORIGIN);
        }
    }

    let mut triangles = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        let line = lines.next().ok_or(PlyError::UnexpectedEof { section: "faces" })?;
        let indices: Vec<usize> =
            line.split_whitespace().filter_map(|t| t.parse().ok()).collect();
        match indices.as_slice() {
            [3, a, b, c] if *a < positions.len() && *b < positions.len() && *c < positions.len() => {
                triangles.push([*a as u32, *b as u32, *c as u32]);
            }
            [n, ..] if *n != 3 => {
                log::warn!("skipping non-triangular PLY face with {n} vertices");
            }
            _ => {
                log::warn!("skipping malformed PLY face line");
            }
        }
    }

    Ok(IndexedMesh::new(positions, triangles))
}

/// Load an ASCII PLY file.
pub fn load_ply(path: &Path) -> Result<IndexedMesh, PlyError> {
    let text = std::fs::read_to_string(path)?;
    parse_ply(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA_PLY: &str = "\
ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 4
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0.5 1 0
0.5 0.5 1
3 0 2 1
3 0 1 3
3 1 2 3
3 2 0 3
";

    #[test]
    fn test_parse_tetrahedron() {
        let mesh = parse_ply(TETRA_PLY).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.open_edge_count(), 0);
    }

    #[test]
    fn test_rejects_non_ply() {
        assert!(matches!(parse_ply("obj\n"), Err(PlyError::NotPly)));
    }

    #[test]
    fn test_rejects_binary_format() {
        let text = "ply\nformat binary_little_endian 1.0\nend_header\n";
        assert!(matches!(parse_ply(text), Err(PlyError::NotAscii)));
    }

    #[test]
    fn test_skips_quads() {
        let text = "\
ply
format ascii 1.0
element vertex 4
element face 2
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
3 0 1 2
";
        let mesh = parse_ply(text).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_truncated_vertices_error() {
        let text = "ply\nformat ascii 1.0\nelement vertex 4\nend_header\n0 0 0\n";
        assert!(matches!(
            parse_ply(text),
            Err(PlyError::UnexpectedEof { section: "vertices" })
        ));
    }
}
