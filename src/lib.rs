//! # geomlab-engine
//!
//! Geometry-processing core of an interactive 3D-geometry teaching
//! application. The crate owns the algorithmic pipeline and nothing else:
//! rendering, windowing, and UI live in the embedding application and
//! consume the plain value types produced here.
//!
//! ## Pipeline
//!
//! - [`geom::IndexedMesh`] → [`geom::MeshWithConnectivity`]: per-triangle
//!   neighbor tables without half-edges, one-ring traversal.
//! - [`geom::loop_subdivide`] / [`geom::SubdivisionCache`]: Loop subdivision
//!   one level at a time, with vertex aging and recoloring.
//! - [`geom::simplify_qem`]: Garland–Heckbert edge-collapse simplification
//!   with a lazily invalidated priority queue.
//! - [`geom::tessellate_curve`]: adaptive, error-bounded tessellation of
//!   Bézier / B-spline / Catmull-Rom / κ / circle curves into polylines with
//!   parallel-transported frames.
//! - [`geom::make_surf_rev`], [`geom::make_gen_cyl`],
//!   [`geom::make_iso_surface`]: revolution and generalized-cylinder sweeps,
//!   marching-tetrahedra isosurface extraction.
//! - [`parse`]: OBJ / ASCII-PLY mesh loading and the JSON scene format.
//!
//! All operations are synchronous, single-threaded, and run to completion;
//! callers own every buffer they get back.
//!
//! ## Example
//!
//! ```
//! use geomlab_engine::geom::{
//!     MeshWithConnectivity, SubdivisionOptions, loop_subdivide, simplify_qem,
//! };
//! use geomlab_engine::parse::parse_obj;
//!
//! let obj = "\
//! v 0 0 0
//! v 1 0 0
//! v 0.5 1 0
//! v 0.5 0.5 1
//! f 1 3 2
//! f 1 2 4
//! f 2 3 4
//! f 3 1 4
//! ";
//! let mesh = parse_obj(obj);
//! let mut subdivided = MeshWithConnectivity::from_mesh(&mesh);
//! loop_subdivide(&mut subdivided, SubdivisionOptions::default());
//! assert_eq!(subdivided.triangle_count(), 16);
//!
//! let reduced = simplify_qem(&subdivided.to_indexed_mesh(), 4).unwrap();
//! assert!(reduced.mesh.triangle_count() <= 16);
//! ```

#![warn(clippy::all)]

pub mod geom;
pub mod parse;
