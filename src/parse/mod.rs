//! External data formats.
//!
//! These loaders are thin collaborators of the geometry core: they produce
//! plain [`IndexedMesh`](crate::geom::IndexedMesh) / scene descriptions and
//! never participate in the algorithms themselves.

mod obj;
mod ply;
mod scene_json;

pub use obj::{center_and_scale, load_obj, parse_obj};
pub use ply::{load_ply, parse_ply, PlyError};
pub use scene_json::{
    ParsedSurface, SceneError, SceneFile, SplineCurveData, generate_scene_surfaces, load_scene,
    tessellate_scene_curves,
};
