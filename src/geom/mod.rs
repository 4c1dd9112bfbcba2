mod connectivity;
mod core;
mod curve;
mod isosurface;
mod mesh;
mod simplify;
mod subdivision;
mod surface;

pub use connectivity::{
    BASE_VERTEX_COLOR, ConnectivityDiagnostics, MeshWithConnectivity, OneRing,
};
pub use core::{BBox, Point3, Tolerance, Vec3};
pub use curve::{
    CurveError, CurvePoint, SplineCurve, compute_curve_frames, split_at_discontinuities,
    tessellate_bezier, tessellate_bezier_piecewise, tessellate_bspline,
    tessellate_bspline_piecewise, tessellate_catmull_rom, tessellate_circle,
    tessellate_cubic_segment, tessellate_curve, tessellate_kappa_closed,
};
pub use isosurface::{
    ScalarVolume, VolumeDtype, VolumeError, VolumeSamples, make_iso_surface,
    make_iso_surface_raw,
};
pub use mesh::{
    IndexedMesh, MeshError, compute_smooth_normals, triangle_area, triangle_area_normal,
};
pub use simplify::{SimplifyDiagnostics, SimplifyError, SimplifyResult, simplify_qem};
pub use subdivision::{
    SubdivisionCache, SubdivisionDiagnostics, SubdivisionMode, SubdivisionOptions,
    colorize_by_age, loop_subdivide,
};
pub use surface::{
    GeneratedSurface, SurfaceError, make_gen_cyl, make_gen_cyl_piecewise, make_gen_cyl_scaled,
    make_surf_rev, tri_sweep,
};

#[cfg(test)]
mod tests;
