//! JSON scene files: spline curves plus the surfaces built from them.
//!
//! File shape:
//!
//! ```json
//! {
//!   "curves": [
//!     { "type": "bezier", "control_points": [[0,0,0], [1,0,0], [2,1,0], [3,1,0]] }
//!   ],
//!   "surfaces": [
//!     { "type": "revolution", "curve_indices": [0] },
//!     { "type": "gen_cyl", "curve_indices": [0, 1] },
//!     { "type": "isosurface", "volume_file": "skull.raw", "dims": [64, 64, 64], "iso": 0.3 }
//!   ]
//! }
//! ```
//!
//! Curves keep their string-typed JSON form here and convert into the
//! [`SplineCurve`] enum with validation; a malformed curve aborts only its
//! own tessellation, never the whole scene.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geom::{
    CurvePoint, GeneratedSurface, Point3, SplineCurve, Vec3, VolumeDtype, make_gen_cyl,
    make_gen_cyl_piecewise, make_gen_cyl_scaled, make_iso_surface_raw, make_surf_rev,
    split_at_discontinuities, tessellate_curve,
};

/// Errors from scene parsing and conversion.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("unknown curve type \"{0}\"")]
    UnknownCurveType(String),

    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scene JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A curve as stored in scene JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplineCurveData {
    #[serde(rename = "type")]
    pub curve_type: String,
    #[serde(default)]
    pub control_points: Vec<[f64; 3]>,
    /// Piecewise variants carry their segments here instead.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Vec<[f64; 3]>>,
}

impl SplineCurveData {
    /// Convert the string-typed JSON form into the curve enum.
    pub fn to_curve(&self) -> Result<SplineCurve, SceneError> {
        let points = |raw: &[[f64; 3]]| raw.iter().map(|p| Point3::from_array(*p)).collect();
        let segment_points =
            |raw: &[Vec<[f64; 3]>]| raw.iter().map(|seg| points(seg)).collect();

        match self.curve_type.as_str() {
            "bezier" => Ok(SplineCurve::Bezier { control_points: points(&self.control_points) }),
            "bspline" => Ok(SplineCurve::Bspline { control_points: points(&self.control_points) }),
            "catmull-rom" => {
                Ok(SplineCurve::CatmullRom { control_points: points(&self.control_points) })
            }
            "circle" => Ok(SplineCurve::Circle { control_points: points(&self.control_points) }),
            "kappa" => Ok(SplineCurve::Kappa { control_points: points(&self.control_points) }),
            "bezier-piecewise" => {
                Ok(SplineCurve::BezierPiecewise { segments: segment_points(&self.segments) })
            }
            "bspline-piecewise" => {
                Ok(SplineCurve::BsplinePiecewise { segments: segment_points(&self.segments) })
            }
            other => Err(SceneError::UnknownCurveType(other.to_owned())),
        }
    }
}

fn default_iso() -> f64 {
    0.5
}

fn default_spacing() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn default_dtype() -> String {
    "uint16".to_owned()
}

/// A surface description referencing tessellated curves by index, or a raw
/// volume for isosurface extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ParsedSurface {
    #[serde(rename = "revolution")]
    Revolution { curve_indices: Vec<usize> },

    #[serde(rename = "gen_cyl")]
    GenCyl { curve_indices: Vec<usize> },

    #[serde(rename = "isosurface")]
    Isosurface {
        volume_file: PathBuf,
        dims: [usize; 3],
        #[serde(default = "default_iso")]
        iso: f64,
        #[serde(default = "default_spacing")]
        spacing: [f64; 3],
        #[serde(default)]
        origin: [f64; 3],
        #[serde(default = "default_dtype")]
        dtype: String,
    },
}

/// A complete scene file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SceneFile {
    #[serde(default)]
    pub curves: Vec<SplineCurveData>,
    #[serde(default)]
    pub surfaces: Vec<ParsedSurface>,
}

/// Load and parse a scene JSON file.
pub fn load_scene(path: &Path) -> Result<SceneFile, SceneError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Tessellate every scene curve at the given interval count.
///
/// A curve that fails conversion or tessellation contributes an empty
/// polyline and a log entry; the rest of the scene is unaffected.
#[must_use]
pub fn tessellate_scene_curves(scene: &SceneFile, intervals: u32) -> Vec<Vec<CurvePoint>> {
    scene
        .curves
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let curve = match data.to_curve() {
                Ok(curve) => curve,
                Err(err) => {
                    log::warn!("curve {i}: {err}");
                    return Vec::new();
                }
            };
            match tessellate_curve(&curve, intervals) {
                Ok(points) => points,
                Err(err) => {
                    log::warn!("curve {i} failed to tessellate: {err}");
                    Vec::new()
                }
            }
        })
        .collect()
}

/// Generate every scene surface from the tessellated curves.
///
/// One [`GeneratedSurface`] per scene entry, in order; failed or
/// under-specified entries come back empty (they render as nothing).
#[must_use]
pub fn generate_scene_surfaces(
    scene: &SceneFile,
    curves: &[Vec<CurvePoint>],
    intervals: u32,
) -> Vec<GeneratedSurface> {
    scene
        .surfaces
        .iter()
        .enumerate()
        .map(|(i, surface)| build_surface(i, surface, curves, intervals))
        .collect()
}

fn curve_at<'a>(
    curves: &'a [Vec<CurvePoint>],
    indices: &[usize],
    slot: usize,
) -> Option<&'a Vec<CurvePoint>> {
    indices.get(slot).and_then(|&idx| curves.get(idx))
}

fn build_surface(
    i: usize,
    surface: &ParsedSurface,
    curves: &[Vec<CurvePoint>],
    intervals: u32,
) -> GeneratedSurface {
    match surface {
        ParsedSurface::Revolution { curve_indices } => {
            let Some(profile) = curve_at(curves, curve_indices, 0) else {
                log::warn!("surface {i}: revolution needs a valid profile curve index");
                return GeneratedSurface::default();
            };
            match make_surf_rev(profile, intervals as usize) {
                Ok(surface) => surface,
                Err(err) => {
                    log::warn!("surface {i}: {err}");
                    GeneratedSurface::default()
                }
            }
        }
        ParsedSurface::GenCyl { curve_indices } => {
            let (Some(profile), Some(sweep)) =
                (curve_at(curves, curve_indices, 0), curve_at(curves, curve_indices, 1))
            else {
                log::warn!("surface {i}: gen_cyl needs profile and sweep curve indices");
                return GeneratedSurface::default();
            };

            let result = if let Some(scale) = curve_at(curves, curve_indices, 2) {
                make_gen_cyl_scaled(profile, sweep, scale)
            } else {
                // Paths with gaps or sharp corners sweep piecewise.
                let segments = split_at_discontinuities(sweep);
                if segments.len() <= 1 {
                    make_gen_cyl(profile, sweep)
                } else {
                    make_gen_cyl_piecewise(profile, &segments)
                }
            };
            match result {
                Ok(surface) => surface,
                Err(err) => {
                    log::warn!("surface {i}: {err}");
                    GeneratedSurface::default()
                }
            }
        }
        ParsedSurface::Isosurface { volume_file, dims, iso, spacing, origin, dtype } => {
            let dtype = match dtype.parse::<VolumeDtype>() {
                Ok(dtype) => dtype,
                Err(err) => {
                    log::warn!("surface {i}: {err}");
                    return GeneratedSurface::default();
                }
            };
            make_iso_surface_raw(
                volume_file,
                *dims,
                *iso,
                Vec3::from_array(*spacing),
                Point3::from_array(*origin),
                dtype,
            )
        }
    }
}
