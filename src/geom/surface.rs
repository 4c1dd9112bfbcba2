//! Swept surface generation from tessellated profile curves.
//!
//! All sweeps share one vertex layout: the profile ("diameter") varies
//! fastest, stations along the sweep vary slowest, and [`tri_sweep`] builds
//! the two-triangles-per-quad grid topology over it, optionally wrapping the
//! last station back to the first.
//!
//! Profiles must lie in the xy-plane with zero z in position, tangent, and
//! normal; anything else is a caller error and is rejected loudly. Short or
//! empty inputs degrade to an empty surface instead.

use super::curve::CurvePoint;
use super::{Point3, Vec3};

/// Squared-length threshold for degenerate directions in sweep frames.
const FRAME_EPS: f64 = 1e-6;

/// Errors from surface generation.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The profile curve must lie flat in the xy-plane (z = 0 in position,
    /// tangent, and normal).
    #[error("profile curve must be flat on the xy plane")]
    ProfileNotPlanar,
}

/// A generated triangle surface: parallel position/normal buffers plus
/// index triples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSurface {
    pub positions: Vec<Point3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<[i32; 3]>,
}

impl GeneratedSurface {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Append another surface, offsetting its indices. Patches stay
    /// topologically disjoint.
    pub fn append(&mut self, other: &GeneratedSurface) {
        let offset = self.positions.len() as i32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(
            other.indices.iter().map(|tri| [tri[0] + offset, tri[1] + offset, tri[2] + offset]),
        );
    }
}

/// Build grid topology for a swept surface.
///
/// Vertices are assumed laid out station-major: the first `dia` vertices are
/// the first profile copy, the next `dia` the second, and so on for `len`
/// stations. Each grid quad becomes two triangles; `closed` connects the
/// last station back to the first.
#[must_use]
pub fn tri_sweep(dia: usize, len: usize, closed: bool) -> Vec<[i32; 3]> {
    if dia < 2 || len < 2 {
        return Vec::new();
    }

    let sweep_count = if closed { len } else { len - 1 };
    let mut indices = Vec::with_capacity(sweep_count * (dia - 1) * 2);

    for sweep in 0..sweep_count {
        let curr = sweep;
        let next = (sweep + 1) % len;
        for i in 0..dia - 1 {
            let a = (curr * dia + i) as i32;
            let b = (next * dia + i) as i32;
            let c = (curr * dia + i + 1) as i32;
            let d = (next * dia + i + 1) as i32;
            indices.push([a, b, c]);
            indices.push([c, b, d]);
        }
    }
    indices
}

/// Check that a profile lies flat in the xy-plane.
fn profile_is_flat(profile: &[CurvePoint]) -> bool {
    profile
        .iter()
        .all(|p| p.position.z == 0.0 && p.tangent.z == 0.0 && p.normal.z == 0.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Surface of revolution
// ─────────────────────────────────────────────────────────────────────────────

/// Sweep a flat profile curve around the y-axis in `steps` uniform angular
/// increments, producing a closed surface of revolution.
///
/// Normals derive from the sweep direction crossed with the rotated profile
/// tangent, with degenerate fallbacks, and are oriented to point away from
/// the rotation axis. Empty profiles or zero steps give an empty surface.
pub fn make_surf_rev(
    profile: &[CurvePoint],
    steps: usize,
) -> Result<GeneratedSurface, SurfaceError> {
    if !profile_is_flat(profile) {
        return Err(SurfaceError::ProfileNotPlanar);
    }

    let mut surface = GeneratedSurface::default();
    if profile.is_empty() || steps == 0 {
        return Ok(surface);
    }

    let dia = profile.len();
    surface.positions.reserve(dia * steps);
    surface.normals.reserve(dia * steps);

    let axis = Vec3::Y;

    for step in 0..steps {
        let angle = 2.0 * std::f64::consts::PI * step as f64 / steps as f64;
        let (s, c) = angle.sin_cos();
        // Rotation about the y-axis.
        let rotate = |v: Vec3| Vec3::new(c * v.x + s * v.z, v.y, -s * v.x + c * v.z);

        for cp in profile {
            let pos = rotate(cp.position.to_vec3());
            surface.positions.push(Point3::from(pos));

            let tangent = rotate(cp.tangent);
            let sweep_dir = axis.cross(pos);
            let mut candidate = sweep_dir.cross(tangent);

            if candidate.length_squared() < 1e-8 {
                let rotated_normal = rotate(cp.normal);
                if rotated_normal.length_squared() > 1e-8 {
                    candidate = rotated_normal.neg();
                }
            }
            if candidate.length_squared() < 1e-8 {
                let radial = Vec3::new(pos.x, 0.0, pos.z);
                candidate = if radial.length_squared() > 1e-8 {
                    radial
                } else {
                    axis.cross(tangent)
                };
            }
            let mut candidate = candidate.normalized_or(Vec3::Y);

            // Point away from the rotation axis.
            let radial = Vec3::new(pos.x, 0.0, pos.z);
            if radial.length_squared() > 1e-8 && candidate.dot(radial) < 0.0 {
                candidate = candidate.neg();
            }
            surface.normals.push(candidate);
        }
    }

    if dia >= 2 && steps >= 2 {
        surface.indices = tri_sweep(dia, steps, true);
    }
    Ok(surface)
}

// ─────────────────────────────────────────────────────────────────────────────
// Generalized cylinder
// ─────────────────────────────────────────────────────────────────────────────

/// Sweep a flat profile along an arbitrary 3D path with parallel-transported
/// frames. A path whose endpoints coincide (within epsilon) is detected as
/// closed: the duplicate point is dropped and the strip wraps topologically.
pub fn make_gen_cyl(
    profile: &[CurvePoint],
    sweep: &[CurvePoint],
) -> Result<GeneratedSurface, SurfaceError> {
    gen_cyl_impl(profile, sweep, None)
}

/// Generalized cylinder with a per-station scale curve.
///
/// The scale curve is matched to the sweep by normalized arc length; each
/// sampled point's x-coordinate is the scale factor (falling back to its
/// planar xy magnitude when x is zero or non-finite), clamped to a small
/// positive minimum. The profile is scaled uniformly in its local xy-plane.
pub fn make_gen_cyl_scaled(
    profile: &[CurvePoint],
    sweep: &[CurvePoint],
    scale: &[CurvePoint],
) -> Result<GeneratedSurface, SurfaceError> {
    gen_cyl_impl(profile, sweep, Some(scale))
}

/// Sweep each pre-segmented piece of a path independently and concatenate
/// the resulting patches without stitching across the gaps.
pub fn make_gen_cyl_piecewise(
    profile: &[CurvePoint],
    sweep_segments: &[Vec<CurvePoint>],
) -> Result<GeneratedSurface, SurfaceError> {
    if !profile_is_flat(profile) {
        return Err(SurfaceError::ProfileNotPlanar);
    }

    let mut merged = GeneratedSurface::default();
    if profile.is_empty() || sweep_segments.is_empty() {
        return Ok(merged);
    }
    for segment in sweep_segments {
        if segment.len() < 2 {
            continue;
        }
        let part = gen_cyl_impl(profile, segment, None)?;
        merged.append(&part);
    }
    Ok(merged)
}

fn gen_cyl_impl(
    profile: &[CurvePoint],
    sweep: &[CurvePoint],
    scale: Option<&[CurvePoint]>,
) -> Result<GeneratedSurface, SurfaceError> {
    if !profile_is_flat(profile) {
        return Err(SurfaceError::ProfileNotPlanar);
    }

    let mut surface = GeneratedSurface::default();
    if profile.is_empty() || sweep.is_empty() {
        return Ok(surface);
    }

    // Closed-path detection: coincident endpoints collapse to one station
    // and the strip wraps instead.
    let mut samples = sweep.to_vec();
    let mut close_sweep = false;
    if samples.len() > 1 {
        let first = samples.first().expect("non-empty").position;
        let last = samples.last().expect("non-empty").position;
        if first.distance_squared_to(last) < 1e-6 {
            close_sweep = true;
            samples.pop();
        }
    }

    let dia = profile.len();
    let len = samples.len();
    if dia < 2 || len < 2 {
        return Ok(surface);
    }

    surface.positions.reserve(dia * len);
    surface.normals.reserve(dia * len);

    // Arc-length matched per-station scale factors.
    let station_scale: Option<(Vec<f64>, Vec<f64>, Vec<f64>)> = scale.map(|scale_curve| {
        let u_sweep = cumulative_normalized(&samples);
        let u_scale = cumulative_normalized(scale_curve);
        let values: Vec<f64> = scale_curve
            .iter()
            .map(|p| {
                let mut v = p.position.x;
                if !v.is_finite() || v.abs() < 1e-12 {
                    let planar = (p.position.x * p.position.x + p.position.y * p.position.y).sqrt();
                    v = if planar.is_finite() && planar >= 1e-12 { planar } else { 1.0 };
                }
                v.max(1e-4)
            })
            .collect();
        (u_sweep, u_scale, values)
    });
    let scale_at = |j: usize| -> f64 {
        let Some((u_sweep, u_scale, values)) = &station_scale else {
            return 1.0;
        };
        if u_scale.is_empty() {
            return 1.0;
        }
        let u = u_sweep[j];
        if u <= u_scale[0] {
            return values[0];
        }
        if u >= *u_scale.last().expect("non-empty") {
            return *values.last().expect("non-empty");
        }
        let mut hi = 1usize;
        while hi < u_scale.len() && u_scale[hi] < u {
            hi += 1;
        }
        let lo = hi - 1;
        let span = (u_scale[hi] - u_scale[lo]).max(1e-12);
        let t = (u - u_scale[lo]) / span;
        values[lo] * (1.0 - t) + values[hi] * t
    };

    let mut prev_tangent = Vec3::ZERO;
    let mut prev_normal = Vec3::ZERO;
    let mut prev_binormal = Vec3::ZERO;
    let mut has_prev_frame = false;

    for j in 0..len {
        let sp = samples[j];
        let s = scale_at(j);

        // Station tangent, with positional fallbacks for degenerate data.
        let mut t = sp.tangent;
        if t.length_squared() < FRAME_EPS {
            if j + 1 < len {
                t = samples[j + 1].position - sp.position;
            } else if close_sweep && len > 1 {
                t = samples[0].position - sp.position;
            } else if j > 0 {
                t = sp.position - samples[j - 1].position;
            }
        }
        if t.length_squared() < FRAME_EPS {
            t = Vec3::Y;
        }
        let t = t.normalized_or(Vec3::Y);

        let mut normal_hint = sp.normal;
        if normal_hint.length_squared() < FRAME_EPS && sp.binormal.length_squared() > FRAME_EPS {
            normal_hint = sp.binormal.cross(t);
        }

        let (n, b) = if has_prev_frame {
            // Transport the previous frame by the minimal rotation between
            // tangents, then reconcile with the hint.
            let mut transported_n = prev_normal;
            let mut transported_b = prev_binormal;
            let axis = prev_tangent.cross(t);
            let axis_len = axis.length();
            let dot = prev_tangent.dot(t).clamp(-1.0, 1.0);
            if axis_len > FRAME_EPS {
                let axis = axis.mul_scalar(1.0 / axis_len);
                let angle = axis_len.atan2(dot);
                transported_n = transported_n.rotate_about(axis, angle);
                transported_b = transported_b.rotate_about(axis, angle);
            } else if dot < 0.0 {
                transported_n = transported_n.neg();
                transported_b = transported_b.neg();
            }

            let mut hint = normal_hint;
            if hint.length_squared() > FRAME_EPS {
                hint = hint.rejected_from(t);
                if hint.length_squared() > FRAME_EPS {
                    hint = hint.normalized_or(hint);
                    if hint.dot(transported_n) < 0.0 {
                        hint = hint.neg();
                    }
                } else {
                    hint = Vec3::ZERO;
                }
            }

            let (mut n, mut b) = make_frame(t, hint, transported_n);
            if n.dot(transported_n) < 0.0 {
                n = n.neg();
                b = b.neg();
            }
            (n, b)
        } else {
            make_frame(t, normal_hint, Vec3::ZERO)
        };

        for cp in profile {
            // Frame columns (n, b, t) applied to the local profile point,
            // with uniform xy scaling when a scale curve is present.
            let local = Vec3::new(cp.position.x * s, cp.position.y * s, cp.position.z);
            let world = sp
                .position
                .add_vec(n.mul_scalar(local.x).add(b.mul_scalar(local.y)).add(t.mul_scalar(local.z)));
            surface.positions.push(world);

            let local_tangent = cp.tangent.mul_scalar(s);
            let tangent_u = n
                .mul_scalar(local_tangent.x)
                .add(b.mul_scalar(local_tangent.y))
                .add(t.mul_scalar(local_tangent.z));
            let mut candidate = t.cross(tangent_u);

            let local_normal = n
                .mul_scalar(cp.normal.x)
                .add(b.mul_scalar(cp.normal.y))
                .add(t.mul_scalar(cp.normal.z));

            if candidate.length_squared() < FRAME_EPS {
                candidate = if local_normal.length_squared() > FRAME_EPS {
                    local_normal.neg()
                } else {
                    n
                };
            }
            let mut candidate = candidate.normalized_or(n);
            if local_normal.length_squared() > FRAME_EPS && candidate.dot(local_normal) > 0.0 {
                candidate = candidate.neg();
            }
            surface.normals.push(candidate);
        }

        prev_tangent = t;
        prev_normal = n;
        prev_binormal = b;
        has_prev_frame = true;
    }

    surface.indices = tri_sweep(dia, len, close_sweep);
    Ok(surface)
}

/// An arbitrary unit vector orthogonal to `t_dir`.
fn orthogonal_vector(t_dir: Vec3) -> Vec3 {
    let axis = if t_dir.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let mut ortho = axis.rejected_from(t_dir);
    if ortho.length_squared() < FRAME_EPS {
        ortho = Vec3::Z.rejected_from(t_dir);
    }
    if ortho.length_squared() < FRAME_EPS {
        return Vec3::X;
    }
    ortho.normalized_or(Vec3::X)
}

/// Build an orthonormal frame around tangent `t_dir`, preferring the hint
/// normal, then the fallback, then an arbitrary perpendicular.
fn make_frame(t_dir: Vec3, n_hint: Vec3, fallback_n: Vec3) -> (Vec3, Vec3) {
    let mut n = n_hint;
    if n.length_squared() > FRAME_EPS {
        n = n.rejected_from(t_dir);
    }
    if n.length_squared() < FRAME_EPS && fallback_n.length_squared() > FRAME_EPS {
        let candidate = fallback_n.rejected_from(t_dir);
        if candidate.length_squared() >= FRAME_EPS {
            n = candidate;
        }
    }
    if n.length_squared() < FRAME_EPS {
        n = orthogonal_vector(t_dir);
    }
    let mut n = n.normalized_or(Vec3::X);

    let mut b = t_dir.cross(n);
    if b.length_squared() < FRAME_EPS {
        n = orthogonal_vector(t_dir);
        b = t_dir.cross(n);
    }
    let b = b.normalized_or(Vec3::Y);
    let refined = b.cross(t_dir);
    if refined.length_squared() > FRAME_EPS {
        n = refined.normalized_or(n);
    }
    (n, b)
}

/// Normalized cumulative arc-length parameters of a polyline, uniform
/// fallback for zero-length input.
fn cumulative_normalized(points: &[CurvePoint]) -> Vec<f64> {
    let mut u = vec![0.0f64; points.len()];
    if points.len() <= 1 {
        return u;
    }
    let mut acc = 0.0;
    for i in 1..points.len() {
        acc += (points[i].position - points[i - 1].position).length();
        u[i] = acc;
    }
    if acc > 1e-20 {
        for v in &mut u {
            *v /= acc;
        }
    } else {
        let denom = (points.len() - 1).max(1) as f64;
        for (i, v) in u.iter_mut().enumerate() {
            *v = i as f64 / denom;
        }
    }
    u
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::curve::{tessellate_catmull_rom, tessellate_circle};

    fn flat_profile(k: usize) -> Vec<CurvePoint> {
        (0..k)
            .map(|i| CurvePoint {
                position: Point3::new(1.0, i as f64 * 0.5, 0.0),
                tangent: Vec3::Y,
                normal: Vec3::new(-1.0, 0.0, 0.0),
                binormal: Vec3::Z,
            })
            .collect()
    }

    #[test]
    fn test_tri_sweep_counts() {
        let open = tri_sweep(5, 4, false);
        assert_eq!(open.len(), 2 * 4 * 3);
        let closed = tri_sweep(5, 4, true);
        assert_eq!(closed.len(), 2 * 4 * 4);
        assert!(tri_sweep(1, 4, false).is_empty());
        assert!(tri_sweep(4, 1, true).is_empty());
    }

    #[test]
    fn test_surf_rev_vertex_and_triangle_counts() {
        let profile = flat_profile(4);
        let steps = 12;
        let surface = make_surf_rev(&profile, steps).unwrap();
        assert_eq!(surface.vertex_count(), 4 * steps);
        assert_eq!(surface.triangle_count(), 2 * (4 - 1) * steps);
        let max_index = surface.indices.iter().flatten().copied().max().unwrap();
        assert!((max_index as usize) < 4 * steps);
    }

    #[test]
    fn test_surf_rev_rejects_nonplanar_profile() {
        let mut profile = flat_profile(3);
        profile[1].position.z = 0.25;
        assert!(matches!(make_surf_rev(&profile, 8), Err(SurfaceError::ProfileNotPlanar)));
    }

    #[test]
    fn test_surf_rev_normals_point_outward() {
        // Revolving a vertical line at x=1 gives a cylinder; normals should
        // point away from the y-axis.
        let profile = flat_profile(4);
        let surface = make_surf_rev(&profile, 16).unwrap();
        for (pos, normal) in surface.positions.iter().zip(&surface.normals) {
            let radial = Vec3::new(pos.x, 0.0, pos.z);
            assert!(normal.dot(radial) > 0.0);
        }
    }

    #[test]
    fn test_surf_rev_empty_inputs() {
        assert!(make_surf_rev(&[], 8).unwrap().is_empty());
        assert!(make_surf_rev(&flat_profile(3), 0).unwrap().is_empty());
    }

    #[test]
    fn test_gen_cyl_open_path() {
        let profile = tessellate_circle(
            &[Point3::new(0.2, 0.0, 0.0), Point3::ORIGIN],
            2,
        )
        .unwrap();
        let path = tessellate_catmull_rom(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.5),
                Point3::new(0.0, 2.0, 0.0),
            ],
            4,
        )
        .unwrap();
        let surface = make_gen_cyl(&profile, &path).unwrap();
        assert!(!surface.is_empty());
        assert_eq!(surface.vertex_count(), profile.len() * path.len());
        assert_eq!(surface.triangle_count(), 2 * (profile.len() - 1) * (path.len() - 1));
    }

    #[test]
    fn test_gen_cyl_detects_closed_path() {
        // A closed square path: endpoints coincide.
        let mut path = Vec::new();
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        for pair in corners.windows(2) {
            let dir = (pair[1] - pair[0]).normalized_or(Vec3::X);
            for step in 0..4 {
                path.push(CurvePoint::at(pair[0].lerp(pair[1], step as f64 / 4.0), dir));
            }
        }
        path.push(CurvePoint::at(corners[4], Vec3::X));

        let profile = flat_profile(3);
        let surface = make_gen_cyl(&profile, &path).unwrap();
        let stations = path.len() - 1;
        assert_eq!(surface.vertex_count(), profile.len() * stations);
        // Closed sweep: one quad strip per station, including the wrap.
        assert_eq!(surface.triangle_count(), 2 * (profile.len() - 1) * stations);
    }

    #[test]
    fn test_gen_cyl_scaled_changes_radius() {
        let profile = tessellate_circle(
            &[Point3::new(1.0, 0.0, 0.0), Point3::ORIGIN],
            2,
        )
        .unwrap();
        let path: Vec<CurvePoint> = (0..8)
            .map(|i| CurvePoint::at(Point3::new(0.0, i as f64, 0.0), Vec3::Y))
            .collect();
        // Scale ramps from 1 to 3 along the sweep.
        let scale: Vec<CurvePoint> = (0..4)
            .map(|i| CurvePoint::at(Point3::new(1.0 + i as f64 * 2.0 / 3.0, i as f64, 0.0), Vec3::Y))
            .collect();
        let surface = make_gen_cyl_scaled(&profile, &path, &scale).unwrap();

        let dia = profile.len();
        let first_station_radius = surface.positions[0].sub_point(Point3::new(0.0, 0.0, 0.0));
        let last_base = (path.len() - 1) * dia;
        let last_station_radius =
            surface.positions[last_base].sub_point(Point3::new(0.0, 7.0, 0.0));
        let r0 = Vec3::new(first_station_radius.x, 0.0, first_station_radius.z).length();
        let r1 = Vec3::new(last_station_radius.x, 0.0, last_station_radius.z).length();
        assert!((r0 - 1.0).abs() < 1e-6);
        assert!((r1 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_gen_cyl_piecewise_keeps_patches_disjoint() {
        let profile = flat_profile(3);
        let seg_a: Vec<CurvePoint> =
            (0..4).map(|i| CurvePoint::at(Point3::new(0.0, i as f64, 0.0), Vec3::Y)).collect();
        let seg_b: Vec<CurvePoint> =
            (0..4).map(|i| CurvePoint::at(Point3::new(5.0, i as f64, 0.0), Vec3::Y)).collect();
        let merged = make_gen_cyl_piecewise(&profile, &[seg_a.clone(), seg_b]).unwrap();
        let single = make_gen_cyl(&profile, &seg_a).unwrap();
        assert_eq!(merged.vertex_count(), single.vertex_count() * 2);
        assert_eq!(merged.triangle_count(), single.triangle_count() * 2);
        let max_index = merged.indices.iter().flatten().copied().max().unwrap();
        assert!((max_index as usize) < merged.vertex_count());
    }

    #[test]
    fn test_gen_cyl_short_inputs_give_empty_surface() {
        let profile = flat_profile(3);
        assert!(make_gen_cyl(&profile, &[]).unwrap().is_empty());
        let one_station = [CurvePoint::at(Point3::ORIGIN, Vec3::Y)];
        assert!(make_gen_cyl(&profile, &one_station).unwrap().is_empty());
    }
}
