//! Control-point curves and adaptive tessellation.
//!
//! Every cubic family here is evaluated in the same matrix form: with the
//! four control points as columns of `G` and a family basis `B`,
//! `position(t) = G · B · [1, t, t², t³]ᵀ`. Tessellation of a segment is
//! adaptive binary bisection bounded by the second-order Taylor remainder
//! `0.125 · max‖C″‖ · Δt²`, not fixed stepping: the requested interval count
//! only sets the error tolerance (and a recursion-depth cap), so the actual
//! sample count varies with curvature. The first point of a segment is always
//! emitted; emission of the `t = 1` endpoint is caller-controlled so that
//! multi-segment curves don't duplicate their joints.
//!
//! Tessellated points carry Frenet-like frames: the first normal is an
//! arbitrary perpendicular of the first tangent, and each subsequent frame is
//! parallel-transported by the minimal rotation between successive tangents,
//! then re-orthogonalized.

use super::{Point3, Tolerance, Vec3};

/// Squared-length threshold for degenerate directions in frame math.
const FRAME_EPS: f64 = 1e-6;

/// A tessellated curve sample with its local frame.
///
/// Tangent, normal, and binormal are unit length once frames have been
/// computed; the struct is plain data and immutable by convention afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CurvePoint {
    pub position: Point3,
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl CurvePoint {
    #[must_use]
    pub fn at(position: Point3, tangent: Vec3) -> Self {
        Self { position, tangent, normal: Vec3::ZERO, binormal: Vec3::ZERO }
    }
}

/// A control-point curve, dispatched exhaustively at tessellation time.
#[derive(Debug, Clone, PartialEq)]
pub enum SplineCurve {
    /// Piecewise cubic Bézier; control point count must be `3n + 1`.
    Bezier { control_points: Vec<Point3> },
    /// Uniform cubic B-spline; needs at least 4 control points.
    Bspline { control_points: Vec<Point3> },
    /// Uniform Catmull-Rom (interpolating); needs at least 2 control points.
    CatmullRom { control_points: Vec<Point3> },
    /// Circle in the xy-plane; exactly 2 control points, the first point's
    /// x-coordinate is the radius.
    Circle { control_points: Vec<Point3> },
    /// Closed κ-curve through at least 3 points.
    Kappa { control_points: Vec<Point3> },
    /// Independent Bézier segments, each following the `3n + 1` rule.
    BezierPiecewise { segments: Vec<Vec<Point3>> },
    /// Independent B-spline segments of at least 4 points each.
    BsplinePiecewise { segments: Vec<Vec<Point3>> },
}

/// Errors from curve construction and tessellation.
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    /// The control point count does not fit the declared curve family.
    #[error("{family} curve needs {expected} control points, got {got}")]
    ControlPointCount {
        family: &'static str,
        expected: &'static str,
        got: usize,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Cubic bases
// ─────────────────────────────────────────────────────────────────────────────

/// Row `j` holds the polynomial coefficients (ascending powers of `t`) of
/// control point `j`'s blending function.
type Basis = [[f64; 4]; 4];

/// Cubic Bézier / Bernstein basis.
const BASIS_BEZIER: Basis = [
    [1.0, -3.0, 3.0, -1.0],
    [0.0, 3.0, -6.0, 3.0],
    [0.0, 0.0, 3.0, -3.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Uniform cubic B-spline basis (1/6 scaled).
const BASIS_BSPLINE: Basis = [
    [1.0 / 6.0, -3.0 / 6.0, 3.0 / 6.0, -1.0 / 6.0],
    [4.0 / 6.0, 0.0, -6.0 / 6.0, 3.0 / 6.0],
    [1.0 / 6.0, 3.0 / 6.0, 3.0 / 6.0, -3.0 / 6.0],
    [0.0, 0.0, 0.0, 1.0 / 6.0],
];

/// Uniform Catmull-Rom basis over `[P_{i-1}, P_i, P_{i+1}, P_{i+2}]`.
const BASIS_CATMULL_ROM: Basis = [
    [0.0, -0.5, 1.0, -0.5],
    [1.0, 0.0, -2.5, 1.5],
    [0.0, 0.5, 2.0, -1.5],
    [0.0, 0.0, -0.5, 0.5],
];

// ─────────────────────────────────────────────────────────────────────────────
// Segment tessellation
// ─────────────────────────────────────────────────────────────────────────────

/// Tessellate one cubic segment of four control points into `dest`.
///
/// `intervals` sets the error tolerance: the deviation bound the adaptive
/// bisection must reach equals the whole-segment Taylor bound evaluated at a
/// parameter step of `1/intervals`. Bisection stops early at a depth of
/// `min(10 + ceil(log2(intervals + 1)), 18)`.
///
/// The segment's `t = 0` point is always appended. The `t = 1` point is
/// appended only when `include_last` is set, so chained segments can skip
/// their shared joints.
pub fn tessellate_cubic_segment(
    p0: Point3,
    p1: Point3,
    p2: Point3,
    p3: Point3,
    intervals: u32,
    include_last: bool,
    basis: &Basis,
    dest: &mut Vec<CurvePoint>,
) {
    // Columns of G·B: coefficient vectors of 1, t, t², t³.
    let g = [p0.to_vec3(), p1.to_vec3(), p2.to_vec3(), p3.to_vec3()];
    let mut gb = [Vec3::ZERO; 4];
    for (k, coefficient) in gb.iter_mut().enumerate() {
        let mut sum = Vec3::ZERO;
        for (j, point) in g.iter().enumerate() {
            sum = sum.add(point.mul_scalar(basis[j][k]));
        }
        *coefficient = sum;
    }

    // C″(t) = 2·gb[2] + 6·gb[3]·t is linear, so its norm over an interval is
    // maximized at an endpoint or the single interior critical point.
    let second_a = gb[2].mul_scalar(2.0);
    let second_b = gb[3].mul_scalar(6.0);
    let second_norm = |t: f64| second_a.add(second_b.mul_scalar(t)).length();
    let second_bound = |t0: f64, t1: f64| {
        let mut max = second_norm(t0).max(second_norm(t1));
        let b2 = second_b.length_squared();
        if b2 > Tolerance::ZERO_LENGTH.eps {
            let t_crit = -second_a.dot(second_b) / b2;
            if t_crit > t0 && t_crit < t1 {
                max = max.max(second_norm(t_crit));
            }
        }
        max
    };

    let eval = |t: f64| -> CurvePoint {
        let position = gb[0]
            .add(gb[1].mul_scalar(t))
            .add(gb[2].mul_scalar(t * t))
            .add(gb[3].mul_scalar(t * t * t));
        let tangent = gb[1]
            .add(gb[2].mul_scalar(2.0 * t))
            .add(gb[3].mul_scalar(3.0 * t * t));
        let tangent = tangent.normalized_or(tangent);
        CurvePoint::at(Point3::from(position), tangent)
    };

    let intervals = intervals.max(1);
    let base_dt = 1.0 / f64::from(intervals);
    let base_second = second_bound(0.0, 1.0);
    let tolerance = if base_second > 0.0 { 0.125 * base_second * base_dt * base_dt } else { 0.0 };
    let max_depth = (10 + (f64::from(intervals) + 1.0).log2().ceil() as u32).min(18);

    let start = eval(0.0);
    let end = eval(1.0);
    dest.push(start);

    struct Segment {
        t0: f64,
        t1: f64,
        c1: CurvePoint,
        depth: u32,
    }

    // Explicit stack, right half pushed first so output stays in t order.
    let mut stack = vec![Segment { t0: 0.0, t1: 1.0, c1: end, depth: 0 }];
    while let Some(seg) = stack.pop() {
        let dt = seg.t1 - seg.t0;
        let bound = 0.125 * second_bound(seg.t0, seg.t1) * dt * dt;
        if bound <= tolerance || seg.depth >= max_depth {
            if include_last || seg.t1 < 1.0 - 1e-6 {
                dest.push(seg.c1);
            }
            continue;
        }
        let tm = 0.5 * (seg.t0 + seg.t1);
        let cm = eval(tm);
        stack.push(Segment { t0: tm, t1: seg.t1, c1: seg.c1, depth: seg.depth + 1 });
        stack.push(Segment { t0: seg.t0, t1: tm, c1: cm, depth: seg.depth + 1 });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Curve families
// ─────────────────────────────────────────────────────────────────────────────

/// Tessellate a piecewise Bézier curve of `3n + 1` control points.
pub fn tessellate_bezier(
    control_points: &[Point3],
    intervals: u32,
) -> Result<Vec<CurvePoint>, CurveError> {
    if control_points.len() < 4 || control_points.len() % 3 != 1 {
        return Err(CurveError::ControlPointCount {
            family: "bezier",
            expected: "3n + 1 (n >= 1)",
            got: control_points.len(),
        });
    }

    let segment_count = (control_points.len() - 1) / 3;
    let mut dest = Vec::with_capacity(segment_count * (intervals as usize + 1));
    for seg in 0..segment_count {
        let i = seg * 3;
        tessellate_cubic_segment(
            control_points[i],
            control_points[i + 1],
            control_points[i + 2],
            control_points[i + 3],
            intervals,
            seg == segment_count - 1,
            &BASIS_BEZIER,
            &mut dest,
        );
    }
    compute_curve_frames(&mut dest);
    Ok(dest)
}

/// Tessellate a uniform B-spline with a sliding four-point window.
pub fn tessellate_bspline(
    control_points: &[Point3],
    intervals: u32,
) -> Result<Vec<CurvePoint>, CurveError> {
    if control_points.len() < 4 {
        return Err(CurveError::ControlPointCount {
            family: "bspline",
            expected: "at least 4",
            got: control_points.len(),
        });
    }

    let segment_count = control_points.len() - 3;
    let mut dest = Vec::with_capacity(segment_count * (intervals as usize + 1));
    for seg in 0..segment_count {
        tessellate_cubic_segment(
            control_points[seg],
            control_points[seg + 1],
            control_points[seg + 2],
            control_points[seg + 3],
            intervals,
            seg == segment_count - 1,
            &BASIS_BSPLINE,
            &mut dest,
        );
    }
    compute_curve_frames(&mut dest);
    Ok(dest)
}

/// Tessellate a uniform Catmull-Rom curve, duplicating the end points to
/// form boundary segments (natural end conditions). Two control points give
/// a single straight segment.
pub fn tessellate_catmull_rom(
    control_points: &[Point3],
    intervals: u32,
) -> Result<Vec<CurvePoint>, CurveError> {
    if control_points.len() < 2 {
        return Err(CurveError::ControlPointCount {
            family: "catmull-rom",
            expected: "at least 2",
            got: control_points.len(),
        });
    }

    let mut extended = Vec::with_capacity(control_points.len() + 2);
    if control_points.len() == 2 {
        extended.push(control_points[0]);
        extended.push(control_points[0]);
        extended.push(control_points[1]);
        extended.push(control_points[1]);
    } else {
        extended.push(control_points[0]);
        extended.extend_from_slice(control_points);
        extended.push(*control_points.last().expect("checked above"));
    }

    let segment_count = extended.len() - 3;
    let mut dest = Vec::with_capacity(segment_count * (intervals as usize + 1));
    for seg in 0..segment_count {
        tessellate_cubic_segment(
            extended[seg],
            extended[seg + 1],
            extended[seg + 2],
            extended[seg + 3],
            intervals,
            seg == segment_count - 1,
            &BASIS_CATMULL_ROM,
            &mut dest,
        );
    }
    compute_curve_frames(&mut dest);
    Ok(dest)
}

/// Tessellate a closed κ-curve: one cubic Bézier segment per control-point
/// pair, with angle-bisector tangents and handle lengths bounded by local
/// edge geometry to avoid loops and cusps.
pub fn tessellate_kappa_closed(
    control_points: &[Point3],
    intervals: u32,
) -> Result<Vec<CurvePoint>, CurveError> {
    let n = control_points.len();
    if n < 3 {
        return Err(CurveError::ControlPointCount {
            family: "kappa",
            expected: "at least 3",
            got: n,
        });
    }

    // Unit directions and lengths between successive points, wrapping.
    let mut dirs = vec![Vec3::X; n];
    let mut lens = vec![0.0f64; n];
    for i in 0..n {
        let d = control_points[(i + 1) % n] - control_points[i];
        lens[i] = d.length();
        if lens[i] > 1e-8 {
            dirs[i] = d.mul_scalar(1.0 / lens[i]);
        }
    }

    // Angle-bisector tangents; near-180° corners fall back to an in-plane
    // perpendicular of the incoming direction.
    let mut tangents = vec![Vec3::X; n];
    for i in 0..n {
        let d_prev = dirs[(i + n - 1) % n];
        let d_next = dirs[i];
        let sum = d_prev.add(d_next);
        let mut bisector = sum.normalized_or(d_next);
        if sum.length_squared() < 1e-8 {
            bisector = Vec3::Z.cross(d_prev).normalized_or(Vec3::Z.cross(d_next).normalized_or(Vec3::X));
        }
        tangents[i] = bisector;
    }

    // Handle lengths from the local turn angle: sharper corners get shorter
    // handles, floored at a tenth of the shorter adjacent edge.
    let mut handle_out = vec![0.0f64; n];
    let mut handle_in = vec![0.0f64; n];
    for i in 0..n {
        let d_prev = dirs[(i + n - 1) % n];
        let d_next = dirs[i];
        let theta = d_prev.dot(d_next).clamp(-1.0, 1.0).acos();
        let s = lens[(i + n - 1) % n].min(lens[i]);
        let k = 0.5 * (1.0 - theta / std::f64::consts::PI);
        let length = (0.1 * s).max(k * s);
        handle_out[i] = length;
        handle_in[(i + 1) % n] = length;
    }

    // Cubic Bézier control points per segment, handles clamped to half the
    // edge length and projected forward if they bend behind the segment.
    let mut bezier = Vec::with_capacity(4 * n);
    for i in 0..n {
        let p_i = control_points[i];
        let p_j = control_points[(i + 1) % n];
        let t_i = tangents[i].normalized_or(Vec3::X);
        let t_j = tangents[(i + 1) % n].normalized_or(Vec3::X);

        let l_out = handle_out[i].min(lens[i] * 0.5);
        let l_in = handle_in[(i + 1) % n].min(lens[i] * 0.5);

        let b0 = p_i;
        let mut b1 = p_i.add_vec(t_i.mul_scalar(l_out));
        let b3 = p_j;
        let mut b2 = p_j.add_vec(t_j.mul_scalar(-l_in));

        let seg_dir = (p_j - p_i).normalized_or(Vec3::X);
        if (b1 - b0).dot(seg_dir) < 0.0 {
            b1 = b0.add_vec(seg_dir.mul_scalar((b1 - b0).length()));
        }
        if (b3 - b2).dot(seg_dir) < 0.0 {
            b2 = b3.add_vec(seg_dir.mul_scalar(-(b3 - b2).length()));
        }

        bezier.push(b0);
        bezier.push(b1);
        bezier.push(b2);
        bezier.push(b3);
    }

    let mut dest = Vec::with_capacity(n * (intervals as usize + 1));
    for seg in 0..n {
        let i = 4 * seg;
        tessellate_cubic_segment(
            bezier[i],
            bezier[i + 1],
            bezier[i + 2],
            bezier[i + 3],
            intervals,
            seg == n - 1,
            &BASIS_BEZIER,
            &mut dest,
        );
    }
    compute_curve_frames(&mut dest);
    Ok(dest)
}

/// Tessellate a circle in the xy-plane. The first control point's
/// x-coordinate is the radius; `4 · intervals` points are sampled uniformly
/// in angle with analytic frames, endpoint exclusive.
pub fn tessellate_circle(
    control_points: &[Point3],
    intervals: u32,
) -> Result<Vec<CurvePoint>, CurveError> {
    if control_points.len() != 2 {
        return Err(CurveError::ControlPointCount {
            family: "circle",
            expected: "exactly 2",
            got: control_points.len(),
        });
    }

    let samples = intervals.max(1) * 4;
    let radius = control_points[0].x;
    let mut dest = Vec::with_capacity(samples as usize);
    for i in 0..samples {
        let angle = 2.0 * std::f64::consts::PI * f64::from(i) / f64::from(samples - 1);
        let (s, c) = angle.sin_cos();
        dest.push(CurvePoint {
            position: Point3::new(c * radius, s * radius, 0.0),
            tangent: Vec3::new(-s, c, 0.0),
            normal: Vec3::new(-c, -s, 0.0),
            binormal: Vec3::Z,
        });
    }
    Ok(dest)
}

/// Tessellate independent Bézier segments, concatenating their samples.
/// Segments with a malformed control-point count are skipped with a log.
pub fn tessellate_bezier_piecewise(segments: &[Vec<Point3>], intervals: u32) -> Vec<CurvePoint> {
    let mut dest = Vec::new();
    for segment in segments {
        match tessellate_bezier(segment, intervals) {
            Ok(points) => dest.extend(points),
            Err(err) => log::warn!("skipping piecewise bezier segment: {err}"),
        }
    }
    dest
}

/// Tessellate independent B-spline segments, concatenating their samples.
/// Segments with fewer than four points are skipped with a log.
pub fn tessellate_bspline_piecewise(segments: &[Vec<Point3>], intervals: u32) -> Vec<CurvePoint> {
    let mut dest = Vec::new();
    for segment in segments {
        match tessellate_bspline(segment, intervals) {
            Ok(points) => dest.extend(points),
            Err(err) => log::warn!("skipping piecewise bspline segment: {err}"),
        }
    }
    dest
}

/// Tessellate any curve family with exhaustive dispatch.
pub fn tessellate_curve(
    curve: &SplineCurve,
    intervals: u32,
) -> Result<Vec<CurvePoint>, CurveError> {
    match curve {
        SplineCurve::Bezier { control_points } => tessellate_bezier(control_points, intervals),
        SplineCurve::Bspline { control_points } => tessellate_bspline(control_points, intervals),
        SplineCurve::CatmullRom { control_points } => {
            tessellate_catmull_rom(control_points, intervals)
        }
        SplineCurve::Circle { control_points } => tessellate_circle(control_points, intervals),
        SplineCurve::Kappa { control_points } => {
            tessellate_kappa_closed(control_points, intervals)
        }
        SplineCurve::BezierPiecewise { segments } => {
            Ok(tessellate_bezier_piecewise(segments, intervals))
        }
        SplineCurve::BsplinePiecewise { segments } => {
            Ok(tessellate_bspline_piecewise(segments, intervals))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames
// ─────────────────────────────────────────────────────────────────────────────

/// Pick an arbitrary unit vector perpendicular to `t`.
fn pick_perpendicular(t: Vec3) -> Vec3 {
    let axis = if t.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
    let mut n = axis.rejected_from(t);
    if n.length_squared() < FRAME_EPS {
        n = Vec3::Z.rejected_from(t);
    }
    if n.length_squared() < FRAME_EPS {
        return Vec3::X;
    }
    n.normalized_or(Vec3::X)
}

/// Fill in normals and binormals along a tessellated curve by parallel
/// transport of the first frame.
///
/// Each step rotates the previous normal/binormal by the minimal rotation
/// aligning the previous tangent to the current one, then re-orthogonalizes
/// against the current tangent. Degenerate tangents inherit the previous
/// direction; antiparallel steps flip the frame.
pub fn compute_curve_frames(curve: &mut [CurvePoint]) {
    if curve.is_empty() {
        return;
    }

    for point in curve.iter_mut() {
        if point.tangent.length_squared() > FRAME_EPS {
            point.tangent = point.tangent.normalized_or(point.tangent);
        }
    }

    let t0 = if curve[0].tangent.length_squared() > FRAME_EPS { curve[0].tangent } else { Vec3::Z };
    let n0 = pick_perpendicular(t0);
    let mut b0 = t0.cross(n0);
    if b0.length_squared() < FRAME_EPS {
        b0 = pick_perpendicular(t0).cross(t0);
    }
    let b0 = b0.normalized_or(Vec3::Y);
    curve[0].tangent = t0;
    curve[0].normal = b0.cross(t0).normalized_or(n0);
    curve[0].binormal = b0;

    for i in 1..curve.len() {
        let t_prev = curve[i - 1].tangent;
        let n_prev = curve[i - 1].normal;
        let b_prev = curve[i - 1].binormal;

        let mut t = curve[i].tangent;
        if t.length_squared() < FRAME_EPS {
            t = t_prev;
        } else {
            t = t.normalized_or(t_prev);
        }

        let dot = t_prev.dot(t).clamp(-1.0, 1.0);
        let axis = t_prev.cross(t);
        let axis_len = axis.length();
        let mut n = n_prev;
        let mut b = b_prev;
        if axis_len > FRAME_EPS && dot < 0.99999 {
            let axis = axis.mul_scalar(1.0 / axis_len);
            let angle = dot.acos();
            n = n_prev.rotate_about(axis, angle);
            b = b_prev.rotate_about(axis, angle);
        } else if dot < -0.9999 {
            n = n_prev.neg();
            b = b_prev.neg();
        }

        // Re-orthogonalize against the new tangent.
        n = n.rejected_from(t);
        if n.length_squared() < FRAME_EPS {
            n = pick_perpendicular(t);
        } else {
            n = n.normalized_or(n);
        }

        b = t.cross(n);
        if b.length_squared() < FRAME_EPS {
            let alt = pick_perpendicular(t).cross(t);
            b = alt.normalized_or(Vec3::Y);
            n = b.cross(t).normalized_or(n);
        } else {
            b = b.normalized_or(b);
        }

        curve[i].tangent = t;
        curve[i].normal = n;
        curve[i].binormal = b;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweep-path segmentation
// ─────────────────────────────────────────────────────────────────────────────

/// Positional jump threshold (squared) for sweep-path segmentation.
const GAP_SQUARED: f64 = 1e-4;

/// Split a polyline at positional gaps and sharp corners.
///
/// A new segment starts wherever consecutive points jump farther than the
/// gap threshold or the tangent turns by more than 50°. Segments shorter
/// than two points are dropped. Used to pre-segment generalized-cylinder
/// sweep paths.
#[must_use]
pub fn split_at_discontinuities(points: &[CurvePoint]) -> Vec<Vec<CurvePoint>> {
    let angle_cos = (50.0f64).to_radians().cos();
    let mut segments: Vec<Vec<CurvePoint>> = Vec::new();
    let mut current: Vec<CurvePoint> = Vec::new();

    for &point in points {
        let Some(&last) = current.last() else {
            current.push(point);
            continue;
        };
        let mut new_segment =
            (point.position - last.position).length_squared() > GAP_SQUARED;
        if !new_segment {
            let t0 = last.tangent.normalized_or(Vec3::Y);
            let t1 = point.tangent.normalized_or(Vec3::Y);
            new_segment = t0.dot(t1) < angle_cos;
        }
        if new_segment {
            if current.len() >= 2 {
                segments.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        current.push(point);
    }
    if current.len() >= 2 {
        segments.push(current);
    }
    segments
}
