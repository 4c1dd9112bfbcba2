//! Native scenario runner for the geometry engine.
//!
//! Builds each named pipeline headlessly and writes the resulting mesh as
//! OBJ, for eyeballing output in any viewer and for golden comparisons.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use geomlab_engine::geom::{
    GeneratedSurface, MeshWithConnectivity, Point3, ScalarVolume, SplineCurve,
    SubdivisionOptions, Vec3, VolumeSamples, loop_subdivide, make_gen_cyl, make_gen_cyl_scaled,
    make_iso_surface, make_surf_rev, simplify_qem, tessellate_curve,
};

const USAGE: &str = r#"geom_cli (geomlab-engine)

USAGE:
  geom_cli list
  geom_cli run <scenario|all> [--out-dir <dir>]

SCENARIOS:
  revolve_goblet      catmull-rom profile revolved around the y-axis
  gen_cyl_helix       circle profile swept along a helical path
  gen_cyl_tapered     the same sweep with a tapering scale curve
  subdivide_tetra     two Loop subdivision levels of a tetrahedron
  simplify_sphere     subdivided cube simplified back down with QEM
  isosurface_sphere   marching tetrahedra over a synthetic sphere volume

OPTIONS:
  --out-dir <dir>   Directory for <scenario>.obj files (default: current)
  -h, --help        Show this help
"#;

const SCENARIOS: [&str; 6] = [
    "revolve_goblet",
    "gen_cyl_helix",
    "gen_cyl_tapered",
    "subdivide_tetra",
    "simplify_sphere",
    "isosurface_sphere",
];

fn main() {
    if let Err(err) = run() {
        eprintln!("geom_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut args = args.into_iter();

    match args.next().as_deref() {
        None | Some("-h") | Some("--help") => {
            print!("{USAGE}");
            Ok(())
        }
        Some("list") => {
            for name in SCENARIOS {
                println!("{name}");
            }
            Ok(())
        }
        Some("run") => {
            let target = args.next().ok_or_else(|| "run needs a scenario name".to_owned())?;
            let mut out_dir = PathBuf::from(".");
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--out-dir" => {
                        out_dir =
                            PathBuf::from(args.next().ok_or("--out-dir needs a value")?);
                    }
                    other => return Err(format!("unknown option {other}")),
                }
            }

            if target == "all" {
                for name in SCENARIOS {
                    run_scenario(name, &out_dir)?;
                }
                Ok(())
            } else {
                run_scenario(&target, &out_dir)
            }
        }
        Some(other) => Err(format!("unknown command {other}; try --help")),
    }
}

fn run_scenario(name: &str, out_dir: &Path) -> Result<(), String> {
    let (positions, triangles) = match name {
        "revolve_goblet" => revolve_goblet()?,
        "gen_cyl_helix" => gen_cyl_helix(false)?,
        "gen_cyl_tapered" => gen_cyl_helix(true)?,
        "subdivide_tetra" => subdivide_tetra(),
        "simplify_sphere" => simplify_sphere()?,
        "isosurface_sphere" => isosurface_sphere()?,
        other => return Err(format!("unknown scenario {other}")),
    };

    let path = out_dir.join(format!("{name}.obj"));
    write_obj(&path, &positions, &triangles)
        .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
    println!("{name}: {} vertices, {} triangles -> {}", positions.len(), triangles.len(), path.display());
    Ok(())
}

fn flat_goblet_profile() -> Result<Vec<geomlab_engine::geom::CurvePoint>, String> {
    let profile = tessellate_curve(
        &SplineCurve::CatmullRom {
            control_points: vec![
                Point3::new(0.2, -1.0, 0.0),
                Point3::new(1.0, -0.6, 0.0),
                Point3::new(0.4, 0.2, 0.0),
                Point3::new(0.9, 1.0, 0.0),
            ],
        },
        8,
    )
    .map_err(|err| err.to_string())?;
    // Revolution requires a strictly planar profile frame.
    Ok(profile
        .into_iter()
        .map(|mut p| {
            p.position.z = 0.0;
            p.tangent.z = 0.0;
            p.normal.z = 0.0;
            p
        })
        .collect())
}

fn revolve_goblet() -> Result<(Vec<Point3>, Vec<[u32; 3]>), String> {
    let profile = flat_goblet_profile()?;
    let surface = make_surf_rev(&profile, 24).map_err(|err| err.to_string())?;
    Ok(surface_buffers(&surface))
}

fn gen_cyl_helix(tapered: bool) -> Result<(Vec<Point3>, Vec<[u32; 3]>), String> {
    let profile = tessellate_curve(
        &SplineCurve::Circle {
            control_points: vec![Point3::new(0.25, 0.0, 0.0), Point3::ORIGIN],
        },
        4,
    )
    .map_err(|err| err.to_string())?;

    let turns = 3.0;
    let helix: Vec<Point3> = (0..16)
        .map(|i| {
            let t = f64::from(i) / 15.0;
            let angle = turns * 2.0 * std::f64::consts::PI * t;
            Point3::new(angle.cos(), 3.0 * t, angle.sin())
        })
        .collect();
    let path = tessellate_curve(&SplineCurve::CatmullRom { control_points: helix }, 6)
        .map_err(|err| err.to_string())?;

    let surface = if tapered {
        let scale = tessellate_curve(
            &SplineCurve::CatmullRom {
                control_points: vec![
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.6, 1.0, 0.0),
                    Point3::new(0.2, 2.0, 0.0),
                ],
            },
            4,
        )
        .map_err(|err| err.to_string())?;
        make_gen_cyl_scaled(&profile, &path, &scale)
    } else {
        make_gen_cyl(&profile, &path)
    }
    .map_err(|err| err.to_string())?;
    Ok(surface_buffers(&surface))
}

fn subdivide_tetra() -> (Vec<Point3>, Vec<[u32; 3]>) {
    let base = geomlab_engine::geom::IndexedMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
    );
    let mut mesh = MeshWithConnectivity::from_mesh(&base);
    loop_subdivide(&mut mesh, SubdivisionOptions::default());
    loop_subdivide(&mut mesh, SubdivisionOptions::default());
    (mesh.positions.clone(), mesh.triangles.clone())
}

fn simplify_sphere() -> Result<(Vec<Point3>, Vec<[u32; 3]>), String> {
    // Subdivide a cube into a sphere-ish blob, then decimate it.
    let base = geomlab_engine::geom::IndexedMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ],
        vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ],
    );
    let mut mesh = MeshWithConnectivity::from_mesh(&base);
    loop_subdivide(&mut mesh, SubdivisionOptions::default());
    loop_subdivide(&mut mesh, SubdivisionOptions::default());
    let result = simplify_qem(&mesh.to_indexed_mesh(), 40).map_err(|err| err.to_string())?;
    Ok((result.mesh.positions, result.mesh.triangles))
}

fn isosurface_sphere() -> Result<(Vec<Point3>, Vec<[u32; 3]>), String> {
    let n = 24usize;
    let radius = 8.0;
    let center = (n as f64 - 1.0) / 2.0;
    let mut data = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let dx = x as f64 - center;
                let dy = y as f64 - center;
                let dz = z as f64 - center;
                let d = (dx * dx + dy * dy + dz * dz).sqrt();
                // Soft falloff so the surface interpolates smoothly.
                data.push((radius - d).clamp(-1.0, 1.0) as f32 * 0.5 + 0.5);
            }
        }
    }
    let volume = ScalarVolume::new(
        [n, n, n],
        Vec3::new(1.0, 1.0, 1.0),
        Point3::ORIGIN,
        VolumeSamples::Float32(data),
    )
    .map_err(|err| err.to_string())?;
    let surface = make_iso_surface(&volume, 0.5);
    Ok(surface_buffers(&surface))
}

fn surface_buffers(surface: &GeneratedSurface) -> (Vec<Point3>, Vec<[u32; 3]>) {
    let triangles = surface
        .indices
        .iter()
        .map(|tri| [tri[0] as u32, tri[1] as u32, tri[2] as u32])
        .collect();
    (surface.positions.clone(), triangles)
}

fn write_obj(path: &Path, positions: &[Point3], triangles: &[[u32; 3]]) -> std::io::Result<()> {
    let mut text = String::new();
    for p in positions {
        let _ = writeln!(text, "v {} {} {}", p.x, p.y, p.z);
    }
    for tri in triangles {
        let _ = writeln!(text, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1);
    }
    std::fs::write(path, text)
}
