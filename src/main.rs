use fvflow::cases::{self, Case};
use fvflow::solver::mesh::read_poly_mesh_file;
use fvflow::solver::{ConvectionScheme, GradientScheme, SimpleSolver, SolverConfig};
use fvflow::trace::{self as tracefmt, TraceCase, TraceEvent, TraceFooter, TraceWriter};
use std::time::Instant;

fn usage() -> &'static str {
    "Usage:
  fvflow channel [options]
  fvflow cavity [options]
  fvflow step [options]
  fvflow mesh <file.poly> [options]

Options:
  --nx N                 cells along x (structured cases)
  --ny N                 cells along y (structured cases)
  --config <file.json>   solver configuration, missing fields take defaults
                         (without it each case uses unit density and viscosity)
  --trace <file.jsonl>   write residuals as JSON lines
  --gradient <scheme>    green_gauss | least_squares
  --convection <scheme>  upwind | downwind | central_difference | fromm | second_order_upwind | quick
  --non-orthogonal       enable non-orthogonal correction
  --transient            march from time_begin to time_end with time_step"
}

#[derive(Debug, Default)]
struct RunOpts {
    case: String,
    mesh_path: Option<String>,
    nx: Option<usize>,
    ny: Option<usize>,
    config_path: Option<String>,
    trace_path: Option<String>,
    gradient: Option<GradientScheme>,
    convection: Option<ConvectionScheme>,
    non_orthogonal: bool,
    transient: bool,
}

fn parse_usize(flag: &str, value: Option<&String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .map_err(|err| format!("invalid value '{value}' for {flag}: {err}"))
}

fn parse_opts(args: &[String]) -> Result<RunOpts, String> {
    let mut opts = RunOpts::default();
    let mut iter = args.iter();
    opts.case = iter.next().ok_or_else(|| usage().to_string())?.clone();
    if opts.case == "mesh" {
        opts.mesh_path = Some(
            iter.next()
                .ok_or_else(|| "expected: fvflow mesh <file.poly>".to_string())?
                .clone(),
        );
    }

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--nx" => opts.nx = Some(parse_usize(flag, iter.next())?),
            "--ny" => opts.ny = Some(parse_usize(flag, iter.next())?),
            "--config" => {
                opts.config_path = Some(iter.next().ok_or("--config needs a path")?.clone())
            }
            "--trace" => {
                opts.trace_path = Some(iter.next().ok_or("--trace needs a path")?.clone())
            }
            "--gradient" => {
                opts.gradient = Some(iter.next().ok_or("--gradient needs a scheme")?.parse()?)
            }
            "--convection" => {
                opts.convection = Some(iter.next().ok_or("--convection needs a scheme")?.parse()?)
            }
            "--non-orthogonal" => opts.non_orthogonal = true,
            "--transient" => opts.transient = true,
            other => return Err(format!("unknown option '{other}'\n\n{}", usage())),
        }
    }
    Ok(opts)
}

fn build_case(opts: &RunOpts) -> Result<Case, String> {
    match opts.case.as_str() {
        "mesh" => {
            let path = opts.mesh_path.as_deref().ok_or("missing mesh path")?;
            let mesh =
                read_poly_mesh_file(path).map_err(|err| format!("failed to read '{path}': {err}"))?;
            Ok(Case {
                name: path.to_string(),
                mesh,
                config: cases::laminar_config(),
            })
        }
        name => cases::build_case(name, opts.nx, opts.ny)
            .map_err(|err| format!("{err}\n\n{}", usage())),
    }
}

fn run(opts: RunOpts) -> Result<(), String> {
    let case = build_case(&opts)?;
    let mut config = match &opts.config_path {
        Some(path) => SolverConfig::load(path)?,
        None => case.config,
    };
    if let Some(gradient) = opts.gradient {
        config.gradient_scheme = gradient;
    }
    if let Some(convection) = opts.convection {
        config.convection_scheme = convection;
    }

    let mut mesh = case.mesh;
    if opts.non_orthogonal {
        mesh.use_non_orthogonal_correction = true;
    }
    println!(
        "{} cells, {} faces, max skewness {:.3}",
        mesh.num_cells(),
        mesh.num_faces(),
        mesh.calculate_max_skewness()
    );

    let mut trace = match &opts.trace_path {
        Some(path) => {
            let mut writer = TraceWriter::create(path)?;
            let case = TraceCase::from_mesh(case.name, &mesh, opts.transient);
            writer.write_event(&TraceEvent::Header(tracefmt::make_header(case, &config)))?;
            Some(writer)
        }
        None => None,
    };

    let mut solver = SimpleSolver::new(mesh, config);
    solver.set_transient(opts.transient);

    let start = Instant::now();
    let result = solver.solve();
    let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    if let Some(mut writer) = trace.take() {
        writer.write_iterations(solver.residual_history())?;
        writer.write_event(&TraceEvent::Footer(TraceFooter {
            closed_unix_ms: tracefmt::now_unix_ms(),
            status: result.as_ref().ok().copied(),
            iterations: solver.residual_history().len(),
            wall_time_ms,
            error: result.as_ref().err().map(|err| err.to_string()),
        }))?;
        println!("Trace written to {}", writer.path().display());
        writer.close()?;
    }

    let status = result.map_err(|err| err.to_string())?;
    let last = solver.time_point_count().saturating_sub(1);
    let velocity = solver.velocity(last).unwrap_or_default();
    let pressure = solver.pressure(last).unwrap_or_default();
    let max_speed = velocity.iter().map(|u| u.norm()).fold(0.0, f64::max);
    let (p_min, p_max) = pressure
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| (lo.min(p), hi.max(p)));

    println!("Status: {} ({:.1} ms)", status.as_str(), wall_time_ms);
    println!("Iterations: {}", solver.residual_history().len());
    println!("Time points: {}", solver.time_point_count());
    println!("Max |u|: {:.6e}", max_speed);
    println!("Pressure range: [{:.6e}, {:.6e}]", p_min, p_max);
    println!("Max mass imbalance: {:.3e}", solver.max_mass_imbalance());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", usage());
        std::process::exit(2);
    }

    let result = parse_opts(&args[1..]).and_then(run);
    if let Err(err) = result {
        eprintln!("[fvflow] {err}");
        std::process::exit(1);
    }
}
