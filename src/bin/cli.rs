use anyhow::{anyhow, bail, Context};
use stagefocus::quality::LaplacianVarianceScorer;
use stagefocus::search::score_stack;
use stagefocus::testing::SimulatedStage;
use stagefocus::{
    focus_from_image_stack, focus_from_last_point, full_range, grid_points, AutofocusConfig,
    Frame, LadderDirection, PositionList, SurfaceInterpolator,
};
use std::env;
use std::path::PathBuf;

struct GlobalOptions {
    json: bool,
    config: AutofocusConfig,
}

fn main() -> anyhow::Result<()> {
    stagefocus::init_logging();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json = take_flag(&mut args, "--json");
    let config_path = take_value(&mut args, "--config")?.map(PathBuf::from);

    let config = match config_path {
        Some(path) => AutofocusConfig::load_from_file(path)?,
        None => AutofocusConfig::load_or_default(),
    };
    config.validate()?;

    if args.is_empty() {
        eprintln!("Usage: stagefocus-cli [--json] [--config <path>] <command> [args]");
        eprintln!("Commands: plan, ladder, grid, simulate, predict, score-stack, config");
        std::process::exit(1);
    }

    let command = args.remove(0);
    let opts = GlobalOptions { json, config };
    match command.as_str() {
        "plan" => cmd_plan(&opts, &args),
        "ladder" => cmd_ladder(&opts, &mut args),
        "grid" => cmd_grid(&opts, &args),
        "simulate" => cmd_simulate(&opts, &mut args),
        "predict" => cmd_predict(&opts, &args),
        "score-stack" => cmd_score_stack(&opts, &args),
        "config" => cmd_config(&opts, &mut args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn take_value(args: &mut Vec<String>, flag: &str) -> anyhow::Result<Option<String>> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if i + 1 >= args.len() {
        bail!("{} needs a value", flag);
    }
    let value = args.remove(i + 1);
    args.remove(i);
    Ok(Some(value))
}

fn parse_f64(args: &[String], index: usize, name: &str) -> anyhow::Result<f64> {
    let raw = args
        .get(index)
        .ok_or_else(|| anyhow!("missing argument <{}>", name))?;
    raw.parse()
        .with_context(|| format!("<{}> must be a number, got {:?}", name, raw))
}

fn print_values(opts: &GlobalOptions, values: &[f64]) -> anyhow::Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string(values)?);
    } else {
        for v in values {
            println!("{:.3}", v);
        }
    }
    Ok(())
}

fn print_positions(opts: &GlobalOptions, positions: &PositionList) -> anyhow::Result<()> {
    if opts.json {
        println!("{}", positions.to_json()?);
    } else {
        for p in positions {
            println!("{:.3}\t{:.3}\t{:.3}", p.x, p.y, p.z);
        }
    }
    Ok(())
}

fn cmd_plan(opts: &GlobalOptions, args: &[String]) -> anyhow::Result<()> {
    let center = parse_f64(args, 0, "center")?;
    let scan = &opts.config.full_scan;
    let z = full_range(center, scan.total_z, scan.delta_z)?;
    print_values(opts, &z)
}

fn cmd_ladder(opts: &GlobalOptions, args: &mut Vec<String>) -> anyhow::Result<()> {
    let direction = if take_flag(args, "--reverse") {
        LadderDirection::Reversed
    } else {
        LadderDirection::Forward
    };
    let ladder = opts.config.adaptive_params().ladder()?;
    print_values(opts, &ladder.offsets(direction))
}

fn cmd_grid(opts: &GlobalOptions, args: &[String]) -> anyhow::Result<()> {
    let x0 = parse_f64(args, 0, "x0")?;
    let x1 = parse_f64(args, 1, "x1")?;
    let y0 = parse_f64(args, 2, "y0")?;
    let y1 = parse_f64(args, 3, "y1")?;
    let nx = match args.get(4) {
        Some(raw) => raw.parse().context("<nx> must be a count")?,
        None => opts.config.grid.points_x,
    };
    let ny = match args.get(5) {
        Some(raw) => raw.parse().context("<ny> must be a count")?,
        None => opts.config.grid.points_y,
    };

    let points = grid_points((x0, x1), (y0, y1), nx, ny)?;
    if opts.json {
        println!("{}", serde_json::to_string(&points)?);
    } else {
        for p in points {
            println!("{:.3}\t{:.3}", p.x, p.y);
        }
    }
    Ok(())
}

fn cmd_simulate(opts: &GlobalOptions, args: &mut Vec<String>) -> anyhow::Result<()> {
    let adaptive = take_flag(args, "--adaptive");
    let out = take_value(args, "--out")?.map(PathBuf::from);
    let extent: f64 = take_value(args, "--extent")?
        .map(|v| v.parse())
        .transpose()
        .context("--extent must be a number")?
        .unwrap_or(1000.0);
    let (a, b, c) = match args.iter().position(|a| a == "--tilt") {
        Some(i) => (
            parse_f64(args, i + 1, "a")?,
            parse_f64(args, i + 2, "b")?,
            parse_f64(args, i + 3, "c")?,
        ),
        None => (0.01, -0.015, 100.0),
    };

    let grid = &opts.config.grid;
    let points = grid_points((0.0, extent), (0.0, extent), grid.points_x, grid.points_y)?;
    let mut stage = SimulatedStage::tilted(a, b, c).with_start_z(c);
    let scorer = LaplacianVarianceScorer;

    let positions = if adaptive {
        focus_from_last_point(&points, &mut stage, &scorer, &opts.config.adaptive_params())?
    } else {
        focus_from_image_stack(&points, &mut stage, &scorer, &opts.config.full_scan_params())?
    };
    log::info!("Simulation captured {} frames", stage.frames_captured());

    if let Some(path) = out {
        positions.save_to_file(path)?;
    }
    print_positions(opts, &positions)
}

fn cmd_predict(opts: &GlobalOptions, args: &[String]) -> anyhow::Result<()> {
    let path = args
        .first()
        .ok_or_else(|| anyhow!("missing argument <positions.json>"))?;
    let x = parse_f64(args, 1, "x")?;
    let y = parse_f64(args, 2, "y")?;

    let positions = PositionList::load_from_file(path)?;
    let surface = SurfaceInterpolator::fit(positions.as_slice())?;
    let evaluation = surface.evaluate_checked(x, y);

    if opts.json {
        println!(
            "{}",
            serde_json::json!({
                "x": x,
                "y": y,
                "z": evaluation.z,
                "extrapolated": evaluation.extrapolated,
                "basis": format!("{:?}", surface.basis()),
            })
        );
    } else {
        let note = if evaluation.extrapolated {
            " (extrapolated)"
        } else {
            ""
        };
        println!("{:.3}{}", evaluation.z, note);
    }
    Ok(())
}

fn cmd_score_stack(opts: &GlobalOptions, args: &[String]) -> anyhow::Result<()> {
    let z_start = parse_f64(args, 0, "z_start")?;
    let z_step = parse_f64(args, 1, "z_step")?;
    let files = &args[2.min(args.len())..];
    if files.is_empty() {
        bail!("score-stack needs at least one image");
    }

    let mut frames = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let image = image::open(file).with_context(|| format!("failed to open {}", file))?;
        let z = z_start + i as f64 * z_step;
        frames.push((z, Frame::from_image(&image)));
    }

    let trace = score_stack(&frames, &LaplacianVarianceScorer)?;
    let (index, best) = trace
        .best()
        .ok_or_else(|| anyhow!("no frames were scored"))?;

    if opts.json {
        println!(
            "{}",
            serde_json::json!({
                "best_z": best.z,
                "best_index": index,
                "file": files[index],
                "trace": trace.samples(),
            })
        );
    } else {
        for s in trace.samples() {
            println!("{:.3}\t{:.6}", s.z, s.score);
        }
        println!("best z = {:.3} ({})", best.z, files[index]);
    }
    Ok(())
}

fn cmd_config(opts: &GlobalOptions, args: &mut Vec<String>) -> anyhow::Result<()> {
    if let Some(path) = take_value(args, "--save")? {
        opts.config.save_to_file(&path)?;
    }
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&opts.config)?);
    } else {
        print!("{}", opts.config.to_toml()?);
    }
    Ok(())
}
