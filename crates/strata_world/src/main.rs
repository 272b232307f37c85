use std::env;
use std::path::PathBuf;

use glam::IVec2;
use strata_shared::settings::GenConfig;
use strata_world::world::TerrainWorld;
use tracing::info;

const DEFAULT_RADIUS: i32 = 4;

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut config_path: Option<PathBuf> = None;
    let mut radius = DEFAULT_RADIUS;
    let mut threads: Option<usize> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(value) = args.next() else {
                    eprintln!("--config expects a path argument");
                    std::process::exit(2);
                };
                config_path = Some(PathBuf::from(value));
            }
            "--radius" => {
                let Some(value) = args.next() else {
                    eprintln!("--radius expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<i32>() {
                    Ok(parsed) if parsed >= 0 => radius = parsed,
                    _ => {
                        eprintln!("invalid radius '{value}': expected a non-negative integer");
                        std::process::exit(2);
                    }
                }
            }
            "--threads" => {
                let Some(value) = args.next() else {
                    eprintln!("--threads expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<usize>() {
                    Ok(parsed) => threads = Some(parsed),
                    Err(err) => {
                        eprintln!("invalid thread count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("Usage: strata_world [--config <path>] [--radius <n>] [--threads <n>]");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let mut config = match config_path {
        Some(path) => match GenConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(2);
            }
        },
        None => GenConfig::default(),
    };
    if threads.is_some() {
        config.pipeline.worker_threads = threads;
    }

    let mut terrain = match TerrainWorld::new(&config) {
        Ok(terrain) => terrain,
        Err(err) => {
            eprintln!("failed to start generation: {err}");
            std::process::exit(2);
        }
    };

    for x in -radius..=radius {
        for z in -radius..=radius {
            terrain.request_region(IVec2::new(x, z));
        }
    }
    info!(
        "Generating {} region(s) with {:?}",
        terrain.region_count(),
        config.terrain
    );

    let report = terrain.generate();
    if let (Some(map), Some(chunks)) = (
        terrain.height_map(IVec2::ZERO),
        terrain.chunks(IVec2::ZERO),
    ) {
        info!(
            "Origin region: max height {}, {} chunk layer(s)",
            map.max_height(),
            chunks.len()
        );
    }

    let rerun = terrain.generate();
    info!(
        "Second pass touched {} region(s) (first pass: {} generated, {} failed)",
        rerun.regions_generated, report.regions_generated, report.regions_failed
    );
}
