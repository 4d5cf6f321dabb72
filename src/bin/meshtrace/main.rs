//! meshtrace CLI - renders the built-in demo scene progressively.

mod demo;

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use meshtrace::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

struct Args {
    level: &'static str,
    frames: u32,
    size: Option<(u32, u32)>,
    settings: Option<PathBuf>,
    mode: Option<RenderMode>,
}

fn main() {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("Run `meshtrace --help` for usage.");
            std::process::exit(2);
        }
    };

    let _guard = init_tracing(args.level);

    if let Err(e) = run(args) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        level: "info",
        frames: 16,
        size: None,
        settings: None,
        mode: None,
    };

    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-v" | "--verbose" => args.level = "debug",
            "-vv" | "--trace" => args.level = "trace",
            "-q" | "--quiet" => args.level = "warn",
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!(
                    "meshtrace {} (built {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("MESHTRACE_BUILD_DATE")
                );
                return Ok(None);
            }
            "-n" | "--frames" => {
                let v = it.next().context("--frames needs a value")?;
                args.frames = v.parse().with_context(|| format!("bad frame count '{v}'"))?;
            }
            "-s" | "--size" => {
                let v = it.next().context("--size needs WIDTHxHEIGHT")?;
                args.size = Some(parse_size(&v)?);
            }
            "--settings" => {
                let v = it.next().context("--settings needs a file")?;
                args.settings = Some(PathBuf::from(v));
            }
            "-m" | "--mode" => {
                let v = it.next().context("--mode needs a value")?;
                args.mode = Some(parse_mode(&v)?);
            }
            other => bail!("unknown argument '{other}'"),
        }
    }
    Ok(Some(args))
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{s}' is not WIDTHxHEIGHT"))?;
    let w: u32 = w.parse().with_context(|| format!("bad width '{w}'"))?;
    let h: u32 = h.parse().with_context(|| format!("bad height '{h}'"))?;
    if w == 0 || h == 0 {
        bail!("size must be non-zero");
    }
    Ok((w, h))
}

fn parse_mode(s: &str) -> anyhow::Result<RenderMode> {
    Ok(match s {
        "path" | "pt" => RenderMode::PathTraced,
        "normals" | "n" => RenderMode::Normals,
        "tris" | "triangles" => RenderMode::TriangleTests,
        "boxes" | "bounds" => RenderMode::BoxTests,
        _ => bail!("unknown mode '{s}' (path, normals, tris, boxes)"),
    })
}

/// Install the fmt subscriber. `RUST_LOG` overrides the CLI level.
#[cfg(not(feature = "chrome-trace"))]
fn init_tracing(level: &str) -> Option<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
    None
}

/// Install the fmt subscriber, plus a Chrome trace writer when
/// `MESHTRACE_TRACE=1`.
#[cfg(feature = "chrome-trace")]
fn init_tracing(level: &str) -> Option<tracing_chrome::FlushGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt = tracing_subscriber::fmt::layer().with_target(false);

    if env::var("MESHTRACE_TRACE").ok().as_deref() != Some("1") {
        tracing_subscriber::registry().with(filter).with(fmt).init();
        return None;
    }

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file("trace.json")
        .build();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(chrome_layer)
        .init();
    Some(guard)
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut settings = match &args.settings {
        Some(path) => RenderSettings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RenderSettings::load(),
    };
    if let Some((w, h)) = args.size {
        settings.width = w;
        settings.height = h;
    }
    if let Some(mode) = args.mode {
        settings.quality.mode = mode;
    }
    settings.sanitize();

    let store = SceneStore::default();
    let worker = PartitionWorker::spawn(store.clone());
    let epoch = demo::load(&worker)?;
    let (generation, failures) = worker.wait_for_epoch(epoch)?;
    for f in failures {
        if let WorkerResult::Failed { id, error, .. } = f {
            tracing::warn!(id, "demo mesh rejected: {error}");
        }
    }

    let scene = store.current();
    tracing::info!(
        generation,
        chunks = scene.chunks().len(),
        triangles = scene.triangle_count(),
        "scene ready"
    );

    let camera = demo::camera(&settings);
    let mut pt = ProgressiveRenderer::new(settings.width, settings.height);
    let start = Instant::now();
    let mut prev: Option<Image> = None;

    for _ in 0..args.frames {
        let Some(stats) = pt.render(&scene, &camera, &settings.quality, &settings.environment) else {
            break;
        };
        let delta = prev.as_ref().map(|p| mean_abs_diff(p, pt.accumulated()));
        tracing::info!(
            frame = stats.frame_index,
            ms = %format!("{:.1}", stats.elapsed.as_secs_f64() * 1000.0),
            rays = stats.primary_rays,
            luminance = %format!("{:.4}", stats.mean_luminance),
            delta = %delta.map(|d| format!("{d:.5}")).unwrap_or_default(),
            "accumulated"
        );
        prev = Some(pt.accumulated().clone());
    }

    let total = start.elapsed();
    tracing::info!(
        frames = pt.frame_index,
        seconds = %format!("{:.2}", total.as_secs_f64()),
        "done {}x{} {:?}",
        settings.width,
        settings.height,
        settings.quality.mode
    );
    Ok(())
}

/// Mean per-channel absolute difference between two images of equal size.
fn mean_abs_diff(a: &Image, b: &Image) -> f32 {
    let n = a.pixels().len().max(1) as f32;
    a.pixels()
        .iter()
        .zip(b.pixels())
        .map(|(x, y)| (*x - *y).abs().element_sum() / 3.0)
        .sum::<f32>()
        / n
}

fn print_help() {
    println!(
        "meshtrace - progressive path tracer demo

Usage: meshtrace [options]

Options:
  -n, --frames N         Frames to accumulate (default 16)
  -s, --size WxH         Image size, overrides settings
      --settings FILE    Load render settings from a JSON file
  -m, --mode MODE        path | normals | tris | boxes
  -v, --verbose          Debug logging (-vv for trace)
  -q, --quiet            Warnings only
  -V, --version          Print version
  -h, --help             Show this help

RUST_LOG overrides the log level."
    );
}
