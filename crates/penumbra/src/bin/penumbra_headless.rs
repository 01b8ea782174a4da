//! # PENUMBRA Headless
//!
//! Renders the demo stage with the software device and optionally writes
//! the last frame to a PNG.
//!
//! ```bash
//! penumbra_headless [CONFIG] [--frames N] [--size WxH] [--png out.png] [--print-config]
//! ```
//!
//! `CONFIG` defaults to `data/renderer.toml`; a missing file falls back to
//! built-in defaults, a malformed one is fatal.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use penumbra::{demo, FrameCompositor, RenderContext, RendererConfig, TargetSurface};

const DEFAULT_CONFIG: &str = "data/renderer.toml";

struct Options {
    config: PathBuf,
    frames: u32,
    width: u32,
    height: u32,
    png: Option<PathBuf>,
    print_config: bool,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        config: PathBuf::from(DEFAULT_CONFIG),
        frames: 4,
        width: 320,
        height: 180,
        png: None,
        print_config: false,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let value = args.next().ok_or("--frames needs a value")?;
                options.frames = value
                    .parse()
                    .map_err(|e| format!("bad --frames '{value}': {e}"))?;
            }
            "--size" => {
                let value = args.next().ok_or("--size needs WxH")?;
                let (w, h) = value
                    .split_once('x')
                    .ok_or_else(|| format!("bad --size '{value}', expected WxH"))?;
                options.width = w.parse().map_err(|e| format!("bad width '{w}': {e}"))?;
                options.height = h.parse().map_err(|e| format!("bad height '{h}': {e}"))?;
            }
            "--png" => {
                options.png = Some(PathBuf::from(args.next().ok_or("--png needs a path")?));
            }
            "--print-config" => options.print_config = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
            path => options.config = PathBuf::from(path),
        }
    }
    Ok(options)
}

fn load_config(path: &Path) -> Result<RendererConfig, String> {
    if !path.exists() {
        println!("   ! {} not found, using defaults", path.display());
        return Ok(RendererConfig::default());
    }
    RendererConfig::from_toml_file(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn save_png(ctx: &RenderContext, path: &Path) -> Result<(), String> {
    let (width, height) = ctx.frame_extent();
    let bytes: Vec<u8> = ctx.surface_texels().iter().flatten().copied().collect();
    let image = image::RgbaImage::from_raw(width, height, bytes)
        .ok_or("frame buffer does not match its extent")?;
    image
        .save(path)
        .map_err(|e| format!("{}: {e}", path.display()))
}

fn run(options: &Options) -> Result<(), String> {
    println!("📄 Loading {} ...", options.config.display());
    let config = load_config(&options.config)?;
    if options.print_config {
        let text = toml::to_string_pretty(&config).map_err(|e| e.to_string())?;
        println!("{text}");
    }

    let surface =
        TargetSurface::new(options.width, options.height, 1.0).map_err(|e| e.to_string())?;
    let mut ctx = RenderContext::new(surface);

    let started = Instant::now();
    let mut compositor = FrameCompositor::new(&mut ctx, config).map_err(|e| e.to_string())?;
    println!(
        "   ✓ Density field uploaded ({:.1} ms)",
        started.elapsed().as_secs_f64() * 1000.0
    );
    println!("   ✓ Pass order: {}", compositor.execution_order().join(" → "));

    let mut scene = demo::stage(&compositor).map_err(|e| e.to_string())?;
    let camera = demo::camera(options.width as f32 / options.height as f32);

    println!();
    for frame in 0..options.frames {
        let t = frame as f32 / options.frames.max(1) as f32;
        demo::follow_pointer(&mut scene, [t * 2.0 - 1.0, 0.0], 0.5);
        scene.elapsed = t;

        let frame_start = Instant::now();
        let report = compositor
            .render(&mut ctx, &scene, &camera)
            .map_err(|e| e.to_string())?;
        println!(
            "   frame {:>3}  {}x{}  {} nodes  {:.1} ms",
            report.frame_index,
            report.surface_extent.0,
            report.surface_extent.1,
            report.nodes_executed,
            frame_start.elapsed().as_secs_f64() * 1000.0
        );
    }

    if let Some(path) = &options.png {
        save_png(&ctx, path)?;
        println!();
        println!("   ✓ Wrote {}", path.display());
    }

    compositor.dispose(&mut ctx).map_err(|e| e.to_string())?;
    Ok(())
}

fn main() -> ExitCode {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    PENUMBRA HEADLESS v0.1.0");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    let result = parse_args().and_then(|options| run(&options));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("   ✗ FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}
