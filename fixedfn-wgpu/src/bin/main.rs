//! fixedfn - Offline Renderer
//!
//! Renders the built-in scene through the engine on a headless wgpu device
//! and writes the final frame to a PNG.
//!
//! # Usage
//!
//! ```bash
//! fixedfn --output frame.png
//! fixedfn --config fixedfn.toml --frames 3 --output out/frame.png
//! fixedfn --width 1280 --height 720 --backend vulkan --movie
//! RUST_LOG=debug fixedfn --write-config fixedfn.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use fixedfn_core::{Engine, EngineConfig};
use fixedfn_wgpu::WgpuSurface;
use fixedfn_wgpu::demo::DemoScene;

#[derive(Parser)]
#[command(name = "fixedfn")]
#[command(author, version, about = "Fixed-function render-state translation engine - offline renderer")]
struct Args {
    /// Engine configuration (TOML); defaults are used if it doesn't exist
    #[arg(long, short = 'c', value_name = "FILE", default_value = "fixedfn.toml")]
    config: PathBuf,

    /// Where to write the captured frame
    #[arg(long, short = 'o', value_name = "FILE", default_value = "fixedfn.png")]
    output: PathBuf,

    /// Number of frames to render before capturing
    #[arg(long, short = 'n', default_value = "1")]
    frames: u32,

    /// Override the configured window width
    #[arg(long)]
    width: Option<u32>,

    /// Override the configured window height
    #[arg(long)]
    height: Option<u32>,

    /// Override the configured graphics backend (auto, vulkan, metal, dx12, opengl)
    #[arg(long)]
    backend: Option<String>,

    /// Stretch the view to the window instead of pillarboxing to 4:3
    #[arg(long)]
    stretch: bool,

    /// Include a decoded YUV movie frame in the scene
    #[arg(long)]
    movie: bool,

    /// Save the effective configuration to this path and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.frames == 0 {
        anyhow::bail!("Frame count must be at least 1");
    }

    let mut config = EngineConfig::load(&args.config)?;
    if let Some(width) = args.width {
        config.video.width = width;
    }
    if let Some(height) = args.height {
        config.video.height = height;
    }
    if let Some(backend) = args.backend {
        config.video.backend = backend;
    }
    if args.stretch {
        config.video.preserve_aspect_ratio = false;
    }

    if let Some(path) = args.write_config {
        config.save(&path)?;
        tracing::info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let surface = WgpuSurface::headless(&config.video).context("Failed to create wgpu surface")?;
    let mut engine = Engine::new(config, surface);
    let scene = DemoScene::new(args.movie);

    for frame in 0..args.frames {
        scene
            .render(&mut engine, frame)
            .with_context(|| format!("Frame {} failed", frame))?;
        let stats = engine.surface().stats();
        tracing::debug!(
            "frame {}: {} draws, {} flushes, {} dropped",
            frame,
            stats.draws,
            stats.flushes,
            stats.dropped
        );
    }

    engine.surface_mut().save_png(&args.output)?;
    engine.shutdown();
    Ok(())
}
