use std::path::PathBuf;

use bevy::{
    diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin},
    prelude::*,
    window::WindowResolution,
};
use chroma_life::{camera::CamPlugin, config::LifeConfig, life::LifePlugin, state::GameState};
use clap::Parser;

/// Colorized Game of Life with color genetics.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file with simulation options
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Random seed, overrides the config file
    #[arg(long)]
    seed: Option<u64>,
    /// Start paused (Enter toggles, R reseeds, C clears)
    #[arg(long)]
    paused: bool,
    /// Print frame-time diagnostics
    #[arg(long)]
    diagnostics: bool,
}

fn main() -> AppExit {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => match LifeConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                return AppExit::error();
            }
        },
        None => LifeConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.paused |= args.paused;

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(ImagePlugin::default_nearest())
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "chroma-life".into(),
                    resizable: true,
                    focused: true,
                    present_mode: bevy::window::PresentMode::AutoNoVsync,
                    mode: bevy::window::WindowMode::Windowed,
                    resolution: WindowResolution::new(config.canvas_width, config.canvas_height),
                    ..default()
                }),
                ..default()
            }),
    )
    .add_plugins(MeshPickingPlugin);
    if args.diagnostics {
        app.add_plugins((FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin::default()));
    }
    app.insert_resource(config)
        .init_state::<GameState>()
        .add_plugins((CamPlugin, LifePlugin))
        .run()
}
