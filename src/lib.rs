pub mod board;
pub mod camera;
pub mod color;
pub mod config;
pub mod history;
pub mod life;
pub mod mutation;
pub mod sim;
pub mod state;
pub mod step;

pub mod prelude {
    use bevy::color::Color;

    pub use crate::{
        board::{Board, Cell, CircleSpawn, ColorPatch},
        color::{ColorChannelSpec, ColorSpec, Rgb},
        config::LifeConfig,
        mutation::MutationConfig,
        sim::Simulation,
        step::GenerationStats,
    };

    pub const BORDER_WIDTH_PX: f32 = 8.0;
    pub const BORDER_COLOR: Color = Color::srgb(1.0, 1.0, 1.0);

    /// Cell scale when the grid is drawn, leaving a thin gap between cells.
    pub const GRID_CELL_SCALE: f32 = 0.9;

    /// Radius range of circles spawned by clicking a cell.
    pub const CLICK_RADIUS: (i32, i32) = (5, 30);

    /// Generations averaged when checking for a settled board.
    pub const STASIS_WINDOW: usize = 5;
    pub const RESEED_RADIUS: u32 = 5;
    pub const RESEED_CIRCLES: usize = 5;
}
