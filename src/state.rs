use bevy::prelude::*;

#[derive(States, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    /// Building the cell entities.
    #[default]
    Load,
    /// No ticks; the board can be reseeded or cleared from the keyboard.
    Paused,
    /// The fixed-timestep tick advances one generation at a time.
    Running,
}
