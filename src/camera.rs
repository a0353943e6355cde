use bevy::prelude::*;
use bevy_pancam::{PanCam, PanCamPlugin};

use crate::{
    life::{to_color, BoardLayout},
    state::GameState,
};

pub struct CamPlugin;

impl Plugin for CamPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PanCamPlugin)
            .add_systems(OnEnter(GameState::Load), (apply_background, spawn_cam));
    }
}

// Init
fn apply_background(mut commands: Commands, layout: Res<BoardLayout>) {
    commands.insert_resource(ClearColor(to_color(layout.background)));
}

fn spawn_cam(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        PanCam {
            // the left button seeds circles, pan with the others
            grab_buttons: vec![MouseButton::Right, MouseButton::Middle],
            ..default()
        },
        OrthographicProjection {
            scaling_mode: bevy::render::camera::ScalingMode::WindowSize,
            scale: 1.0,
            near: -1000.0,
            far: 1000.0,
            ..OrthographicProjection::default_2d()
        },
        Msaa::Off,
    ));
}
