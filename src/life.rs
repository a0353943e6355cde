#![allow(clippy::type_complexity)]

use std::time::Duration;

use bevy::{
    ecs::system::SystemState,
    input::common_conditions::input_just_pressed,
    math::{ivec2, vec2},
    prelude::*,
    utils::HashMap,
    window::PrimaryWindow,
};

use crate::{
    board::{Cell as CellState, CircleSpawn},
    color::{ColorChannelSpec, ColorSpec, Rgb},
    config::LifeConfig,
    prelude::*,
    state::GameState,
};

pub struct LifePlugin;

impl Plugin for LifePlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<LifeConfig>()
            .cloned()
            .unwrap_or_default();
        let (columns, rows) = config.grid_size();
        info!(
            "{columns}x{rows} board, one generation every {}ms, seed {:?}",
            config.speed_ms, config.seed
        );

        app.insert_resource(Simulation::new(&config))
            .insert_resource(BoardLayout::new(&config))
            .insert_resource(Time::<Fixed>::from_duration(Duration::from_millis(
                config.speed_ms.max(1),
            )))
            .insert_resource(config)
            .add_systems(
                OnEnter(GameState::Load),
                (load_meshes_and_materials, load_cell_board).chain(),
            )
            .add_systems(
                FixedUpdate,
                (advance_generation, reseed_on_stasis)
                    .chain()
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(
                Update,
                (
                    handle_paused_kbd.run_if(in_state(GameState::Paused)),
                    (paint_cells, update_title).run_if(
                        resource_changed::<Simulation>.or(state_changed::<GameState>),
                    ),
                    toggle_paused_and_running.run_if(
                        input_just_pressed(KeyCode::Enter)
                            .and(in_state(GameState::Running).or(in_state(GameState::Paused))),
                    ),
                ),
            );
    }
}

// ——> SYSTEMS

/// initialize meshes and materials in a resource
fn load_meshes_and_materials(
    world: &mut World,
    params: &mut SystemState<(
        ResMut<Assets<Mesh>>,
        ResMut<Assets<ColorMaterial>>,
        Res<BoardLayout>,
    )>,
) {
    let (mut meshes, mut materials, layout) = params.get_mut(world);
    let cell_mesh = meshes.add(Rectangle::from_size(layout.cell_size));
    let border_vert_mesh = meshes.add(Rectangle::new(
        BORDER_WIDTH_PX,
        layout.pixel_size().y + 2.0 * BORDER_WIDTH_PX,
    ));
    let border_horiz_mesh = meshes.add(Rectangle::new(
        layout.pixel_size().x + 2.0 * BORDER_WIDTH_PX,
        BORDER_WIDTH_PX,
    ));
    let border_mat = materials.add(ColorMaterial::from_color(BORDER_COLOR));

    let meshes = HashMap::from([
        ("cell", cell_mesh),
        ("border_vert", border_vert_mesh),
        ("border_horiz", border_horiz_mesh),
    ]);
    world.insert_resource(MeshAndMats {
        meshes,
        border: border_mat,
    });
}

/// spawn one entity per board cell, each with its own material
fn load_cell_board(
    mut commands: Commands,
    meshes_and_mats: Res<MeshAndMats>,
    layout: Res<BoardLayout>,
    config: Res<LifeConfig>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(cell_mesh) = meshes_and_mats.meshes.get("cell").cloned() else {
        error!("cell mesh missing, board not spawned");
        return;
    };
    let background = to_color(layout.background);

    let cells_to_spawn = (0..layout.rows as i32)
        .flat_map(|y| (0..layout.columns as i32).map(move |x| ivec2(x, y)))
        .map(|cell_coord| {
            (
                Cell,
                CellCoord(cell_coord),
                Mesh2d(cell_mesh.clone()),
                MeshMaterial2d(materials.add(ColorMaterial::from_color(background))),
                Transform::from_translation(layout.cell_coord_to_translation(cell_coord))
                    .with_scale(layout.cell_scale.extend(1.0)),
            )
        })
        .collect::<Vec<_>>();
    commands.spawn_batch(cells_to_spawn);

    // clicking or dragging over a cell seeds a circle around it
    commands.add_observer(spawn_circle_on::<Pointer<Down>>());
    commands.add_observer(spawn_circle_on::<Pointer<DragOver>>());

    // create borders, left, top, right, bottom
    let half = layout.pixel_size() * 0.5 + Vec2::splat(BORDER_WIDTH_PX * 0.5);
    for (mesh, offset) in [
        ("border_vert", vec2(-half.x, 0.0)),
        ("border_horiz", vec2(0.0, half.y)),
        ("border_vert", vec2(half.x, 0.0)),
        ("border_horiz", vec2(0.0, -half.y)),
    ] {
        let Some(mesh) = meshes_and_mats.meshes.get(mesh).cloned() else {
            continue;
        };
        commands.spawn((
            Border,
            Mesh2d(mesh),
            MeshMaterial2d(meshes_and_mats.border.clone()),
            Transform::from_translation((layout.center + offset).extend(0.0)),
        ));
    }

    next_state.set(if config.paused {
        GameState::Paused
    } else {
        GameState::Running
    });
}

/// Returns an observer that seeds a circle of random radius around the cell
/// the event targets. Alive cells inside the circle are kept.
fn spawn_circle_on<E: Event>(
) -> impl Fn(Trigger<E>, Query<&CellCoord, With<Cell>>, ResMut<Simulation>) {
    move |trigger, query, mut sim| {
        if let Ok(coord) = query.get(trigger.entity()) {
            let radius = sim.random_i32(CLICK_RADIUS.0, CLICK_RADIUS.1) as u32;
            sim.spawn_circle(&CircleSpawn::new(**coord, radius), false);
        }
    }
}

fn advance_generation(mut sim: ResMut<Simulation>) {
    sim.step();
}

/// Scatters a few full-range colored circles once the board has settled.
fn reseed_on_stasis(mut sim: ResMut<Simulation>, config: Res<LifeConfig>) {
    if !config.reseed_on_stasis || !sim.is_saturated(STASIS_WINDOW) {
        return;
    }
    let (columns, rows) = (sim.board().columns() as i32, sim.board().rows() as i32);
    let radius = RESEED_RADIUS as i32;
    info!(
        "board settled at generation {}, reseeding",
        sim.generation()
    );
    for _ in 0..RESEED_CIRCLES {
        let center = ivec2(
            sim.random_i32(radius, columns - radius),
            sim.random_i32(radius, rows - radius),
        );
        let spawn = CircleSpawn {
            color: Some(ColorSpec::uniform(ColorChannelSpec::range(0, 255))),
            ..CircleSpawn::new(center, RESEED_RADIUS)
        };
        sim.spawn_circle(&spawn, false);
    }
}

fn handle_paused_kbd(mut sim: ResMut<Simulation>, keyboard_input: Res<ButtonInput<KeyCode>>) {
    if keyboard_input.just_pressed(KeyCode::KeyR) {
        sim.init();
    }
    if keyboard_input.just_pressed(KeyCode::KeyC) {
        info!("clearing board");
        sim.clear();
    }
}

fn toggle_paused_and_running(
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    match state.get() {
        GameState::Paused => next_state.set(GameState::Running),
        GameState::Running => next_state.set(GameState::Paused),
        _ => unreachable!(),
    }
}

fn paint_cells(
    sim: Res<Simulation>,
    layout: Res<BoardLayout>,
    cell_query: Query<(&CellCoord, &MeshMaterial2d<ColorMaterial>), With<Cell>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    for (coord, material) in cell_query.iter() {
        let (Some(cell), Some(material)) = (sim.cell(**coord), materials.get_mut(&material.0))
        else {
            continue;
        };
        material.color = to_color(layout.shade(cell));
    }
}

fn update_title(sim: Res<Simulation>, mut windows: Query<&mut Window, With<PrimaryWindow>>) {
    let (Some(stats), Ok(mut window)) = (sim.last_step(), windows.get_single_mut()) else {
        return;
    };
    window.title = format!(
        "gen: {}  Alive: {} ({:.2}%)  Dead: {} ({:.2}%)",
        abbreviate(sim.generation()),
        abbreviate(stats.alive as u64),
        stats.percent.alive,
        abbreviate(stats.vacant as u64),
        stats.percent.vacant,
    );
}

/// Short form for large counts: 1234 -> "1.2k", 5600000 -> "5.6m".
fn abbreviate(value: u64) -> String {
    const SUFFIXES: [&str; 5] = ["", "k", "m", "b", "t"];
    let mut scaled = value as f64;
    let mut suffix = 0;
    while scaled >= 1000.0 && suffix < SUFFIXES.len() - 1 {
        scaled /= 1000.0;
        suffix += 1;
    }
    if suffix == 0 {
        value.to_string()
    } else if scaled.fract() == 0.0 {
        format!("{scaled}{}", SUFFIXES[suffix])
    } else {
        format!("{scaled:.1}{}", SUFFIXES[suffix])
    }
}

#[inline]
pub fn to_color(color: Rgb) -> Color {
    Color::srgb_u8(color.red, color.green, color.blue)
}

// ——> COMPONENTS

#[derive(Component)]
#[require(CellCoord, Mesh2d)]
struct Cell;

/// Position of the cell on the simulation board.
#[derive(Component, Debug, Default, Clone, Copy, Deref, DerefMut)]
struct CellCoord(IVec2);

#[derive(Component)]
#[require(Mesh2d)]
struct Border;

// ——> RESOURCES

/// hold handles for shared meshes and the border material
#[derive(Resource, Clone)]
struct MeshAndMats {
    meshes: HashMap<&'static str, Handle<Mesh>>,
    border: Handle<ColorMaterial>,
}

/// Where and how the board is drawn.
#[derive(Resource, Clone, Copy, Debug)]
pub struct BoardLayout {
    /// the center of the board
    pub center: Vec2,
    /// the amount of cells on each axis
    pub columns: u32,
    pub rows: u32,
    /// the size of each individual cell
    pub cell_size: Vec2,
    /// scale of each individual cell (should be 0.0 - 1.0)
    pub cell_scale: Vec2,
    pub background: Rgb,
    /// dead cells fade out by their decay
    pub fade: bool,
}

impl BoardLayout {
    pub fn new(config: &LifeConfig) -> Self {
        let (columns, rows) = config.grid_size();
        let mut rng = fastrand::Rng::new();
        let background = crate::color::sample_color(
            &config.background_color,
            &ColorSpec::from(Rgb::BLACK),
            &mut rng,
        )
        .to_rgb()
        .unwrap_or(Rgb::BLACK);
        Self {
            center: Vec2::ZERO,
            columns,
            rows,
            cell_size: Vec2::splat(config.cell_px()),
            cell_scale: Vec2::splat(if config.grid { GRID_CELL_SCALE } else { 1.0 }),
            background,
            fade: config.enable_decay,
        }
    }

    /// computes full size of the board in pixels
    #[inline]
    pub fn pixel_size(&self) -> Vec2 {
        vec2(
            self.columns as f32 * self.cell_size.x,
            self.rows as f32 * self.cell_size.y,
        )
    }

    /// Row 0 is drawn at the top.
    #[inline]
    pub fn cell_coord_to_translation(&self, cell_coord: IVec2) -> Vec3 {
        let top_left = self.center + self.pixel_size() * vec2(-0.5, 0.5);
        (top_left
            + cell_coord.as_vec2() * self.cell_size * vec2(1.0, -1.0)
            + self.cell_size * vec2(0.5, -0.5))
        .extend(10.0)
    }

    /// Color a cell is painted with: its own when alive, blended toward the
    /// background by its decay when fading, the background otherwise.
    pub fn shade(&self, cell: &CellState) -> Rgb {
        if cell.alive {
            return cell.color;
        }
        if !self.fade || cell.decay >= 1.0 {
            return self.background;
        }
        let t = cell.decay.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (fg as f32 * (1.0 - t) + bg as f32 * t).round() as u8;
        Rgb::new(
            mix(cell.color.red, self.background.red),
            mix(cell.color.green, self.background.green),
            mix(cell.color.blue, self.background.blue),
        )
    }
}
