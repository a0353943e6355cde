use bevy::{
    log::{debug, info},
    math::IVec2,
    prelude::Resource,
    utils::HashMap,
};
use thiserror::Error;

use crate::{
    board::{Board, Cell, CircleSpawn, ColorPatch},
    color::ColorPolicy,
    config::LifeConfig,
    history::HistoryTracker,
    mutation::test_rate,
    step::{GenerationStats, StepEngine},
};

/// Stasis percentage at which the board counts as settled.
pub const STASIS_SATURATION: f64 = 99.8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("no structure named \"{0}\" has been loaded")]
    UnknownStructure(String),
}

/// A boolean pattern indexed `[x][y]`.
pub type Structure = Vec<Vec<bool>>;

#[derive(Resource)]
pub struct Simulation {
    engine: StepEngine,
    spawn_rate: f64,
    board: Board,
    history: HistoryTracker,
    rng: fastrand::Rng,
    generation: u64,
    last_step: Option<GenerationStats>,
    structures: HashMap<String, Structure>,
}

impl Simulation {
    /// Builds a simulation from `config` and seeds the board.
    pub fn new(config: &LifeConfig) -> Self {
        let (columns, rows) = config.grid_size();
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut sim = Self {
            engine: config.engine(),
            spawn_rate: config.spawn_rate,
            board: Board::new(columns, rows),
            history: HistoryTracker::new(config.history_limit, config.history_save_board),
            rng,
            generation: 0,
            last_step: None,
            structures: HashMap::default(),
        };
        sim.init();
        sim
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn palette(&self) -> &ColorPolicy {
        &self.engine.palette
    }

    /// Statistics of the latest generation, without a board snapshot.
    pub fn last_step(&self) -> Option<&GenerationStats> {
        self.last_step.as_ref()
    }

    /// Randomizes every cell by the spawn rate and forgets all history.
    pub fn init(&mut self) {
        self.generation = 0;
        self.last_step = None;
        self.history.clear();
        let (rate, palette, rng) = (self.spawn_rate, &self.engine.palette, &mut self.rng);
        self.board = Board::from_fn(self.board.columns(), self.board.rows(), |_| {
            let alive = test_rate(rate, rng);
            Cell {
                alive,
                color: palette.cell_color(alive, rng),
                decay: if alive { 0.0 } else { 1.0 },
            }
        });
        info!(
            "seeded {}x{} board with {} live cells",
            self.board.columns(),
            self.board.rows(),
            self.board.alive_count()
        );
    }

    /// Kills every cell and gives it a default color.
    pub fn clear(&mut self) {
        let (palette, rng) = (&self.engine.palette, &mut self.rng);
        self.board = Board::from_fn(self.board.columns(), self.board.rows(), |_| Cell {
            alive: false,
            color: palette.concrete(&palette.default_color, rng),
            decay: 1.0,
        });
    }

    /// Advances one generation and records its statistics.
    pub fn step(&mut self) -> &GenerationStats {
        let (next, mut stats) = self.engine.step(&self.board, &mut self.rng);
        let previous = std::mem::replace(&mut self.board, next);
        self.generation += 1;
        stats.generation = self.generation;
        if self.history.saves_boards() {
            stats.board = Some(previous);
        }
        debug!(
            "generation {}: {} alive, {} new, {} dead, {} stasis",
            stats.generation, stats.alive, stats.new, stats.dead, stats.stasis
        );
        let board = stats.board.take();
        let summary = stats.clone();
        stats.board = board;
        self.history.record(stats);
        self.last_step.insert(summary)
    }

    pub fn spawn_circle(&mut self, spawn: &CircleSpawn, overwrite: bool) {
        self.board.spawn_circle(
            spawn,
            overwrite,
            self.spawn_rate,
            &self.engine.palette,
            &mut self.rng,
        );
    }

    pub fn load_structure(&mut self, name: impl Into<String>, pattern: Structure) {
        self.structures.insert(name.into(), pattern);
    }

    /// Stamps a loaded structure with its `[0][0]` at `origin`.
    pub fn spawn_structure(&mut self, name: &str, origin: IVec2) -> Result<(), SimError> {
        let pattern = self
            .structures
            .get(name)
            .ok_or_else(|| SimError::UnknownStructure(name.to_string()))?;
        self.board.stamp(pattern, origin);
        Ok(())
    }

    pub fn cell(&self, pos: IVec2) -> Option<&Cell> {
        self.board.get(pos)
    }

    pub fn set_color(&mut self, pos: IVec2, patch: ColorPatch) -> bool {
        self.board.set_color(pos, patch)
    }

    pub fn spawn(&mut self, pos: IVec2) -> bool {
        self.board.spawn(pos)
    }

    pub fn kill(&mut self, pos: IVec2) -> bool {
        self.board.kill(pos)
    }

    /// True when the last generation was at least [`STASIS_SATURATION`]
    /// percent stasis, or exactly as still as the mean of the last `window`.
    /// The window never exceeds the history limit.
    pub fn is_saturated(&self, window: usize) -> bool {
        let window = window.min(self.history.limit());
        let Some(last) = self.last_step.as_ref() else {
            return false;
        };
        if last.percent.stasis >= STASIS_SATURATION {
            return true;
        }
        let recent: Vec<f64> = self
            .history
            .recent(window)
            .map(|stats| stats.percent.stasis)
            .collect();
        if recent.len() < window || window == 0 {
            return false;
        }
        let mean = recent.iter().sum::<f64>() / window as f64;
        last.percent.stasis == mean
    }

    /// Random integer in `[min, max]`, for hosts that need to place things.
    pub fn random_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.i32(min..=max)
    }
}

#[cfg(test)]
mod test {
    use bevy::math::ivec2;

    use super::*;
    use crate::color::{ColorChannelSpec, ColorSpec, Rgb};

    fn config() -> LifeConfig {
        LifeConfig {
            canvas_width: 200.0,
            canvas_height: 100.0,
            cell_size: 10.0,
            zoom: 1.0,
            seed: Some(1234),
            ..Default::default()
        }
    }

    #[test]
    fn init_respects_spawn_rate() {
        let sim = Simulation::new(&LifeConfig {
            spawn_rate: 1.0,
            ..config()
        });
        assert_eq!((sim.board().columns(), sim.board().rows()), (20, 10));
        assert_eq!(sim.board().alive_count(), 200);
        assert!(sim.board().iter().all(|(_, c)| c.color == Rgb::BLACK));

        let sim = Simulation::new(&LifeConfig {
            spawn_rate: 0.0,
            ..config()
        });
        assert_eq!(sim.board().alive_count(), 0);
    }

    #[test]
    fn seeded_runs_repeat() {
        let cfg = LifeConfig {
            enable_random_color: true,
            enable_birth_mutation: true,
            enable_self_mutation: true,
            ..config()
        };
        let mut a = Simulation::new(&cfg);
        let mut b = Simulation::new(&cfg);
        for _ in 0..10 {
            a.step();
            b.step();
        }
        assert_eq!(a.board(), b.board());
    }

    #[test]
    fn step_records_history() {
        let mut sim = Simulation::new(&LifeConfig {
            history_limit: 3,
            ..config()
        });
        for _ in 0..5 {
            let stats = sim.step();
            assert_eq!(stats.total, 200);
            assert_eq!(stats.new + stats.dead + stats.stasis, stats.total);
            assert!(stats.board.is_none());
        }
        assert_eq!(sim.generation(), 5);
        assert_eq!(sim.history().len(), 3);
        let generations: Vec<u64> = sim.history().iter().map(|s| s.generation).collect();
        assert_eq!(generations, vec![3, 4, 5]);

        sim.init();
        assert_eq!(sim.generation(), 0);
        assert!(sim.last_step().is_none());
    }

    #[test]
    fn saved_boards_are_pre_transition() {
        let mut sim = Simulation::new(&LifeConfig {
            history_save_board: true,
            ..config()
        });
        let before = sim.board().clone();
        sim.step();
        assert_eq!(sim.history().latest().unwrap().board.as_ref(), Some(&before));
        assert!(sim.last_step().unwrap().board.is_none());
        assert_eq!(sim.last_step().unwrap().alive, before.alive_count());
    }

    #[test]
    fn structures() {
        let mut sim = Simulation::new(&config());
        sim.clear();
        assert_eq!(sim.board().alive_count(), 0);

        sim.load_structure("blinker", vec![vec![true, true, true]]);
        sim.spawn_structure("blinker", ivec2(5, 5)).unwrap();
        assert!(sim.cell(ivec2(5, 6)).unwrap().alive);
        assert_eq!(sim.board().alive_count(), 3);
        assert_eq!(
            sim.spawn_structure("glider", ivec2(0, 0)),
            Err(SimError::UnknownStructure("glider".into()))
        );

        sim.step();
        assert_eq!(sim.board().alive_count(), 3);
        assert!(sim.cell(ivec2(4, 6)).unwrap().alive);
    }

    #[test]
    fn spawn_circle_uses_global_rate() {
        let mut sim = Simulation::new(&LifeConfig {
            spawn_rate: 1.0,
            ..config()
        });
        sim.clear();
        let spawn = CircleSpawn {
            color: Some(ColorSpec::uniform(ColorChannelSpec::Fixed(200))),
            ..CircleSpawn::new(ivec2(10, 5), 2)
        };
        sim.spawn_circle(&spawn, false);
        assert_eq!(sim.board().alive_count(), 13);
        assert_eq!(sim.cell(ivec2(10, 7)).unwrap().color, Rgb::new(200, 200, 200));
    }

    #[test]
    fn settled_board_is_saturated() {
        let mut sim = Simulation::new(&config());
        assert!(!sim.is_saturated(5));
        sim.clear();
        sim.step();
        assert!(sim.is_saturated(5));
    }

    #[test]
    fn saturation_window_is_capped_by_history() {
        let mut sim = Simulation::new(&LifeConfig {
            history_limit: 2,
            ..config()
        });
        sim.clear();
        sim.load_structure("blinker", vec![vec![true, true, true]]);
        sim.spawn_structure("blinker", ivec2(5, 5)).unwrap();

        sim.step();
        assert!(!sim.is_saturated(5));
        sim.step();
        assert_eq!(sim.last_step().unwrap().percent.stasis, 98.0);
        assert!(sim.is_saturated(5));
    }
}
