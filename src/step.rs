use crate::{
    board::{Board, Cell},
    color::{ColorPolicy, Rgb},
    mutation::MutationConfig,
};

/// How a cell is classified for one generation. First match wins, in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Alive with fewer than two neighbours.
    Loneliness,
    /// Alive with more than three neighbours.
    Overpopulation,
    /// Dead with exactly three neighbours.
    Birth,
    /// Aliveness unchanged.
    Stasis,
}

impl Transition {
    #[inline]
    pub fn classify(alive: bool, neighbours: usize) -> Self {
        match (alive, neighbours) {
            (true, n) if n < 2 => Transition::Loneliness,
            (true, n) if n > 3 => Transition::Overpopulation,
            (false, 3) => Transition::Birth,
            _ => Transition::Stasis,
        }
    }
}

/// Fading of dead cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRules {
    /// Added to `decay` every generation a cell spends dead, capped at 1.
    pub speed: f32,
}

/// Everything that shapes a transition. Disabled features are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEngine {
    pub merge_color: bool,
    pub palette: ColorPolicy,
    pub birth_mutation: Option<MutationConfig>,
    pub self_mutation: Option<MutationConfig>,
    pub decay: Option<DecayRules>,
    pub decay_mutation: Option<MutationConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentages {
    pub new: f64,
    pub dead: f64,
    pub stasis: f64,
    pub alive: f64,
    pub vacant: f64,
}

/// Counts for one generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationStats {
    /// Number of the generation these counts produced, starting at 1.
    pub generation: u64,
    /// Births.
    pub new: usize,
    /// Deaths.
    pub dead: usize,
    /// Cells whose aliveness did not change, alive or dead.
    pub stasis: usize,
    /// Cells alive before the transition.
    pub alive: usize,
    /// Cells dead before the transition, `total - alive`.
    pub vacant: usize,
    /// `new + dead + stasis`, one per cell.
    pub total: usize,
    pub percent: Percentages,
    /// The board before the transition, when history keeps boards.
    pub board: Option<Board>,
}

impl GenerationStats {
    fn from_counts(new: usize, dead: usize, stasis: usize, alive: usize) -> Self {
        let total = new + dead + stasis;
        let vacant = total.saturating_sub(alive);
        // a board without cells reports zeros rather than NaN
        let percent = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            }
        };
        Self {
            generation: 0,
            new,
            dead,
            stasis,
            alive,
            vacant,
            total,
            percent: Percentages {
                new: percent(new),
                dead: percent(dead),
                stasis: percent(stasis),
                alive: percent(alive),
                vacant: percent(vacant),
            },
            board: None,
        }
    }
}

impl StepEngine {
    /// Plain Conway: no merging, no mutation, no decay, black cells.
    pub fn classic() -> Self {
        Self {
            merge_color: false,
            palette: ColorPolicy {
                random_color: None,
                default_color: Rgb::BLACK.into(),
            },
            birth_mutation: None,
            self_mutation: None,
            decay: None,
            decay_mutation: None,
        }
    }

    /// Computes the next board from `board`. Every decision reads `board`
    /// only; results go to a fresh board.
    pub fn step(&self, board: &Board, rng: &mut fastrand::Rng) -> (Board, GenerationStats) {
        let (mut new, mut dead, mut stasis, mut alive) = (0, 0, 0, 0);
        let mut neighbours = Vec::with_capacity(8);

        let next = Board::from_fn(board.columns(), board.rows(), |pos| {
            // from_fn walks exactly the positions of `board`
            let cell = board.get(pos).copied().unwrap_or(Cell::DEAD);
            neighbours.clear();
            board.neighbours_into(pos, &mut neighbours);

            if cell.alive {
                alive += 1;
            }
            let transition = Transition::classify(cell.alive, neighbours.len());
            match transition {
                Transition::Loneliness | Transition::Overpopulation => dead += 1,
                Transition::Birth => new += 1,
                Transition::Stasis => stasis += 1,
            }
            self.transition(cell, transition, &neighbours, rng)
        });

        (next, GenerationStats::from_counts(new, dead, stasis, alive))
    }

    fn transition(
        &self,
        cell: Cell,
        transition: Transition,
        neighbours: &[Rgb],
        rng: &mut fastrand::Rng,
    ) -> Cell {
        match transition {
            Transition::Birth => {
                let color = match Rgb::merge(neighbours) {
                    Some(merged) if self.merge_color => merged,
                    _ => self.palette.birth_color(rng),
                };
                let color = match &self.birth_mutation {
                    Some(mutation) => mutation.apply(color, rng),
                    None => color,
                };
                Cell::alive(color)
            }
            Transition::Loneliness | Transition::Overpopulation => self.fade(
                Cell {
                    alive: false,
                    ..cell
                },
                rng,
            ),
            Transition::Stasis if cell.alive => match &self.self_mutation {
                Some(mutation) => Cell {
                    color: mutation.apply(cell.color, rng),
                    ..cell
                },
                None => cell,
            },
            Transition::Stasis => self.fade(cell, rng),
        }
    }

    /// Advances decay and decay mutation of a dead cell.
    fn fade(&self, mut cell: Cell, rng: &mut fastrand::Rng) -> Cell {
        if let Some(decay) = &self.decay {
            cell.decay = (cell.decay + decay.speed).min(1.0);
        }
        if let Some(mutation) = &self.decay_mutation {
            cell.color = mutation.apply(cell.color, rng);
        }
        cell
    }
}

#[cfg(test)]
mod test {
    use bevy::math::{ivec2, IVec2};

    use super::*;
    use crate::{color::ColorSpec, mutation::ChannelMutation};

    fn board_with(columns: u32, rows: u32, alive: &[(i32, i32)]) -> Board {
        let mut board = Board::new(columns, rows);
        for (x, y) in alive {
            board.spawn(ivec2(*x, *y));
        }
        board
    }

    fn alive_positions(board: &Board) -> Vec<IVec2> {
        board
            .iter()
            .filter(|(_, cell)| cell.alive)
            .map(|(pos, _)| pos)
            .collect()
    }

    #[test]
    fn classification_priority() {
        assert_eq!(Transition::classify(true, 0), Transition::Loneliness);
        assert_eq!(Transition::classify(true, 1), Transition::Loneliness);
        assert_eq!(Transition::classify(true, 2), Transition::Stasis);
        assert_eq!(Transition::classify(true, 3), Transition::Stasis);
        assert_eq!(Transition::classify(true, 4), Transition::Overpopulation);
        assert_eq!(Transition::classify(false, 3), Transition::Birth);
        assert_eq!(Transition::classify(false, 2), Transition::Stasis);
        assert_eq!(Transition::classify(false, 8), Transition::Stasis);
    }

    #[test]
    fn glider_translates_after_four_generations() {
        let engine = StepEngine::classic();
        let mut rng = fastrand::Rng::with_seed(1);
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
        let mut board = board_with(20, 20, &glider);

        for _ in 0..4 {
            let (next, stats) = engine.step(&board, &mut rng);
            assert_eq!(stats.total, 400);
            assert_eq!(stats.new + stats.dead + stats.stasis, stats.total);
            board = next;
        }

        let expected = board_with(20, 20, &glider.map(|(x, y)| (x + 1, y + 1)));
        assert_eq!(alive_positions(&board), alive_positions(&expected));
    }

    #[test]
    fn blinker_stats() {
        let engine = StepEngine::classic();
        let mut rng = fastrand::Rng::with_seed(1);
        let board = board_with(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let (next, stats) = engine.step(&board, &mut rng);

        assert_eq!(
            alive_positions(&next),
            vec![ivec2(2, 1), ivec2(2, 2), ivec2(2, 3)]
        );
        assert_eq!((stats.new, stats.dead, stats.stasis), (2, 2, 21));
        assert_eq!(stats.alive, 3);
        assert_eq!(stats.vacant, 22);
        assert_eq!(stats.percent.alive, 12.0);
        assert_eq!(stats.percent.new, 8.0);
    }

    #[test]
    fn all_dead_board_stays_dead() {
        let engine = StepEngine::classic();
        let mut rng = fastrand::Rng::with_seed(1);
        let mut board = Board::new(12, 7);
        for _ in 0..10 {
            let (next, stats) = engine.step(&board, &mut rng);
            assert_eq!(stats.new, 0);
            assert_eq!(stats.stasis, 84);
            assert_eq!(stats.percent.stasis, 100.0);
            board = next;
        }
        assert_eq!(board.alive_count(), 0);
    }

    #[test]
    fn empty_board_reports_zeros() {
        let engine = StepEngine::classic();
        let mut rng = fastrand::Rng::with_seed(1);
        let (next, stats) = engine.step(&Board::new(0, 9), &mut rng);
        assert!(next.is_empty());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percent, Percentages::default());
    }

    #[test]
    fn birth_merges_neighbour_colors() {
        let mut engine = StepEngine::classic();
        engine.merge_color = true;
        let mut rng = fastrand::Rng::with_seed(1);

        let mut board = Board::new(5, 5);
        for (x, color) in [
            (0, Rgb::new(10, 20, 30)),
            (1, Rgb::new(20, 30, 40)),
            (2, Rgb::new(30, 40, 50)),
        ] {
            *board.get_mut(ivec2(x, 0)).unwrap() = Cell::alive(color);
        }

        let (next, _) = engine.step(&board, &mut rng);
        let born = next.get(ivec2(1, 1)).unwrap();
        assert!(born.alive);
        assert_eq!(born.color, Rgb::new(20, 30, 40));
        assert_eq!(born.decay, 0.0);
    }

    #[test]
    fn birth_without_merge_uses_palette_and_mutation() {
        let mut engine = StepEngine::classic();
        engine.palette.default_color = ColorSpec::from(Rgb::new(100, 100, 100));
        engine.birth_mutation = Some(MutationConfig::uniform(ChannelMutation {
            rate: 1.0,
            min: 200,
            max: 200,
        }));
        let mut rng = fastrand::Rng::with_seed(1);
        let board = board_with(5, 5, &[(0, 0), (1, 0), (2, 0)]);

        let (next, _) = engine.step(&board, &mut rng);
        assert_eq!(
            next.get(ivec2(1, 1)).unwrap().color,
            Rgb::new(255, 255, 255)
        );
    }

    #[test]
    fn self_mutation_only_touches_surviving_cells() {
        let mut engine = StepEngine::classic();
        engine.self_mutation = Some(MutationConfig::uniform(ChannelMutation {
            rate: 1.0,
            min: 7,
            max: 7,
        }));
        let mut rng = fastrand::Rng::with_seed(1);
        // block: every cell survives with three neighbours
        let board = board_with(4, 4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);

        let (next, stats) = engine.step(&board, &mut rng);
        assert_eq!(stats.stasis, 16);
        assert_eq!(next.get(ivec2(1, 1)).unwrap().color, Rgb::new(7, 7, 7));
        assert_eq!(next.get(ivec2(0, 0)).unwrap().color, Rgb::BLACK);
    }

    #[test]
    fn decay_fades_dead_cells() {
        let mut engine = StepEngine::classic();
        engine.decay = Some(DecayRules { speed: 0.25 });
        engine.decay_mutation = Some(MutationConfig::uniform(ChannelMutation {
            rate: 1.0,
            min: 3,
            max: 3,
        }));
        let mut rng = fastrand::Rng::with_seed(1);

        let mut board = board_with(3, 3, &[(1, 1)]);
        let (next, stats) = engine.step(&board, &mut rng);
        assert_eq!(stats.dead, 1);
        let died = next.get(ivec2(1, 1)).unwrap();
        assert!(!died.alive);
        assert_eq!(died.decay, 0.25);
        assert_eq!(died.color, Rgb::new(3, 3, 3));

        board = next;
        for _ in 0..5 {
            board = engine.step(&board, &mut rng).0;
        }
        assert_eq!(board.get(ivec2(1, 1)).unwrap().decay, 1.0);
    }

    #[test]
    fn surviving_cells_keep_their_decay() {
        let mut engine = StepEngine::classic();
        engine.decay = Some(DecayRules { speed: 0.25 });
        let mut rng = fastrand::Rng::with_seed(1);
        let mut board = board_with(4, 4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
        board.get_mut(ivec2(2, 2)).unwrap().decay = 0.4;

        let (next, _) = engine.step(&board, &mut rng);
        let kept = next.get(ivec2(2, 2)).unwrap();
        assert!(kept.alive);
        assert_eq!(kept.decay, 0.4);
        assert_eq!(
            next.get(ivec2(1, 1)).unwrap().decay,
            board.get(ivec2(1, 1)).unwrap().decay
        );
    }

    #[test]
    fn decay_stands_still_when_fading_is_off() {
        let mut engine = StepEngine::classic();
        engine.decay_mutation = Some(MutationConfig::uniform(ChannelMutation {
            rate: 1.0,
            min: 5,
            max: 5,
        }));
        let mut rng = fastrand::Rng::with_seed(1);
        let mut board = Board::new(3, 3);
        board.get_mut(ivec2(0, 0)).unwrap().decay = 0.3;

        let (next, stats) = engine.step(&board, &mut rng);
        assert_eq!(stats.stasis, 9);
        let cell = next.get(ivec2(0, 0)).unwrap();
        assert!(!cell.alive);
        assert_eq!(cell.decay, 0.3);
        assert_eq!(cell.color, Rgb::new(5, 5, 5));
    }
}
