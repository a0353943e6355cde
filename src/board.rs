use bevy::math::{ivec2, IVec2};

use crate::{
    color::{ColorPolicy, ColorSpec, Rgb},
    mutation::test_rate,
};

/// Offsets of the Moore neighbourhood, row by row.
const NEIGHBOUR_OFFSETS: [IVec2; 8] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub alive: bool,
    pub color: Rgb,
    /// 0 is fresh, 1 is fully faded. Only read when decay-fade is on.
    pub decay: f32,
}

impl Cell {
    pub const DEAD: Cell = Cell {
        alive: false,
        color: Rgb::BLACK,
        decay: 1.0,
    };

    pub fn alive(color: Rgb) -> Self {
        Self {
            alive: true,
            color,
            decay: 0.0,
        }
    }
}

/// Channels to overwrite on a cell, leaving the others untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorPatch {
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>,
}

/// A request to (re)seed a disc of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleSpawn {
    pub center: IVec2,
    pub radius: u32,
    /// Aliveness probability, the simulation's spawn rate when `None`.
    pub rate: Option<f64>,
    /// Color for every written cell, a fresh birth color when `None`.
    pub color: Option<ColorSpec>,
}

impl CircleSpawn {
    pub fn new(center: IVec2, radius: u32) -> Self {
        Self {
            center,
            radius,
            rate: None,
            color: None,
        }
    }
}

/// Fixed-size grid of cells. Positions outside `[0, columns) × [0, rows)` do
/// not exist: reads return `None` and writes are skipped, there is no wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Board {
    /// An all-dead board.
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            cells: vec![Cell::DEAD; columns as usize * rows as usize],
        }
    }

    /// A board whose cells are produced by `f` in row-major order.
    pub fn from_fn(columns: u32, rows: u32, mut f: impl FnMut(IVec2) -> Cell) -> Self {
        let cells = (0..rows as i32)
            .flat_map(|y| (0..columns as i32).map(move |x| ivec2(x, y)))
            .map(&mut f)
            .collect();
        Self {
            columns,
            rows,
            cells,
        }
    }

    #[inline]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    fn cell_coord_to_idx(&self, pos: IVec2) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.columns as i32 || pos.y >= self.rows as i32 {
            return None;
        }
        Some(pos.y as usize * self.columns as usize + pos.x as usize)
    }

    #[inline]
    fn idx_to_cell_coord(&self, idx: usize) -> IVec2 {
        ivec2(
            (idx % self.columns as usize) as i32,
            (idx / self.columns as usize) as i32,
        )
    }

    #[inline]
    pub fn get(&self, pos: IVec2) -> Option<&Cell> {
        self.cell_coord_to_idx(pos).map(|idx| &self.cells[idx])
    }

    #[inline]
    pub fn get_mut(&mut self, pos: IVec2) -> Option<&mut Cell> {
        self.cell_coord_to_idx(pos).map(|idx| &mut self.cells[idx])
    }

    /// Every cell with its position, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (self.idx_to_cell_coord(idx), cell))
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.alive).count()
    }

    /// Appends the colors of the alive in-bounds neighbours of `pos` to `out`.
    pub fn neighbours_into(&self, pos: IVec2, out: &mut Vec<Rgb>) {
        out.extend(
            NEIGHBOUR_OFFSETS
                .iter()
                .filter_map(|offset| self.get(pos + *offset))
                .filter(|cell| cell.alive)
                .map(|cell| cell.color),
        );
    }

    /// Colors of the alive in-bounds neighbours of `pos`.
    pub fn neighbours(&self, pos: IVec2) -> Vec<Rgb> {
        let mut out = Vec::with_capacity(8);
        self.neighbours_into(pos, &mut out);
        out
    }

    pub fn count_alive_neighbours(&self, pos: IVec2) -> usize {
        NEIGHBOUR_OFFSETS
            .iter()
            .filter_map(|offset| self.get(pos + *offset))
            .filter(|cell| cell.alive)
            .count()
    }

    /// Overwrites every in-bounds cell within `spawn.radius` of the center.
    /// Alive cells are left alone unless `overwrite` is set.
    pub fn spawn_circle(
        &mut self,
        spawn: &CircleSpawn,
        overwrite: bool,
        default_rate: f64,
        policy: &ColorPolicy,
        rng: &mut fastrand::Rng,
    ) {
        let radius = spawn.radius as i32;
        let rate = spawn.rate.unwrap_or(default_rate);
        for pos in (-radius..=radius)
            .flat_map(|y| (-radius..=radius).map(move |x| ivec2(x, y)))
            .filter(|offset| offset.as_vec2().length() <= spawn.radius as f32)
            .map(|offset| spawn.center + offset)
        {
            let Some(cell) = self.get_mut(pos) else {
                continue;
            };
            if cell.alive && !overwrite {
                continue;
            }
            let alive = test_rate(rate, rng);
            let color = match &spawn.color {
                Some(spec) => policy.concrete(spec, rng),
                None => policy.cell_color(alive, rng),
            };
            *cell = Cell {
                alive,
                color,
                decay: if alive { 0.0 } else { 1.0 },
            };
        }
    }

    /// Writes `pattern[sx][sy]` into the `alive` flag at `origin + (sx, sy)`.
    /// Colors are untouched and cells off the board are skipped.
    pub fn stamp(&mut self, pattern: &[Vec<bool>], origin: IVec2) {
        for (sx, column) in pattern.iter().enumerate() {
            for (sy, alive) in column.iter().enumerate() {
                if let Some(cell) = self.get_mut(origin + ivec2(sx as i32, sy as i32)) {
                    cell.alive = *alive;
                }
            }
        }
    }

    /// Returns `false` when `pos` is off the board.
    pub fn set_color(&mut self, pos: IVec2, patch: ColorPatch) -> bool {
        let Some(cell) = self.get_mut(pos) else {
            return false;
        };
        if let Some(red) = patch.red {
            cell.color.red = red;
        }
        if let Some(green) = patch.green {
            cell.color.green = green;
        }
        if let Some(blue) = patch.blue {
            cell.color.blue = blue;
        }
        true
    }

    pub fn spawn(&mut self, pos: IVec2) -> bool {
        self.set_alive(pos, true)
    }

    pub fn kill(&mut self, pos: IVec2) -> bool {
        self.set_alive(pos, false)
    }

    fn set_alive(&mut self, pos: IVec2, alive: bool) -> bool {
        match self.get_mut(pos) {
            Some(cell) => {
                cell.alive = alive;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorChannelSpec;

    fn board_with(columns: u32, rows: u32, alive: &[(i32, i32, Rgb)]) -> Board {
        let mut board = Board::new(columns, rows);
        for (x, y, color) in alive {
            *board.get_mut(ivec2(*x, *y)).unwrap() = Cell::alive(*color);
        }
        board
    }

    fn policy() -> ColorPolicy {
        ColorPolicy {
            random_color: None,
            default_color: ColorSpec::from(Rgb::new(9, 9, 9)),
        }
    }

    #[test]
    fn board_works() {
        let board = Board::new(8, 4);
        assert_eq!(32, board.len());
        assert_eq!(Some(9), board.cell_coord_to_idx(ivec2(1, 1)));
        assert_eq!(Some(31), board.cell_coord_to_idx(ivec2(7, 3)));
        assert_eq!(None, board.cell_coord_to_idx(ivec2(8, 0)));
        assert_eq!(None, board.cell_coord_to_idx(ivec2(0, -1)));
        assert_eq!(ivec2(7, 3), board.idx_to_cell_coord(31));
        assert!(board.get(ivec2(-1, 2)).is_none());
    }

    #[test]
    fn neighbours_do_not_wrap() {
        let red = Rgb::new(255, 0, 0);
        let board = board_with(4, 4, &[(1, 0, red), (0, 1, red), (3, 3, red), (1, 1, red)]);
        // (3, 3) would be a neighbour of (0, 0) on a torus
        assert_eq!(board.neighbours(ivec2(0, 0)), vec![red, red, red]);
        assert_eq!(board.count_alive_neighbours(ivec2(0, 0)), 3);
        assert_eq!(board.count_alive_neighbours(ivec2(1, 1)), 2);
        assert_eq!(board.count_alive_neighbours(ivec2(3, 0)), 0);
        // the cell itself is not its own neighbour
        assert_eq!(board.count_alive_neighbours(ivec2(3, 3)), 0);
    }

    #[test]
    fn spawn_circle_stays_in_radius_and_bounds() {
        let mut board = Board::new(10, 10);
        let mut rng = fastrand::Rng::with_seed(2);
        let spawn = CircleSpawn {
            rate: Some(1.0),
            ..CircleSpawn::new(ivec2(0, 0), 3)
        };
        board.spawn_circle(&spawn, false, 0.5, &policy(), &mut rng);

        for (pos, cell) in board.iter() {
            let inside = pos.as_vec2().length() <= 3.0;
            assert_eq!(cell.alive, inside, "{pos}");
            if inside {
                assert_eq!(cell.color, Rgb::new(9, 9, 9));
                assert_eq!(cell.decay, 0.0);
            }
        }
    }

    #[test]
    fn spawn_circle_override() {
        let keep = Rgb::new(1, 2, 3);
        let mut board = board_with(5, 5, &[(2, 2, keep)]);
        let mut rng = fastrand::Rng::with_seed(4);
        let spawn = CircleSpawn {
            rate: Some(0.0),
            ..CircleSpawn::new(ivec2(2, 2), 1)
        };

        board.spawn_circle(&spawn, false, 0.5, &policy(), &mut rng);
        assert_eq!(board.get(ivec2(2, 2)).unwrap().color, keep);
        assert!(board.get(ivec2(2, 2)).unwrap().alive);

        board.spawn_circle(&spawn, true, 0.5, &policy(), &mut rng);
        assert_eq!(*board.get(ivec2(2, 2)).unwrap(), Cell::DEAD);
    }

    #[test]
    fn spawn_circle_with_color() {
        let mut board = Board::new(5, 5);
        let mut rng = fastrand::Rng::with_seed(6);
        let spawn = CircleSpawn {
            rate: Some(1.0),
            color: Some(ColorSpec::uniform(ColorChannelSpec::Fixed(77))),
            ..CircleSpawn::new(ivec2(2, 2), 0)
        };
        board.spawn_circle(&spawn, true, 0.5, &policy(), &mut rng);
        assert_eq!(board.alive_count(), 1);
        assert_eq!(board.get(ivec2(2, 2)).unwrap().color, Rgb::new(77, 77, 77));
    }

    #[test]
    fn stamp_and_cell_accessors() {
        let color = Rgb::new(50, 60, 70);
        let mut board = board_with(4, 4, &[(3, 3, color)]);
        board.stamp(&[vec![true, false], vec![true, true]], ivec2(2, 2));
        assert!(board.get(ivec2(2, 2)).unwrap().alive);
        assert!(!board.get(ivec2(2, 3)).unwrap().alive);
        assert_eq!(board.get(ivec2(3, 3)).unwrap().color, color);
        assert_eq!(board.alive_count(), 3);

        assert!(board.kill(ivec2(2, 2)));
        assert!(!board.spawn(ivec2(4, 0)));
        assert!(board.set_color(
            ivec2(3, 3),
            ColorPatch {
                green: Some(0),
                ..Default::default()
            }
        ));
        assert_eq!(board.get(ivec2(3, 3)).unwrap().color, Rgb::new(50, 0, 70));
    }
}
