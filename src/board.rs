use anyhow::{anyhow, Result};
use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::io::{stdout, Write};

use crate::{HEIGHT, WIDTH};

/// Longest opening [`Board::openings`] will enumerate, there are up to 7^length of them
pub const MAX_OPENING_LENGTH: usize = 9;

/// Scan directions as (row step, column step): horizontal, vertical, and both diagonals
pub(crate) const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Contents of a single board cell
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Cell {
    Empty,
    Human,
    Ai,
}

impl Cell {
    /// Parses the wire encoding: 0 = empty, 1 = human, 2 = automated player
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Cell::Empty),
            1 => Some(Cell::Human),
            2 => Some(Cell::Ai),
            _ => None,
        }
    }

    pub fn digit(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Human => 1,
            Cell::Ai => 2,
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// One of the two sides of the game
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Human,
    Ai,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Player::Human => Player::Ai,
            Player::Ai => Player::Human,
        }
    }

    pub fn cell(self) -> Cell {
        match self {
            Player::Human => Cell::Human,
            Player::Ai => Cell::Ai,
        }
    }
}

/// The result of a finished game, decided by who completed more alignments
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
    HumanWin,
    AiWin,
    Tie,
}

impl Outcome {
    pub fn from_score((human, ai): (usize, usize)) -> Self {
        if human > ai {
            Outcome::HumanWin
        } else if ai > human {
            Outcome::AiWin
        } else {
            Outcome::Tie
        }
    }
}

/// A `HEIGHT` x `WIDTH` Connect 4 grid
///
/// Row 0 is the top of the board and row `HEIGHT - 1` the bottom, so discs
/// fall towards higher row indices. Occupied cells in a column are always
/// contiguous from the bottom up.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Board {
    cells: [[Cell; WIDTH]; HEIGHT],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; WIDTH]; HEIGHT],
        }
    }

    /// Builds a board from rows of digits in {0, 1, 2}, top row first
    pub fn from_grid(grid: &[Vec<u8>]) -> Result<Self> {
        if grid.len() != HEIGHT {
            return Err(anyhow!(
                "Invalid board, expected {} rows but found {}",
                HEIGHT,
                grid.len()
            ));
        }
        let mut board = Self::new();
        for (row, digits) in grid.iter().enumerate() {
            if digits.len() != WIDTH {
                return Err(anyhow!(
                    "Invalid board, row {} has {} cells instead of {}",
                    row,
                    digits.len(),
                    WIDTH
                ));
            }
            for (column, &digit) in digits.iter().enumerate() {
                board.cells[row][column] = Cell::from_digit(digit).ok_or_else(|| {
                    anyhow!(
                        "could not parse '{}' at row {}, column {} as a cell",
                        digit,
                        row,
                        column
                    )
                })?;
            }
        }

        // gravity: nothing may float above an empty cell
        for column in 0..WIDTH {
            for row in 1..HEIGHT {
                if board.cells[row][column].is_empty() && !board.cells[row - 1][column].is_empty() {
                    return Err(anyhow!(
                        "Invalid board, floating disc above row {} in column {}",
                        row,
                        column
                    ));
                }
            }
        }
        Ok(board)
    }

    /// Builds a board from a string of 1-indexed columns, the human moving first
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();
        let mut player = Player::Human;

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    board.play_checked(column - 1, player)?;
                    player = player.other();
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(board)
    }

    /// Every position reached by `length` alternating moves from the empty board, human first
    ///
    /// Sequences are generated column by column, and a sequence is abandoned as
    /// soon as its prefix overflows a column.
    pub fn openings(length: usize) -> Result<Vec<Self>> {
        if length > MAX_OPENING_LENGTH {
            return Err(anyhow!(
                "Opening length must be at most {}, got {}",
                MAX_OPENING_LENGTH,
                length
            ));
        }
        let mut openings = Vec::new();
        Self::new().extend_openings(length, Player::Human, &mut openings);
        Ok(openings)
    }

    fn extend_openings(&self, remaining: usize, player: Player, openings: &mut Vec<Self>) {
        if remaining == 0 {
            openings.push(self.clone());
            return;
        }
        for column in 0..WIDTH {
            let mut next = self.clone();
            if next.drop_disc(column, player) {
                next.extend_openings(remaining - 1, player.other(), openings);
            }
        }
    }

    /// Column numbers as the player types them, left to right
    pub fn column_labels() -> String {
        (1..=WIDTH).map(|x| x.to_string()).collect()
    }

    pub fn get(&self, row: usize, column: usize) -> Cell {
        self.cells[row][column]
    }

    /// The board as rows of wire digits, top row first
    pub fn grid(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.digit()).collect())
            .collect()
    }

    /// Compact digit rows separated by newlines, used for diagnostic snapshots
    pub fn snapshot(&self) -> String {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| char::from(b'0' + cell.digit())).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_valid_column(&self, column: usize) -> bool {
        column < WIDTH && self.cells[0][column].is_empty()
    }

    /// All playable columns in ascending order
    pub fn valid_columns(&self) -> Vec<usize> {
        (0..WIDTH).filter(|&c| self.is_valid_column(c)).collect()
    }

    /// Drops a disc into the lowest empty cell of `column`
    ///
    /// Returns `false` without touching the board if the column is full or out of range.
    pub fn drop_disc(&mut self, column: usize, player: Player) -> bool {
        if !self.is_valid_column(column) {
            return false;
        }
        match (0..HEIGHT).rev().find(|&row| self.cells[row][column].is_empty()) {
            Some(row) => {
                self.cells[row][column] = player.cell();
                true
            }
            None => false,
        }
    }

    pub fn play_checked(&mut self, column: usize, player: Player) -> Result<()> {
        if column >= WIDTH {
            return Err(anyhow!(
                "Invalid move, column {} out of range. Columns must be between 0 and {}",
                column,
                WIDTH - 1
            ));
        }
        if !self.drop_disc(column, player) {
            return Err(anyhow!("Invalid move, column {} full", column));
        }
        Ok(())
    }

    /// Number of discs in `column`
    pub fn column_height(&self, column: usize) -> usize {
        (0..HEIGHT).filter(|&row| !self.cells[row][column].is_empty()).count()
    }

    pub fn is_full(&self) -> bool {
        (0..WIDTH).all(|column| !self.cells[0][column].is_empty())
    }

    /// The game only ends once every cell is occupied; a completed alignment does not stop it
    pub fn is_terminal(&self) -> bool {
        self.is_full()
    }

    /// Counts every starting cell whose run of four in some direction belongs to `player`
    ///
    /// Overlapping runs are counted separately, so five in a row counts twice.
    pub fn count_alignments(&self, player: Player) -> usize {
        let target = player.cell();
        let mut count = 0;
        for row in 0..HEIGHT {
            for column in 0..WIDTH {
                for &direction in DIRECTIONS.iter() {
                    if let Some(window) = self.window(row, column, direction) {
                        if window.iter().all(|&cell| cell == target) {
                            count += 1;
                        }
                    }
                }
            }
        }
        count
    }

    /// Alignment counts as `(human, ai)`
    pub fn get_score(&self) -> (usize, usize) {
        (
            self.count_alignments(Player::Human),
            self.count_alignments(Player::Ai),
        )
    }

    /// The four cells starting at (`row`, `column`) in `direction`, if they fit on the board
    pub(crate) fn window(
        &self,
        row: usize,
        column: usize,
        (dr, dc): (isize, isize),
    ) -> Option<[Cell; 4]> {
        let end_row = row as isize + 3 * dr;
        let end_column = column as isize + 3 * dc;
        if end_row < 0 || end_row >= HEIGHT as isize || end_column < 0 || end_column >= WIDTH as isize {
            return None;
        }
        let mut window = [Cell::Empty; 4];
        for (i, slot) in window.iter_mut().enumerate() {
            let r = row as isize + dr * i as isize;
            let c = column as isize + dc * i as isize;
            *slot = self.cells[r as usize][c as usize];
        }
        Some(window)
    }

    pub fn display(&self) -> Result<()> {
        let mut stdout = stdout();

        stdout.queue(PrintStyledContent(style(Self::column_labels() + "\n")))?;
        for _ in 0..HEIGHT {
            stdout.queue(PrintStyledContent(style("\n")))?;
        }
        stdout.flush()?;

        let (origin_x, origin_y) = crossterm::cursor::position()?;
        let top_y = origin_y.saturating_sub(HEIGHT as u16);

        for (row, cells) in self.cells.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                stdout
                    .queue(MoveTo(origin_x + column as u16, top_y + row as u16))?
                    .queue(PrintStyledContent(
                        style("O")
                            .attribute(Attribute::Bold)
                            .on(Color::DarkBlue)
                            .with(match cell {
                                Cell::Human => Color::Red,
                                Cell::Ai => Color::Yellow,
                                Cell::Empty => Color::DarkBlue,
                            }),
                    ))?;
            }
        }
        stdout
            .queue(MoveTo(origin_x, origin_y))?
            .queue(PrintStyledContent(style("\n")))?;
        stdout.flush()?;
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let symbols: Vec<&str> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => ".",
                    Cell::Human => "R",
                    Cell::Ai => "Y",
                })
                .collect();
            write!(f, "{}", symbols.join(" "))?;
        }
        Ok(())
    }
}
