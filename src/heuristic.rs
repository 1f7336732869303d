//! Static evaluation of non-terminal positions, from the automated player's point of view

use crate::board::{Board, Cell, Player, DIRECTIONS};
use crate::{HEIGHT, WIDTH};

/// Weight of each completed alignment
pub const ALIGNMENT_WEIGHT: i32 = 1000;
/// Multiplier applied to each side's window score
pub const WINDOW_WEIGHT: i32 = 10;
/// Bonus per automated-player disc in the middle column
pub const CENTER_WEIGHT: i32 = 3;

const THREE_OPEN: i32 = 50;
const TWO_OPEN: i32 = 10;
const ONE_OPEN: i32 = 1;
const BLOCK_THREE: i32 = 40;

/// Scores `board`; positive values favour the automated player
///
/// Full boards are scored on completed alignments alone. Otherwise open
/// windows and center-column control are added on top.
pub fn evaluate(board: &Board) -> i32 {
    let (human, ai) = board.get_score();
    let alignments = (ai as i32 - human as i32) * ALIGNMENT_WEIGHT;
    if board.is_terminal() {
        return alignments;
    }

    let center = WIDTH / 2;
    let center_discs = (0..HEIGHT)
        .filter(|&row| board.get(row, center) == Cell::Ai)
        .count() as i32;

    alignments
        + window_score(board, Player::Ai) * WINDOW_WEIGHT
        - window_score(board, Player::Human) * WINDOW_WEIGHT
        + center_discs * CENTER_WEIGHT
}

/// Sums [`score_window`] over every run of four cells in all four directions
pub fn window_score(board: &Board, player: Player) -> i32 {
    let mut score = 0;
    for row in 0..HEIGHT {
        for column in 0..WIDTH {
            for &direction in DIRECTIONS.iter() {
                if let Some(window) = board.window(row, column, direction) {
                    score += score_window(&window, player);
                }
            }
        }
    }
    score
}

/// Scores a single window for `player`
///
/// The blocking bonus for an opponent three with one gap is added on top of
/// whatever the player's own discs earned.
pub fn score_window(window: &[Cell; 4], player: Player) -> i32 {
    let own = window.iter().filter(|&&c| c == player.cell()).count();
    let empty = window.iter().filter(|c| c.is_empty()).count();
    let opponent = window.iter().filter(|&&c| c == player.other().cell()).count();

    let mut score = match (own, empty) {
        (3, 1) => THREE_OPEN,
        (2, 2) => TWO_OPEN,
        (1, 3) => ONE_OPEN,
        _ => 0,
    };
    if opponent == 3 && empty == 1 {
        score += BLOCK_THREE;
    }
    score
}
