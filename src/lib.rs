//! A game tree search engine for the automated player in 'Connect 4'
//!
//! Three interchangeable strategies pick a column for the automated player:
//! plain minimax, minimax with alpha-beta pruning, and expectiminimax, which
//! models discs that sometimes land in a neighbouring column. Every search
//! returns the chosen column together with the explored tree and its statistics.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_search::{board::Board, compute_best_move, search::Algorithm};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = Board::from_moves("444")?;
//! let result = compute_best_move(&board, Algorithm::AlphaBeta, 2);
//!
//! assert!(result.best_move.is_some());
//! assert_eq!(result.stats.nodes_expanded as usize, result.tree.len() - 1);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod board;

pub mod heuristic;

pub mod tree;

pub mod search;

pub mod strategies;

pub mod config;

mod test;

use board::Board;
use search::{Algorithm, SearchResult};
use strategies::DeliveryModel;

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// four in a row must fit in every scanned direction
const_assert!(WIDTH >= 4 && HEIGHT >= 4);
// column digits in move strings are single characters
const_assert!(WIDTH <= 9);

/// Picks a column for the automated player on `board`, searching `depth` plies
///
/// Expectiminimax uses the default [`DeliveryModel`]. `best_move` is `None`
/// when no column is playable or `depth` is 0.
pub fn compute_best_move(board: &Board, algorithm: Algorithm, depth: u32) -> SearchResult {
    algorithm
        .strategy(DeliveryModel::default())
        .best_move(board, depth)
}
