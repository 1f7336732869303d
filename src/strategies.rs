//! The three move-selection strategies

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::search::{ExpansionPolicy, Successors};

/// Exhaustive minimax: every valid move is searched at every node
#[derive(Copy, Clone, Debug, Default)]
pub struct Minimax;

impl ExpansionPolicy for Minimax {
    const NAME: &'static str = "minimax";
    const PRUNING: bool = false;

    fn successors(&self, _board: &Board, _column: usize) -> Successors {
        Successors::Deterministic
    }
}

/// Minimax with alpha-beta pruning
///
/// Picks the same column with the same value as [`Minimax`] while usually
/// visiting far fewer nodes.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlphaBeta;

impl ExpansionPolicy for AlphaBeta {
    const NAME: &'static str = "minimax_alpha_beta";
    const PRUNING: bool = true;

    fn successors(&self, _board: &Board, _column: usize) -> Successors {
        Successors::Deterministic
    }
}

/// How imprecisely discs are delivered
///
/// A disc aimed at a column lands there with weight `chosen`, and in each
/// direct neighbour with weight `neighbour`. Only valid columns take part and
/// the weights of those are renormalised to sum to one.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryModel {
    pub chosen: f64,
    pub neighbour: f64,
}

impl Default for DeliveryModel {
    fn default() -> Self {
        Self {
            chosen: 0.6,
            neighbour: 0.2,
        }
    }
}

impl DeliveryModel {
    pub fn validate(&self) -> Result<()> {
        if !self.chosen.is_finite() || self.chosen <= 0.0 {
            return Err(anyhow!(
                "chosen column weight must be positive, got {}",
                self.chosen
            ));
        }
        if !self.neighbour.is_finite() || self.neighbour < 0.0 {
            return Err(anyhow!(
                "neighbour weight must not be negative, got {}",
                self.neighbour
            ));
        }
        Ok(())
    }

    /// Landing columns for a disc aimed at `column`: chosen, left, right
    pub fn outcomes(&self, board: &Board, column: usize) -> Vec<(usize, f64)> {
        let mut outcomes = Vec::with_capacity(3);
        if board.is_valid_column(column) {
            outcomes.push((column, self.chosen));
        }
        if column > 0 && board.is_valid_column(column - 1) {
            outcomes.push((column - 1, self.neighbour));
        }
        if board.is_valid_column(column + 1) {
            outcomes.push((column + 1, self.neighbour));
        }
        outcomes.retain(|&(_, weight)| weight > 0.0);

        let total: f64 = outcomes.iter().map(|&(_, weight)| weight).sum();
        for (_, weight) in outcomes.iter_mut() {
            *weight /= total;
        }
        outcomes
    }
}

/// Minimax with chance nodes modelling where a chosen disc actually lands
#[derive(Copy, Clone, Debug, Default)]
pub struct Expectiminimax {
    delivery: DeliveryModel,
}

impl Expectiminimax {
    pub fn new(delivery: DeliveryModel) -> Self {
        Self { delivery }
    }

    pub fn delivery(&self) -> DeliveryModel {
        self.delivery
    }
}

impl ExpansionPolicy for Expectiminimax {
    const NAME: &'static str = "expectiminimax";
    const PRUNING: bool = false;

    fn successors(&self, board: &Board, column: usize) -> Successors {
        Successors::Chance(self.delivery.outcomes(board, column))
    }
}
