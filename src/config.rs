use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::search::{Algorithm, SearchResult};
use crate::strategies::DeliveryModel;

/// Shallowest search accepted from callers
pub const MIN_DEPTH: u32 = 1;
/// Deepest search accepted from callers, tree size grows exponentially with depth
pub const MAX_DEPTH: u32 = 10;
pub const DEFAULT_DEPTH: u32 = 4;

/// Everything needed to pick a move
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub algorithm: Algorithm,
    pub depth: u32,
    pub delivery: DeliveryModel,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::AlphaBeta,
            depth: DEFAULT_DEPTH,
            delivery: DeliveryModel::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.depth < MIN_DEPTH || self.depth > MAX_DEPTH {
            return Err(anyhow!(
                "Depth must be between {} and {}, got {}",
                MIN_DEPTH,
                MAX_DEPTH,
                self.depth
            ));
        }
        self.delivery.validate()
    }

    /// Searches `board` with the configured strategy
    pub fn run(&self, board: &Board) -> SearchResult {
        self.algorithm.strategy(self.delivery).best_move(board, self.depth)
    }
}
