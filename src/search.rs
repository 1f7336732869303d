//! The recursive search shared by every strategy
//!
//! A single depth-first recursion builds the [`SearchTree`]; an
//! [`ExpansionPolicy`] decides how a chosen column turns into successor
//! positions and whether alpha-beta bounds are threaded through.

use anyhow::{anyhow, Result};
use log::debug;
use serde::{Deserialize, Serialize, Serializer};

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::board::{Board, Player};
use crate::heuristic::evaluate;
use crate::strategies::{AlphaBeta, DeliveryModel, Expectiminimax, Minimax};
use crate::tree::{Bounds, NodeId, Role, SearchTree, Transition};

/// Where a disc dropped in a chosen column can end up
#[derive(Clone, PartialEq, Debug)]
pub enum Successors {
    /// The disc always lands in the chosen column
    Deterministic,
    /// Landing columns with probabilities summing to one, in outcome order
    Chance(Vec<(usize, f64)>),
}

/// The part of a search that differs between strategies
pub trait ExpansionPolicy {
    /// Name used in logs and on the command line
    const NAME: &'static str;
    /// Whether alpha-beta bounds are propagated and used to cut off siblings
    const PRUNING: bool;

    fn successors(&self, board: &Board, column: usize) -> Successors;
}

/// Statistics of one search call
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Every node entered below the root, leaves and chance nodes included
    pub nodes_expanded: u64,
    /// Wall-clock time of the whole search
    #[serde(serialize_with = "as_secs")]
    pub time_taken: Duration,
    /// Value of the chosen root child, or the static value when no move was searched
    pub evaluation: f64,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// The chosen column, the explored tree and the statistics of a search
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// `None` if the board has no playable column or the depth was 0
    pub best_move: Option<usize>,
    pub tree: SearchTree,
    pub stats: SearchStats,
}

/// A move-selection strategy for the automated player
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    /// Searches `depth` plies ahead of `board` with the automated player to move
    fn best_move(&self, board: &Board, depth: u32) -> SearchResult;
}

impl<P: ExpansionPolicy> SearchStrategy for P {
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn best_move(&self, board: &Board, depth: u32) -> SearchResult {
        search(self, board, depth)
    }
}

/// The available strategies, as selected by name
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "minimax")]
    Minimax,
    #[serde(rename = "minimax_alpha_beta", alias = "alphabeta", alias = "alpha_beta")]
    AlphaBeta,
    #[serde(rename = "expectiminimax", alias = "expectimax")]
    Expectiminimax,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::Minimax,
        Algorithm::AlphaBeta,
        Algorithm::Expectiminimax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Minimax => Minimax::NAME,
            Algorithm::AlphaBeta => AlphaBeta::NAME,
            Algorithm::Expectiminimax => Expectiminimax::NAME,
        }
    }

    pub fn strategy(self, delivery: DeliveryModel) -> Box<dyn SearchStrategy> {
        match self {
            Algorithm::Minimax => Box::new(Minimax),
            Algorithm::AlphaBeta => Box::new(AlphaBeta),
            Algorithm::Expectiminimax => Box::new(Expectiminimax::new(delivery)),
        }
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "minimax" => Ok(Algorithm::Minimax),
            "minimax_alpha_beta" | "alphabeta" | "alpha_beta" => Ok(Algorithm::AlphaBeta),
            "expectiminimax" | "expectimax" => Ok(Algorithm::Expectiminimax),
            _ => Err(anyhow!("Unknown algorithm: {}", s)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs a full search of `board` to `depth` plies with the given policy
pub fn search<P: ExpansionPolicy>(policy: &P, board: &Board, depth: u32) -> SearchResult {
    let start = Instant::now();
    let mut searcher = Searcher {
        policy,
        tree: SearchTree::new(),
        depth_limit: depth,
        nodes_expanded: 0,
    };
    let root = searcher.tree.root();
    let root_bounds = if P::PRUNING { Some(Bounds::FULL) } else { None };

    let (value, best_move) = if depth == 0 || board.is_terminal() {
        (evaluate(board) as f64, None)
    } else {
        searcher.expand(root, board, depth, Player::Ai, root_bounds)
    };

    let root_node = searcher.tree.node_mut(root);
    root_node.value = value;
    root_node.bounds = root_bounds;

    let stats = SearchStats {
        nodes_expanded: searcher.nodes_expanded,
        time_taken: start.elapsed(),
        evaluation: value,
    };
    debug!(
        "{} depth {}: column {:?}, value {}, {} nodes in {:.4}s",
        P::NAME,
        depth,
        best_move,
        value,
        stats.nodes_expanded,
        stats.time_taken.as_secs_f64()
    );

    SearchResult {
        best_move,
        tree: searcher.tree,
        stats,
    }
}

struct Searcher<'p, P> {
    policy: &'p P,
    tree: SearchTree,
    depth_limit: u32,
    nodes_expanded: u64,
}

impl<P: ExpansionPolicy> Searcher<'_, P> {
    /// Searches every valid column of a decision node
    ///
    /// Returns the node's value and the first column reaching it. Columns are
    /// tried in ascending order and only a strictly better value replaces the
    /// current best.
    fn expand(
        &mut self,
        id: NodeId,
        board: &Board,
        depth_left: u32,
        player: Player,
        bounds: Option<Bounds>,
    ) -> (f64, Option<usize>) {
        let maximizing = player == Player::Ai;
        let mut window = bounds.unwrap_or(Bounds::FULL);
        let mut best: Option<(f64, usize)> = None;

        for column in board.valid_columns() {
            let child_bounds = if P::PRUNING { Some(window) } else { None };
            let (value, child) = self.branch(id, board, column, depth_left, player, child_bounds);

            let improves = match best {
                None => true,
                Some((best_value, _)) if maximizing => value > best_value,
                Some((best_value, _)) => value < best_value,
            };
            if improves {
                best = Some((value, column));
            }

            if P::PRUNING {
                if maximizing {
                    window.alpha = window.alpha.max(value);
                } else {
                    window.beta = window.beta.min(value);
                }
                if window.beta <= window.alpha {
                    self.tree.node_mut(child).pruned = true;
                    break;
                }
            }
        }

        match best {
            Some((value, column)) => (value, Some(column)),
            None => (evaluate(board) as f64, None),
        }
    }

    /// Plays `column` for `player` and searches whatever follows
    fn branch(
        &mut self,
        parent: NodeId,
        board: &Board,
        column: usize,
        depth_left: u32,
        player: Player,
        bounds: Option<Bounds>,
    ) -> (f64, NodeId) {
        match self.policy.successors(board, column) {
            Successors::Deterministic => {
                let mut child_board = board.clone();
                child_board.drop_disc(column, player);
                self.descend(
                    parent,
                    &child_board,
                    Transition::Drop { column },
                    depth_left - 1,
                    player.other(),
                    bounds,
                )
            }
            Successors::Chance(outcomes) => {
                let ply = self.depth_limit - depth_left;
                let chance = self
                    .tree
                    .push_child(parent, Role::Chance, Transition::Drop { column }, ply, None);
                self.nodes_expanded += 1;

                let value = if outcomes.is_empty() {
                    self.tree.node_mut(chance).role = Role::Leaf;
                    evaluate(board) as f64
                } else {
                    let mut expected = 0.0;
                    for (landing, probability) in outcomes {
                        let mut child_board = board.clone();
                        child_board.drop_disc(landing, player);
                        let (value, _) = self.descend(
                            chance,
                            &child_board,
                            Transition::Outcome {
                                column: landing,
                                probability,
                            },
                            depth_left - 1,
                            player.other(),
                            None,
                        );
                        expected += probability * value;
                    }
                    expected
                };
                self.tree.node_mut(chance).value = value;
                (value, chance)
            }
        }
    }

    /// Enters the position `board`, where `player` is to move
    fn descend(
        &mut self,
        parent: NodeId,
        board: &Board,
        transition: Transition,
        depth_left: u32,
        player: Player,
        bounds: Option<Bounds>,
    ) -> (f64, NodeId) {
        self.nodes_expanded += 1;
        let ply = self.depth_limit - depth_left;
        let leaf = depth_left == 0 || board.is_terminal();
        let role = match (leaf, player) {
            (true, _) => Role::Leaf,
            (false, Player::Ai) => Role::Max,
            (false, Player::Human) => Role::Min,
        };
        let id = self.tree.push_child(parent, role, transition, ply, bounds);

        let value = if leaf {
            evaluate(board) as f64
        } else {
            self.expand(id, board, depth_left, player, bounds).0
        };
        self.tree.node_mut(id).value = value;
        (value, id)
    }
}
