#[cfg(test)]
pub mod test {
    use anyhow::Result;

    use crate::board::{Board, Cell, Outcome, Player, MAX_OPENING_LENGTH};
    use crate::config::SearchConfig;
    use crate::heuristic::{evaluate, score_window, window_score};
    use crate::search::{search, Algorithm, ExpansionPolicy, SearchStrategy, Successors};
    use crate::strategies::{AlphaBeta, DeliveryModel, Expectiminimax, Minimax};
    use crate::tree::{Role, SearchTree, ViewOptions};
    use crate::{compute_best_move, HEIGHT, WIDTH};

    const POSITIONS: [&str; 8] = [
        "", "4", "444", "4455", "12345", "4433221", "7777776", "334455667",
    ];

    fn strategies() -> Vec<Box<dyn SearchStrategy>> {
        Algorithm::ALL
            .iter()
            .map(|algorithm| algorithm.strategy(DeliveryModel::default()))
            .collect()
    }

    /// Bottom row reads H H H . . . . with every other cell empty
    fn open_three() -> Result<Board> {
        let mut grid = vec![vec![0; WIDTH]; HEIGHT];
        grid[HEIGHT - 1] = vec![1, 1, 1, 0, 0, 0, 0];
        Board::from_grid(&grid)
    }

    /// A full board in a column-striped pattern
    fn full_board() -> Result<Board> {
        let grid: Vec<Vec<u8>> = (0..HEIGHT)
            .map(|row| {
                (0..WIDTH)
                    .map(|column| if (row / 2 + column) % 2 == 0 { 1 } else { 2 })
                    .collect()
            })
            .collect();
        Board::from_grid(&grid)
    }

    fn column_of(tree: &SearchTree, index: usize) -> Option<usize> {
        let root = tree.node(tree.root());
        tree.node(root.children()[index]).column()
    }

    #[test]
    pub fn drop_disc_fills_from_the_bottom() {
        let mut board = Board::new();
        for filled in 0..HEIGHT {
            assert_eq!(board.column_height(2), filled);
            assert!(board.drop_disc(2, Player::Human));
            assert_eq!(board.column_height(2), filled + 1);
            assert_eq!(board.get(HEIGHT - 1 - filled, 2), Cell::Human);
        }
        assert!(!board.is_valid_column(2));

        let before = board.clone();
        assert!(!board.drop_disc(2, Player::Ai));
        assert!(!board.drop_disc(WIDTH, Player::Ai));
        assert_eq!(board, before);
    }

    #[test]
    pub fn valid_columns_skip_full_ones() -> Result<()> {
        let mut board = Board::from_moves("111111777777")?;
        assert_eq!(board.valid_columns(), vec![1, 2, 3, 4, 5]);
        assert!(!board.is_terminal());
        assert!(board.play_checked(0, Player::Human).is_err());
        Ok(())
    }

    #[test]
    pub fn from_grid_rejects_bad_input() {
        assert!(Board::from_grid(&vec![vec![0; WIDTH]; HEIGHT - 1]).is_err());
        assert!(Board::from_grid(&vec![vec![0; WIDTH + 1]; HEIGHT]).is_err());

        let mut bad_digit = vec![vec![0; WIDTH]; HEIGHT];
        bad_digit[HEIGHT - 1][0] = 3;
        assert!(Board::from_grid(&bad_digit).is_err());

        let mut floating = vec![vec![0; WIDTH]; HEIGHT];
        floating[HEIGHT - 2][4] = 2;
        assert!(Board::from_grid(&floating).is_err());
    }

    #[test]
    pub fn grid_round_trips_through_from_grid() -> Result<()> {
        let board = Board::from_moves("4455671")?;
        assert_eq!(Board::from_grid(&board.grid())?, board);
        let snapshot = board.snapshot();
        let rows: Vec<&str> = snapshot.lines().collect();
        assert_eq!(rows.len(), HEIGHT);
        assert_eq!(rows[HEIGHT - 1], "1001112");
        assert_eq!(rows[HEIGHT - 2], "0002200");
        Ok(())
    }

    #[test]
    pub fn column_labels_match_typed_columns() -> Result<()> {
        let labels = Board::column_labels();
        assert_eq!(labels, "1234567");

        // typing the label above a column plays into that column
        for (column, label) in labels.chars().enumerate() {
            let board = Board::from_moves(label.to_string())?;
            assert_eq!(board.column_height(column), 1);
        }
        Ok(())
    }

    #[test]
    pub fn openings_enumerate_alternating_sequences() -> Result<()> {
        assert_eq!(Board::openings(0)?, vec![Board::new()]);
        assert_eq!(Board::openings(1)?.len(), WIDTH);

        let openings = Board::openings(3)?;
        assert_eq!(openings.len(), WIDTH.pow(3));
        assert_eq!(openings[0], Board::from_moves("111")?);
        assert_eq!(openings[openings.len() - 1], Board::from_moves("777")?);
        for board in openings.iter() {
            let discs: usize = (0..WIDTH).map(|c| board.column_height(c)).sum();
            assert_eq!(discs, 3);
        }
        Ok(())
    }

    #[test]
    pub fn openings_beyond_the_cap_are_refused() {
        assert!(Board::openings(MAX_OPENING_LENGTH + 1).is_err());
    }

    #[test]
    pub fn overlapping_alignments_count_separately() -> Result<()> {
        let mut grid = vec![vec![0; WIDTH]; HEIGHT];
        grid[HEIGHT - 1] = vec![2, 2, 2, 2, 2, 1, 1];
        let board = Board::from_grid(&grid)?;
        assert_eq!(board.count_alignments(Player::Ai), 2);
        assert_eq!(board.get_score(), (0, 2));

        // vertical four for the human in column 0
        let board = Board::from_moves("12121")?;
        assert_eq!(board.get_score(), (0, 0));
        let board = Board::from_moves("1212121")?;
        assert_eq!(board.get_score(), (1, 0));
        assert_eq!(Outcome::from_score(board.get_score()), Outcome::HumanWin);
        Ok(())
    }

    #[test]
    pub fn diagonal_alignments_are_found() -> Result<()> {
        let mut grid = vec![vec![0; WIDTH]; HEIGHT];
        grid[5] = vec![2, 1, 1, 1, 0, 0, 0];
        grid[4] = vec![0, 2, 1, 1, 0, 0, 0];
        grid[3] = vec![0, 0, 2, 1, 0, 0, 0];
        grid[2] = vec![0, 0, 0, 2, 0, 0, 0];
        let board = Board::from_grid(&grid)?;
        assert_eq!(board.count_alignments(Player::Ai), 1);
        assert_eq!(board.count_alignments(Player::Human), 0);
        Ok(())
    }

    #[test]
    pub fn terminal_only_when_full() -> Result<()> {
        // a completed four does not end the game
        let won = Board::from_moves("1212121")?;
        assert!(!won.is_terminal());

        let full = full_board()?;
        assert!(full.is_terminal());
        assert!(full.valid_columns().is_empty());
        Ok(())
    }

    #[test]
    pub fn score_window_cases() {
        use crate::board::Cell::{Ai, Empty, Human};

        assert_eq!(score_window(&[Ai, Ai, Ai, Empty], Player::Ai), 50);
        assert_eq!(score_window(&[Ai, Empty, Ai, Empty], Player::Ai), 10);
        assert_eq!(score_window(&[Empty, Empty, Ai, Empty], Player::Ai), 1);
        assert_eq!(score_window(&[Human, Human, Empty, Human], Player::Ai), 40);
        assert_eq!(score_window(&[Ai, Ai, Ai, Ai], Player::Ai), 0);
        assert_eq!(score_window(&[Ai, Human, Ai, Empty], Player::Ai), 0);
        assert_eq!(score_window(&[Empty; 4], Player::Human), 0);
    }

    #[test]
    pub fn evaluation_is_deterministic() -> Result<()> {
        assert_eq!(evaluate(&Board::new()), 0);
        for moves in POSITIONS.iter() {
            let board = Board::from_moves(moves)?;
            assert_eq!(evaluate(&board), evaluate(&board.clone()));
        }
        Ok(())
    }

    #[test]
    pub fn evaluation_of_known_positions() -> Result<()> {
        let mut board = Board::new();
        board.drop_disc(3, Player::Ai);
        // seven open windows worth 1 each, times 10, plus the center disc
        assert_eq!(window_score(&board, Player::Ai), 7);
        assert_eq!(evaluate(&board), 73);

        let board = open_three()?;
        let mut blocked = board.clone();
        blocked.drop_disc(3, Player::Ai);
        assert_eq!(evaluate(&blocked), -17);

        // full boards are scored on alignments only
        let full = full_board()?;
        let (human, ai) = full.get_score();
        assert_eq!(evaluate(&full), (ai as i32 - human as i32) * 1000);
        Ok(())
    }

    #[test]
    pub fn depth_one_picks_best_static_value() {
        let board = Board::new();
        let values: Vec<f64> = (0..WIDTH)
            .map(|column| {
                let mut child = board.clone();
                child.drop_disc(column, Player::Ai);
                evaluate(&child) as f64
            })
            .collect();

        for result in [Minimax.best_move(&board, 1), AlphaBeta.best_move(&board, 1)].iter() {
            let root = result.tree.node(result.tree.root());
            let children: Vec<f64> = root
                .children()
                .iter()
                .map(|&id| result.tree.node(id).value)
                .collect();
            assert_eq!(children, values);
            assert_eq!(result.best_move, Some(3));
            assert_eq!(result.stats.evaluation, 73.0);
        }

        // the expectation over landing columns still favours the middle
        let result = Expectiminimax::default().best_move(&board, 1);
        assert_eq!(result.best_move, Some(3));
        let edge = result.tree.node(result.tree.root()).children()[0];
        // 0.75 * 30 + 0.25 * 40
        assert!((result.tree.node(edge).value - 32.5).abs() < 1e-9);
    }

    #[test]
    pub fn every_strategy_blocks_an_open_three() -> Result<()> {
        let board = open_three()?;
        for strategy in strategies() {
            for depth in 1..=3 {
                let result = strategy.best_move(&board, depth);
                assert_eq!(result.best_move, Some(3), "{} at depth {}", strategy.name(), depth);
            }
        }
        let result = Minimax.best_move(&board, 1);
        assert_eq!(result.stats.evaluation, -17.0);
        Ok(())
    }

    #[test]
    pub fn alpha_beta_matches_minimax() -> Result<()> {
        for moves in POSITIONS.iter() {
            let board = Board::from_moves(moves)?;
            for depth in 1..=4 {
                let full = search(&Minimax, &board, depth);
                let pruned = search(&AlphaBeta, &board, depth);
                assert_eq!(full.best_move, pruned.best_move, "{} at depth {}", moves, depth);
                assert_eq!(full.stats.evaluation, pruned.stats.evaluation);
                assert!(pruned.stats.nodes_expanded <= full.stats.nodes_expanded);
            }
        }

        let board = Board::from_moves("444")?;
        assert_eq!(search(&Minimax, &board, 3).stats.nodes_expanded, 399);
        assert!(search(&AlphaBeta, &board, 3).stats.nodes_expanded < 399);
        Ok(())
    }

    #[test]
    pub fn minimax_tree_is_complete() {
        let result = Minimax.best_move(&Board::new(), 2);
        assert_eq!(result.stats.nodes_expanded, 7 + 49);
        assert_eq!(result.tree.len(), 1 + 7 + 49);

        let root = result.tree.node(result.tree.root());
        assert_eq!(root.role, Role::Root);
        assert_eq!(root.column(), None);
        for (i, &child) in root.children().iter().enumerate() {
            let node = result.tree.node(child);
            assert_eq!(node.role, Role::Min);
            assert_eq!(node.column(), Some(i));
            assert_eq!(node.depth, 1);
            assert!(node.bounds.is_none());
            for &grandchild in node.children() {
                assert_eq!(result.tree.node(grandchild).role, Role::Leaf);
                assert_eq!(result.tree.node(grandchild).depth, 2);
            }
        }
    }

    #[test]
    pub fn nodes_expanded_counts_everything_below_the_root() -> Result<()> {
        let board = Board::from_moves("4455")?;
        for strategy in strategies() {
            let result = strategy.best_move(&board, 3);
            assert_eq!(result.stats.nodes_expanded as usize, result.tree.len() - 1);
            assert_eq!(
                result.stats.evaluation,
                result.tree.node(result.tree.root()).value
            );
        }
        Ok(())
    }

    #[test]
    pub fn alpha_beta_records_bounds_and_cutoffs() -> Result<()> {
        let board = Board::from_moves("444")?;
        let result = AlphaBeta.best_move(&board, 3);
        assert!(result.tree.nodes().all(|(_, node)| node.bounds.is_some()));
        assert!(result.tree.nodes().any(|(_, node)| node.pruned));

        for (_, node) in result.tree.nodes() {
            // a pruned child is always the last one its parent explored
            if node.pruned {
                let parent = result.tree.node(node.parent().expect("pruned nodes have parents"));
                let last = *parent.children().last().expect("parent has children");
                assert!(result.tree.node(last).pruned);
            }
            let bounds = node.bounds.expect("checked above");
            assert!(bounds.alpha < bounds.beta);
        }

        // the root explores every column, its window only ever widens alpha
        let root = result.tree.node(result.tree.root());
        assert_eq!(root.children().len(), WIDTH);
        assert_eq!(column_of(&result.tree, 0), Some(0));
        Ok(())
    }

    #[test]
    pub fn terminal_board_has_no_move() -> Result<()> {
        let board = full_board()?;
        for strategy in strategies() {
            let result = strategy.best_move(&board, 4);
            assert_eq!(result.best_move, None);
            assert_eq!(result.stats.nodes_expanded, 0);
            assert_eq!(result.tree.len(), 1);
            assert_eq!(result.stats.evaluation, evaluate(&board) as f64);
        }
        Ok(())
    }

    #[test]
    pub fn depth_zero_evaluates_the_root() -> Result<()> {
        let board = Board::from_moves("4455")?;
        for strategy in strategies() {
            let result = strategy.best_move(&board, 0);
            assert_eq!(result.best_move, None);
            assert_eq!(result.stats.nodes_expanded, 0);
            assert_eq!(result.stats.evaluation, evaluate(&board) as f64);
        }
        Ok(())
    }

    #[test]
    pub fn search_leaves_the_board_untouched() -> Result<()> {
        let board = Board::from_moves("334455667")?;
        let before = board.clone();
        for strategy in strategies() {
            strategy.best_move(&board, 3);
            assert_eq!(board, before);
        }
        Ok(())
    }

    #[test]
    pub fn delivery_outcomes_are_renormalised() -> Result<()> {
        let model = DeliveryModel::default();

        let outcomes = model.outcomes(&Board::new(), 3);
        assert_eq!(outcomes.iter().map(|o| o.0).collect::<Vec<_>>(), vec![3, 2, 4]);
        assert!((outcomes[0].1 - 0.6).abs() < 1e-12);

        let edge = model.outcomes(&Board::new(), 0);
        assert_eq!(edge.len(), 2);
        assert!((edge[0].1 - 0.75).abs() < 1e-12);
        assert!((edge[1].1 - 0.25).abs() < 1e-12);

        // both neighbours of column 1 are full
        let board = Board::from_moves("111111333333")?;
        assert_eq!(model.outcomes(&board, 1), vec![(1, 1.0)]);
        assert_eq!(
            Expectiminimax::default().successors(&board, 1),
            Successors::Chance(vec![(1, 1.0)])
        );
        Ok(())
    }

    #[test]
    pub fn single_outcome_chance_node_is_deterministic() -> Result<()> {
        let board = Board::from_moves("111111333333")?;
        let chance_result = Expectiminimax::default().best_move(&board, 1);
        let plain = Minimax.best_move(&board, 1);

        let chance_root = chance_result.tree.node(chance_result.tree.root());
        let plain_root = plain.tree.node(plain.tree.root());
        // column 1 is the first valid column in both trees
        let chance = chance_result.tree.node(chance_root.children()[0]);
        let direct = plain.tree.node(plain_root.children()[0]);

        assert_eq!(chance.role, Role::Chance);
        assert_eq!(chance.column(), Some(1));
        assert_eq!(chance.children().len(), 1);
        let outcome = chance_result.tree.node(chance.children()[0]);
        assert_eq!(outcome.probability(), Some(1.0));
        assert_eq!(chance.value, direct.value);
        Ok(())
    }

    #[test]
    pub fn expectiminimax_tree_shape() {
        let board = Board::new();
        let result = Expectiminimax::default().best_move(&board, 2);
        let root = result.tree.node(result.tree.root());
        assert_eq!(root.children().len(), WIDTH);

        for &chance_id in root.children() {
            let chance = result.tree.node(chance_id);
            assert_eq!(chance.role, Role::Chance);
            assert_eq!(chance.depth, 0);
            assert!(chance.probability().is_none());

            let total: f64 = chance
                .children()
                .iter()
                .map(|&id| result.tree.node(id).probability().expect("outcomes carry probabilities"))
                .sum();
            assert!((total - 1.0).abs() < 1e-12);

            let expected: f64 = chance
                .children()
                .iter()
                .map(|&id| {
                    let node = result.tree.node(id);
                    assert_eq!(node.role, Role::Min);
                    assert_eq!(node.depth, 1);
                    node.probability().unwrap_or(0.0) * node.value
                })
                .sum();
            assert!((chance.value - expected).abs() < 1e-9);
        }
        assert_eq!(result.stats.nodes_expanded as usize, result.tree.len() - 1);
    }

    #[test]
    pub fn boards_are_rebuilt_from_the_path() -> Result<()> {
        let board = Board::from_moves("4")?;
        let discs = |b: &Board| (0..WIDTH).map(|c| b.column_height(c)).sum::<usize>();

        let result = Minimax.best_move(&board, 2);
        for (id, node) in result.tree.nodes() {
            let rebuilt = result.tree.board_at(id, &board);
            assert_eq!(discs(&rebuilt), 1 + node.depth as usize);
        }

        // first root child then its first reply: AI in column 0, human on top of it
        let root = result.tree.node(result.tree.root());
        let first = root.children()[0];
        let reply = result.tree.node(first).children()[0];
        let rebuilt = result.tree.board_at(reply, &board);
        assert_eq!(rebuilt.get(HEIGHT - 1, 0), Cell::Ai);
        assert_eq!(rebuilt.get(HEIGHT - 2, 0), Cell::Human);

        let chance_result = Expectiminimax::default().best_move(&board, 2);
        for (id, node) in chance_result.tree.nodes() {
            if node.role != Role::Chance {
                let rebuilt = chance_result.tree.board_at(id, &board);
                assert_eq!(discs(&rebuilt), 1 + node.depth as usize);
            }
        }
        Ok(())
    }

    #[test]
    pub fn nested_view_serializes_in_order() -> Result<()> {
        let board = Board::from_moves("4")?;
        let result = AlphaBeta.best_move(&board, 2);
        let json = serde_json::to_value(result.tree.nested(&board, ViewOptions::default()))?;

        assert_eq!(json["role"], "root");
        assert!(json.get("column").is_none());
        let children = json["children"].as_array().expect("children array");
        assert_eq!(children.len(), WIDTH);
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child["column"], i);
            assert_eq!(child["depth"], 1);
            assert!(child.get("alpha").is_some());
            assert!(child.get("board").is_none());
        }

        let truncated = serde_json::to_value(result.tree.nested(
            &board,
            ViewOptions {
                include_board: true,
                max_depth: Some(1),
            },
        ))?;
        let first = &truncated["children"][0];
        assert_eq!(first["children"].as_array().map(|c| c.len()), Some(0));
        assert!(first["board"].as_str().map_or(false, |s| s.ends_with("2001000")));

        let stats = serde_json::to_value(&result.stats)?;
        assert!(stats.get("nodesExpanded").is_some());
        assert!(stats["timeTaken"].is_f64());
        Ok(())
    }

    #[test]
    pub fn chance_outcomes_serialize_probabilities() {
        let board = Board::new();
        let result = Expectiminimax::default().best_move(&board, 1);
        let json = match serde_json::to_value(result.tree.nested(&board, ViewOptions::default())) {
            Ok(json) => json,
            Err(err) => panic!("serialization failed: {}", err),
        };
        let chance = &json["children"][3];
        assert_eq!(chance["role"], "chance");
        assert!(chance.get("probability").is_none());
        let outcomes = chance["children"].as_array().expect("outcomes");
        assert_eq!(
            outcomes.iter().map(|o| o["column"].as_u64()).collect::<Vec<_>>(),
            vec![Some(3), Some(2), Some(4)]
        );
        assert_eq!(outcomes[0]["probability"], 0.6);
    }

    #[test]
    pub fn dump_renders_each_node_on_its_own_line() -> Result<()> {
        let board = Board::from_moves("4")?;
        let result = AlphaBeta.best_move(&board, 2);
        let dump = result.tree.dump(&board, ViewOptions::default());

        assert_eq!(dump.lines().count(), result.tree.len());
        assert!(dump.starts_with("[ROOT] Value:"));
        assert!(dump.lines().nth(1).map_or(false, |l| l.starts_with("  [MIN] Col:0")));
        assert!(dump.contains(" α:"));
        if result.tree.nodes().any(|(_, node)| node.pruned) {
            assert!(dump.contains("[PRUNED]"));
        }

        let chance_dump = Expectiminimax::default()
            .best_move(&board, 1)
            .tree
            .dump(&board, ViewOptions::default());
        assert!(chance_dump.contains("[CHANCE] Col:0"));
        assert!(chance_dump.contains("P:0.60"));
        Ok(())
    }

    #[test]
    pub fn algorithms_parse_by_name() -> Result<()> {
        assert_eq!("minimax".parse::<Algorithm>()?, Algorithm::Minimax);
        assert_eq!("minimax_alpha_beta".parse::<Algorithm>()?, Algorithm::AlphaBeta);
        assert_eq!("AlphaBeta".parse::<Algorithm>()?, Algorithm::AlphaBeta);
        assert_eq!("expectiminimax".parse::<Algorithm>()?, Algorithm::Expectiminimax);
        assert!("negamax".parse::<Algorithm>().is_err());

        for algorithm in Algorithm::ALL.iter() {
            assert_eq!(algorithm.to_string().parse::<Algorithm>()?, *algorithm);
            assert_eq!(algorithm.strategy(DeliveryModel::default()).name(), algorithm.name());
        }
        Ok(())
    }

    #[test]
    pub fn config_validation() {
        assert!(SearchConfig::default().validate().is_ok());

        let too_shallow = SearchConfig {
            depth: 0,
            ..SearchConfig::default()
        };
        assert!(too_shallow.validate().is_err());

        let too_deep = SearchConfig {
            depth: 11,
            ..SearchConfig::default()
        };
        assert!(too_deep.validate().is_err());

        let mut negative = SearchConfig::default();
        negative.delivery.neighbour = -0.1;
        assert!(negative.validate().is_err());

        let mut nothing_chosen = SearchConfig::default();
        nothing_chosen.delivery.chosen = 0.0;
        assert!(nothing_chosen.validate().is_err());
    }

    #[test]
    pub fn config_runs_the_selected_strategy() -> Result<()> {
        let board = Board::from_moves("4455")?;
        let config = SearchConfig {
            algorithm: Algorithm::Minimax,
            depth: 2,
            ..SearchConfig::default()
        };
        let via_config = config.run(&board);
        let direct = compute_best_move(&board, Algorithm::Minimax, 2);
        assert_eq!(via_config.best_move, direct.best_move);
        assert_eq!(via_config.stats.nodes_expanded, direct.stats.nodes_expanded);

        let parsed: SearchConfig =
            serde_json::from_str(r#"{"algorithm": "expectiminimax", "depth": 3}"#)?;
        assert_eq!(parsed.algorithm, Algorithm::Expectiminimax);
        assert_eq!(parsed.delivery, DeliveryModel::default());
        Ok(())
    }
}
