use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use serde_json::json;

use std::io::{stdin, stdout, Write};
use std::time::Duration;

use connect4_search::board::{Board, Outcome, Player};
use connect4_search::config::{SearchConfig, DEFAULT_DEPTH, MAX_DEPTH, MIN_DEPTH};
use connect4_search::search::{search, Algorithm};
use connect4_search::strategies::{AlphaBeta, DeliveryModel, Expectiminimax, Minimax};
use connect4_search::tree::ViewOptions;
use connect4_search::WIDTH;

#[derive(Parser, Debug)]
#[command(name = "connect4_search", version, about = "Connect 4 against a game tree search")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(clap::Args, Debug, Clone)]
struct SearchArgs {
    /// minimax, minimax_alpha_beta or expectiminimax
    #[arg(short = 'a', long = "algorithm")]
    algorithm: Option<String>,
    /// Search depth in plies
    #[arg(short = 'd', long = "depth")]
    depth: Option<u32>,
    /// Probability weight of a disc landing in the chosen column
    #[arg(long = "chosen-weight")]
    chosen_weight: Option<f64>,
    /// Probability weight of a disc landing in each neighbouring column
    #[arg(long = "neighbour-weight")]
    neighbour_weight: Option<f64>,
}

impl SearchArgs {
    fn config(&self) -> Result<SearchConfig> {
        let mut config = SearchConfig::default();
        if let Some(algorithm) = &self.algorithm {
            config.algorithm = algorithm.parse()?;
        }
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(chosen) = self.chosen_weight {
            config.delivery.chosen = chosen;
        }
        if let Some(neighbour) = self.neighbour_weight {
            config.delivery.neighbour = neighbour;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play against the automated player in the terminal
    Play {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Pick a move for a single position and print the search tree
    Analyse {
        /// Rows of digits (0 empty, 1 human, 2 automated player), top row first, separated by '/'
        #[arg(short = 'b', long = "board", conflicts_with = "moves")]
        board: Option<String>,
        /// 1-indexed columns played so far, the human moving first
        #[arg(short = 'm', long = "moves")]
        moves: Option<String>,
        #[command(flatten)]
        search: SearchArgs,
        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Attach a board snapshot to every tree node
        #[arg(long = "show-boards")]
        show_boards: bool,
        /// Only print the tree down to this depth
        #[arg(long = "tree-depth")]
        tree_depth: Option<u32>,
    },
    /// Compare the strategies on every opening of a given length
    Bench {
        /// Number of moves in each opening, at most 9
        #[arg(short = 'l', long = "length", default_value_t = 3)]
        length: usize,
        /// Search depth in plies
        #[arg(short = 'd', long = "depth", default_value_t = DEFAULT_DEPTH)]
        depth: u32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.cmd {
        None => play(SearchConfig::default(), true),
        Some(Command::Play { search }) => {
            let prompt = search.algorithm.is_none() && search.depth.is_none();
            play(search.config()?, prompt)
        }
        Some(Command::Analyse {
            board,
            moves,
            search,
            json,
            show_boards,
            tree_depth,
        }) => {
            let board = match (board, moves) {
                (Some(grid), _) => parse_grid(&grid)?,
                (None, Some(moves)) => Board::from_moves(moves)?,
                (None, None) => Board::new(),
            };
            let options = ViewOptions {
                include_board: show_boards,
                max_depth: tree_depth,
            };
            analyse(board, search.config()?, json, options)
        }
        Some(Command::Bench { length, depth }) => bench(length, depth),
    }
}

/// Parses rows such as `0000000/.../1120000`, top row first
fn parse_grid(text: &str) -> Result<Board> {
    let grid = text
        .split(|c: char| c == '/' || c == ',' || c == '\n')
        .filter(|row| !row.trim().is_empty())
        .map(|row| {
            row.trim()
                .chars()
                .map(|c| {
                    c.to_digit(10)
                        .map(|d| d as u8)
                        .ok_or_else(|| anyhow!("could not parse '{}' as a cell", c))
                })
                .collect::<Result<Vec<u8>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Board::from_grid(&grid)
}

fn analyse(board: Board, config: SearchConfig, as_json: bool, options: ViewOptions) -> Result<()> {
    if board.is_terminal() {
        return Err(anyhow!("Board is full"));
    }

    let result = config.run(&board);
    let column = result
        .best_move
        .ok_or_else(|| anyhow!("No move available on this board"))?;

    let mut after = board.clone();
    after.drop_disc(column, Player::Ai);
    let score = after.get_score();

    if as_json {
        let response = json!({
            "column": column,
            "tree": result.tree.nested(&board, options),
            "nodesExpanded": result.stats.nodes_expanded,
            "timeTaken": result.stats.time_taken.as_secs_f64(),
            "evaluation": result.stats.evaluation,
            "score": [score.0, score.1],
        });
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        let rule = "=".repeat(50);
        println!("{}", rule);
        println!("Algorithm: {}", config.algorithm);
        println!("Depth: {}", config.depth);
        println!("Best Column: {}", column);
        println!("Nodes Expanded: {}", result.stats.nodes_expanded);
        println!("Time Taken: {:.4}s", result.stats.time_taken.as_secs_f64());
        println!("Evaluation: {}", result.stats.evaluation);
        println!("Score after move (human, ai): ({}, {})", score.0, score.1);
        println!("{}", rule);
        print!("{}", result.tree.dump(&board, options));
        println!("{}", rule);
    }

    info!("position after move:\n{}", after);
    Ok(())
}

fn prompt_yes_no(question: &str) -> Result<bool> {
    let stdin = stdin();
    loop {
        let mut buffer = String::new();
        print!("{} y/n: ", question);
        stdout().flush()?;
        stdin.read_line(&mut buffer)?;
        match buffer.to_lowercase().chars().next() {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Unknown answer given"),
        }
    }
}

fn prompt_config(mut config: SearchConfig) -> Result<SearchConfig> {
    let stdin = stdin();

    // choose the search algorithm
    loop {
        print!("Algorithm [minimax, minimax_alpha_beta, expectiminimax] ({}): ", config.algorithm);
        stdout().flush()?;
        let mut buffer = String::new();
        stdin.read_line(&mut buffer)?;
        let answer = buffer.trim();
        if answer.is_empty() {
            break;
        }
        match answer.parse::<Algorithm>() {
            Ok(algorithm) => {
                config.algorithm = algorithm;
                break;
            }
            Err(err) => println!("{}", err),
        }
    }

    // choose the search depth
    loop {
        print!("Depth {}-{} ({}): ", MIN_DEPTH, MAX_DEPTH, config.depth);
        stdout().flush()?;
        let mut buffer = String::new();
        stdin.read_line(&mut buffer)?;
        let answer = buffer.trim();
        if answer.is_empty() {
            break;
        }
        match answer.parse::<u32>() {
            Ok(depth) if (MIN_DEPTH..=MAX_DEPTH).contains(&depth) => {
                config.depth = depth;
                break;
            }
            _ => println!("Invalid depth: {}", answer),
        }
    }
    Ok(config)
}

fn play(config: SearchConfig, prompt: bool) -> Result<()> {
    println!("Welcome to Connect 4\n");
    let config = if prompt { prompt_config(config)? } else { config };
    let mut to_move = if prompt_yes_no("Should the AI move first?")? {
        Player::Ai
    } else {
        Player::Human
    };
    let show_tree = prompt_yes_no("Print the search tree after each AI move?")?;

    let mut board = Board::new();
    let stdin = stdin();

    // game loop
    loop {
        board.display()?;

        if board.is_terminal() {
            let (human, ai) = board.get_score();
            println!("Final score: Human {} - AI {}", human, ai);
            match Outcome::from_score((human, ai)) {
                Outcome::HumanWin => println!("Human wins!"),
                Outcome::AiWin => println!("AI wins!"),
                Outcome::Tie => println!("Tie!"),
            }
            break;
        }

        match to_move {
            Player::Ai => {
                println!("AI is thinking...");
                stdout().flush()?;

                let result = config.run(&board);
                let column = match result.best_move {
                    Some(column) => column,
                    None => {
                        warn!("{} returned no move on a playable board", config.algorithm);
                        break;
                    }
                };
                if show_tree {
                    print!("{}", result.tree.dump(&board, ViewOptions::default()));
                }
                println!(
                    "Best move: {} (evaluation {}, {} nodes in {:.3}s)",
                    column + 1,
                    result.stats.evaluation,
                    result.stats.nodes_expanded,
                    result.stats.time_taken.as_secs_f64()
                );
                board.play_checked(column, Player::Ai)?;
            }
            Player::Human => {
                print!("Move input > ");
                stdout().flush()?;
                let mut input_str = String::new();
                stdin.read_line(&mut input_str)?;

                let column = match input_str.trim().parse::<usize>() {
                    Ok(column @ 1..=WIDTH) => column - 1,
                    _ => {
                        println!("Invalid number: {}", input_str.trim());
                        continue;
                    }
                };
                if let Err(err) = board.play_checked(column, Player::Human) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }
        }

        let (human, ai) = board.get_score();
        println!("Score: Human {} - AI {}", human, ai);
        to_move = to_move.other();
    }
    Ok(())
}

#[derive(Default)]
struct BenchTotals {
    positions: usize,
    mismatches: usize,
    nodes: [u64; 3],
    time: [Duration; 3],
}

fn bench(length: usize, depth: u32) -> Result<()> {
    let config = SearchConfig {
        depth,
        ..SearchConfig::default()
    };
    config.validate()?;
    // the automated player must be the one to move
    let openings: Vec<Board> = Board::openings(length)?
        .into_iter()
        .filter(|board| length % 2 == 1 && !board.is_terminal())
        .collect();
    if openings.is_empty() {
        return Err(anyhow!(
            "No positions to search, openings must have an odd length so the AI is to move"
        ));
    }

    let progress = ProgressBar::new(openings.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Searching positions: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
            .progress_chars("█▓▒░  "),
    );

    let expectiminimax = Expectiminimax::new(DeliveryModel::default());
    let totals = openings
        .par_iter()
        .map(|board| {
            let minimax = search(&Minimax, board, depth);
            let alpha_beta = search(&AlphaBeta, board, depth);
            let expecti = search(&expectiminimax, board, depth);
            progress.inc(1);

            let agree = minimax.best_move == alpha_beta.best_move
                && minimax.stats.evaluation == alpha_beta.stats.evaluation;
            if !agree {
                warn!(
                    "alpha-beta disagrees with minimax on\n{}\n{:?}/{} vs {:?}/{}",
                    board,
                    minimax.best_move,
                    minimax.stats.evaluation,
                    alpha_beta.best_move,
                    alpha_beta.stats.evaluation
                );
            }
            BenchTotals {
                positions: 1,
                mismatches: if agree { 0 } else { 1 },
                nodes: [
                    minimax.stats.nodes_expanded,
                    alpha_beta.stats.nodes_expanded,
                    expecti.stats.nodes_expanded,
                ],
                time: [
                    minimax.stats.time_taken,
                    alpha_beta.stats.time_taken,
                    expecti.stats.time_taken,
                ],
            }
        })
        .reduce(BenchTotals::default, |mut a, b| {
            a.positions += b.positions;
            a.mismatches += b.mismatches;
            for i in 0..3 {
                a.nodes[i] += b.nodes[i];
                a.time[i] += b.time[i];
            }
            a
        });
    progress.finish();

    println!(
        "Searched {} positions at depth {}, {} alpha-beta mismatches",
        totals.positions, depth, totals.mismatches
    );
    for (i, algorithm) in Algorithm::ALL.iter().enumerate() {
        println!(
            "{:>20}: mean nodes {:>10.1}, mean time {:.6}ms",
            algorithm.name(),
            totals.nodes[i] as f64 / totals.positions as f64,
            totals.time[i].as_secs_f64() / totals.positions as f64 * 1000.0
        );
    }

    if totals.mismatches > 0 {
        return Err(anyhow!("{} positions disagreed", totals.mismatches));
    }
    Ok(())
}
