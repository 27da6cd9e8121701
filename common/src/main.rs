use itertools::Itertools;
use minelogic::*;
use rand::prelude::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

const ROWS: usize = 9;
const COLS: usize = 9;
const MINES: usize = 10;

fn main() {
    env_logger::init();

    // --- 1. Setup ---
    let mut rng = rand::rng();
    let mine_positions = place_mines(&mut rng);
    let mut board = Board::new(ROWS, COLS, MINES);
    let config = SolverConfig::default();

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: flag deduced mines, reveal deduced safe cells, guess the lowest risk otherwise.");
    println!("Initial board:");
    print_board(&board);

    // --- 2. Game loop ---
    let mut move_count = 0;
    let outcome = loop {
        if revealed_count(&board) == ROWS * COLS - MINES {
            break "The bot cleared the board!";
        }

        move_count += 1;
        println!("\n--- Move #{move_count} ---");

        let result = solve(&board, &config);
        if !result.is_solvable {
            break "The board state became inconsistent; giving up.";
        }

        // Flag every cell the solver has proven to be a mine.
        for &cell in result.mines.iter().sorted() {
            if board.is_unknown(cell) {
                board.set(cell, CellState::Flagged);
                println!("Flagging ({}, {}) as a mine.", cell.row, cell.col);
            }
        }

        // --- 3. Pick a cell to reveal ---
        let target = if let Some(&cell) = result.safe_cells.iter().sorted().next() {
            println!("Logic found a guaranteed safe cell.");
            Some(cell)
        } else if let Some((cell, p)) = result
            .probabilities
            .iter()
            .map(|(&cell, &p)| (cell, p))
            .filter(|&(cell, _)| board.is_unknown(cell))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        {
            println!("No safe move; guessing at {:.1}% mine probability.", p * 100.0);
            Some(cell)
        } else {
            println!("No information at all; guessing blind.");
            let unknown: Vec<Position> = board.unknown_cells().into_iter().collect();
            unknown.choose(&mut rng).copied()
        };

        let Some(target) = target else {
            break "No cells left to reveal.";
        };

        // --- 4. Execute the move ---
        println!("Bot reveals ({}, {})...", target.row, target.col);
        if mine_positions.contains(&target) {
            print_board(&board);
            break "The bot hit a mine and lost.";
        }
        reveal(&mut board, target, &mine_positions);
        print_board(&board);
    };

    // --- 5. Final result ---
    println!("\n--- Game Over ---");
    println!("Result after {move_count} moves: {outcome}");
}

fn place_mines(rng: &mut impl Rng) -> HashSet<Position> {
    let mut mines = HashSet::new();
    while mines.len() < MINES {
        mines.insert(Position {
            row: rng.random_range(0..ROWS),
            col: rng.random_range(0..COLS),
        });
    }
    mines
}

fn adjacent_mines(pos: Position, mine_positions: &HashSet<Position>) -> u8 {
    pos.neighbors(ROWS, COLS)
        .filter(|n| mine_positions.contains(n))
        .count() as u8
}

/// Reveal a safe cell, flood-filling outward through zero regions.
fn reveal(board: &mut Board, start: Position, mine_positions: &HashSet<Position>) {
    let mut stack = vec![start];
    while let Some(pos) = stack.pop() {
        if !board.is_unknown(pos) {
            continue;
        }
        let count = adjacent_mines(pos, mine_positions);
        board.set(pos, CellState::Revealed(count));
        if count == 0 {
            stack.extend(
                pos.neighbors(ROWS, COLS)
                    .filter(|&n| !mine_positions.contains(&n)),
            );
        }
    }
}

fn revealed_count(board: &Board) -> usize {
    board.positions().filter(|&p| board.is_revealed(p)).count()
}

fn print_board(board: &Board) {
    print!("   ");
    for col in 0..board.cols {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(board.cols));

    for (row, cells) in board.grid.iter().enumerate() {
        print!("{:^2}|", row);
        for cell in cells {
            match cell {
                CellState::Unknown => print!(" ■ "),
                CellState::Flagged => print!(" ⚑ "),
                CellState::Revealed(n) => print!(" {} ", n),
            }
        }
        println!();
    }
}
