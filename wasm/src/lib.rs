use minelogic as ml;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn create_board(rows: usize, cols: usize, total_mines: usize) -> Vec<u8> {
    console_error_panic_hook::set_once();

    ml::Board::new(rows, cols, total_mines).serialize()
}

#[wasm_bindgen]
pub fn parse_board(text: String, total_mines: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let board = ml::Board::from_text(&text, total_mines).map_err(|e| e.to_string())?;
    Ok(board.serialize())
}

#[wasm_bindgen]
pub fn board_text(bts: Vec<u8>) -> String {
    console_error_panic_hook::set_once();

    ml::Board::deserialize(&bts).to_text()
}

/// Editor support. Cell codes: -2 flagged, -1 unknown, 0..=8 revealed;
/// any other code clears the cell back to unknown.
#[wasm_bindgen]
pub fn set_cell(bts: Vec<u8>, row: usize, col: usize, code: i8) -> Vec<u8> {
    console_error_panic_hook::set_once();

    let mut board = ml::Board::deserialize(&bts);
    let state = match code {
        -2 => ml::CellState::Flagged,
        0..=8 => ml::CellState::Revealed(code as u8),
        _ => ml::CellState::Unknown,
    };
    board.set(ml::Position { row, col }, state);
    board.serialize()
}

/// Row-major cell codes, same encoding as `set_cell`.
#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Vec<i8> {
    console_error_panic_hook::set_once();

    let board = ml::Board::deserialize(&bts);
    board
        .positions()
        .map(|p| match board.get(p) {
            ml::CellState::Unknown => -1,
            ml::CellState::Flagged => -2,
            ml::CellState::Revealed(n) => n as i8,
        })
        .collect()
}

/// Row-major deduction codes: 0 nothing known, 1 guaranteed safe,
/// 2 guaranteed mine.
#[wasm_bindgen]
pub fn deductions(bts: Vec<u8>) -> Vec<i8> {
    console_error_panic_hook::set_once();

    let board = ml::Board::deserialize(&bts);
    let result = ml::solve(&board, &ml::SolverConfig::default());
    board
        .positions()
        .map(|p| {
            if result.safe_cells.contains(&p) {
                1
            } else if result.mines.contains(&p) {
                2
            } else {
                0
            }
        })
        .collect()
}

/// Row-major mine probabilities; -1.0 for cells the solver has no
/// probability for (revealed, flagged, or already deduced).
#[wasm_bindgen]
pub fn probabilities(bts: Vec<u8>) -> Vec<f64> {
    console_error_panic_hook::set_once();

    let board = ml::Board::deserialize(&bts);
    let result = ml::solve(&board, &ml::SolverConfig::default());
    board
        .positions()
        .map(|p| result.probabilities.get(&p).copied().unwrap_or(-1.0))
        .collect()
}

#[wasm_bindgen]
pub fn is_consistent(bts: Vec<u8>) -> bool {
    console_error_panic_hook::set_once();

    let board = ml::Board::deserialize(&bts);
    ml::solve(&board, &ml::SolverConfig::default()).is_solvable
}
