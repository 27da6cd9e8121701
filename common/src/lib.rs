use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A 2D coordinate on the board, addressed as (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    /// All in-bounds 8-directional neighbors for a board of `rows` x `cols`.
    pub fn neighbors(self, rows: usize, cols: usize) -> impl Iterator<Item = Position> {
        (-1isize..=1).flat_map(move |dr| {
            (-1isize..=1).filter_map(move |dc| {
                if dr == 0 && dc == 0 {
                    return None;
                }
                let row = self.row as isize + dr;
                let col = self.col as isize + dc;
                if row < 0 || row >= rows as isize || col < 0 || col >= cols as isize {
                    return None;
                }
                Some(Position {
                    row: row as usize,
                    col: col as usize,
                })
            })
        })
    }
}

/// The visible state of a single cell.
///
/// `Revealed` carries the adjacent-mine count (0-8); only revealed cells
/// expose a number. Flags record the player's belief, not ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CellState {
    Unknown,
    Flagged,
    Revealed(u8),
}

/// A snapshot of the visible board plus the declared mine total.
///
/// The solver treats a `Board` as read-only; mutation (`set`) exists for
/// the editors and front ends that own it. `total_mines` is a hint used by
/// the probability stage and is not required to agree with the flags.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    pub grid: Vec<Vec<CellState>>,
    pub total_mines: usize,
}

impl Board {
    pub fn new(rows: usize, cols: usize, total_mines: usize) -> Self {
        Board {
            rows,
            cols,
            grid: vec![vec![CellState::Unknown; cols]; rows],
            total_mines,
        }
    }

    pub fn get(&self, pos: Position) -> CellState {
        self.grid[pos.row][pos.col]
    }

    pub fn set(&mut self, pos: Position, state: CellState) {
        self.grid[pos.row][pos.col] = state;
    }

    pub fn is_unknown(&self, pos: Position) -> bool {
        matches!(self.get(pos), CellState::Unknown)
    }

    pub fn is_flagged(&self, pos: Position) -> bool {
        matches!(self.get(pos), CellState::Flagged)
    }

    pub fn is_revealed(&self, pos: Position) -> bool {
        matches!(self.get(pos), CellState::Revealed(_))
    }

    /// The adjacent-mine count of a revealed cell, `None` otherwise.
    pub fn revealed_number(&self, pos: Position) -> Option<u8> {
        match self.get(pos) {
            CellState::Revealed(n) => Some(n),
            _ => None,
        }
    }

    /// Every position on the board, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| Position { row, col }))
    }

    /// In-bounds 8-directional neighbors of `pos`.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> {
        pos.neighbors(self.rows, self.cols)
    }

    pub fn unknown_cells(&self) -> HashSet<Position> {
        self.positions().filter(|&p| self.is_unknown(p)).collect()
    }

    pub fn flagged_count(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|c| matches!(c, CellState::Flagged))
            .count()
    }

    /// Parse a board from its text form.
    ///
    /// Digits 0-8 are revealed counts, `X` a flagged mine, `?` an unknown
    /// cell, and space or `.` an alias for a revealed zero. Lines are
    /// trimmed and blank lines skipped; a short row leaves its trailing
    /// cells unknown, a row longer than the first is an error.
    pub fn from_text(text: &str, total_mines: usize) -> anyhow::Result<Self> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        anyhow::ensure!(!lines.is_empty(), "board text contains no rows");

        let rows = lines.len();
        let cols = lines[0].chars().count();
        let mut board = Board::new(rows, cols, total_mines);

        for (row, line) in lines.iter().enumerate() {
            anyhow::ensure!(
                line.chars().count() <= cols,
                "row {row} is longer than the first row ({cols} cells)"
            );
            for (col, ch) in line.chars().enumerate() {
                let state = match ch {
                    '?' => CellState::Unknown,
                    'X' => CellState::Flagged,
                    ' ' | '.' => CellState::Revealed(0),
                    '0'..='8' => CellState::Revealed(ch as u8 - b'0'),
                    _ => anyhow::bail!(
                        "unrecognized cell character {ch:?} at row {row}, column {col}"
                    ),
                };
                board.set(Position { row, col }, state);
            }
        }

        Ok(board)
    }

    /// Render the board in the same text form `from_text` accepts.
    /// Revealed zeros print as `.` rather than a space so that the parser's
    /// line trimming cannot shift or drop them; every cell survives a
    /// round-trip.
    pub fn to_text(&self) -> String {
        self.grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        CellState::Unknown => '?',
                        CellState::Flagged => 'X',
                        CellState::Revealed(0) => '.',
                        CellState::Revealed(n) => (b'0' + n) as char,
                    })
                    .collect::<String>()
            })
            .join("\n")
    }

    /// Serialize the snapshot to bytes for the wasm boundary.
    pub fn serialize(&self) -> Vec<u8> {
        bcs::to_bytes(self).unwrap()
    }

    /// Deserialize a snapshot produced by `serialize`.
    pub fn deserialize(bts: &[u8]) -> Self {
        bcs::from_bytes(bts).unwrap()
    }
}

/// A counting constraint from one revealed cell: exactly `mine_count` of
/// `cells` are mines. Constraints are rebuilt from scratch on every solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub cells: HashSet<Position>,
    pub mine_count: usize,
}

impl Constraint {
    /// Whether the constraint can still be met under a (possibly partial)
    /// assignment. With every cell assigned this is exact: the mine count
    /// must match. With unassigned cells it checks feasibility only.
    pub fn is_satisfied(&self, assignment: &HashMap<Position, bool>) -> bool {
        let mut assigned_mines = 0usize;
        let mut unassigned = 0usize;
        for cell in &self.cells {
            match assignment.get(cell) {
                Some(true) => assigned_mines += 1,
                Some(false) => {}
                None => unassigned += 1,
            }
        }
        assigned_mines <= self.mine_count && self.mine_count - assigned_mines <= unassigned
    }
}

/// Knobs for a single `solve` call.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Run the pairwise constraint-subset comparison stage.
    pub enable_constraint_comparison: bool,
    /// Run the probability estimation stage.
    pub enable_probability: bool,
    /// Largest boundary the exact enumeration will attempt; beyond it the
    /// estimator falls back to a heuristic.
    pub max_enumeration_cells: usize,
    /// Safety bound on comparison passes, not expected to be reached.
    pub max_comparer_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            enable_constraint_comparison: true,
            enable_probability: true,
            max_enumeration_cells: 20,
            max_comparer_iterations: 100,
        }
    }
}

/// Everything one `solve` call can tell a front end.
///
/// `safe_cells` and `mines` are disjoint and only ever contain cells that
/// were unknown on the input board. `probabilities` covers the remaining
/// undetermined cells, values in [0, 1]. `is_solvable` is false only when
/// the probability stage proved that no mine placement satisfies every
/// constraint within the declared total; the deduced sets stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    pub safe_cells: HashSet<Position>,
    pub mines: HashSet<Position>,
    pub probabilities: HashMap<Position, f64>,
    pub constraints: Vec<Constraint>,
    pub is_solvable: bool,
}

impl SolverResult {
    /// Classify a cell as safe unless it is already classified either way.
    fn mark_safe(&mut self, cell: Position) -> bool {
        if self.is_classified(cell) {
            return false;
        }
        self.safe_cells.insert(cell)
    }

    /// Classify a cell as a mine unless it is already classified either way.
    fn mark_mine(&mut self, cell: Position) -> bool {
        if self.is_classified(cell) {
            return false;
        }
        self.mines.insert(cell)
    }

    fn is_classified(&self, cell: Position) -> bool {
        self.safe_cells.contains(&cell) || self.mines.contains(&cell)
    }
}

// --- Solver pipeline ---

/// Deduce everything the current board state allows.
///
/// Runs constraint extraction and propagation unconditionally, then the
/// comparison and probability stages as configured. A pure function of the
/// (board snapshot, config) pair: no state is carried between calls, the
/// board is never mutated, and no board shape or content makes it fail.
pub fn solve(board: &Board, config: &SolverConfig) -> SolverResult {
    let constraints = extract_constraints(board);

    let mut result = SolverResult {
        safe_cells: HashSet::new(),
        mines: HashSet::new(),
        probabilities: HashMap::new(),
        constraints: Vec::new(),
        is_solvable: true,
    };

    propagate_constraints(&constraints, &mut result);

    if config.enable_constraint_comparison {
        compare_constraints(&constraints, config.max_comparer_iterations, &mut result);
    }

    if config.enable_probability {
        estimate_probabilities(board, &constraints, config, &mut result);
    }

    result.constraints = constraints;
    result
}

/// Turn every revealed number into a counting constraint over its
/// unresolved neighbors.
///
/// A revealed cell with no unknown neighbors has nothing left to say. A
/// cell whose number disagrees with its flagged neighbors (fewer remaining
/// mines than zero, or more than the unknown neighbors could hold) is
/// locally inconsistent and contributes no constraint.
fn extract_constraints(board: &Board) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    for pos in board.positions() {
        let Some(number) = board.revealed_number(pos) else {
            continue;
        };

        let mut unknown = HashSet::new();
        let mut flagged = 0usize;
        for neighbor in board.neighbors(pos) {
            match board.get(neighbor) {
                CellState::Unknown => {
                    unknown.insert(neighbor);
                }
                CellState::Flagged => flagged += 1,
                CellState::Revealed(_) => {}
            }
        }

        if unknown.is_empty() {
            continue;
        }

        let remaining = number as isize - flagged as isize;
        if remaining < 0 || remaining > unknown.len() as isize {
            continue;
        }

        constraints.push(Constraint {
            cells: unknown,
            mine_count: remaining as usize,
        });
    }

    constraints
}

/// Apply the two zero-ambiguity rules to a fixpoint: a constraint needing
/// zero mines makes all its cells safe, a constraint needing as many mines
/// as it has cells makes them all mines. A cell classified once is never
/// reclassified, so the classified set strictly grows and the loop
/// terminates within board size.
fn propagate_constraints(constraints: &[Constraint], result: &mut SolverResult) {
    let mut changed = true;
    while changed {
        changed = false;
        for constraint in constraints {
            if constraint.mine_count == 0 {
                for &cell in &constraint.cells {
                    changed |= result.mark_safe(cell);
                }
            } else if constraint.mine_count == constraint.cells.len() {
                for &cell in &constraint.cells {
                    changed |= result.mark_mine(cell);
                }
            }
        }
    }
}

/// Derive further deductions from subset relationships between pairs of
/// the extracted constraints.
///
/// For any pair where A's cells are a strict subset of B's, the cells only
/// in B must hold exactly `B.mine_count - A.mine_count` mines: zero means
/// they are all safe, the full difference means they are all mines. The
/// comparison only ever sees the constraints captured at extraction time;
/// it does not regenerate them after folding deductions back in.
fn compare_constraints(
    constraints: &[Constraint],
    max_iterations: usize,
    result: &mut SolverResult,
) {
    let mut changed = true;
    let mut iteration = 0;

    while changed && iteration < max_iterations {
        changed = false;
        iteration += 1;

        for (a, b) in constraints
            .iter()
            .tuple_combinations::<(&Constraint, &Constraint)>()
        {
            for (small, big) in [(a, b), (b, a)] {
                if small.cells.len() >= big.cells.len() || !small.cells.is_subset(&big.cells) {
                    continue;
                }

                // Negative means the pair is mutually inconsistent; that is
                // not this stage's problem to report.
                let diff_mines = big.mine_count as isize - small.mine_count as isize;
                let diff_len = (big.cells.len() - small.cells.len()) as isize;

                if diff_mines == 0 {
                    for &cell in big.cells.difference(&small.cells) {
                        changed |= result.mark_safe(cell);
                    }
                } else if diff_mines == diff_len {
                    for &cell in big.cells.difference(&small.cells) {
                        changed |= result.mark_mine(cell);
                    }
                }
            }
        }
    }

    // `changed` can only survive the loop by hitting the cap; with a zero
    // cap no pass ever ran and there is nothing to warn about.
    if changed && iteration > 0 {
        log::warn!("constraint comparison stopped at the {max_iterations}-iteration cap");
    }
}

/// Fill in a mine probability for every still-undetermined unknown cell.
///
/// Boundary cells (those under at least one constraint) get exact
/// probabilities from enumeration when the boundary is small enough, and a
/// per-constraint heuristic otherwise. Interior cells share the expected
/// leftover mines uniformly. Valid boundary configurations are treated as
/// equally likely; they are not weighted by the number of ways the
/// remaining mines could fall among interior cells.
fn estimate_probabilities(
    board: &Board,
    constraints: &[Constraint],
    config: &SolverConfig,
    result: &mut SolverResult,
) {
    let boundary_set: HashSet<Position> = constraints
        .iter()
        .flat_map(|c| c.cells.iter().copied())
        .collect();
    let all_unknown = board.unknown_cells();
    let remaining_mines = board.total_mines as isize - board.flagged_count() as isize;

    if boundary_set.is_empty() {
        // Uniform prior: nothing constrains any cell.
        if !all_unknown.is_empty() {
            let p = (remaining_mines as f64 / all_unknown.len() as f64).clamp(0.0, 1.0);
            for &cell in &all_unknown {
                result.probabilities.insert(cell, p);
            }
        }
        return;
    }

    let boundary: Vec<Position> = boundary_set.iter().copied().sorted().collect();

    if boundary.len() > config.max_enumeration_cells {
        // Too large to enumerate: score each cell by how many constraints
        // pin it down. An approximation, not inference.
        for &cell in &boundary {
            if result.is_classified(cell) {
                continue;
            }
            let touching = constraints
                .iter()
                .filter(|c| c.cells.contains(&cell))
                .count();
            result
                .probabilities
                .insert(cell, (touching as f64 * 0.15).min(0.99));
        }
        return;
    }

    let tally = enumerate_boundary(&boundary, constraints, remaining_mines);

    if tally.valid_configs == 0 {
        // No mine placement satisfies every constraint within the declared
        // total: the board itself is inconsistent.
        result.is_solvable = false;
        return;
    }

    for (i, &cell) in boundary.iter().enumerate() {
        if result.is_classified(cell) {
            continue;
        }
        result
            .probabilities
            .insert(cell, tally.mine_counts[i] as f64 / tally.valid_configs as f64);
    }

    let interior: Vec<Position> = all_unknown
        .iter()
        .copied()
        .filter(|p| !boundary_set.contains(p))
        .collect();
    if !interior.is_empty() {
        let expected_boundary_mines =
            tally.total_boundary_mines as f64 / tally.valid_configs as f64;
        let p = ((remaining_mines as f64 - expected_boundary_mines) / interior.len() as f64)
            .clamp(0.0, 1.0);
        for cell in interior {
            result.probabilities.insert(cell, p);
        }
    }
}

// --- Boundary enumeration ---

/// Aggregate over all valid boundary configurations.
struct BoundaryTally {
    /// Per boundary cell (by index), the number of valid configurations it
    /// was a mine in.
    mine_counts: Vec<u64>,
    valid_configs: u64,
    /// Sum of mines placed across all valid configurations.
    total_boundary_mines: u64,
}

/// Running view of one constraint during the backtracking search.
struct ConstraintProgress {
    mine_count: usize,
    size: usize,
    assigned: usize,
    assigned_mines: usize,
}

/// Enumerate every mine/safe assignment of the boundary cells that
/// satisfies all constraints, by backtracking over the cells in (row, col)
/// order. Equivalent to filtering all subsets of size up to
/// `remaining_mines`, but abandons a partial assignment as soon as any
/// touched constraint becomes infeasible.
fn enumerate_boundary(
    boundary: &[Position],
    constraints: &[Constraint],
    remaining_mines: isize,
) -> BoundaryTally {
    let mut tally = BoundaryTally {
        mine_counts: vec![0; boundary.len()],
        valid_configs: 0,
        total_boundary_mines: 0,
    };

    // More flags than declared mines: even the empty placement is invalid.
    if remaining_mines < 0 {
        return tally;
    }

    let index_of: HashMap<Position, usize> = boundary
        .iter()
        .enumerate()
        .map(|(i, &cell)| (cell, i))
        .collect();

    let mut progress: Vec<ConstraintProgress> = constraints
        .iter()
        .map(|c| ConstraintProgress {
            mine_count: c.mine_count,
            size: c.cells.len(),
            assigned: 0,
            assigned_mines: 0,
        })
        .collect();

    // Constraint indices touching each boundary cell.
    let mut touching: Vec<Vec<usize>> = vec![Vec::new(); boundary.len()];
    for (ci, constraint) in constraints.iter().enumerate() {
        for cell in &constraint.cells {
            touching[index_of[cell]].push(ci);
        }
    }

    let max_mines = (remaining_mines as usize).min(boundary.len());
    let mut assignment = vec![false; boundary.len()];
    place_boundary_mines(
        0,
        0,
        max_mines,
        &mut assignment,
        &mut progress,
        &touching,
        &mut tally,
    );

    tally
}

fn place_boundary_mines(
    idx: usize,
    mines_placed: usize,
    max_mines: usize,
    assignment: &mut Vec<bool>,
    progress: &mut [ConstraintProgress],
    touching: &[Vec<usize>],
    tally: &mut BoundaryTally,
) {
    if idx == assignment.len() {
        // Every constraint is fully assigned here; the feasibility checks
        // below only let exact matches through.
        tally.valid_configs += 1;
        tally.total_boundary_mines += mines_placed as u64;
        for (i, &is_mine) in assignment.iter().enumerate() {
            if is_mine {
                tally.mine_counts[i] += 1;
            }
        }
        return;
    }

    for is_mine in [false, true] {
        if is_mine && mines_placed == max_mines {
            continue;
        }

        let mut feasible = true;
        for &ci in &touching[idx] {
            let p = &mut progress[ci];
            p.assigned += 1;
            p.assigned_mines += is_mine as usize;
            if p.assigned_mines > p.mine_count
                || p.mine_count - p.assigned_mines > p.size - p.assigned
            {
                feasible = false;
            }
        }

        if feasible {
            assignment[idx] = is_mine;
            place_boundary_mines(
                idx + 1,
                mines_placed + is_mine as usize,
                max_mines,
                assignment,
                progress,
                touching,
                tally,
            );
            assignment[idx] = false;
        }

        for &ci in &touching[idx] {
            let p = &mut progress[ci];
            p.assigned -= 1;
            p.assigned_mines -= is_mine as usize;
        }
    }
}

// --- Move analysis and hints ---

/// A recommended next action derived from a fresh solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hint {
    /// Guaranteed safe: reveal it.
    Safe(Position),
    /// Guaranteed mine: flag it to shrink the constraints.
    Mine(Position),
    /// No forced move exists; this is the lowest-risk guess.
    Guess { cell: Position, probability: f64 },
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hint::Safe(p) => {
                write!(f, "cell ({}, {}) is guaranteed safe; reveal it", p.row, p.col)
            }
            Hint::Mine(p) => {
                write!(f, "cell ({}, {}) is definitely a mine; flag it", p.row, p.col)
            }
            Hint::Guess { cell, probability } => write!(
                f,
                "no guaranteed moves; cell ({}, {}) has the lowest mine probability ({:.1}%)",
                cell.row,
                cell.col,
                probability * 100.0
            ),
        }
    }
}

/// Best next action for the current board, or `None` when the board offers
/// nothing to act on. Prefers a guaranteed-safe reveal, then a guaranteed
/// mine to flag, then the lowest-probability guess. Ties break by position
/// order so hints are deterministic.
pub fn hint(board: &Board, config: &SolverConfig) -> Option<Hint> {
    let result = solve(board, config);

    if let Some(&cell) = result.safe_cells.iter().sorted().next() {
        return Some(Hint::Safe(cell));
    }
    if let Some(&cell) = result.mines.iter().sorted().next() {
        return Some(Hint::Mine(cell));
    }
    result
        .probabilities
        .iter()
        .map(|(&cell, &p)| (cell, p))
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(cell, probability)| Hint::Guess { cell, probability })
}

/// How a played move stacks up against what the solver could prove on the
/// board state before the move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveAssessment {
    /// Revealed a cell the solver had proven to be a mine.
    GuaranteedMine,
    /// Hit a mine on a guess that was more likely a mine than not.
    RiskyGuess(f64),
    /// Hit a mine on a guess that was reasonable at the time.
    UnluckyGuess(f64),
    /// Revealed a cell the solver had proven safe.
    ProvablySafe,
    /// Guessed and survived while provably safe cells were available.
    SaferMoveAvailable,
    /// A guess with no better alternative on offer.
    ReasonableGuess(f64),
    /// The solver had nothing to say about this cell.
    Neutral,
}

impl fmt::Display for MoveAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveAssessment::GuaranteedMine => write!(
                f,
                "that cell was a guaranteed mine; it should have been flagged, not revealed"
            ),
            MoveAssessment::RiskyGuess(p) => write!(
                f,
                "risky: that cell had a {:.1}% mine probability; prefer lower-risk cells",
                p * 100.0
            ),
            MoveAssessment::UnluckyGuess(p) => write!(
                f,
                "unlucky: the mine probability was only {:.1}%; sometimes a guess is forced",
                p * 100.0
            ),
            MoveAssessment::ProvablySafe => {
                write!(f, "correct: that cell was provably safe from the constraints")
            }
            MoveAssessment::SaferMoveAvailable => write!(
                f,
                "it worked, but guaranteed safe cells were available; check those first"
            ),
            MoveAssessment::ReasonableGuess(p) => write!(
                f,
                "a fair guess at {:.1}% mine probability with no safe cell on offer",
                p * 100.0
            ),
            MoveAssessment::Neutral => write!(f, "the solver had no information about that cell"),
        }
    }
}

/// Judge a move against the deductions available on the pre-move board.
pub fn assess_move(
    board: &Board,
    mv: Position,
    was_mine: bool,
    config: &SolverConfig,
) -> MoveAssessment {
    let result = solve(board, config);

    if was_mine {
        if result.mines.contains(&mv) {
            return MoveAssessment::GuaranteedMine;
        }
        return match result.probabilities.get(&mv) {
            Some(&p) if p > 0.5 => MoveAssessment::RiskyGuess(p),
            Some(&p) => MoveAssessment::UnluckyGuess(p),
            None => MoveAssessment::Neutral,
        };
    }

    if result.safe_cells.contains(&mv) {
        return MoveAssessment::ProvablySafe;
    }
    if !result.safe_cells.is_empty() {
        return MoveAssessment::SaferMoveAvailable;
    }
    match result.probabilities.get(&mv) {
        Some(&p) => MoveAssessment::ReasonableGuess(p),
        None => MoveAssessment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn pos(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    fn board(text: &str, total_mines: usize) -> Board {
        Board::from_text(text, total_mines).unwrap()
    }

    /// The invariants every result must uphold, regardless of input.
    fn verify_result(b: &Board, result: &SolverResult) {
        assert!(
            result.safe_cells.is_disjoint(&result.mines),
            "safe cells and mines overlap"
        );
        for &cell in &result.safe_cells {
            assert!(b.is_unknown(cell), "safe cell {cell:?} was not unknown");
        }
        for &cell in &result.mines {
            assert!(b.is_unknown(cell), "mine {cell:?} was not unknown");
        }
        for (&cell, &p) in &result.probabilities {
            assert!(
                (0.0..=1.0).contains(&p),
                "probability {p} for {cell:?} out of range"
            );
        }
    }

    #[test]
    fn test_neighbors_center_edge_corner() {
        assert_eq!(pos(5, 5).neighbors(10, 10).count(), 8);
        assert_eq!(pos(0, 5).neighbors(10, 10).count(), 5);
        assert_eq!(pos(0, 0).neighbors(10, 10).count(), 3);

        let corner: HashSet<Position> = pos(0, 0).neighbors(10, 10).collect();
        assert_eq!(corner, HashSet::from([pos(0, 1), pos(1, 0), pos(1, 1)]));
    }

    #[test]
    fn test_board_parse_and_predicates() {
        let b = board("1?X\n2?5\n3?0", 2);
        assert_eq!(b.rows, 3);
        assert_eq!(b.cols, 3);

        assert_eq!(b.revealed_number(pos(0, 0)), Some(1));
        assert!(b.is_unknown(pos(0, 1)));
        assert!(b.is_flagged(pos(0, 2)));
        assert_eq!(b.revealed_number(pos(2, 2)), Some(0));
        assert!(b.is_revealed(pos(2, 2)));
        assert_eq!(b.revealed_number(pos(0, 1)), None);
        assert_eq!(b.flagged_count(), 1);
    }

    #[test]
    fn test_parse_zero_aliases() {
        let b = board("1.2\n?.?", 1);
        assert_eq!(b.revealed_number(pos(0, 1)), Some(0));
        assert_eq!(b.revealed_number(pos(1, 1)), Some(0));
    }

    #[test]
    fn test_parse_short_row_leaves_unknown() {
        let b = board("12\n1", 1);
        assert!(b.is_unknown(pos(1, 1)));
        assert_eq!(b.revealed_number(pos(1, 0)), Some(1));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Board::from_text("1?\n???", 1).is_err());
        assert!(Board::from_text("1z", 1).is_err());
        assert!(Board::from_text("\n\n", 1).is_err());
    }

    #[test]
    fn test_text_round_trip() {
        let b = board("1?X\n2?4\n3?1", 2);
        let reparsed = board(&b.to_text(), 2);
        assert_eq!(b.grid, reparsed.grid);
    }

    #[test]
    fn test_text_round_trip_preserves_zeros() {
        // Zeros render as '.', a parse alias, so trimming cannot drop them.
        let b = board("10X\n2?0", 1);
        let reparsed = board(&b.to_text(), 1);
        assert_eq!(b.grid, reparsed.grid);
    }

    #[test]
    fn test_text_round_trip_leading_zero_row() {
        // A row starting with a zero must not shift left on reparse.
        let b = board("1?\n02", 1);
        let reparsed = board(&b.to_text(), 1);
        assert_eq!(reparsed.get(pos(1, 0)), CellState::Revealed(0));
        assert_eq!(reparsed.get(pos(1, 1)), CellState::Revealed(2));
        assert_eq!(b.grid, reparsed.grid);
    }

    #[test]
    fn test_text_round_trip_all_zero_row() {
        // An all-zero row must not vanish and shift later rows up.
        let b = board("111\n000\n???", 1);
        let reparsed = board(&b.to_text(), 1);
        assert_eq!(reparsed.rows, 3);
        assert_eq!(b.grid, reparsed.grid);
    }

    #[test]
    fn test_byte_round_trip() {
        let b = board("1?X\n2?4", 3);
        let restored = Board::deserialize(&b.serialize());
        assert_eq!(b.grid, restored.grid);
        assert_eq!(b.total_mines, restored.total_mines);
    }

    #[test]
    fn test_constraint_equality() {
        let cells = HashSet::from([pos(0, 0), pos(0, 1)]);
        let a = Constraint {
            cells: cells.clone(),
            mine_count: 1,
        };
        let b = Constraint {
            cells: cells.clone(),
            mine_count: 1,
        };
        let c = Constraint {
            cells,
            mine_count: 2,
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_constraint_satisfaction() {
        let constraint = Constraint {
            cells: HashSet::from([pos(0, 0), pos(0, 1), pos(0, 2)]),
            mine_count: 2,
        };

        // Fully assigned: exact match required.
        let two_mines = HashMap::from([(pos(0, 0), true), (pos(0, 1), true), (pos(0, 2), false)]);
        assert!(constraint.is_satisfied(&two_mines));
        let one_mine = HashMap::from([(pos(0, 0), true), (pos(0, 1), false), (pos(0, 2), false)]);
        assert!(!constraint.is_satisfied(&one_mine));

        // Partially assigned: feasibility only.
        assert!(constraint.is_satisfied(&HashMap::from([(pos(0, 0), true)])));
        let all_safe = HashMap::from([(pos(0, 0), false), (pos(0, 1), false), (pos(0, 2), false)]);
        assert!(!constraint.is_satisfied(&all_safe));

        // An empty constraint is trivially satisfied.
        let empty = Constraint {
            cells: HashSet::new(),
            mine_count: 0,
        };
        assert!(empty.is_satisfied(&HashMap::new()));
    }

    #[test]
    fn test_forced_mine() {
        // A '1' whose only neighbor is unknown: that neighbor is the mine.
        let b = board("1?", 1);
        let result = solve(&b, &SolverConfig::default());
        assert_eq!(result.mines, HashSet::from([pos(0, 1)]));
        verify_result(&b, &result);
    }

    #[test]
    fn test_zero_makes_neighbors_safe() {
        let b = board("0??\n???\n???", 5);
        let result = solve(&b, &SolverConfig::default());
        for neighbor in pos(0, 0).neighbors(3, 3) {
            assert!(
                result.safe_cells.contains(&neighbor),
                "{neighbor:?} not safe"
            );
        }
        verify_result(&b, &result);
    }

    #[test]
    fn test_saturated_after_flags_marks_mines() {
        // The '3' has one flag; its two unknown neighbors carry the rest.
        let b = board("3X\n??", 3);
        let result = solve(&b, &SolverConfig::default());
        assert_eq!(result.mines, HashSet::from([pos(1, 0), pos(1, 1)]));
        verify_result(&b, &result);
    }

    #[test]
    fn test_partially_flagged_board_still_deduces() {
        let b = board("22?\n??X\n???", 3);
        let result = solve(&b, &SolverConfig::default());
        assert!(!result.safe_cells.is_empty() || !result.mines.is_empty());
        verify_result(&b, &result);
    }

    #[test]
    fn test_blank_board_yields_nothing() {
        let b = Board::new(5, 5, 5);
        let result = solve(&b, &SolverConfig::default());
        assert!(result.constraints.is_empty());
        assert!(result.safe_cells.is_empty());
        assert!(result.mines.is_empty());
        assert!(result.is_solvable);
        verify_result(&b, &result);
    }

    #[test]
    fn test_fully_revealed_board_yields_no_constraints() {
        let mut b = Board::new(3, 3, 0);
        for p in b.positions().collect::<Vec<_>>() {
            b.set(p, CellState::Revealed(0));
        }
        let result = solve(&b, &SolverConfig::default());
        assert!(result.constraints.is_empty());
        assert!(result.probabilities.is_empty());
        verify_result(&b, &result);
    }

    #[test]
    fn test_overflagged_number_contributes_no_constraint() {
        // The '1' sees two flags: locally inconsistent, silently dropped.
        let b = board("1X\nX?", 2);
        let result = solve(&b, &SolverConfig::default());
        assert!(result.constraints.is_empty());
        verify_result(&b, &result);
    }

    #[test]
    fn test_subset_comparison_deduces_safe_cell() {
        // The '2' already has one flag, so (0,2) carries its last mine; the
        // '1' then has its mine accounted for, which only the subset
        // relation {(0,2)} < {(0,0),(0,2)} can see.
        let b = board("?1?2X", 2);

        let without = solve(
            &b,
            &SolverConfig {
                enable_constraint_comparison: false,
                ..SolverConfig::default()
            },
        );
        assert!(!without.safe_cells.contains(&pos(0, 0)));

        let with = solve(&b, &SolverConfig::default());
        assert!(with.mines.contains(&pos(0, 2)));
        assert!(with.safe_cells.contains(&pos(0, 0)));
        verify_result(&b, &with);
    }

    #[test]
    fn test_fifty_fifty_probabilities() {
        let b = board("?1?", 1);
        let result = solve(&b, &SolverConfig::default());
        assert!(result.safe_cells.is_empty());
        assert!(result.mines.is_empty());
        assert_eq!(result.probabilities.len(), 2);
        assert!((result.probabilities[&pos(0, 0)] - 0.5).abs() < 1e-12);
        assert!((result.probabilities[&pos(0, 2)] - 0.5).abs() < 1e-12);
        verify_result(&b, &result);
    }

    #[test]
    fn test_interior_cells_share_leftover_mines() {
        // (0,1) is a forced mine; one of the two declared mines remains for
        // the two interior cells.
        let b = board("1???", 2);
        let result = solve(&b, &SolverConfig::default());
        assert!(result.mines.contains(&pos(0, 1)));

        // Classified cells get no probability entry.
        assert!(!result.probabilities.contains_key(&pos(0, 1)));
        assert!((result.probabilities[&pos(0, 2)] - 0.5).abs() < 1e-12);
        assert!((result.probabilities[&pos(0, 3)] - 0.5).abs() < 1e-12);
        verify_result(&b, &result);
    }

    #[test]
    fn test_uniform_prior_without_constraints() {
        let b = Board::new(3, 3, 3);
        let result = solve(&b, &SolverConfig::default());
        assert_eq!(result.probabilities.len(), 9);
        for &p in result.probabilities.values() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        verify_result(&b, &result);
    }

    #[test]
    fn test_impossible_mine_total_is_unsolvable() {
        // The '1' demands a mine but the board declares zero mines.
        let b = board("1?", 0);
        let result = solve(&b, &SolverConfig::default());
        assert!(!result.is_solvable);
        assert!(result.probabilities.is_empty());
        // Propagation's best-effort deduction still stands.
        assert!(result.mines.contains(&pos(0, 1)));
        verify_result(&b, &result);
    }

    #[test]
    fn test_contradictory_numbers_stay_disjoint() {
        // (0,1) is safe per the '0' and a mine per the '1'; first
        // classification wins and the sets stay disjoint.
        let b = board("0?1", 1);
        let result = solve(&b, &SolverConfig::default());
        assert!(result.safe_cells.is_disjoint(&result.mines));
        assert!(!result.is_solvable);
        verify_result(&b, &result);
    }

    #[test]
    fn test_oversized_boundary_uses_heuristic() {
        let b = board("?1?", 1);
        let config = SolverConfig {
            max_enumeration_cells: 1,
            ..SolverConfig::default()
        };
        let result = solve(&b, &config);
        assert!(result.is_solvable);
        assert!((result.probabilities[&pos(0, 0)] - 0.15).abs() < 1e-12);
        assert!((result.probabilities[&pos(0, 2)] - 0.15).abs() < 1e-12);
        verify_result(&b, &result);
    }

    #[test]
    fn test_probability_stage_can_be_disabled() {
        let b = board("?1?", 1);
        let config = SolverConfig {
            enable_probability: false,
            ..SolverConfig::default()
        };
        let result = solve(&b, &config);
        assert!(result.probabilities.is_empty());
        assert!(result.is_solvable);
    }

    #[test]
    fn test_zero_comparer_iterations_makes_no_comparisons() {
        // Same board as the subset test; a zero cap means the comparison
        // stage runs no passes and deduces nothing.
        let b = board("?1?2X", 2);
        let config = SolverConfig {
            max_comparer_iterations: 0,
            ..SolverConfig::default()
        };
        let result = solve(&b, &config);
        assert!(!result.safe_cells.contains(&pos(0, 0)));
        verify_result(&b, &result);
    }

    #[test]
    fn test_flagging_still_works_without_comparison() {
        let b = board("1?", 1);
        let config = SolverConfig {
            enable_constraint_comparison: false,
            ..SolverConfig::default()
        };
        let result = solve(&b, &config);
        assert!(result.mines.contains(&pos(0, 1)));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let b = board("12?\n??X\n???", 4);
        let config = SolverConfig::default();
        assert_eq!(solve(&b, &config), solve(&b, &config));
    }

    #[test]
    fn test_hint_prefers_safe_then_mine_then_guess() {
        let safe_board = board("0??\n???", 5);
        assert!(matches!(
            hint(&safe_board, &SolverConfig::default()),
            Some(Hint::Safe(_))
        ));

        let mine_board = board("1?", 1);
        assert_eq!(
            hint(&mine_board, &SolverConfig::default()),
            Some(Hint::Mine(pos(0, 1)))
        );

        let guess_board = board("?1?", 1);
        match hint(&guess_board, &SolverConfig::default()) {
            Some(Hint::Guess { cell, probability }) => {
                // Equal probabilities tie-break to the smallest position.
                assert_eq!(cell, pos(0, 0));
                assert!((probability - 0.5).abs() < 1e-12);
            }
            other => panic!("expected a guess hint, got {other:?}"),
        }

        let empty = Board::new(2, 2, 0);
        let silent = SolverConfig {
            enable_probability: false,
            ..SolverConfig::default()
        };
        assert_eq!(hint(&empty, &silent), None);
    }

    #[test]
    fn test_assess_move_classifications() {
        let b = board("1?", 1);
        assert_eq!(
            assess_move(&b, pos(0, 1), true, &SolverConfig::default()),
            MoveAssessment::GuaranteedMine
        );

        let b = board("0??\n???", 5);
        assert_eq!(
            assess_move(&b, pos(0, 1), false, &SolverConfig::default()),
            MoveAssessment::ProvablySafe
        );
        assert_eq!(
            assess_move(&b, pos(1, 2), false, &SolverConfig::default()),
            MoveAssessment::SaferMoveAvailable
        );

        let b = board("?1?", 1);
        match assess_move(&b, pos(0, 0), false, &SolverConfig::default()) {
            MoveAssessment::ReasonableGuess(p) => assert!((p - 0.5).abs() < 1e-12),
            other => panic!("expected a reasonable guess, got {other:?}"),
        }
        match assess_move(&b, pos(0, 0), true, &SolverConfig::default()) {
            MoveAssessment::UnluckyGuess(p) => assert!((p - 0.5).abs() < 1e-12),
            other => panic!("expected an unlucky guess, got {other:?}"),
        }
    }

    #[test]
    fn test_random_boards_uphold_invariants() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..60 {
            let rows = rng.random_range(3..=7);
            let cols = rng.random_range(3..=7);
            let total_mines = rng.random_range(1..=6);

            // Lay mines, then reveal a random sample of the safe cells with
            // their true counts and flag some of the mines.
            let mut mine_positions = HashSet::new();
            while mine_positions.len() < total_mines {
                mine_positions.insert(pos(rng.random_range(0..rows), rng.random_range(0..cols)));
            }

            let mut b = Board::new(rows, cols, total_mines);
            for p in b.positions().collect::<Vec<_>>() {
                if mine_positions.contains(&p) {
                    if rng.random_bool(0.3) {
                        b.set(p, CellState::Flagged);
                    }
                } else if rng.random_bool(0.4) {
                    let count = p
                        .neighbors(rows, cols)
                        .filter(|n| mine_positions.contains(n))
                        .count();
                    b.set(p, CellState::Revealed(count as u8));
                }
            }

            let result = solve(&b, &SolverConfig::default());
            verify_result(&b, &result);

            // The board reflects a real layout, so it must be satisfiable,
            // and deductions must agree with that layout.
            assert!(result.is_solvable);
            for &cell in &result.safe_cells {
                assert!(
                    !mine_positions.contains(&cell),
                    "true mine {cell:?} marked safe"
                );
            }
            for &cell in &result.mines {
                assert!(
                    mine_positions.contains(&cell),
                    "safe cell {cell:?} marked as mine"
                );
            }
        }
    }
}
