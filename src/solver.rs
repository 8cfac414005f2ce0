//! Public batched interface to the GF(2) solver.

use fixedbitset::FixedBitSet;
use thiserror::Error;

use crate::gf2_linalg::GF2Solver;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolverError {
    #[error("{name} must be a non-empty rectangular matrix")]
    BadShape { name: &'static str },
    #[error("inconsistent number of rows in a ({a_rows}) and b ({b_rows})")]
    RowMismatch { a_rows: usize, b_rows: usize },
    #[error("{name}[{row}][{col}] is not 0 or 1")]
    NonBinaryEntry {
        name: &'static str,
        row: usize,
        col: usize,
    },
}

/// Validates shape and entries, returning the column count.
fn arraycheck(mat: &[Vec<u8>], name: &'static str) -> Result<usize, SolverError> {
    let cols = mat.first().map_or(0, Vec::len);
    if cols == 0 || mat.iter().any(|row| row.len() != cols) {
        return Err(SolverError::BadShape { name });
    }
    for (r, row) in mat.iter().enumerate() {
        for (c, &entry) in row.iter().enumerate() {
            if entry > 1 {
                return Err(SolverError::NonBinaryEntry { name, row: r, col: c });
            }
        }
    }
    Ok(cols)
}

/// Solves the linear equations `a x = b` over GF(2).
///
/// `a` has shape `(rows, cols)` and `b` has shape `(rows, neqs)`, one
/// equation per column. The result holds, for each equation, either the
/// minimum-Hamming-weight solution or `None` when no solution exists.
///
/// Deterministic even when `a` is singular: ties between minimum-weight
/// solutions break to the smallest free-variable assignment, free columns
/// ascending.
pub fn solve(a: &[Vec<u8>], b: &[Vec<u8>]) -> Result<Vec<Option<Vec<bool>>>, SolverError> {
    let cols = arraycheck(a, "a")?;
    let neqs = arraycheck(b, "b")?;
    if a.len() != b.len() {
        return Err(SolverError::RowMismatch {
            a_rows: a.len(),
            b_rows: b.len(),
        });
    }
    let work = Iterator::zip(a.iter(), b.iter())
        .map(|(arow, brow)| {
            let mut row = FixedBitSet::with_capacity(cols + neqs);
            arow.iter().enumerate().for_each(|(c, &entry)| {
                if entry == 1 {
                    row.insert(c);
                }
            });
            brow.iter().enumerate().for_each(|(c, &entry)| {
                if entry == 1 {
                    row.insert(cols + c);
                }
            });
            row
        })
        .collect::<Vec<_>>();
    let mut solver = GF2Solver::attach(work, neqs);
    let mut x = FixedBitSet::with_capacity(cols);
    let solutions = (0..neqs)
        .map(|eq| {
            solver
                .solve_in_place(&mut x, eq)
                .then(|| (0..cols).map(|c| x.contains(c)).collect())
        })
        .collect();
    Ok(solutions)
}

/// Solves `a x = b` for a single right-hand-side vector.
pub fn solve_vec(a: &[Vec<u8>], b: &[u8]) -> Result<Option<Vec<bool>>, SolverError> {
    let columns = b.iter().map(|&entry| vec![entry]).collect::<Vec<_>>();
    let mut ret = solve(a, &columns)?;
    Ok(ret.pop().flatten())
}
