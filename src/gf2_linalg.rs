//! GF(2) linear solver on bit-packed augmented matrices.

use fixedbitset::FixedBitSet;

/// Exhaustive minimum-weight search is bounded by this many free variables.
///
/// Beyond the bound the particular solution (all free variables zero) is
/// returned. The finders keep the free count far below it.
const MAX_FREE_ENUM: u32 = 24;

/// Solves `A x = b` over GF(2) for one or more right-hand sides.
///
/// Attaches to a caller-built augmented matrix `[A | B]` whose last `neqs`
/// columns are the right-hand sides. Gauss-Jordan elimination runs once,
/// lazily, on the first solve; individual equations are then answered by
/// back substitution.
pub struct GF2Solver {
    work: Vec<FixedBitSet>,
    rows: usize,
    cols: usize,
    neqs: usize,
    /// Pivot column of row `r` for `r < rank`.
    pivots: Vec<usize>,
    eliminated: bool,
}

impl GF2Solver {
    /// Adopts `work` as the augmented matrix.
    ///
    /// # Panics
    ///
    /// If `work` is empty, rows have unequal widths, or the width does not
    /// exceed `neqs`.
    pub fn attach(work: Vec<FixedBitSet>, neqs: usize) -> Self {
        let rows = work.len();
        assert!(rows > 0, "need at least one row");
        let width = work[0].len();
        assert!(work.iter().all(|row| row.len() == width), "ragged rows");
        assert!(width > neqs, "no coefficient columns");
        Self {
            work,
            rows,
            cols: width - neqs,
            neqs,
            pivots: Vec::new(),
            eliminated: false,
        }
    }

    /// Returns the working buffer for reuse.
    pub fn detach(self) -> Vec<FixedBitSet> {
        self.work
    }

    pub fn rank(&mut self) -> usize {
        if !self.eliminated {
            self.eliminate();
        }
        self.pivots.len()
    }

    /// `work[dst] ^= work[src]`, right-hand sides included.
    fn xor_rows(work: &mut [FixedBitSet], src: usize, dst: usize) {
        debug_assert_ne!(src, dst);
        if src < dst {
            let (head, tail) = work.split_at_mut(dst);
            tail[0].symmetric_difference_with(&head[src]);
        } else {
            let (head, tail) = work.split_at_mut(src);
            head[dst].symmetric_difference_with(&tail[0]);
        }
    }

    /// Reduces the coefficient part to reduced row-echelon form.
    fn eliminate(&mut self) {
        let mut rank = 0;
        for col in 0..self.cols {
            let Some(pivot) = (rank..self.rows).find(|&r| self.work[r].contains(col)) else {
                continue;
            };
            self.work.swap(pivot, rank);
            for r in 0..self.rows {
                if r != rank && self.work[r].contains(col) {
                    Self::xor_rows(&mut self.work, rank, r);
                }
            }
            self.pivots.push(col);
            rank += 1;
            if rank == self.rows {
                break;
            }
        }
        self.eliminated = true;
    }

    /// Value of `x[pivot_col(r)]` under the free-variable assignment `mask`.
    fn pivot_bit(&self, r: usize, bcol: usize, free: &[usize], mask: u64) -> bool {
        let mut bit = self.work[r].contains(bcol);
        for (t, &c) in free.iter().enumerate() {
            if (mask >> t) & 1 == 1 && self.work[r].contains(c) {
                bit = !bit;
            }
        }
        bit
    }

    /// Solves equation `eq`, writing the solution into `x`.
    ///
    /// Returns `false` iff the equation is inconsistent. Among all solutions
    /// the minimum-Hamming-weight one is chosen; ties break to the smallest
    /// free-variable assignment, free columns ascending, variable `t` on bit
    /// `t` of the enumeration mask. Deterministic.
    pub fn solve_in_place(&mut self, x: &mut FixedBitSet, eq: usize) -> bool {
        assert!(eq < self.neqs, "equation index out of range");
        if !self.eliminated {
            self.eliminate();
        }
        let rank = self.pivots.len();
        let bcol = self.cols + eq;
        if (rank..self.rows).any(|r| self.work[r].contains(bcol)) {
            return false;
        }
        if x.len() == self.cols {
            x.clear();
        } else {
            *x = FixedBitSet::with_capacity(self.cols);
        }
        let free = (0..self.cols)
            .filter(|c| !self.pivots.contains(c))
            .collect::<Vec<_>>();
        let nfree = free.len() as u32;
        let mut best = 0_u64;
        if 0 < nfree && nfree <= MAX_FREE_ENUM {
            let mut best_weight = usize::MAX;
            for mask in 0..1_u64 << nfree {
                let mut weight = mask.count_ones() as usize;
                for r in 0..rank {
                    weight += usize::from(self.pivot_bit(r, bcol, &free, mask));
                }
                if weight < best_weight {
                    best_weight = weight;
                    best = mask;
                }
            }
        }
        for (t, &c) in free.iter().enumerate() {
            if (best >> t) & 1 == 1 {
                x.insert(c);
            }
        }
        for r in 0..rank {
            if self.pivot_bit(r, bcol, &free, best) {
                x.insert(self.pivots[r]);
            }
        }
        true
    }
}
