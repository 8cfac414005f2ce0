//! Maximally-delayed Pauli flow algorithm.

use std::iter;

use crate::common::{self, Graph, InPlaceSetOp, Layer, Nodes, OrderedNodes};
use crate::gf2_linalg::GF2Solver;
use crate::gflow::{self, BranchKind, Plane, BRANCH_XY, BRANCH_YZ, BRANCH_ZX};
use crate::validate::{self, FlowError, OpenGraphError};
use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use num_derive::FromPrimitive;
use num_enum::IntoPrimitive;

/// Measurement plane or Pauli axis.
///
/// The discriminants are a stable part of the interface.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PPlane {
    XY = 0,
    YZ = 1,
    ZX = 2,
    X = 3,
    Y = 4,
    Z = 5,
}

/// Measurement plane or Pauli axis for each node in `V \ O`.
pub type PPlanes = HashMap<usize, PPlane>;
/// Pauli flow function. Pauli-measured nodes may correct themselves.
pub type PFlow = HashMap<usize, Nodes>;

macro_rules! matching_nodes {
    ($src:expr, $p:pat) => {
        $src.iter()
            .filter_map(|(k, &v)| if let $p = v { Some(k) } else { None })
            .copied()
            .collect::<Nodes>()
    };
}

fn check_initial_pflow(layer: &Layer, oset: &Nodes) -> anyhow::Result<()> {
    for &u in oset {
        anyhow::ensure!(layer[u] == 0, "cannot be maximally-delayed due to {u}");
    }
    Ok(())
}

/// Branches tried for each label, in order.
///
/// A Pauli measurement may be corrected like any plane containing its axis,
/// so its branch list is the union of those planes' branches.
fn branch_order(pp: PPlane) -> &'static [BranchKind] {
    match pp {
        PPlane::XY => &[BRANCH_XY],
        PPlane::YZ => &[BRANCH_YZ],
        PPlane::ZX => &[BRANCH_ZX],
        PPlane::X => &[BRANCH_XY, BRANCH_ZX],
        PPlane::Y => &[BRANCH_XY, BRANCH_YZ, BRANCH_ZX],
        PPlane::Z => &[BRANCH_YZ, BRANCH_ZX],
    }
}

fn index_of(set: &OrderedNodes) -> HashMap<usize, usize> {
    set.iter().enumerate().map(|(i, &v)| (v, i)).collect()
}

/// Row and column bookkeeping of one candidate system.
///
/// Rows split into an upper parity block (nodes whose odd-neighborhood
/// membership is constrained) and a lower block holding the closure
/// condition `w ∈ f(u) ⇔ w ∈ Odd(f(u))` for unordered Pauli-Y nodes.
struct SystemShape {
    nrows_upper: usize,
    ncols: usize,
    upper2i: HashMap<usize, usize>,
    lower2i: HashMap<usize, usize>,
    col2i: HashMap<usize, usize>,
    /// Column index to node.
    tab: Vec<usize>,
}

fn init_work_upper_co(
    work: &mut [FixedBitSet],
    g: &Graph,
    rowset: &OrderedNodes,
    col2i: &HashMap<usize, usize>,
) {
    for (r, &v) in rowset.iter().enumerate() {
        for &w in g[v].iter() {
            if let Some(&c) = col2i.get(&w) {
                work[r].insert(c);
            }
        }
    }
}

fn init_work_lower_co(
    work: &mut [FixedBitSet],
    g: &Graph,
    rowset: &OrderedNodes,
    col2i: &HashMap<usize, usize>,
) {
    for (r, &v) in rowset.iter().enumerate() {
        // Diagonal element, present only while v is a correction candidate
        if let Some(&c) = col2i.get(&v) {
            work[r].insert(c);
        }
        for &w in g[v].iter() {
            if let Some(&c) = col2i.get(&w) {
                work[r].insert(c);
            }
        }
    }
}

/// Initializes the right-hand side of the upper block.
///
/// # Note
///
/// - `K` specifies the branch kind.
///   - `0`: `XY` branch.
///   - `1`: `YZ` branch.
///   - `2`: `ZX` branch.
fn init_work_upper_rhs<const K: BranchKind>(
    work: &mut [FixedBitSet],
    u: usize,
    g: &Graph,
    rowset2i: &HashMap<usize, usize>,
    ncols: usize,
) {
    debug_assert!(rowset2i.contains_key(&u));
    let c = ncols;
    if K != BRANCH_YZ {
        // = u
        work[rowset2i[&u]].insert(c);
    }
    if K == BRANCH_XY {
        return;
    }
    // Include u
    for &v in g[u].iter() {
        if let Some(&r) = rowset2i.get(&v) {
            work[r].toggle(c);
        }
    }
}

fn init_work_lower_rhs<const K: BranchKind>(
    work: &mut [FixedBitSet],
    u: usize,
    g: &Graph,
    rowset2i: &HashMap<usize, usize>,
    ncols: usize,
) {
    if K == BRANCH_XY {
        return;
    }
    let c = ncols;
    for &v in g[u].iter() {
        if let Some(&r) = rowset2i.get(&v) {
            work[r].toggle(c);
        }
    }
}

fn decode_solution<const K: BranchKind>(u: usize, x: &FixedBitSet, tab: &[usize]) -> Nodes {
    let mut fu = x.ones().map(|c| tab[c]).collect::<Nodes>();
    if K != BRANCH_XY {
        fu.insert(u);
    }
    fu
}

/// Builds the system for one branch and solves it.
///
/// Solving reduces the work matrix in place, so each attempt rebuilds the
/// coefficient blocks from the adjacency before writing its right-hand side.
fn try_branch<const K: BranchKind>(
    u: usize,
    g: &Graph,
    rowset_upper: &OrderedNodes,
    rowset_lower: &OrderedNodes,
    work: &mut Vec<FixedBitSet>,
    x: &mut FixedBitSet,
    shape: &SystemShape,
) -> Option<Nodes> {
    common::zerofill(work, shape.ncols + 1);
    init_work_upper_co(&mut work[..shape.nrows_upper], g, rowset_upper, &shape.col2i);
    init_work_lower_co(&mut work[shape.nrows_upper..], g, rowset_lower, &shape.col2i);
    init_work_upper_rhs::<K>(&mut work[..shape.nrows_upper], u, g, &shape.upper2i, shape.ncols);
    init_work_lower_rhs::<K>(&mut work[shape.nrows_upper..], u, g, &shape.lower2i, shape.ncols);
    let mut solver = GF2Solver::attach(std::mem::take(work), 1);
    let found = solver.solve_in_place(x, 0);
    *work = solver.detach();
    found.then(|| decode_solution::<K>(u, x, &shape.tab))
}

/// Builds the system for `u` and tries its branches in order.
fn solve_one(
    g: &Graph,
    pp: PPlane,
    u: usize,
    rowset_upper: &OrderedNodes,
    rowset_lower: &OrderedNodes,
    colset: &OrderedNodes,
    work: &mut Vec<FixedBitSet>,
) -> Option<Nodes> {
    let nrows_upper = rowset_upper.len();
    let nrows_lower = rowset_lower.len();
    let ncols = colset.len();
    if nrows_upper + nrows_lower == 0 || ncols == 0 {
        return None;
    }
    let shape = SystemShape {
        nrows_upper,
        ncols,
        upper2i: index_of(rowset_upper),
        lower2i: index_of(rowset_lower),
        col2i: index_of(colset),
        tab: colset.iter().copied().collect(),
    };
    // No monotonicity guarantees across rounds
    work.resize_with(nrows_upper + nrows_lower, || {
        FixedBitSet::with_capacity(ncols + 1)
    });
    let mut x = FixedBitSet::with_capacity(ncols);
    for &k in branch_order(pp) {
        let fu = match k {
            BRANCH_XY => {
                try_branch::<BRANCH_XY>(u, g, rowset_upper, rowset_lower, work, &mut x, &shape)
            }
            BRANCH_YZ => {
                try_branch::<BRANCH_YZ>(u, g, rowset_upper, rowset_lower, work, &mut x, &shape)
            }
            _ => try_branch::<BRANCH_ZX>(u, g, rowset_upper, rowset_lower, work, &mut x, &shape),
        };
        if fu.is_some() {
            return fu;
        }
    }
    None
}

fn plane_of(pp: PPlane) -> Plane {
    match pp {
        PPlane::XY => Plane::XY,
        PPlane::YZ => Plane::YZ,
        PPlane::ZX => Plane::ZX,
        _ => unreachable!("Pauli label has no plane"),
    }
}

/// Computes the maximally-delayed Pauli flow, if any.
///
/// Pauli X/Y nodes serve as correction candidates before they are solved,
/// and Pauli nodes may share layer 0 with the outputs; the extra round
/// `l = 0` runs before the outputs join the candidate columns. Without any
/// Pauli label the search delegates to the gflow engine.
pub fn find(
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    pplane: &PPlanes,
) -> Result<Option<(PFlow, Layer)>, OpenGraphError> {
    validate::check_graph(g, iset, oset)?;
    validate::check_measurement(g.len(), oset, pplane)?;
    if !pplane
        .values()
        .any(|pp| matches!(pp, PPlane::X | PPlane::Y | PPlane::Z))
    {
        tracing::warn!("no Pauli measurement found, delegating to the gflow engine");
        let plane = pplane
            .iter()
            .map(|(&u, &pp)| (u, plane_of(pp)))
            .collect::<gflow::Planes>();
        return gflow::find(g, iset, oset, &plane);
    }
    let yset = matching_nodes!(pplane, PPlane::Y);
    let xyset = matching_nodes!(pplane, PPlane::X | PPlane::Y);
    let yzset = matching_nodes!(pplane, PPlane::Y | PPlane::Z);
    debug_assert!(yset.is_disjoint(oset));
    debug_assert!(xyset.is_disjoint(oset));
    debug_assert!(yzset.is_disjoint(oset));
    let n = g.len();
    let vset = (0..n).collect::<Nodes>();
    let mut cset = Nodes::new();
    let mut ocset = vset.difference(oset).copied().collect::<Nodes>();
    let mut rowset_upper = vset.difference(&yzset).copied().collect::<OrderedNodes>();
    let mut rowset_lower = yset.iter().copied().collect::<OrderedNodes>();
    let mut colset = xyset.difference(iset).copied().collect::<OrderedNodes>();
    let mut f = PFlow::with_capacity(ocset.len());
    let mut layer = vec![0_usize; n];
    // Working memory, reused across rounds
    let mut work: Vec<FixedBitSet> = Vec::new();
    for l in 0_usize.. {
        cset.clear();
        let todo = ocset.iter().copied().collect::<OrderedNodes>();
        for &u in &todo {
            // Exclude u from the candidate sets while its own system is up
            let fresh_upper = rowset_upper.insert(u);
            let from_lower = rowset_lower.remove(&u);
            let from_col = colset.remove(&u);
            let fu = solve_one(
                g,
                pplane[&u],
                u,
                &rowset_upper,
                &rowset_lower,
                &colset,
                &mut work,
            );
            if fresh_upper {
                rowset_upper.remove(&u);
            }
            if from_lower {
                rowset_lower.insert(u);
            }
            if from_col {
                debug_assert!(!iset.contains(&u));
                colset.insert(u);
            }
            if let Some(fu) = fu {
                f.insert(u, fu);
                layer[u] = l;
                cset.insert(u);
            }
        }
        if l == 0 {
            rowset_upper.difference_with(oset);
            rowset_lower.difference_with(oset);
            colset.union_with(oset.difference(iset));
        } else if cset.is_empty() {
            break;
        }
        if !cset.is_empty() {
            tracing::debug!(round = l, solved = cset.len(), "pflow layer");
        }
        ocset.difference_with(&cset);
        rowset_upper.difference_with(&cset);
        rowset_lower.difference_with(&cset);
        colset.union_with(cset.difference(iset));
    }
    if ocset.is_empty() {
        if cfg!(debug_assertions) {
            let f_flatiter = f
                .iter()
                .flat_map(|(i, fi)| Iterator::zip(iter::repeat(i), fi.iter()));
            common::check_domain(f_flatiter, &vset, iset, oset).unwrap();
            check_initial_pflow(&layer, oset).unwrap();
        }
        Ok(Some((f, layer)))
    } else {
        Ok(None)
    }
}

/// Checks a Pauli-flow witness against the Pauli conditions.
pub fn verify(
    f: &PFlow,
    layer: &Layer,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    pplane: &PPlanes,
) -> Result<(), FlowError> {
    validate::check_graph(g, iset, oset)?;
    validate::check_measurement(g.len(), oset, pplane)?;
    if layer.len() != g.len() {
        return Err(OpenGraphError::BadLayerSpec {
            expected: g.len(),
            actual: layer.len(),
        }
        .into());
    }
    validate::verify_core(validate::FlowKind::Pauli, g, iset, oset, pplane, f, layer)?;
    Ok(())
}
