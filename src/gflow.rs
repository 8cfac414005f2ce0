//! Maximally-delayed generalized flow algorithm.

use std::iter;

use crate::common::{self, Graph, InPlaceSetOp, Layer, Nodes, OrderedNodes};
use crate::gf2_linalg::GF2Solver;
use crate::pflow::PPlane;
use crate::validate::{self, FlowError, FlowKind, OpenGraphError};
use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use num_derive::FromPrimitive;
use num_enum::IntoPrimitive;

/// Measurement plane of a non-Pauli measurement.
///
/// The discriminants are a stable part of the interface.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Plane {
    XY = 0,
    YZ = 1,
    ZX = 2,
}

/// Measurement plane for each node in `V \ O`.
pub type Planes = HashMap<usize, Plane>;
/// Gflow function. Each measured node is corrected by a set of nodes.
pub type GFlow = HashMap<usize, Nodes>;

fn check_initial_gflow(layer: &Layer, oset: &Nodes) -> anyhow::Result<()> {
    for (u, &lu) in layer.iter().enumerate() {
        anyhow::ensure!(
            (lu == 0) == oset.contains(&u),
            "cannot be maximally-delayed due to {u}"
        );
    }
    Ok(())
}

pub(crate) type BranchKind = u8;
pub(crate) const BRANCH_XY: BranchKind = 0;
pub(crate) const BRANCH_YZ: BranchKind = 1;
pub(crate) const BRANCH_ZX: BranchKind = 2;

/// Writes the adjacency submatrix `rowset × colset` into the work rows.
fn init_work_co(
    work: &mut [FixedBitSet],
    g: &Graph,
    rowset: &OrderedNodes,
    colset2i: &HashMap<usize, usize>,
) {
    for (r, &v) in rowset.iter().enumerate() {
        for &w in g[v].iter() {
            if let Some(&c) = colset2i.get(&w) {
                work[r].insert(c);
            }
        }
    }
}

/// Initializes the right-hand side of equation `ieq` targeting `u`.
///
/// # Note
///
/// - `K` specifies the branch kind.
///   - `0`: `XY` branch (`Odd(f(u)) = {u}`, `u ∉ f(u)`).
///   - `1`: `YZ` branch (`Odd(f(u)) = ∅`, `u ∈ f(u)`).
///   - `2`: `ZX` branch (`Odd(f(u)) = {u}`, `u ∈ f(u)`).
///
/// Relations are restricted to the unsolved rows; `u ∈ f(u)` enters through
/// the `N(u)` toggles and the reinsertion in [`decode_solution`].
fn init_work_rhs<const K: BranchKind>(
    work: &mut [FixedBitSet],
    u: usize,
    ieq: usize,
    g: &Graph,
    rowset2i: &HashMap<usize, usize>,
    ncols: usize,
) {
    let c = ncols + ieq;
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

fn decode_solution(plane: Plane, u: usize, x: &FixedBitSet, tab: &[usize]) -> Nodes {
    let mut fu = x.ones().map(|c| tab[c]).collect::<Nodes>();
    if plane != Plane::XY {
        fu.insert(u);
    }
    fu
}

/// Computes the maximally-delayed generalized flow, if any.
///
/// Each round solves one batched GF(2) system whose rows are the unsolved
/// nodes and whose columns are the solved non-input nodes; every solvable
/// node joins the round's layer simultaneously.
pub fn find(
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    plane: &Planes,
) -> Result<Option<(GFlow, Layer)>, OpenGraphError> {
    validate::check_graph(g, iset, oset)?;
    validate::check_measurement(g.len(), oset, plane)?;
    let n = g.len();
    let vset = (0..n).collect::<Nodes>();
    let mut cset = Nodes::new();
    let mut ocset = vset.difference(oset).copied().collect::<Nodes>();
    let mut colset = oset.difference(iset).copied().collect::<OrderedNodes>();
    let mut f = GFlow::with_capacity(ocset.len());
    let mut layer = vec![0_usize; n];
    // Working memory, reused across rounds
    let mut work: Vec<FixedBitSet> = Vec::new();
    let mut tab = Vec::new();
    for l in 1_usize.. {
        cset.clear();
        let rowset = ocset.iter().copied().collect::<OrderedNodes>();
        let nrows = rowset.len();
        let ncols = colset.len();
        if nrows == 0 || ncols == 0 {
            break;
        }
        let rowset2i = rowset
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect::<HashMap<_, _>>();
        let colset2i = colset
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect::<HashMap<_, _>>();
        // One equation per unsolved node
        work.resize_with(nrows, || FixedBitSet::with_capacity(ncols + nrows));
        common::zerofill(&mut work, ncols + nrows);
        init_work_co(&mut work, g, &rowset, &colset2i);
        for (ieq, &u) in rowset.iter().enumerate() {
            match plane[&u] {
                Plane::XY => init_work_rhs::<BRANCH_XY>(&mut work, u, ieq, g, &rowset2i, ncols),
                Plane::YZ => init_work_rhs::<BRANCH_YZ>(&mut work, u, ieq, g, &rowset2i, ncols),
                Plane::ZX => init_work_rhs::<BRANCH_ZX>(&mut work, u, ieq, g, &rowset2i, ncols),
            }
        }
        tab.clear();
        tab.extend(colset.iter().copied());
        let mut solver = GF2Solver::attach(work, nrows);
        let mut x = FixedBitSet::with_capacity(ncols);
        for (ieq, &u) in rowset.iter().enumerate() {
            if solver.solve_in_place(&mut x, ieq) {
                f.insert(u, decode_solution(plane[&u], u, &x, &tab));
                layer[u] = l;
                cset.insert(u);
            }
        }
        work = solver.detach();
        if cset.is_empty() {
            break;
        }
        tracing::debug!(round = l, solved = cset.len(), "gflow layer");
        ocset.difference_with(&cset);
        colset.union_with(cset.difference(iset));
    }
    if ocset.is_empty() {
        if cfg!(debug_assertions) {
            let f_flatiter = f
                .iter()
                .flat_map(|(i, fi)| Iterator::zip(iter::repeat(i), fi.iter()));
            common::check_domain(f_flatiter, &vset, iset, oset).unwrap();
            check_initial_gflow(&layer, oset).unwrap();
        }
        Ok(Some((f, layer)))
    } else {
        Ok(None)
    }
}

/// Checks a gflow witness against the plane conditions.
pub fn verify(
    f: &GFlow,
    layer: &Layer,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    plane: &Planes,
) -> Result<(), FlowError> {
    validate::check_graph(g, iset, oset)?;
    validate::check_measurement(g.len(), oset, plane)?;
    if layer.len() != g.len() {
        return Err(OpenGraphError::BadLayerSpec {
            expected: g.len(),
            actual: layer.len(),
        }
        .into());
    }
    let labels = plane
        .iter()
        .map(|(&u, &p)| {
            let pp = match p {
                Plane::XY => PPlane::XY,
                Plane::YZ => PPlane::YZ,
                Plane::ZX => PPlane::ZX,
            };
            (u, pp)
        })
        .collect::<HashMap<_, _>>();
    validate::verify_core(FlowKind::General, g, iset, oset, &labels, f, layer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodeset;
    use crate::test_utils::{self, TestCase};
    use crate::validate::FlowValidationError;

    macro_rules! planes {
        ($($u:literal: $v:expr),*) => {
            Planes::from_iter([$(($u, $v)),*].iter().copied())
        };
    }

    fn found(case: &TestCase, plane: &Planes) -> (GFlow, Layer) {
        let TestCase { g, iset, oset } = case;
        let ret = find(g, iset, oset, plane).unwrap().unwrap();
        verify(&ret.0, &ret.1, g, iset, oset, plane).unwrap();
        ret
    }

    #[test]
    fn test_find_case0() {
        let case = test_utils::CASE0.get_or_init(test_utils::case0);
        let (f, layer) = found(case, &planes! {});
        assert!(f.is_empty());
        assert_eq!(layer, vec![0, 0]);
    }

    #[test]
    fn test_find_case1() {
        let case = test_utils::CASE1.get_or_init(test_utils::case1);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::XY,
            3: Plane::XY
        };
        let (f, layer) = found(case, &plane);
        assert_eq!(f[&0], nodeset![1]);
        assert_eq!(f[&1], nodeset![2]);
        assert_eq!(f[&2], nodeset![3]);
        assert_eq!(f[&3], nodeset![4]);
        assert_eq!(layer, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_find_case2() {
        let case = test_utils::CASE2.get_or_init(test_utils::case2);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::XY,
            3: Plane::XY
        };
        let (f, layer) = found(case, &plane);
        assert_eq!(f[&0], nodeset![2]);
        assert_eq!(f[&1], nodeset![3]);
        assert_eq!(f[&2], nodeset![4]);
        assert_eq!(f[&3], nodeset![5]);
        assert_eq!(layer, vec![2, 2, 1, 1, 0, 0]);
    }

    #[test]
    fn test_find_case3() {
        let case = test_utils::CASE3.get_or_init(test_utils::case3);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::XY
        };
        let (f, layer) = found(case, &plane);
        assert_eq!(f[&0], nodeset![4, 5]);
        assert_eq!(f[&1], nodeset![3, 4, 5]);
        assert_eq!(f[&2], nodeset![3, 5]);
        assert_eq!(layer, vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_find_case4() {
        let case = test_utils::CASE4.get_or_init(test_utils::case4);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::ZX,
            3: Plane::YZ
        };
        let (f, layer) = found(case, &plane);
        assert_eq!(f[&0], nodeset![2]);
        assert_eq!(f[&1], nodeset![5]);
        assert_eq!(f[&2], nodeset![2, 4]);
        assert_eq!(f[&3], nodeset![3]);
        assert_eq!(layer, vec![2, 2, 1, 1, 0, 0]);
    }

    #[test]
    fn test_find_case5() {
        let TestCase { g, iset, oset } = test_utils::CASE5.get_or_init(test_utils::case5);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY
        };
        assert!(find(g, iset, oset, &plane).unwrap().is_none());
    }

    #[test]
    fn test_find_case6() {
        let TestCase { g, iset, oset } = test_utils::CASE6.get_or_init(test_utils::case6);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::XY,
            3: Plane::XY
        };
        assert!(find(g, iset, oset, &plane).unwrap().is_none());
    }

    #[test]
    fn test_find_case7() {
        let TestCase { g, iset, oset } = test_utils::CASE7.get_or_init(test_utils::case7);
        let plane = planes! {
            0: Plane::YZ,
            1: Plane::ZX,
            2: Plane::XY,
            3: Plane::YZ
        };
        assert!(find(g, iset, oset, &plane).unwrap().is_none());
    }

    #[test]
    fn test_find_case8() {
        let TestCase { g, iset, oset } = test_utils::CASE8.get_or_init(test_utils::case8);
        let plane = planes! {
            0: Plane::YZ,
            1: Plane::ZX,
            2: Plane::XY
        };
        assert!(find(g, iset, oset, &plane).unwrap().is_none());
    }

    #[test]
    fn test_excessive_plane() {
        let TestCase { g, iset, oset } = test_utils::CASE1.get_or_init(test_utils::case1);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::XY,
            3: Plane::XY,
            4: Plane::XY
        };
        assert_eq!(
            find(g, iset, oset, &plane),
            Err(OpenGraphError::ExcessiveMeasurement { node: 4 })
        );
    }

    #[test]
    fn test_verify_rejects_broken_plane() {
        let case = test_utils::CASE4.get_or_init(test_utils::case4);
        let plane = planes! {
            0: Plane::XY,
            1: Plane::XY,
            2: Plane::ZX,
            3: Plane::YZ
        };
        let (f, layer) = found(case, &plane);
        // Claim node 2 was measured in XY although 2 ∈ f(2)
        let mut wrong = plane.clone();
        wrong.insert(2, Plane::XY);
        let err = verify(&f, &layer, &case.g, &case.iset, &case.oset, &wrong).unwrap_err();
        assert_eq!(
            err,
            FlowError::Witness(FlowValidationError::InconsistentFlowPlane {
                node: 2,
                plane: Plane::XY
            })
        );
    }

    #[test]
    fn test_plane_codes() {
        use num_traits::FromPrimitive;
        assert_eq!(u8::from(Plane::XY), 0);
        assert_eq!(u8::from(Plane::YZ), 1);
        assert_eq!(u8::from(Plane::ZX), 2);
        assert_eq!(Plane::from_u8(2), Some(Plane::ZX));
        assert_eq!(Plane::from_u8(3), None);
    }
}
