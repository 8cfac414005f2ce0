//! Maximally-delayed causal flow algorithm.

use crate::common::{self, Graph, Layer, Nodes, OrderedNodes};
use crate::pflow::PPlane;
use crate::validate::{self, FlowError, FlowKind, OpenGraphError};
use hashbrown::HashMap;

/// Causal flow function. Each measured node is corrected by one neighbor.
pub type Flow = HashMap<usize, usize>;

fn check_initial_flow(layer: &Layer, oset: &Nodes) -> anyhow::Result<()> {
    for (u, &lu) in layer.iter().enumerate() {
        anyhow::ensure!(
            (lu == 0) == oset.contains(&u),
            "cannot be maximally-delayed due to {u}"
        );
    }
    Ok(())
}

/// Computes the maximally-delayed causal flow, if any.
///
/// Layers are carved from the outputs inward: a corrector with exactly one
/// unsolved neighbor claims it, the earliest corrector winning conflicts.
pub fn find(g: &Graph, iset: &Nodes, oset: &Nodes) -> Result<Option<(Flow, Layer)>, OpenGraphError> {
    validate::check_graph(g, iset, oset)?;
    let n = g.len();
    let vset = (0..n).collect::<Nodes>();
    let mut solved = oset.clone();
    // Ascending order makes conflict resolution deterministic
    let mut correctors = oset.difference(iset).copied().collect::<OrderedNodes>();
    let mut f = Flow::with_capacity(n - oset.len());
    let mut layer = vec![0_usize; n];
    let mut pairs = Vec::new();
    let mut claimed = Nodes::new();
    for l in 1_usize.. {
        pairs.clear();
        claimed.clear();
        for &c in &correctors {
            let mut unsolved = g[c].iter().filter(|v| !solved.contains(*v));
            let (Some(&u), None) = (unsolved.next(), unsolved.next()) else {
                continue;
            };
            if claimed.insert(u) {
                pairs.push((u, c));
            }
        }
        if pairs.is_empty() {
            break;
        }
        for &(u, c) in &pairs {
            f.insert(u, c);
            layer[u] = l;
            solved.insert(u);
            correctors.remove(&c);
            if !iset.contains(&u) {
                correctors.insert(u);
            }
        }
        tracing::debug!(round = l, solved = pairs.len(), "flow layer");
    }
    if solved == vset {
        if cfg!(debug_assertions) {
            common::check_domain(f.iter(), &vset, iset, oset).unwrap();
            check_initial_flow(&layer, oset).unwrap();
        }
        Ok(Some((f, layer)))
    } else {
        Ok(None)
    }
}

/// Checks a causal-flow witness against the flow conditions.
pub fn verify(
    f: &Flow,
    layer: &Layer,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
) -> Result<(), FlowError> {
    validate::check_graph(g, iset, oset)?;
    if layer.len() != g.len() {
        return Err(OpenGraphError::BadLayerSpec {
            expected: g.len(),
            actual: layer.len(),
        }
        .into());
    }
    // Causal flow is gflow with singleton correction sets, all measured XY
    let lifted = f
        .iter()
        .map(|(&u, &c)| (u, Nodes::from_iter([c])))
        .collect::<HashMap<_, _>>();
    let labels = (0..g.len())
        .filter(|u| !oset.contains(u))
        .map(|u| (u, PPlane::XY))
        .collect::<HashMap<_, _>>();
    validate::verify_core(FlowKind::Causal, g, iset, oset, &labels, &lifted, layer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{self, TestCase};

    macro_rules! flowmap {
        ($($u:literal: $v:literal),*) => {
            Flow::from_iter([$(($u, $v)),*].iter().copied())
        };
    }

    fn found(case: &TestCase) -> (Flow, Layer) {
        let TestCase { g, iset, oset } = case;
        let ret = find(g, iset, oset).unwrap().unwrap();
        verify(&ret.0, &ret.1, g, iset, oset).unwrap();
        ret
    }

    #[test]
    fn test_find_case0() {
        let case = test_utils::CASE0.get_or_init(test_utils::case0);
        let (f, layer) = found(case);
        assert!(f.is_empty());
        assert_eq!(layer, vec![0, 0]);
    }

    #[test]
    fn test_find_case1() {
        let case = test_utils::CASE1.get_or_init(test_utils::case1);
        let (f, layer) = found(case);
        assert_eq!(f, flowmap! {0: 1, 1: 2, 2: 3, 3: 4});
        assert_eq!(layer, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_find_case2() {
        let case = test_utils::CASE2.get_or_init(test_utils::case2);
        let (f, layer) = found(case);
        assert_eq!(f, flowmap! {0: 2, 1: 3, 2: 4, 3: 5});
        assert_eq!(layer, vec![2, 2, 1, 1, 0, 0]);
    }

    #[test]
    fn test_find_case3() {
        let TestCase { g, iset, oset } = test_utils::CASE3.get_or_init(test_utils::case3);
        assert!(find(g, iset, oset).unwrap().is_none());
    }

    #[test]
    fn test_find_case5() {
        let TestCase { g, iset, oset } = test_utils::CASE5.get_or_init(test_utils::case5);
        assert!(find(g, iset, oset).unwrap().is_none());
    }

    #[test]
    fn test_find_case6() {
        let TestCase { g, iset, oset } = test_utils::CASE6.get_or_init(test_utils::case6);
        assert!(find(g, iset, oset).unwrap().is_none());
    }

    #[test]
    fn test_verify_rejects_broken_order() {
        let case = test_utils::CASE1.get_or_init(test_utils::case1);
        let (f, mut layer) = found(case);
        layer[1] = 9;
        let err = verify(&f, &layer, &case.g, &case.iset, &case.oset).unwrap_err();
        assert!(matches!(err, FlowError::Witness(_)));
    }

    #[test]
    fn test_verify_rejects_nonzero_output_layer() {
        use crate::validate::FlowValidationError;
        let case = test_utils::CASE1.get_or_init(test_utils::case1);
        let (f, mut layer) = found(case);
        layer[4] = 1;
        let err = verify(&f, &layer, &case.g, &case.iset, &case.oset).unwrap_err();
        assert_eq!(
            err,
            FlowError::Witness(FlowValidationError::ExcessiveNonZeroLayer { node: 4, layer: 1 })
        );
    }
}
