//! Open-graph preconditions and independent witness validation.

use hashbrown::HashMap;
use thiserror::Error;

use crate::common::{BitGraph, Graph, Layer, Nodes, OrderedNodes};
use crate::gflow::Plane;
use crate::pflow::PPlane;

/// Precondition failures on `(g, iset, oset)` or a measurement assignment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpenGraphError {
    #[error("graph is empty")]
    EmptyGraph,
    #[error("self-loop detected on node {node}")]
    SelfLoop { node: usize },
    #[error("edge ({node1}, {node2}) has no reverse")]
    AsymmetricEdge { node1: usize, node2: usize },
    #[error("node {node} has out-of-range neighbor {neighbor}")]
    NeighborOutOfRange { node: usize, neighbor: usize },
    #[error("iset must be a subset of the nodes")]
    InputOutOfRange { node: usize },
    #[error("oset must be a subset of the nodes")]
    OutputOutOfRange { node: usize },
    #[error("cannot find measured node {node} in the graph")]
    UnknownMeasuredNode { node: usize },
    #[error("excessive measurement specified for output node {node}")]
    ExcessiveMeasurement { node: usize },
    #[error("measurement should be specified for all u in V\\O, missing {node}")]
    MissingMeasurement { node: usize },
    #[error("layers must be specified for all nodes ({actual} given, {expected} nodes)")]
    BadLayerSpec { expected: usize, actual: usize },
}

/// First violated condition of a flow witness.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowValidationError {
    #[error("layer-{layer} node {node} inside output nodes")]
    ExcessiveNonZeroLayer { node: usize, layer: usize },
    #[error("zero-layer node {node} outside output nodes")]
    ExcessiveZeroLayer { node: usize },
    #[error("f({node}) has invalid domain")]
    InvalidFlowDomain { node: usize },
    #[error("f({node}) has invalid codomain")]
    InvalidFlowCodomain { node: usize },
    #[error("node {node} has invalid measurement specification")]
    InvalidMeasurementSpec { node: usize },
    #[error("flow-order inconsistency on nodes ({node1}, {node2})")]
    InconsistentFlowOrder { node1: usize, node2: usize },
    #[error("broken {plane:?} measurement on node {node}")]
    InconsistentFlowPlane { node: usize, plane: Plane },
    #[error("broken {pplane:?} measurement on node {node}")]
    InconsistentFlowPPlane { node: usize, pplane: PPlane },
}

/// Witness rejection: either a broken precondition or a broken condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error(transparent)]
    Graph(#[from] OpenGraphError),
    #[error(transparent)]
    Witness(#[from] FlowValidationError),
}

/// Checks that `(g, iset, oset)` is a valid open graph.
///
/// Simplicity and symmetry are verified here once; the finders assume them.
pub fn check_graph(g: &Graph, iset: &Nodes, oset: &Nodes) -> Result<(), OpenGraphError> {
    let n = g.len();
    if n == 0 {
        return Err(OpenGraphError::EmptyGraph);
    }
    for (u, gu) in g.iter().enumerate() {
        for &v in gu {
            if v >= n {
                return Err(OpenGraphError::NeighborOutOfRange { node: u, neighbor: v });
            }
            if v == u {
                return Err(OpenGraphError::SelfLoop { node: u });
            }
            if !g[v].contains(&u) {
                return Err(OpenGraphError::AsymmetricEdge { node1: u, node2: v });
            }
        }
    }
    if let Some(&v) = iset.iter().find(|&&v| v >= n) {
        return Err(OpenGraphError::InputOutOfRange { node: v });
    }
    if let Some(&v) = oset.iter().find(|&&v| v >= n) {
        return Err(OpenGraphError::OutputOutOfRange { node: v });
    }
    Ok(())
}

/// Checks that `labels` covers exactly `V \ oset`.
pub fn check_measurement<P>(
    n: usize,
    oset: &Nodes,
    labels: &HashMap<usize, P>,
) -> Result<(), OpenGraphError> {
    let mut keys = labels.keys().copied().collect::<Vec<_>>();
    keys.sort_unstable();
    for &u in &keys {
        if u >= n {
            return Err(OpenGraphError::UnknownMeasuredNode { node: u });
        }
        if oset.contains(&u) {
            return Err(OpenGraphError::ExcessiveMeasurement { node: u });
        }
    }
    if let Some(u) = (0..n).find(|u| !oset.contains(u) && !labels.contains_key(u)) {
        return Err(OpenGraphError::MissingMeasurement { node: u });
    }
    Ok(())
}

/// Which flow definition a witness is checked against.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowKind {
    Causal,
    General,
    Pauli,
}

/// Reports the kind-specific label diagnostic for a broken condition at `u`.
fn broken_label(kind: FlowKind, u: usize, pp: PPlane) -> FlowValidationError {
    match kind {
        FlowKind::Pauli => FlowValidationError::InconsistentFlowPPlane { node: u, pplane: pp },
        _ => FlowValidationError::InconsistentFlowPlane {
            node: u,
            plane: match pp {
                PPlane::XY => Plane::XY,
                PPlane::YZ => Plane::YZ,
                _ => Plane::ZX,
            },
        },
    }
}

/// Re-checks a `(f, layer)` witness against the flow conditions.
///
/// `labels` carries the measurement assignment lifted to `PPlane` (causal
/// flow verifies as all-`XY`). Conditions are examined in the documented
/// order and the first violation is returned.
pub(crate) fn verify_core(
    kind: FlowKind,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    labels: &HashMap<usize, PPlane>,
    f: &HashMap<usize, Nodes>,
    layer: &Layer,
) -> Result<(), FlowValidationError> {
    let n = g.len();
    debug_assert_eq!(layer.len(), n);
    // Layer contract. Pauli-measured nodes may legally share layer 0 with
    // the outputs, so the reverse direction is only enforced otherwise.
    for v in 0..n {
        if oset.contains(&v) {
            if layer[v] != 0 {
                return Err(FlowValidationError::ExcessiveNonZeroLayer { node: v, layer: layer[v] });
            }
        } else if layer[v] == 0 && kind != FlowKind::Pauli {
            return Err(FlowValidationError::ExcessiveZeroLayer { node: v });
        }
    }
    // Measurement coverage.
    for v in 0..n {
        if oset.contains(&v) != !labels.contains_key(&v) {
            return Err(FlowValidationError::InvalidMeasurementSpec { node: v });
        }
    }
    // Domain and codomain.
    if let Some(&u) = f.keys().filter(|&&u| u >= n).min() {
        return Err(FlowValidationError::InvalidFlowDomain { node: u });
    }
    for u in 0..n {
        if oset.contains(&u) != !f.contains_key(&u) {
            return Err(FlowValidationError::InvalidFlowDomain { node: u });
        }
    }
    for u in 0..n {
        let Some(fu) = f.get(&u) else { continue };
        // Self-inclusion is exempt from the codomain rule
        if fu.iter().any(|&w| w >= n || (iset.contains(&w) && w != u)) {
            return Err(FlowValidationError::InvalidFlowCodomain { node: u });
        }
    }
    let bg = BitGraph::pack(g);
    let odd = f
        .iter()
        .map(|(&u, fu)| (u, bg.odd_neighbors(fu)))
        .collect::<HashMap<_, _>>();
    // Ordering. Pauli measurements relax strictness: X/Y nodes may correct
    // without ordering, Y/Z nodes may sit in odd neighborhoods without
    // ordering, and unordered Y nodes must cancel between f(u) and Odd(f(u)).
    for u in 0..n {
        let Some(fu) = f.get(&u) else { continue };
        let oddu = &odd[&u];
        for w in fu.iter().copied().collect::<OrderedNodes>() {
            if w == u || layer[u] > layer[w] {
                continue;
            }
            if kind == FlowKind::Pauli
                && matches!(labels.get(&w), Some(PPlane::X) | Some(PPlane::Y))
            {
                continue;
            }
            return Err(FlowValidationError::InconsistentFlowOrder { node1: u, node2: w });
        }
        for w in oddu.iter().copied().collect::<OrderedNodes>() {
            if w == u || layer[u] > layer[w] {
                continue;
            }
            if kind == FlowKind::Pauli
                && matches!(labels.get(&w), Some(PPlane::Y) | Some(PPlane::Z))
            {
                continue;
            }
            return Err(FlowValidationError::InconsistentFlowOrder { node1: u, node2: w });
        }
        if kind == FlowKind::Pauli {
            for w in 0..n {
                if w == u || layer[u] > layer[w] || labels.get(&w) != Some(&PPlane::Y) {
                    continue;
                }
                if fu.contains(&w) != oddu.contains(&w) {
                    return Err(FlowValidationError::InconsistentFlowPPlane {
                        node: w,
                        pplane: PPlane::Y,
                    });
                }
            }
        }
    }
    // Label conditions at the measured node itself.
    for u in 0..n {
        let Some(fu) = f.get(&u) else { continue };
        let oddu = &odd[&u];
        let self_f = fu.contains(&u);
        let self_odd = oddu.contains(&u);
        let pp = labels[&u];
        let ok = match pp {
            PPlane::XY => !self_f && self_odd,
            PPlane::YZ => self_f && !self_odd,
            PPlane::ZX => self_f && self_odd,
            PPlane::X => self_odd,
            PPlane::Y => self_f || self_odd,
            PPlane::Z => self_f,
        };
        if !ok {
            return Err(broken_label(kind, u, pp));
        }
    }
    Ok(())
}
