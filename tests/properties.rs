//! Randomized properties over small open graphs and GF(2) systems.

use mbflow::{flow, gflow, pflow, solver};
use mbflow::{Graph, Nodes, PPlane, PPlanes, Plane, Planes};
use proptest::prelude::*;

/// All simple graphs on up to `max_n` nodes with arbitrary input/output sets.
fn open_graph(max_n: usize) -> impl Strategy<Value = (Graph, Nodes, Nodes)> {
    (1..=max_n).prop_flat_map(|n| {
        let nedges = n * (n - 1) / 2;
        (
            Just(n),
            0_u32..1 << nedges,
            0_u32..1 << n,
            0_u32..1 << n,
        )
            .prop_map(|(n, emask, imask, omask)| {
                let mut g = vec![Nodes::new(); n];
                let mut k = 0;
                for u in 0..n {
                    for v in u + 1..n {
                        if (emask >> k) & 1 == 1 {
                            g[u].insert(v);
                            g[v].insert(u);
                        }
                        k += 1;
                    }
                }
                let iset = (0..n).filter(|v| (imask >> v) & 1 == 1).collect::<Nodes>();
                let oset = (0..n).filter(|v| (omask >> v) & 1 == 1).collect::<Nodes>();
                (g, iset, oset)
            })
    })
}

fn xy_planes(n: usize, oset: &Nodes) -> Planes {
    (0..n)
        .filter(|u| !oset.contains(u))
        .map(|u| (u, Plane::XY))
        .collect()
}

/// Derives a label per node from `seed`, three bits each.
fn seeded_pplanes(n: usize, oset: &Nodes, seed: u64) -> PPlanes {
    (0..n)
        .filter(|u| !oset.contains(u))
        .map(|u| {
            let pp = match (seed >> (3 * (u % 21))) & 7 {
                0 => PPlane::XY,
                1 => PPlane::YZ,
                2 => PPlane::ZX,
                3 => PPlane::X,
                4 => PPlane::Y,
                5 => PPlane::Z,
                6 => PPlane::XY,
                _ => PPlane::Y,
            };
            (u, pp)
        })
        .collect()
}

fn weight(x: &[bool]) -> usize {
    x.iter().filter(|&&b| b).count()
}

fn satisfies(a: &[Vec<u8>], x: &[bool], b: &[Vec<u8>], eq: usize) -> bool {
    a.iter().zip(b.iter()).all(|(arow, brow)| {
        let dot = arow
            .iter()
            .zip(x.iter())
            .fold(false, |acc, (&aij, &xj)| acc ^ (aij == 1 && xj));
        dot == (brow[eq] == 1)
    })
}

proptest! {
    #[test]
    fn prop_flow_roundtrip((g, iset, oset) in open_graph(6)) {
        if let Some((f, layer)) = flow::find(&g, &iset, &oset).unwrap() {
            flow::verify(&f, &layer, &g, &iset, &oset).unwrap();
        }
    }

    #[test]
    fn prop_gflow_roundtrip((g, iset, oset) in open_graph(6), seed in any::<u64>()) {
        let plane = seeded_pplanes(g.len(), &oset, seed)
            .into_iter()
            .map(|(u, pp)| {
                let p = match pp {
                    PPlane::XY | PPlane::X => Plane::XY,
                    PPlane::YZ | PPlane::Y => Plane::YZ,
                    PPlane::ZX | PPlane::Z => Plane::ZX,
                };
                (u, p)
            })
            .collect::<Planes>();
        if let Some((f, layer)) = gflow::find(&g, &iset, &oset, &plane).unwrap() {
            gflow::verify(&f, &layer, &g, &iset, &oset, &plane).unwrap();
        }
    }

    #[test]
    fn prop_pflow_roundtrip((g, iset, oset) in open_graph(6), seed in any::<u64>()) {
        let pplane = seeded_pplanes(g.len(), &oset, seed);
        if let Some((f, layer)) = pflow::find(&g, &iset, &oset, &pplane).unwrap() {
            pflow::verify(&f, &layer, &g, &iset, &oset, &pplane).unwrap();
        }
    }

    #[test]
    fn prop_hierarchy((g, iset, oset) in open_graph(6)) {
        let plane = xy_planes(g.len(), &oset);
        let found_flow = flow::find(&g, &iset, &oset).unwrap();
        let found_gflow = gflow::find(&g, &iset, &oset, &plane).unwrap();
        if let Some((_, flayer)) = found_flow {
            let (_, glayer) = found_gflow.expect("flow implies gflow");
            prop_assert!(flayer.iter().max() >= glayer.iter().max());
        }
    }

    #[test]
    fn prop_layer_contract((g, iset, oset) in open_graph(6)) {
        let plane = xy_planes(g.len(), &oset);
        if let Some((_, layer)) = gflow::find(&g, &iset, &oset, &plane).unwrap() {
            for v in 0..g.len() {
                prop_assert_eq!(layer[v] == 0, oset.contains(&v));
            }
        }
    }

    #[test]
    fn prop_determinism((g, iset, oset) in open_graph(6), seed in any::<u64>()) {
        let pplane = seeded_pplanes(g.len(), &oset, seed);
        let first = pflow::find(&g, &iset, &oset, &pplane).unwrap();
        let second = pflow::find(&g, &iset, &oset, &pplane).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_solver_sound_complete_minimal(
        (a, b) in (1_usize..=4, 1_usize..=4, 1_usize..=2).prop_flat_map(|(r, c, k)| {
            (
                proptest::collection::vec(proptest::collection::vec(0_u8..=1, c), r),
                proptest::collection::vec(proptest::collection::vec(0_u8..=1, k), r),
            )
        })
    ) {
        let cols = a[0].len();
        let ret = solver::solve(&a, &b).unwrap();
        prop_assert_eq!(ret.len(), b[0].len());
        for (eq, x) in ret.iter().enumerate() {
            // Exhaustive reference search
            let best = (0_u32..1 << cols)
                .map(|m| (0..cols).map(|c| (m >> c) & 1 == 1).collect::<Vec<_>>())
                .filter(|xs| satisfies(&a, xs, &b, eq))
                .map(|xs| weight(&xs))
                .min();
            match (x, best) {
                (Some(x), Some(w)) => {
                    prop_assert!(satisfies(&a, x, &b, eq));
                    prop_assert_eq!(weight(x), w);
                }
                (None, None) => {}
                (got, want) => prop_assert!(false, "got {:?}, expected weight {:?}", got, want),
            }
        }
    }
}
