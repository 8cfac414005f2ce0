//! Shared containers and helpers used by all flow finders.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::hash::Hash;

use fixedbitset::FixedBitSet;

/// Unordered set of node indices.
pub type Nodes = hashbrown::HashSet<usize>;
/// Ordered set of node indices, used wherever iteration order is load-bearing.
pub type OrderedNodes = BTreeSet<usize>;
/// Adjacency list over dense indices `0..n`.
pub type Graph = Vec<Nodes>;
/// Layer of each node representing the partial order.
pub type Layer = Vec<usize>;

/// Constructs `Nodes` from a list of indices.
#[macro_export]
macro_rules! nodeset {
    ($($x:expr),* $(,)?) => {
        <::hashbrown::HashSet<usize> as ::core::iter::FromIterator<usize>>::from_iter(
            [$($x),*].iter().copied(),
        )
    };
}

/// In-place set operations taking any iterable of (borrowed) elements.
pub trait InPlaceSetOp<T: Clone> {
    fn union_with<U>(&mut self, other: U)
    where
        U: IntoIterator,
        U::Item: Borrow<T>;

    fn difference_with<U>(&mut self, other: U)
    where
        U: IntoIterator,
        U::Item: Borrow<T>;
}

impl<T: Eq + Hash + Clone> InPlaceSetOp<T> for hashbrown::HashSet<T> {
    fn union_with<U>(&mut self, other: U)
    where
        U: IntoIterator,
        U::Item: Borrow<T>,
    {
        self.extend(other.into_iter().map(|x| x.borrow().clone()));
    }

    fn difference_with<U>(&mut self, other: U)
    where
        U: IntoIterator,
        U::Item: Borrow<T>,
    {
        other.into_iter().for_each(|x| {
            self.remove(x.borrow());
        });
    }
}

impl<T: Ord + Clone> InPlaceSetOp<T> for BTreeSet<T> {
    fn union_with<U>(&mut self, other: U)
    where
        U: IntoIterator,
        U::Item: Borrow<T>,
    {
        self.extend(other.into_iter().map(|x| x.borrow().clone()));
    }

    fn difference_with<U>(&mut self, other: U)
    where
        U: IntoIterator,
        U::Item: Borrow<T>,
    {
        other.into_iter().for_each(|x| {
            self.remove(x.borrow());
        });
    }
}

/// Resizes each row to `width` bits and clears it.
pub fn zerofill(work: &mut [FixedBitSet], width: usize) {
    work.iter_mut().for_each(|row| {
        if row.len() == width {
            row.clear();
        } else {
            *row = FixedBitSet::with_capacity(width);
        }
    });
}

/// Adjacency packed as one bit row per vertex.
///
/// Rows are XOR-accumulated to compute odd neighborhoods in `O(n^2/w)`.
/// Simplicity and symmetry of the source graph are preconditions.
pub struct BitGraph {
    rows: Vec<FixedBitSet>,
}

impl BitGraph {
    pub fn pack(g: &Graph) -> Self {
        let n = g.len();
        let rows = g
            .iter()
            .map(|gu| {
                let mut row = FixedBitSet::with_capacity(n);
                gu.iter().for_each(|&v| row.insert(v));
                row
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, u: usize) -> &FixedBitSet {
        &self.rows[u]
    }

    /// `Odd(kset) = { v : |N(v) ∩ kset| is odd }`.
    pub fn odd_neighbors<'a>(&self, kset: impl IntoIterator<Item = &'a usize>) -> Nodes {
        let mut acc = FixedBitSet::with_capacity(self.len());
        for &u in kset {
            acc.symmetric_difference_with(&self.rows[u]);
        }
        acc.ones().collect()
    }
}

/// Checks `dom(f) = V \ oset` and `range(f) ⊆ V \ iset` on the flattened pairs.
///
/// Self-inclusion `u ∈ f(u)` is exempt from the codomain rule.
pub fn check_domain<'a>(
    f_flatiter: impl Iterator<Item = (&'a usize, &'a usize)>,
    vset: &Nodes,
    iset: &Nodes,
    oset: &Nodes,
) -> anyhow::Result<()> {
    let icset = vset.difference(iset).copied().collect::<Nodes>();
    let ocset = vset.difference(oset).copied().collect::<Nodes>();
    let mut dom = Nodes::new();
    for (&u, &fu) in f_flatiter {
        dom.insert(u);
        anyhow::ensure!(ocset.contains(&u), "{u} outside domain");
        anyhow::ensure!(icset.contains(&fu) || fu == u, "{fu} outside codomain");
    }
    anyhow::ensure!(dom == ocset, "domain does not cover V\\O");
    Ok(())
}
