//! Bidirectional map between arbitrary node identities and dense indices.
//!
//! The finders operate on `0..n` only; callers with richer node types build
//! an [`IndexMap`] once per call and translate at the boundary. The core
//! never consults it.

use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::common::{Graph, Layer, Nodes};

pub struct IndexMap<V> {
    v2i: HashMap<V, usize>,
    i2v: Vec<V>,
}

impl<V: Eq + Hash + Clone> IndexMap<V> {
    /// Registers the distinct nodes of `vset` in iteration order.
    pub fn new(vset: impl IntoIterator<Item = V>) -> Self {
        let mut v2i = HashMap::new();
        let mut i2v = Vec::new();
        for v in vset {
            if !v2i.contains_key(&v) {
                v2i.insert(v.clone(), i2v.len());
                i2v.push(v);
            }
        }
        Self { v2i, i2v }
    }

    pub fn len(&self) -> usize {
        self.i2v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2v.is_empty()
    }

    /// Index of `v`, or `None` if it was never registered.
    pub fn encode(&self, v: &V) -> Option<usize> {
        self.v2i.get(v).copied()
    }

    pub fn encode_set<'a>(&self, vset: impl IntoIterator<Item = &'a V>) -> Option<Nodes>
    where
        V: 'a,
    {
        vset.into_iter().map(|v| self.encode(v)).collect()
    }

    /// Encodes an adjacency mapping into the dense form the finders take.
    ///
    /// Every registered node must appear as a key.
    pub fn encode_graph(&self, g: &HashMap<V, HashSet<V>>) -> Option<Graph> {
        self.i2v
            .iter()
            .map(|v| self.encode_set(g.get(v)?))
            .collect()
    }

    /// Node registered at index `i`, or `None` if out of range.
    pub fn decode(&self, i: usize) -> Option<&V> {
        self.i2v.get(i)
    }

    pub fn decode_set(&self, iset: &Nodes) -> Option<HashSet<V>> {
        iset.iter().map(|&i| self.decode(i).cloned()).collect()
    }

    pub fn decode_flow(&self, f: &HashMap<usize, usize>) -> Option<HashMap<V, V>> {
        f.iter()
            .map(|(&i, &j)| Some((self.decode(i)?.clone(), self.decode(j)?.clone())))
            .collect()
    }

    pub fn decode_gflow(&self, f: &HashMap<usize, Nodes>) -> Option<HashMap<V, HashSet<V>>> {
        f.iter()
            .map(|(&i, si)| Some((self.decode(i)?.clone(), self.decode_set(si)?)))
            .collect()
    }

    pub fn decode_layer(&self, layer: &Layer) -> HashMap<V, usize> {
        Iterator::zip(self.i2v.iter().cloned(), layer.iter().copied()).collect()
    }
}
