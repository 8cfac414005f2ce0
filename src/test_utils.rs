//! Shared test fixtures.

use std::sync::OnceLock;

use crate::common::{Graph, Nodes};
use crate::nodeset;

#[derive(Clone)]
pub struct TestCase {
    pub g: Graph,
    pub iset: Nodes,
    pub oset: Nodes,
}

pub static CASE0: OnceLock<TestCase> = OnceLock::new();
pub static CASE1: OnceLock<TestCase> = OnceLock::new();
pub static CASE2: OnceLock<TestCase> = OnceLock::new();
pub static CASE3: OnceLock<TestCase> = OnceLock::new();
pub static CASE4: OnceLock<TestCase> = OnceLock::new();
pub static CASE5: OnceLock<TestCase> = OnceLock::new();
pub static CASE6: OnceLock<TestCase> = OnceLock::new();
pub static CASE7: OnceLock<TestCase> = OnceLock::new();
pub static CASE8: OnceLock<TestCase> = OnceLock::new();

fn graph(n: usize, edges: &[(usize, usize)]) -> Graph {
    let mut g = vec![Nodes::new(); n];
    for &(u, v) in edges {
        g[u].insert(v);
        g[v].insert(u);
    }
    g
}

// 0 - 1
pub fn case0() -> TestCase {
    TestCase {
        g: graph(2, &[(0, 1)]),
        iset: nodeset![0, 1],
        oset: nodeset![0, 1],
    }
}

// 0 - 1 - 2 - 3 - 4
pub fn case1() -> TestCase {
    TestCase {
        g: graph(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]),
        iset: nodeset![0],
        oset: nodeset![4],
    }
}

// 0 - 2 - 4
// 1 - 3 - 5
pub fn case2() -> TestCase {
    TestCase {
        g: graph(6, &[(0, 2), (1, 3), (2, 4), (3, 5)]),
        iset: nodeset![0, 1],
        oset: nodeset![4, 5],
    }
}

//   ______
//  /      |
// 0 - 3   |
//    /    |
//   /     |
//  /      |
// 1 - 4   |
//  \ /    |
//   X    /
//  / \  /
// 2 - 5
pub fn case3() -> TestCase {
    TestCase {
        g: graph(6, &[(0, 3), (0, 5), (1, 3), (1, 4), (1, 5), (2, 4), (2, 5)]),
        iset: nodeset![0, 1, 2],
        oset: nodeset![3, 4, 5],
    }
}

//   0 - 1
//  /|   |
// 4 |   |
//  \|   |
//   2 - 5 - 3
pub fn case4() -> TestCase {
    TestCase {
        g: graph(6, &[(0, 1), (0, 2), (0, 4), (1, 5), (2, 4), (2, 5), (3, 5)]),
        iset: nodeset![0, 1],
        oset: nodeset![4, 5],
    }
}

// 0 - 2
//  \ /
//   X
//  / \
// 1 - 3
pub fn case5() -> TestCase {
    TestCase {
        g: graph(4, &[(0, 2), (0, 3), (1, 2), (1, 3)]),
        iset: nodeset![0, 1],
        oset: nodeset![2, 3],
    }
}

//     3
//     |
//     2
//     |
// 0 - 1 - 4
pub fn case6() -> TestCase {
    TestCase {
        g: graph(5, &[(0, 1), (1, 2), (1, 4), (2, 3)]),
        iset: nodeset![0],
        oset: nodeset![4],
    }
}

// 1   2   3
// | /     |
// 0 - - - 4
pub fn case7() -> TestCase {
    TestCase {
        g: graph(5, &[(0, 1), (0, 2), (0, 4), (3, 4)]),
        iset: nodeset![0],
        oset: nodeset![4],
    }
}

// 0 - 1 -- 3
//    \|   /|
//     |\ / |
//     | /\ |
//     2 -- 4
pub fn case8() -> TestCase {
    TestCase {
        g: graph(5, &[(0, 1), (0, 4), (1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]),
        iset: nodeset![0],
        oset: nodeset![3, 4],
    }
}
