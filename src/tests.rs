use std::ops::Range;

use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::model;

use super::*;

fn insert_find_all(keys: &[u32]) {
    let mut set: AvlMultiset<u32> = AvlMultiset::new();

    for &key in keys {
        set.insert(key);
        set.assert_invariants();
    }

    for key in keys {
        let node = set.search(key).expect("item not found");
        assert_eq!(node.value(), key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `0..n`.
fn for_each_permutation(n: u32, mut f: impl FnMut(&[u32])) {
    fn permute(keys: &mut Vec<u32>, k: usize, f: &mut impl FnMut(&[u32])) {
        if k == keys.len() {
            f(keys);
            return;
        }

        for i in k..keys.len() {
            keys.swap(k, i);
            permute(keys, k + 1, f);
            keys.swap(k, i);
        }
    }

    permute(&mut (0..n).collect(), 0, &mut f);
}

#[test]
fn all_orders_find() {
    for n in 4..=6 {
        for_each_permutation(n, insert_find_all);
    }
}

fn insert_erase_all(keys: &[u32]) {
    let mut set: AvlMultiset<u32> = AvlMultiset::new();

    for &key in keys {
        set.insert(key);
        set.assert_invariants();
    }

    for key in keys {
        assert_eq!(set.erase(key), Some(*key));
        set.assert_invariants();
    }
    assert!(set.is_empty());

    for &key in keys {
        set.insert(key);
        set.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert_eq!(set.erase(key), Some(*key));
        set.assert_invariants();
    }
    assert!(set.is_empty());
}

#[test]
fn erase_one() {
    insert_erase_all(&[0]);
}

#[test]
fn erase_two() {
    insert_erase_all(&[0, 1]);
    insert_erase_all(&[1, 0]);
}

#[test]
fn erase_three() {
    insert_erase_all(&[0, 1, 2]);
    insert_erase_all(&[0, 2, 1]);
    insert_erase_all(&[1, 0, 2]);
    insert_erase_all(&[1, 2, 0]);
    insert_erase_all(&[2, 0, 1]);
    insert_erase_all(&[2, 1, 0]);
}

#[test]
fn erase_all_orders() {
    for n in 4..=6 {
        for_each_permutation(n, insert_erase_all);
    }
}

#[test]
fn erase_with_repeats() {
    insert_erase_all(&[3, 3, 3, 3, 3]);
    insert_erase_all(&[1, 2, 1, 2, 1, 2, 0, 0]);
}

#[test]
fn erase_root_variants() {
    // Root without children.
    let mut set: AvlMultiset<i32> = [1].into_iter().collect();
    set.erase(&1);
    assert!(set.is_empty());

    // Root with a right child only, then a left child only.
    let mut set: AvlMultiset<i32> = [1, 2].into_iter().collect();
    assert_eq!(set.root().map(|n| *n.value()), Some(1));
    set.erase(&1);
    set.assert_invariants();

    let mut set: AvlMultiset<i32> = [2, 1].into_iter().collect();
    set.erase(&2);
    set.assert_invariants();

    // Root with two children.
    let mut set: AvlMultiset<i32> = [1, 2, 3].into_iter().collect();
    set.erase(&2);
    set.assert_invariants();
    assert_eq!(set.iter().copied().collect::<Vec<_>>(), [1, 3]);
}

#[test]
fn erase_missing_is_noop() {
    let mut set: AvlMultiset<i32> = AvlMultiset::new();
    assert_eq!(set.erase(&7), None);

    set.extend([1, 3, 5]);
    assert_eq!(set.erase(&4), None);
    assert_eq!(set.len(), 3);
    set.assert_invariants();
}

#[test]
fn rotations_keep_balance() {
    for keys in [[3, 4, 2, 1, 0], [1, 0, 2, 3, 4]] {
        let set: AvlMultiset<i32> = keys.into_iter().collect();
        set.assert_invariants();

        let mut opt_node = set.min();
        while let Some(node) = opt_node {
            assert!(node.balance().abs() < 2);
            assert_eq!(
                node.size(),
                1 + node.left().map_or(0, |n| n.size()) + node.right().map_or(0, |n| n.size())
            );
            opt_node = node.next();
        }
    }
}

#[test]
fn double_rotation_factors() {
    // Left-right case, middle node balanced.
    let set: AvlMultiset<i32> = [3, 1, 2].into_iter().collect();
    let root = set.root().unwrap();
    assert_eq!(*root.value(), 2);
    assert_eq!(root.tilt(), Balance::Even);
    assert_eq!(root.size(), 3);

    // Right-left case below the root.
    let set: AvlMultiset<i32> = [2, 1, 5, 6, 3, 4].into_iter().collect();
    set.assert_invariants();
    let root = set.root().unwrap();
    assert_eq!(*root.value(), 3);
    assert_eq!(root.left().map(|n| *n.value()), Some(2));
    assert_eq!(root.right().map(|n| *n.value()), Some(5));
}

#[test]
fn in_order_walk_is_sorted() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut values: Vec<i32> = (0..100).map(|_| rng.gen_range(0..=100)).collect();

    let set: AvlMultiset<i32> = values.iter().copied().collect();
    set.assert_invariants();
    values.sort_unstable();

    let mut opt_node = set.min();
    for value in &values {
        let node = opt_node.expect("walk ended early");
        assert_eq!(node.value(), value);
        opt_node = node.next();
    }
    assert!(opt_node.is_none());

    // And backwards.
    let mut opt_node = set.max();
    for value in values.iter().rev() {
        let node = opt_node.expect("walk ended early");
        assert_eq!(node.value(), value);
        opt_node = node.prev();
    }
    assert!(opt_node.is_none());

    assert!(set.iter().eq(values.iter()));
    assert_eq!(set.iter().len(), values.len());
}

#[test]
fn erase_in_arbitrary_order_until_empty() {
    let mut rng = StdRng::seed_from_u64(42);
    let values: Vec<i32> = (0..100).map(|_| rng.gen_range(0..=100)).collect();

    let mut set: AvlMultiset<i32> = values.iter().copied().collect();
    for value in &values {
        assert_eq!(set.erase(value), Some(*value));
        set.assert_invariants();
    }

    assert!(set.is_empty());
    assert!(set.min().is_none());
    assert!(set.max().is_none());
}

#[test]
fn order_of_odd_values() {
    let set: AvlMultiset<i32> = [1, 3, 5, 7, 9, 11].into_iter().collect();

    for i in 0..11 {
        assert_eq!(set.order(&i), usize::try_from(i / 2).unwrap(), "order({i})");
    }
    assert_eq!(set.order(&12), 6);
}

#[test]
fn order_is_monotone() {
    let mut rng = StdRng::seed_from_u64(7);
    let set: AvlMultiset<i32> = (0..200).map(|_| rng.gen_range(-50..50)).collect();

    assert_eq!(set.order(&i32::MIN), 0);
    assert_eq!(set.order(&i32::MAX), set.len());

    let mut last = 0;
    for x in -60..60 {
        let order = set.order(&x);
        assert!(order >= last);
        last = order;
    }
}

#[test]
fn bounds() {
    let set: AvlMultiset<i32> = [1, 2, 3, 5, 6].into_iter().collect();
    let value = |node: Option<NodeRef<'_, i32>>| node.map(|n| *n.value());

    assert_eq!(value(set.lower_bound(&0)), Some(1));
    assert_eq!(value(set.lower_bound(&4)), Some(5));
    assert_eq!(value(set.lower_bound(&5)), Some(5));
    assert_eq!(value(set.lower_bound(&7)), None);

    assert_eq!(value(set.upper_bound(&5)), Some(6));
    assert_eq!(value(set.upper_bound(&4)), Some(5));
    assert_eq!(value(set.upper_bound(&0)), Some(1));
    assert_eq!(value(set.upper_bound(&6)), None);
}

#[test]
fn range_queries() {
    let set: AvlMultiset<i32> = [1, 2, 3, 5, 6].into_iter().collect();

    assert_eq!(set.range_query(&1, &6), Ok(5));
    assert_eq!(set.range_query(&0, &7), Ok(5));
    assert_eq!(set.range_query(&1, &4), Ok(3));
    assert_eq!(set.range_query(&4, &6), Ok(2));
    assert_eq!(set.range_query(&5, &5), Ok(1));
    assert_eq!(set.range_query(&4, &4), Ok(0));
    assert_eq!(set.range_query(&0, &0), Ok(0));
}

#[test]
fn range_query_rejects_inverted_bounds() {
    let set: AvlMultiset<i32> = [1, 2, 3].into_iter().collect();

    assert_eq!(set.range_query(&3, &1), Err(QueryError::InvertedRange));
    assert_eq!(
        AvlMultiset::<i32>::new().range_query(&1, &0),
        Err(QueryError::InvertedRange)
    );
}

#[test]
fn range_query_counts_repeats() {
    let set: AvlMultiset<i32> = [5, 5, 5, 1, 9].into_iter().collect();

    assert_eq!(set.range_query(&5, &5), Ok(3));
    assert_eq!(set.range_query(&1, &5), Ok(4));
    assert_eq!(set.range_query(&6, &9), Ok(1));
    assert_eq!(set.order(&5), 1);
    assert_eq!(set.lower_bound(&5).and_then(|n| n.prev()).map(|n| *n.value()), Some(1));
}

#[test]
fn get_nth_matches_search() {
    let values = [0, 1, 2, 3, 4, 5];
    let set: AvlMultiset<i32> = values.into_iter().collect();

    for (i, value) in values.iter().enumerate() {
        assert_eq!(set.get_nth(i + 1), set.search(value));
    }

    assert!(set.get_nth(0).is_none());
    assert!(set.get_nth(values.len() + 1).is_none());
    assert!(AvlMultiset::<i32>::new().get_nth(1).is_none());
}

#[test]
fn copy_is_independent() {
    let mut source: AvlMultiset<i32> = [4, 8, 15, 16, 23, 42].into_iter().collect();
    let mut copy = source.clone();
    copy.assert_invariants();
    assert_eq!(copy, source);

    copy.insert(7);
    source.erase(&42);

    assert!(copy.iter().eq([4, 7, 8, 15, 16, 23, 42].iter()));
    assert!(source.iter().eq([4, 8, 15, 16, 23].iter()));

    copy.clone_from(&source);
    copy.assert_invariants();
    assert_eq!(copy, source);
}

#[test]
fn take_leaves_source_empty() {
    let mut source: AvlMultiset<i32> = [3, 1, 2].into_iter().collect();
    let dest = source.take();

    assert!(source.is_empty());
    assert_eq!(source.len(), 0);
    source.assert_invariants();
    assert!(dest.iter().eq([1, 2, 3].iter()));

    // The emptied source is still usable.
    source.insert(9);
    assert_eq!(source.len(), 1);
}

#[test]
fn clear_releases_every_node() {
    use std::{cell::Cell, cmp::Ordering, rc::Rc};

    struct Counted(u32, Rc<Cell<usize>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.1.set(self.1.get() + 1);
        }
    }

    impl PartialEq for Counted {
        fn eq(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    impl Eq for Counted {}

    impl PartialOrd for Counted {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Counted {
        fn cmp(&self, other: &Self) -> Ordering {
            self.0.cmp(&other.0)
        }
    }

    let drops = Rc::new(Cell::new(0));
    let mut set = AvlMultiset::new();
    for i in 0..1000 {
        set.insert(Counted(i % 37, drops.clone()));
    }

    set.clear();
    assert_eq!(drops.get(), 1000);
    assert!(set.is_empty());
    set.assert_invariants();

    for i in 0..10 {
        set.insert(Counted(i, drops.clone()));
    }
    drop(set);
    assert_eq!(drops.get(), 1010);
}

#[test]
fn borrowed_queries() {
    let set: AvlMultiset<String> = ["pear", "apple", "fig"]
        .into_iter()
        .map(String::from)
        .collect();

    assert!(set.contains("fig"));
    assert_eq!(set.order("banana"), 1);
    assert_eq!(set.range_query("b", "g"), Ok(1));
    assert_eq!(set.get_nth(3).map(|n| n.value().as_str()), Some("pear"));
}

#[test]
fn debug_and_dotgraph() {
    let set: AvlMultiset<i32> = [2, 1, 3].into_iter().collect();
    assert_eq!(format!("{set:?}"), "{1, 2, 3}");

    let mut dot = String::new();
    set.dotgraph("t", &mut dot).unwrap();
    assert!(dot.starts_with("digraph \"graph-t\""));
    assert!(dot.contains("[label=\"2:0:3\"]"));
    assert!(dot.contains("[label=\"1:0:1\"]"));
    assert!(dot.ends_with(" }\n}"));

    let mut empty = String::new();
    AvlMultiset::<i32>::new().dotgraph("e", &mut empty).unwrap();
    assert_eq!(empty, "digraph \"graph-e\" {}");
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn multiset_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_multiset_equivalence(ops);
    }

    #[test]
    fn walk_equivalence(
        values in proptest::collection::vec(0u32..64, 0..100),
        ops in proptest::collection::vec(model::walk_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_walk_equivalence(values, ops);
    }
}
