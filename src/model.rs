//! Equivalence runners comparing [`AvlMultiset`] against a sorted `Vec` model.
//!
//! Shared by the unit tests (through `proptest`) and the fuzz targets (through `arbitrary`).

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{AvlMultiset, NodeRef, QueryError};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// An index into the values currently stored, so that erasures and lookups hit.
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Erase(ItemValue),
    Search(ItemValue),
    LowerBound(ItemValue),
    UpperBound(ItemValue),
    Order(ItemValue),
    GetNth(usize),
    RangeQuery(ItemValue, ItemValue),
    Min,
    Max,
    Copy,
    Take,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        u32::try_from(idx).unwrap_or(u32::MAX)
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Erase(item) => FinalOp::Erase(get_value(sorted, item)),
            Op::Search(item) => FinalOp::Search(get_value(sorted, item)),
            Op::LowerBound(item) => FinalOp::LowerBound(get_value(sorted, item)),
            Op::UpperBound(item) => FinalOp::UpperBound(get_value(sorted, item)),
            Op::Order(item) => FinalOp::Order(get_value(sorted, item)),
            // Reach one past either end now and then.
            Op::GetNth(k) => FinalOp::GetNth(k % (sorted.len() + 2)),
            Op::RangeQuery(lo, hi) => {
                FinalOp::RangeQuery(get_value(sorted, lo), get_value(sorted, hi))
            }
            Op::Min => FinalOp::Min,
            Op::Max => FinalOp::Max,
            Op::Copy => FinalOp::Copy,
            Op::Take => FinalOp::Take,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Erase(u32),
    Search(u32),
    LowerBound(u32),
    UpperBound(u32),
    Order(u32),
    GetNth(usize),
    RangeQuery(u32, u32),
    Min,
    Max,
    Copy,
    Take,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        4 => value_strategy().prop_map(Op::Insert),
        2 => value_strategy().prop_map(Op::Erase),
        1 => value_strategy().prop_map(Op::Search),
        1 => value_strategy().prop_map(Op::LowerBound),
        1 => value_strategy().prop_map(Op::UpperBound),
        1 => value_strategy().prop_map(Op::Order),
        1 => (0usize..1000).prop_map(Op::GetNth),
        1 => (value_strategy(), value_strategy()).prop_map(|(lo, hi)| Op::RangeQuery(lo, hi)),
        1 => Just(Op::Min),
        1 => Just(Op::Max),
        1 => Just(Op::Copy),
        1 => Just(Op::Take),
    ]
}

#[inline]
fn node_value(node: NodeRef<'_, u32>) -> u32 {
    *node.value()
}

pub fn run_multiset_equivalence(ops: Vec<Op>) {
    let mut sorted: Vec<u32> = Vec::with_capacity(ops.len());
    let mut avl: AvlMultiset<u32> = AvlMultiset::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted);

        match final_op {
            FinalOp::Insert(value) => {
                // Equal values go after the ones already present.
                let idx = sorted.partition_point(|&v| v <= value);
                sorted.insert(idx, value);

                avl.insert(value);
            }

            FinalOp::Erase(value) => {
                let from_model = sorted
                    .binary_search(&value)
                    .ok()
                    .map(|idx| sorted.remove(idx));
                let from_avl = avl.erase(&value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Search(value) => {
                let from_model = sorted.binary_search(&value).ok().map(|_| value);
                let from_avl = avl.search(&value).map(node_value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(avl.contains(&value), from_model.is_some());
            }

            FinalOp::LowerBound(value) => {
                let idx = sorted.partition_point(|&v| v < value);
                let from_model = sorted.get(idx).copied();
                let from_avl = avl.lower_bound(&value).map(node_value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");

                // The bound is the first of any run of equal values.
                if let Some(node) = avl.lower_bound(&value) {
                    assert_eq!(avl.order(node.value()), idx);
                    assert!(node.prev().map_or(true, |prev| *prev.value() < value));
                }
            }

            FinalOp::UpperBound(value) => {
                let from_model = sorted.get(sorted.partition_point(|&v| v <= value)).copied();
                let from_avl = avl.upper_bound(&value).map(node_value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Order(value) => {
                let from_model = sorted.partition_point(|&v| v < value);
                let from_avl = avl.order(&value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::GetNth(k) => {
                let from_model = k.checked_sub(1).and_then(|i| sorted.get(i)).copied();
                let from_avl = avl.get_nth(k).map(node_value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::RangeQuery(lo, hi) => {
                let from_model = if lo > hi {
                    Err(QueryError::InvertedRange)
                } else {
                    Ok(sorted.iter().filter(|&&v| lo <= v && v <= hi).count())
                };
                let from_avl = avl.range_query(&lo, &hi);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Min => {
                let from_model = sorted.first().copied();
                let from_avl = avl.min().map(node_value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Max => {
                let from_model = sorted.last().copied();
                let from_avl = avl.max().map(node_value);

                assert_eq!(from_model, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Copy => {
                let mut copy = avl.clone();
                copy.assert_invariants();
                assert_eq!(copy, avl, "FinalOp #{op_id}: {final_op:?}");

                // The copy shares no nodes with its source.
                copy.insert(0);
                copy.erase(&0);
                if let Some(&first) = sorted.first() {
                    copy.erase(&first);
                }
                assert_eq!(avl.len(), sorted.len(), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Take => {
                let taken = avl.take();
                assert!(avl.is_empty(), "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(avl.len(), 0);
                assert_eq!(taken.len(), sorted.len(), "FinalOp #{op_id}: {final_op:?}");

                avl = taken;
            }
        }

        avl.assert_invariants();
        assert_eq!(sorted.len(), avl.len());
        assert!(sorted.iter().eq(avl.iter()));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum WalkOp {
    // Reading the current value is not an operation as it's checked on every loop iteration.
    MoveNext,
    MovePrev,
    PeekNext,
    PeekPrev,
    Seek(usize),
}

pub fn walk_op_strategy() -> impl Strategy<Value = WalkOp> {
    proptest::prop_oneof![
        Just(WalkOp::MoveNext),
        Just(WalkOp::MovePrev),
        Just(WalkOp::PeekNext),
        Just(WalkOp::PeekPrev),
        (0usize..200).prop_map(WalkOp::Seek),
    ]
}

#[derive(Clone, Debug)]
pub struct WalkEquivalenceInput {
    pub values: Vec<u32>,
    pub ops: Vec<WalkOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for WalkEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            // Keep values small so that repeats are common.
            u8::arbitrary(u).map(u32::from).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> WalkOp {
            WalkOp::arbitrary(u).unwrap_or(WalkOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(WalkEquivalenceInput { values, ops })
    }
}

/// Walks a handle over the multiset with `next`/`prev`, mirroring it with an index into the
/// sorted values. Stepping off either end parks the walk; stepping again wraps around.
pub fn run_walk_equivalence(values: Vec<u32>, ops: Vec<WalkOp>) {
    let avl: AvlMultiset<u32> = values.iter().copied().collect();
    avl.assert_invariants();

    let mut vec = values;
    vec.sort_unstable();

    fn vec_curs_prev(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    fn avl_next<'a>(
        avl: &'a AvlMultiset<u32>,
        curs: Option<NodeRef<'a, u32>>,
    ) -> Option<NodeRef<'a, u32>> {
        match curs {
            Some(node) => node.next(),
            None => avl.min(),
        }
    }

    fn avl_prev<'a>(
        avl: &'a AvlMultiset<u32>,
        curs: Option<NodeRef<'a, u32>>,
    ) -> Option<NodeRef<'a, u32>> {
        match curs {
            Some(node) => node.prev(),
            None => avl.max(),
        }
    }

    let mut vec_curs = vec_curs_next(&vec, None);
    let mut avl_curs = avl.min();

    // Check that the initial states are equivalent.
    assert_eq!(vec_curs.map(|i| vec[i]), avl_curs.map(node_value));

    for op in ops {
        match op {
            WalkOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                avl_curs = avl_next(&avl, avl_curs);
            }

            WalkOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                avl_curs = avl_prev(&avl, avl_curs);
            }

            WalkOp::PeekNext => {
                let v = vec_curs_next(&vec, vec_curs).map(|i| vec[i]);
                let w = avl_next(&avl, avl_curs).map(node_value);

                assert_eq!(v, w);
            }

            WalkOp::PeekPrev => {
                let v = vec_curs_prev(&vec, vec_curs).map(|i| vec[i]);
                let w = avl_prev(&avl, avl_curs).map(node_value);

                assert_eq!(v, w);
            }

            WalkOp::Seek(k) => {
                let k = k % (vec.len() + 1);
                vec_curs = k.checked_sub(1);
                avl_curs = avl.get_nth(k);
            }
        }

        assert_eq!(vec_curs.map(|i| vec[i]), avl_curs.map(node_value));

        // The handle's position agrees with select on every step.
        if let (Some(i), Some(node)) = (vec_curs, avl_curs) {
            assert_eq!(avl.get_nth(i + 1), Some(node));
        }
    }
}
