use core::num::NonZeroU32;

/// Stable index of a node slot inside an [`Arena`].
///
/// Slots are recycled after removal, so an id is only meaningful while the node it was issued
/// for is still live.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub(crate) struct NodeId(NonZeroU32);

impl NodeId {
    pub(crate) const MAX: usize = (u32::MAX - 1) as usize;

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`NodeId::from_index()` - `index` > `NodeId::MAX`!");
        #[allow(clippy::cast_possible_truncation)]
        let raw = (index + 1) as u32;
        // `index + 1` is never zero and fits after the bound check above.
        match NonZeroU32::new(raw) {
            Some(raw) => Self(raw),
            None => unreachable!("`NodeId::from_index()` - index overflowed"),
        }
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<NodeId>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn alloc(&mut self, element: T) -> NodeId {
        if let Some(id) = self.free.pop() {
            // Reuse a vacated slot.
            self.slots[id.to_index()] = Some(element);
            id
        } else {
            assert!(
                self.slots.len() <= NodeId::MAX,
                "`Arena::alloc()` - arena is at maximum capacity ({})",
                NodeId::MAX
            );
            self.slots.push(Some(element));
            NodeId::from_index(self.slots.len() - 1)
        }
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &T {
        self.slots[id.to_index()]
            .as_ref()
            .expect("`Arena::get()` - `id` is vacant!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut T {
        self.slots[id.to_index()]
            .as_mut()
            .expect("`Arena::get_mut()` - `id` is vacant!")
    }

    /// Returns mutable references to two distinct live slots.
    pub(crate) fn get_pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut T, &mut T) {
        let (ia, ib) = (a.to_index(), b.to_index());
        assert_ne!(ia, ib, "`Arena::get_pair_mut()` - ids must be distinct");

        let (lo, hi) = (ia.min(ib), ia.max(ib));
        let (head, tail) = self.slots.split_at_mut(hi);
        let lo_ref = head[lo]
            .as_mut()
            .expect("`Arena::get_pair_mut()` - `id` is vacant!");
        let hi_ref = tail[0]
            .as_mut()
            .expect("`Arena::get_pair_mut()` - `id` is vacant!");

        if ia < ib {
            (lo_ref, hi_ref)
        } else {
            (hi_ref, lo_ref)
        }
    }

    pub(crate) fn take(&mut self, id: NodeId) -> T {
        let element = self.slots[id.to_index()]
            .take()
            .expect("`Arena::take()` - `id` is vacant!");
        self.free.push(id);
        element
    }

    pub(crate) fn free(&mut self, id: NodeId) {
        drop(self.take(id));
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    #[should_panic(expected = "`NodeId::from_index()` - `index` > `NodeId::MAX`!")]
    fn invalid_id() {
        let _ = NodeId::from_index(NodeId::MAX + 1);
    }

    #[test]
    fn id_has_niche() {
        assert_eq!(
            core::mem::size_of::<NodeId>(),
            core::mem::size_of::<Option<NodeId>>()
        );
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = Arena::new();
        let a = arena.alloc('a');
        let b = arena.alloc('b');
        arena.free(a);
        assert_eq!(arena.len(), 1);

        let c = arena.alloc('c');
        assert_eq!(c, a);
        assert_eq!(*arena.get(c), 'c');
        assert_eq!(*arena.get(b), 'b');
    }

    #[test]
    fn pair_mut_keeps_argument_order() {
        let mut arena = Arena::with_capacity(2);
        let a = arena.alloc(1);
        let b = arena.alloc(2);

        let (x, y) = arena.get_pair_mut(b, a);
        assert_eq!((*x, *y), (2, 1));
        core::mem::swap(x, y);

        assert_eq!(*arena.get(a), 2);
        assert_eq!(*arena.get(b), 1);
    }

    proptest! {
        #[test]
        fn id_round_trip(index in 0..=NodeId::MAX) {
            prop_assert_eq!(NodeId::from_index(index).to_index(), index);
        }

        #[test]
        fn arena_behaves_like_vec(operations in prop::collection::vec(strategy(), 0..256)) {
            let mut model: Vec<(NodeId, u32)> = Vec::new();
            let mut arena: Arena<u32> = Arena::new();

            for operation in operations {
                match operation {
                    Operation::Alloc(value) => {
                        let id = arena.alloc(value);
                        model.push((id, value));
                    }
                    Operation::GetMut(which, value) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        *arena.get_mut(model[index].0) = value;
                        model[index].1 = value;
                    }
                    Operation::Take(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let taken = arena.take(model[index].0);
                        let (_, expected) = model.swap_remove(index);
                        prop_assert_eq!(taken, expected);
                    }
                    Operation::Clear => {
                        arena.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(arena.len(), model.len());

                for &(id, value) in &model {
                    prop_assert_eq!(*arena.get(id), value);
                }
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Alloc(u32),
        GetMut(usize, u32),
        Take(usize),
        Clear,
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => any::<u32>().prop_map(Operation::Alloc),
            5 => (any::<usize>(), any::<u32>()).prop_map(|(which, value)| Operation::GetMut(which, value)),
            5 => any::<usize>().prop_map(Operation::Take),
            1 => Just(Operation::Clear),
        ]
    }
}
