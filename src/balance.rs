use crate::Dir;

/// Height relation between the two subtrees of a node.
///
/// A settled tree only ever holds these three states. The transient "two levels heavy" state
/// that triggers a rotation is never stored: [`Balance::tilt`] reports it as `None` instead.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Balance {
    /// The left subtree is one level taller.
    LeftHeavy,
    /// Both subtrees have the same height.
    #[default]
    Even,
    /// The right subtree is one level taller.
    RightHeavy,
}

impl Balance {
    /// Returns the state of a node whose `dir` subtree is one level taller.
    #[inline]
    pub(crate) const fn heavy(dir: Dir) -> Balance {
        match dir {
            Dir::Left => Balance::LeftHeavy,
            Dir::Right => Balance::RightHeavy,
        }
    }

    /// Signed balance factor: `height(left) - height(right)`.
    #[inline]
    pub const fn factor(self) -> i8 {
        match self {
            Balance::LeftHeavy => 1,
            Balance::Even => 0,
            Balance::RightHeavy => -1,
        }
    }

    /// Returns the state after the `dir` subtree grew by one level.
    ///
    /// `None` means the node is now two levels heavy on `dir` and must be rotated.
    #[inline]
    pub(crate) fn tilt(self, dir: Dir) -> Option<Balance> {
        match self {
            Balance::Even => Some(Balance::heavy(dir)),
            heavy if heavy == Balance::heavy(dir) => None,
            _ => Some(Balance::Even),
        }
    }
}
