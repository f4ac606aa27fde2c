use thiserror::Error;

/// An error returned by a rejected query on an [`AvlMultiset`](crate::AvlMultiset).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The lower bound of a range query is greater than its upper bound.
    #[error("range query lower bound is greater than its upper bound")]
    InvertedRange,
}
