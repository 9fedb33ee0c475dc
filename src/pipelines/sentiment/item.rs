use std::fmt::Debug;

/// A trait for items that can be used for sentiment classification
pub trait Item: Send + Sync + Clone + Debug {
    /// Returns the token ids for the item
    fn tokens(&self) -> &[usize];

    /// Returns the class id for the item
    fn label(&self) -> usize;
}
