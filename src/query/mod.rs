pub mod subtree;

pub use subtree::SubtreeQuery;
