//! File and folder entities.

pub mod model;
pub mod tree;

pub use model::{Item, ItemKind};
pub use tree::{PathSegment, TreeNode};
