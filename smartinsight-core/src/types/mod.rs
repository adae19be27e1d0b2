//! Core domain types for the knowledge platform

pub mod entity;
pub mod relation;
pub mod triple;

pub use entity::Entity;
pub use relation::{Relation, RelationType};
pub use triple::{ChangeType, Triple, TripleVersion};
