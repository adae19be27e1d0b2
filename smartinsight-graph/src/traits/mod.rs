//! Capability traits for the knowledge graph subsystem

pub mod triple_store;

pub use triple_store::TripleStore;
