//! Session state: the object store and the periodic differ.
//!
//! The store applies delta batches under an exclusive lock and versions them
//! with a logical offset. The differ classifies every object against the
//! offset it last published and purges objects it reports as deleted.

mod differ;
mod operations;
mod store;

pub use differ::SnapshotDiffer;
pub use operations::apply_change;
pub use store::ObjectStateStore;
