pub mod entity_store;
pub mod reorder;
pub mod selection;
pub mod slice;
