pub mod catalog;
pub mod commerce_store;
pub mod orders;
