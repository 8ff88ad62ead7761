pub mod analysis;
pub mod analyst;
