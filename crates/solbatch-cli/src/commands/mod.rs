pub mod build;
pub mod order;
