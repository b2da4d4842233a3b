pub mod factory;
pub mod memory_repo;
