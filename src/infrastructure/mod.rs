pub mod memory;
pub mod models;
pub mod order_repo;

pub use memory::InMemoryOrderStore;
pub use order_repo::DieselOrderStore;
