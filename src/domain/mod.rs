pub mod delivery;
pub mod errors;
pub mod events;
pub mod order;
pub mod ports;
pub mod principal;
pub mod product;
