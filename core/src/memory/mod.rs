pub mod store;

pub use store::{Exchange, ExchangeStore, MAX_MEMORY};
