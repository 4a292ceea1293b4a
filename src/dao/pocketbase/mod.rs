//! PocketBase-backed implementation of the match store.

mod config;
mod error;
mod realtime;
mod store;

pub use config::PocketBaseConfig;
pub use error::{PocketBaseDaoError, PocketBaseResult};
pub use store::PocketBaseStore;
