#![doc = include_str!("../README.md")]

pub mod error;
pub use error::{Result, StoreError};

mod schema;

mod store;
pub use store::{ContractRow, Indexed, SignatureStore};

/// The default file name of the database
pub const DATABASE_FILE: &str = "fiesta.sqlite";
