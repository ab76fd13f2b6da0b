#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fiesta
//!
//! > Batch compile a dataset of verified contracts, each with the `solc` version it was deployed
//! > with, and index the canonical signatures of their functions.
//!
//! # Quickstart
//!
//! A prelude is provided which imports all the important things for you.
//!
//! ```no_run
//! use fiesta::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SignatureStore::open("fiesta.sqlite")?);
//! let project = Project::builder()
//!     .config(DatasetConfig::new("smart-contract-fiesta/organized_contracts"))
//!     .sink(store.clone())
//!     .build();
//!
//! let summary = project.compile(None, None).await?;
//! println!("{summary}");
//! println!("{:?}", store.selector_frequency(Some(10))?);
//! # Ok(())
//! # }
//! ```
//!
//! The work is split across three crates:
//!
//! - [`core`]: raw ABI items, canonical signatures and their 4-byte selectors
//! - [`solc`]: dataset inventory, work partitioning, compiler engines, the per artifact compile
//!   cache and the worker pool
//! - [`store`]: the SQLite index of contracts and selectors

/// # ABI items and selectors
///
/// ```rust
/// use fiesta::core::utils::selector_hex;
/// assert_eq!(selector_hex("transfer(address,uint256)"), "0xa9059cbb");
/// ```
pub mod core {
    pub use fiesta_core::*;
}

/// # Compiling the dataset
///
/// See [`solc::Project`] for a complete run and [`solc::partition`] for the scheduling of
/// versions across workers.
pub mod solc {
    pub use fiesta_solc::*;
}

/// # The signature index
pub mod store {
    pub use fiesta_store::*;
}

/// Easy imports of frequently used type definitions and traits
pub mod prelude {
    pub use super::core::abi::{FunctionExt, RawAbi};

    pub use super::solc::{
        abi::FunctionSelector, CompilerEngine, DatasetConfig, EngineLoader, Inventory, OutputSink,
        Project, Reporter, RunSummary, Strategy,
    };

    pub use super::store::SignatureStore;
}
