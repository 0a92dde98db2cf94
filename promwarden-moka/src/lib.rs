//! # promwarden-moka
//!
//! In-memory [`Cache`](promwarden_core::Cache) implementation backed by
//! [Moka](https://docs.rs/moka).
//!
//! ```
//! use std::time::Duration;
//! use promwarden_core::{Cache, CacheKey};
//! use promwarden_moka::MokaCache;
//!
//! let cache = MokaCache::<CacheKey, Duration>::builder()
//!     .label("slow-queries")
//!     .max_entries(1_000)
//!     .build();
//! assert_eq!(cache.label(), "slow-queries");
//! ```
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod cache;
pub mod metrics;

pub use builder::{ByteCapacity, EntryCapacity, MokaCacheBuilder, NoCapacity};
pub use cache::MokaCache;
pub use moka::policy::EvictionPolicy;
