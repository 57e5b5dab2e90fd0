//! Response cache keyed by request parameters
//!
//! Every remote payload is persisted verbatim before it is decoded, so a
//! later run answers the same request from disk without touching the
//! network. A missing cache file is the normal cache-miss signal and is
//! reported as `None`, never as an error.
//!
//! # Module Organization
//!
//! - [`config`] - Cache root configuration
//! - [`key`] - Deterministic cache keys and file names
//! - [`store`] - Load and save of raw JSON payloads
//!
//! # Examples
//!
//! ```rust,no_run
//! use netatmo_fetcher::app::cache::{CacheKey, CacheStore};
//! use netatmo_fetcher::app::models::Area;
//! use serde_json::value::RawValue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CacheStore::new("netatmo-2022-01-15-17");
//! let key = CacheKey::stations(&Area::new(55, 15, -60, -130));
//!
//! if store.load(&key).await?.is_none() {
//!     let payload = RawValue::from_string("[]".to_string())?;
//!     store.save(&key, &payload).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod key;
pub mod store;

// Re-export main public API
pub use config::CacheConfig;
pub use key::CacheKey;
pub use store::CacheStore;
