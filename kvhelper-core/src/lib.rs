//! # kvhelper Core
//!
//! Building blocks shared by the kvhelper client:
//!
//! - [`Value`] and [`coerce`]: turn text read back from a store into the scalar
//!   it most likely was (`undefined`, `null`, integer, float or string)
//! - [`merge`]: overlay truthy settings onto a base [`ConfigMap`]
//! - [`Store`]: a thread-safe in-memory store with strings, hashes, sets and
//!   TTLs, usable wherever a real server is not wanted
//!
//! ## Example
//!
//! ```rust
//! use kvhelper_core::{coerce_str, merge, ConfigMap, Value};
//!
//! assert_eq!(coerce_str("42"), Value::Int(42));
//! assert_eq!(coerce_str("4.2"), Value::Float(4.2));
//! assert_eq!(coerce_str("null"), Value::Null);
//!
//! let defaults = ConfigMap::from([("port".to_string(), Value::Int(6379))]);
//! let overrides = ConfigMap::from([("port".to_string(), Value::Null)]);
//! assert_eq!(merge(Some(&defaults), Some(&overrides)), defaults);
//! ```

mod config;
mod entry;
mod merge;
mod pattern;
mod store;
mod value;


pub use config::{StoreConfig, MAX_TTL_SECONDS};
pub use entry::{Data, Entry, Ttl};
pub use merge::{merge, ConfigMap};
pub use pattern::escape_pattern;
pub use store::{Store, StoreError};
pub use value::{coerce, coerce_opt, coerce_str, is_numeric, Value, NULL_TEXT, UNDEFINED_TEXT};
