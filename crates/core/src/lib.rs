//! Shopstate Core - Pure cart and favorites state.
//!
//! This crate holds everything about the shopper's cart and favorites that
//! can be expressed without I/O:
//! - the data model ([`types`]),
//! - the identity normalizer ([`identity`]),
//! - the reducer ([`reducer`]).
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions, with no storage or
//! logging. The `shopstate-engine` crate owns the stateful parts
//! (persistence, cross-context sync, change notification).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod identity;
pub mod reducer;
pub mod types;

pub use identity::{IdentityError, normalize};
pub use reducer::{Action, reduce};
pub use types::*;
