//! Conversation and message storage for Palaver.
//!
//! This crate provides the in-process messaging core: an identity
//! registry, participant-scoped conversation and message stores, a
//! composable query/filter engine with offset pagination, a bounded
//! query cache, and the [`ChatService`] gateway that runs access-control
//! checks before any store validation.
//!
//! The stores enforce data-integrity invariants only; authorization
//! lives in the `access` crate and is applied by the service layer, so
//! the two can be tested independently.

mod cache;
mod error;
mod filter;
mod memory;
mod service;
mod store;

pub use cache::*;
pub use error::*;
pub use filter::*;
pub use memory::*;
pub use service::*;
pub use store::*;
