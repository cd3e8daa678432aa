//! Access control evaluation for Palaver.
//!
//! A single pure decision function over (actor, resource, operation).
//! The evaluator never touches storage: callers hand it the entities the
//! rules need, which keeps it unit-testable on its own and lets the
//! service layer run it before any store validation.

mod evaluator;

pub use evaluator::*;
