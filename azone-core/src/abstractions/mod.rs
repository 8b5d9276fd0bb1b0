//! Trait abstractions for the collaborators this crate consults
//!
//! Host network introspection and randomness are injected through these
//! traits so that subnet selection can be driven deterministically in tests
//! and swapped out on hosts where probing is not wanted.

pub mod network;
pub mod random;

pub use network::*;
pub use random::*;
