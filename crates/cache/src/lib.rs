//! Caching primitives for lazily opened library resources.
//!
//! Two pieces live here, both independent of what is being cached:
//! - [`Memo`]: a single-value slot that constructs its value on first use and
//!   keeps it until explicitly taken. Failed constructions are never cached,
//!   so a caller that fixes the underlying problem (e.g. downloads the missing
//!   file) only has to ask again.
//! - [`ConnectionPool`]: a fixed-size registry of entries that currently hold
//!   an open resource. Registering one entry too many evicts another, which
//!   is told to release whatever it holds via [`Evict`].

pub mod error;
mod memo;
mod pool;

pub use crate::memo::{Construct, Memo};
pub use crate::pool::{ConnectionPool, DEFAULT_CONNECTION_LIMIT, Evict};
