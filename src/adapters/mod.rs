//! Adapters implementing the domain ports.

pub mod judges;
pub mod memory;
pub mod sqlite;
