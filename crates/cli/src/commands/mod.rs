//! CLI Commands

pub mod after;
pub mod store;
