//! specretry Shared Store
//!
//! A small HTTP key-value service shared by every test-runner worker of a
//! run, and the client workers use to reach it.

pub mod api;
pub mod client;
pub mod server;

pub use client::HttpStore;
pub use server::{serve, StoreServer};
