//! # Railbook Server
//!
//! REST front end for the Railbook seat-reservation core.
//!
//! The binary in `main.rs` loads [`Config`] from the environment, builds
//! the [`ReservationSystem`](railbook_core::ReservationSystem) (restoring a
//! snapshot or seeding demo data), and serves [`build_router`] until
//! Ctrl+C or SIGTERM, then writes a snapshot.
//!
//! The library half exists so integration tests can drive the exact
//! router the binary serves.

#![forbid(unsafe_code)]

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod metrics;
pub mod server;

pub use bootstrap::{BootstrapError, StateOrigin, build_system, persist};
pub use config::Config;
pub use server::{AppState, build_router};
