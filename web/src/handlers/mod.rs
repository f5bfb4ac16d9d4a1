//! HTTP handlers shared by every Railbook service.

pub mod health;

pub use health::{Readiness, health_check, readiness};
