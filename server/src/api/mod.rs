//! REST API handlers, grouped by resource.

pub mod admin;
pub mod bookings;
pub mod stations;
pub mod trains;
