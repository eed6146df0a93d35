//! Offline-capable upload queue for the ElecMate field app.
//!
//! Site photos and certificates captured without signal are stored on the
//! device and uploaded when connectivity returns. See [`queue`] for the
//! store and controller, and [`api`] for the HTTP upload operation used in
//! production.

pub mod api;
pub mod config;
pub mod queue;
