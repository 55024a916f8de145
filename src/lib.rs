//! Wishlist Catalog Library
//!
//! Customer wishlists holding ordered product references. Item order is kept
//! by integer positions managed by [`services::positioning::PositionEngine`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod repositories;
pub mod services;

pub use errors::ServiceError;
