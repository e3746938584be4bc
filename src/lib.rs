//! Instagram post scraper: authenticated private-API backend with a
//! resilient media-info fallback chain, an unauthenticated rendering-service
//! backend, and flat CSV export of post metadata plus comment rows.

pub mod config;

pub(crate) mod constants;

pub mod error;

pub mod application;

pub mod presentation;

pub mod session;

pub mod transport;

pub mod utils;
