//! Emotion collector library
//!
//! Exposes the collection pipeline for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
