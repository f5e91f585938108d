//! # topowind parallel
//!
//! Parallel execution strategies for the azimuth loop.
//!
//! Azimuths are independent, so the engine hands each one its own plane of
//! a preallocated output buffer and fills the planes in parallel.

pub mod strategy;

pub use strategy::{num_cpus, ProcessingMode};
