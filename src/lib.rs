// src/lib.rs

//! Regatta Resume core library.
//!
//! Aggregates a sailor's competitive history from two public scoring
//! sources, normalizes the results into one canonical schema, and
//! collapses cross-source duplicates that describe the same real-world
//! regatta appearance.

pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
