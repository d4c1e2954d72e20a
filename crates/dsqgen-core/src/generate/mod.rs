//! Query generation entry point.

pub mod engine;

pub use engine::QueryGenerator;
