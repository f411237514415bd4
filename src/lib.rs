pub mod constants;
pub mod engine;
pub mod error;
pub mod generator;
pub mod grid;
pub mod rng;
pub mod search;
pub mod types;
