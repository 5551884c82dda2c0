#![doc = include_str!("../readme.md")]

pub mod core;
pub mod evaluator;
pub mod experiment;
pub mod extensions;
pub mod simulation;

pub use log;
