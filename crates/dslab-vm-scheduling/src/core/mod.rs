//! Cloud model, scheduling abstractions and their building blocks.

pub mod action;
pub mod cloud;
pub mod cloud_state;
pub mod common;
pub mod config;
pub mod context;
pub mod driver;
pub mod energy_meter;
pub mod environment;
pub mod error;
pub mod logger;
pub mod power_model;
pub mod request;
pub mod resource_pool;
pub mod resources;
pub mod schedule;
pub mod scheduler;
pub mod schedulers;
pub mod time_series;
pub mod vm;
