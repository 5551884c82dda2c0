//! Workload sources and auxiliary tools.

pub mod dataset_reader;
pub mod energy_sampler;
pub mod standard_dataset_reader;
pub mod workload_generator;
