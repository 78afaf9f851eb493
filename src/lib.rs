// Library for the binaries and tests to access modules

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod probes;
pub mod remediation;
pub mod routes;
pub mod sampler;
pub mod worker;
