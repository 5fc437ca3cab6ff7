//! Cluster job clients.
//!
//! [`KubeJobClient`] submits `batch/v1` Jobs and follows pod logs through the
//! Kubernetes API. [`MemoryCluster`] keeps workloads in process and serves
//! scripted output; it backs tests and local runs without a cluster.
mod config;
pub use config::KubeSettings;

mod manifest;
pub use manifest::build_job;

mod pods;
pub use pods::select_unit;

mod client;
pub use client::KubeJobClient;

mod memory;
pub use memory::MemoryCluster;
