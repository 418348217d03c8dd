//! Vultr v2 HTTP API client
//!
//! `Client` owns the HTTP connection pool, authentication, request spacing
//! and transport retries. Each API family lives in its own module and is
//! reached through an accessor on the client, e.g. `client.instances().get(id)`.

pub mod client;
pub mod common;
pub mod error;
pub mod pool;
pub mod test_helpers;

pub mod account;
pub mod blocks;
pub mod databases;
pub mod domains;
pub mod firewalls;
pub mod instances;
pub mod iso;
pub mod kubernetes;
pub mod load_balancers;
pub mod object_storage;
pub mod os;
pub mod plans;
pub mod regions;
pub mod reserved_ips;
pub mod ssh_keys;
pub mod startup_scripts;
pub mod vpcs;

pub use client::{Client, RetryConfig, DEFAULT_ENDPOINT};
pub use common::{ApiQueryParams, ListOptions, Meta};
pub use error::ApiError;
