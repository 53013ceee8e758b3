// Library for tests to access modules

pub mod aggregate;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod downsample;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pin_repo;
pub mod pins;
pub mod routes;
pub mod transform;
pub mod version;
pub mod worker;
