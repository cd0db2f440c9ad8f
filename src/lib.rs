// Library for tests to access modules

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod models;
pub mod normalizer;
pub mod projection;
pub mod routes;
pub mod selection;
pub mod stream;
pub mod version;
pub mod window_store;
pub mod worker;
