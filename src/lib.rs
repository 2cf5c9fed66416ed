// Library exports for Wellhub
// This allows integration tests and external code to use Wellhub modules

pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod quiz;
pub mod routes;
pub mod social;
pub mod state;
