// Library exports for minifeed
// This allows integration tests and external code to use minifeed modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod graphql;
pub mod ledger;
pub mod routes;
pub mod social;
pub mod state;
