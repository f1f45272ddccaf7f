pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod notify;
pub mod pricing;
pub mod routes;
pub mod session;
pub mod state;
pub mod storefront;
pub mod stub;
pub mod telemetry;
pub mod threadpool;
pub mod tracker;
pub mod validation;
