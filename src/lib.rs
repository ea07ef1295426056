//! Employee record service: an actix-web API over a record store and a
//! chunked image store, plus the `emp` terminal client.

pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod utils;
