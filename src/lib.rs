pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod docs;
pub mod error;
pub mod machine;
pub mod model;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod utils;
pub mod ws;
