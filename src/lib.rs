pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod numbering;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
