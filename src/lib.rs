pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;
pub mod state;
pub mod validation;
