pub mod config;
pub mod http;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod services;
pub mod sqlite;
pub mod validation;
