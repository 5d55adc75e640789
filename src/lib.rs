pub mod app;
pub mod chain;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod models;
pub mod parser;
pub mod routes;
pub mod vector_store;
