pub mod api;
pub mod binder;
pub mod config;
pub mod console;
pub mod controller;
pub mod data_models;
pub mod delete_handler;
pub mod dispatcher;
pub mod error;
pub mod prompt;
pub mod render;
pub mod table;
