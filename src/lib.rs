//! Ramu: a spoken-command assistant.

pub mod assistant;
pub mod backends;
pub mod commands;
pub mod config_loader;
pub mod dialogue;
pub mod ear;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod reminder;
pub mod services;
