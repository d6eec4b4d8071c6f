//! Recipe-sharing backend: signup, login, sessions and per-user recipes.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod recipes;
pub mod state;
pub mod store;
pub mod validation;
