pub mod auth;
pub mod config;
pub mod gate;
pub mod session;
pub mod state;
pub mod web;
