// src/handlers/mod.rs

pub mod admin;
pub mod attempts;
pub mod auth;
pub mod dashboard;
pub mod papers;
pub mod sessions;
