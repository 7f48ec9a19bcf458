// src/models/mod.rs
pub mod assignment;
pub mod attendance;
pub mod catalog;
pub mod ids;
pub mod schedule;
pub mod user;
