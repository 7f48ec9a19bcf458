// src/web/mod.rs
pub mod admin_handlers;
pub mod assignment_handlers;
pub mod attendance_handlers;
pub mod auth_handlers;
pub mod mw_admin;
pub mod mw_auth;
pub mod routes;
pub mod schedule_handlers;
