//! Core NMAPP library (session, auth, history, navigation, backend client).

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod history;
pub mod navigation;
pub mod session;
pub mod telemetry;
