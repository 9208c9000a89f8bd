//! Configuration, wire types and credential persistence

pub mod config;
pub mod credentials;
pub mod models;
pub mod storage;
