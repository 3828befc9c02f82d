//! Request handlers module

pub mod client;
pub mod config;
pub mod department;
pub mod legal_entity;
