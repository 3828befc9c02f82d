//! Entity module - SeaORM entity definitions
//!
//! One module per database table

pub mod client;
pub mod client_department;
pub mod department;
pub mod id_sequence;
pub mod legal_entity;
pub mod legal_entity_department;
