//! Shared domain types for the Sem Parar report service.
//!
//! This crate contains the wire-protocol message types exchanged over the
//! MQTT bus, the report/run configuration structs, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod message;
