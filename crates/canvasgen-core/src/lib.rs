//! Core infrastructure for canvasgen.
//!
//! This crate turns extracted type facts into the inbound communication
//! section of a bounded context canvas:
//! - Type facts and the fact source boundary
//! - Selector language classifying facts into roles
//! - Link templates resolving handlers of generic contracts
//! - Relationship graph chaining commands to the events they cause
//! - Deterministic Mermaid flowchart rendering, split into lanes
//! - TOML settings, document assembly, error codes and JSON responses

pub mod config;
pub mod document;
pub mod error;
pub mod facts;
pub mod graph;
pub mod label;
pub mod link;
pub mod output;
pub mod render;
pub mod selector;
