//! Commerce Actions - configuration-driven action engine for conversational commerce
//!
//! An orchestration caller (typically an LLM) picks actions from a registry
//! built from a declarative configuration file. This crate validates and
//! executes those actions against a commerce backend and streams the results
//! back as typed server-sent events.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
