//! mcp-harness Library
//!
//! Client plumbing and smoke-test routines for exercising a remote Model
//! Context Protocol server over Streamable HTTP.

pub mod config;
pub mod error;
pub mod harness;
pub mod mcp;
pub mod shutdown;
