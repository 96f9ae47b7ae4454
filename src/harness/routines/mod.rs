//! One routine per remote tool
//!
//! A routine builds its fixtures, runs a fixed list of cases through
//! [`Harness::run_case`](crate::harness::Harness::run_case) and returns the
//! recorded outcomes. Fixture directories are removed when the routine ends.

pub mod calculator;
pub mod file_search;
pub mod image;
pub mod linecount;
pub mod patch;
pub mod rag;
pub mod resources;
pub mod shell;
pub mod workspace;
