//! Orbit CLI library — exposes modules for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod app;
pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod project;
pub mod runner;
pub mod settings;
pub mod templates;
pub mod tools;
pub mod version_gate;
