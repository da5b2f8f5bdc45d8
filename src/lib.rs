//! update_checker - Composer dependency update checker library
//!
//! This library decides whether a Composer dependency can be updated:
//! - Version and constraint model with Composer stability semantics
//! - Ignore and security advisory filtering of candidate versions
//! - Resolution through the composer binary with platform relaxation
//! - Update decisions at none, own and all unlock levels
//! - Requirement rewriting per update strategy

pub mod checker;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod package_manager;
pub mod progress;
pub mod registry;
pub mod resolver;
pub mod update;
pub mod version;
