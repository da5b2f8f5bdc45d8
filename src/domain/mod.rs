//! Core domain models for the update checker
//!
//! This module contains the fundamental types used throughout the application:
//! - Dependency and requirement structures
//! - Source classification (registry, git, path)
//! - Security advisories and credentials
//! - Update strategies, unlock levels and decisions

mod advisory;
mod credential;
mod dependency;
pub mod source;
mod update_result;

pub use advisory::{is_vulnerable, SecurityAdvisory};
pub use credential::{credential_for, Credential};
pub use dependency::{Dependency, Requirement, COMPOSER, DEVELOPMENT_GROUP, RUNTIME_GROUP};
pub use source::{classify, classify_dependency, is_replaced, Source, SourceKind};
pub use update_result::{RequirementsToUnlock, UpdateDecision, UpdateStrategy, UpdatedRequirements};
