//! cssvars-core: CSS custom-property registry.
//!
//! This crate provides:
//! - A variable registry with set-time resolution of embedded references
//! - Named themes with static and breakpoint-based (responsive) values
//! - Style sinks: a no-op sink and an in-memory document
//! - Configuration types and parsing
//! - Logging setup

pub mod config;
pub mod document;
pub mod error;
pub mod expr;
pub mod logging;
pub mod registry;
pub mod sink;
pub mod theme;

pub use config::{Config, ConfigLoadResult};
pub use document::{Document, SharedDocument};
pub use error::{Error, Result};
pub use expr::{Expr, ReferenceError, Segment};
pub use registry::{DEFAULT_CONTAINER_ID, ReferenceMode, VariableRegistry, custom_property, var_reference};
pub use sink::{MediaRule, NoopSink, StyleSink};
pub use theme::{Breakpoints, ThemeDefinition, VarDefinition};
