//! # conform
//!
//! Architecture conformance checking over a language-neutral source model.
//!
//! This is the facade crate: it re-exports the core engine and adds the
//! test-harness runner.
//!
//! ## Quick Start — `cargo test` Integration
//!
//! ```rust,ignore
//! // tests/conformance.rs
//! use conform::runner::run_check;
//!
//! #[test]
//! fn architecture_conforms() {
//!     let model = build_model(); // however your frontend produces it
//!     run_check(&model, include_str!("../conform.toml"));
//! }
//! ```
//!
//! The TOML document declares the rules; `run_check` panics with the full
//! formatted report when an enforced rule fails.
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use conform::{Engine, Rule};
//!
//! let engine = Engine::builder().rules(rules).build();
//! let report = engine.check(&model);
//! assert!(!report.has_failures(), "{}", report.format());
//! ```

#![forbid(unsafe_code)]

// Re-export the core engine
pub use conform_core::*;

/// Test-harness entry points.
pub mod runner;
