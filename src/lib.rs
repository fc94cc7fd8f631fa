//!
//! bindery
//! -------
//! Asset-package middleware: declarative javascript and stylesheet packages
//! are resolved to source files, pushed through a filter chain, and served
//! over HTTP at deterministic public URLs, next to direct serving of
//! bundle-scoped files addressed through `@{bundleId}:{path}` references.

pub mod config;
pub mod error;
pub mod filter;
pub mod manager;
pub mod resolver;
pub mod server;
