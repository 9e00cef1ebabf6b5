//! A small HTTP API in front of a locally loaded language model, plus a
//! digest of formulae newly added to Homebrew.
//!
//! The model runs in `llama-server` (llama.cpp); the Homebrew formula
//! repository is mirrored with shallow `git` clones. Neither is reimplemented
//! here: this crate is the glue between them and an `axum` HTTP surface.
//!
//! # Flow
//!
//! ```text
//! HTTP ──▶ repo (sync + list added files) ──▶ descriptor (per file)
//!   ▲                                              │
//!   └──────────── model (summarize) ◀──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`] — TOML configuration with environment overrides
//! - [`model`] — chat adapter over the local model runtime
//! - [`repo`] — repository mirroring behind the [`repo::RepositorySource`] trait
//! - [`descriptor`] — line-prefix extraction of formula fields
//! - [`digest`] — the new-formula digest pipeline
//! - [`escape`] — backslash escape decoding for digest output
//! - [`server`] — HTTP routes and startup

pub mod config;
pub mod descriptor;
pub mod digest;
pub mod escape;
pub mod model;
pub mod repo;
pub mod server;
