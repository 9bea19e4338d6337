//! Kubeseed Engine - manifest template rendering
//!
//! This crate provides a MiniJinja-based renderer that turns a manifest
//! template plus a parameter set into the bytes of exactly one manifest:
//! - Strict parameters: a referenced but missing parameter is an error naming the key
//! - Pure and deterministic: no I/O, same inputs give the same bytes
//! - Kind check: the output must declare the kind the template was loaded as

pub mod error;
pub mod filters;
pub mod renderer;

pub use error::{RenderError, Result};
pub use renderer::{RenderedManifest, Renderer};
