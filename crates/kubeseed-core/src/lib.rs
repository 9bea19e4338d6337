//! Kubeseed Core - shared types for bringing up bundled cluster add-ons
//!
//! This crate provides the foundational types used throughout kubeseed:
//! - `NodeConfig`: Runtime configuration of the node (cluster DNS, data directory, images)
//! - `ParameterSet`: Named values substituted into manifest templates
//! - `ResourceKind` / `ResourceDescriptor`: The closed set of kinds kubeseed applies
//! - `ManifestTemplate` / `AssetSource`: Template text addressed by path
//! - `ComponentSpec`: The ordered kind groups one add-on needs

pub mod component;
pub mod config;
pub mod error;
pub mod params;
pub mod resource;
pub mod template;

pub use component::{ApplyPolicy, ComponentSpec, ComponentSpecBuilder, KindGroup, ManifestRef, Payload};
pub use config::{ClusterConfig, Images, NodeConfig};
pub use error::{CoreError, Result};
pub use params::ParameterSet;
pub use resource::{ApplyStage, ResourceDescriptor, ResourceKind};
pub use template::{AssetSource, ManifestTemplate};
