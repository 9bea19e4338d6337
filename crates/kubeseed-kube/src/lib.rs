//! Kubeseed Kube - applying bundled add-ons to a Kubernetes API server
//!
//! This crate provides:
//! - **Objects**: `ManifestObject`, a tagged variant over the kinds kubeseed applies
//! - **Client**: the `ObjectApi` capability set, backed by kube-rs or by memory
//! - **Applier**: idempotent create-or-update of one rendered manifest
//! - **Installer**: ordered, fail-fast application of a `ComponentSpec`
//! - **Components**: the bundled add-ons (service CA, ingress, DNS) and their templates

pub mod applier;
pub mod assets;
pub mod client;
pub mod components;
pub mod error;
pub mod installer;
pub mod object;

pub use applier::{Applied, Applier, ApplyOutcome};
pub use assets::BundledAssets;
pub use client::{ApiCall, ApiOperation, FIELD_MANAGER, KubeApi, MockApi, ObjectApi};
pub use components::{Component, Dns, Ingress, ServiceCa, bundled, install, install_component, start_components};
pub use error::{ApplyError, ClientError, InstallError, Result};
pub use installer::{InstallOptions, InstallReport, InstallState, Installer};
pub use object::ManifestObject;
