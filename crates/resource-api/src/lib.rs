//! # Resource API
//!
//! Declarative resource types paired with get/set providers.
//!
//! A resource type is described by a [`ResourceDefinition`]: a set of typed
//! attributes, one of which is the namevar. A [`Provider`] reads the current
//! instances of a type and enforces target state. The reconciler compares
//! the two and hands the provider only what has to change.
//!
//! ## Core Concepts
//!
//! - **TypeSpec**: an attribute type expression such as `Enum[present, absent]`
//! - **ResourceType**: a compiled definition that validates and munges hashes
//! - **Provider**: the `get`/`set` pair, reporting through a [`ProviderLogger`]
//! - **Change**: a target hash paired with its current state
//! - **Registry**: every known type and the provider implementing it
//!
//! ## Example
//!
//! ```ignore
//! use resource_api::{
//!     Attribute, MemoryProvider, ReconcileOptions, Registry, ResourceDefinition,
//!     reconcile_simple,
//! };
//!
//! let mut registry = Registry::new();
//! registry.define(
//!     ResourceDefinition::new("pool")
//!         .attribute(Attribute::new("ensure", "Enum[present, absent]").docs("Presence"))
//!         .attribute(Attribute::new("name", "String").namevar().docs("Pool name")),
//! )?;
//! registry.implement("pool", MemoryProvider::new("name"))?;
//!
//! let targets = vec![serde_json::json!({ "name": "web" }).as_object().cloned().unwrap()];
//! let result = reconcile_simple(registry.get("pool")?, &targets, ReconcileOptions::default())?;
//! assert_eq!(result.summary.created, 1);
//! ```
//!
//! ## Shelling out
//!
//! Providers that drive external tools take a [`CommandRunner`] so the
//! commands can be scripted in tests.

pub mod command;
pub mod context;
pub mod definition;
pub mod diff;
pub mod error;
pub mod instance;
pub mod memory;
pub mod provider;
pub mod reconcile;
pub mod registry;
pub mod types;

// Re-export main types at crate root
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, ProviderContext, ProviderLogger, Status,
    StatusEvent,
};
pub use definition::{Attribute, ResourceDefinition, ResourceHash, ResourceRef, ResourceType};
pub use diff::{Change, ChangeKind, DiffSummary, compute_changes};
pub use error::{Error, Result};
pub use instance::Instance;
pub use memory::MemoryProvider;
pub use provider::{BoxedProvider, Provider};
pub use reconcile::{
    ExecuteSummary, ReconcileOptions, Reconciliation, canonicalize_targets, instances, plan,
    reconcile, reconcile_simple, retrieve,
};
pub use registry::{Entry, Registry, parse_target};
pub use types::{Mismatch, TypeSpec, merge_hashes};
