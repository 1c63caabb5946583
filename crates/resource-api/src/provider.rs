//! Provider trait - the get/set pair behind a resource type
//!
//! A provider reads the current state of every instance it manages (`get`)
//! and enforces target state for a batch of changes (`set`).

use anyhow::Result;

use crate::context::ProviderContext;
use crate::definition::ResourceHash;
use crate::diff::Change;

/// Core trait for resource providers
///
/// # Example
///
/// ```ignore
/// use resource_api::{Change, ChangeKind, Provider, ProviderContext, ResourceHash};
///
/// struct Hosts;
///
/// impl Provider for Hosts {
///     fn get(&self, _ctx: &mut ProviderContext) -> anyhow::Result<Vec<ResourceHash>> {
///         Ok(read_hosts_file()?)
///     }
///
///     fn set(&self, ctx: &mut ProviderContext, changes: &[Change]) -> anyhow::Result<()> {
///         for change in changes {
///             match change.kind {
///                 ChangeKind::Create => {
///                     ctx.logger.creating(&change.name, |_| add_host(&change.target));
///                 }
///                 ChangeKind::Delete => {
///                     ctx.logger.deleting(&change.name, |_| remove_host(&change.name));
///                 }
///                 _ => {}
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Provider: Send + Sync {
    /// Read the current state of all instances
    ///
    /// Every returned hash must carry the type's namevar.
    fn get(&self, ctx: &mut ProviderContext) -> Result<Vec<ResourceHash>>;

    /// Enforce the target state of the given changes
    ///
    /// Only changes that need work are passed in. Per-resource outcomes are
    /// reported through `ctx.logger`; an `Err` means the whole batch failed.
    /// With `ctx.noop` set nothing may be changed.
    fn set(&self, ctx: &mut ProviderContext, changes: &[Change]) -> Result<()>;

    /// Normalize a validated target hash before it is compared
    fn canonicalize(&self, _ctx: &mut ProviderContext, _resource: &mut ResourceHash) -> Result<()> {
        Ok(())
    }

    /// Whether a current instance titled `current` is the target titled `target`
    fn same_resource(&self, current: &str, target: &str) -> bool {
        current == target
    }
}

/// A boxed provider for type-erased storage
pub type BoxedProvider = Box<dyn Provider>;
