//! `iis_application_pool` - IIS application pools through a PowerShell proxy
//!
//! The proxy is two scripts. `fetch_application_pools.ps1` prints every pool
//! as a JSON array of resource hashes. `enforce_application_pools.ps1` takes
//! the current and target state as JSON arguments, plus `-Noop`, and prints a
//! JSON array of `{name, status, message}` status hashes.

use anyhow::{Context, Result};
use resource_api::{
    Attribute, Change, CommandRunner, Provider, ProviderContext, ResourceDefinition,
    ResourceHash, StatusEvent,
};
use std::path::PathBuf;
use std::sync::Arc;

const FETCH_SCRIPT: &str = "fetch_application_pools.ps1";
const ENFORCE_SCRIPT: &str = "enforce_application_pools.ps1";

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new("iis_application_pool")
        .docs("Manage an IIS application pool through a powershell proxy.")
        .attribute(
            Attribute::new("ensure", "Enum[present, absent]").docs(
                "Whether this ApplicationPool should be present or absent on the target system.",
            ),
        )
        .attribute(
            Attribute::new("name", "String")
                .docs("The name of the ApplicationPool.")
                .namevar(),
        )
        .attribute(
            Attribute::new("state", "Enum[running, stopped]")
                .docs("The state of the ApplicationPool.")
                .default_value("running"),
        )
        .attribute(
            Attribute::new("managedpipelinemode", "String")
                .docs("The managedPipelineMode of the ApplicationPool."),
        )
        .attribute(
            Attribute::new("managedruntimeversion", "String")
                .docs("The managedRuntimeVersion of the ApplicationPool."),
        )
}

pub struct IisApplicationPoolProvider {
    runner: Arc<dyn CommandRunner>,
    powershell: String,
    scripts_dir: PathBuf,
}

impl IisApplicationPoolProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, powershell: &str, scripts_dir: PathBuf) -> Self {
        Self {
            runner,
            powershell: powershell.to_string(),
            scripts_dir,
        }
    }

    fn run_script(&self, script: &str, extra: &[&str]) -> Result<String> {
        let path = self.scripts_dir.join(script);
        let path = path.to_string_lossy();
        let mut args = vec![
            "-NoProfile",
            "-NonInteractive",
            "-ExecutionPolicy",
            "Bypass",
            "-File",
            &*path,
        ];
        args.extend_from_slice(extra);
        self.runner.run_capture(&self.powershell, &args)
    }
}

impl Provider for IisApplicationPoolProvider {
    fn get(&self, _ctx: &mut ProviderContext) -> Result<Vec<ResourceHash>> {
        let output = self.run_script(FETCH_SCRIPT, &[])?;
        serde_json::from_str(output.trim())
            .with_context(|| format!("{FETCH_SCRIPT} returned invalid JSON"))
    }

    fn set(&self, ctx: &mut ProviderContext, changes: &[Change]) -> Result<()> {
        let current: Vec<&ResourceHash> = changes.iter().filter_map(|c| c.current.as_ref()).collect();
        let target: Vec<&ResourceHash> = changes.iter().map(|c| &c.target).collect();
        let current = serde_json::to_string(&current)?;
        let target = serde_json::to_string(&target)?;

        let mut args = vec![current.as_str(), target.as_str()];
        if ctx.noop {
            args.push("-Noop");
        }
        let output = self.run_script(ENFORCE_SCRIPT, &args)?;

        let events: Vec<StatusEvent> = serde_json::from_str(output.trim())
            .with_context(|| format!("{ENFORCE_SCRIPT} returned invalid status data"))?;
        for event in events {
            ctx.logger
                .record(event.resource.as_deref(), event.status, &event.message);
        }
        Ok(())
    }
}
