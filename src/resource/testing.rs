//! Scripted command runner for provider tests

use anyhow::{Result, anyhow};
use resource_api::{CommandOutput, CommandRunner};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// Replays canned outputs for an expected sequence of commands.
///
/// An expectation matches when the command line starts with it, so paths of
/// temporary files can be left out. Arguments naming existing files have
/// their content captured.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<VecDeque<(String, CommandOutput)>>,
    calls: Mutex<Vec<String>>,
    files: Mutex<Vec<String>>,
    executables: Vec<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(self, command_line: &str, output: CommandOutput) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back((command_line.to_string(), output));
        self
    }

    pub fn executable(mut self, path: &str) -> Self {
        self.executables.push(path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Contents of files passed as arguments, in call order
    pub fn files(&self) -> Vec<String> {
        self.files.lock().unwrap().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.script.lock().unwrap().is_empty()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = format!("{} {}", cmd, args.join(" "));
        self.calls.lock().unwrap().push(line.clone());

        for arg in args {
            if Path::new(arg).is_file()
                && let Ok(content) = std::fs::read_to_string(arg)
            {
                self.files.lock().unwrap().push(content);
            }
        }

        let (expected, output) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected command: {line}"))?;
        if !line.starts_with(&expected) {
            return Err(anyhow!("expected `{expected}`, got `{line}`"));
        }
        Ok(output)
    }

    fn is_executable(&self, path: &str) -> bool {
        self.executables.iter().any(|p| p == path)
    }
}
