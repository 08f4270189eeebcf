//! A runner that answers from a script instead of spawning anything.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use ms_core::{
    application::{
        ApplicationError,
        ports::{CommandOutput, CommandRunner, CommandSpec, CommandStatus},
    },
    error::MsResult,
};

/// Test double for [`CommandRunner`].
///
/// Responses are matched by prefix against the rendered command line
/// (`git status -sb`); the first matching rule wins, and unmatched
/// commands succeed with empty output. Every call is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<ScriptedInner>>,
}

#[derive(Debug, Default)]
struct ScriptedInner {
    rules: Vec<(String, CommandOutput)>,
    calls: Vec<CommandSpec>,
    missing: HashSet<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `output`.
    #[must_use]
    pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rules.push((prefix.to_string(), output));
        }
        self
    }

    /// Make `is_available(program)` report false.
    #[must_use]
    pub fn without_program(self, program: &str) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.missing.insert(program.to_string());
        }
        self
    }

    /// Recorded invocations in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.inner
            .lock()
            .map(|inner| inner.calls.clone())
            .unwrap_or_default()
    }

    /// Recorded command lines, for compact assertions.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display).collect()
    }

    fn answer(&self, spec: &CommandSpec) -> MsResult<CommandOutput> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner.calls.push(spec.clone());

        let line = spec.display();
        Ok(inner
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

impl CommandRunner for ScriptedRunner {
    fn capture(&self, spec: &CommandSpec) -> MsResult<CommandOutput> {
        self.answer(spec)
    }

    fn stream(&self, spec: &CommandSpec) -> MsResult<CommandStatus> {
        self.answer(spec).map(|out| CommandStatus(out.status))
    }

    fn is_available(&self, program: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| !inner.missing.contains(program))
            .unwrap_or(false)
    }
}
