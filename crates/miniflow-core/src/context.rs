use crate::Value;
use std::collections::HashMap;

/// Reserved variable names written by the runner and the built-in nodes
pub mod keys {
    /// Outcome of the last Conditional node, `"TRUE"` or `"FALSE"`
    pub const BRANCH: &str = "__branch";
    pub const LAST_ERROR: &str = "__lastError";
    pub const WORKFLOW_HAS_ERRORS: &str = "__workflowHasErrors";

    pub const STATUS: &str = "status";
    pub const HTTP_STATUS: &str = "httpStatus";
    pub const HTTP_BODY: &str = "httpBody";

    pub const LAST_STDOUT: &str = "lastStdout";
    pub const LAST_STDERR: &str = "lastStderr";
    pub const LAST_EXIT_CODE: &str = "lastExitCode";

    pub const LAST_CREATED_FOLDER: &str = "lastCreatedFolder";

    /// Input variable appended as an extra argument to python commands
    pub const PAYLOAD: &str = "payload";
}

/// Run-scoped variable store.
///
/// Owned by exactly one run; the runner clears it before starting so a reused
/// instance never leaks state between runs.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    variables: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    /// `None` when the key was never set; `Some(Value::Null)` when it was set to null
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    /// Convenience view of the branch outcome
    pub fn branch(&self) -> Option<String> {
        self.get(keys::BRANCH).map(|v| v.to_string())
    }

    pub fn has_errors(&self) -> bool {
        matches!(self.get(keys::WORKFLOW_HAS_ERRORS), Some(Value::Bool(true)))
    }
}
