//! Capability framework for code-analysis tools.
//!
//! This module defines the [`Capability`] trait every tool implements, and the
//! [`CapabilityRegistry`] the exploration loop dispatches through.
//!
//! # Example
//!
//! ```rust,ignore
//! use delver_explorer::{Capability, CapabilityOutput, CapabilityRegistry};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Capability for Echo {
//!     fn name(&self) -> &str { "echo" }
//!     fn description(&self) -> &str { "Echo the input" }
//!     fn parameters(&self) -> Value { json!({"type": "object"}) }
//!
//!     async fn execute(&self, params: Value) -> Result<CapabilityOutput> {
//!         Ok(CapabilityOutput::text(params.to_string()))
//!     }
//! }
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.register(Echo);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ExplorerError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Helper trait for extracting parameters from JSON.
pub trait ParamExt {
    /// Get a required string parameter.
    fn required_str(&self, name: &str) -> Result<&str>;

    /// Get an optional string parameter.
    fn optional_str(&self, name: &str) -> Option<&str>;

    /// Get an optional u64 parameter with default.
    ///
    /// Numeric strings are accepted, since inline calls carry strings.
    fn optional_u64(&self, name: &str, default: u64) -> u64;

    /// Get an optional boolean parameter with default.
    fn optional_bool(&self, name: &str, default: bool) -> bool;
}

impl ParamExt for serde_json::Value {
    fn required_str(&self, name: &str) -> Result<&str> {
        self.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ExplorerError::invalid_params(format!("missing required parameter '{}'", name))
            })
    }

    fn optional_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    fn optional_u64(&self, name: &str, default: u64) -> u64 {
        match self.get(name) {
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(default),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn optional_bool(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability Output
// ─────────────────────────────────────────────────────────────────────────────

/// What a capability returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOutput {
    pub content: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CapabilityOutput {
    /// A successful text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            error: None,
            metadata: None,
        }
    }

    /// A reported (non-exceptional) failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            success: false,
            error: Some(message.into()),
            metadata: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A named, schema-described code-analysis operation.
///
/// Implementations must be safe to share across concurrent sessions.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique name of this capability.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Execute with the given parameters.
    ///
    /// Failures should be returned, either as `Err` or as an output with
    /// `success == false`.
    async fn execute(&self, params: serde_json::Value) -> Result<CapabilityOutput>;
}

/// A tool as presented to the model and to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Grouping used when describing tools to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Discovery,
    Analysis,
    Detail,
}

impl ToolCategory {
    /// Classify a tool by name.
    pub fn of(name: &str) -> Self {
        const DISCOVERY: &[&str] = &[
            "find_by_name",
            "list_files_in_directory",
            "get_current_context",
            "get_project_structure",
        ];
        const ANALYSIS: &[&str] = &[
            "find_callers",
            "find_implementations",
            "find_relationships",
            "find_usages",
            "generate_test_plan",
        ];

        if name.contains("search") || DISCOVERY.contains(&name) {
            Self::Discovery
        } else if ANALYSIS.contains(&name) {
            Self::Analysis
        } else {
            Self::Detail
        }
    }

    /// Heading used in tool descriptions.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Discovery => "DISCOVERY TOOLS (find code)",
            Self::Analysis => "ANALYSIS TOOLS (understand relationships)",
            Self::Detail => "DETAIL TOOLS (examine specifics)",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of available capabilities.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, replacing any with the same name.
    pub fn register<C: Capability + 'static>(&mut self, capability: C) {
        let name = capability.name().to_string();
        self.capabilities.insert(name, Arc::new(capability));
    }

    /// Register a capability from an Arc.
    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        self.capabilities.insert(name, capability);
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    /// Check if a capability exists.
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// All capability names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// List every tool with its schema, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.names()
            .into_iter()
            .filter_map(|name| self.capabilities.get(name))
            .map(|c| ToolInfo {
                name: c.name().to_string(),
                description: c.description().to_string(),
                parameters: c.parameters(),
            })
            .collect()
    }

    /// Tools grouped by category, categories and names in stable order.
    pub fn grouped(&self) -> Vec<(ToolCategory, Vec<ToolInfo>)> {
        let mut groups: Vec<(ToolCategory, Vec<ToolInfo>)> = Vec::new();
        for info in self.list_tools() {
            let category = ToolCategory::of(&info.name);
            match groups.iter_mut().find(|(c, _)| *c == category) {
                Some((_, tools)) => tools.push(info),
                None => groups.push((category, vec![info])),
            }
        }
        groups.sort_by_key(|(c, _)| *c);
        groups
    }

    /// Describe every tool for inclusion in a prompt.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (category, tools) in self.grouped() {
            out.push_str(&format!("**{}:**\n", category.heading()));
            for tool in tools {
                out.push_str(&format!("- **{}**: {}\n", tool.name, tool.description));
                if let Some(props) = tool.parameters.get("properties").and_then(|p| p.as_object())
                    && !props.is_empty()
                {
                    let required: Vec<&str> = tool
                        .parameters
                        .get("required")
                        .and_then(|r| r.as_array())
                        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
                        .unwrap_or_default();
                    let params: Vec<String> = props
                        .keys()
                        .map(|k| {
                            if required.contains(&k.as_str()) {
                                format!("{}*", k)
                            } else {
                                k.clone()
                            }
                        })
                        .collect();
                    out.push_str(&format!("  Parameters: {}\n", params.join(", ")));
                }
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Capability (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// Behavior of a [`MockCapability`] when executed.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Output(CapabilityOutput),
    Fail(String),
    Panic(String),
}

/// A mock capability for testing.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct MockCapability {
    name: String,
    description: String,
    parameters: serde_json::Value,
    behavior: MockBehavior,
    calls: parking_lot::Mutex<Vec<serde_json::Value>>,
}

#[cfg(any(test, feature = "testing"))]
impl MockCapability {
    /// Create a mock returning "mock response".
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "A mock capability for testing".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
            behavior: MockBehavior::Output(CapabilityOutput::text("mock response")),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Return this content on every call.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.behavior = MockBehavior::Output(CapabilityOutput::text(content));
        self
    }

    /// Return this output on every call.
    pub fn with_output(mut self, output: CapabilityOutput) -> Self {
        self.behavior = MockBehavior::Output(output);
        self
    }

    /// Return `Err` on every call.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior = MockBehavior::Fail(message.into());
        self
    }

    /// Panic on every call.
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.behavior = MockBehavior::Panic(message.into());
        self
    }

    /// Parameters of every call made so far.
    pub fn calls(&self) -> Vec<serde_json::Value> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl Capability for MockCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> serde_json::Value {
        self.parameters.clone()
    }

    async fn execute(&self, params: serde_json::Value) -> Result<CapabilityOutput> {
        self.calls.lock().push(params);

        match &self.behavior {
            MockBehavior::Output(output) => Ok(output.clone()),
            MockBehavior::Fail(message) => Err(ExplorerError::capability(message.clone())),
            MockBehavior::Panic(message) => panic!("{}", message),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
