//! Tool dispatch.
//!
//! Turns a [`ToolCall`] into a [`ToolExecution`]. Every failure mode (unknown
//! tool, returned error, reported failure, panic) becomes a failed execution;
//! nothing here can abort the loop.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;

use crate::capability::CapabilityRegistry;
use crate::config::ResultRetention;
use crate::types::{Parameters, ToolCall, ToolExecution};

/// Marker appended to results cut by [`ResultRetention::Limited`].
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Result text recorded for calls past the budget.
pub const SKIPPED_MESSAGE: &str = "Skipped: Maximum tool calls reached";

/// Dispatches tool calls to a registry.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    registry: &'a CapabilityRegistry,
    retention: ResultRetention,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a CapabilityRegistry, retention: ResultRetention) -> Self {
        Self {
            registry,
            retention,
        }
    }

    /// Dispatch one call.
    ///
    /// `recorded` is the parameter map stored on the execution; the
    /// capability always receives the call's own parameters.
    pub async fn dispatch(&self, call: &ToolCall, recorded: Parameters) -> ToolExecution {
        let Some(capability) = self.registry.get(&call.tool) else {
            tracing::warn!(tool = %call.tool, "Unknown tool requested");
            return ToolExecution::failure(
                &call.tool,
                recorded,
                format!("Error: Unknown tool '{}'", call.tool),
            );
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(capability.execute(call.parameters_value()))
            .catch_unwind()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let execution = match outcome {
            Ok(Ok(output)) if output.success => {
                ToolExecution::success(&call.tool, recorded, self.retain(output.content))
            }
            Ok(Ok(output)) => {
                let message = output
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or(output.content);
                ToolExecution::failure(&call.tool, recorded, message)
            }
            Ok(Err(e)) => {
                ToolExecution::failure(&call.tool, recorded, format!("Error executing tool: {}", e))
            }
            Err(panic) => ToolExecution::failure(
                &call.tool,
                recorded,
                format!("Error executing tool: {}", panic_message(panic.as_ref())),
            ),
        };

        tracing::info!(
            tool = %call.tool,
            success = execution.success,
            duration_ms,
            result_len = execution.result.len(),
            "Tool executed"
        );

        execution
    }

    /// Record a call that was not dispatched because the budget ran out.
    pub fn skipped(call: &ToolCall, recorded: Parameters) -> ToolExecution {
        ToolExecution::failure(&call.tool, recorded, SKIPPED_MESSAGE)
    }

    fn retain(&self, content: String) -> String {
        match self.retention {
            ResultRetention::Unlimited => content,
            ResultRetention::Limited(cap) => truncate_with_marker(content, cap),
        }
    }
}

/// Cut `content` to at most `cap` bytes at a char boundary, marking the cut.
pub fn truncate_with_marker(mut content: String, cap: usize) -> String {
    if content.len() <= cap {
        return content;
    }
    let mut end = cap;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    content.truncate(end);
    content.push_str(TRUNCATION_MARKER);
    content
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "capability panicked".to_string()
    }
}
