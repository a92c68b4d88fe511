//! Deterministic tool planning for the local engine

use serde_json::Value;
use toolspan_kernel::ToolSet;

/// One tool invocation decided by a planner
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCall {
    pub tool_name: String,
    pub input: Value,
}

impl PlannedCall {
    pub fn new(tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
        }
    }
}

/// Decides which tools a prompt needs and phrases the final answer
pub trait ToolPlanner: Send + Sync {
    fn plan(&self, prompt: &str, tools: &ToolSet) -> Vec<PlannedCall>;

    fn respond(&self, prompt: &str, results: &[(PlannedCall, Value)]) -> String {
        if results.is_empty() {
            return format!("I have no tool that can help with: {prompt}");
        }
        let mut text = String::from("Here is what I found:");
        for (call, output) in results {
            text.push_str(&format!("\n- {} {}: {}", call.tool_name, call.input, output));
        }
        text
    }
}

/// Calls every tool once for each known entity mentioned in the prompt.
///
/// Entities are matched case-insensitively and planned in the order they
/// appear in the prompt.
#[derive(Debug, Clone)]
pub struct EntityPlanner {
    argument: String,
    entities: Vec<String>,
}

impl EntityPlanner {
    pub fn new(
        argument: impl Into<String>,
        entities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            argument: argument.into(),
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }

    /// Planner over the demo cities, passed as `{"city": ...}`
    pub fn cities() -> Self {
        Self::new("city", ["Tokyo", "New York", "London", "Paris", "Sydney"])
    }

    /// Known entities mentioned in `prompt`, in order of appearance
    pub fn mentioned(&self, prompt: &str) -> Vec<&str> {
        let haystack = prompt.to_lowercase();
        let mut found: Vec<(usize, &str)> = self
            .entities
            .iter()
            .filter_map(|e| haystack.find(&e.to_lowercase()).map(|pos| (pos, e.as_str())))
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, e)| e).collect()
    }
}

impl ToolPlanner for EntityPlanner {
    fn plan(&self, prompt: &str, tools: &ToolSet) -> Vec<PlannedCall> {
        self.mentioned(prompt)
            .into_iter()
            .flat_map(|entity| {
                let mut input = serde_json::Map::new();
                input.insert(self.argument.clone(), Value::from(entity));
                let input = Value::Object(input);
                tools
                    .names()
                    .map(|tool| PlannedCall::new(tool, input.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
