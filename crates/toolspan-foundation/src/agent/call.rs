//! 按调用配置的 Agent
//! Agents configured per call
//!
//! A [`DynamicAgent`] carries a typed options value into every run and lets a
//! [`PrepareCall`] hook derive that run's model, instructions, temperature
//! and tools from it. The agent's own settings are left untouched.

use super::run::{RunObserver, RunSummary};
use super::traced::TracedAgent;
use std::sync::Arc;
use toolspan_kernel::{AgentResult, AgentSettings};

/// 从调用选项派生设置
/// Derives the settings of one run from its call options
pub trait PrepareCall<O>: Send + Sync {
    fn prepare(&self, options: &O, settings: AgentSettings) -> AgentSettings;
}

impl<O, F> PrepareCall<O> for F
where
    F: Fn(&O, AgentSettings) -> AgentSettings + Send + Sync,
{
    fn prepare(&self, options: &O, settings: AgentSettings) -> AgentSettings {
        self(options, settings)
    }
}

/// Traced agent whose settings are prepared from options on every call
pub struct DynamicAgent<O> {
    agent: TracedAgent,
    prepare: Arc<dyn PrepareCall<O>>,
}

impl<O> DynamicAgent<O> {
    pub fn new(agent: TracedAgent, prepare: impl PrepareCall<O> + 'static) -> Self {
        Self {
            agent,
            prepare: Arc::new(prepare),
        }
    }

    pub fn agent(&self) -> &TracedAgent {
        &self.agent
    }

    /// Settings a call with `options` would run with
    pub fn settings_for(&self, options: &O) -> AgentSettings {
        let mut settings = self.prepare.prepare(options, self.agent.settings().clone());
        settings.telemetry = self.agent.settings().telemetry.clone();
        settings
    }

    pub async fn run(
        &self,
        prompt: &str,
        options: &O,
        observer: &mut dyn RunObserver,
    ) -> AgentResult<RunSummary> {
        self.agent
            .run_with(prompt, |settings| self.prepare.prepare(options, settings), observer)
            .await
    }
}

impl<O> std::fmt::Debug for DynamicAgent<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicAgent")
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}
