//! Scripted agent engine and manual clock

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use toolspan_foundation::agent::Clock;
use toolspan_kernel::{AgentEngine, AgentError, AgentEvent, AgentResult, EventStream, RunRequest};

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Clock starting at 2025-01-01T00:00:00Z
    pub fn epoch() -> Self {
        Self::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// One step of a script
#[derive(Debug, Clone)]
pub enum Step {
    /// Move the clock forward before the next event
    Advance(Duration),
    /// Yield an event
    Emit(AgentEvent),
}

impl Step {
    pub fn advance_ms(ms: u64) -> Self {
        Step::Advance(Duration::from_millis(ms))
    }
}

impl From<AgentEvent> for Step {
    fn from(event: AgentEvent) -> Self {
        Step::Emit(event)
    }
}

/// Engine that replays the same script for every run.
///
/// Clock advances happen lazily, while the stream is polled, so the consumer
/// observes each event at the scripted instant.
pub struct ScriptedEngine {
    steps: Vec<Step>,
    clock: Arc<ManualClock>,
    start_error: Option<String>,
    requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedEngine {
    pub fn new(clock: Arc<ManualClock>, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            clock,
            start_error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Engine whose runs fail before producing any event
    pub fn failing(clock: Arc<ManualClock>, message: impl Into<String>) -> Self {
        Self {
            start_error: Some(message.into()),
            ..Self::new(clock, Vec::new())
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AgentEngine for ScriptedEngine {
    async fn stream(&self, request: RunRequest) -> AgentResult<EventStream> {
        self.requests.lock().push(request);
        if let Some(message) = &self.start_error {
            return Err(AgentError::EngineUnavailable(message.clone()));
        }

        let steps = self.steps.clone().into_iter();
        let clock = self.clock.clone();
        let stream = futures::stream::unfold((steps, clock), |(mut steps, clock)| async move {
            loop {
                match steps.next()? {
                    Step::Advance(by) => clock.advance(by),
                    Step::Emit(event) => return Some((event, (steps, clock))),
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn advances_clock_between_events() {
        let clock = Arc::new(ManualClock::epoch());
        let start = clock.now();
        let engine = ScriptedEngine::new(
            clock.clone(),
            [
                Step::advance_ms(250),
                AgentEvent::text("a").into(),
                Step::advance_ms(250),
            ],
        );

        let mut events = engine
            .stream(RunRequest::new(Default::default(), "p"))
            .await
            .unwrap();
        assert_eq!(events.next().await, Some(AgentEvent::text("a")));
        assert_eq!((clock.now() - start).num_milliseconds(), 250);
        assert_eq!(events.next().await, None);
        assert_eq!((clock.now() - start).num_milliseconds(), 500);
        assert_eq!(engine.requests().len(), 1);
    }
}
