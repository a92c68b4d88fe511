//! `toolspan dynamic` - model, language and verbosity chosen per call

use super::{backend_settings, shutdown_tracing, tracing_runtime};
use crate::cli::BackendKind;
use crate::output::{DynamicConsole, rule};
use async_trait::async_trait;
use clap::ValueEnum;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolspan_foundation::agent::{DynamicAgent, TracedAgentConfig, TracedAgentFactory};
use toolspan_foundation::engine::{EntityPlanner, LocalToolLoop, PlannedCall, ToolPlanner};
use toolspan_kernel::{AgentSettings, Tool, ToolError, ToolProgress, ToolResult, ToolSet};

const AGENT_ID: &str = "agent-dynamic-config";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
const PLACES: [&str; 6] = ["Tokyo", "Paris", "London", "San Francisco", "New York", "Sydney"];

/// Response language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Language {
    #[default]
    En,
    Zh,
    Ja,
    Es,
}

impl Language {
    pub fn instruction(self) -> &'static str {
        match self {
            Self::En => "You are a helpful weather assistant. Respond in English.",
            Self::Zh => {
                "You are a helpful weather assistant. Respond in Traditional Chinese (繁體中文)."
            }
            Self::Ja => "You are a helpful weather assistant. Respond in Japanese.",
            Self::Es => "You are a helpful weather assistant. Respond in Spanish.",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "Traditional Chinese",
            Self::Ja => "Japanese",
            Self::Es => "Spanish",
        }
    }
}

/// Response length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
    Brief,
    #[default]
    Normal,
    Detailed,
}

impl Verbosity {
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Brief => "Be very concise and brief in your responses.",
            Self::Normal => "Provide balanced, informative responses.",
            Self::Detailed => "Provide detailed, comprehensive explanations.",
        }
    }
}

/// Options supplied with each call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// Replaces the agent's model when set
    pub model: Option<String>,
    pub temperature: f32,
    pub language: Language,
    pub enable_translation: bool,
    pub verbosity: Verbosity,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            language: Language::default(),
            enable_translation: false,
            verbosity: Verbosity::default(),
        }
    }
}

/// Parse a sampling temperature in `0.0..=2.0`
pub fn parse_temperature(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=2.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be between 0 and 2, got {value}"))
    }
}

/// Settings for one call: instructions, tools and temperature come from the
/// options; the model only when one is given.
pub fn prepare_call(options: &CallOptions, settings: AgentSettings) -> AgentSettings {
    let mut tools = ToolSet::new().with_tool(Arc::new(LocationWeather));
    if options.enable_translation {
        tools.insert(Arc::new(Translate::new(options.language)));
    }
    let model = options
        .model
        .clone()
        .unwrap_or_else(|| settings.model.clone());

    settings
        .with_model(model)
        .with_instructions(format!(
            "{} {}",
            options.language.instruction(),
            options.verbosity.instruction()
        ))
        .with_temperature(options.temperature)
        .with_tools(tools)
}

/// `weather` tool keyed by `location`
pub struct LocationWeather;

#[async_trait]
impl Tool for LocationWeather {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get the weather in a location"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The location to get the weather for"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, input: Value, _progress: ToolProgress) -> ToolResult {
        let location = input
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("`location` must be a string".into()))?;
        let mut rng = rand::thread_rng();
        let condition = ["sunny", "cloudy", "rainy", "partly cloudy"]
            .choose(&mut rng)
            .copied()
            .unwrap_or("sunny");
        Ok(json!({
            "location": location,
            "temperature": rng.gen_range(15..35),
            "condition": condition,
            "unit": "celsius",
        }))
    }
}

/// `translate` tool; the target defaults to the call's language
pub struct Translate {
    language: Language,
}

impl Translate {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

#[async_trait]
impl Tool for Translate {
    fn name(&self) -> &str {
        "translate"
    }

    fn description(&self) -> &str {
        "Translate text to a target language"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" },
                "targetLanguage": { "type": "string" }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, input: Value, _progress: ToolProgress) -> ToolResult {
        let text = input
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("`text` must be a string".into()))?;
        let target = input
            .get("targetLanguage")
            .and_then(Value::as_str)
            .unwrap_or(self.language.name());
        Ok(json!({
            "original": text,
            "translated": format!("[Translated to {target}]: {text}"),
            "targetLanguage": target,
        }))
    }
}

/// Weather for each mentioned place, plus a translation of its name when the
/// call enabled `translate`
struct WeatherPlanner {
    places: EntityPlanner,
}

impl ToolPlanner for WeatherPlanner {
    fn plan(&self, prompt: &str, tools: &ToolSet) -> Vec<PlannedCall> {
        let translate = tools.get("translate").is_some();
        self.places
            .mentioned(prompt)
            .into_iter()
            .flat_map(|place| {
                let mut calls = vec![PlannedCall::new("weather", json!({ "location": place }))];
                if translate {
                    calls.push(PlannedCall::new("translate", json!({ "text": place })));
                }
                calls
            })
            .collect()
    }
}

fn weather_engine() -> Arc<LocalToolLoop> {
    let planner = WeatherPlanner {
        places: EntityPlanner::new("location", PLACES),
    };
    Arc::new(
        LocalToolLoop::new(Arc::new(planner))
            .with_model_latency("gpt-5-nano", Duration::from_millis(600))
            .with_model_latency("gpt-4o", Duration::from_millis(400)),
    )
}

/// One titled prompt with its options
pub struct Scenario {
    pub title: &'static str,
    pub prompt: &'static str,
    pub options: CallOptions,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            title: "English, Brief",
            prompt: "What's the weather like in Tokyo?",
            options: CallOptions {
                language: Language::En,
                verbosity: Verbosity::Brief,
                temperature: 0.5,
                ..CallOptions::default()
            },
        },
        Scenario {
            title: "Chinese, Detailed, With Translation",
            prompt: "What's the weather in Paris and London?",
            options: CallOptions {
                language: Language::Zh,
                verbosity: Verbosity::Detailed,
                enable_translation: true,
                temperature: 0.8,
                ..CallOptions::default()
            },
        },
        Scenario {
            title: "Using GPT-4o (Smarter Model)",
            prompt: "Compare the weather patterns in San Francisco and New York",
            options: CallOptions {
                model: Some("gpt-4o".to_string()),
                language: Language::En,
                verbosity: Verbosity::Detailed,
                temperature: 0.3,
                ..CallOptions::default()
            },
        },
    ]
}

async fn run_call(
    agent: &DynamicAgent<CallOptions>,
    title: &str,
    prompt: &str,
    options: &CallOptions,
) -> anyhow::Result<()> {
    println!("\n📍 {title}");
    println!("{}", "-".repeat(60));
    let mut console = DynamicConsole::new(&agent.settings_for(options));
    agent.run(prompt, options, &mut console).await?;
    println!();
    Ok(())
}

async fn run_all(
    agent: &DynamicAgent<CallOptions>,
    prompt: &[String],
    options: &CallOptions,
) -> anyhow::Result<()> {
    if !prompt.is_empty() {
        return run_call(agent, "Custom call", &prompt.join(" "), options).await;
    }
    for scenario in scenarios() {
        run_call(agent, scenario.title, scenario.prompt, &scenario.options).await?;
    }
    Ok(())
}

/// Run `prompt` with `options`, or the built-in scenarios when there is no
/// prompt
pub async fn run(
    backend: Option<BackendKind>,
    prompt: &[String],
    options: CallOptions,
) -> anyhow::Result<()> {
    let settings = backend_settings()?;
    let runtime = tracing_runtime(backend.unwrap_or(BackendKind::Phoenix), &settings);
    let factory = TracedAgentFactory::new(runtime.clone(), weather_engine());
    let agent = factory
        .create(file!(), TracedAgentConfig::default().with_agent_id(AGENT_ID))
        .await;
    let agent = DynamicAgent::new(agent, prepare_call);

    println!("{}", rule());
    println!("🤖 Dynamic Agent Configuration");
    println!("{}", rule());

    let outcome = run_all(&agent, prompt, &options).await;
    if outcome.is_ok() {
        println!("{}", rule());
        println!("✅ All calls completed!");
    }
    shutdown_tracing(&runtime).await;
    outcome
}
