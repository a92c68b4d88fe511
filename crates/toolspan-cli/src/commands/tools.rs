//! Demo city tools with simulated latency

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolspan_kernel::{Tool, ToolError, ToolProgress, ToolResult, ToolSet};

/// Simulated latency of each city tool, in milliseconds
#[derive(Debug, Clone, Copy)]
pub struct ToolDelays {
    pub weather: u64,
    pub population: u64,
    pub timezone: u64,
    pub currency: u64,
}

/// Latencies of the interactive parallel demo
pub const PARALLEL_DELAYS: ToolDelays = ToolDelays {
    weather: 1000,
    population: 1200,
    timezone: 800,
    currency: 900,
};

/// Latencies used by the benchmark
pub const BENCH_DELAYS: ToolDelays = ToolDelays {
    weather: 800,
    population: 900,
    timezone: 700,
    currency: 600,
};

fn city_arg(input: &Value) -> Result<String, ToolError> {
    input
        .get("city")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments("`city` must be a string".to_string()))
}

fn city_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "city": { "type": "string", "description": "City name" }
        },
        "required": ["city"]
    })
}

fn random_weather(city: &str) -> Value {
    let mut rng = rand::thread_rng();
    let condition = ["sunny", "cloudy", "rainy", "partly cloudy"]
        .choose(&mut rng)
        .copied()
        .unwrap_or("sunny");
    json!({
        "city": city,
        "temperature": rng.gen_range(10..40),
        "condition": condition,
        "humidity": rng.gen_range(40..80),
    })
}

fn population(city: &str) -> Value {
    let known = match city {
        "Tokyo" => Some(13_960_000),
        "New York" => Some(8_336_000),
        "London" => Some(8_982_000),
        "Paris" => Some(2_161_000),
        "Sydney" => Some(5_312_000),
        _ => None,
    };
    let population =
        known.unwrap_or_else(|| rand::thread_rng().gen_range(1_000_000..6_000_000));
    json!({ "city": city, "population": population })
}

fn timezone(city: &str) -> Value {
    let timezone = match city {
        "Tokyo" => "Asia/Tokyo (UTC+9)",
        "New York" => "America/New_York (UTC-5)",
        "London" => "Europe/London (UTC+0)",
        "Paris" => "Europe/Paris (UTC+1)",
        "Sydney" => "Australia/Sydney (UTC+11)",
        _ => "UTC+0",
    };
    json!({ "city": city, "timezone": timezone })
}

fn currency(city: &str) -> Value {
    let currency = match city {
        "Tokyo" => "JPY (Japanese Yen)",
        "New York" => "USD (US Dollar)",
        "London" => "GBP (British Pound)",
        "Paris" => "EUR (Euro)",
        "Sydney" => "AUD (Australian Dollar)",
        _ => "USD",
    };
    json!({ "city": city, "currency": currency })
}

/// A city lookup that sleeps before answering
pub struct CityTool {
    name: &'static str,
    description: &'static str,
    delay: Duration,
    lookup: fn(&str) -> Value,
}

impl CityTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        delay_ms: u64,
        lookup: fn(&str) -> Value,
    ) -> Self {
        Self {
            name,
            description,
            delay: Duration::from_millis(delay_ms),
            lookup,
        }
    }
}

#[async_trait]
impl Tool for CityTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters_schema(&self) -> Value {
        city_schema()
    }

    async fn execute(&self, input: Value, _progress: ToolProgress) -> ToolResult {
        let city = city_arg(&input)?;
        tokio::time::sleep(self.delay).await;
        Ok((self.lookup)(&city))
    }
}

/// getWeather, getPopulation, getTimeZone and getCurrency
pub fn city_tools(delays: ToolDelays) -> ToolSet {
    ToolSet::new()
        .with_tool(Arc::new(CityTool::new(
            "getWeather",
            "Get the current weather for a city",
            delays.weather,
            random_weather,
        )))
        .with_tool(Arc::new(CityTool::new(
            "getPopulation",
            "Get the population of a city",
            delays.population,
            population,
        )))
        .with_tool(Arc::new(CityTool::new(
            "getTimeZone",
            "Get the timezone of a city",
            delays.timezone,
            timezone,
        )))
        .with_tool(Arc::new(CityTool::new(
            "getCurrency",
            "Get the currency used in a city",
            delays.currency,
            currency,
        )))
}

/// Weather lookup that reports each stage before the final answer
pub struct StreamingWeather {
    step: Duration,
}

impl StreamingWeather {
    pub fn new(step_ms: u64) -> Self {
        Self {
            step: Duration::from_millis(step_ms),
        }
    }
}

impl Default for StreamingWeather {
    fn default() -> Self {
        Self::new(800)
    }
}

#[async_trait]
impl Tool for StreamingWeather {
    fn name(&self) -> &str {
        "getWeather"
    }

    fn description(&self) -> &str {
        "Get the weather in a location (with streaming progress)"
    }

    fn parameters_schema(&self) -> Value {
        city_schema()
    }

    async fn execute(&self, input: Value, progress: ToolProgress) -> ToolResult {
        let city = city_arg(&input)?;

        progress.report(json!({
            "status": "connecting",
            "message": "Connecting to weather service...",
        }));
        tokio::time::sleep(self.step).await;

        progress.report(json!({
            "status": "fetching",
            "message": "Fetching weather data...",
            "progress": 30,
        }));
        tokio::time::sleep(self.step).await;

        progress.report(json!({
            "status": "processing",
            "message": "Processing data...",
            "progress": 70,
        }));
        tokio::time::sleep(self.step).await;

        Ok(json!({ "status": "complete", "data": random_weather(&city) }))
    }
}
