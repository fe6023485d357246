//! Explicit name → handler and topic → handler tables handed to the host dispatcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::debug;

use crate::{
    bus::Event,
    skill::{Prompt, WEATHER_INTENT, WeatherSkill},
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown tool: {0}")]
    NotFound(String),
}

/// What the host needs to advertise a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. Failures are reported inside the returned `{ok: false, ...}` object.
    async fn execute(&self, arguments: Value) -> Value;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, RegistryError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(tool.execute(arguments).await)
    }
}

#[async_trait]
pub trait Subscriber: Send + Sync {
    fn topic(&self) -> &str;

    async fn on_event(&self, event: &Event);
}

#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: HashMap<String, Vec<Box<dyn Subscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers
            .entry(subscriber.topic().to_string())
            .or_default()
            .push(subscriber);
    }

    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<_> = self.subscribers.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Run every handler bound to the event's topic, in registration order.
    /// Returns how many ran.
    pub async fn dispatch(&self, event: &Event) -> usize {
        let Some(handlers) = self.subscribers.get(&event.topic) else {
            debug!(topic = %event.topic, "no subscriber for topic");
            return 0;
        };

        for handler in handlers {
            handler.on_event(event).await;
        }
        handlers.len()
    }
}

/// Everything the skill exposes to the host.
pub struct SkillRegistry {
    pub tools: ToolRegistry,
    pub subscribers: SubscriberRegistry,
}

/// Build the tool and subscriber tables for `skill`.
pub fn build(skill: Arc<WeatherSkill>, prompt: Arc<dyn Prompt>) -> SkillRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(GetWeatherTool {
        skill: skill.clone(),
    }));
    tools.register(Box::new(SetupTool {
        skill: skill.clone(),
        prompt,
    }));

    let mut subscribers = SubscriberRegistry::new();
    subscribers.subscribe(Box::new(WeatherIntentSubscriber { skill }));

    SkillRegistry { tools, subscribers }
}

struct GetWeatherTool {
    skill: Arc<WeatherSkill>,
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Current weather for a city. Falls back to the last used city, then the default city."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. \"Oslo\""
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Value {
        let city = arguments.get("city").and_then(Value::as_str);
        self.skill.get_weather(city).await.to_json()
    }
}

struct SetupTool {
    skill: Arc<WeatherSkill>,
    prompt: Arc<dyn Prompt>,
}

#[async_trait]
impl Tool for SetupTool {
    fn name(&self) -> &str {
        "setup"
    }

    fn description(&self) -> &str {
        "Store the weather provider API key. Prompts for it when not given."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "api_key": {
                    "type": "string",
                    "description": "OpenWeather API key"
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Value {
        let api_key = arguments.get("api_key").and_then(Value::as_str);
        self.skill.setup(api_key, self.prompt.as_ref()).to_json()
    }
}

struct WeatherIntentSubscriber {
    skill: Arc<WeatherSkill>,
}

#[async_trait]
impl Subscriber for WeatherIntentSubscriber {
    fn topic(&self) -> &str {
        WEATHER_INTENT
    }

    async fn on_event(&self, event: &Event) {
        self.skill.on_weather_intent(event).await;
    }
}
