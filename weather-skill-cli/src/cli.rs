use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::{path::PathBuf, sync::Arc};
use weather_skill::{
    BroadcastBus, Event, FileStore, Prompt, SkillContext, WeatherSkill, registry,
    skill::WEATHER_INTENT, store::default_data_dir,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-skill", version, about = "Run the weather skill locally")]
pub struct Cli {
    /// Directory holding `memory.toml` and `secrets.toml` (defaults to the platform config dir).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Skill root; `prep/prep_result.json` below it is migrated into the stores.
    #[arg(long, global = true)]
    pub skill_path: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Direct invocation: print the weather line.
    Handle {
        #[arg(long)]
        city: Option<String>,
    },

    /// Invoke through an NLP intent with an entity bag.
    Intent {
        #[arg(long, default_value = WEATHER_INTENT)]
        intent: String,

        /// Entities as a JSON object, e.g. '{"city": "Oslo"}'.
        #[arg(long)]
        entities: Option<String>,
    },

    /// Call one of the skill's tools and print its JSON result.
    Tool {
        #[command(subcommand)]
        tool: ToolCommand,
    },

    /// Publish a weather intent event and print the notifications it produces.
    Event {
        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        actor: Option<String>,

        #[arg(long)]
        trace_id: Option<String>,
    },

    /// List the tools and subscribed topics.
    Tools,
}

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Current weather as structured data.
    GetWeather {
        #[arg(long)]
        city: Option<String>,
    },

    /// Store the provider API key. Prompts when `--api-key` is absent.
    Setup {
        #[arg(long)]
        api_key: Option<String>,
    },
}

/// Masked terminal prompt; Ctrl-C, Esc and closed stdin all count as no answer.
struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &str) -> Option<String> {
        inquire::Password::new(question)
            .without_confirmation()
            .prompt()
            .ok()
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let bus = Arc::new(BroadcastBus::default());
        let skill = Arc::new(WeatherSkill::new(self.context()?, bus.clone())?);
        let registry = registry::build(skill.clone(), Arc::new(TerminalPrompt));

        match self.command {
            Command::Handle { city } => {
                skill.handle(WEATHER_INTENT, &city_payload(city)).await;
            }
            Command::Intent { intent, entities } => {
                let entities: Value = match entities {
                    Some(raw) => serde_json::from_str(&raw)
                        .context("--entities must be a JSON object")?,
                    None => json!({}),
                };
                skill.handle_intent(&intent, &entities).await;
            }
            Command::Tool { tool } => {
                let (name, arguments) = match tool {
                    ToolCommand::GetWeather { city } => ("get_weather", city_payload(city)),
                    ToolCommand::Setup { api_key } => match api_key {
                        Some(key) => ("setup", json!({ "api_key": key })),
                        None => ("setup", Value::Null),
                    },
                };
                let result = registry.tools.call(name, arguments).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Command::Event {
                city,
                actor,
                trace_id,
            } => {
                let mut rx = bus.subscribe();
                let event = Event::new(WEATHER_INTENT, city_payload(city), "weather-skill-cli")
                    .with_actor(actor)
                    .with_trace_id(trace_id);

                registry.subscribers.dispatch(&event).await;

                while let Ok(emitted) = rx.try_recv() {
                    let text = emitted
                        .payload
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    println!("[{}] {text}", emitted.topic);
                }
            }
            Command::Tools => {
                for def in registry.tools.definitions() {
                    println!("{:<12} {}", def.name, def.description);
                }
                for topic in registry.subscribers.topics() {
                    println!("subscribes  {topic}");
                }
            }
        }

        Ok(())
    }

    fn context(&self) -> Result<SkillContext> {
        let data_dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };

        let memory = FileStore::load(data_dir.join("memory.toml"))?;
        let secrets = FileStore::load(data_dir.join("secrets.toml"))?;

        let ctx = SkillContext::new(Arc::new(memory), Arc::new(secrets));
        Ok(match &self.skill_path {
            Some(path) => ctx.with_skill_path(path),
            None => ctx,
        })
    }
}

fn city_payload(city: Option<String>) -> Value {
    match city {
        Some(city) => json!({ "city": city }),
        None => json!({}),
    }
}
