//! Weather skill for the assistant host runtime.
//!
//! This crate defines:
//! - Configuration resolution, including migration from the legacy prep artifact
//! - City resolution with a remembered last city
//! - The single OpenWeather request and its uniform result shape
//! - The entry points (direct call, tools, intent subscriber) and their registry
//! - Host seams: key/value stores, event bus, localization
//!
//! It is used by `weather-skill-cli`, but any host can embed it by supplying a
//! [`SkillContext`] and an [`EventBus`].

pub mod bus;
pub mod city;
pub mod config;
pub mod context;
pub mod i18n;
pub mod model;
pub mod provider;
pub mod registry;
pub mod skill;
pub mod store;

pub use bus::{BroadcastBus, Event, EventBus};
pub use city::resolve_city;
pub use config::{Config, DEFAULT_API_ENDPOINT, LegacyResources, load_config, read_legacy};
pub use context::SkillContext;
pub use i18n::{Catalog, Localizer};
pub use model::{FetchError, ToolResponse, WeatherReport};
pub use provider::WeatherFetcher;
pub use registry::{SkillRegistry, Subscriber, Tool, ToolDefinition, ToolRegistry};
pub use skill::{NoPrompt, Prompt, WeatherSkill};
pub use store::{FileStore, KeyValueStore, MemoryStore};
