use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::{fs, path::Path};
use tracing::{debug, warn};

use crate::{
    context::SkillContext,
    store::{KeyValueStore, get_non_empty},
};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Secret store key.
pub const API_KEY: &str = "api_key";
/// Memory store keys.
pub const API_ENTRY_POINT: &str = "api_entry_point";
pub const DEFAULT_CITY: &str = "default_city";

/// Skill-relative location of the old prep cache.
pub const LEGACY_ARTIFACT: &str = "prep/prep_result.json";

/// Effective runtime configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    /// Never empty; falls back to [`DEFAULT_API_ENDPOINT`].
    pub api_entry_point: String,
    pub default_city: Option<String>,
}

/// `resources` section of the legacy prep artifact. Only non-empty strings are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyResources {
    pub api_key: Option<String>,
    pub default_city: Option<String>,
    pub api_entry_point: Option<String>,
}

/// Read the legacy artifact under `skill_path`. Any failure means "no legacy data".
pub fn read_legacy(skill_path: &Path) -> Option<LegacyResources> {
    let path = skill_path.join(LEGACY_ARTIFACT);
    if !path.exists() {
        return None;
    }

    match parse_legacy(&path) {
        Ok(resources) => Some(resources),
        Err(err) => {
            debug!(path = %path.display(), "ignoring legacy artifact: {err:#}");
            None
        }
    }
}

fn parse_legacy(path: &Path) -> Result<LegacyResources> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read legacy artifact: {}", path.display()))?;

    let artifact: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse legacy artifact: {}", path.display()))?;

    let artifact = artifact
        .as_object()
        .ok_or_else(|| anyhow!("Legacy artifact is not a JSON object: {}", path.display()))?;

    // Each key stands on its own: a value of the wrong type only drops that key.
    let resources = artifact.get("resources").and_then(Value::as_object);
    let field = |key: &str| {
        resources
            .and_then(|r| r.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Ok(LegacyResources {
        api_key: field(API_KEY),
        default_city: field(DEFAULT_CITY),
        api_entry_point: field(API_ENTRY_POINT),
    })
}

/// Assemble the configuration from the secret store, memory and, for values still
/// missing, the legacy artifact. Migrated values are written back to the stores.
pub fn load_config(ctx: &SkillContext) -> Config {
    let mut api_key = get_non_empty(ctx.secrets.as_ref(), API_KEY);
    let mut api_entry_point = get_non_empty(ctx.memory.as_ref(), API_ENTRY_POINT);
    let mut default_city = get_non_empty(ctx.memory.as_ref(), DEFAULT_CITY);

    let legacy = ctx.skill_path.as_deref().and_then(read_legacy);
    if let Some(resources) = legacy {
        migrate(
            &mut api_key,
            resources.api_key,
            ctx.secrets.as_ref(),
            API_KEY,
        );
        migrate(
            &mut default_city,
            resources.default_city,
            ctx.memory.as_ref(),
            DEFAULT_CITY,
        );
        migrate(
            &mut api_entry_point,
            resources.api_entry_point,
            ctx.memory.as_ref(),
            API_ENTRY_POINT,
        );
    }

    Config {
        api_key,
        api_entry_point: api_entry_point
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        default_city,
    }
}

/// Adopt `legacy` into `live` when the live value is missing and persist it.
fn migrate(
    live: &mut Option<String>,
    legacy: Option<String>,
    store: &dyn KeyValueStore,
    key: &str,
) {
    if live.is_some() {
        return;
    }
    let Some(value) = legacy else {
        return;
    };

    debug!(key, "migrating value from legacy artifact");
    if let Err(err) = store.set(key, &value) {
        warn!(key, "failed to persist migrated value: {err:#}");
    }
    *live = Some(value);
}
