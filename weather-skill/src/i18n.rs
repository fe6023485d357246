//! Localized user-facing strings.
//!
//! The host owns the real translation tables; the skill only knows message keys.
//! [`Catalog`] carries the English defaults so the skill works without a host.

use std::collections::HashMap;

pub trait Localizer: Send + Sync {
    /// Render `key`, replacing `{name}` placeholders from `params`.
    fn t(&self, key: &str, params: &[(&str, String)]) -> String;
}

const ENGLISH: &[(&str, &str)] = &[
    (
        "runtime.weather.errors.request",
        "Weather request failed: {reason}",
    ),
    (
        "runtime.weather.errors.status",
        "Weather service responded with status {status}",
    ),
    (
        "runtime.weather.errors.invalid_json",
        "Weather service returned invalid JSON",
    ),
    (
        "runtime.weather.errors.invalid_response",
        "Weather service response has no temperature",
    ),
    (
        "runtime.weather.errors.missing_api_config",
        "Weather API key is not configured",
    ),
    (
        "runtime.weather.errors.missing_city",
        "No city given and no default city configured",
    ),
    ("runtime.weather.setup.missing", "No API key provided"),
    ("runtime.weather.setup.saved", "API key saved"),
    (
        "runtime.weather.setup.failed",
        "Could not save API key: {reason}",
    ),
    (
        "prep.weather.missing_key",
        "Weather API key is missing, run setup first",
    ),
    (
        "prep.weather.api_error",
        "Could not get the weather for {city}",
    ),
    (
        "prep.weather.success",
        "Weather in {city}: {temp}°C, {description}",
    ),
    ("prep.ask_api_key", "OpenWeather API key: "),
];

/// Key → template table. Unknown keys render as the key itself.
#[derive(Debug, Clone)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn english() -> Self {
        let messages = ENGLISH
            .iter()
            .map(|(key, text)| (key.to_string(), text.to_string()))
            .collect();
        Self { messages }
    }

    /// Add or replace a template.
    pub fn with_message(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages.insert(key.into(), template.into());
        self
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::english()
    }
}

impl Localizer for Catalog {
    fn t(&self, key: &str, params: &[(&str, String)]) -> String {
        let Some(template) = self.messages.get(key) else {
            return key.to_string();
        };

        params.iter().fold(template.clone(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }
}
