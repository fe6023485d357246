//! Entry points of the skill. All of them run the same pipeline
//! (config → city → fetch) and differ only in how they report the outcome.

use anyhow::Result;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    bus::{Event, EventBus},
    city::resolve_city,
    config::{API_KEY, load_config},
    context::SkillContext,
    model::ToolResponse,
    provider::WeatherFetcher,
};

pub const SKILL_NAME: &str = "weather_skill";
pub const WEATHER_INTENT: &str = "nlp.intent.weather.get";
pub const NOTIFY_TOPIC: &str = "ui.notify";

/// Asks the user for a value interactively.
pub trait Prompt: Send + Sync {
    /// `None` when input is closed or the user cancels.
    fn ask(&self, question: &str) -> Option<String>;
}

/// Prompt for hosts without a user at the keyboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn ask(&self, _question: &str) -> Option<String> {
        None
    }
}

pub struct WeatherSkill {
    ctx: SkillContext,
    fetcher: WeatherFetcher,
    bus: Arc<dyn EventBus>,
}

impl WeatherSkill {
    pub fn new(ctx: SkillContext, bus: Arc<dyn EventBus>) -> Result<Self> {
        Ok(Self::with_fetcher(ctx, bus, WeatherFetcher::new()?))
    }

    pub fn with_fetcher(
        ctx: SkillContext,
        bus: Arc<dyn EventBus>,
        fetcher: WeatherFetcher,
    ) -> Self {
        Self { ctx, fetcher, bus }
    }

    pub fn context(&self) -> &SkillContext {
        &self.ctx
    }

    /// Run the pipeline and render the outcome as one notification line.
    async fn notification_text(&self, requested: Option<&str>) -> String {
        let cfg = load_config(&self.ctx);
        let Some(api_key) = cfg.api_key else {
            return self.ctx.t("prep.weather.missing_key", &[]);
        };

        let Some(city) = resolve_city(&self.ctx, requested, cfg.default_city.as_deref()) else {
            return self.ctx.t("prep.weather.api_error", &[("city", "".into())]);
        };

        let endpoint = &cfg.api_entry_point;
        match self.fetcher.fetch(endpoint, &api_key, &city).await {
            Ok(report) => self.ctx.t(
                "prep.weather.success",
                &[
                    ("city", report.city),
                    ("temp", report.temp.to_string()),
                    ("description", report.description),
                ],
            ),
            Err(err) => {
                warn!(%city, "weather lookup failed: {err}");
                self.ctx.t("prep.weather.api_error", &[("city", city)])
            }
        }
    }

    /// Direct invocation: prints the outcome and returns the printed line.
    pub async fn handle(&self, topic: &str, payload: &Value) -> String {
        info!(%topic, "handling weather request");
        let text = self.notification_text(city_of(payload)).await;
        println!("{text}");
        text
    }

    /// Adapter from an NLP intent with an entity bag.
    pub async fn handle_intent(&self, intent: &str, entities: &Value) -> String {
        let topic = if intent.is_empty() {
            WEATHER_INTENT
        } else {
            intent
        };
        let payload = match city_of(entities) {
            Some(city) => json!({ "city": city }),
            None => json!({}),
        };
        self.handle(topic, &payload).await
    }

    /// `get_weather` tool.
    pub async fn get_weather(&self, city: Option<&str>) -> ToolResponse {
        let cfg = load_config(&self.ctx);
        let Some(api_key) = cfg.api_key else {
            return ToolResponse::Error(
                self.ctx.t("runtime.weather.errors.missing_api_config", &[]),
            );
        };

        let Some(city) = resolve_city(&self.ctx, city, cfg.default_city.as_deref()) else {
            return ToolResponse::Error(self.ctx.t("runtime.weather.errors.missing_city", &[]));
        };

        let endpoint = &cfg.api_entry_point;
        match self.fetcher.fetch(endpoint, &api_key, &city).await {
            Ok(report) => ToolResponse::Weather(report),
            Err(err) => ToolResponse::Error(err.localize(self.ctx.i18n.as_ref())),
        }
    }

    /// `setup` tool: store an API key, asking for one when none is supplied.
    pub fn setup(&self, api_key: Option<&str>, prompt: &dyn Prompt) -> ToolResponse {
        let mut provided = api_key.map(str::trim).unwrap_or_default().to_string();
        if provided.is_empty() {
            provided = prompt
                .ask(&self.ctx.t("prep.ask_api_key", &[]))
                .map(|answer| answer.trim().to_string())
                .unwrap_or_default();
        }
        if provided.is_empty() {
            return ToolResponse::Error(self.ctx.t("runtime.weather.setup.missing", &[]));
        }

        if let Err(err) = self.ctx.secrets.set(API_KEY, &provided) {
            warn!("failed to store API key: {err:#}");
            let params = [("reason", format!("{err:#}"))];
            return ToolResponse::Error(self.ctx.t("runtime.weather.setup.failed", &params));
        }

        info!("weather API key saved");
        ToolResponse::Message(self.ctx.t("runtime.weather.setup.saved", &[]))
    }

    /// Subscriber for [`WEATHER_INTENT`]: answers with one `ui.notify` event.
    pub async fn on_weather_intent(&self, event: &Event) {
        let text = self.notification_text(city_of(&event.payload)).await;

        let notification = Event::new(NOTIFY_TOPIC, json!({ "text": text }), SKILL_NAME)
            .with_actor(event.actor.clone())
            .with_trace_id(event.trace_id.clone());

        if let Err(err) = self.bus.emit(notification).await {
            warn!(trace_id = ?event.trace_id, "failed to emit weather notification: {err:#}");
        }
    }
}

fn city_of(payload: &Value) -> Option<&str> {
    payload
        .get("city")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bus::BroadcastBus, config::DEFAULT_CITY, i18n::Catalog, store::MemoryStore};
    use std::sync::Mutex;

    struct ScriptedPrompt {
        answer: Option<String>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        fn new(answer: Option<&str>) -> Self {
            Self {
                answer: answer.map(str::to_string),
                asked: Mutex::default(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&self, question: &str) -> Option<String> {
            self.asked.lock().unwrap().push(question.to_string());
            self.answer.clone()
        }
    }

    fn skill(ctx: SkillContext) -> (WeatherSkill, Arc<BroadcastBus>) {
        let bus = Arc::new(BroadcastBus::default());
        (WeatherSkill::new(ctx, bus.clone()).unwrap(), bus)
    }

    #[test]
    fn setup_stores_provided_key() {
        let (skill, _) = skill(SkillContext::in_memory());
        let prompt = ScriptedPrompt::new(Some("ignored"));

        let res = skill.setup(Some("abc123"), &prompt);

        assert_eq!(
            res.to_json(),
            json!({"ok": true, "message": "API key saved"})
        );
        let stored = skill.context().secrets.get(API_KEY);
        assert_eq!(stored.as_deref(), Some("abc123"));
        assert!(prompt.asked.lock().unwrap().is_empty());
    }

    #[test]
    fn setup_prompts_when_key_is_missing() {
        let (skill, _) = skill(SkillContext::in_memory());
        let prompt = ScriptedPrompt::new(Some("  typed-key \n"));

        let res = skill.setup(Some("   "), &prompt);

        assert!(res.is_ok());
        let stored = skill.context().secrets.get(API_KEY);
        assert_eq!(stored.as_deref(), Some("typed-key"));
        let asked = prompt.asked.lock().unwrap();
        assert_eq!(asked.as_slice(), ["OpenWeather API key: "]);
    }

    #[test]
    fn setup_without_any_input_fails() {
        let (skill, _) = skill(SkillContext::in_memory());

        let res = skill.setup(None, &NoPrompt);

        assert_eq!(
            res.to_json(),
            json!({"ok": false, "error": "No API key provided"})
        );
        assert_eq!(skill.context().secrets.get(API_KEY), None);
    }

    #[tokio::test]
    async fn get_weather_without_key_reports_missing_config() {
        let (skill, _) = skill(SkillContext::in_memory());

        let res = skill.get_weather(Some("Paris")).await;

        assert_eq!(
            res.to_json(),
            json!({"ok": false, "error": "Weather API key is not configured"})
        );
    }

    #[tokio::test]
    async fn get_weather_uses_the_context_localizer() {
        let catalog = Catalog::english().with_message(
            "runtime.weather.errors.missing_api_config",
            "Clé API météo absente",
        );
        let ctx = SkillContext::in_memory().with_localizer(Arc::new(catalog));
        let (skill, _) = skill(ctx);

        let res = skill.get_weather(Some("Paris")).await;

        assert_eq!(res, ToolResponse::Error("Clé API météo absente".into()));
    }

    #[tokio::test]
    async fn get_weather_without_city_reports_missing_city() {
        let ctx = SkillContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::with_entries([(API_KEY, "KEY")])),
        );
        let (skill, _) = skill(ctx);

        let res = skill.get_weather(None).await;

        assert_eq!(
            res.to_json(),
            json!({"ok": false, "error": "No city given and no default city configured"})
        );
    }

    #[tokio::test]
    async fn handle_reports_missing_key() {
        let ctx = SkillContext::new(
            Arc::new(MemoryStore::with_entries([(DEFAULT_CITY, "Oslo")])),
            Arc::new(MemoryStore::new()),
        );
        let (skill, _) = skill(ctx);

        let text = skill.handle(WEATHER_INTENT, &json!({})).await;
        assert_eq!(text, "Weather API key is missing, run setup first");
    }

    #[tokio::test]
    async fn handle_intent_without_city_reports_api_error() {
        let ctx = SkillContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::with_entries([(API_KEY, "KEY")])),
        );
        let (skill, _) = skill(ctx);

        let text = skill.handle_intent("", &json!({"city": ""})).await;
        assert_eq!(text, "Could not get the weather for ");
    }

    #[tokio::test]
    async fn subscriber_copies_actor_and_trace() {
        let (skill, bus) = skill(SkillContext::in_memory());
        let mut rx = bus.subscribe();

        let event = Event::new(WEATHER_INTENT, json!({"city": "Paris"}), "nlp")
            .with_actor(Some("user-7".into()))
            .with_trace_id(Some("trace-42".into()));
        skill.on_weather_intent(&event).await;

        let emitted = rx.recv().await.unwrap();
        assert_eq!(emitted.topic, NOTIFY_TOPIC);
        assert_eq!(emitted.source, SKILL_NAME);
        assert_eq!(emitted.actor.as_deref(), Some("user-7"));
        assert_eq!(emitted.trace_id.as_deref(), Some("trace-42"));
        assert_eq!(
            emitted.payload,
            json!({"text": "Weather API key is missing, run setup first"})
        );
        assert!(rx.try_recv().is_err());
    }
}
