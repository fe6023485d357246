use std::{path::PathBuf, sync::Arc};

use crate::{
    i18n::{Catalog, Localizer},
    store::{KeyValueStore, MemoryStore},
};

/// Everything the host hands to the skill for one installation.
///
/// Passed explicitly into every resolver instead of being looked up globally.
#[derive(Clone)]
pub struct SkillContext {
    pub memory: Arc<dyn KeyValueStore>,
    pub secrets: Arc<dyn KeyValueStore>,
    /// Skill root on disk; `None` when the host runs the skill without a checkout.
    pub skill_path: Option<PathBuf>,
    pub i18n: Arc<dyn Localizer>,
}

impl SkillContext {
    pub fn new(memory: Arc<dyn KeyValueStore>, secrets: Arc<dyn KeyValueStore>) -> Self {
        Self {
            memory,
            secrets,
            skill_path: None,
            i18n: Arc::new(Catalog::english()),
        }
    }

    /// Fresh in-memory stores and English strings.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn with_skill_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.skill_path = Some(path.into());
        self
    }

    pub fn with_localizer(mut self, i18n: Arc<dyn Localizer>) -> Self {
        self.i18n = i18n;
        self
    }

    pub(crate) fn t(&self, key: &str, params: &[(&str, String)]) -> String {
        self.i18n.t(key, params)
    }
}

impl std::fmt::Debug for SkillContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillContext")
            .field("skill_path", &self.skill_path)
            .finish_non_exhaustive()
    }
}
