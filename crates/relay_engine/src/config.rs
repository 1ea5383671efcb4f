use std::fs;
use std::path::{Path, PathBuf};

use relay_core::Timings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LaunchTarget;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Stable identifiers and literal labels of the target application.
///
/// Defaults describe the target app's current layout; every value can be
/// overridden from the config file when the app ships a new layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProfile {
    pub package: String,
    pub launcher_component: String,
    pub contact_name_id: String,
    pub contact_list_id: String,
    pub search_button_id: String,
    pub send_button_id: String,
    pub contacts_tab_label: String,
    pub search_label: String,
    pub send_label: String,
    pub chooser_label: String,
    pub share_confirm_label: String,
    pub edit_text_class: String,
    pub button_class: String,
    /// Section headers listed with the contact-name identifier that are not contacts.
    pub sentinel_labels: Vec<String>,
    /// Packages that render the system share chooser.
    pub chooser_packages: Vec<String>,
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            package: "com.tencent.mm".to_string(),
            launcher_component: "com.tencent.mm.ui.LauncherUI".to_string(),
            contact_name_id: "com.tencent.mm:id/kbq".to_string(),
            contact_list_id: "com.tencent.mm:id/mg".to_string(),
            search_button_id: "com.tencent.mm:id/jha".to_string(),
            send_button_id: "com.tencent.mm:id/bql".to_string(),
            contacts_tab_label: "通讯录".to_string(),
            search_label: "搜索".to_string(),
            send_label: "发送".to_string(),
            chooser_label: "发送给朋友".to_string(),
            share_confirm_label: "发送".to_string(),
            edit_text_class: "android.widget.EditText".to_string(),
            button_class: "android.widget.Button".to_string(),
            sentinel_labels: [
                "新的朋友",
                "仅聊天的朋友",
                "群聊",
                "标签",
                "服务号",
                "我的企业及企业联系人",
                "企业微信联系人",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            chooser_packages: vec!["android".to_string(), "com.android.intentresolver".to_string()],
        }
    }
}

impl TargetProfile {
    pub fn launch_target(&self) -> LaunchTarget {
        LaunchTarget {
            package: self.package.clone(),
            component: self.launcher_component.clone(),
            clear_top: true,
        }
    }

    pub fn is_sentinel(&self, label: &str) -> bool {
        self.sentinel_labels.iter().any(|s| s == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    /// Consecutive scans without a new name that mean the list bottom was reached.
    pub no_growth_threshold: u32,
    /// Upper bound on scrolls; generous, not the primary stop condition.
    pub iteration_budget: u32,
    /// Swipe start, as a fraction of the list height from its top.
    pub swipe_from: f32,
    pub swipe_to: f32,
    pub swipe_duration_ms: u64,
    /// `[x1, y1, x2, y2]` used when the list container is not found.
    pub fallback_swipe: [i32; 4],
    pub tab_open_ms: u64,
    pub start_delay_ms: u64,
    pub scroll_settle_ms: u64,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            no_growth_threshold: 5,
            iteration_budget: 500,
            swipe_from: 0.8,
            swipe_to: 0.2,
            swipe_duration_ms: 800,
            fallback_swipe: [360, 1200, 360, 400],
            tab_open_ms: 2000,
            start_delay_ms: 2000,
            scroll_settle_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub target: TargetProfile,
    pub timings: Timings,
    pub harvest: HarvestSettings,
}

impl AutomationConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.package.trim().is_empty() {
            return Err(ConfigError::Invalid("target.package is empty".into()));
        }
        if self.timings.max_step_attempts == 0 || self.timings.share_max_polls == 0 {
            return Err(ConfigError::Invalid("attempt budgets must be positive".into()));
        }
        if self.harvest.no_growth_threshold == 0 {
            return Err(ConfigError::Invalid(
                "harvest.no_growth_threshold must be positive".into(),
            ));
        }
        let h = &self.harvest;
        let in_range = |f: f32| (0.0..=1.0).contains(&f);
        if !in_range(h.swipe_from) || !in_range(h.swipe_to) || h.swipe_from <= h.swipe_to {
            return Err(ConfigError::Invalid(format!(
                "swipe must move upwards within the list (from {} to {})",
                h.swipe_from, h.swipe_to
            )));
        }
        Ok(())
    }
}
