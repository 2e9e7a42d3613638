//! Records stored locally and exchanged with the remote store.
//!
//! Only the fields the sync layer inspects are typed. Everything else a view
//! attaches to a record (scripts, titles, narration metadata, ...) rides along
//! in the flattened `extra` map so that round-tripping never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub created_at: i64,
    /// Epoch millis, refreshed by the local store on every save.
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storyboard: Vec<StoryboardFrame>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn new(title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
            cover_image: None,
            storyboard: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardFrame {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspiration {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Inspiration {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
            extra: Map::new(),
        }
    }
}

/// Opaque per-tool state; the sync layer never looks inside `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolBlob {
    pub id: String,
    pub data: Value,
}

/// Template keys every installation ships with.
pub const DEFAULT_PROMPT_KEYS: [&str; 5] =
    ["SCRIPT", "TITLES", "SUMMARY", "COVER_GEN", "STORYBOARD_TEXT"];

/// Prompt templates keyed by template name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptSet(pub BTreeMap<String, Value>);

impl PromptSet {
    /// The compiled-in template set.
    pub fn defaults() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            "SCRIPT".to_string(),
            json!({
                "name": "长视频脚本",
                "template": "请围绕主题「{{topic}}」撰写一篇结构完整的长视频口播脚本，包含开场、主体分段与结尾总结。"
            }),
        );
        templates.insert(
            "TITLES".to_string(),
            json!({
                "name": "标题生成",
                "template": "根据以下脚本生成 10 个吸引点击的视频标题：\n{{script}}"
            }),
        );
        templates.insert(
            "SUMMARY".to_string(),
            json!({
                "name": "视频简介",
                "template": "为以下脚本写一段 200 字以内的视频简介：\n{{script}}"
            }),
        );
        templates.insert(
            "COVER_GEN".to_string(),
            json!({
                "name": "封面图",
                "template": "为主题「{{topic}}」设计视频封面，描述画面构图、主体与配色。"
            }),
        );
        templates.insert(
            "STORYBOARD_TEXT".to_string(),
            json!({
                "name": "分镜描述",
                "template": "将以下脚本拆分为分镜，每个分镜给出画面描述：\n{{script}}"
            }),
        );
        Self(templates)
    }

    /// Layer `overrides` over the compiled-in defaults. Keys present in
    /// `overrides` win; anything missing falls back to the default template.
    pub fn merged_over_defaults(overrides: PromptSet) -> Self {
        let mut merged = Self::defaults();
        merged.0.extend(overrides.0);
        merged
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
