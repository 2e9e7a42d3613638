//! JSON bodies exchanged with the sync endpoint.

use crate::entity::{Inspiration, Project, PromptSet, ToolBlob};
use serde::{Deserialize, Serialize};

/// `POST /sync` body. Each present key is upserted by entity id; `prompts`
/// is stored under a single fixed key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspirations: Option<Vec<Inspiration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolBlob>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAck {
    pub success: bool,
    #[serde(default)]
    pub timestamp: i64,
}

/// `GET /sync` response: every module in full.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub inspirations: Vec<Inspiration>,
    #[serde(default)]
    pub prompts: Option<PromptSet>,
    #[serde(default)]
    pub tools: Vec<ToolBlob>,
}

/// Response to a blob upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_modules_are_omitted() {
        let payload = SyncPayload {
            tools: Some(vec![]),
            ..Default::default()
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"tools":[]}"#);
        assert_eq!(serde_json::to_string(&SyncPayload::default()).unwrap(), "{}");
    }

    #[test]
    fn test_snapshot_accepts_null_prompts() {
        let snapshot: SyncSnapshot = serde_json::from_str(
            r#"{ "projects": [], "inspirations": [], "prompts": null, "tools": [] }"#,
        )
        .unwrap();
        assert!(snapshot.prompts.is_none());
    }
}
