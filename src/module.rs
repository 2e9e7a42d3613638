//! The four sync modules.
//!
//! A module is the unit of dirty tracking and of push/pull. Individual
//! entities are never tracked on their own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Projects,
    Inspirations,
    Prompts,
    Tools,
}

impl Module {
    /// All modules in display order.
    pub const ALL: [Module; 4] = [
        Module::Projects,
        Module::Inspirations,
        Module::Prompts,
        Module::Tools,
    ];

    /// Order used by a full manual upload.
    pub const UPLOAD_ORDER: [Module; 4] = [
        Module::Projects,
        Module::Inspirations,
        Module::Tools,
        Module::Prompts,
    ];

    /// Wire name, also the key in `/sync` bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Projects => "projects",
            Module::Inspirations => "inspirations",
            Module::Prompts => "prompts",
            Module::Tools => "tools",
        }
    }

    /// Human-readable label shown in the pending-changes indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Module::Projects => "项目数据",
            Module::Inspirations => "灵感数据",
            Module::Prompts => "提示词模板",
            Module::Tools => "工具数据",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown module: {0}")]
pub struct UnknownModule(pub String);

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_wire_names() {
        for module in Module::ALL {
            assert_eq!(module.as_str().parse::<Module>().unwrap(), module);
        }
        assert!("settings".parse::<Module>().is_err());
    }

    #[test]
    fn test_upload_order_covers_every_module() {
        let mut order = Module::UPLOAD_ORDER.to_vec();
        order.sort();
        assert_eq!(order, Module::ALL.to_vec());
        assert_eq!(Module::UPLOAD_ORDER[3], Module::Prompts);
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&Module::Inspirations).unwrap();
        assert_eq!(json, r#""inspirations""#);
    }
}
