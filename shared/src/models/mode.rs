//! System mode models

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Operating mode of the stock tracker.
///
/// `Cards` tracks card stock that is issued to people, `Inventory` tracks
/// general goods. Every item type belongs to exactly one mode and reads are
/// scoped to the mode of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemMode {
    Cards,
    #[default]
    Inventory,
}

impl SystemMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemMode::Cards => "CARDS",
            SystemMode::Inventory => "INVENTORY",
        }
    }
}

impl std::fmt::Display for SystemMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CARDS" => Ok(SystemMode::Cards),
            "INVENTORY" => Ok(SystemMode::Inventory),
            other => Err(format!("unknown system mode '{}'", other)),
        }
    }
}
