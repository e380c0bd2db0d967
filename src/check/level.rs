use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Alert severity, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, JsonSchema,
)]
#[ts(export)]
pub enum CheckLevel {
    #[serde(rename = "OK", alias = "ok")]
    Ok,
    #[serde(rename = "INFO", alias = "info")]
    Info,
    #[serde(rename = "WARN", alias = "warn")]
    Warn,
    #[serde(rename = "CRIT", alias = "crit")]
    Crit,
}

impl CheckLevel {
    /// Every level in ordinal order.
    pub const ALL: [CheckLevel; 4] = [
        CheckLevel::Ok,
        CheckLevel::Info,
        CheckLevel::Warn,
        CheckLevel::Crit,
    ];

    /// Name of the predicate variable in generated scripts, and of the matching
    /// `alerts.check` parameter.
    pub fn identifier(self) -> &'static str {
        match self {
            CheckLevel::Ok => "ok",
            CheckLevel::Info => "info",
            CheckLevel::Warn => "warn",
            CheckLevel::Crit => "crit",
        }
    }
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckLevel::Ok => "OK",
            CheckLevel::Info => "INFO",
            CheckLevel::Warn => "WARN",
            CheckLevel::Crit => "CRIT",
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(CheckLevel::Ok < CheckLevel::Info);
        assert!(CheckLevel::Info < CheckLevel::Warn);
        assert!(CheckLevel::Warn < CheckLevel::Crit);
        let mut sorted = CheckLevel::ALL;
        sorted.sort();
        assert_eq!(sorted, CheckLevel::ALL);
    }

    #[test]
    fn wire_names_and_aliases() {
        assert_eq!(serde_json::to_string(&CheckLevel::Crit).unwrap(), "\"CRIT\"");
        let level: CheckLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, CheckLevel::Warn);
        let level: CheckLevel = serde_json::from_str("\"OK\"").unwrap();
        assert_eq!(level, CheckLevel::Ok);
        assert!(serde_json::from_str::<CheckLevel>("\"UNKNOWN\"").is_err());
    }

    #[test]
    fn identifiers_are_lowercase_names() {
        for level in CheckLevel::ALL {
            assert_eq!(level.identifier(), level.to_string().to_lowercase());
        }
    }
}
