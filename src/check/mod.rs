//! Check configurations and the Flux they compile to.

pub mod level;
pub mod threshold;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CheckError;
use crate::settings::ScriptSettings;

pub use level::CheckLevel;
pub use threshold::{Bound, Threshold, ThresholdConfig};

/// A check document, discriminated by its `"type"` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export)]
#[non_exhaustive]
pub enum Check {
    Threshold(Threshold),
}

impl Check {
    pub fn base(&self) -> &Base {
        match self {
            Check::Threshold(t) => &t.base,
        }
    }

    /// Name of the `"type"` discriminator value.
    pub fn kind(&self) -> &'static str {
        match self {
            Check::Threshold(_) => "threshold",
        }
    }

    pub fn valid(&self) -> Result<(), CheckError> {
        match self {
            Check::Threshold(t) => t.valid(),
        }
    }

    pub fn generate_flux(&self, settings: &ScriptSettings) -> Result<String, CheckError> {
        match self {
            Check::Threshold(t) => t.generate_flux(settings),
        }
    }
}

/// Fields shared by every kind of check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Base {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
    pub query: CheckQuery,
    /// Emitted verbatim as the message function's result.
    #[serde(default)]
    pub status_message_template: String,
    /// Order is preserved in the generated `check` record.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Base {
    pub fn valid(&self) -> Result<(), CheckError> {
        if self.id.is_empty() {
            return Err(CheckError::invalid("check ID is invalid"));
        }
        if self.name.is_empty() {
            return Err(CheckError::invalid("check name can't be empty"));
        }
        if self.tags.iter().any(|tag| tag.key.is_empty()) {
            return Err(CheckError::invalid("tag must contain a key"));
        }
        Ok(())
    }
}

/// The user's Flux fragment. It is expected to bind `data`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct CheckQuery {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "type": "threshold",
            "id": "000000000000000a",
            "name": "cpu high",
            "query": { "text": "data = from(bucket: \"foo\") |> range(start: -1d)" },
            "statusMessageTemplate": "whoa!",
            "tags": [
                { "key": "aaa", "value": "vaaa" },
                { "key": "bbb", "value": "vbbb" }
            ],
            "thresholds": [
                { "allValues": false, "level": "INFO", "lowerBound": 10.0 },
                { "allValues": false, "level": "WARN", "upperBound": 40.0 }
            ]
        })
    }

    #[test]
    fn deserializes_threshold_document() {
        let check: Check = serde_json::from_value(document()).unwrap();
        assert_eq!(check.kind(), "threshold");
        let Check::Threshold(t) = &check;
        assert_eq!(t.base.id, "000000000000000a");
        assert_eq!(t.base.tags[1].key, "bbb");
        assert_eq!(t.thresholds.len(), 2);
        assert!(matches!(t.thresholds[0].bound(), Some(Bound::GreaterThan(_))));
        assert!(check.valid().is_ok());
    }

    #[test]
    fn serializes_with_type_discriminator() {
        let check: Check = serde_json::from_value(document()).unwrap();
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["type"], "threshold");
        assert_eq!(json["statusMessageTemplate"], "whoa!");
        assert!(json.get("description").is_none());
        assert_eq!(json, document());
    }

    #[test]
    fn unknown_or_missing_type_is_rejected() {
        let mut doc = document();
        doc["type"] = json!("deadman");
        assert!(serde_json::from_value::<Check>(doc.clone()).is_err());
        doc.as_object_mut().unwrap().remove("type");
        assert!(serde_json::from_value::<Check>(doc).is_err());
    }

    #[test]
    fn optional_fields_default() {
        let check: Check = serde_json::from_value(json!({
            "type": "threshold",
            "id": "a",
            "name": "b",
            "query": { "text": "" }
        }))
        .unwrap();
        let Check::Threshold(t) = check;
        assert!(t.base.tags.is_empty());
        assert!(t.thresholds.is_empty());
        assert_eq!(t.base.status_message_template, "");
    }

    #[test]
    fn base_validation_messages() {
        let check: Check = serde_json::from_value(document()).unwrap();
        let Check::Threshold(mut t) = check;

        t.base.id.clear();
        assert_eq!(t.valid().unwrap_err().message(), "check ID is invalid");
        t.base.id = "a".into();

        t.base.name.clear();
        assert_eq!(t.valid().unwrap_err().message(), "check name can't be empty");
        t.base.name = "b".into();

        t.base.tags.push(Tag {
            key: String::new(),
            value: "v".into(),
        });
        let err = t.valid().unwrap_err();
        assert_eq!(err.code(), "invalid");
        assert_eq!(err.message(), "tag must contain a key");
    }

    #[test]
    fn threshold_without_bounds_fails_validation() {
        let mut doc = document();
        doc["thresholds"] = json!([{ "level": "CRIT" }]);
        let check: Check = serde_json::from_value(doc).unwrap();
        assert_eq!(
            check.valid().unwrap_err().message(),
            "threshold must have at least one lowerBound or upperBound value"
        );
    }
}
