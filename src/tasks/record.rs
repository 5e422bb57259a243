//! Task records.
//!
//! One record describes a source image, where to write the result and the
//! ordered chain of effect codes to apply. On the wire a record is a JSON
//! object:
//!
//! ```json
//! {"inPath": "in/tree.png", "outPath": "out/tree.png", "effects": ["S", "B"]}
//! ```

use crate::filters::{EffectCode, UnknownEffect};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Image to load.
    #[serde(rename = "inPath")]
    pub source_path: PathBuf,
    /// Where the filtered image is saved.
    #[serde(rename = "outPath")]
    pub destination_path: PathBuf,
    /// Effect codes in application order. Unrecognized codes are kept so
    /// they can be reported when the chain runs.
    #[serde(default)]
    pub effects: Vec<String>,
}

impl TaskRecord {
    /// Create a record.
    pub fn new<I, S>(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, effects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_path: source.into(),
            destination_path: destination.into(),
            effects: effects.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode a record from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The effect chain with every code parsed.
    pub fn effect_codes(&self) -> impl Iterator<Item = Result<EffectCode, UnknownEffect>> + '_ {
        self.effects.iter().map(|code| code.parse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wire_names() {
        let record: TaskRecord =
            serde_json::from_str(r#"{"inPath":"a.png","outPath":"b.png","effects":["G","S"]}"#)
                .unwrap();
        assert_eq!(record, TaskRecord::new("a.png", "b.png", ["G", "S"]));
    }

    #[test]
    fn test_missing_effects_means_empty_chain() {
        let record: TaskRecord =
            serde_json::from_str(r#"{"inPath":"a.png","outPath":"b.png"}"#).unwrap();
        assert!(record.effects.is_empty());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let value = serde_json::json!({"outPath": "b.png", "effects": []});
        assert!(TaskRecord::from_value(value).is_err());
    }

    #[test]
    fn test_effect_codes_keep_order_and_unknowns() {
        let record = TaskRecord::new("a", "b", ["B", "X", "E"]);
        let codes: Vec<_> = record.effect_codes().collect();
        assert_eq!(
            codes,
            vec![
                Ok(EffectCode::Blur),
                Err(UnknownEffect("X".to_string())),
                Ok(EffectCode::EdgeDetect),
            ]
        );
    }

    #[test]
    fn test_encode_uses_wire_names() {
        let json = serde_json::to_value(TaskRecord::new("a", "b", ["G"])).unwrap();
        assert_eq!(json["inPath"], "a");
        assert_eq!(json["outPath"], "b");
    }
}
