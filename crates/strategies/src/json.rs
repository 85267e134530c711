//! Serializable values stored as pretty-printed JSON

use serde::Serialize;
use tracing::warn;

use refsnap::{Difference, Rendering, Snapshotting, StrategyError};

use crate::lines::{line_diff, Lines};

/// Any `Serialize` value, rendered with `serde_json::to_string_pretty`.
///
/// Map keys keep their serialization order, so values with `HashMap` fields
/// should use `BTreeMap` to stay stable across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl<V: Serialize> Snapshotting<V> for Json {
    type Format = String;

    fn path_extension(&self) -> Option<&str> {
        Some("json")
    }

    fn render(&self, value: V) -> Rendering<String> {
        match serde_json::to_string_pretty(&value) {
            Ok(mut json) => {
                json.push('\n');
                Rendering::ready(json)
            }
            Err(e) => {
                warn!("Couldn't serialize value to JSON: {}", e);
                Rendering::failed()
            }
        }
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Snapshotting::<String>::to_bytes(&Lines, format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        let text = Snapshotting::<String>::from_bytes(&Lines, bytes)?;
        serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| StrategyError::new(format!("reference is not valid JSON: {}", e)))?;
        Ok(text)
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        (reference != candidate).then(|| Difference::new(line_diff(reference, candidate)))
    }
}
