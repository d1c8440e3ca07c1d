//! Decoding of sources into fragments.

use super::merge::deep_merge_all;
use super::source::{Format, Source, TextSource};
use super::types::Config;
use crate::error::{ConfigError, Result};
use serde_json::Value;

/// Sections HCL may spell as repeated blocks.
const BLOCK_SECTIONS: &[&str] = &["limits", "ports"];

/// Decode a source into a fragment.
pub fn decode_source(source: &Source) -> Result<Config> {
    match source {
        Source::Fragment { config, .. } => Ok(config.clone()),
        Source::Text(text) => decode_text(text),
    }
}

fn decode_text(text: &TextSource) -> Result<Config> {
    let format = text.effective_format().ok_or_else(|| {
        ConfigError::decode(
            &text.name,
            None,
            "no format declared and none implied by the name",
        )
    })?;

    let value = parse_value(&text.data, format)
        .map_err(|msg| ConfigError::decode(&text.name, Some(format), msg))?;

    serde_json::from_value(flatten_blocks(value))
        .map_err(|e| ConfigError::decode(&text.name, Some(format), e))
}

/// Parse text into a JSON-like value. HCL follows the HCL JSON mapping.
pub fn parse_value(data: &str, format: Format) -> std::result::Result<Value, String> {
    match format {
        Format::Json => serde_json::from_str(data).map_err(|e| e.to_string()),
        Format::Hcl => hcl::from_str(data).map_err(|e| e.to_string()),
    }
}

// `limits { .. } limits { .. }` decodes as an array of objects; collapse it so
// HCL and JSON fragments merge the same way.
fn flatten_blocks(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        for key in BLOCK_SECTIONS {
            let Some(section) = map.get_mut(*key) else {
                continue;
            };
            let merged = match section {
                Value::Array(items) if items.iter().all(Value::is_object) => {
                    deep_merge_all(std::mem::take(items))
                }
                _ => continue,
            };
            *section = merged;
        }
    }
    value
}
