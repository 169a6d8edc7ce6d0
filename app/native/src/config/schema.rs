//! JSON Schema for the configuration file.

use super::PaperspanConfig;

/// Generates a JSON Schema for the paperspan configuration.
///
/// The schema includes all configuration options with their types,
/// descriptions, and default values.
#[must_use]
pub fn generate_schema() -> schemars::Schema { schemars::schema_for!(PaperspanConfig) }

/// Generates a pretty-printed JSON Schema string for the configuration.
///
/// # Errors
///
/// Returns an error if the schema cannot be serialized.
pub fn generate_schema_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&generate_schema())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_schema_produces_valid_json() {
        let schema_json = generate_schema_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&schema_json).unwrap();

        assert_eq!(parsed["$schema"], "https://json-schema.org/draft/2020-12/schema");
        assert_eq!(parsed["title"], "PaperspanConfig");
        assert!(parsed["properties"]["displays"].is_object());
        assert!(parsed["properties"]["profiles"].is_object());
        assert!(parsed["properties"]["perspectives"].is_object());
        assert!(parsed["properties"]["general"].is_object());
    }

    #[test]
    fn test_schema_names_span_modes() {
        let schema_json = generate_schema_json().unwrap();
        for mode in ["single", "advanced", "multi", "dateSeededShuffle"] {
            assert!(schema_json.contains(mode), "schema should mention {mode}");
        }
    }
}
