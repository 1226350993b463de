use serde::Deserialize;

/// Recognized backend options, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    /// Cache reflective property lookups in function-local statics
    pub use_static_property_lookups: bool,
    /// Emit `UFUNCTION(...)` lines in the header stream
    pub emit_ufunction_macros: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            use_static_property_lookups: false,
            emit_ufunction_macros: true,
        }
    }
}

impl BackendOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let options = BackendOptions::from_json(r#"{"use_static_property_lookups": true}"#).unwrap();
        assert!(options.use_static_property_lookups);
        assert!(options.emit_ufunction_macros);
        assert_eq!(BackendOptions::from_json("{}").unwrap(), BackendOptions::default());
    }
}
