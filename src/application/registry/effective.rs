//! Per-mode effective action definitions.
//!
//! Layering order: globals, then the base definition, then the mode's
//! top-level overrides, then the mode's `requiredFields`.

use serde_json::Value;

use super::RegistryError;
use crate::domain::actions::{apply_defaults, ActionDefinition, Globals, Mode, ParameterSchema};

/// Top-level fields a mode may not replace.
pub const NON_OVERRIDABLE_FIELDS: &[&str] = &["id", "modes", "implementation"];

/// Computes the definition an action runs with in `mode`.
///
/// `base` is expected to have globals applied already; policies replaced by an
/// override are re-defaulted from `globals`.
pub fn effective_definition(
    base: &ActionDefinition,
    mode: Mode,
    globals: &Globals,
) -> Result<ActionDefinition, RegistryError> {
    let Some(mode_config) = base.modes.get(&mode) else {
        return Ok(base.clone());
    };

    let mut merged = if mode_config.overrides.is_empty() {
        base.clone()
    } else {
        let invalid = |field: &str, message: String| RegistryError::InvalidOverride {
            action: base.id.clone(),
            field: field.to_string(),
            message,
        };

        let mut value = serde_json::to_value(base).map_err(|e| invalid("$", e.to_string()))?;
        if let Value::Object(fields) = &mut value {
            for (key, override_value) in &mode_config.overrides {
                if NON_OVERRIDABLE_FIELDS.contains(&key.as_str()) {
                    return Err(invalid(key, "field cannot be overridden per mode".to_string()));
                }
                fields.insert(key.clone(), override_value.clone());
            }
        }

        let mut merged: ActionDefinition =
            serde_json::from_value(value).map_err(|e| invalid("overrides", e.to_string()))?;
        apply_defaults(&mut merged, globals);
        merged
    };

    for field in &mode_config.required_fields {
        merged
            .parameters
            .entry(field.clone())
            .and_modify(|schema| schema.required = true)
            .or_insert_with(|| ParameterSchema::any().required());
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actions::{ConfigurationFile, ParameterKind};
    use serde_json::json;

    fn place_order() -> ConfigurationFile {
        ConfigurationFile::from_value(json!({
            "version": "1",
            "globals": { "performance": { "retries": 2 } },
            "actions": [{
                "id": "placeOrder",
                "name": "Place order",
                "description": "Places the current cart as an order",
                "category": "checkout",
                "implementation": { "type": "function", "handler": "placeOrder" },
                "parameters": {
                    "poNumber": { "type": "string" }
                },
                "performance": { "timeoutMs": 8000 },
                "modes": {
                    "b2b": {
                        "overrides": {
                            "description": "Places a purchase order",
                            "performance": { "timeoutMs": 15000 }
                        },
                        "requiredFields": ["costCenterId", "poNumber"]
                    }
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn mode_without_config_uses_base() {
        let config = place_order();
        let base = &config.actions[0];
        let b2c = effective_definition(base, Mode::B2c, &config.globals).unwrap();
        assert_eq!(&b2c, base);
    }

    #[test]
    fn overrides_replace_top_level_fields_and_redefault() {
        let config = place_order();
        let b2b = effective_definition(&config.actions[0], Mode::B2b, &config.globals).unwrap();

        assert_eq!(b2b.description, "Places a purchase order");
        assert_eq!(b2b.performance.timeout_ms, Some(15000));
        // performance was replaced wholesale, so retries comes from globals again
        assert_eq!(b2b.performance.retries, Some(2));
    }

    #[test]
    fn required_fields_tighten_or_add_parameters() {
        let config = place_order();
        let b2b = effective_definition(&config.actions[0], Mode::B2b, &config.globals).unwrap();

        assert!(b2b.parameters["poNumber"].required);
        assert!(matches!(b2b.parameters["poNumber"].kind, ParameterKind::String { .. }));
        assert!(b2b.parameters["costCenterId"].required);
        assert_eq!(b2b.parameters["costCenterId"].kind, ParameterKind::Any);
    }

    #[test]
    fn identity_fields_cannot_be_overridden() {
        let config = place_order();
        let mut base = config.actions[0].clone();
        if let Some(b2b) = base.modes.get_mut(&Mode::B2b) {
            b2b.overrides.insert("implementation".into(), json!({ "type": "function", "handler": "x" }));
        }

        let err = effective_definition(&base, Mode::B2b, &config.globals).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOverride { ref field, .. } if field == "implementation"));
    }
}
