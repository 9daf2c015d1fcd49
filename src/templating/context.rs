//! Template context construction.
//!
//! The evaluator works on JSON values, so the nested TOML structure is
//! converted here. Datetimes become their RFC 3339 text and non-finite floats
//! (which JSON cannot hold) become strings.

use tera::Context as TeraContext;

use super::RenderError;
use crate::constants::TREE_VARIABLE;
use crate::tree::NestedValue;

/// Convert a nested TOML value into a JSON value.
pub fn to_json(value: &NestedValue) -> serde_json::Value {
    match value {
        NestedValue::String(s) => serde_json::Value::String(s.clone()),
        NestedValue::Integer(i) => serde_json::Value::from(*i),
        NestedValue::Float(f) => serde_json::Number::from_f64(*f)
            .map_or_else(|| serde_json::Value::String(f.to_string()), serde_json::Value::Number),
        NestedValue::Boolean(b) => serde_json::Value::Bool(*b),
        NestedValue::Datetime(d) => serde_json::Value::String(d.to_string()),
        NestedValue::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        NestedValue::Table(table) => serde_json::Value::Object(
            table.iter().map(|(key, value)| (key.clone(), to_json(value))).collect(),
        ),
    }
}

/// Build the render context for `value`.
///
/// The whole structure is available under [`TREE_VARIABLE`] for translated
/// references, and every top-level key is also inserted on its own so plain
/// template variables (`{{ name }}`) work as well.
pub fn build_context(value: &NestedValue) -> Result<TeraContext, RenderError> {
    let json = to_json(value);
    let mut context = TeraContext::new();

    match &json {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                if key != TREE_VARIABLE {
                    context.insert(key.as_str(), value);
                }
            }
        }
        serde_json::Value::Array(_) => {}
        other => {
            return Err(RenderError::Context {
                message: format!("expected a table or array at the top level, found {other}"),
            });
        }
    }

    context.insert(TREE_VARIABLE, &json);
    Ok(context)
}
