//! Per-source configuration schemas used to scaffold and validate template
//! `configJson` blobs.
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::registry::Source;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub source: Source,
    pub required: Vec<&'static str>,
    pub optional: Vec<&'static str>,
    pub types: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigFieldError {
    #[error("configJson must be valid JSON: {0}")]
    Malformed(String),
    #[error("configJson must be a JSON object")]
    NotAnObject,
    #[error("field \"{0}\" is required and cannot be empty")]
    Missing(&'static str),
    #[error("field \"{field}\" must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

impl ConfigFieldError {
    /// Name of the form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigFieldError::Missing(field) | ConfigFieldError::WrongType { field, .. } => *field,
            ConfigFieldError::Malformed(_) | ConfigFieldError::NotAnObject => "configJson",
        }
    }
}

type Fields = &'static [(&'static str, &'static str)];

pub fn schema_for(source: Source) -> SourceSchema {
    match source {
        Source::Weather => schema(
            source,
            &[("city", "string"), ("latitude", "number"), ("longitude", "number")],
            &[],
        ),
        Source::ExchangeRate => schema(source, &[("currencyCode", "string")], &[("days", "integer")]),
        Source::News => schema(
            source,
            &[],
            &[("language", "string"), ("category", "string"), ("country", "string")],
        ),
        Source::JobOffers => schema(source, &[("keywords", "string")], &[("location", "string")]),
        Source::SportTable => schema(source, &[("feedUrl", "string")], &[("league", "string")]),
        Source::SportMatches => schema(
            source,
            &[("feedUrl", "string")],
            &[("league", "string"), ("round", "integer")],
        ),
        Source::Lottery => schema(source, &[("feedUrl", "string")], &[("gameType", "string")]),
        Source::Horoscope => schema(source, &[("feedUrl", "string")], &[("sign", "string")]),
        Source::TvProgram => schema(source, &[("feedUrl", "string")], &[("channel", "string")]),
    }
}

fn schema(source: Source, required: Fields, optional: Fields) -> SourceSchema {
    SourceSchema {
        source,
        required: required.iter().map(|(name, _)| *name).collect(),
        optional: optional.iter().map(|(name, _)| *name).collect(),
        types: required.iter().chain(optional).copied().collect(),
    }
}

pub fn all_schemas() -> Vec<SourceSchema> {
    Source::ALL.into_iter().map(schema_for).collect()
}

/// Starting config for the editor: every required field present and blank.
pub fn example_config(schema: &SourceSchema) -> Value {
    let fields: Map<String, Value> = schema
        .required
        .iter()
        .map(|field| (field.to_string(), Value::String(String::new())))
        .collect();
    Value::Object(fields)
}

pub fn parse_config_text(text: &str) -> Result<Value, ConfigFieldError> {
    serde_json::from_str(text).map_err(|err| ConfigFieldError::Malformed(err.to_string()))
}

pub fn validate_config(schema: &SourceSchema, config: &Value) -> Result<(), ConfigFieldError> {
    let object = config.as_object().ok_or(ConfigFieldError::NotAnObject)?;

    for field in &schema.required {
        let present = match object.get(*field) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(ConfigFieldError::Missing(*field));
        }
    }

    for (&field, &expected) in &schema.types {
        let Some(value) = object.get(field).filter(|value| !value.is_null()) else {
            continue;
        };
        let matches = match expected {
            "string" => value.is_string(),
            // numbers typed into a text editor arrive as strings
            "number" => {
                value.is_number()
                    || value
                        .as_str()
                        .is_some_and(|text| text.trim().parse::<f64>().is_ok())
            }
            "integer" => value.is_i64() || value.is_u64(),
            _ => true,
        };
        if !matches {
            return Err(ConfigFieldError::WrongType { field, expected });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_lists_required_and_types() {
        let schema = schema_for(Source::Weather);
        assert_eq!(schema.required, vec!["city", "latitude", "longitude"]);
        assert_eq!(schema.types["latitude"], "number");
        assert_eq!(all_schemas().len(), Source::ALL.len());
    }

    #[test]
    fn example_config_has_blank_required_fields() {
        let example = example_config(&schema_for(Source::ExchangeRate));
        assert_eq!(example, json!({ "currencyCode": "" }));
    }

    #[test]
    fn malformed_json_is_a_field_error() {
        let err = parse_config_text("{ city: ").unwrap_err();
        assert_eq!(err.field(), "configJson");
        assert!(err.to_string().starts_with("configJson must be valid JSON"));
    }

    #[test]
    fn required_fields_must_be_non_empty() {
        let schema = schema_for(Source::ExchangeRate);
        assert_eq!(
            validate_config(&schema, &json!({ "currencyCode": "   " })),
            Err(ConfigFieldError::Missing("currencyCode"))
        );
        assert_eq!(
            validate_config(&schema, &json!([])),
            Err(ConfigFieldError::NotAnObject)
        );
        assert!(validate_config(&schema, &json!({ "currencyCode": "EUR", "days": 5 })).is_ok());
    }

    #[test]
    fn types_are_checked_for_present_fields() {
        let schema = schema_for(Source::Weather);
        let ok = json!({ "city": "Kraków", "latitude": "50.06", "longitude": 19.94 });
        assert!(validate_config(&schema, &ok).is_ok());
        let bad = json!({ "city": "Kraków", "latitude": "north", "longitude": 19.94 });
        assert_eq!(
            validate_config(&schema, &bad),
            Err(ConfigFieldError::WrongType {
                field: "latitude",
                expected: "number",
            })
        );
        let err = validate_config(
            &schema_for(Source::ExchangeRate),
            &json!({ "currencyCode": "USD", "days": 2.5 }),
        )
        .unwrap_err();
        assert_eq!(err.field(), "days");
    }
}
