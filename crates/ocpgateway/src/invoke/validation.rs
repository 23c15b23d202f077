// Input validation against a service's input schema

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};

use super::path::stringify;
use crate::error::{Error, Result};
use crate::types::{ExecutionInputs, InputSchema, PropertySchema};

const SECTIONS: [&str; 3] = ["path", "query", "body"];

/// Check inputs before any network call. All problems are collected into a
/// single [`Error::Validation`].
pub fn validate_inputs(schema: &InputSchema, inputs: &ExecutionInputs) -> Result<()> {
	let empty = Map::new();
	let sections = Sections {
		path: &inputs.path,
		query: &inputs.query,
		body: inputs
			.body
			.as_ref()
			.and_then(Value::as_object)
			.unwrap_or(&empty),
	};

	let mut errors = BTreeMap::new();

	for name in &schema.required {
		let present = if name == "body" {
			inputs.body.as_ref().is_some_and(|b| !b.is_null())
		} else if SECTIONS.contains(&name.as_str()) {
			// An omitted path or query section reads as empty
			!sections.get(name).is_empty()
				|| schema
					.properties
					.get(name)
					.is_some_and(|section| section.required.is_empty())
		} else {
			sections.lookup(name).is_some()
		};
		if !present {
			errors.insert(name.clone(), "field is required".to_string());
		}
	}

	for (name, property) in &schema.properties {
		if SECTIONS.contains(&name.as_str()) {
			let values = sections.get(name);
			for field in &property.required {
				if !values.contains_key(field) {
					errors.insert(format!("{name}.{field}"), "field is required".to_string());
				}
			}
			for (field, field_schema) in &property.properties {
				if let Some(value) = values.get(field) {
					check_value(&format!("{name}.{field}"), field_schema, value, &mut errors);
				}
			}
		} else if let Some(value) = sections.lookup(name) {
			check_value(name, property, value, &mut errors);
		}
	}

	if errors.is_empty() {
		Ok(())
	} else {
		Err(Error::Validation { errors })
	}
}

struct Sections<'a> {
	path: &'a Map<String, Value>,
	query: &'a Map<String, Value>,
	body: &'a Map<String, Value>,
}

impl<'a> Sections<'a> {
	fn get(&self, name: &str) -> &'a Map<String, Value> {
		match name {
			"path" => self.path,
			"query" => self.query,
			_ => self.body,
		}
	}

	/// Flat properties are looked up in path, then query, then body
	fn lookup(&self, name: &str) -> Option<&'a Value> {
		SECTIONS.iter().find_map(|s| self.get(s).get(name))
	}
}

fn check_value(key: &str, schema: &PropertySchema, value: &Value, errors: &mut BTreeMap<String, String>) {
	if schema.schema_type.as_deref() == Some("string") && !value.is_string() {
		errors.insert(key.to_string(), "must be a string".to_string());
		return;
	}
	if let Some(pattern) = &schema.pattern {
		match Regex::new(&format!("^(?:{pattern})$")) {
			Ok(re) if re.is_match(&stringify(value)) => {},
			Ok(_) => {
				errors.insert(key.to_string(), format!("does not match pattern {pattern}"));
			},
			Err(e) => {
				errors.insert(key.to_string(), format!("invalid pattern {pattern}: {e}"));
			},
		}
	}
}
