//! Backend configuration: an accumulated map of string/int values.

use std::collections::BTreeMap;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
	/// Textual value.
	Text(String),
	/// Integral value.
	Int(i64),
}

impl From<&str> for ConfigValue {
	fn from(value: &str) -> Self {
		ConfigValue::Text(value.to_string())
	}
}

impl From<String> for ConfigValue {
	fn from(value: String) -> Self {
		ConfigValue::Text(value)
	}
}

impl From<i64> for ConfigValue {
	fn from(value: i64) -> Self {
		ConfigValue::Int(value)
	}
}

/// Key/value configuration accumulated before `init`.
///
/// Setting an empty string value removes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
	values: BTreeMap<String, ConfigValue>,
}

impl BackendConfig {
	/// Sets (or, for an empty string value, removes) a key.
	pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
		let value = value.into();
		if matches!(&value, ConfigValue::Text(text) if text.is_empty()) {
			self.values.remove(key);
			return;
		}
		self.values.insert(key.to_string(), value);
	}

	/// Returns whether the key is present.
	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	/// Returns the textual value under `key`, if any.
	pub fn text(&self, key: &str) -> Option<&str> {
		match self.values.get(key) {
			Some(ConfigValue::Text(text)) => Some(text),
			_ => None,
		}
	}

	/// Returns the integral value under `key`, if any.
	pub fn int(&self, key: &str) -> Option<i64> {
		match self.values.get(key) {
			Some(ConfigValue::Int(value)) => Some(*value),
			_ => None,
		}
	}
}
