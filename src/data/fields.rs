//! Display fields of the photo detail view
//!
//! Each configured field pairs a property name with a formatter. A property
//! that is absent, `null` or an empty string renders as [`MISSING_FIELD`].

use crate::core::constants::MISSING_FIELD;
use crate::data::geojson::PhotoProperties;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Built-in, configuration-friendly formatters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    /// Strings verbatim, everything else as JSON
    #[default]
    Text,
    /// Numbers with a fixed count of decimals
    Fixed(u8),
}

impl FieldFormat {
    pub fn apply(&self, value: &Value) -> String {
        match (self, value) {
            (FieldFormat::Fixed(digits), Value::Number(n)) => match n.as_f64() {
                Some(v) => format!("{:.*}", *digits as usize, v),
                None => n.to_string(),
            },
            (_, value) => text(value),
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One configured field as it appears in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub format: FieldFormat,
}

/// A property looked up for display
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Present(&'a Value),
    Missing,
}

impl<'a> From<Option<&'a Value>> for FieldValue<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldValue::Missing,
            Some(Value::String(s)) if s.is_empty() => FieldValue::Missing,
            Some(value) => FieldValue::Present(value),
        }
    }
}

pub type FormatFn = Box<dyn Fn(&Value) -> String + Send + Sync>;

enum Formatter {
    Builtin(FieldFormat),
    Custom(FormatFn),
}

impl Formatter {
    fn format(&self, value: &Value) -> String {
        match self {
            Formatter::Builtin(format) => format.apply(value),
            Formatter::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formatter::Builtin(format) => write!(f, "{:?}", format),
            Formatter::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// One formatted `name : value` row of the detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub name: String,
    pub value: String,
}

/// Ordered list of display fields
#[derive(Debug, Default)]
pub struct FieldFormatters {
    fields: Vec<(String, Formatter)>,
}

impl FieldFormatters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[FieldSpec]) -> Self {
        specs.iter().fold(Self::new(), |formatters, spec| {
            formatters.with_field(spec.name.clone(), spec.format)
        })
    }

    pub fn with_field(mut self, name: impl Into<String>, format: FieldFormat) -> Self {
        self.fields.push((name.into(), Formatter::Builtin(format)));
        self
    }

    pub fn with_formatter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.fields.push((name.into(), Formatter::Custom(Box::new(f))));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Formats a single value; unconfigured names are shown as text
    pub fn format_field(&self, name: &str, value: FieldValue<'_>) -> String {
        let FieldValue::Present(value) = value else {
            return MISSING_FIELD.to_string();
        };
        match self.fields.iter().find(|(n, _)| n == name) {
            Some((_, formatter)) => formatter.format(value),
            None => text(value),
        }
    }

    /// All configured rows for a photo, in configuration order
    pub fn rows(&self, properties: &PhotoProperties) -> Vec<DetailRow> {
        self.fields
            .iter()
            .map(|(name, formatter)| {
                let value = match FieldValue::from(properties.get(name)) {
                    FieldValue::Present(value) => formatter.format(value),
                    FieldValue::Missing => MISSING_FIELD.to_string(),
                };
                DetailRow {
                    name: name.clone(),
                    value,
                }
            })
            .collect()
    }
}
