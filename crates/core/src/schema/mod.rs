//! Form schema: sections, core field definitions and custom field definitions.
//!
//! The schema is the single source both the renderer and the submission mapper work from.
//! Field types are closed enums, so every consumer matches on every variant.
//!
//! ## Stored shape
//!
//! ```text
//! Section                { id, title, enabled, order }
//! CoreFieldDefinition    { key, label, section, type, options?, required, enabled, order,
//!                          lock_required, lock_enabled }
//! CustomFieldDefinition  { enabled, order, section, key, label, type, options?, required }
//! ```
//!
//! Boolean flags deserialize from `true/false`, `0/1` and `"0"/"1"`, and orders from
//! integers or numeric strings, so documents written by older tooling load unchanged.

mod query;
mod seed;
pub(crate) mod serde_helpers;

pub use query::CustomGroup;
pub(crate) use query::{sort_core, sort_custom, sort_sections};

use intake_types::Slug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order given to rows that arrive without one.
pub const DEFAULT_ORDER: i64 = 100;

/// Type of a core field. Fixed at seed time; the builder never changes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreFieldType {
    Text,
    Textarea,
    Email,
    Tel,
    Date,
    Number,
    Select,
    CheckboxOne,
    CheckboxMulti,
    MedicalFlags,
    Signature,
}

impl CoreFieldType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Date => "date",
            Self::Number => "number",
            Self::Select => "select",
            Self::CheckboxOne => "checkbox_one",
            Self::CheckboxMulti => "checkbox_multi",
            Self::MedicalFlags => "medical_flags",
            Self::Signature => "signature",
        }
    }
}

impl fmt::Display for CoreFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoreFieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "email" => Self::Email,
            "tel" => Self::Tel,
            "date" => Self::Date,
            "number" => Self::Number,
            "select" => Self::Select,
            "checkbox_one" => Self::CheckboxOne,
            "checkbox_multi" => Self::CheckboxMulti,
            "medical_flags" => Self::MedicalFlags,
            "signature" => Self::Signature,
            other => return Err(format!("unknown core field type '{other}'")),
        })
    }
}

/// Type of an administrator-defined field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldType {
    Text,
    Textarea,
    Email,
    Tel,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
}

impl CustomFieldType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
        }
    }

    /// Parses a posted type name; anything unrecognised becomes `Text`.
    pub fn parse_or_text(value: &str) -> Self {
        match value.trim() {
            "textarea" => Self::Textarea,
            "email" => Self::Email,
            "tel" => Self::Tel,
            "number" => Self::Number,
            "date" => Self::Date,
            "select" => Self::Select,
            "radio" => Self::Radio,
            "checkbox" => Self::Checkbox,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for CustomFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(deserialize_with = "serde_helpers::slug::deserialize")]
    pub id: Slug,
    #[serde(default)]
    pub title: String,
    #[serde(with = "serde_helpers::flag")]
    pub enabled: bool,
    #[serde(
        default = "default_order",
        deserialize_with = "serde_helpers::order::deserialize"
    )]
    pub order: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreFieldDefinition {
    #[serde(deserialize_with = "serde_helpers::slug::deserialize")]
    pub key: Slug,
    #[serde(default)]
    pub label: String,
    #[serde(deserialize_with = "serde_helpers::slug::deserialize")]
    pub section: Slug,
    #[serde(rename = "type")]
    pub field_type: CoreFieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(with = "serde_helpers::flag")]
    pub required: bool,
    #[serde(with = "serde_helpers::flag")]
    pub enabled: bool,
    #[serde(
        default = "default_order",
        deserialize_with = "serde_helpers::order::deserialize"
    )]
    pub order: i64,
    #[serde(default, with = "serde_helpers::flag")]
    pub lock_required: bool,
    #[serde(default, with = "serde_helpers::flag")]
    pub lock_enabled: bool,
}

impl CoreFieldDefinition {
    /// Parsed choice list (see [`parse_choices`]).
    pub fn choices(&self) -> Vec<String> {
        parse_choices(self.options.as_deref())
    }

    /// Forces `enabled`/`required` on when the matching lock is set.
    pub fn enforce_locks(&mut self) {
        if self.lock_enabled {
            self.enabled = true;
        }
        if self.lock_required {
            self.required = true;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    #[serde(with = "serde_helpers::flag")]
    pub enabled: bool,
    #[serde(
        default = "default_order",
        deserialize_with = "serde_helpers::order::deserialize"
    )]
    pub order: i64,
    /// Free-text display group, not a section id.
    #[serde(default)]
    pub section: String,
    #[serde(deserialize_with = "serde_helpers::slug::deserialize")]
    pub key: Slug,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, with = "serde_helpers::flag")]
    pub required: bool,
}

impl CustomFieldDefinition {
    pub fn choices(&self) -> Vec<String> {
        parse_choices(self.options.as_deref())
    }
}

/// The three schema collections, always loaded and saved together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub core: Vec<CoreFieldDefinition>,
    #[serde(default)]
    pub custom: Vec<CustomFieldDefinition>,
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.core.is_empty() && self.custom.is_empty()
    }

    pub fn find_core(&self, key: &str) -> Option<&CoreFieldDefinition> {
        self.core.iter().find(|f| f.key == key)
    }
}

/// Splits a comma-delimited option string into trimmed, non-empty choices.
pub fn parse_choices(options: Option<&str>) -> Vec<String> {
    options
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|choice| !choice.is_empty())
        .map(str::to_owned)
        .collect()
}

fn default_order() -> i64 {
    DEFAULT_ORDER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_choices_trims_and_skips_blanks() {
        assert_eq!(
            parse_choices(Some(" Yes, No ,,Unsure ")),
            vec!["Yes", "No", "Unsure"]
        );
        assert!(parse_choices(None).is_empty());
        assert!(parse_choices(Some("")).is_empty());
    }

    #[test]
    fn core_type_round_trips_through_str() {
        for t in [
            CoreFieldType::Text,
            CoreFieldType::CheckboxOne,
            CoreFieldType::CheckboxMulti,
            CoreFieldType::MedicalFlags,
            CoreFieldType::Signature,
        ] {
            assert_eq!(t.as_str().parse::<CoreFieldType>().unwrap(), t);
            assert_eq!(serde_json::to_string(&t).unwrap(), format!("\"{}\"", t));
        }
        assert!("slider".parse::<CoreFieldType>().is_err());
    }

    #[test]
    fn custom_type_falls_back_to_text() {
        assert_eq!(CustomFieldType::parse_or_text("radio"), CustomFieldType::Radio);
        assert_eq!(CustomFieldType::parse_or_text("file"), CustomFieldType::Text);
    }

    #[test]
    fn core_definition_accepts_integer_flags() {
        let json = r#"{"key":"full_name","label":"Full Name","section":"patient","type":"text",
            "required":1,"enabled":"1","order":"10","lock_required":1,"lock_enabled":0}"#;
        let def: CoreFieldDefinition = serde_json::from_str(json).unwrap();
        assert!(def.required);
        assert!(def.enabled);
        assert_eq!(def.order, 10);
        assert!(def.lock_required);
        assert!(!def.lock_enabled);
        assert!(def.options.is_none());
    }

    #[test]
    fn enforce_locks_turns_flags_on() {
        let mut def = Schema::seed().find_core("dob").cloned().unwrap();
        def.enabled = false;
        def.required = false;
        def.enforce_locks();
        assert!(def.enabled && def.required);
    }
}
