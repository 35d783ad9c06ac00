//! Raw request payloads as handed over by the transport layer.
//!
//! Form posts arrive as string-keyed mappings. Multi-select inputs arrive as lists and
//! custom answers arrive nested under `df`.

use crate::constants::USER_AGENT_MAX_LEN;
use intake_types::sanitize_text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One posted value: a single string or a list of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Single(String),
    Multiple(Vec<String>),
}

impl PayloadValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value.as_str()),
            Self::Multiple(_) => None,
        }
    }

    /// List view: a single value is a one-item list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::Single(value) => vec![value.clone()],
            Self::Multiple(values) => values.clone(),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<Vec<&str>> for PayloadValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(str::to_owned).collect())
    }
}

/// A public submission or admin edit post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Hidden anti-automation field.
    #[serde(rename = "company", default, skip_serializing_if = "Option::is_none")]
    pub honeypot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_data: Option<String>,
    #[serde(rename = "df", default)]
    pub custom: BTreeMap<String, PayloadValue>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, PayloadValue>,
}

impl SubmissionPayload {
    pub fn field(&self, key: &str) -> Option<&PayloadValue> {
        self.fields.get(key)
    }

    /// Builder-style setter for a core answer.
    pub fn with_field(mut self, key: &str, value: impl Into<PayloadValue>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    /// Builder-style setter for a custom answer.
    pub fn with_custom(mut self, key: &str, value: impl Into<PayloadValue>) -> Self {
        self.custom.insert(key.to_owned(), value.into());
        self
    }

    pub fn with_signature(mut self, data_uri: &str) -> Self {
        self.signature_data = Some(data_uri.to_owned());
        self
    }

    /// True when the honeypot carries anything at all.
    pub fn is_spam(&self) -> bool {
        self.honeypot.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Request facts captured with a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
        }
    }

    /// Sanitised IP address, `None` when blank.
    pub fn stored_ip_address(&self) -> Option<String> {
        self.ip_address
            .as_deref()
            .map(sanitize_text)
            .filter(|ip| !ip.is_empty())
    }

    /// Sanitised user agent cut to [`USER_AGENT_MAX_LEN`] characters.
    pub fn stored_user_agent(&self) -> Option<String> {
        self.user_agent
            .as_deref()
            .map(|ua| sanitize_text(ua).chars().take(USER_AGENT_MAX_LEN).collect::<String>())
            .filter(|ua| !ua.is_empty())
    }
}

/// A posted section row from the builder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedSection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "crate::schema::serde_helpers::flag")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "crate::schema::serde_helpers::order::deserialize_opt")]
    pub order: Option<i64>,
}

/// A posted core field row. `key` and `type` are only consulted when no stored definition
/// exists at the same position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedCoreField {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default, with = "crate::schema::serde_helpers::flag")]
    pub required: bool,
    #[serde(default, with = "crate::schema::serde_helpers::flag")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "crate::schema::serde_helpers::order::deserialize_opt")]
    pub order: Option<i64>,
}

/// A posted custom field row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedCustomField {
    #[serde(default, with = "crate::schema::serde_helpers::flag")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "crate::schema::serde_helpers::order::deserialize_opt")]
    pub order: Option<i64>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default, with = "crate::schema::serde_helpers::flag")]
    pub required: bool,
}

/// A full builder save: the three posted collections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderPayload {
    #[serde(default)]
    pub sections: Vec<PostedSection>,
    #[serde(default)]
    pub core: Vec<PostedCoreField>,
    #[serde(default)]
    pub custom: Vec<PostedCustomField>,
}
