//! Intake records: one per accepted submission.
//!
//! Core answers land in [`CoreColumns`], a fixed struct whose fields are the seeded core
//! keys. Custom answers live in an open mapping from custom field key to answer.

use crate::validation::{is_truthy, parse_date, parse_number};
use chrono::{DateTime, NaiveDate, Utc};
use intake_types::Slug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Numeric record identifier, allocated by the record store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// A mapped core answer before it is written to its column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoreValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl CoreValue {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }

    fn is_set(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => is_truthy(text),
            Self::List(items) => !items.is_empty(),
        }
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Self::List(items) => items,
            Self::Text(text) if !text.is_empty() => vec![text],
            _ => Vec::new(),
        }
    }
}

/// Core answers keyed by core field key.
pub type CoreValues = BTreeMap<Slug, CoreValue>;

/// A custom field answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomAnswer {
    Number(f64),
    Text(String),
    Choices(Vec<String>),
}

/// Answers for every enabled custom field at write time; unanswered fields map to `None`.
pub type CustomAnswers = BTreeMap<Slug, Option<CustomAnswer>>;

macro_rules! column_slots {
    ($slot_mut:ident, $slot:ident, $ty:ty, [$($column:ident),* $(,)?]) => {
        fn $slot_mut(&mut self, key: &str) -> Option<&mut $ty> {
            match key {
                $(stringify!($column) => Some(&mut self.$column),)*
                _ => None,
            }
        }

        fn $slot(&self, key: &str) -> Option<&$ty> {
            match key {
                $(stringify!($column) => Some(&self.$column),)*
                _ => None,
            }
        }
    };
}

/// Fixed record columns, one per seeded core key (the drawn signature is stored separately).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreColumns {
    pub full_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub sex_at_birth: Option<String>,
    pub pronouns: Option<String>,
    pub phone: Option<String>,
    pub sms_opt_in: bool,
    pub email: Option<String>,
    pub email_hipaa_opt_in: bool,
    pub address1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_relationship: Option<String>,
    pub emergency_phone: Option<String>,

    pub medical_flags: Vec<String>,
    pub allergies: Option<String>,
    pub meds_rx: Option<String>,
    pub meds_otc: Option<String>,
    pub on_anticoagulants: Option<String>,
    pub on_diuretics: Option<String>,
    pub status_nvd: Option<String>,
    pub status_alcohol: Option<String>,
    pub last_oral_intake: Option<String>,
    pub prior_iv_nad: Option<String>,

    pub access_preference: Option<String>,
    pub hard_stick: Option<String>,
    pub allow_numbing: Option<String>,

    pub vital_bp: Option<String>,
    pub vital_hr: Option<i16>,
    pub vital_temp_f: Option<f64>,
    pub vital_o2: Option<u8>,

    pub therapy_selection: Option<String>,
    pub therapy_other: Option<String>,
    pub nad_dose: Option<String>,
    pub addons: Vec<String>,
    pub addons_other: Option<String>,

    pub consent_treatment: bool,
    pub consent_financial: bool,
    pub consent_comms_email: bool,
    pub consent_comms_sms: bool,
    pub consent_privacy: bool,
    pub consent_photo: bool,

    pub signature_name: Option<String>,
}

impl CoreColumns {
    column_slots!(text_slot_mut, text_slot, Option<String>, [
        full_name, sex_at_birth, pronouns, phone, email, address1, city, state, zip,
        emergency_name, emergency_relationship, emergency_phone, allergies, meds_rx, meds_otc,
        on_anticoagulants, on_diuretics, status_nvd, status_alcohol, last_oral_intake,
        prior_iv_nad, access_preference, hard_stick, allow_numbing, vital_bp,
        therapy_selection, therapy_other, nad_dose, addons_other, signature_name,
    ]);

    column_slots!(flag_slot_mut, flag_slot, bool, [
        sms_opt_in, email_hipaa_opt_in, consent_treatment, consent_financial,
        consent_comms_email, consent_comms_sms, consent_privacy, consent_photo,
    ]);

    column_slots!(list_slot_mut, list_slot, Vec<String>, [medical_flags, addons]);

    /// Builds columns from mapped core values; keys without a column are skipped.
    pub fn from_values(values: &CoreValues) -> Self {
        let mut columns = Self::default();
        columns.apply(values);
        columns
    }

    /// Assigns every value whose key is a column.
    pub fn apply(&mut self, values: &CoreValues) {
        for (key, value) in values {
            self.assign(key.as_str(), value.clone());
        }
    }

    /// Writes `value` into the column named `key`.
    ///
    /// Returns `false` when `key` is not a column. Text that does not parse for a date or
    /// numeric column is stored as `None`.
    pub fn assign(&mut self, key: &str, value: CoreValue) -> bool {
        if let Some(slot) = self.text_slot_mut(key) {
            *slot = value.into_text();
            return true;
        }
        if let Some(slot) = self.flag_slot_mut(key) {
            *slot = value.is_set();
            return true;
        }
        if let Some(slot) = self.list_slot_mut(key) {
            *slot = value.into_list();
            return true;
        }

        let text = value.as_text();
        match key {
            "dob" => self.dob = text.and_then(parse_date),
            "vital_hr" => {
                self.vital_hr = text
                    .and_then(parse_number)
                    .map(f64::trunc)
                    .filter(|n| (f64::from(i16::MIN)..=f64::from(i16::MAX)).contains(n))
                    .map(|n| n as i16)
            }
            "vital_temp_f" => {
                self.vital_temp_f = text
                    .and_then(parse_number)
                    .map(|n| (n * 10.0).round() / 10.0)
            }
            "vital_o2" => {
                self.vital_o2 = text
                    .and_then(parse_number)
                    .map(f64::trunc)
                    .filter(|n| (0.0..=f64::from(u8::MAX)).contains(n))
                    .map(|n| n as u8)
            }
            _ => return false,
        }
        true
    }

    /// Current value of the column named `key`, shaped for form pre-fill.
    pub fn value_of(&self, key: &str) -> Option<CoreValue> {
        if let Some(text) = self.text_slot(key) {
            return text.clone().map(CoreValue::Text);
        }
        if let Some(flag) = self.flag_slot(key) {
            return Some(CoreValue::Flag(*flag));
        }
        if let Some(list) = self.list_slot(key) {
            return Some(CoreValue::List(list.clone()));
        }
        match key {
            "dob" => self
                .dob
                .map(|d| CoreValue::Text(d.format("%Y-%m-%d").to_string())),
            "vital_hr" => self.vital_hr.map(|n| CoreValue::Text(n.to_string())),
            "vital_temp_f" => self.vital_temp_f.map(|n| CoreValue::Text(n.to_string())),
            "vital_o2" => self.vital_o2.map(|n| CoreValue::Text(n.to_string())),
            _ => None,
        }
    }
}

/// A persisted intake submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    pub columns: CoreColumns,

    pub signature_url: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub provider_signature_url: Option<String>,
    #[serde(default)]
    pub provider_signed_at: Option<DateTime<Utc>>,

    #[serde(rename = "extra_json", default)]
    pub custom_answers: CustomAnswers,

    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Everything needed to create a record; the store assigns the id.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordDraft {
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub columns: CoreColumns,
    pub signature_url: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub custom_answers: CustomAnswers,
    pub honeypot: Option<String>,
}

impl RecordDraft {
    pub fn into_record(self, id: RecordId) -> IntakeRecord {
        IntakeRecord {
            id,
            created_at: self.created_at,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            columns: self.columns,
            signature_url: self.signature_url,
            signed_at: self.signed_at,
            provider_name: None,
            provider_signature_url: None,
            provider_signed_at: None,
            custom_answers: self.custom_answers,
            honeypot: self.honeypot,
        }
    }
}

/// Row of the admin submissions list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub full_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub therapy_selection: Option<String>,
}

impl From<&IntakeRecord> for RecordSummary {
    fn from(record: &IntakeRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            full_name: record.columns.full_name.clone(),
            dob: record.columns.dob,
            phone: record.columns.phone.clone(),
            email: record.columns.email.clone(),
            therapy_selection: record.columns.therapy_selection.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CoreValue {
        CoreValue::Text(s.to_string())
    }

    #[test]
    fn assign_is_a_whitelist() {
        let mut columns = CoreColumns::default();
        assert!(columns.assign("full_name", text("Jane Doe")));
        assert!(!columns.assign("signature_draw", text("data")));
        assert!(!columns.assign("favourite_colour", text("blue")));
        assert_eq!(columns.full_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn typed_columns_parse_or_clear() {
        let mut columns = CoreColumns::default();
        columns.assign("dob", text("1990-04-12"));
        columns.assign("vital_hr", text("72.9"));
        columns.assign("vital_temp_f", text("98.64"));
        columns.assign("vital_o2", text("97"));
        assert_eq!(columns.dob, NaiveDate::from_ymd_opt(1990, 4, 12));
        assert_eq!(columns.vital_hr, Some(72));
        assert_eq!(columns.vital_temp_f, Some(98.6));
        assert_eq!(columns.vital_o2, Some(97));

        columns.assign("dob", text("not a date"));
        columns.assign("vital_o2", text("400"));
        assert_eq!(columns.dob, None);
        assert_eq!(columns.vital_o2, None);
    }

    #[test]
    fn flags_and_lists() {
        let mut columns = CoreColumns::default();
        columns.assign("consent_treatment", CoreValue::Flag(true));
        columns.assign("sms_opt_in", text("0"));
        columns.assign(
            "medical_flags",
            CoreValue::List(vec!["diabetes".into(), "anemia".into()]),
        );
        assert!(columns.consent_treatment);
        assert!(!columns.sms_opt_in);
        assert_eq!(columns.medical_flags, ["diabetes", "anemia"]);
        assert_eq!(
            columns.value_of("medical_flags"),
            Some(CoreValue::List(vec!["diabetes".into(), "anemia".into()]))
        );
        assert_eq!(columns.value_of("consent_photo"), Some(CoreValue::Flag(false)));
    }

    #[test]
    fn empty_text_is_stored_as_none() {
        let mut columns = CoreColumns::default();
        columns.assign("city", text(""));
        assert_eq!(columns.city, None);
        assert_eq!(columns.value_of("city"), None);
    }

    #[test]
    fn record_id_parses_and_orders() {
        let id: RecordId = " 41 ".parse().unwrap();
        assert_eq!(id.next(), RecordId::new(42));
        assert!(RecordId::new(3) < RecordId::new(10));
        assert!("x".parse::<RecordId>().is_err());
    }

    #[test]
    fn custom_answers_round_trip_through_yaml() {
        let mut answers = CustomAnswers::new();
        answers.insert(Slug::parse("goal").unwrap(), Some(CustomAnswer::Text("42".into())));
        answers.insert(Slug::parse("weight").unwrap(), Some(CustomAnswer::Number(71.5)));
        answers.insert(Slug::parse("skipped").unwrap(), None);

        let yaml = serde_yaml::to_string(&answers).unwrap();
        let back: CustomAnswers = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, answers);
    }
}
