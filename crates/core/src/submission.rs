//! Submission validation and mapping.
//!
//! [`validate_and_map`] screens a public submission against the enabled schema and turns
//! it into typed core values, custom answers and a decoded signature image.
//! [`map_edit`] is the lighter admin-edit variant: the same value checks, no required or
//! lock checks and no signature.
//!
//! All checks accumulate into one [`ValidationErrors`] so every problem is reported
//! together. Nothing is persisted here.

use crate::constants::{
    LOCKED_CORE_KEYS, LOCKED_FIELD_DISABLED_MESSAGE, MEDICAL_FLAGS, SIGNATURE_REQUIRED_MESSAGE,
};
use crate::payload::{PayloadValue, SubmissionPayload};
use crate::record::{CoreValue, CoreValues, CustomAnswer, CustomAnswers};
use crate::schema::{CoreFieldDefinition, CoreFieldType, CustomFieldDefinition, CustomFieldType};
use crate::signature::SignatureImage;
use crate::validation::{is_truthy, is_valid_email, parse_date, parse_number};
use crate::{IntakeResult, ValidationErrors};
use intake_types::{sanitize_multiline, sanitize_text};

/// Outcome of screening a public submission.
#[derive(Debug)]
pub enum Screening {
    /// The honeypot was filled in. Nothing should be stored, and the caller should answer
    /// exactly as for an accepted submission.
    Spam,
    Accepted(MappedSubmission),
}

/// A submission that passed every check.
#[derive(Debug)]
pub struct MappedSubmission {
    pub core_values: CoreValues,
    pub custom_answers: CustomAnswers,
    pub signature: SignatureImage,
}

/// Answers mapped from an admin edit.
#[derive(Debug, Default)]
pub struct EditMapping {
    pub core_values: CoreValues,
    pub custom_answers: CustomAnswers,
}

/// Validates a public submission and maps it onto the schema.
///
/// `core_fields` and `custom_fields` are the enabled definitions. Disabled entries that
/// slip through are skipped.
///
/// # Errors
///
/// - `IntakeError::Validation` with every accumulated message when any required, lock,
///   signature-presence or value check fails
/// - `IntakeError::SignatureDecode` when all checks pass but the signature data URI is not
///   a well-formed PNG
pub fn validate_and_map(
    payload: &SubmissionPayload,
    core_fields: &[CoreFieldDefinition],
    custom_fields: &[CustomFieldDefinition],
) -> IntakeResult<Screening> {
    if payload.is_spam() {
        return Ok(Screening::Spam);
    }

    let enabled_core: Vec<&CoreFieldDefinition> = core_fields.iter().filter(|f| f.enabled).collect();
    let enabled_custom: Vec<&CustomFieldDefinition> =
        custom_fields.iter().filter(|f| f.enabled).collect();

    let mut mapper = AnswerMapper::new(true);
    let core_values = mapper.map_core(&enabled_core, payload);

    for key in LOCKED_CORE_KEYS {
        let intact = enabled_core
            .iter()
            .any(|f| f.key == key && f.enabled && f.required);
        if !intact {
            mapper.errors.push_unique(LOCKED_FIELD_DISABLED_MESSAGE);
        }
    }

    let signature_data = payload
        .signature_data
        .as_deref()
        .map(str::trim)
        .filter(|data| !data.is_empty());
    if signature_data.is_none() {
        mapper.errors.push(SIGNATURE_REQUIRED_MESSAGE);
    }

    let custom_answers = mapper.map_custom(&enabled_custom, payload);
    mapper.errors.into_result()?;

    let signature = SignatureImage::from_data_uri(signature_data.unwrap_or_default())?;

    Ok(Screening::Accepted(MappedSubmission {
        core_values,
        custom_answers,
        signature,
    }))
}

/// Maps an admin edit of an existing record.
///
/// `core_fields` should be every core definition, disabled ones included, so staff can
/// correct any column. `custom_fields` are the enabled custom definitions; the resulting
/// answers replace the record's stored answers wholesale.
///
/// # Errors
///
/// Returns `IntakeError::Validation` when a value check fails (bad date, number, email or
/// choice).
pub fn map_edit(
    payload: &SubmissionPayload,
    core_fields: &[CoreFieldDefinition],
    custom_fields: &[CustomFieldDefinition],
) -> IntakeResult<EditMapping> {
    let core: Vec<&CoreFieldDefinition> = core_fields.iter().collect();
    let custom: Vec<&CustomFieldDefinition> = custom_fields.iter().filter(|f| f.enabled).collect();

    let mut mapper = AnswerMapper::new(false);
    let core_values = mapper.map_core(&core, payload);
    let custom_answers = mapper.map_custom(&custom, payload);
    mapper.errors.into_result()?;

    Ok(EditMapping {
        core_values,
        custom_answers,
    })
}

struct AnswerMapper {
    errors: ValidationErrors,
    enforce_required: bool,
}

impl AnswerMapper {
    fn new(enforce_required: bool) -> Self {
        Self {
            errors: ValidationErrors::new(),
            enforce_required,
        }
    }

    fn map_core(
        &mut self,
        fields: &[&CoreFieldDefinition],
        payload: &SubmissionPayload,
    ) -> CoreValues {
        let mut values = CoreValues::new();
        for field in fields {
            if field.field_type == CoreFieldType::Signature {
                continue;
            }
            let value = self.coerce_core(field, payload.field(field.key.as_str()));
            if self.enforce_required && field.required && core_value_is_empty(&value) {
                self.errors.push(required_message(&field.label));
            }
            values.insert(field.key.clone(), value);
        }
        values
    }

    fn coerce_core(&mut self, field: &CoreFieldDefinition, raw: Option<&PayloadValue>) -> CoreValue {
        let single = raw.and_then(PayloadValue::as_single).unwrap_or_default();

        match field.field_type {
            CoreFieldType::CheckboxOne => CoreValue::Flag(match raw {
                Some(PayloadValue::Single(v)) => is_truthy(v),
                Some(PayloadValue::Multiple(v)) => !v.is_empty(),
                None => false,
            }),
            CoreFieldType::CheckboxMulti => {
                let choices = field.choices();
                CoreValue::List(list_within(raw, |item| choices.iter().any(|c| c == item)))
            }
            CoreFieldType::MedicalFlags => CoreValue::List(list_within(raw, |item| {
                MEDICAL_FLAGS.iter().any(|(key, _)| *key == item)
            })),
            CoreFieldType::Textarea => CoreValue::Text(sanitize_multiline(single)),
            CoreFieldType::Text | CoreFieldType::Tel | CoreFieldType::Signature => {
                CoreValue::Text(sanitize_text(single))
            }
            CoreFieldType::Email => {
                let text = sanitize_text(single);
                self.check_email(&field.label, &text);
                CoreValue::Text(text)
            }
            CoreFieldType::Date => {
                let text = sanitize_text(single);
                self.check_date(&field.label, &text);
                CoreValue::Text(text)
            }
            CoreFieldType::Number => {
                let text = sanitize_text(single);
                if !text.is_empty() && parse_number(&text).is_none() {
                    self.errors.push(number_message(&field.label));
                }
                CoreValue::Text(text)
            }
            CoreFieldType::Select => {
                let text = sanitize_text(single);
                self.check_choice(&field.label, &text, &field.choices());
                CoreValue::Text(text)
            }
        }
    }

    fn map_custom(
        &mut self,
        fields: &[&CustomFieldDefinition],
        payload: &SubmissionPayload,
    ) -> CustomAnswers {
        let mut answers = CustomAnswers::new();
        for field in fields {
            let answer = self.coerce_custom(field, payload.custom.get(field.key.as_str()));
            if self.enforce_required && field.required && custom_answer_is_empty(answer.as_ref()) {
                self.errors.push(required_message(&field.label));
            }
            answers.insert(field.key.clone(), answer);
        }
        answers
    }

    fn coerce_custom(
        &mut self,
        field: &CustomFieldDefinition,
        raw: Option<&PayloadValue>,
    ) -> Option<CustomAnswer> {
        let raw = raw?;

        if field.field_type == CustomFieldType::Checkbox {
            let choices = field.choices();
            return Some(CustomAnswer::Choices(list_within(Some(raw), |item| {
                choices.is_empty() || choices.iter().any(|c| c == item)
            })));
        }

        // Every other type takes a single value; a posted list is treated as no answer.
        let single = raw.as_single()?;
        match field.field_type {
            CustomFieldType::Number => {
                let text = sanitize_text(single);
                if text.is_empty() {
                    return None;
                }
                match parse_number(&text) {
                    Some(n) => Some(CustomAnswer::Number(n)),
                    None => {
                        self.errors.push(number_message(&field.label));
                        None
                    }
                }
            }
            CustomFieldType::Textarea => Some(CustomAnswer::Text(sanitize_multiline(single))),
            CustomFieldType::Email => {
                let text = sanitize_text(single);
                self.check_email(&field.label, &text);
                Some(CustomAnswer::Text(text))
            }
            CustomFieldType::Date => {
                let text = sanitize_text(single);
                self.check_date(&field.label, &text);
                Some(CustomAnswer::Text(text))
            }
            CustomFieldType::Select | CustomFieldType::Radio => {
                let text = sanitize_text(single);
                self.check_choice(&field.label, &text, &field.choices());
                Some(CustomAnswer::Text(text))
            }
            CustomFieldType::Text | CustomFieldType::Tel | CustomFieldType::Checkbox => {
                Some(CustomAnswer::Text(sanitize_text(single)))
            }
        }
    }

    fn check_email(&mut self, label: &str, text: &str) {
        if !text.is_empty() && !is_valid_email(text) {
            self.errors
                .push(format!("Field \"{label}\" must be a valid email address."));
        }
    }

    fn check_date(&mut self, label: &str, text: &str) {
        if !text.is_empty() && parse_date(text).is_none() {
            self.errors
                .push(format!("Field \"{label}\" must be a valid date."));
        }
    }

    fn check_choice(&mut self, label: &str, text: &str, choices: &[String]) {
        if !text.is_empty() && !choices.is_empty() && !choices.iter().any(|c| c == text) {
            self.errors
                .push(format!("Field \"{label}\" has an invalid choice."));
        }
    }
}

fn required_message(label: &str) -> String {
    format!("Field \"{label}\" is required.")
}

fn number_message(label: &str) -> String {
    format!("Field \"{label}\" must be a number.")
}

/// Sanitised, non-empty list members accepted by `keep`.
fn list_within(raw: Option<&PayloadValue>, keep: impl Fn(&str) -> bool) -> Vec<String> {
    raw.map(PayloadValue::to_list)
        .unwrap_or_default()
        .iter()
        .map(|item| sanitize_text(item))
        .filter(|item| !item.is_empty() && keep(item.as_str()))
        .collect()
}

fn core_value_is_empty(value: &CoreValue) -> bool {
    match value {
        CoreValue::Flag(flag) => !flag,
        CoreValue::Text(text) => text.trim().is_empty(),
        CoreValue::List(items) => items.is_empty(),
    }
}

fn custom_answer_is_empty(answer: Option<&CustomAnswer>) -> bool {
    match answer {
        None => true,
        Some(CustomAnswer::Number(_)) => false,
        Some(CustomAnswer::Text(text)) => text.trim().is_empty(),
        // A list counts as answered only when some member is neither blank nor "0".
        Some(CustomAnswer::Choices(items)) => items
            .iter()
            .all(|i| matches!(i.trim(), "" | "0")),
    }
}
