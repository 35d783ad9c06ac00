//! Form rendering: the schema projected into input descriptors for a view layer.
//!
//! Rendering is a pure function of the schema lists and, for the admin edit form, an
//! existing record. The public form and the edit form come from the same code path; they
//! differ only in which lists the caller passes and whether a record is supplied.

use crate::constants::{CUSTOM_ANSWERS_FIELD, CUSTOM_SECTION_ID, MEDICAL_FLAGS};
use crate::record::{CoreValue, CustomAnswer, IntakeRecord};
use crate::schema::{
    CoreFieldDefinition, CoreFieldType, CustomFieldDefinition, CustomFieldType, CustomGroup,
    Section,
};
use serde::Serialize;

/// One selectable option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    fn same(value: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: value.to_owned(),
        }
    }
}

/// How a field is presented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputKind {
    /// Single-line input; `html_type` is one of text, email, tel, date or number.
    Text { html_type: &'static str },
    Textarea,
    Select { choices: Vec<Choice> },
    Radio { choices: Vec<Choice> },
    /// A single yes/no box.
    Checkbox,
    CheckboxGroup { choices: Vec<Choice> },
    /// Drawing surface; never carries a value.
    SignaturePad,
}

/// Current value shown in a field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub key: String,
    /// Form input name: the key for core fields, `df[key]` for custom fields.
    pub name: String,
    pub label: String,
    pub required: bool,
    pub input: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomGroupView {
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_groups: Vec<CustomGroupView>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FormView {
    pub sections: Vec<SectionView>,
}

impl FormView {
    /// Every descriptor in render order, custom fields included.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.sections.iter().flat_map(|s| {
            s.fields
                .iter()
                .chain(s.custom_groups.iter().flat_map(|g| g.fields.iter()))
        })
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.key == key)
    }
}

/// Projects the schema into a [`FormView`].
///
/// Each section lists the core fields whose `section` matches its id, in the order given.
/// The grouped custom fields are rendered inside the `custom` section only. When
/// `existing` is supplied every descriptor is pre-filled from it.
pub fn render_schema(
    sections: &[Section],
    core_fields: &[CoreFieldDefinition],
    custom_grouped: &[CustomGroup],
    existing: Option<&IntakeRecord>,
) -> FormView {
    let sections = sections
        .iter()
        .map(|section| {
            let fields = core_fields
                .iter()
                .filter(|f| f.section == section.id)
                .map(|f| describe_core(f, existing))
                .collect();

            let custom_groups = if section.id == CUSTOM_SECTION_ID {
                custom_grouped
                    .iter()
                    .map(|group| CustomGroupView {
                        title: group.title.clone(),
                        fields: group
                            .fields
                            .iter()
                            .map(|f| describe_custom(f, existing))
                            .collect(),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            SectionView {
                id: section.id.to_string(),
                title: section.title.clone(),
                fields,
                custom_groups,
            }
        })
        .collect();

    FormView { sections }
}

fn describe_core(field: &CoreFieldDefinition, existing: Option<&IntakeRecord>) -> FieldDescriptor {
    let choices = || -> Vec<Choice> { field.choices().iter().map(|c| Choice::same(c)).collect() };
    let input = match field.field_type {
        CoreFieldType::Text => InputKind::Text { html_type: "text" },
        CoreFieldType::Email => InputKind::Text { html_type: "email" },
        CoreFieldType::Tel => InputKind::Text { html_type: "tel" },
        CoreFieldType::Date => InputKind::Text { html_type: "date" },
        CoreFieldType::Number => InputKind::Text { html_type: "number" },
        CoreFieldType::Textarea => InputKind::Textarea,
        CoreFieldType::Select => InputKind::Select { choices: choices() },
        CoreFieldType::CheckboxOne => InputKind::Checkbox,
        CoreFieldType::CheckboxMulti => InputKind::CheckboxGroup { choices: choices() },
        CoreFieldType::MedicalFlags => InputKind::CheckboxGroup {
            choices: MEDICAL_FLAGS
                .iter()
                .map(|(value, label)| Choice {
                    value: (*value).to_owned(),
                    label: (*label).to_owned(),
                })
                .collect(),
        },
        CoreFieldType::Signature => InputKind::SignaturePad,
    };

    let value = match field.field_type {
        CoreFieldType::Signature => None,
        _ => existing
            .and_then(|record| record.columns.value_of(field.key.as_str()))
            .map(|value| match value {
                CoreValue::Flag(flag) => FieldValue::Flag(flag),
                CoreValue::Text(text) => FieldValue::Text(text),
                CoreValue::List(items) => FieldValue::List(items),
            }),
    };

    FieldDescriptor {
        key: field.key.to_string(),
        name: field.key.to_string(),
        label: field.label.clone(),
        required: field.required,
        input,
        value,
    }
}

fn describe_custom(
    field: &CustomFieldDefinition,
    existing: Option<&IntakeRecord>,
) -> FieldDescriptor {
    let choices = || -> Vec<Choice> { field.choices().iter().map(|c| Choice::same(c)).collect() };
    let input = match field.field_type {
        CustomFieldType::Text => InputKind::Text { html_type: "text" },
        CustomFieldType::Email => InputKind::Text { html_type: "email" },
        CustomFieldType::Tel => InputKind::Text { html_type: "tel" },
        CustomFieldType::Date => InputKind::Text { html_type: "date" },
        CustomFieldType::Number => InputKind::Text { html_type: "number" },
        CustomFieldType::Textarea => InputKind::Textarea,
        CustomFieldType::Select => InputKind::Select { choices: choices() },
        CustomFieldType::Radio => InputKind::Radio { choices: choices() },
        CustomFieldType::Checkbox => InputKind::CheckboxGroup { choices: choices() },
    };

    let value = existing
        .and_then(|record| record.custom_answers.get(field.key.as_str()))
        .and_then(Option::as_ref)
        .map(|answer| match answer {
            CustomAnswer::Number(n) => FieldValue::Number(*n),
            CustomAnswer::Text(text) => FieldValue::Text(text.clone()),
            CustomAnswer::Choices(items) => FieldValue::List(items.clone()),
        });

    FieldDescriptor {
        key: field.key.to_string(),
        name: format!("{CUSTOM_ANSWERS_FIELD}[{}]", field.key),
        label: field.label.clone(),
        required: field.required,
        input,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CoreColumns, CustomAnswers, RecordId};
    use crate::schema::Schema;
    use chrono::Utc;
    use intake_types::Slug;

    fn schema_with_custom() -> Schema {
        let mut schema = Schema::seed();
        schema.custom = vec![
            CustomFieldDefinition {
                enabled: true,
                order: 10,
                section: "Goals".into(),
                key: Slug::parse("goal").unwrap(),
                label: "Main goal".into(),
                field_type: CustomFieldType::Radio,
                options: Some("Rest, Energy".into()),
                required: true,
            },
            CustomFieldDefinition {
                enabled: true,
                order: 20,
                section: "Goals".into(),
                key: Slug::parse("weight").unwrap(),
                label: "Weight".into(),
                field_type: CustomFieldType::Number,
                options: None,
                required: false,
            },
        ];
        schema
    }

    fn public_form(schema: &Schema) -> FormView {
        render_schema(
            &schema.sections(true),
            &schema.core_fields(true),
            &schema.group_custom_by_section(),
            None,
        )
    }

    #[test]
    fn public_form_follows_section_order_and_skips_disabled() {
        let form = public_form(&Schema::seed());
        let ids: Vec<&str> = form.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["patient", "medical", "access", "therapy", "custom", "consent"]);

        assert!(form.field("pronouns").is_none());
        assert!(form.field("vital_bp").is_none());
        assert!(form.fields().all(|f| f.value.is_none()));

        let patient = &form.sections[0];
        assert_eq!(patient.fields[0].key, "full_name");
        assert_eq!(patient.fields[1].key, "dob");
    }

    #[test]
    fn special_types_get_their_own_inputs() {
        let form = public_form(&Schema::seed());

        assert_eq!(form.field("sms_opt_in").unwrap().input, InputKind::Checkbox);
        assert_eq!(form.field("signature_draw").unwrap().input, InputKind::SignaturePad);
        assert_eq!(
            form.field("dob").unwrap().input,
            InputKind::Text { html_type: "date" }
        );

        let InputKind::CheckboxGroup { choices } = &form.field("medical_flags").unwrap().input
        else {
            panic!("medical flags should be a checkbox group");
        };
        assert_eq!(choices.len(), 15);
        assert_eq!(choices[0].value, "congestive_heart_failure");
        assert_eq!(choices[14].label, "None of the above");
    }

    #[test]
    fn custom_fields_render_only_in_custom_section() {
        let form = public_form(&schema_with_custom());
        let custom = form.sections.iter().find(|s| s.id == "custom").unwrap();

        assert!(custom.fields.is_empty());
        assert_eq!(custom.custom_groups.len(), 1);
        assert_eq!(custom.custom_groups[0].title, "Goals");

        let goal = &custom.custom_groups[0].fields[0];
        assert_eq!(goal.name, "df[goal]");
        assert!(goal.required);
        assert_eq!(
            goal.input,
            InputKind::Radio {
                choices: vec![Choice::same("Rest"), Choice::same("Energy")]
            }
        );

        let other_groups: usize = form
            .sections
            .iter()
            .filter(|s| s.id != "custom")
            .map(|s| s.custom_groups.len())
            .sum();
        assert_eq!(other_groups, 0);
    }

    #[test]
    fn admin_edit_prefills_from_record() {
        let schema = schema_with_custom();
        let mut columns = CoreColumns::default();
        columns.full_name = Some("Jane Doe".into());
        columns.consent_treatment = true;
        columns.pronouns = Some("she/her".into());
        let mut answers = CustomAnswers::new();
        answers.insert(Slug::parse("weight").unwrap(), Some(CustomAnswer::Number(71.5)));
        answers.insert(Slug::parse("goal").unwrap(), None);

        let record = IntakeRecord {
            id: RecordId::new(1),
            created_at: Utc::now(),
            ip_address: None,
            user_agent: None,
            columns,
            signature_url: Some("https://x/sig".into()),
            signed_at: None,
            provider_name: None,
            provider_signature_url: None,
            provider_signed_at: None,
            custom_answers: answers,
            honeypot: None,
        };

        let form = render_schema(
            &schema.sections(true),
            &schema.core_fields(false),
            &schema.group_custom_by_section(),
            Some(&record),
        );

        assert_eq!(
            form.field("full_name").unwrap().value,
            Some(FieldValue::Text("Jane Doe".into()))
        );
        assert_eq!(
            form.field("pronouns").unwrap().value,
            Some(FieldValue::Text("she/her".into()))
        );
        assert_eq!(
            form.field("consent_treatment").unwrap().value,
            Some(FieldValue::Flag(true))
        );
        assert_eq!(form.field("signature_draw").unwrap().value, None);
        assert_eq!(form.field("weight").unwrap().value, Some(FieldValue::Number(71.5)));
        assert_eq!(form.field("goal").unwrap().value, None);
    }
}
