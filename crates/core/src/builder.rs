//! Form builder save path.
//!
//! Turns the posted builder rows into a new [`Schema`]. Core keys, types and lock flags are
//! always taken from the stored definition at the same position, never from the post, and a
//! set lock forces its flag on. Custom fields are replaced wholesale.
//!
//! Renaming a section id or a custom key is allowed. Records written earlier keep their old
//! references, so every such rename is logged.

use crate::constants::{
    BUILDER_CUSTOM_GROUP, DEFAULT_BUILDER_SECTION, DEFAULT_CUSTOM_KEY, DEFAULT_CUSTOM_LABEL,
};
use crate::payload::{BuilderPayload, PostedCoreField, PostedCustomField, PostedSection};
use crate::schema::{
    sort_core, sort_custom, sort_sections, CoreFieldDefinition, CoreFieldType,
    CustomFieldDefinition, CustomFieldType, Schema, Section, DEFAULT_ORDER,
};
use crate::{IntakeResult, ValidationErrors};
use intake_types::{sanitize_text, Slug};
use std::collections::BTreeSet;

/// Builds the schema to persist from a builder post.
///
/// `previous` is the currently stored schema. Its core definitions, listed the way the
/// builder lists them (sorted by section then order), supply key, type and locks for the
/// posted core row at the same index.
///
/// # Errors
///
/// Returns `IntakeError::Validation` when a section id is empty or repeated, a core row has
/// no usable key, or two enabled custom fields share a key. Nothing is returned for
/// partial saving.
pub fn apply_builder(posted: &BuilderPayload, previous: &Schema) -> IntakeResult<Schema> {
    let mut errors = ValidationErrors::new();

    let mut sections = build_sections(&posted.sections, &mut errors);
    let mut core = build_core(&posted.core, &previous.core_fields(false), &mut errors);
    let mut custom = build_custom(&posted.custom, &mut errors);

    errors.into_result()?;

    sort_sections(&mut sections);
    sort_core(&mut core);
    sort_custom(&mut custom);

    let schema = Schema {
        sections,
        core,
        custom,
    };
    warn_on_orphans(previous, &schema);
    Ok(schema)
}

fn build_sections(posted: &[PostedSection], errors: &mut ValidationErrors) -> Vec<Section> {
    let mut seen = BTreeSet::new();
    let mut sections = Vec::with_capacity(posted.len());

    for (idx, row) in posted.iter().enumerate() {
        let Ok(id) = Slug::normalise(&row.id) else {
            errors.push(format!("Section {} needs an id.", idx + 1));
            continue;
        };
        if !seen.insert(id.clone()) {
            errors.push(format!("Section id \"{id}\" is used more than once."));
            continue;
        }
        sections.push(Section {
            id,
            title: sanitize_text(row.title.as_deref().unwrap_or_default()),
            enabled: row.enabled,
            order: row.order.unwrap_or(DEFAULT_ORDER),
        });
    }
    sections
}

fn build_core(
    posted: &[PostedCoreField],
    existing: &[CoreFieldDefinition],
    errors: &mut ValidationErrors,
) -> Vec<CoreFieldDefinition> {
    let mut core = Vec::with_capacity(posted.len());

    for (idx, row) in posted.iter().enumerate() {
        let original = existing.get(idx);

        let key = match original {
            Some(orig) => orig.key.clone(),
            None => match row.key.as_deref().map(Slug::normalise) {
                Some(Ok(key)) => key,
                _ => {
                    errors.push(format!("Core field {} needs a key.", idx + 1));
                    continue;
                }
            },
        };
        let field_type = original.map(|o| o.field_type).unwrap_or_else(|| {
            row.field_type
                .as_deref()
                .and_then(|t| t.parse::<CoreFieldType>().ok())
                .unwrap_or(CoreFieldType::Text)
        });

        let label = row
            .label
            .as_deref()
            .map(sanitize_text)
            .unwrap_or_else(|| key.to_string());
        let section = row
            .section
            .as_deref()
            .and_then(|s| Slug::normalise(s).ok())
            .unwrap_or_else(|| Slug::from_title(DEFAULT_BUILDER_SECTION, DEFAULT_BUILDER_SECTION));
        let options = row
            .options
            .as_deref()
            .or_else(|| original.and_then(|o| o.options.as_deref()))
            .map(sanitize_text)
            .filter(|o| !o.is_empty());

        let mut definition = CoreFieldDefinition {
            key,
            label,
            section,
            field_type,
            options,
            required: row.required,
            enabled: row.enabled,
            order: row.order.unwrap_or(DEFAULT_ORDER),
            lock_required: original.is_some_and(|o| o.lock_required),
            lock_enabled: original.is_some_and(|o| o.lock_enabled),
        };
        definition.enforce_locks();
        core.push(definition);
    }
    core
}

fn build_custom(posted: &[PostedCustomField], errors: &mut ValidationErrors) -> Vec<CustomFieldDefinition> {
    let mut enabled_keys = BTreeSet::new();
    let mut custom = Vec::with_capacity(posted.len());

    for row in posted {
        let key = Slug::from_title(
            row.key.as_deref().unwrap_or(DEFAULT_CUSTOM_KEY),
            DEFAULT_CUSTOM_KEY,
        );
        if row.enabled && !enabled_keys.insert(key.clone()) {
            errors.push_unique(format!("Custom field key \"{key}\" is used more than once."));
            continue;
        }

        custom.push(CustomFieldDefinition {
            enabled: row.enabled,
            order: row.order.unwrap_or(DEFAULT_ORDER),
            section: sanitize_text(row.section.as_deref().unwrap_or(BUILDER_CUSTOM_GROUP)),
            key,
            label: sanitize_text(row.label.as_deref().unwrap_or(DEFAULT_CUSTOM_LABEL)),
            field_type: row
                .field_type
                .as_deref()
                .map_or(CustomFieldType::Text, CustomFieldType::parse_or_text),
            options: row
                .options
                .as_deref()
                .map(sanitize_text)
                .filter(|o| !o.is_empty()),
            required: row.required,
        });
    }
    custom
}

fn warn_on_orphans(previous: &Schema, next: &Schema) {
    let next_sections: BTreeSet<&str> = next.sections.iter().map(|s| s.id.as_str()).collect();
    for section in &previous.sections {
        if !next_sections.contains(section.id.as_str()) {
            tracing::warn!(section = %section.id, "section id removed or renamed by builder save");
        }
    }
    for field in &next.core {
        if !next_sections.contains(field.section.as_str()) {
            tracing::warn!(
                field = %field.key,
                section = %field.section,
                "core field points at a section that does not exist"
            );
        }
    }

    let next_custom: BTreeSet<&str> = next.custom.iter().map(|f| f.key.as_str()).collect();
    for field in &previous.custom {
        if !next_custom.contains(field.key.as_str()) {
            tracing::warn!(
                key = %field.key,
                "custom field key removed or renamed; stored answers under it are orphaned"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntakeError;

    /// Builder post mirroring `schema`, as the builder page would submit it unchanged.
    fn echo(schema: &Schema) -> BuilderPayload {
        BuilderPayload {
            sections: schema
                .sections
                .iter()
                .map(|s| PostedSection {
                    id: s.id.to_string(),
                    title: Some(s.title.clone()),
                    enabled: s.enabled,
                    order: Some(s.order),
                })
                .collect(),
            core: schema
                .core
                .iter()
                .map(|f| PostedCoreField {
                    key: Some(f.key.to_string()),
                    field_type: Some(f.field_type.to_string()),
                    label: Some(f.label.clone()),
                    section: Some(f.section.to_string()),
                    options: f.options.clone(),
                    required: f.required,
                    enabled: f.enabled,
                    order: Some(f.order),
                })
                .collect(),
            custom: schema
                .custom
                .iter()
                .map(|f| PostedCustomField {
                    enabled: f.enabled,
                    order: Some(f.order),
                    section: Some(f.section.clone()),
                    key: Some(f.key.to_string()),
                    label: Some(f.label.clone()),
                    field_type: Some(f.field_type.to_string()),
                    options: f.options.clone(),
                    required: f.required,
                })
                .collect(),
        }
    }

    fn stored_seed() -> Schema {
        let seed = Schema::seed();
        Schema {
            sections: seed.sections(false),
            core: seed.core_fields(false),
            custom: seed.custom_fields(false),
        }
    }

    fn messages(err: IntakeError) -> Vec<String> {
        err.validation_messages().unwrap().to_vec()
    }

    #[test]
    fn unchanged_post_round_trips() {
        let previous = stored_seed();
        let saved = apply_builder(&echo(&previous), &previous).unwrap();
        assert_eq!(saved, previous);
    }

    #[test]
    fn rows_line_up_with_the_sorted_listing() {
        let raw = Schema::seed();
        let listed = stored_seed();
        let saved = apply_builder(&echo(&listed), &raw).unwrap();
        assert_eq!(saved.core, listed.core);
    }

    #[test]
    fn locks_override_posted_flags() {
        let previous = stored_seed();
        let mut post = echo(&previous);
        for row in &mut post.core {
            row.enabled = false;
            row.required = false;
        }

        let saved = apply_builder(&post, &previous).unwrap();
        for field in &saved.core {
            if field.lock_enabled {
                assert!(field.enabled, "{}", field.key);
            } else {
                assert!(!field.enabled, "{}", field.key);
            }
            if field.lock_required {
                assert!(field.required, "{}", field.key);
            }
        }
        assert!(saved.find_core("consent_privacy").unwrap().enabled);
    }

    #[test]
    fn posted_key_and_type_are_ignored_for_existing_rows() {
        let previous = stored_seed();
        let mut post = echo(&previous);
        post.core[0].key = Some("hacked".into());
        post.core[0].field_type = Some("signature".into());
        post.core[0].label = Some("  Renamed   label ".into());

        let saved = apply_builder(&post, &previous).unwrap();
        let original = &previous.core[0];
        let updated = saved.find_core(original.key.as_str()).unwrap();
        assert_eq!(updated.field_type, original.field_type);
        assert_eq!(updated.label, "Renamed label");
        assert!(saved.find_core("hacked").is_none());
    }

    #[test]
    fn extra_core_rows_fall_back_to_posted_key() {
        let previous = stored_seed();
        let mut post = echo(&previous);
        post.core.push(PostedCoreField {
            key: Some("Insurance_ID".into()),
            field_type: Some("text".into()),
            label: None,
            section: None,
            enabled: true,
            ..PostedCoreField::default()
        });

        let saved = apply_builder(&post, &previous).unwrap();
        let extra = saved.find_core("insurance_id").unwrap();
        assert_eq!(extra.label, "insurance_id");
        assert_eq!(extra.section, "patient");
        assert_eq!(extra.order, DEFAULT_ORDER);
        assert!(!extra.lock_enabled);
    }

    #[test]
    fn custom_rows_get_defaults() {
        let previous = stored_seed();
        let mut post = echo(&previous);
        post.custom.push(PostedCustomField {
            enabled: true,
            key: Some("What Brings You In?".into()),
            field_type: Some("file".into()),
            options: Some("  ".into()),
            ..PostedCustomField::default()
        });
        post.custom.push(PostedCustomField {
            enabled: false,
            ..PostedCustomField::default()
        });

        let saved = apply_builder(&post, &previous).unwrap();
        assert_eq!(saved.custom.len(), 2);

        let first = saved.custom.iter().find(|f| f.enabled).unwrap();
        assert_eq!(first.key, "what-brings-you-in");
        assert_eq!(first.field_type, CustomFieldType::Text);
        assert_eq!(first.section, "Your Group");
        assert_eq!(first.label, "Your question");
        assert_eq!(first.options, None);

        let second = saved.custom.iter().find(|f| !f.enabled).unwrap();
        assert_eq!(second.key, "custom_field");
    }

    #[test]
    fn invalid_posts_are_rejected_together() {
        let previous = stored_seed();
        let mut post = echo(&previous);
        post.sections[1].id = "!!!".into();
        post.sections[2].id = "patient".into();
        for _ in 0..2 {
            post.custom.push(PostedCustomField {
                enabled: true,
                key: Some("goal".into()),
                ..PostedCustomField::default()
            });
        }

        let err = apply_builder(&post, &previous).unwrap_err();
        assert_eq!(
            messages(err),
            [
                "Section 2 needs an id.",
                "Section id \"patient\" is used more than once.",
                "Custom field key \"goal\" is used more than once.",
            ]
        );
    }

    #[test]
    fn saved_collections_are_sorted() {
        let previous = stored_seed();
        let mut post = echo(&previous);
        post.sections.reverse();
        post.sections[0].order = Some(1);

        let saved = apply_builder(&post, &previous).unwrap();
        assert_eq!(saved.sections[0].id, "consent");
        for pair in saved.sections.windows(2) {
            assert!(pair[0].order <= pair[1].order);
        }
        for pair in saved.core.windows(2) {
            assert!((&pair[0].section, pair[0].order) <= (&pair[1].section, pair[1].order));
        }
    }
}
