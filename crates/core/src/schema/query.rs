//! Read-side helpers over a loaded [`Schema`].
//!
//! Every listing uses a stable sort, so rows with equal keys keep their stored order.
//! Core and custom fields sort by `(section, order)` where `section` is compared as a plain
//! string. Cross-section ordering of fields is therefore alphabetical by section id rather
//! than by section display order; renderers walk sections first, so this only shows in flat
//! listings.

use super::{CoreFieldDefinition, CustomFieldDefinition, Schema, Section};
use crate::constants::DEFAULT_CUSTOM_GROUP;

/// Enabled custom fields sharing one display group label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomGroup {
    pub title: String,
    pub fields: Vec<CustomFieldDefinition>,
}

impl Schema {
    /// Sections sorted by `order`, optionally only the enabled ones.
    pub fn sections(&self, only_enabled: bool) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .sections
            .iter()
            .filter(|s| !only_enabled || s.enabled)
            .cloned()
            .collect();
        sort_sections(&mut sections);
        sections
    }

    /// Core fields sorted by `(section, order)`, optionally only the enabled ones.
    pub fn core_fields(&self, only_enabled: bool) -> Vec<CoreFieldDefinition> {
        let mut fields: Vec<CoreFieldDefinition> = self
            .core
            .iter()
            .filter(|f| !only_enabled || f.enabled)
            .cloned()
            .collect();
        sort_core(&mut fields);
        fields
    }

    /// Custom fields sorted by `(group label, order)`, optionally only the enabled ones.
    pub fn custom_fields(&self, only_enabled: bool) -> Vec<CustomFieldDefinition> {
        let mut fields: Vec<CustomFieldDefinition> = self
            .custom
            .iter()
            .filter(|f| !only_enabled || f.enabled)
            .cloned()
            .collect();
        sort_custom(&mut fields);
        fields
    }

    /// Enabled custom fields bucketed by group label.
    ///
    /// Buckets appear in the order their label is first met while scanning the sorted
    /// enabled list; each bucket is sorted by `order`. A blank label is shown as
    /// "Additional Questions".
    pub fn group_custom_by_section(&self) -> Vec<CustomGroup> {
        let mut groups: Vec<CustomGroup> = Vec::new();

        for field in self.custom_fields(true) {
            let title = if field.section.trim().is_empty() {
                DEFAULT_CUSTOM_GROUP.to_owned()
            } else {
                field.section.clone()
            };

            match groups.iter_mut().find(|g| g.title == title) {
                Some(group) => group.fields.push(field),
                None => groups.push(CustomGroup {
                    title,
                    fields: vec![field],
                }),
            }
        }

        for group in &mut groups {
            group.fields.sort_by_key(|f| f.order);
        }
        groups
    }
}

pub(crate) fn sort_sections(sections: &mut [Section]) {
    sections.sort_by_key(|s| s.order);
}

pub(crate) fn sort_core(fields: &mut [CoreFieldDefinition]) {
    fields.sort_by(|a, b| (&a.section, a.order).cmp(&(&b.section, b.order)));
}

pub(crate) fn sort_custom(fields: &mut [CustomFieldDefinition]) {
    fields.sort_by(|a, b| (&a.section, a.order).cmp(&(&b.section, b.order)));
}
