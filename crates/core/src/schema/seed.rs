//! Install-time schema defaults.

use super::{CoreFieldDefinition, CoreFieldType, Schema, Section};
use intake_types::Slug;

const SECTIONS: [(&str, &str, bool, i64); 7] = [
    ("patient", "Patient Information", true, 10),
    ("medical", "Medical History & Screening", true, 20),
    ("access", "IV Access Preferences", true, 30),
    ("vitals", "Vitals (staff use)", false, 40),
    ("therapy", "IV Menu", true, 50),
    ("custom", "Additional Questions", true, 60),
    ("consent", "Consents & Signature", true, 70),
];

struct SeedField {
    key: &'static str,
    label: &'static str,
    section: &'static str,
    field_type: CoreFieldType,
    options: Option<&'static str>,
    required: bool,
    enabled: bool,
    order: i64,
    locked: bool,
}

const fn field(
    key: &'static str,
    label: &'static str,
    section: &'static str,
    field_type: CoreFieldType,
    order: i64,
) -> SeedField {
    SeedField {
        key,
        label,
        section,
        field_type,
        options: None,
        required: false,
        enabled: true,
        order,
        locked: false,
    }
}

impl SeedField {
    const fn options(self, options: &'static str) -> Self {
        SeedField {
            options: Some(options),
            ..self
        }
    }

    const fn disabled(self) -> Self {
        SeedField {
            enabled: false,
            ..self
        }
    }

    /// Required, and pinned enabled/required against builder edits.
    const fn locked(self) -> Self {
        SeedField {
            required: true,
            locked: true,
            ..self
        }
    }
}

use CoreFieldType::*;

const THERAPIES: &str = "Ultimate Hangover Cure,Mega Myers,Immunity Boost,Energy & Performance,\
Beauty / Glow,Gentlemen’s Vitality,Glowing Bride,Beach Body,NAD+,Other";

const ADDONS: &str = "B12,Zinc,Glutathione,Taurine,Magnesium,Anti-nausea per protocol,\
Anti-inflammatory per protocol";

const CORE_FIELDS: [SeedField; 45] = [
    // patient
    field("full_name", "Full Name", "patient", Text, 10).locked(),
    field("dob", "Date of Birth", "patient", Date, 20).locked(),
    field("sex_at_birth", "Sex at Birth", "patient", Select, 30)
        .options("Male,Female,Intersex,Prefer not to say"),
    field("pronouns", "Pronouns", "patient", Text, 40).disabled(),
    field("phone", "Mobile Phone", "patient", Tel, 50),
    field("sms_opt_in", "SMS updates opt-in", "patient", CheckboxOne, 60),
    field("email", "Email", "patient", Email, 70),
    field("email_hipaa_opt_in", "Email communications opt-in", "patient", CheckboxOne, 80),
    field("address1", "Address", "patient", Text, 90),
    field("city", "City", "patient", Text, 100),
    field("state", "State", "patient", Text, 110),
    field("zip", "ZIP", "patient", Text, 120),
    field("emergency_name", "Emergency Contact Name", "patient", Text, 130),
    field("emergency_relationship", "Emergency Relationship", "patient", Text, 140),
    field("emergency_phone", "Emergency Contact Phone", "patient", Tel, 150),
    // medical
    field("medical_flags", "Medical Conditions", "medical", MedicalFlags, 10),
    field("allergies", "Allergies", "medical", Textarea, 20),
    field("meds_rx", "Current prescription medications", "medical", Textarea, 30),
    field("meds_otc", "OTC & supplements", "medical", Textarea, 40),
    field("on_anticoagulants", "On blood thinners?", "medical", Select, 50).options("Yes,No,Unsure"),
    field("on_diuretics", "On diuretics?", "medical", Select, 55)
        .options("Yes,No,Unsure")
        .disabled(),
    field("status_nvd", "Nausea/vomiting/diarrhea in last 24 hrs?", "medical", Select, 60)
        .options("Yes,No"),
    field("status_alcohol", "Alcohol in last 24 hrs?", "medical", Select, 70)
        .options("Yes,No")
        .disabled(),
    field("last_oral_intake", "Last oral fluids / food", "medical", Textarea, 80),
    field("prior_iv_nad", "Prior IV hydration or NAD+ (response?)", "medical", Textarea, 90),
    // access
    field("access_preference", "Preferred arm", "access", Select, 10).options("Left,Right,No preference"),
    field("hard_stick", "“Hard stick” history", "access", Select, 20).options("Yes,No"),
    field("allow_numbing", "Okay to use topical numbing per protocol", "access", Select, 30)
        .options("Yes,No"),
    // vitals
    field("vital_bp", "BP", "vitals", Text, 10),
    field("vital_hr", "HR", "vitals", Number, 20),
    field("vital_temp_f", "Temp (°F)", "vitals", Number, 30),
    field("vital_o2", "O₂ Sat (%)", "vitals", Number, 40),
    // therapy
    field("therapy_selection", "Therapy selection", "therapy", Select, 10).options(THERAPIES),
    field("nad_dose", "NAD+ dose (if selected)", "therapy", Select, 20)
        .options("250 mg,500 mg,750 mg,1000 mg"),
    field("therapy_other", "If \"Other\", specify", "therapy", Text, 30),
    field("addons", "Add-ons", "therapy", CheckboxMulti, 40).options(ADDONS),
    field("addons_other", "Add-on (Other)", "therapy", Text, 50),
    // consent
    field("consent_treatment", "I agree to treatment consent", "consent", CheckboxOne, 10).locked(),
    field("consent_financial", "I agree to financial policy", "consent", CheckboxOne, 20).locked(),
    field("consent_privacy", "I acknowledge privacy policy", "consent", CheckboxOne, 30).locked(),
    field("consent_comms_email", "Email communications (optional)", "consent", CheckboxOne, 40),
    field("consent_comms_sms", "SMS communications (optional)", "consent", CheckboxOne, 50),
    field("consent_photo", "Photo/social consent (optional)", "consent", CheckboxOne, 60),
    field("signature_name", "Signature (type full name)", "consent", Text, 70).locked(),
    field("signature_draw", "E-Signature (draw)", "consent", Signature, 80).locked(),
];

impl Schema {
    /// The default schema written on first install: seven sections, the full core field
    /// catalogue and no custom fields.
    pub fn seed() -> Self {
        let sections = SECTIONS
            .iter()
            .map(|&(id, title, enabled, order)| Section {
                id: seed_slug(id),
                title: title.to_owned(),
                enabled,
                order,
            })
            .collect();

        let core = CORE_FIELDS
            .iter()
            .map(|f| CoreFieldDefinition {
                key: seed_slug(f.key),
                label: f.label.to_owned(),
                section: seed_slug(f.section),
                field_type: f.field_type,
                options: f.options.map(str::to_owned),
                required: f.required,
                enabled: f.enabled,
                order: f.order,
                lock_required: f.locked,
                lock_enabled: f.locked,
            })
            .collect();

        Self {
            sections,
            core,
            custom: Vec::new(),
        }
    }
}

// Seed keys are literal slugs, so `from_title` hands them back unchanged.
fn seed_slug(literal: &str) -> Slug {
    Slug::from_title(literal, literal)
}
