//! Built-in form catalog
//!
//! One [`FormTypeSpec`] per supported certification form: template file, slot
//! layout, host/facility constants, birth-year width and rendering quirks.
//! The catalog is built once from the configured [`HostProfile`] and validated
//! before the first roster is processed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::materialize::RenderOptions;
use crate::roster::YearWidth;
use crate::slots::{FieldScheme, PageLayout, SlotKey, SlotLayout};
use crate::{Error, Result};

/// Supported form types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Efa,
    BronzeMed,
    BronzeCross,
    BronzeStar,
    Sfa,
    AirwayManagement,
    LeadershipMastersheet,
}

impl FormKind {
    pub const ALL: [FormKind; 7] = [
        FormKind::Efa,
        FormKind::BronzeMed,
        FormKind::BronzeCross,
        FormKind::BronzeStar,
        FormKind::Sfa,
        FormKind::AirwayManagement,
        FormKind::LeadershipMastersheet,
    ];

    /// Key used by the upload form and the CLI
    pub fn key(&self) -> &'static str {
        match self {
            FormKind::Efa => "efa",
            FormKind::BronzeMed => "bronze_med",
            FormKind::BronzeCross => "bronze_cross",
            FormKind::BronzeStar => "bronze_star",
            FormKind::Sfa => "sfa",
            FormKind::AirwayManagement => "airway_management",
            FormKind::LeadershipMastersheet => "leadership_mastersheet",
        }
    }

    /// Label used in output file names
    pub fn label(&self) -> &'static str {
        match self {
            FormKind::Efa => "EFA",
            FormKind::BronzeMed => "BronzeMed",
            FormKind::BronzeCross => "BronzeCross",
            FormKind::BronzeStar => "BronzeStar",
            FormKind::Sfa => "SFA",
            FormKind::AirwayManagement => "AirwayManagement",
            FormKind::LeadershipMastersheet => "LeadershipMastersheet",
        }
    }

    /// Human-readable title for the upload page
    pub fn title(&self) -> &'static str {
        match self {
            FormKind::Efa => "Emergency First Aid",
            FormKind::BronzeMed => "Bronze Medallion",
            FormKind::BronzeCross => "Bronze Cross",
            FormKind::BronzeStar => "Bronze Star",
            FormKind::Sfa => "Standard First Aid",
            FormKind::AirwayManagement => "Airway Management",
            FormKind::LeadershipMastersheet => "Leadership Mastersheet",
        }
    }

    /// Template file name inside the template directory
    pub fn template_file(&self) -> &'static str {
        match self {
            FormKind::Efa => "95efa_on2014.pdf",
            FormKind::BronzeMed => "95tsbronzemedallion2020_fillable.pdf",
            FormKind::BronzeCross => "95tsbronzecross2020_fillable.pdf",
            FormKind::BronzeStar => "95tsbronzestar2020_fillable.pdf",
            FormKind::Sfa => "95on_sfa_test_sheet-20231121-fillable.pdf",
            FormKind::AirwayManagement => "95airwaymanagement2022-fillable.pdf",
            FormKind::LeadershipMastersheet => "leadershipmastersheet_on_20250219_fillable.pdf",
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FormKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        FormKind::ALL
            .into_iter()
            .find(|kind| kind.key() == key)
            .ok_or_else(|| Error::UnknownFormType(key.to_string()))
    }
}

/// Host organisation and facility printed on every form
///
/// Loaded from the `[host]` table of the TOML config; defaults to the
/// City of Markham aquatics desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostProfile {
    pub organization: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub area_code: String,
    /// Local number with dash, e.g. "470-3590"
    pub local_number: String,
    pub extension: String,
    pub facility_name: String,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            organization: "City of Markham".to_string(),
            address: "8600 McCowan Road".to_string(),
            city: "Markham".to_string(),
            province: "ON".to_string(),
            postal_code: "L3P 3M2".to_string(),
            area_code: "905".to_string(),
            local_number: "470-3590".to_string(),
            extension: "4342".to_string(),
            facility_name: "Centennial C.C.".to_string(),
        }
    }
}

impl HostProfile {
    fn with_extension(&self, number: String) -> String {
        if self.extension.is_empty() {
            number
        } else {
            format!("{} EXT {}", number, self.extension)
        }
    }

    /// "470-3590 EXT 4342"
    pub fn local_number_with_ext(&self) -> String {
        self.with_extension(self.local_number.clone())
    }

    /// "4703590 EXT 4342"
    pub fn compact_number_with_ext(&self) -> String {
        self.with_extension(self.local_number.replace('-', ""))
    }

    /// "9054703590 EXT 4342"
    pub fn full_number_with_ext(&self) -> String {
        self.with_extension(format!(
            "{}{}",
            self.area_code,
            self.local_number.replace('-', "")
        ))
    }

    /// "905-470-3590"
    pub fn dialable_number(&self) -> String {
        format!("{}-{}", self.area_code, self.local_number)
    }
}

/// Everything needed to fill one form type
#[derive(Debug, Clone)]
pub struct FormTypeSpec {
    pub kind: FormKind,
    pub layout: SlotLayout,
    /// Constant `(field, value)` pairs applied to every copy
    pub host_values: Vec<(String, String)>,
    pub year_width: YearWidth,
    pub render: RenderOptions,
}

impl FormTypeSpec {
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn template_file(&self) -> &'static str {
        self.kind.template_file()
    }

    /// Output file name for the 1-based batch `index`
    pub fn output_file_name(&self, index: usize) -> String {
        format!("{}_Batch_{}.pdf", self.label(), index)
    }

    /// Capacity of the first copy
    pub fn capacity(&self) -> usize {
        self.layout.first_capacity()
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate(self.label())?;
        if let Some((field, _)) = self.host_values.iter().find(|(f, _)| f.trim().is_empty()) {
            return Err(Error::Config(format!(
                "{}: empty host field name {:?}",
                self.label(),
                field
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> FormSummary {
        FormSummary {
            key: self.kind.key(),
            label: self.label(),
            title: self.kind.title(),
            template: self.template_file(),
            capacity: self.capacity(),
            year_width: self.year_width,
        }
    }
}

/// Serializable overview of one form type
#[derive(Debug, Clone, Serialize)]
pub struct FormSummary {
    pub key: &'static str,
    pub label: &'static str,
    pub title: &'static str,
    pub template: &'static str,
    pub capacity: usize,
    pub year_width: YearWidth,
}

/// All form types known to the service
#[derive(Debug, Clone)]
pub struct FormCatalog {
    forms: Vec<FormTypeSpec>,
}

impl FormCatalog {
    /// Build and validate the built-in catalog
    pub fn builtin(host: &HostProfile) -> Result<Self> {
        let catalog = Self {
            forms: FormKind::ALL
                .into_iter()
                .map(|kind| build_spec(kind, host))
                .collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Build a catalog from explicit specs (validated)
    pub fn from_specs(forms: Vec<FormTypeSpec>) -> Result<Self> {
        let catalog = Self { forms };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for spec in &self.forms {
            spec.validate()?;
        }
        tracing::debug!(forms = self.forms.len(), "Form catalog validated");
        Ok(())
    }

    pub fn get(&self, kind: FormKind) -> Option<&FormTypeSpec> {
        self.forms.iter().find(|spec| spec.kind == kind)
    }

    /// Look up a form by its key; unknown keys are a configuration error
    pub fn lookup(&self, key: &str) -> Result<&FormTypeSpec> {
        let kind: FormKind = key.parse()?;
        self.get(kind)
            .ok_or_else(|| Error::UnknownFormType(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormTypeSpec> {
        self.forms.iter()
    }
}

// ============================================================================
// Slot tables
// ============================================================================

const EFA_SCHEME: FieldScheme = FieldScheme {
    name: "Name {suffix}",
    street: "Address {suffix}",
    city: "City {suffix}",
    postal_code: "Postal {suffix}",
    email: "Email {suffix}",
    phone: "Phone {suffix}",
    birth_day: "Day {suffix}",
    birth_month: "Month {suffix}",
    birth_year: "Year {suffix}",
    clears: &[],
    ordinal: None,
};

const SFA_SCHEME: FieldScheme = FieldScheme {
    name: "NAME {suffix}",
    street: "Address {suffix}",
    city: "City {suffix}",
    postal_code: "Postal Code {suffix}",
    email: "Email {suffix}",
    phone: "Phone {suffix}",
    birth_day: "Day {suffix}",
    birth_month: "Month {suffix}",
    birth_year: "Year {suffix}",
    // Roster has no apartment column
    clears: &["Apt# {suffix}"],
    ordinal: None,
};

/// Medallion and star sheets share field names, differing only in keys
const DOB_SCHEME: FieldScheme = FieldScheme {
    name: "Name{suffix}",
    street: "Address{suffix}",
    city: "City{suffix}",
    postal_code: "Postal{suffix}",
    email: "Email{suffix}",
    phone: "Phone{suffix}",
    birth_day: "DOBD{suffix}",
    birth_month: "DOBM{suffix}",
    birth_year: "DOBY{suffix}",
    clears: &[],
    ordinal: None,
};

const BRONZE_CROSS_SCHEME: FieldScheme = FieldScheme {
    name: "{prefix}Name1{suffix}",
    street: "{prefix}Address1{suffix}",
    city: "{prefix}City1{suffix}",
    postal_code: "{prefix}Postal1{suffix}",
    email: "{prefix}Email1{suffix}",
    phone: "{prefix}Phone1{suffix}",
    birth_day: "{prefix}DOBD1{suffix}",
    birth_month: "{prefix}DOBM1{suffix}",
    birth_year: "{prefix}DOBY1{suffix}",
    clears: &[],
    ordinal: None,
};

const AIRWAY_SCHEME: FieldScheme = FieldScheme {
    name: "Candidate Name {suffix}",
    street: "Street {suffix}",
    city: "City {suffix}",
    postal_code: "Postal Code {suffix}",
    email: "Email {suffix}",
    phone: "Telephone {suffix}",
    birth_day: "DOB Day {suffix}",
    birth_month: "DOB Month {suffix}",
    birth_year: "DOB Year {suffix}",
    clears: &[],
    ordinal: None,
};

const LEADERSHIP_LEAD_SCHEME: FieldScheme = FieldScheme {
    name: "Name {suffix}",
    street: "Address {suffix}",
    city: "City {suffix}",
    postal_code: "Postal Code {suffix}",
    email: "Email {suffix}",
    phone: "Phone {suffix}",
    birth_day: "DOB Day {suffix}",
    birth_month: "DOB Month {suffix}",
    birth_year: "DOB Year {suffix}",
    clears: &[],
    ordinal: None,
};

/// Continuation page rows are numbered 4-9 whatever page they are on
const LEADERSHIP_CONTINUATION_SCHEME: FieldScheme = FieldScheme {
    name: "Name_{suffix}",
    street: "Address_{suffix}",
    city: "City_{suffix}",
    postal_code: "Postal Code_{suffix}",
    email: "Email_{suffix}",
    phone: "Phone_{suffix}",
    birth_day: "DOB Day_{suffix}",
    birth_month: "DOB Month_{suffix}",
    birth_year: "DOB Year_{suffix}",
    clears: &[],
    ordinal: Some("No_{suffix}"),
};

const NUMBERED_1_TO_10: [SlotKey; 10] = [
    SlotKey::suffix("1"),
    SlotKey::suffix("2"),
    SlotKey::suffix("3"),
    SlotKey::suffix("4"),
    SlotKey::suffix("5"),
    SlotKey::suffix("6"),
    SlotKey::suffix("7"),
    SlotKey::suffix("8"),
    SlotKey::suffix("9"),
    SlotKey::suffix("10"),
];

const BRONZE_MED_KEYS: [SlotKey; 13] = [
    // Page 1
    SlotKey::suffix("1.0"),
    SlotKey::suffix("1.1.0"),
    SlotKey::suffix("1.1.1.0"),
    SlotKey::suffix("1.1.1.1.0"),
    SlotKey::suffix("1.1.1.1.1.0"),
    SlotKey::suffix("1.1.1.1.1.1"),
    // Page 2
    SlotKey::suffix(".0.0"),
    SlotKey::suffix(".0.1.0"),
    SlotKey::suffix(".0.1.1.0"),
    SlotKey::suffix(".0.1.1.1.0"),
    SlotKey::suffix(".0.1.1.1.1.0"),
    SlotKey::suffix(".0.1.1.1.1.1.0"),
    SlotKey::suffix(".0.1.1.1.1.1.1"),
];

const BRONZE_CROSS_KEYS: [SlotKey; 13] = [
    // Page 1
    SlotKey::new("", ".0"),
    SlotKey::new("", ".1.0"),
    SlotKey::new("", ".1.1.0"),
    SlotKey::new("", ".1.1.1.0"),
    SlotKey::new("", ".1.1.1.1.0"),
    SlotKey::new("", ".1.1.1.1.1"),
    // Page 2
    SlotKey::new("7", ".0"),
    SlotKey::new("8", ".1.0"),
    SlotKey::new("9", ".1.1.0"),
    SlotKey::new("10", ".1.1.1.0"),
    SlotKey::new("11", ".1.1.1.1.0"),
    SlotKey::new("12", ".1.1.1.1.1"),
    SlotKey::new("13", ".1.1.1.1.1"),
];

/// Candidate address targets for bronze cross slot 9, whose real field name
/// differs between template revisions
const BRONZE_CROSS_SLOT9_ADDRESS: [&str; 10] = [
    "Address1.1.1.0X",
    "Address1.1.1",
    "Address1.1.1.0",
    "Address1.1.0",
    "Address1.0",
    "Address1",
    "Address1.1",
    "Text2",
    "Text16",
    "Text17",
];

const BRONZE_STAR_KEYS: [SlotKey; 13] = [
    // Page 1
    SlotKey::suffix("1"),
    SlotKey::suffix("2"),
    SlotKey::suffix("3"),
    SlotKey::suffix("4"),
    SlotKey::suffix("5"),
    SlotKey::suffix("6"),
    // Page 2
    SlotKey::suffix(".0"),
    SlotKey::suffix(".1.0"),
    SlotKey::suffix(".1.1.0"),
    SlotKey::suffix(".1.1.1.0"),
    SlotKey::suffix(".1.1.1.1.0"),
    SlotKey::suffix(".1.1.1.1.1.0"),
    SlotKey::suffix(".1.1.1.1.1.1"),
];

const LEADERSHIP_CONTINUATION_KEYS: [SlotKey; 6] = [
    SlotKey::suffix("4"),
    SlotKey::suffix("5"),
    SlotKey::suffix("6"),
    SlotKey::suffix("7"),
    SlotKey::suffix("8"),
    SlotKey::suffix("9"),
];

fn pairs<const N: usize>(entries: [(&str, String); N]) -> Vec<(String, String)> {
    entries
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}

/// Invoicing block shared by the bronze award sheets
fn bronze_host_values(host: &HostProfile) -> Vec<(String, String)> {
    pairs([
        ("Text19", host.organization.clone()),
        ("Text20", host.area_code.clone()),
        ("Text21", host.compact_number_with_ext()),
        ("Text22", host.address.clone()),
        ("Text23", host.city.clone()),
        ("Text24", host.province.clone()),
        ("Text25", host.postal_code.clone()),
        ("Text29", host.facility_name.clone()),
    ])
}

fn build_spec(kind: FormKind, host: &HostProfile) -> FormTypeSpec {
    match kind {
        FormKind::Efa => FormTypeSpec {
            kind,
            layout: SlotLayout::Uniform(
                PageLayout::new(10, EFA_SCHEME.slots(&NUMBERED_1_TO_10))
                    .adjust(10, |slot| slot.with_name_field("10")),
            ),
            host_values: pairs([
                ("Host Name", host.organization.clone()),
                ("Host Address", host.address.clone()),
                ("Host City", host.city.clone()),
                ("Host Province", host.province.clone()),
                ("Host Postal Code", host.postal_code.clone()),
                ("Host Area Code", host.area_code.clone()),
                ("Host Number", host.local_number_with_ext()),
                ("Facility Name", host.facility_name.clone()),
                ("Facility Area Code", host.area_code.clone()),
                ("Facility Number", host.local_number_with_ext()),
                // Unsplit phone fields present on older revisions
                ("Host Phone", host.dialable_number()),
                ("Facility Phone", host.dialable_number()),
                ("Telephone", host.dialable_number()),
                ("Phone", host.dialable_number()),
            ]),
            year_width: YearWidth::TwoDigit,
            render: RenderOptions::default(),
        },
        FormKind::BronzeMed => FormTypeSpec {
            kind,
            layout: SlotLayout::Uniform(PageLayout::new(13, DOB_SCHEME.slots(&BRONZE_MED_KEYS))),
            host_values: bronze_host_values(host),
            year_width: YearWidth::TwoDigit,
            render: RenderOptions::default(),
        },
        FormKind::BronzeCross => FormTypeSpec {
            kind,
            layout: SlotLayout::Uniform(
                PageLayout::new(13, BRONZE_CROSS_SCHEME.slots(&BRONZE_CROSS_KEYS))
                    .adjust(9, |slot| slot.with_address_fan_out(BRONZE_CROSS_SLOT9_ADDRESS))
                    .adjust(10, |slot| slot.with_name_field("10")),
            ),
            host_values: bronze_host_values(host),
            year_width: YearWidth::TwoDigit,
            render: RenderOptions::default(),
        },
        FormKind::BronzeStar => FormTypeSpec {
            kind,
            layout: SlotLayout::Uniform(PageLayout::new(13, DOB_SCHEME.slots(&BRONZE_STAR_KEYS))),
            host_values: bronze_host_values(host),
            year_width: YearWidth::TwoDigit,
            render: RenderOptions::default(),
        },
        FormKind::Sfa => FormTypeSpec {
            kind,
            layout: SlotLayout::Uniform(PageLayout::new(10, SFA_SCHEME.slots(&NUMBERED_1_TO_10))),
            host_values: pairs([
                ("Host Name", host.organization.clone()),
                ("Host Phone", host.full_number_with_ext()),
                ("Host Address", host.address.clone()),
                ("Host City", host.city.clone()),
                ("Host Province", host.province.clone()),
                ("Host Postal Code", host.postal_code.clone()),
                ("Facility Name", host.facility_name.clone()),
            ]),
            year_width: YearWidth::TwoDigit,
            render: RenderOptions::default(),
        },
        FormKind::AirwayManagement => FormTypeSpec {
            kind,
            layout: SlotLayout::Uniform(PageLayout::new(
                10,
                AIRWAY_SCHEME.slots(&NUMBERED_1_TO_10),
            )),
            host_values: pairs([
                ("Host Name", host.organization.clone()),
                ("Host Area Code", host.area_code.clone()),
                ("Host Phone", host.local_number_with_ext()),
                ("Host Address", host.address.clone()),
                ("Host City", host.city.clone()),
                ("Host Province", host.province.clone()),
                ("Host Postal Code", host.postal_code.clone()),
                ("Facility Name", host.facility_name.clone()),
            ]),
            year_width: YearWidth::Full,
            render: RenderOptions {
                need_appearances: true,
                preserve_optional_content: true,
            },
        },
        FormKind::LeadershipMastersheet => FormTypeSpec {
            kind,
            layout: SlotLayout::LeadAndContinuation {
                lead: PageLayout::new(9, LEADERSHIP_LEAD_SCHEME.slots(&NUMBERED_1_TO_10[..9]))
                    .on_pages(vec![1]),
                continuation: PageLayout::new(
                    6,
                    LEADERSHIP_CONTINUATION_SCHEME.slots(&LEADERSHIP_CONTINUATION_KEYS),
                )
                .on_pages(vec![2]),
            },
            host_values: pairs([
                ("Host Name", host.organization.clone()),
                ("Host Phone", host.full_number_with_ext()),
                ("Host Address", host.address.clone()),
                ("Host City", host.city.clone()),
                ("Host Province", host.province.clone()),
                ("Host Postal Code", host.postal_code.clone()),
                ("Facility Name", host.facility_name.clone()),
            ]),
            year_width: YearWidth::Full,
            render: RenderOptions {
                need_appearances: true,
                preserve_optional_content: true,
            },
        },
    }
}
