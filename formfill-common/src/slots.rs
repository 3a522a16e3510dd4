//! Slot tables
//!
//! A slot is one numbered candidate position on a form template. Each slot
//! resolves the logical attendee attributes to the concrete AcroForm field
//! names that receive them. Slot tables are declared as data (a naming scheme
//! plus a list of per-slot keys and overrides) and validated once at startup.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::roster::AttendeeRecord;
use crate::{Error, Result};

/// Logical attendee attribute written into a slot
///
/// Declaration order is the order attributes are written within one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Name,
    Street,
    City,
    PostalCode,
    Email,
    Phone,
    BirthDay,
    BirthMonth,
    BirthYear,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Name,
        Attribute::Street,
        Attribute::City,
        Attribute::PostalCode,
        Attribute::Email,
        Attribute::Phone,
        Attribute::BirthDay,
        Attribute::BirthMonth,
        Attribute::BirthYear,
    ];

    /// The record's value for this attribute
    pub fn value<'a>(&self, record: &'a AttendeeRecord) -> &'a str {
        match self {
            Attribute::Name => &record.full_name,
            Attribute::Street => &record.street,
            Attribute::City => &record.city,
            Attribute::PostalCode => &record.postal_code,
            Attribute::Email => &record.email,
            Attribute::Phone => &record.phone,
            Attribute::BirthDay => &record.birth_day,
            Attribute::BirthMonth => &record.birth_month,
            Attribute::BirthYear => &record.birth_year,
        }
    }
}

/// One candidate position on a form page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDefinition {
    /// 1-based position within its page layout
    pub ordinal: usize,
    targets: BTreeMap<Attribute, Vec<String>>,
    address_fan_out: bool,
    /// Fields blanked whenever the slot is filled
    pub clears: Vec<String>,
    /// Constant `(field, value)` pairs written whenever the slot is filled
    pub literals: Vec<(String, String)>,
    /// Field that receives the global candidate ordinal
    pub ordinal_field: Option<String>,
}

impl SlotDefinition {
    /// Target field names for `attribute`, in write order
    pub fn targets(&self, attribute: Attribute) -> &[String] {
        self.targets
            .get(&attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the street address is fanned out to several candidate fields
    pub fn has_address_fan_out(&self) -> bool {
        self.address_fan_out
    }

    /// Write the name to `field` instead of the scheme's name field
    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.targets.insert(Attribute::Name, vec![field.into()]);
        self
    }

    /// Write the street address to every field in `fields`
    ///
    /// Replaces the scheme's address target.
    pub fn with_address_fan_out<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.insert(
            Attribute::Street,
            fields.into_iter().map(Into::into).collect(),
        );
        self.address_fan_out = true;
        self
    }

    /// Always write `value` to `field` when this slot is filled
    pub fn with_literal(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.literals.push((field.into(), value.into()));
        self
    }

    /// Every field name this slot can write, in write order
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.targets
            .values()
            .flatten()
            .map(String::as_str)
            .chain(self.clears.iter().map(String::as_str))
            .chain(self.literals.iter().map(|(f, _)| f.as_str()))
            .chain(self.ordinal_field.as_deref())
    }
}

/// Key substituted into a [`FieldScheme`] to produce one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotKey {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl SlotKey {
    pub const fn suffix(suffix: &'static str) -> Self {
        Self { prefix: "", suffix }
    }

    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }
}

/// Field-name templates shared by all slots of one page
///
/// `{prefix}` and `{suffix}` are replaced by the slot's [`SlotKey`].
#[derive(Debug, Clone, Copy)]
pub struct FieldScheme {
    pub name: &'static str,
    pub street: &'static str,
    pub city: &'static str,
    pub postal_code: &'static str,
    pub email: &'static str,
    pub phone: &'static str,
    pub birth_day: &'static str,
    pub birth_month: &'static str,
    pub birth_year: &'static str,
    pub clears: &'static [&'static str],
    pub ordinal: Option<&'static str>,
}

impl FieldScheme {
    fn template(&self, attribute: Attribute) -> &'static str {
        match attribute {
            Attribute::Name => self.name,
            Attribute::Street => self.street,
            Attribute::City => self.city,
            Attribute::PostalCode => self.postal_code,
            Attribute::Email => self.email,
            Attribute::Phone => self.phone,
            Attribute::BirthDay => self.birth_day,
            Attribute::BirthMonth => self.birth_month,
            Attribute::BirthYear => self.birth_year,
        }
    }

    /// Instantiate the scheme for one slot
    pub fn slot(&self, ordinal: usize, key: SlotKey) -> SlotDefinition {
        let render = |template: &str| {
            template
                .replace("{prefix}", key.prefix)
                .replace("{suffix}", key.suffix)
        };

        SlotDefinition {
            ordinal,
            targets: Attribute::ALL
                .iter()
                .map(|&attr| (attr, vec![render(self.template(attr))]))
                .collect(),
            address_fan_out: false,
            clears: self.clears.iter().map(|t| render(*t)).collect(),
            literals: Vec::new(),
            ordinal_field: self.ordinal.map(render),
        }
    }

    /// Instantiate the scheme for a run of keys, ordinals starting at 1
    pub fn slots(&self, keys: &[SlotKey]) -> Vec<SlotDefinition> {
        keys.iter()
            .enumerate()
            .map(|(idx, key)| self.slot(idx + 1, *key))
            .collect()
    }
}

/// Slots of one physical page, plus the template pages it is printed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    /// Declared number of candidate positions on the page
    pub capacity: usize,
    pub slots: Vec<SlotDefinition>,
    /// 1-based template pages kept in the output; `None` keeps every page
    pub pages: Option<Vec<u32>>,
}

impl PageLayout {
    pub fn new(capacity: usize, slots: Vec<SlotDefinition>) -> Self {
        Self {
            capacity,
            slots,
            pages: None,
        }
    }

    pub fn on_pages(mut self, pages: Vec<u32>) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Replace the slot at `ordinal` with `f(slot)`
    pub fn adjust(mut self, ordinal: usize, f: impl FnOnce(SlotDefinition) -> SlotDefinition) -> Self {
        if let Some(idx) = self.slots.iter().position(|s| s.ordinal == ordinal) {
            let slot = self.slots.remove(idx);
            self.slots.insert(idx, f(slot));
        }
        self
    }

    /// Check ordinals, capacity and field names
    pub fn validate(&self, context: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config(format!("{context}: capacity must be positive")));
        }
        if self.slots.len() != self.capacity {
            return Err(Error::Config(format!(
                "{context}: {} slots declared for capacity {}",
                self.slots.len(),
                self.capacity
            )));
        }
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.ordinal != idx + 1 {
                return Err(Error::Config(format!(
                    "{context}: slot at position {} has ordinal {} (ordinals must run 1..={})",
                    idx + 1,
                    slot.ordinal,
                    self.capacity
                )));
            }
            for attribute in Attribute::ALL {
                if slot.targets(attribute).is_empty() {
                    return Err(Error::Config(format!(
                        "{context}: slot {} has no target for {:?}",
                        slot.ordinal, attribute
                    )));
                }
            }
            if slot.all_fields().any(|f| f.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "{context}: slot {} has an empty field name",
                    slot.ordinal
                )));
            }
        }
        if let Some(pages) = &self.pages {
            if pages.is_empty() || pages.contains(&0) {
                return Err(Error::Config(format!(
                    "{context}: page list must contain 1-based page numbers"
                )));
            }
        }
        Ok(())
    }
}

/// How candidates are distributed over successive template copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotLayout {
    /// Every copy uses the same page layout
    Uniform(PageLayout),
    /// The first copy uses `lead`; every later copy uses `continuation`
    LeadAndContinuation {
        lead: PageLayout,
        continuation: PageLayout,
    },
}

impl SlotLayout {
    /// Capacity of the first output copy
    pub fn first_capacity(&self) -> usize {
        match self {
            SlotLayout::Uniform(page) => page.capacity,
            SlotLayout::LeadAndContinuation { lead, .. } => lead.capacity,
        }
    }

    /// All page layouts, lead first
    pub fn pages(&self) -> Vec<&PageLayout> {
        match self {
            SlotLayout::Uniform(page) => vec![page],
            SlotLayout::LeadAndContinuation { lead, continuation } => vec![lead, continuation],
        }
    }

    pub fn validate(&self, context: &str) -> Result<()> {
        match self {
            SlotLayout::Uniform(page) => page.validate(context),
            SlotLayout::LeadAndContinuation { lead, continuation } => {
                lead.validate(&format!("{context} (lead page)"))?;
                continuation.validate(&format!("{context} (continuation page)"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEME: FieldScheme = FieldScheme {
        name: "{prefix}Name{suffix}",
        street: "{prefix}Address{suffix}",
        city: "{prefix}City{suffix}",
        postal_code: "{prefix}Postal{suffix}",
        email: "{prefix}Email{suffix}",
        phone: "{prefix}Phone{suffix}",
        birth_day: "{prefix}DOBD{suffix}",
        birth_month: "{prefix}DOBM{suffix}",
        birth_year: "{prefix}DOBY{suffix}",
        clears: &["Apt{suffix}"],
        ordinal: None,
    };

    #[test]
    fn test_scheme_renders_prefix_and_suffix() {
        let slot = SCHEME.slot(3, SlotKey::new("9", "1.1.0"));
        assert_eq!(slot.ordinal, 3);
        assert_eq!(slot.targets(Attribute::Name), ["9Name1.1.0"]);
        assert_eq!(slot.targets(Attribute::BirthYear), ["9DOBY1.1.0"]);
        assert_eq!(slot.clears, vec!["Apt1.1.0".to_string()]);
        assert!(!slot.has_address_fan_out());
    }

    #[test]
    fn test_overrides_replace_targets() {
        let slot = SCHEME
            .slot(1, SlotKey::suffix(" 10"))
            .with_name_field("10")
            .with_address_fan_out(["A", "B", "C"])
            .with_literal("Flag", "X");
        assert_eq!(slot.targets(Attribute::Name), ["10"]);
        assert_eq!(slot.targets(Attribute::Street), ["A", "B", "C"]);
        assert!(slot.has_address_fan_out());
        assert!(slot.all_fields().any(|f| f == "Flag"));
    }

    #[test]
    fn test_validate_accepts_contiguous_slots() {
        let keys = [SlotKey::suffix("1"), SlotKey::suffix("2")];
        let page = PageLayout::new(2, SCHEME.slots(&keys));
        assert!(page.validate("test").is_ok());
    }

    #[test]
    fn test_validate_rejects_capacity_mismatch() {
        let keys = [SlotKey::suffix("1"), SlotKey::suffix("2")];
        let page = PageLayout::new(3, SCHEME.slots(&keys));
        assert!(matches!(page.validate("test"), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_gap_in_ordinals() {
        let mut slots = SCHEME.slots(&[SlotKey::suffix("1"), SlotKey::suffix("2")]);
        slots[1].ordinal = 3;
        let page = PageLayout::new(2, slots);
        let err = page.validate("test").unwrap_err();
        assert!(err.to_string().contains("ordinal 3"));
    }

    #[test]
    fn test_validate_rejects_empty_fan_out() {
        let page = PageLayout::new(1, SCHEME.slots(&[SlotKey::suffix("1")]))
            .adjust(1, |s| s.with_address_fan_out(Vec::<String>::new()));
        assert!(page.validate("test").is_err());
    }
}
