//! Field mapping
//!
//! Turns one batch into the flat `field name → value` mapping applied to a
//! template copy. Host/facility constants are written first and candidate
//! data second, slot by slot in ascending ordinal order, so candidate data
//! wins every collision and later slots win over earlier ones.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::batch::Batch;
use crate::catalog::FormTypeSpec;
use crate::slots::{Attribute, SlotDefinition};
use crate::roster::AttendeeRecord;

/// Field name → value, last write wins, iterated in sorted key order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMapping {
    values: BTreeMap<String, String>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`, replacing any earlier value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Build the mapping for one batch of `spec`
///
/// Records beyond the page's slot count are dropped; slots without a record
/// are left out of the mapping entirely.
pub fn build_field_mapping(spec: &FormTypeSpec, batch: &Batch<'_>) -> FieldMapping {
    let mut mapping = FieldMapping::new();

    for (field, value) in &spec.host_values {
        mapping.set(field.as_str(), value.as_str());
    }

    let page = spec.layout.page(batch.page);
    if batch.len() > page.slots.len() {
        tracing::warn!(
            form = spec.label(),
            batch = batch.index,
            records = batch.len(),
            slots = page.slots.len(),
            "Batch exceeds slot count; extra records dropped"
        );
    }

    for (offset, (record, slot)) in batch.records.iter().zip(&page.slots).enumerate() {
        apply_slot(&mut mapping, slot, record, batch.first_ordinal + offset);
    }

    mapping
}

fn apply_slot(
    mapping: &mut FieldMapping,
    slot: &SlotDefinition,
    record: &AttendeeRecord,
    global_ordinal: usize,
) {
    for attribute in Attribute::ALL {
        let value = attribute.value(record);
        for target in slot.targets(attribute) {
            mapping.set(target.as_str(), value);
        }
    }
    for field in &slot.clears {
        mapping.set(field.as_str(), "");
    }
    for (field, value) in &slot.literals {
        mapping.set(field.as_str(), value.as_str());
    }
    if let Some(field) = &slot.ordinal_field {
        mapping.set(field.as_str(), global_ordinal.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{plan_batches, plan_layout, PageKind};
    use crate::catalog::{FormCatalog, FormKind, HostProfile};
    use crate::materialize::RenderOptions;
    use crate::roster::YearWidth;
    use crate::slots::{FieldScheme, PageLayout, SlotKey, SlotLayout};

    fn catalog() -> FormCatalog {
        FormCatalog::builtin(&HostProfile::default()).unwrap()
    }

    fn record(n: usize) -> AttendeeRecord {
        AttendeeRecord {
            full_name: format!("Candidate {n}"),
            street: format!("{n} Main St"),
            city: "Markham".into(),
            postal_code: "L3P 3M2".into(),
            email: format!("c{n}@example.com"),
            phone: "905-555-0100".into(),
            birth_day: "03".into(),
            birth_month: "04".into(),
            birth_year: "20".into(),
        }
    }

    fn records(n: usize) -> Vec<AttendeeRecord> {
        (1..=n).map(record).collect()
    }

    #[test]
    fn test_efa_batch_mapping() {
        let catalog = catalog();
        let spec = catalog.get(FormKind::Efa).unwrap();
        let recs = records(10);
        let batch = plan_batches(&recs, spec.capacity()).next().unwrap();
        let mapping = build_field_mapping(spec, &batch);

        assert_eq!(mapping.get("Host Name"), Some("City of Markham"));
        assert_eq!(mapping.get("Host Number"), Some("470-3590 EXT 4342"));
        assert_eq!(mapping.get("Name 1"), Some("Candidate 1"));
        assert_eq!(mapping.get("Address 3"), Some("3 Main St"));
        assert_eq!(mapping.get("Year 3"), Some("20"));
        // Slot 10's name lives in a field literally named "10"
        assert_eq!(mapping.get("10"), Some("Candidate 10"));
        assert!(!mapping.contains("Name 10"));
        assert_eq!(mapping.get("Email 10"), Some("c10@example.com"));
    }

    #[test]
    fn test_unfilled_slots_are_omitted() {
        let catalog = catalog();
        let spec = catalog.get(FormKind::Sfa).unwrap();
        let recs = records(3);
        let batch = plan_batches(&recs, spec.capacity()).next().unwrap();
        let mapping = build_field_mapping(spec, &batch);

        assert_eq!(mapping.get("NAME 3"), Some("Candidate 3"));
        assert_eq!(mapping.get("Apt# 3"), Some(""));
        assert!(!mapping.contains("NAME 4"));
        assert!(!mapping.contains("Apt# 4"));
        assert_eq!(mapping.get("Host Phone"), Some("9054703590 EXT 4342"));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let catalog = catalog();
        let spec = catalog.get(FormKind::BronzeCross).unwrap();
        let recs = records(13);
        let batch = plan_batches(&recs, spec.capacity()).next().unwrap();

        let first = build_field_mapping(spec, &batch);
        let second = build_field_mapping(spec, &batch);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_address_fan_out_writes_every_target() {
        let catalog = catalog();
        let spec = catalog.get(FormKind::BronzeCross).unwrap();
        let recs = records(9);
        let batch = plan_batches(&recs, spec.capacity()).next().unwrap();
        let mapping = build_field_mapping(spec, &batch);

        let slot = &spec.layout.pages()[0].slots[8];
        let targets = slot.targets(Attribute::Street);
        assert_eq!(targets.len(), 10);
        for target in targets {
            assert_eq!(mapping.get(target), Some("9 Main St"), "target {target}");
        }
        // Slot 9's default address target is replaced, not added to
        assert!(!mapping.contains("9Address1.1.1.0"));
    }

    #[test]
    fn test_fan_out_collision_later_slot_wins() {
        // Slot 9's fan-out includes "Address1.1.1.0", which is also slot 3's
        // address field; slot 9 is written later and wins.
        let catalog = catalog();
        let spec = catalog.get(FormKind::BronzeCross).unwrap();
        let recs = records(9);
        let batch = plan_batches(&recs, spec.capacity()).next().unwrap();
        let mapping = build_field_mapping(spec, &batch);
        assert_eq!(mapping.get("Address1.1.1.0"), Some("9 Main St"));

        let recs = records(3);
        let batch = plan_batches(&recs, spec.capacity()).next().unwrap();
        let mapping = build_field_mapping(spec, &batch);
        assert_eq!(mapping.get("Address1.1.1.0"), Some("3 Main St"));
    }

    #[test]
    fn test_candidate_wins_over_host_constant() {
        const SCHEME: FieldScheme = FieldScheme {
            name: "Name {suffix}",
            street: "Address {suffix}",
            city: "City {suffix}",
            postal_code: "Postal {suffix}",
            email: "Email {suffix}",
            // Collides with the host phone field below
            phone: "Phone",
            birth_day: "Day {suffix}",
            birth_month: "Month {suffix}",
            birth_year: "Year {suffix}",
            clears: &[],
            ordinal: None,
        };
        let spec = FormTypeSpec {
            kind: FormKind::Efa,
            layout: SlotLayout::Uniform(PageLayout::new(1, SCHEME.slots(&[SlotKey::suffix("1")]))),
            host_values: vec![
                ("Phone".to_string(), "905-470-3590".to_string()),
                ("Host Name".to_string(), "Host".to_string()),
            ],
            year_width: YearWidth::Full,
            render: RenderOptions::default(),
        };
        let recs = records(1);
        let batch = plan_batches(&recs, 1).next().unwrap();
        let mapping = build_field_mapping(&spec, &batch);

        assert_eq!(mapping.get("Phone"), Some("905-555-0100"));
        assert_eq!(mapping.get("Host Name"), Some("Host"));
    }

    #[test]
    fn test_extra_records_are_dropped() {
        let catalog = catalog();
        let spec = catalog.get(FormKind::Efa).unwrap();
        let recs = records(12);
        let oversized = Batch {
            index: 1,
            records: &recs,
            first_ordinal: 1,
            page: PageKind::Primary,
        };
        let mapping = build_field_mapping(spec, &oversized);
        let names: Vec<&str> = mapping
            .iter()
            .filter(|(_, v)| v.starts_with("Candidate"))
            .map(|(_, v)| v)
            .collect();
        assert_eq!(names.len(), 10);
        assert!(!names.contains(&"Candidate 11"));
    }

    #[test]
    fn test_leadership_continuation_uses_physical_rows_and_global_number() {
        let catalog = catalog();
        let spec = catalog.get(FormKind::LeadershipMastersheet).unwrap();
        let recs = records(22);
        let batches: Vec<Batch> = plan_layout(&recs, &spec.layout).collect();
        assert_eq!(batches.len(), 4);

        // Lead page: ids follow visible position, no running number written
        let lead = build_field_mapping(spec, &batches[0]);
        assert_eq!(lead.get("Name 9"), Some("Candidate 9"));
        assert!(!lead.iter().any(|(k, _)| k.starts_with("No_")));

        // Candidate 13 sits on the second output page
        let second = build_field_mapping(spec, &batches[1]);
        let (field, _) = second
            .iter()
            .find(|(k, v)| k.starts_with("Name_") && *v == "Candidate 13")
            .unwrap();
        let physical: usize = field.trim_start_matches("Name_").parse().unwrap();
        assert!((4..=9).contains(&physical));
        assert_eq!(second.get(&format!("No_{physical}")), Some("13"));

        // The next continuation page reuses the same physical ids
        let third = build_field_mapping(spec, &batches[2]);
        assert_eq!(third.get("Name_4"), Some("Candidate 16"));
        assert_eq!(third.get("No_4"), Some("16"));
        assert_eq!(third.get("No_9"), Some("21"));

        let last = build_field_mapping(spec, &batches[3]);
        assert_eq!(last.get("No_4"), Some("22"));
        assert!(!last.contains("No_5"));
    }
}
