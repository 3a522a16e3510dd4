//! Batch planning
//!
//! Splits the normalized roster into contiguous batches, one per filled copy
//! of the template. Batches borrow slices of the record list and carry the
//! global ordinal of their first candidate, so continuation pages can print
//! the running candidate number.

use crate::roster::AttendeeRecord;
use crate::slots::{PageLayout, SlotLayout};

/// Which page layout a batch is laid onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// First copy, or every copy of a uniform layout
    Primary,
    /// Second and later copies of a lead/continuation layout
    Continuation,
}

/// One filled copy's worth of candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    /// 1-based batch number, used in the output file name
    pub index: usize,
    pub records: &'a [AttendeeRecord],
    /// Global 1-based candidate ordinal of `records[0]`
    pub first_ordinal: usize,
    pub page: PageKind,
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lazy batch sequence over a record slice
///
/// Cloning the iterator restarts planning from the same position.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    records: &'a [AttendeeRecord],
    offset: usize,
    next_index: usize,
    lead_capacity: usize,
    continuation_capacity: usize,
    continuation_kind: PageKind,
}

impl<'a> Batches<'a> {
    fn capacity_for(&self, index: usize) -> usize {
        if index == 1 {
            self.lead_capacity
        } else {
            self.continuation_capacity
        }
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let capacity = self.capacity_for(self.next_index);
        if capacity == 0 || self.offset >= self.records.len() {
            return None;
        }

        let end = (self.offset + capacity).min(self.records.len());
        let batch = Batch {
            index: self.next_index,
            records: &self.records[self.offset..end],
            first_ordinal: self.offset + 1,
            page: if self.next_index == 1 {
                PageKind::Primary
            } else {
                self.continuation_kind
            },
        };

        self.offset = end;
        self.next_index += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.offset);
        let count = if remaining == 0 {
            0
        } else {
            let first = self.capacity_for(self.next_index);
            if first == 0 {
                0
            } else if remaining <= first {
                1
            } else if self.continuation_capacity == 0 {
                1
            } else {
                1 + (remaining - first).div_ceil(self.continuation_capacity)
            }
        };
        (count, Some(count))
    }
}

impl<'a> ExactSizeIterator for Batches<'a> {}

/// Partition `records` into batches of at most `capacity`
///
/// Produces `ceil(len / capacity)` batches; the last one may be short. A zero
/// capacity yields no batches.
pub fn plan_batches(records: &[AttendeeRecord], capacity: usize) -> Batches<'_> {
    Batches {
        records,
        offset: 0,
        next_index: 1,
        lead_capacity: capacity,
        continuation_capacity: capacity,
        continuation_kind: PageKind::Primary,
    }
}

/// Partition `records` according to a form's slot layout
pub fn plan_layout<'a>(records: &'a [AttendeeRecord], layout: &SlotLayout) -> Batches<'a> {
    match layout {
        SlotLayout::Uniform(page) => plan_batches(records, page.capacity),
        SlotLayout::LeadAndContinuation { lead, continuation } => Batches {
            records,
            offset: 0,
            next_index: 1,
            lead_capacity: lead.capacity,
            continuation_capacity: continuation.capacity,
            continuation_kind: PageKind::Continuation,
        },
    }
}

impl SlotLayout {
    /// Page layout a batch of `kind` is laid onto
    pub fn page(&self, kind: PageKind) -> &PageLayout {
        match (self, kind) {
            (SlotLayout::Uniform(page), _) => page,
            (SlotLayout::LeadAndContinuation { lead, .. }, PageKind::Primary) => lead,
            (SlotLayout::LeadAndContinuation { continuation, .. }, PageKind::Continuation) => {
                continuation
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{FieldScheme, SlotKey};

    fn records(n: usize) -> Vec<AttendeeRecord> {
        (0..n)
            .map(|i| AttendeeRecord {
                full_name: format!("Candidate {}", i + 1),
                ..AttendeeRecord::default()
            })
            .collect()
    }

    const SCHEME: FieldScheme = FieldScheme {
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

    fn page(capacity: usize) -> PageLayout {
        const KEYS: [SlotKey; 9] = [
            SlotKey::suffix("1"),
            SlotKey::suffix("2"),
            SlotKey::suffix("3"),
            SlotKey::suffix("4"),
            SlotKey::suffix("5"),
            SlotKey::suffix("6"),
            SlotKey::suffix("7"),
            SlotKey::suffix("8"),
            SlotKey::suffix("9"),
        ];
        PageLayout::new(capacity, SCHEME.slots(&KEYS[..capacity]))
    }

    #[test]
    fn test_23_records_capacity_10() {
        let recs = records(23);
        let batches: Vec<Batch> = plan_batches(&recs, 10).collect();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(
            batches.iter().map(|b| b.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(batches[2].first_ordinal, 21);
        assert_eq!(batches[2].records[0].full_name, "Candidate 21");
        assert!(batches.iter().all(|b| b.page == PageKind::Primary));
    }

    #[test]
    fn test_zero_records_zero_batches() {
        assert_eq!(plan_batches(&[], 10).count(), 0);
    }

    #[test]
    fn test_zero_capacity_zero_batches() {
        let recs = records(5);
        assert_eq!(plan_batches(&recs, 0).count(), 0);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let recs = records(20);
        let sizes: Vec<usize> = plan_batches(&recs, 10).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10]);
    }

    #[test]
    fn test_plan_is_restartable() {
        let recs = records(7);
        let plan = plan_batches(&recs, 3);
        assert_eq!(plan.len(), 3);
        let first: Vec<Batch> = plan.clone().collect();
        let second: Vec<Batch> = plan.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lead_and_continuation_layout() {
        let layout = SlotLayout::LeadAndContinuation {
            lead: page(9),
            continuation: page(6),
        };
        let recs = records(22);
        let plan = plan_layout(&recs, &layout);
        assert_eq!(plan.len(), 4);

        let batches: Vec<Batch> = plan.collect();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![9, 6, 6, 1]);
        assert_eq!(batches[0].page, PageKind::Primary);
        assert!(batches[1..].iter().all(|b| b.page == PageKind::Continuation));
        assert_eq!(
            batches.iter().map(|b| b.first_ordinal).collect::<Vec<_>>(),
            vec![1, 10, 16, 22]
        );
        assert_eq!(layout.page(batches[1].page).capacity, 6);
    }

    #[test]
    fn test_lead_only_when_roster_fits_first_page() {
        let layout = SlotLayout::LeadAndContinuation {
            lead: page(9),
            continuation: page(6),
        };
        let recs = records(9);
        let batches: Vec<Batch> = plan_layout(&recs, &layout).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 9);
    }
}
