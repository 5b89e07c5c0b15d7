//! The combined, tagged record set and its views.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tally_core::{CanonicalRecord, NormalizedRow};
use tracing::debug;

use crate::category_rules::CategoryTable;
use crate::payment_rules::PaymentRules;

/// Payment tag, then category mapping, for one normalized row.
pub fn tag_row(row: NormalizedRow, rules: &PaymentRules, categories: &CategoryTable) -> CanonicalRecord {
    let NormalizedRow { record, raw } = row;
    let record = rules.tag(record, &raw);
    let normalized = categories.normalize(&record.category, &record.description);
    record.with_normalized_category(normalized)
}

/// Per-category summary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    pub total: Decimal,
}

/// Every record from every file. Payments stay in; views filter them.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<CanonicalRecord>,
}

impl Dataset {
    pub fn build(
        rows: impl IntoIterator<Item = NormalizedRow>,
        rules: &PaymentRules,
        categories: &CategoryTable,
    ) -> Self {
        let records: Vec<CanonicalRecord> = rows
            .into_iter()
            .map(|row| tag_row(row, rules, categories))
            .collect();
        debug!(
            "Tagged {} records ({} payments)",
            records.len(),
            records.iter().filter(|r| r.is_payment).count()
        );
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Full record set, payments included.
    pub fn all(&self) -> &[CanonicalRecord] {
        &self.records
    }

    /// Default view: actual spending and income, payments hidden.
    pub fn spending(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter().filter(|r| !r.is_payment)
    }

    pub fn payments(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter().filter(|r| r.is_payment)
    }

    /// `spending()` when `filter_payments`, otherwise everything.
    pub fn view(&self, filter_payments: bool) -> Vec<&CanonicalRecord> {
        if filter_payments {
            self.spending().collect()
        } else {
            self.records.iter().collect()
        }
    }

    /// Count and signed total per normalized category, largest count first.
    /// Totals saturate at the `Decimal` range instead of overflowing.
    pub fn category_totals(&self, filter_payments: bool) -> Vec<CategoryTotal> {
        let mut by_category: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
        for r in self.view(filter_payments) {
            let entry = by_category
                .entry(r.normalized_category.as_str())
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 = entry.1.saturating_add(r.amount);
        }

        let mut totals: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(category, (count, total))| CategoryTotal {
                category: category.to_string(),
                count,
                total,
            })
            .collect();
        totals.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        totals
    }

    /// Distinct non-empty raw categories that no keyword mapped, sorted.
    pub fn unmapped_categories(&self, table: &CategoryTable) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.category.is_empty())
            .filter(|r| r.normalized_category == r.category && !table.is_canonical(&r.category))
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
