//! Canonical transaction records and the raw rows they come from

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// One CSV data row keyed by its (trimmed) header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair headers with values. When a header repeats, the first column wins.
    /// Missing trailing values are left out.
    pub fn from_record<'a>(
        headers: impl IntoIterator<Item = &'a str>,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        headers.into_iter().zip(values).collect()
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(String::as_str)
    }

    pub fn contains(&self, header: &str) -> bool {
        self.fields.contains_key(header)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = HashMap::new();
        for (k, v) in iter {
            fields.entry(k.into()).or_insert_with(|| v.into());
        }
        Self { fields }
    }
}

/// A normalized transaction, identical in shape for every bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    /// Negative = money out (debit), positive = money in (credit).
    pub amount: Decimal,
    /// Category as the bank wrote it ("" when the layout has none)
    pub category: String,
    /// Category after vocabulary mapping; equals `category` until mapped
    pub normalized_category: String,
    pub description: String,
    pub bank: String,
    /// File the row came from, for audit
    pub source_file: String,
    /// Tagged as a card payment/transfer rather than spending
    pub is_payment: bool,
    /// Name of the payment rule that set `is_payment`
    pub payment_rule: Option<String>,
}

impl CanonicalRecord {
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        category: impl Into<String>,
        description: impl Into<String>,
        bank: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        let category = category.into();
        Self {
            date,
            amount,
            normalized_category: category.clone(),
            category,
            description: description.into(),
            bank: bank.into(),
            source_file: source_file.into(),
            is_payment: false,
            payment_rule: None,
        }
    }

    /// Tag with the payment classification. `None` clears the tag.
    pub fn with_payment_rule(mut self, rule: Option<String>) -> Self {
        self.is_payment = rule.is_some();
        self.payment_rule = rule;
        self
    }

    pub fn with_normalized_category(mut self, category: impl Into<String>) -> Self {
        self.normalized_category = category.into();
        self
    }

    /// Money out
    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Money in
    pub fn is_credit(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }
}

/// A normalized record alongside the raw row it came from. Payment rules may
/// need raw fields the canonical shape does not carry (e.g. `Type`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub record: CanonicalRecord,
    pub raw: RawRow,
}
