//! Deterministic payment classification.
//!
//! Separates card bill payments and account transfers from real spending. The
//! filter only tags records; views decide whether to hide them.
//!
//! Precedence, first match wins:
//!   1. bank-scoped field rules (exact, case-sensitive raw field equality)
//!   2. bank-scoped description keywords (case-insensitive substring)
//!   3. generic description keywords, for every bank
//!
//! Within a tier, declaration order decides.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tally_core::{CanonicalRecord, RawRow};

use crate::error::{FinanceError, Result};

/// Payment markers in free-text descriptions, shared by all banks.
pub const GENERIC_PAYMENT_KEYWORDS: &[&str] = &[
    "PAYMENT THANK YOU",
    "AUTOPAY",
    "ONLINE PAYMENT",
    "MOBILE PAYMENT",
    "ACH DEPOSIT INTERNET TRANSFER",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleTier {
    BankFields,
    BankKeywords,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatcher {
    /// Every `(field, value)` pair must equal the raw row's field exactly.
    FieldEquals(Vec<(String, String)>),
    /// Any keyword (stored lowercased) inside the description.
    DescriptionKeywords(Vec<String>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    name: Option<String>,
    bank: Option<String>,
    when_fields: Option<BTreeMap<String, String>>,
    description_keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct PaymentRule {
    pub name: String,
    /// `None` = generic rule
    pub bank: Option<String>,
    pub matcher: RuleMatcher,
}

impl PaymentRule {
    /// Bank-scoped structured rule.
    pub fn fields<'a>(
        name: impl Into<String>,
        bank: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            name: name.into(),
            bank: Some(bank.into()),
            matcher: RuleMatcher::FieldEquals(
                fields
                    .into_iter()
                    .map(|(f, v)| (f.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    /// Keyword rule, bank-scoped when `bank` is given.
    pub fn keywords<'a>(
        name: impl Into<String>,
        bank: Option<&str>,
        keywords: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            name: name.into(),
            bank: bank.map(str::to_string),
            matcher: RuleMatcher::DescriptionKeywords(
                keywords.into_iter().map(str::to_lowercase).collect(),
            ),
        }
    }

    pub fn tier(&self) -> RuleTier {
        match (&self.bank, &self.matcher) {
            (Some(_), RuleMatcher::FieldEquals(_)) => RuleTier::BankFields,
            (Some(_), RuleMatcher::DescriptionKeywords(_)) => RuleTier::BankKeywords,
            (None, _) => RuleTier::Generic,
        }
    }

    fn applies_to(&self, bank: &str) -> bool {
        self.bank.as_deref().is_none_or(|b| b == bank)
    }

    fn matches(&self, record: &CanonicalRecord, raw: &RawRow) -> bool {
        match &self.matcher {
            RuleMatcher::FieldEquals(fields) => fields
                .iter()
                .all(|(field, value)| raw.get(field) == Some(value.as_str())),
            RuleMatcher::DescriptionKeywords(keywords) => {
                let desc = record.description.to_lowercase();
                keywords.iter().any(|k| desc.contains(k.as_str()))
            }
        }
    }
}

impl TryFrom<RawRule> for PaymentRule {
    type Error = String;

    fn try_from(raw: RawRule) -> std::result::Result<Self, Self::Error> {
        let scope = raw.bank.clone().unwrap_or_else(|| "generic".to_string());
        let rule = match (raw.when_fields, raw.description_keywords) {
            (Some(fields), None) => {
                let Some(bank) = raw.bank else {
                    return Err("field rules must name a bank".to_string());
                };
                if fields.is_empty() {
                    return Err(format!("{bank}: when_fields is empty"));
                }
                let name = raw.name.unwrap_or_else(|| format!("{bank}:fields"));
                PaymentRule {
                    name,
                    bank: Some(bank),
                    matcher: RuleMatcher::FieldEquals(fields.into_iter().collect()),
                }
            }
            (None, Some(keywords)) => {
                if keywords.is_empty() || keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err(format!("{scope}: description_keywords must be non-empty strings"));
                }
                let name = raw.name.unwrap_or_else(|| format!("{scope}:keywords"));
                PaymentRule::keywords(name, raw.bank.as_deref(), keywords.iter().map(String::as_str))
            }
            _ => {
                return Err(format!(
                    "{scope}: give exactly one of when_fields or description_keywords"
                ));
            }
        };
        Ok(rule)
    }
}

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_payment: bool,
    /// Name of the matching rule
    pub rule: Option<String>,
}

/// Ordered payment rules. Sorted by tier once, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRules {
    rules: Vec<PaymentRule>,
}

impl PaymentRules {
    pub fn new(mut rules: Vec<PaymentRule>) -> Self {
        // stable: keeps declaration order within a tier
        rules.sort_by_key(PaymentRule::tier);
        Self { rules }
    }

    /// Built-in rules for the banks tally ships descriptors for.
    pub fn builtin() -> Self {
        Self::new(vec![
            PaymentRule::fields("chase:type_payment", "chase", [("Type", "Payment")]),
            PaymentRule::fields(
                "apple_card:type_category_payment",
                "apple_card",
                [("Category", "Payment"), ("Type", "Payment")],
            ),
            PaymentRule::keywords(
                "wells_fargo:card_payment",
                Some("wells_fargo"),
                ["CREDIT CARD PAYMENT", "CC PAYMENT", "CARD PAYMENT"],
            ),
            PaymentRule::keywords(
                "generic:payment_keywords",
                None,
                GENERIC_PAYMENT_KEYWORDS.iter().copied(),
            ),
        ])
    }

    /// Rules from a JSON list.
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Vec<PaymentRule> = serde_json::from_str(json)?;
        if rules.is_empty() {
            return Err(FinanceError::InvalidRule("rule list is empty".to_string()));
        }
        Ok(Self::new(rules))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FinanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn rules(&self) -> &[PaymentRule] {
        &self.rules
    }

    /// Classify a record. Pure; the record is not touched.
    pub fn classify(&self, record: &CanonicalRecord, raw: &RawRow, bank: &str) -> Classification {
        let rule = self
            .rules
            .iter()
            .filter(|r| r.applies_to(bank))
            .find(|r| r.matches(record, raw));
        Classification {
            is_payment: rule.is_some(),
            rule: rule.map(|r| r.name.clone()),
        }
    }

    /// Classify and return the tagged record.
    pub fn tag(&self, record: CanonicalRecord, raw: &RawRow) -> CanonicalRecord {
        let classification = self.classify(&record, raw, &record.bank);
        record.with_payment_rule(classification.rule)
    }
}

impl Default for PaymentRules {
    fn default() -> Self {
        Self::builtin()
    }
}
