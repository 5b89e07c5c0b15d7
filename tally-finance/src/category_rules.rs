//! Keyword table mapping free-text bank categories and merchant descriptions
//! to a small controlled vocabulary.
//!
//! First category (in table order) with a keyword inside the raw category or
//! the description wins. No match returns the raw category unchanged, so
//! unknown categories stay visible instead of collapsing into "other".

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::{FinanceError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: String,
    /// Lowercased, non-empty
    keywords: Vec<String>,
}

impl CategoryEntry {
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn matches(&self, category_lower: &str, description_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| category_lower.contains(k.as_str()) || description_lower.contains(k.as_str()))
    }
}

/// Ordered canonical-category -> keywords table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable {
    entries: Vec<CategoryEntry>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category. Repeating a name extends its keyword list in place.
    pub fn push<S: AsRef<str>>(&mut self, name: impl Into<String>, keywords: impl IntoIterator<Item = S>) {
        let name = name.into();
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty());

        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.keywords.extend(keywords),
            None => self.entries.push(CategoryEntry {
                name,
                keywords: keywords.collect(),
            }),
        }
    }

    /// Vocabulary used when no mapping file is configured.
    pub fn default_table() -> Self {
        let mut t = Self::new();
        t.push("dining", ["restaurant", "restaurants", "food", "dining", "cafe", "fast food", "takeout"]);
        t.push("groceries", ["grocery", "groceries", "supermarket", "market", "food store"]);
        t.push("transportation", ["gas", "fuel", "uber", "lyft", "taxi", "bus", "train", "parking"]);
        t.push("shopping", ["amazon", "walmart", "target", "store", "retail", "purchase"]);
        t.push("entertainment", ["netflix", "spotify", "hulu", "movies", "games", "subscription"]);
        t.push("income", ["salary", "paycheck", "deposit", "income", "wages", "bonus"]);
        t.push("housing", ["rent", "mortgage", "property", "home", "apartment"]);
        t.push("utilities", ["electric", "water", "internet", "phone", "cable", "utilities"]);
        t.push("healthcare", ["medical", "doctor", "pharmacy", "hospital", "health", "dental"]);
        t.push("insurance", ["insurance", "coverage", "policy", "premium"]);
        t.push("fees", ["atm", "fee", "charge", "penalty", "service fee"]);
        t.push("transfer", ["transfer", "payment", "wire", "check", "deposit"]);
        t
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FinanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `name` is one of the table's canonical categories.
    pub fn is_canonical(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// The matching canonical category, if any.
    pub fn lookup(&self, raw_category: &str, description: &str) -> Option<&str> {
        let category_lower = raw_category.to_lowercase();
        let description_lower = description.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.matches(&category_lower, &description_lower))
            .map(|e| e.name.as_str())
    }

    pub fn normalize(&self, raw_category: &str, description: &str) -> String {
        normalize_category(raw_category, description, self)
    }
}

/// Canonical category for a transaction, or `raw_category` unchanged.
pub fn normalize_category(raw_category: &str, description: &str, table: &CategoryTable) -> String {
    table
        .lookup(raw_category, description)
        .unwrap_or(raw_category)
        .to_string()
}

// Hand-written so the JSON object's key order survives as table order.
impl<'de> Deserialize<'de> for CategoryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = CategoryTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping category names to keyword lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut table = CategoryTable::new();
                while let Some((name, keywords)) = map.next_entry::<String, Vec<String>>()? {
                    table.push(name, keywords);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}
