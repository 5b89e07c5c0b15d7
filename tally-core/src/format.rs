//! Per-bank format descriptors: the declared CSV layouts a bank exports.
//!
//! Descriptors deserialize straight from the `<bank>_schema.json` files and are
//! validated while deserializing, so a `FormatDescriptor` value is always usable.

use serde::Deserialize;
use std::collections::HashSet;

/// How the source file signs its amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Debits are negative, credits positive. Matches the canonical sign.
    #[default]
    NegativeForDebits,
    /// Debits (purchases) are positive; payments and refunds are negative.
    #[serde(alias = "positive_for_purchases_negative_for_payments")]
    PositiveForDebits,
    /// Credits are positive, debits negative. Same as canonical.
    PositiveForCredits,
}

impl SignConvention {
    /// True when a positive raw value means money out.
    pub fn debits_are_positive(self) -> bool {
        matches!(self, SignConvention::PositiveForDebits)
    }
}

/// Where a variant reads its amount from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AmountHandling {
    SingleColumn {
        column: String,
        #[serde(default)]
        sign_convention: SignConvention,
    },
    SplitColumns {
        debit_column: String,
        credit_column: String,
        #[serde(default)]
        sign_convention: SignConvention,
    },
}

impl AmountHandling {
    /// Raw header names this rule reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            AmountHandling::SingleColumn { column, .. } => vec![column.as_str()],
            AmountHandling::SplitColumns {
                debit_column,
                credit_column,
                ..
            } => vec![debit_column.as_str(), credit_column.as_str()],
        }
    }

    pub fn sign_convention(&self) -> SignConvention {
        match self {
            AmountHandling::SingleColumn {
                sign_convention, ..
            }
            | AmountHandling::SplitColumns {
                sign_convention, ..
            } => *sign_convention,
        }
    }
}

/// Canonical field name -> raw header name.
///
/// Only the six canonical keys are accepted; anything else in the file is a
/// configuration error rather than a silently ignored typo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMappings {
    pub date: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub debit_amount: Option<String>,
    pub credit_amount: Option<String>,
}

impl ColumnMappings {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("date", &self.date),
            ("description", &self.description),
            ("category", &self.category),
            ("amount", &self.amount),
            ("debit_amount", &self.debit_amount),
            ("credit_amount", &self.credit_amount),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }
}

#[derive(Deserialize)]
struct RawVariant {
    format_name: String,
    #[serde(default)]
    column_mappings: ColumnMappings,
    amount_handling: AmountHandling,
    #[serde(default)]
    date_format: Option<String>,
}

/// One named CSV layout of a bank's export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawVariant")]
pub struct FormatVariant {
    pub format_name: String,
    pub column_mappings: ColumnMappings,
    pub amount_handling: AmountHandling,
    pub date_format: Option<String>,
    required_headers: HashSet<String>,
}

impl FormatVariant {
    /// Build a variant, checking that it names a date column, a description
    /// column, and non-empty amount columns.
    pub fn new(
        format_name: impl Into<String>,
        column_mappings: ColumnMappings,
        amount_handling: AmountHandling,
        date_format: Option<String>,
    ) -> Result<Self, String> {
        let format_name = format_name.into();
        if format_name.trim().is_empty() {
            return Err("format_name must not be empty".to_string());
        }

        for (field, mapping) in [
            ("date", &column_mappings.date),
            ("description", &column_mappings.description),
        ] {
            if mapping.is_none() {
                return Err(format!("format '{format_name}' has no {field} mapping"));
            }
        }

        let mut required_headers = HashSet::new();
        for (key, header) in column_mappings.iter() {
            if header.trim().is_empty() {
                return Err(format!("format '{format_name}' maps {key} to an empty header"));
            }
            required_headers.insert(header.to_string());
        }

        for column in amount_handling.columns() {
            if column.trim().is_empty() {
                return Err(format!("format '{format_name}' has an empty amount column"));
            }
            required_headers.insert(column.to_string());
        }

        if let AmountHandling::SplitColumns {
            debit_column,
            credit_column,
            ..
        } = &amount_handling
        {
            if debit_column == credit_column {
                return Err(format!(
                    "format '{format_name}' uses '{debit_column}' for both debit and credit"
                ));
            }
        }

        let date_format = date_format.filter(|f| !f.trim().is_empty());

        Ok(Self {
            format_name,
            column_mappings,
            amount_handling,
            date_format,
            required_headers,
        })
    }

    /// Every raw header this variant needs to be present.
    pub fn required_headers(&self) -> &HashSet<String> {
        &self.required_headers
    }

    /// Raw header mapped to the canonical `date` field.
    pub fn date_column(&self) -> &str {
        self.column_mappings.date.as_deref().unwrap_or_default()
    }

    /// Raw header mapped to the canonical `description` field.
    pub fn description_column(&self) -> &str {
        self.column_mappings.description.as_deref().unwrap_or_default()
    }

    pub fn category_column(&self) -> Option<&str> {
        self.column_mappings.category.as_deref()
    }
}

impl TryFrom<RawVariant> for FormatVariant {
    type Error = String;

    fn try_from(raw: RawVariant) -> Result<Self, Self::Error> {
        FormatVariant::new(
            raw.format_name,
            raw.column_mappings,
            raw.amount_handling,
            raw.date_format,
        )
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    bank_name: String,
    schema_mappings: Vec<FormatVariant>,
}

/// One bank's configuration: its format variants in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct FormatDescriptor {
    pub bank_name: String,
    pub variants: Vec<FormatVariant>,
}

impl FormatDescriptor {
    pub fn new(bank_name: impl Into<String>, variants: Vec<FormatVariant>) -> Result<Self, String> {
        let bank_name = bank_name.into();
        if bank_name.trim().is_empty() {
            return Err("bank_name must not be empty".to_string());
        }
        if variants.is_empty() {
            return Err(format!("bank '{bank_name}' declares no schema_mappings"));
        }

        let mut seen = HashSet::new();
        for variant in &variants {
            if !seen.insert(variant.format_name.as_str()) {
                return Err(format!(
                    "bank '{bank_name}' declares format '{}' more than once",
                    variant.format_name
                ));
            }
        }

        Ok(Self {
            bank_name,
            variants,
        })
    }

    pub fn variant(&self, format_name: &str) -> Option<&FormatVariant> {
        self.variants.iter().find(|v| v.format_name == format_name)
    }

    pub fn format_names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.format_name.as_str()).collect()
    }
}

impl TryFrom<RawDescriptor> for FormatDescriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        FormatDescriptor::new(raw.bank_name, raw.schema_mappings)
    }
}
