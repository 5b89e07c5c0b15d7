//! tally-finance: payment classification, category mapping, and the combined
//! transaction dataset

pub mod category_rules;
pub mod dataset;
pub mod error;
pub mod payment_rules;

pub use category_rules::{normalize_category, CategoryTable};
pub use dataset::{tag_row, CategoryTotal, Dataset};
pub use error::FinanceError;
pub use payment_rules::{Classification, PaymentRule, PaymentRules};
