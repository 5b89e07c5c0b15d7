//! Header-row matching against a bank's declared format variants.

use std::collections::HashSet;

use tally_core::{FormatDescriptor, FormatVariant, NoMatch};

/// Collect header cells into a lookup set.
pub fn header_set<I, S>(headers: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    headers.into_iter().map(Into::into).collect()
}

/// First variant, in declared order, whose required headers are all present.
///
/// Declaration order is the tie-break: when a "current" and a "legacy" layout
/// are both satisfied, whichever the config lists first wins.
pub fn match_format<'d>(
    descriptor: &'d FormatDescriptor,
    headers: &HashSet<String>,
) -> Result<&'d FormatVariant, NoMatch> {
    descriptor
        .variants
        .iter()
        .find(|variant| variant.required_headers().is_subset(headers))
        .ok_or_else(|| {
            let mut sorted: Vec<String> = headers.iter().cloned().collect();
            sorted.sort();
            NoMatch {
                bank: descriptor.bank_name.clone(),
                headers: sorted,
            }
        })
}

/// Required headers of `variant` absent from `headers`, sorted. Used to explain
/// a `NoMatch`.
pub fn missing_headers(variant: &FormatVariant, headers: &HashSet<String>) -> Vec<String> {
    let mut missing: Vec<String> = variant
        .required_headers()
        .difference(headers)
        .cloned()
        .collect();
    missing.sort();
    missing
}
