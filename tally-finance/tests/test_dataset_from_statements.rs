use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal_macros::dec;
use tally_core::fingerprint;
use tally_finance::{CategoryTable, Dataset, PaymentRules};
use tally_ingest::{ingest_data_root, DescriptorStore};

fn configs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("configs")
}

fn write(root: &Path, bank: &str, file: &str, body: &str) {
    let dir = root.join(bank);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), body).unwrap();
}

fn data_root() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write(
        root,
        "chase",
        "activity.csv",
        "Transaction Date,Post Date,Description,Category,Type,Amount,Memo
07/13/2025,07/14/2025,H-E-B #659,Groceries,Sale,-21.39,
07/12/2025,07/13/2025,Payment Thank You-Mobile,,Payment,183.13,
07/11/2025,07/12/2025,NETFLIX.COM,Entertainment,Sale,-15.49,
",
    );
    write(
        root,
        "apple_card",
        "export.csv",
        "Transaction Date,Clearing Date,Description,Merchant,Category,Type,Amount (USD),Purchased By
07/10/2025,07/11/2025,UBER *TRIP,Uber,Transportation,Purchase,24.50,Jane
07/09/2025,07/09/2025,ACH DEPOSIT INTERNET TRANSFER FROM ACCOUNT ENDING IN 1234,Ach Deposit,Payment,Payment,-500.00,Jane
",
    );
    write(
        root,
        "wells_fargo",
        "checking.csv",
        "Date,Description,Withdrawals,Deposits
07/05/2025,ONLINE TRANSFER TO CREDIT CARD PAYMENT,300.00,
07/06/2025,PAYROLL ACME CORP,,2500.00
07/07/2025,BROKEN,5.00,5.00
",
    );
    tmp
}

fn dataset(root: &Path) -> Dataset {
    let store = DescriptorStore::load(configs_dir(), ["chase", "apple_card", "wells_fargo"]);
    let outcome = ingest_data_root(&store, root).unwrap();
    let rules = PaymentRules::load(configs_dir().join("payment_rules.json")).unwrap();
    let table = CategoryTable::load(configs_dir().join("category_mapping.json")).unwrap();
    Dataset::build(outcome.into_rows(), &rules, &table)
}

#[test]
fn test_shipped_rule_files_match_builtin() {
    let rules = PaymentRules::load(configs_dir().join("payment_rules.json")).unwrap();
    assert_eq!(rules, PaymentRules::builtin());
    let table = CategoryTable::load(configs_dir().join("category_mapping.json")).unwrap();
    assert_eq!(table, CategoryTable::default_table());
}

#[test]
fn test_payments_tagged_across_banks() {
    let tmp = data_root();
    let ds = dataset(tmp.path());

    assert_eq!(ds.len(), 7);
    let mut payment_rules: Vec<_> = ds
        .payments()
        .map(|r| r.payment_rule.clone().unwrap())
        .collect();
    payment_rules.sort();
    assert_eq!(
        payment_rules,
        vec![
            "apple_card:type_category_payment",
            "chase:type_payment",
            "wells_fargo:card_payment"
        ]
    );
    assert_eq!(ds.spending().count(), 4);
}

#[test]
fn test_sign_conventions_unified() {
    let tmp = data_root();
    let ds = dataset(tmp.path());
    let amount = |desc: &str| ds.all().iter().find(|r| r.description == desc).unwrap().amount;

    // negative_for_debits: as exported
    assert_eq!(amount("H-E-B #659"), dec!(-21.39));
    // positive_for_debits: flipped
    assert_eq!(amount("UBER *TRIP"), dec!(-24.50));
    // split columns
    assert_eq!(amount("PAYROLL ACME CORP"), dec!(2500.00));
    assert_eq!(amount("ONLINE TRANSFER TO CREDIT CARD PAYMENT"), dec!(-300.00));
}

#[test]
fn test_categories_and_fingerprints() {
    let tmp = data_root();
    let ds = dataset(tmp.path());

    let uber = ds.all().iter().find(|r| r.description == "UBER *TRIP").unwrap();
    assert_eq!(uber.category, "Transportation");
    assert_eq!(uber.normalized_category, "transportation");

    let prints: HashSet<String> = ds.all().iter().map(fingerprint).collect();
    assert_eq!(prints.len(), ds.len());

    let again = dataset(tmp.path());
    let first: Vec<String> = ds.all().iter().map(fingerprint).collect();
    let second: Vec<String> = again.all().iter().map(fingerprint).collect();
    assert_eq!(first, second);
}
