//! Integration tests for the inspect module.

use calc_share_cli::inspect::{
    StorageTarget, connection_rows, parse_assignment, pending_imports, publish, stored_rows,
};
use calc_share_cli::report::error_report;
use calc_share_core::{Currency, FieldValue, Gender, ShareSettings, SharedField, default_registry};
use tempfile::TempDir;

fn target_in(dir: &TempDir) -> StorageTarget {
    StorageTarget::resolve(&ShareSettings::default(), Some(dir.path()))
}

#[test]
fn test_parse_assignment_by_field_kind() {
    assert_eq!(
        parse_assignment("guestCount=50").unwrap(),
        (SharedField::GuestCount, FieldValue::Number(50.0))
    );
    assert_eq!(
        parse_assignment("currency = gbp").unwrap(),
        (SharedField::Currency, FieldValue::Currency(Currency::Gbp))
    );
    assert_eq!(
        parse_assignment("gender=Female").unwrap(),
        (SharedField::Gender, FieldValue::Gender(Gender::Female))
    );
}

#[test]
fn test_parse_assignment_rejects_bad_input() {
    assert!(parse_assignment("guestCount").is_err());
    assert!(parse_assignment("partySize=4").is_err());
    assert!(parse_assignment("guestCount=many").is_err());
    assert!(parse_assignment("guestCount=NaN").is_err());
    assert!(parse_assignment("currency=JPY").is_err());
}

#[test]
fn test_connections_for_bbq_planner() {
    let rows = connection_rows(default_registry(), "bbq-planner").unwrap();
    let party = rows
        .iter()
        .find(|row| row.id == "party-budget-calculator")
        .unwrap();
    assert_eq!(
        party.shared,
        vec![SharedField::GuestCount, SharedField::EventBudget]
    );
    assert!(rows.iter().all(|row| row.id != "bbq-planner"));
}

#[test]
fn test_connections_unknown_calculator() {
    let error = connection_rows(default_registry(), "unit-converter").unwrap_err();
    assert!(error.to_string().contains("unit-converter"));
}

#[test]
fn test_publish_then_show_and_import() {
    let dir = TempDir::new().unwrap();
    let target = target_in(&dir);
    let broker = target.open().unwrap();

    let written = publish(
        &broker,
        default_registry(),
        "bbq-planner",
        &[
            (SharedField::GuestCount, FieldValue::Number(50.0)),
            (SharedField::Bmi, FieldValue::Number(22.0)),
        ],
    )
    .unwrap();
    assert_eq!(written, vec![SharedField::GuestCount]);

    let reopened = target.open().unwrap();
    let rows = stored_rows(&reopened.document(), reopened.now_millis());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, "guestCount");
    assert_eq!(rows[0].label, "Number of Guests");
    assert_eq!(rows[0].source_name, "BBQ Planner");

    let (imports, banner) =
        pending_imports(&reopened, default_registry(), "party-budget-calculator").unwrap();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].local_key, "guestCount");
    assert!(banner.unwrap().starts_with("1 value available from BBQ Planner"));
}

#[test]
fn test_unknown_calculator_report_has_hint() {
    let error = connection_rows(default_registry(), "unit-converter").unwrap_err();
    let report = error_report(&error);
    assert!(report.starts_with("error: "));
    assert!(report.contains("\nhint: There is no calculator named 'unit-converter'."));
    assert!(report.contains("calc-share calculators"));
}

#[test]
fn test_bad_settings_report_has_hint() {
    use anyhow::Context;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();
    let error = ShareSettings::try_load_from(&path)
        .with_context(|| format!("load settings from {}", path.display()))
        .unwrap_err();

    let report = error_report(&error);
    assert!(report.starts_with("error: load settings from "));
    assert!(report.contains("\nhint: The settings file at "));
    assert!(report.ends_with("run `calc-share config --write` to replace it."));
}

#[test]
fn test_publish_rejects_undeclared_only() {
    let dir = TempDir::new().unwrap();
    let broker = target_in(&dir).open().unwrap();
    let result = publish(
        &broker,
        default_registry(),
        "soap-lye-calculator",
        &[(SharedField::GuestCount, FieldValue::Number(5.0))],
    );
    assert!(result.is_err());
    assert!(broker.document().is_empty());
}
