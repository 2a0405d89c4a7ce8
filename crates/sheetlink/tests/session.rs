//! Selector and end-to-end session tests: open documents through the
//! public entry points, exercise the contract, and assert the observable
//! behavior is the same regardless of which backend answered.
//!
//! No host application runs here, so the selector's fallback path is the
//! one under test: the bridge exe is pinned to a nonexistent path and the
//! file backend must pick every open up.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use sheetlink::prelude::*;
use sheetlink_file::FileWorkbook;
use sheetlink_live::BridgeConfig;

/// Options that make the live attach fail fast and deterministically.
fn no_live_session() -> OpenOptions {
    OpenOptions {
        preference: BackendPreference::Auto,
        bridge: BridgeConfig {
            bridge_exe: Some(PathBuf::from("/nonexistent/sheetlink-bridge.exe")),
            ..BridgeConfig::default()
        },
    }
}

/// Write a fresh single-sheet container to `name` under `dir`.
fn seed_document(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut wb = FileWorkbook::create(&path);
    wb.save().unwrap();
    path
}

#[test]
fn auto_preference_falls_back_to_file_backend() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "fallback.xlsx");

    let session = sheetlink::open_with(&path, no_live_session()).unwrap();
    assert_eq!(session.backend_name(), "file");
    session.close().unwrap();
}

#[test]
fn live_only_preference_surfaces_the_live_error() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "liveonly.xlsx");

    let options = OpenOptions {
        preference: BackendPreference::Live,
        ..no_live_session()
    };
    let err = sheetlink::open_with(&path, options).map(|_| ()).unwrap_err();
    // The bridge never spawned: that is a resource failure, not a
    // document problem.
    assert!(matches!(err, Error::ResourceFailure(_)));
}

#[test]
fn missing_document_reports_not_found_once_the_file_backend_runs() {
    let err = sheetlink::open_with("/no/such/book.xlsx", no_live_session())
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn live_attach_is_tried_even_when_no_local_file_exists() {
    // A host can hold a remote/synced document whose local path is only a
    // placeholder, so the selector must not stat the path before the
    // attach. With the bridge pinned to a nonexistent exe, the attach
    // itself fails, which proves it ran.
    let options = OpenOptions {
        preference: BackendPreference::Live,
        ..no_live_session()
    };
    let err = sheetlink::open_with("/no/such/book.xlsx", options)
        .map(|_| ())
        .unwrap_err();
    assert!(
        matches!(err, Error::ResourceFailure(_)),
        "got {err:?} instead of the bridge failure"
    );
}

#[test]
fn both_backends_failing_surfaces_the_file_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not-a-container.xlsx");
    std::fs::write(&path, b"this is not a zip archive").unwrap();

    let err = sheetlink::open_with(&path, no_live_session())
        .map(|_| ())
        .unwrap_err();
    // "No live session" is expected and absorbed; the file backend's parse
    // failure is the diagnostic one.
    assert!(matches!(err, Error::BackendFailure(_)), "got {err:?}");
}

#[test]
fn used_range_grows_with_each_write() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "growth.xlsx");

    let mut session = sheetlink::open_with(&path, no_live_session()).unwrap();
    let mut sheet = session.sheet("Sheet1").unwrap();

    sheet.set_value("A1", &CellValue::from(42.0)).unwrap();
    assert_eq!(sheet.used_range().unwrap().to_a1(), "A1");

    sheet.set_value("C3", &CellValue::from("x")).unwrap();
    assert_eq!(sheet.used_range().unwrap().to_a1(), "A1:C3");
}

#[test]
fn formula_read_falls_back_to_value() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "formulas.xlsx");

    let mut session = sheetlink::open_with(&path, no_live_session()).unwrap();
    let mut sheet = session.sheet("Sheet1").unwrap();

    sheet.set_value("A1", &CellValue::from(7.0)).unwrap();
    sheet.set_formula("B1", "SUM(A1:A1)").unwrap();

    // No stored formula: formula() equals value()
    assert_eq!(sheet.formula("A1").unwrap(), sheet.value("A1").unwrap());
    // Stored formula always comes back =-prefixed
    assert_eq!(sheet.formula("B1").unwrap(), "=SUM(A1:A1)");
}

#[test]
fn copied_sheet_is_adjacent_and_persists() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "copies.xlsx");

    let mut session = sheetlink::open_with(&path, no_live_session()).unwrap();
    session.create_sheet("Data").unwrap();
    session.copy_sheet("Sheet1", "Sheet1 Copy").unwrap();
    assert_eq!(
        session.sheet_names().unwrap(),
        vec!["Sheet1", "Sheet1 Copy", "Data"]
    );
    session.save().unwrap();
    session.close().unwrap();

    let mut reopened = sheetlink::open_with(&path, no_live_session()).unwrap();
    assert_eq!(
        reopened.sheet_names().unwrap(),
        vec!["Sheet1", "Sheet1 Copy", "Data"]
    );
}

#[test]
fn macro_execution_without_a_host_is_unsupported() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "macros.xlsx");

    let mut session = sheetlink::open_with(&path, no_live_session()).unwrap();
    let mut sheet = session.sheet("Sheet1").unwrap();

    let err = sheet.run_macro("[A1]=1").unwrap_err();
    assert!(err.is_unsupported(), "got {err:?} instead of Unsupported");
    let err = sheet.capture_picture("A1:C3").unwrap_err();
    assert!(err.is_unsupported(), "got {err:?} instead of Unsupported");
}

#[test]
fn mutations_before_save_never_touch_the_file() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "unsaved.xlsx");
    let before = std::fs::read(&path).unwrap();

    let mut session = sheetlink::open_with(&path, no_live_session()).unwrap();
    {
        let mut sheet = session.sheet("Sheet1").unwrap();
        sheet.set_value("A1", &CellValue::from("draft")).unwrap();
    }
    session.close().unwrap();

    // Session ended without save: the container is byte-identical
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn validation_and_conditional_rules_round_trip_through_save() {
    let dir = tempdir().unwrap();
    let path = seed_document(dir.path(), "rules.xlsx");

    let mut session = sheetlink::open_with(&path, no_live_session()).unwrap();
    {
        let mut sheet = session.sheet("Sheet1").unwrap();
        let rule = DataValidationRule::list::<Vec<String>, _>(vec!["Yes".into(), "No".into()]);
        sheet.add_data_validation("B2:B10", &rule).unwrap();

        let cf = CfRule::new(CfRuleKind::CellValue {
            operator: CfOperator::GreaterThan,
            value1: "100".into(),
            value2: None,
        })
        .with_format(CellStyle {
            font: Some(FontStyle::new().with_bold(true)),
            ..CellStyle::default()
        });
        sheet.add_conditional_format("C1:C20", &cf).unwrap();
    }
    session.save().unwrap();

    // The contract exposes rule creation only; the reloaded model shows
    // both rules survived serialization.
    let reloaded = FileWorkbook::open(&path).unwrap();
    let sheet = &reloaded.model().sheets[0];
    let (range, rule) = &sheet.validations[0];
    assert_eq!(range.to_a1(), "B2:B10");
    assert_eq!(rule.kind, ValidationKind::List);
    assert_eq!(rule.dropdown, vec!["Yes".to_string(), "No".to_string()]);
    assert_eq!(sheet.conditional_formats.len(), 1);
    assert_eq!(sheet.conditional_formats[0].0.to_a1(), "C1:C20");
}
