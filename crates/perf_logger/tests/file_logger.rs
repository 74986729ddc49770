//! End-to-end tests for the JSON file logger.
//!
//! Each test works in its own temporary directory and checks the exact
//! bytes written, since other tools read these logs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use perf_logger::{
    LogEntry, LogFileInfo, PerfLoggerError, PerformanceData, PerformanceFileLogger,
    PerformanceLogger,
};
use proptest::prelude::*;
use tempfile::TempDir;

const FIRST_ENTRY: &str = r#"{"Metadata":{"key1":"value1"},"Data":[{"ClassName":"Program","MethodName":"Main","StartTime":"2024-12-12T14:15:22Z","ExecutionTime":"00:00:00.1000000"}]}"#;
const SECOND_ENTRY: &str = r#"{"Metadata":{"key2":"value2"},"Data":[{"ClassName":"NotProgram","MethodName":"Foo","StartTime":"2023-11-10T09:08:07Z","ExecutionTime":"00:00:00.2000000"}]}"#;

fn program_main() -> Vec<PerformanceData> {
    vec![PerformanceData::new(
        "Program",
        "Main",
        Utc.with_ymd_and_hms(2024, 12, 12, 14, 15, 22).unwrap(),
        Duration::from_millis(100),
    )]
}

fn not_program_foo() -> Vec<PerformanceData> {
    vec![PerformanceData::new(
        "NotProgram",
        "Foo",
        Utc.with_ymd_and_hms(2023, 11, 10, 9, 8, 7).unwrap(),
        Duration::from_millis(200),
    )]
}

fn logger_in(dir: &Path) -> PerformanceFileLogger {
    PerformanceFileLogger::with_file_info(LogFileInfo::new("test_log", dir))
}

#[test]
fn report_creates_file_with_exact_content() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path());
    logger.add_metadata("key1", "value1");

    logger.report(&program_main()).unwrap();

    let path = dir.path().join("test_log.json");
    assert!(path.exists());
    assert_eq!(fs::read_to_string(path).unwrap(), format!("[{}]", FIRST_ENTRY));
}

#[test]
fn report_without_metadata_omits_field() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path());

    logger.report(&program_main()).unwrap();

    let content = fs::read_to_string(dir.path().join("test_log.json")).unwrap();
    assert!(!content.contains("Metadata"));
    assert!(content.starts_with(r#"[{"Data":[{"ClassName":"Program""#));
}

#[test]
fn report_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    fs::write(&path, format!("[{}]", FIRST_ENTRY)).unwrap();

    let mut logger = logger_in(dir.path());
    logger.add_metadata("key2", "value2");
    logger.report(&not_program_foo()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("[{},{}]", FIRST_ENTRY, SECOND_ENTRY)
    );
}

#[test]
fn report_appends_to_pretty_printed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    let existing: serde_json::Value = serde_json::from_str(&format!("[{}]", FIRST_ENTRY)).unwrap();
    fs::write(&path, serde_json::to_string_pretty(&existing).unwrap()).unwrap();

    let mut logger = logger_in(dir.path());
    logger.add_metadata("key2", "value2");
    logger.report(&not_program_foo()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("[{},{}]", FIRST_ENTRY, SECOND_ENTRY)
    );
}

#[test]
fn report_into_empty_file_starts_new_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    fs::File::create(&path).unwrap();

    let mut logger = logger_in(dir.path());
    logger.add_metadata("key1", "value1");
    logger.report(&program_main()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), format!("[{}]", FIRST_ENTRY));
}

#[test]
fn include_date_puts_current_utc_date_in_file_name() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path()).with_include_date(true);

    let before = Utc::now().format("%Y-%m-%d").to_string();
    logger.report(&program_main()).unwrap();
    let after = Utc::now().format("%Y-%m-%d").to_string();

    let files: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].contains("test_log"));
    assert!(files[0].contains(&before) || files[0].contains(&after));
    assert!(files[0].ends_with(".json"));
}

#[test]
fn file_name_without_date_has_no_date() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path());
    logger.report(&program_main()).unwrap();

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let path = logger.file_path();
    let name = path.file_name().unwrap().to_string_lossy();
    assert_eq!(name, "test_log.json");
    assert!(!name.contains(&today));
}

#[test]
fn corrupt_file_is_reported_and_left_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    let corrupt = r#"{"not":"an array"}"#;
    fs::write(&path, corrupt).unwrap();

    let mut logger = logger_in(dir.path());
    let err = logger.report(&program_main()).unwrap_err();

    assert!(matches!(err, PerfLoggerError::Deserialization { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), corrupt);
}

#[test]
fn invalid_execution_time_is_a_deserialization_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    let bad = r#"[{"Data":[{"ClassName":"A","MethodName":"f","StartTime":"2024-12-12T14:15:22Z","ExecutionTime":"later"}]}]"#;
    fs::write(&path, bad).unwrap();

    let err = logger_in(dir.path()).read_entries().unwrap_err();
    assert!(matches!(err, PerfLoggerError::Deserialization { .. }));
}

#[test]
fn written_entries_read_back_identically() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path());

    let batches: Vec<Vec<PerformanceData>> = (0..5)
        .map(|i| {
            vec![PerformanceData::new(
                format!("Class{}", i),
                "Run",
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, i).unwrap()
                    + chrono::Duration::microseconds(i as i64 * 1_234),
                Duration::from_micros(1_000 + i as u64 * 17),
            )]
        })
        .collect();

    for batch in &batches {
        logger.report(batch).unwrap();
    }

    let entries = logger.read_entries().unwrap();
    assert_eq!(entries.len(), batches.len());
    for (entry, batch) in entries.iter().zip(&batches) {
        assert!(entry.metadata.is_empty());
        assert_eq!(&entry.data, batch);
    }
}

#[test]
fn metadata_changes_only_affect_later_entries() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path());

    logger.report(&program_main()).unwrap();
    logger.add_metadata("phase", "second");
    logger.report(&program_main()).unwrap();

    let entries: Vec<LogEntry> = logger.read_entries().unwrap();
    assert!(entries[0].metadata.is_empty());
    assert_eq!(entries[1].metadata["phase"], "second");
}

#[test]
fn start_times_past_year_9999_stay_readable() {
    let dir = TempDir::new().unwrap();
    let mut logger = logger_in(dir.path());
    let far = vec![PerformanceData::new(
        "A",
        "f",
        Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap(),
        Duration::ZERO,
    )];

    logger.report(&far).unwrap();
    logger.report(&[]).unwrap();

    let content = fs::read_to_string(dir.path().join("test_log.json")).unwrap();
    assert!(content.contains(r#""StartTime":"+10000-01-01T00:00:00Z""#));
    let entries = logger.read_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].data, far);
}

#[test]
fn file_with_byte_order_mark_is_appended_to() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    fs::write(&path, format!("\u{feff}[{}]", FIRST_ENTRY)).unwrap();

    let mut logger = logger_in(dir.path());
    logger.add_metadata("key2", "value2");
    logger.report(&not_program_foo()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("[{},{}]", FIRST_ENTRY, SECOND_ENTRY)
    );
}

#[test]
fn non_utf8_file_is_a_deserialization_error_and_left_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    let garbage: &[u8] = b"[\xC3\x28]";
    fs::write(&path, garbage).unwrap();

    let mut logger = logger_in(dir.path());
    let err = logger.report(&program_main()).unwrap_err();

    assert!(matches!(err, PerfLoggerError::Deserialization { .. }));
    assert_eq!(fs::read(&path).unwrap(), garbage);
}

#[test]
fn rewrite_drops_explicit_empty_metadata_of_earlier_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_log.json");
    fs::write(&path, r#"[{"Metadata":{},"Data":[]}]"#).unwrap();

    logger_in(dir.path()).report(&[]).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), r#"[{"Data":[]},{"Data":[]}]"#);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_report_appends_exactly_one_entry(
        runs in prop::collection::vec((0u32..3, 0u64..5_000_000), 1..8)
    ) {
        let dir = TempDir::new().unwrap();
        let mut logger = logger_in(dir.path());
        let mut snapshots: Vec<String> = Vec::new();

        for (i, (records, micros)) in runs.iter().enumerate() {
            let data: Vec<PerformanceData> = (0..*records)
                .map(|r| PerformanceData::new(
                    "Prop",
                    format!("call{}_{}", i, r),
                    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
                    Duration::from_micros(*micros),
                ))
                .collect();
            logger.add_metadata("run", i.to_string());
            logger.report(&data).unwrap();

            let entries = logger.read_entries().unwrap();
            prop_assert_eq!(entries.len(), i + 1);
            prop_assert_eq!(&entries[i].data, &data);

            // Earlier entries are never rewritten with different content.
            for (previous, snapshot) in entries.iter().zip(&snapshots) {
                prop_assert_eq!(&serde_json::to_string(previous).unwrap(), snapshot);
            }
            snapshots.push(serde_json::to_string(&entries[i]).unwrap());
        }
    }
}
