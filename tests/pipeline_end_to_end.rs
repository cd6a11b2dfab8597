use std::cell::Cell;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use metaclean::artifacts::{read_clean_events, read_identity_table, read_user_index};
use metaclean::{
    ArchiveFetcher, CleanEvent, DatasetConfig, HttpFetcher, PipelineError, ProcessingProfile,
    UserIndex, process_dataset, process_datasets,
};
use tempfile::tempdir;
use zip::ZipWriter;
use zip::write::FileOptions;

const T1: i64 = 1_483_351_200; // 2017-01-02 10:00:00
const T3: i64 = 1_483_608_600; // 2017-01-05 09:30:00
const T6: i64 = 1_485_936_000; // 2017-02-01 08:00:00

const SEATTLE_CSV: &str = "\
sender,to,cc,bcc,time,subject
ann@x.gov <Ann>,bob@x.gov;carl@x.gov,,,2017-01-02 10:00:00,hi
bob@x.gov,ann@x.gov,carl@x.gov,,2017-01-02 10:00:00,re
carl@x.gov,ann@x.gov,,,2017-01-05 09:30:00,update
carl@x.gov,ann@x.gov,,,2016-12-01 09:30:00,too early
nan,ann@x.gov,,,2017-01-06 09:30:00,no sender
ann@x.gov,bob@x.gov,,,2017-02-01 08:00:00,one
ann@x.gov,bob@x.gov,,,2017-02-01 08:00:00,two
";

/// Fails every fetch and counts attempts.
#[derive(Default)]
struct OfflineFetcher {
    attempts: Cell<usize>,
}

impl ArchiveFetcher for OfflineFetcher {
    fn fetch(&self, url: &str, _target: &Path) -> Result<u64, PipelineError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(PipelineError::Download {
            url: url.to_string(),
            reason: "offline".to_string(),
        })
    }
}

fn stage_archive(data_dir: &Path, dataset: &str, entry: &str, csv: &str) {
    let dir = data_dir.join(dataset);
    fs::create_dir_all(&dir).unwrap();
    let mut zip = ZipWriter::new(File::create(dir.join("raw.zip")).unwrap());
    zip.start_file(entry, FileOptions::<'_, ()>::default()).unwrap();
    zip.write_all(csv.as_bytes()).unwrap();
    zip.finish().unwrap();
}

fn user(user: u32, counterparts: &[u32], timestamps: &[i64]) -> UserIndex {
    UserIndex {
        user,
        counterparts: counterparts.to_vec(),
        timestamps: timestamps.to_vec(),
    }
}

#[test]
fn expanded_run_writes_every_artifact() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);
    let fetcher = OfflineFetcher::default();

    let run = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &ProcessingProfile::expanded(),
        &fetcher,
    )
    .unwrap();
    assert_eq!(fetcher.attempts.get(), 0);

    let report = run.clean_report.unwrap();
    assert_eq!(report.initial_rows, 7);
    assert_eq!(report.expanded_rows, 8);
    assert_eq!(report.valid_senders, 7);
    assert_eq!(report.valid_times, 7);
    assert_eq!(report.final_rows, 6);

    let dir = temp.path().join("seattle");
    let users = read_identity_table(&dir.join("users.csv")).unwrap();
    let names: Vec<&str> = users.iter().map(|(_, name)| name).collect();
    assert_eq!(names, vec!["ann@x.gov", "bob@x.gov", "carl@x.gov"]);

    let events = read_clean_events(&dir.join("clean.csv")).unwrap();
    let event = |sender, receiver, submit| CleanEvent {
        sender,
        receiver,
        submit,
    };
    assert_eq!(
        events,
        vec![
            event(0, 1, T1),
            event(0, 2, T1),
            event(1, 0, T1),
            event(2, 0, T3),
            event(0, 1, T6),
            event(0, 1, T6),
        ]
    );

    let index = read_user_index(&dir.join("processed.json")).unwrap();
    assert_eq!(
        index,
        vec![
            user(0, &[1, 2, 1, 1], &[T1, T1, T6, T6]),
            user(1, &[0], &[T1]),
            user(2, &[0], &[T3]),
        ]
    );
    assert_eq!(run.indexes[0].users, 3);
}

#[test]
fn second_run_reuses_artifacts_without_network() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);
    let profile = ProcessingProfile::expanded();
    let dataset = DatasetConfig::seattle();

    process_dataset(temp.path(), &dataset, &profile, &OfflineFetcher::default()).unwrap();
    let dir = temp.path().join("seattle");
    let snapshot = |name: &str| fs::read(dir.join(name)).unwrap();
    let clean = snapshot("clean.csv");
    let users = snapshot("users.csv");
    let processed = snapshot("processed.json");

    // An unreachable URL proves the archive is never requested again.
    let unreachable = dataset.clone().with_url("http://127.0.0.1:9/seattle.zip");
    let rerun = process_dataset(temp.path(), &unreachable, &profile, &HttpFetcher).unwrap();
    assert!(rerun.fully_cached());
    assert_eq!(snapshot("clean.csv"), clean);
    assert_eq!(snapshot("users.csv"), users);
    assert_eq!(snapshot("processed.json"), processed);
}

#[test]
fn point_to_point_run_uses_suffixed_artifacts() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);

    let run = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &ProcessingProfile::point_to_point(),
        &OfflineFetcher::default(),
    )
    .unwrap();
    let report = run.clean_report.unwrap();
    assert_eq!(report.expanded_rows, 6);
    assert_eq!(report.valid_copies, 5);
    assert_eq!(report.final_rows, 3);

    let dir = temp.path().join("seattle");
    assert!(!dir.join("clean.csv").exists());
    let users = read_identity_table(&dir.join("users_s.csv")).unwrap();
    let names: Vec<&str> = users.iter().map(|(_, name)| name).collect();
    assert_eq!(names, vec!["carl@x.gov", "ann@x.gov", "bob@x.gov"]);

    let index = read_user_index(&dir.join("processed_s.json")).unwrap();
    assert_eq!(
        index,
        vec![user(0, &[1], &[T3]), user(1, &[2, 2], &[T6, T6 + 1])]
    );
    let stats = run.indexes[0].tie_break.unwrap();
    assert_eq!(stats.adjusted, 1);
    assert_eq!(stats.max_drift, 1);
}

#[test]
fn directional_run_writes_inbound_and_outbound_indexes() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);

    let run = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &ProcessingProfile::directional(),
        &OfflineFetcher::default(),
    )
    .unwrap();
    assert_eq!(run.indexes.len(), 2);

    let dir = temp.path().join("seattle");
    let senders = read_identity_table(&dir.join("senders.csv")).unwrap();
    let receivers = read_identity_table(&dir.join("receivers.csv")).unwrap();
    let sender_names: Vec<&str> = senders.iter().map(|(_, name)| name).collect();
    let receiver_names: Vec<&str> = receivers.iter().map(|(_, name)| name).collect();
    assert_eq!(sender_names, vec!["ann@x.gov", "bob@x.gov", "carl@x.gov"]);
    assert_eq!(receiver_names, vec!["bob@x.gov", "carl@x.gov", "ann@x.gov"]);

    let events = read_clean_events(&dir.join("clean_split.csv")).unwrap();
    assert!(events.iter().all(|e| (e.sender as usize) < senders.len()));
    assert!(events.iter().all(|e| (e.receiver as usize) < receivers.len()));

    let outbound = read_user_index(&dir.join("senders_processed.json")).unwrap();
    assert_eq!(
        outbound,
        vec![
            user(0, &[0, 1, 0, 0], &[T1, T1 + 1, T6, T6 + 1]),
            user(1, &[2], &[T1]),
            user(2, &[2], &[T3]),
        ]
    );
    let inbound = read_user_index(&dir.join("receivers_processed.json")).unwrap();
    assert_eq!(
        inbound,
        vec![
            user(0, &[0, 0, 0], &[T1, T6, T6 + 1]),
            user(1, &[0], &[T1]),
            user(2, &[1, 2], &[T1, T3]),
        ]
    );
}

#[test]
fn activity_band_drops_outlier_users() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);
    let band = metaclean::ActivityBand::new(0.0, 50.0).unwrap();
    let profile = ProcessingProfile::expanded().with_activity(Some(band));

    let run = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &profile,
        &OfflineFetcher::default(),
    )
    .unwrap();
    // Counts are [4, 1, 1]; the median is 1, so ann is dropped.
    let index = read_user_index(&run.indexes[0].path).unwrap();
    let kept: Vec<u32> = index.iter().map(|u| u.user).collect();
    assert_eq!(kept, vec![1, 2]);
}

#[test]
fn filtered_and_unfiltered_indexes_are_cached_separately() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);
    let dataset = DatasetConfig::seattle();
    let band = metaclean::ActivityBand::new(0.0, 50.0).unwrap();
    let filtered = ProcessingProfile::expanded().with_activity(Some(band));

    let first = process_dataset(temp.path(), &dataset, &filtered, &OfflineFetcher::default())
        .unwrap();
    assert_eq!(first.indexes[0].users, 2);

    let full = process_dataset(
        temp.path(),
        &dataset,
        &ProcessingProfile::expanded(),
        &OfflineFetcher::default(),
    )
    .unwrap();
    assert!(full.clean_report.is_none());
    assert!(!full.indexes[0].cached);
    assert_eq!(full.indexes[0].users, 3);
    assert_ne!(full.indexes[0].path, first.indexes[0].path);
    assert_eq!(read_user_index(&first.indexes[0].path).unwrap().len(), 2);
}

#[test]
fn fully_filtered_dataset_writes_header_only_clean_table() {
    let temp = tempdir().unwrap();
    stage_archive(
        temp.path(),
        "seattle",
        "raw.csv",
        "sender,to,cc,bcc,time
nan,bob@x.gov,,,2017-01-02 10:00:00
",
    );
    let run = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &ProcessingProfile::expanded(),
        &OfflineFetcher::default(),
    )
    .unwrap();
    assert_eq!(run.clean_report.unwrap().final_rows, 0);
    assert_eq!(
        fs::read_to_string(&run.paths.clean).unwrap(),
        "sender,receiver,submit\n"
    );
    assert!(read_user_index(&run.indexes[0].path).unwrap().is_empty());
}

#[test]
fn non_utf8_cells_do_not_abort_the_run() {
    let temp = tempdir().unwrap();
    let dir = temp.path().join("seattle");
    fs::create_dir_all(&dir).unwrap();
    let mut csv = b"sender,to,cc,bcc,time,subject\n".to_vec();
    csv.extend_from_slice(b"ann@x.gov,bob@x.gov,,,2017-01-02 10:00:00,caf\xE9\n");
    let mut zip = ZipWriter::new(File::create(dir.join("raw.zip")).unwrap());
    zip.start_file("raw.csv", FileOptions::<'_, ()>::default()).unwrap();
    zip.write_all(&csv).unwrap();
    zip.finish().unwrap();

    let run = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &ProcessingProfile::expanded(),
        &OfflineFetcher::default(),
    )
    .unwrap();
    assert_eq!(run.clean_report.unwrap().final_rows, 1);
}

#[test]
fn missing_archive_without_network_fails() {
    let temp = tempdir().unwrap();
    let fetcher = OfflineFetcher::default();
    let err = process_dataset(
        temp.path(),
        &DatasetConfig::enron(),
        &ProcessingProfile::expanded(),
        &fetcher,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Download { .. }));
    assert_eq!(fetcher.attempts.get(), 1);
    assert!(!temp.path().join("enron").join("clean.csv").exists());
}

#[test]
fn missing_source_column_is_reported() {
    let temp = tempdir().unwrap();
    stage_archive(
        temp.path(),
        "seattle",
        "raw.csv",
        "sender,to,cc,time\na,b,,2017-01-02 10:00:00\n",
    );
    let err = process_dataset(
        temp.path(),
        &DatasetConfig::seattle(),
        &ProcessingProfile::expanded(),
        &OfflineFetcher::default(),
    )
    .unwrap_err();
    match err {
        PipelineError::MissingColumn { column, .. } => assert_eq!(column, "bcc"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn both_datasets_run_in_order() {
    let temp = tempdir().unwrap();
    stage_archive(temp.path(), "seattle", "raw.csv", SEATTLE_CSV);
    stage_archive(
        temp.path(),
        "enron",
        "emails.csv",
        "From,To,X-cc,X-bcc,Date\n\
         [jeff.skilling],\"[ken.lay], [andy.fastow]\",,,2001-05-14 16:39:00-07:00\n",
    );

    let runs = process_datasets(
        temp.path(),
        &[DatasetConfig::enron(), DatasetConfig::seattle()],
        &ProcessingProfile::expanded(),
        &OfflineFetcher::default(),
    )
    .unwrap();
    let names: Vec<&str> = runs.iter().map(|run| run.dataset.as_str()).collect();
    assert_eq!(names, vec!["enron", "seattle"]);

    let enron_users = read_identity_table(&temp.path().join("enron/users.csv")).unwrap();
    let enron_names: Vec<&str> = enron_users.iter().map(|(_, name)| name).collect();
    assert_eq!(enron_names, vec!["jeff.skilling", "ken.lay", "andy.fastow"]);
    let enron_index = read_user_index(&temp.path().join("enron/processed.json")).unwrap();
    assert_eq!(enron_index, vec![user(0, &[1, 2], &[989_883_540, 989_883_540])]);
}
