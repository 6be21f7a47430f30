mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use common::{
    FakeOcr, Harness, RecordingStore, BROKEN_PDF, GARBAGE_MARKER, GRADE_FAIL_MARKER, SLOW_MARKER,
};
use submission_grader::error::{AppError, SubmissionError};
use submission_grader::models::{FileInput, SubmissionBatch, SubmissionStatus};
use submission_grader::orchestrator::CoordinatorSettings;

const CRITERIA: &str = "Q1 [10]: explain the water cycle";

fn batch(files: Vec<FileInput>) -> SubmissionBatch {
    SubmissionBatch::new("sub-42", CRITERIA, 10.0, files).unwrap()
}

#[tokio::test]
async fn one_failure_among_three_gives_partial() {
    // a.pdf: OCR 和文本层都失败；b.txt: 正常；c.txt: 保存失败
    let harness = Harness::new(
        FakeOcr::failing_for(&["a.pdf"]),
        RecordingStore::failing_for(&["c.txt"]),
        CoordinatorSettings::default(),
    );
    let files = vec![
        FileInput::from_bytes("a.pdf", format!("{} scanned pages", BROKEN_PDF)),
        FileInput::from_text("b.txt", "Evaporation, condensation, precipitation."),
        FileInput::from_text("c.txt", "Rain falls and flows back to the sea."),
    ];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Partial);
    assert_eq!(outcome.results.len(), 3);

    let a = &outcome.results[0];
    assert_eq!(a.file_name, "a.pdf");
    assert!(a.error.is_some());
    assert_eq!(a.grading.total_score, 0.0);

    let b = &outcome.results[1];
    assert!(b.is_success());
    assert_eq!(b.grading.total_score, 8.0);
    assert_eq!(b.grading.overall_feedback, "well done");

    // 保存失败不影响结果
    let c = &outcome.results[2];
    assert!(c.is_success());
    assert_eq!(c.grading.total_score, 8.0);

    assert_eq!(harness.store.persisted_files(), vec!["b.txt".to_string()]);
    assert_eq!(harness.scratch.staged(), 3);
    assert_eq!(harness.scratch.released(), 3);
    assert_eq!(harness.leftover_files(), 0);
}

#[tokio::test]
async fn all_successful_files_complete_the_submission() {
    let harness = Harness::simple();
    let files = (0..5)
        .map(|i| FileInput::from_text(format!("part{}.txt", i), "answer"))
        .collect();

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Completed);
    assert_eq!(outcome.results.len(), 5);
    assert_eq!(outcome.success_count(), 5);
    assert_eq!(harness.store.persisted_files().len(), 5);
    assert_eq!(
        harness.store.statuses(),
        vec![SubmissionStatus::Grading, SubmissionStatus::Completed]
    );
}

#[tokio::test]
async fn all_failed_files_fail_the_submission() {
    let harness = Harness::new(
        FakeOcr::failing_for(&["x.pdf", "y.pdf"]),
        RecordingStore::default(),
        CoordinatorSettings::default(),
    );
    let files = vec![
        FileInput::from_bytes("x.pdf", BROKEN_PDF),
        FileInput::from_bytes("y.pdf", BROKEN_PDF),
        FileInput::from_text("z.txt", GRADE_FAIL_MARKER),
    ];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Failed);
    assert!(outcome.results.iter().all(|r| r.error.is_some()));
    let grading_failure = &outcome.results[2].grading.criteria[0];
    assert_eq!(grading_failure.question, "Error in grading");
    assert_eq!(
        harness.store.statuses(),
        vec![SubmissionStatus::Grading, SubmissionStatus::Failed]
    );
    assert_eq!(harness.scratch.staged(), harness.scratch.released());
}

#[tokio::test]
async fn results_follow_input_order() {
    let harness = Harness::new(
        FakeOcr::default(),
        RecordingStore::default(),
        CoordinatorSettings {
            max_concurrent_files: 2,
            file_timeout: None,
        },
    );
    let names: Vec<String> = (0..8).map(|i| format!("file{}.md", i)).collect();
    let files = names
        .iter()
        .map(|n| FileInput::from_text(n.clone(), "text"))
        .collect();

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    let returned: Vec<String> = outcome
        .results
        .iter()
        .map(|r| r.file_name.clone())
        .collect();
    assert_eq!(returned, names);
}

#[tokio::test]
async fn batch_without_named_files_is_rejected_before_any_work() {
    let harness = Harness::simple();
    let files = vec![
        FileInput::from_text("", "orphan"),
        FileInput::from_text("   ", "orphan"),
    ];

    let err = assert_err!(harness.coordinator.process_submission(batch(files)).await);

    assert!(err.is_batch_rejection());
    assert!(matches!(
        err,
        AppError::Submission(SubmissionError::NoValidFiles)
    ));
    assert!(harness.store.statuses().is_empty());
    assert_eq!(harness.scratch.staged(), 0);
    assert_eq!(harness.grader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let harness = Harness::simple();

    let err = assert_err!(harness.coordinator.process_submission(batch(vec![])).await);

    assert!(matches!(
        err,
        AppError::Submission(SubmissionError::NoValidFiles)
    ));
    assert!(harness.store.statuses().is_empty());
    assert_eq!(harness.scratch.staged(), 0);
    assert_eq!(harness.grader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unnamed_entries_are_skipped() {
    let harness = Harness::simple();
    let files = vec![
        FileInput::from_text("", "orphan"),
        FileInput::from_text("kept.txt", "answer"),
    ];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].file_name, "kept.txt");
}

#[tokio::test]
async fn duplicate_names_get_distinct_scratch_paths() {
    let harness = Harness::simple();
    let files = vec![
        FileInput::from_text("essay.txt", "first draft"),
        FileInput::from_text("essay.txt", "second draft"),
    ];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Completed);
    let names = harness.scratch.storage_names();
    assert!(names.contains("essay.txt"));
    assert!(names.contains("essay_1.txt"));
    assert_eq!(harness.leftover_files(), 0);
}

#[tokio::test]
async fn deadline_marks_file_failed_and_still_releases_it() {
    let harness = Harness::new(
        FakeOcr::default(),
        RecordingStore::default(),
        CoordinatorSettings {
            max_concurrent_files: 4,
            file_timeout: Some(Duration::from_millis(200)),
        },
    );
    let files = vec![
        FileInput::from_text("slow.txt", format!("{} answer", SLOW_MARKER)),
        FileInput::from_text("fast.txt", "quick answer"),
    ];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Partial);
    assert!(outcome.results[0].error.is_some());
    assert_eq!(outcome.results[0].grading.total_score, 0.0);
    assert!(outcome.results[1].is_success());
    assert_eq!(harness.scratch.staged(), 2);
    assert_eq!(harness.scratch.released(), 2);
    assert_eq!(harness.leftover_files(), 0);
    assert_eq!(harness.store.persisted_files(), vec!["fast.txt"]);
}

#[tokio::test]
async fn slow_persistence_does_not_undo_a_finished_grade() {
    let harness = Harness::new(
        FakeOcr::default(),
        RecordingStore::slow_insert(Duration::from_millis(800)),
        CoordinatorSettings {
            max_concurrent_files: 4,
            file_timeout: Some(Duration::from_millis(300)),
        },
    );
    let files = vec![FileInput::from_text("graded.txt", "answer")];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Completed);
    let result = &outcome.results[0];
    assert!(result.is_success());
    assert_eq!(result.grading.total_score, 8.0);
    assert_eq!(harness.store.persisted_files(), vec!["graded.txt"]);
    assert_eq!(harness.scratch.released(), 1);
    assert_eq!(harness.leftover_files(), 0);
}

#[tokio::test]
async fn malformed_grading_response_counts_as_graded_at_half_credit() {
    let harness = Harness::simple();
    let files = vec![FileInput::from_text("g.txt", GARBAGE_MARKER)];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Completed);
    let result = &outcome.results[0];
    assert!(result.is_success());
    assert_eq!(result.grading.total_score, 5.0);
    let mistakes = &result.grading.criteria[0].mistakes;
    assert_eq!(mistakes, &vec!["Could not parse grading response"]);
    assert_eq!(harness.store.persisted_files(), vec!["g.txt".to_string()]);
}

#[tokio::test]
async fn empty_file_fails_alone_without_staging() {
    let harness = Harness::simple();
    let files = vec![
        FileInput::from_bytes("empty.txt", Vec::new()),
        FileInput::from_text("ok.txt", "answer"),
    ];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Partial);
    assert!(outcome.results[0].error.is_some());
    assert_eq!(harness.scratch.staged(), 1);
    assert_eq!(harness.scratch.released(), 1);
}

#[tokio::test]
async fn status_update_failure_does_not_fail_the_batch() {
    let store = RecordingStore {
        fail_status_updates: true,
        ..Default::default()
    };
    let harness = Harness::new(FakeOcr::default(), store, CoordinatorSettings::default());
    let files = vec![FileInput::from_text("a.txt", "answer")];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert_eq!(outcome.status, SubmissionStatus::Completed);
    assert_eq!(harness.store.statuses().len(), 2);
}

#[tokio::test]
async fn scanned_document_falls_back_to_text_layer() {
    let harness = Harness::new(
        FakeOcr::failing_for(&["scan.pdf"]),
        RecordingStore::default(),
        CoordinatorSettings::default(),
    );
    let files = vec![FileInput::from_bytes("scan.pdf", "text layer survives")];

    let outcome = assert_ok!(harness.coordinator.process_submission(batch(files)).await);

    assert!(outcome.results[0].is_success());
    assert_eq!(harness.ocr.calls.load(Ordering::SeqCst), 1);
    // 文档路径不会走内容理解
    assert_eq!(harness.understanding.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn process_files_validates_points() {
    let harness = Harness::simple();
    let files = vec![FileInput::from_text("a.txt", "answer")];

    let rejected = harness
        .coordinator
        .process_files(files, CRITERIA, "sub-1", 0.0)
        .await;
    let err = assert_err!(rejected);
    assert!(matches!(
        err,
        AppError::Submission(SubmissionError::InvalidPoints { .. })
    ));

    let files = vec![FileInput::from_text("a.txt", "answer")];
    let accepted = harness
        .coordinator
        .process_files(files, CRITERIA, "sub-1", 20.0)
        .await;
    let outcome = assert_ok!(accepted);
    assert_eq!(outcome.status, SubmissionStatus::Completed);
}
