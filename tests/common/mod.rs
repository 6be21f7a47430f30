//! 协调器测试共用的替身实现
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use submission_grader::error::{AppError, AppResult, ExtractionError, PersistenceError};
use submission_grader::infrastructure::{ScratchStore, StagedFile, TempResourceManager};
use submission_grader::models::{FileInput, SubmissionStatus};
use submission_grader::orchestrator::{Capabilities, CoordinatorSettings, SubmissionCoordinator};
use submission_grader::services::{
    ContentExtractor, ContentUnderstanding, DocumentOcr, GradedFileRecord, GradingBackend,
    GradingClient, OcrPage, PersistenceBackend, ResultStore, TextLayerExtractor,
};

/// 内容里带这个标记时，文本层提取失败
pub const BROKEN_PDF: &str = "%BROKEN";
/// 内容里带这个标记时，评分模型返回无法解析的文本
pub const GARBAGE_MARKER: &str = "GARBAGE";
/// 内容里带这个标记时，评分调用失败
pub const GRADE_FAIL_MARKER: &str = "GRADE_FAIL";
/// 内容里带这个标记时，评分调用会挂起很久
pub const SLOW_MARKER: &str = "SLOW";

/// 统计 stage / release 次数的暂存实现
pub struct CountingScratch {
    inner: TempResourceManager,
    staged: AtomicUsize,
    released: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
}

impl CountingScratch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: TempResourceManager::new(root),
            staged: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn staged(&self) -> usize {
        self.staged.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// 所有暂存过的文件名
    pub fn storage_names(&self) -> HashSet<String> {
        self.paths
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

#[async_trait]
impl ScratchStore for CountingScratch {
    async fn stage(&self, input: &FileInput) -> AppResult<StagedFile> {
        let staged = self.inner.stage(input).await?;
        self.staged.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(staged.path.clone());
        Ok(staged)
    }

    async fn release(&self, staged: &StagedFile) -> AppResult<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(staged).await
    }
}

/// OCR 替身：名单里的文件失败，其余返回一页文本
#[derive(Default)]
pub struct FakeOcr {
    pub failing: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeOcr {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentOcr for FakeOcr {
    async fn ocr(&self, file_name: &str, document: &[u8]) -> AppResult<Vec<OcrPage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(file_name) {
            return Err(AppError::ocr_failed(file_name, "service unavailable"));
        }
        Ok(vec![OcrPage {
            index: 0,
            text: String::from_utf8_lossy(document).into_owned(),
        }])
    }
}

/// 文本层替身：带 `%BROKEN` 标记时失败，否则原样返回
pub struct FakeTextLayer;

impl TextLayerExtractor for FakeTextLayer {
    fn extract_pages(&self, document: &[u8]) -> AppResult<Vec<String>> {
        let text = String::from_utf8_lossy(document).into_owned();
        if text.contains(BROKEN_PDF) {
            return Err(ExtractionError::TextLayerFailed {
                detail: "no text layer".to_string(),
            }
            .into());
        }
        Ok(vec![text])
    }
}

/// 内容理解替身：原样返回
#[derive(Default)]
pub struct EchoUnderstanding {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ContentUnderstanding for EchoUnderstanding {
    async fn understand(&self, text: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_string())
    }
}

/// 评分替身：按内容里的标记决定行为，正常情况下给 8 分
#[derive(Default)]
pub struct FakeGrader {
    pub calls: AtomicUsize,
}

#[async_trait]
impl GradingBackend for FakeGrader {
    async fn grade_text(
        &self,
        content: &str,
        _criteria: &str,
        _points_available: f64,
    ) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if content.contains(SLOW_MARKER) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if content.contains(GRADE_FAIL_MARKER) {
            return Err(AppError::llm_api_failed("fake-grader", "upstream 503"));
        }
        if content.contains(GARBAGE_MARKER) {
            return Ok("I am not able to produce JSON today".to_string());
        }
        Ok(r#"<reasoning>fine</reasoning>
<response>{"results": [{"question": "Q1", "mistakes": [], "score": 8, "feedback": "good"}],
"totalScore": 8, "overallFeedback": "well done"}</response>"#
            .to_string())
    }
}

/// 持久化替身：记录所有写入和状态更新，名单里的文件写入失败
#[derive(Default)]
pub struct RecordingStore {
    pub failing_files: HashSet<String>,
    pub fail_status_updates: bool,
    /// 每次写入结果前等待的时间
    pub insert_delay: Option<Duration>,
    pub records: Mutex<Vec<GradedFileRecord>>,
    pub statuses: Mutex<Vec<SubmissionStatus>>,
}

impl RecordingStore {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing_files: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn slow_insert(delay: Duration) -> Self {
        Self {
            insert_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn persisted_files(&self) -> Vec<String> {
        let records = self.records.lock().unwrap();
        let mut names: Vec<String> = records.iter().map(|r| r.file_name.clone()).collect();
        names.sort();
        names
    }

    pub fn statuses(&self) -> Vec<SubmissionStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceBackend for RecordingStore {
    async fn insert_result(&self, record: &GradedFileRecord) -> AppResult<()> {
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_files.contains(&record.file_name) {
            return Err(rejected("insert rejected"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn update_submission_status(
        &self,
        _submission_id: &str,
        status: SubmissionStatus,
    ) -> AppResult<()> {
        self.statuses.lock().unwrap().push(status);
        if self.fail_status_updates {
            return Err(rejected("status update rejected"));
        }
        Ok(())
    }
}

fn rejected(detail: &str) -> AppError {
    PersistenceError::Other(detail.to_string()).into()
}

/// 一套装配好的替身
pub struct Harness {
    pub root: tempfile::TempDir,
    pub scratch: Arc<CountingScratch>,
    pub ocr: Arc<FakeOcr>,
    pub understanding: Arc<EchoUnderstanding>,
    pub grader: Arc<FakeGrader>,
    pub store: Arc<RecordingStore>,
    pub coordinator: SubmissionCoordinator,
}

impl Harness {
    pub fn new(ocr: FakeOcr, store: RecordingStore, settings: CoordinatorSettings) -> Self {
        let root = tempfile::tempdir().unwrap();
        let scratch = Arc::new(CountingScratch::new(root.path().join("scratch")));
        let ocr = Arc::new(ocr);
        let understanding = Arc::new(EchoUnderstanding::default());
        let grader = Arc::new(FakeGrader::default());
        let store = Arc::new(store);

        let capabilities = Capabilities {
            scratch: scratch.clone(),
            extractor: ContentExtractor::new(
                ocr.clone(),
                Arc::new(FakeTextLayer),
                understanding.clone(),
            ),
            grader: GradingClient::new(grader.clone()),
            store: ResultStore::new(store.clone()),
        };

        Self {
            root,
            scratch,
            ocr,
            understanding,
            grader,
            store,
            coordinator: SubmissionCoordinator::new(capabilities, settings),
        }
    }

    pub fn simple() -> Self {
        Self::new(
            FakeOcr::default(),
            RecordingStore::default(),
            CoordinatorSettings::default(),
        )
    }

    /// 暂存目录里剩下的文件数
    pub fn leftover_files(&self) -> usize {
        match std::fs::read_dir(self.root.path().join("scratch")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}
