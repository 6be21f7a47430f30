use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{parse_total_points, FileInput, SubmissionBatch};
use crate::orchestrator::SubmissionCoordinator;
use crate::utils::logging::log_startup;

const USAGE: &str =
    "用法: submission_grader <submission-id> <criteria-file> <file>... [--points N]";

/// 命令行参数
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub submission_id: String,
    pub criteria_file: PathBuf,
    pub files: Vec<PathBuf>,
    pub points: Option<String>,
}

impl CliArgs {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut points = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == "--points" {
                points = Some(args.next().context("--points 需要一个数值")?);
            } else if let Some(value) = arg.strip_prefix("--points=") {
                points = Some(value.to_string());
            } else {
                positional.push(arg);
            }
        }

        if positional.len() < 3 {
            bail!("{}", USAGE);
        }
        let mut positional = positional.into_iter();
        let submission_id = positional.next().unwrap_or_default();
        let criteria_file = PathBuf::from(positional.next().unwrap_or_default());
        let files = positional.map(PathBuf::from).collect();

        Ok(Self {
            submission_id,
            criteria_file,
            files,
            points,
        })
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    args: CliArgs,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, args: impl IntoIterator<Item = String>) -> Result<Self> {
        let args = CliArgs::parse(args)?;
        log_startup(config.max_concurrent_files);
        Ok(Self { config, args })
    }

    /// 运行应用主逻辑：读文件 → 评分 → 输出 JSON
    pub async fn run(&self) -> Result<()> {
        let criteria_file = &self.args.criteria_file;
        let criteria = tokio::fs::read_to_string(criteria_file)
            .await
            .with_context(|| format!("读取评分标准失败: {}", criteria_file.display()))?;
        let points = parse_total_points(
            self.args.points.as_deref(),
            self.config.default_total_points,
        )?;

        let files = load_files(&self.args.files).await?;
        info!("📁 读取到 {} 个文件", files.len());

        let batch = SubmissionBatch::new(&self.args.submission_id, criteria, points, files)?;
        let coordinator = SubmissionCoordinator::from_config(&self.config);
        let outcome = coordinator.process_submission(batch).await?;

        println!("{}", serde_json::to_string_pretty(&outcome)?);
        Ok(())
    }
}

/// 读取待评分文件，文件名取路径的最后一段
async fn load_files(paths: &[PathBuf]) -> Result<Vec<FileInput>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("读取文件失败: {}", path.display()))?;
        let file_name = display_name(path);
        if file_name.is_empty() {
            warn!("⚠️ 无法确定文件名: {}", path.display());
        }
        files.push(FileInput::from_bytes(file_name, bytes));
    }
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
