//! 临时文件暂存 - 基础设施层
//!
//! 持有暂存目录，只暴露"暂存 / 释放"两个能力

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{AppResult, StagingError};
use crate::models::{ContentKind, FileInput};

/// 文件名中不安全的字符
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

/// 名称冲突时最多尝试的后缀数量
const MAX_SUFFIX_ATTEMPTS: usize = 10_000;

/// 已暂存的文件
///
/// 存储位置只属于创建它的那条流程。
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    /// 上传时的原始文件名
    pub original_name: String,
    /// 暂存文件的完整路径（存储句柄）
    pub path: PathBuf,
    pub content_kind: ContentKind,
}

impl StagedFile {
    /// 暂存区中的文件名
    pub fn storage_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 读取暂存内容
    pub async fn read(&self) -> AppResult<Vec<u8>> {
        fs::read(&self.path).await.map_err(|source| {
            StagingError::ReadFailed {
                path: self.path.display().to_string(),
                source,
            }
            .into()
        })
    }
}

/// 暂存能力
///
/// 每次成功的 `stage` 都必须对应一次 `release`。
#[async_trait]
pub trait ScratchStore: Send + Sync {
    async fn stage(&self, input: &FileInput) -> AppResult<StagedFile>;

    /// 幂等：文件已经不存在时也返回 Ok
    async fn release(&self, staged: &StagedFile) -> AppResult<()>;
}

/// 基于本地目录的暂存实现
pub struct TempResourceManager {
    root: PathBuf,
}

impl TempResourceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 在暂存目录下原子地占用一个不存在的文件名
    ///
    /// `create_new` 保证并发流程拿到的名字互不相同，冲突时按 `_1`、`_2` … 递增。
    async fn claim_path(&self, safe_name: &str) -> AppResult<(PathBuf, fs::File)> {
        let (stem, ext) = split_extension(safe_name);
        for attempt in 0..MAX_SUFFIX_ATTEMPTS {
            let candidate = if attempt == 0 {
                safe_name.to_string()
            } else {
                format!("{}_{}{}", stem, attempt, ext)
            };
            let path = self.root.join(&candidate);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(StagingError::WriteFailed {
                        path: path.display().to_string(),
                        source,
                    }
                    .into())
                }
            }
        }
        Err(StagingError::WriteFailed {
            path: self.root.join(safe_name).display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "没有可用的文件名"),
        }
        .into())
    }
}

#[async_trait]
impl ScratchStore for TempResourceManager {
    async fn stage(&self, input: &FileInput) -> AppResult<StagedFile> {
        let bytes = input.to_bytes()?;
        if bytes.is_empty() {
            return Err(StagingError::EmptyFile {
                file_name: input.file_name.clone(),
            }
            .into());
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StagingError::WriteFailed {
                path: self.root.display().to_string(),
                source,
            })?;

        let safe_name = sanitize_file_name(&input.file_name);
        let (path, mut file) = self.claim_path(&safe_name).await?;

        let write_result = async {
            file.write_all(&bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(source) = write_result {
            // 写入失败时不留下半截文件
            let _ = fs::remove_file(&path).await;
            return Err(StagingError::WriteFailed {
                path: path.display().to_string(),
                source,
            }
            .into());
        }

        debug!("已暂存 {} -> {}", input.file_name, path.display());

        Ok(StagedFile {
            original_name: input.file_name.clone(),
            content_kind: ContentKind::from_file_name(&input.file_name),
            path,
        })
    }

    async fn release(&self, staged: &StagedFile) -> AppResult<()> {
        match fs::remove_file(&staged.path).await {
            Ok(()) => {
                debug!("已释放暂存文件 {}", staged.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                warn!("释放暂存文件失败 {}: {}", staged.path.display(), source);
                Err(StagingError::WriteFailed {
                    path: staged.path.display().to_string(),
                    source,
                }
                .into())
            }
        }
    }
}

/// 清理文件名：去掉路径部分和不安全字符
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches(['.', '_']).trim_end_matches('_');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// 拆分为 (主名, 含点的扩展名)，后缀加在扩展名之前以保留类型信息
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
