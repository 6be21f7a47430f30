/// 日志工具模块
///
/// 提供批次日志格式化和输出的辅助函数
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrent`: 最大并发数
pub fn log_startup(max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 评分服务启动 - 多文件并发评分模式");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `submission_id`: 提交ID
/// - `file_count`: 有效文件数量
/// - `skipped`: 因文件名为空被过滤的数量
pub fn log_batch_start(submission_id: &str, file_count: usize, skipped: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始处理提交 {}", submission_id);
    info!("📄 文件数: {} (跳过无文件名条目: {})", file_count, skipped);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `submission_id`: 提交ID
/// - `success`: 成功数量
/// - `total`: 文件总数
/// - `status`: 最终状态
pub fn log_batch_complete(submission_id: &str, success: usize, total: usize, status: &str) {
    info!("{}", "─".repeat(60));
    info!("✓ 提交 {} 完成: 成功 {}/{}", submission_id, success, total);
    info!("📌 最终状态: {}", status);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
