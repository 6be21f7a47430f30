use anyhow::Result;
use submission_grader::app::App;
use submission_grader::config::Config;
use submission_grader::logger;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config, std::env::args().skip(1))?;
    app.run().await?;

    Ok(())
}
