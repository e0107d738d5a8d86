use anyhow::{Context, Result};
use clap::Parser;
use site_translation_cli::assets::StaticAssetCopier;
use site_translation_cli::config::{Cli, SiteTranslationConfig};
use site_translation_cli::error::TranslationError;
use site_translation_cli::ledger::ProgressLedger;
use site_translation_cli::pipeline::{RunPlan, RunReport, SitePipeline};
use site_translation_cli::stats::{format_duration, print_run_summary};
use site_translation_cli::translation_error;
use site_translation_cli::translator::{ChatCompletionTranslator, Translate};
use site_translation_cli::utils::init_logging;
use std::time::Instant;
use tracing::{error, info, warn};

/// 配置错误的退出码
const EXIT_CONFIG_ERROR: i32 = 2;
/// 运行失败的退出码
const EXIT_RUN_FAILED: i32 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    let config = SiteTranslationConfig::from_cli(&cli);
    let validation = if cli.check && !cli.dry_run {
        config.validate_service(true)
    } else {
        config.validate(!cli.dry_run)
    };
    if let Err(e) = validation {
        error!("❌ 配置错误: {}", e);
        std::process::exit(EXIT_CONFIG_ERROR);
    }

    if cli.dry_run {
        return dry_run(&config);
    }

    let translator = ChatCompletionTranslator::new(config.chat_config()?)
        .context("创建翻译客户端失败")?;

    if cli.check {
        info!("🔌 检查翻译服务: {}", translator.endpoint());
        match translator.check_connection().await {
            Ok(()) => {
                info!("✅ 翻译服务可用");
                return Ok(());
            }
            Err(e) => {
                error!("❌ 翻译服务不可用: {}", e);
                std::process::exit(EXIT_RUN_FAILED);
            }
        }
    }

    info!("🚀 启动站点翻译");
    info!("📂 源目录: {}", config.source_root().display());
    info!("📁 输出目录: {}", config.dest_root().display());
    info!("🌐 目标语言: {}", config.target_lang());

    let total_start = Instant::now();

    let outcome = run_pipeline(&config, translator).await;

    // 文档流水线失败时仍然复制静态资源
    let assets = StaticAssetCopier::new(
        config.source_root(),
        config.dest_root(),
        config.asset_folders().to_vec(),
    )
    .copy_all();
    if assets.has_failures() {
        warn!("⚠️  部分静态资源复制失败");
    }

    let total_duration = total_start.elapsed();

    match outcome {
        Ok(report) => {
            if cli.stats || cli.verbose {
                print_run_summary(&report, Some(&assets), total_duration);
            }

            if report.is_success() {
                info!(
                    "✅ 翻译完成！本次翻译 {} 个文档，总耗时: {}",
                    report.translated.len(),
                    format_duration(total_duration)
                );
            } else {
                error!(
                    "❌ {} 个文档翻译失败，重新运行将只处理未完成的文档",
                    report.failures.len()
                );
                std::process::exit(EXIT_RUN_FAILED);
            }
        }
        Err(e) => {
            error!("❌ 翻译失败: {}", e);
            error!("💡 已完成的文档已记录，修复问题后重新运行即可继续");
            std::process::exit(EXIT_RUN_FAILED);
        }
    }

    Ok(())
}

/// 加载进度日志并执行文档流水线
async fn run_pipeline(
    config: &SiteTranslationConfig,
    translator: ChatCompletionTranslator,
) -> Result<RunReport, TranslationError> {
    let ledger = ProgressLedger::load(config.ledger_path())?;
    if !ledger.is_empty() {
        info!("📒 进度日志中已有 {} 个文档", ledger.len());
    }

    let mut pipeline = SitePipeline::new(translator, ledger, config.pipeline_options())
        .with_validator(config.validator());
    pipeline.run().await
}

/// 列出待翻译与已完成的文档，不调用翻译服务
fn dry_run(config: &SiteTranslationConfig) -> Result<()> {
    let ledger = ProgressLedger::load(config.ledger_path()).context("读取进度日志失败")?;
    let plan = DryRunTranslator::plan(config, ledger)?;

    for done in &plan.already_done {
        println!("✔ {}", done);
    }
    for task in &plan.pending {
        println!("… {} -> {}", task.relative, task.destination.display());
    }

    info!(
        "📋 共 {} 个文档: 待翻译 {} 个，已完成 {} 个",
        plan.documents_found(),
        plan.pending.len(),
        plan.already_done.len()
    );
    Ok(())
}

/// 仅用于生成运行计划的空翻译服务
struct DryRunTranslator;

impl DryRunTranslator {
    fn plan(config: &SiteTranslationConfig, ledger: ProgressLedger) -> Result<RunPlan> {
        let pipeline = SitePipeline::new(DryRunTranslator, ledger, config.pipeline_options());
        pipeline.plan().context("遍历源目录失败")
    }
}

#[async_trait::async_trait]
impl Translate for DryRunTranslator {
    async fn translate(
        &self,
        _document: &str,
        _target_language: &str,
    ) -> Result<String, TranslationError> {
        Err(translation_error!(service, "dry-run 模式不调用翻译服务"))
    }
}
