//! 站点翻译流水线
//!
//! 对源目录下每个尚未记录在进度日志中的 `.html` 文档依次执行：
//! 读取 → 调用翻译服务 → 校验译文 → 写入镜像路径 → 记录进度。
//!
//! 单个文档的状态流转：
//! `Pending → Requested → Validated → Persisted`（成功），
//! `Requested → Rejected` / `Requested → ServiceFailed`（失败），
//! 已在进度日志中的文档直接进入 `SkippedAlreadyDone`，不调用翻译服务。
//!
//! 文档整篇读入内存，不做流式处理；HTML页面的体量下这是可以接受的上限。

// 标准库导入
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// 第三方crate导入
use futures::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

// 本地模块导入
use crate::api_constants::{snippet, validation_config};
use crate::error::{Result, TranslationError};
use crate::ledger::ProgressLedger;
use crate::translator::Translate;
use crate::utils::resolve_path;
use crate::validator::ResponseValidator;
use crate::walker::{walk, EntryKind, RelativePath};

/// 单个文档失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// 任何失败立即终止整个运行
    #[default]
    Abort,
    /// 记录失败并继续处理后续文档
    Continue,
}

/// 翻译服务调用的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 首次调用之外的最大重试次数
    pub max_retries: usize,
    /// 第 n 次重试前等待 `delay × n`
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_secs(2),
        }
    }
}

/// 流水线运行参数
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 源站点目录
    pub source_root: PathBuf,
    /// 输出目录
    pub dest_root: PathBuf,
    /// 目标语言
    pub target_lang: String,
    /// 失败策略
    pub failure_policy: FailurePolicy,
    /// 重试策略
    pub retry: RetryPolicy,
    /// 同时处理的文档数量
    pub workers: usize,
}

/// 文档处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Requested,
    Validated,
    Persisted,
    SkippedAlreadyDone,
    Rejected,
    ServiceFailed,
    FileSystemFailed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileState::Pending => "待处理",
            FileState::Requested => "已请求",
            FileState::Validated => "已校验",
            FileState::Persisted => "已保存",
            FileState::SkippedAlreadyDone => "已跳过",
            FileState::Rejected => "译文被拒绝",
            FileState::ServiceFailed => "翻译服务失败",
            FileState::FileSystemFailed => "文件操作失败",
        };
        f.write_str(label)
    }
}

/// 待翻译文档
#[derive(Debug, Clone)]
pub struct DocumentTask {
    /// 相对路径
    pub relative: RelativePath,
    /// 源文件
    pub source: PathBuf,
    /// 镜像输出文件
    pub destination: PathBuf,
}

/// 一次遍历得到的处理计划
#[derive(Debug, Default)]
pub struct RunPlan {
    /// 需要翻译的文档
    pub pending: Vec<DocumentTask>,
    /// 已在进度日志中的文档
    pub already_done: Vec<RelativePath>,
    /// 遍历到的目录数量
    pub directories: usize,
    /// 遍历到的非文档文件数量
    pub assets: usize,
}

impl RunPlan {
    /// 发现的文档总数
    pub fn documents_found(&self) -> usize {
        self.pending.len() + self.already_done.len()
    }
}

/// 单个文档的失败记录
#[derive(Debug)]
pub struct FailedDocument {
    /// 相对路径
    pub path: RelativePath,
    /// 失败时的终态
    pub state: FileState,
    /// 底层错误
    pub error: TranslationError,
}

/// 运行结果汇总
#[derive(Debug, Default)]
pub struct RunReport {
    /// 发现的文档总数
    pub documents_found: usize,
    /// 本次翻译并保存的文档
    pub translated: Vec<RelativePath>,
    /// 因已完成而跳过的文档数量
    pub skipped: usize,
    /// 失败的文档（仅 `continue` 策略下出现）
    pub failures: Vec<FailedDocument>,
    /// 总耗时
    pub elapsed: Duration,
}

impl RunReport {
    /// 是否全部成功
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct DocumentFailure {
    state: FileState,
    error: TranslationError,
}

impl DocumentFailure {
    fn new(state: FileState, error: TranslationError) -> Self {
        Self { state, error }
    }
}

/// 站点翻译流水线
pub struct SitePipeline<T: Translate> {
    translator: T,
    validator: ResponseValidator,
    ledger: ProgressLedger,
    options: PipelineOptions,
}

impl<T: Translate> SitePipeline<T> {
    /// 使用默认校验器创建流水线
    pub fn new(translator: T, ledger: ProgressLedger, options: PipelineOptions) -> Self {
        Self {
            translator,
            validator: ResponseValidator::default(),
            ledger,
            options,
        }
    }

    /// 替换译文校验器
    pub fn with_validator(mut self, validator: ResponseValidator) -> Self {
        self.validator = validator;
        self
    }

    /// 当前进度日志
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// 翻译服务
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// 运行参数
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// 遍历源目录，划分待翻译与已完成的文档
    ///
    /// 每次运行都重新遍历，不缓存文件列表。输出目录位于源目录内时整体跳过。
    pub fn plan(&self) -> Result<RunPlan> {
        let source_root = self.options.source_root.canonicalize().map_err(|source| {
            TranslationError::FileOperation {
                path: self.options.source_root.clone(),
                operation: "打开源目录".to_string(),
                source,
            }
        })?;
        let excluded = nested_dest_root(&source_root, &self.options.dest_root);
        if let Some(excluded) = &excluded {
            debug!("输出目录位于源目录内，遍历时跳过: {}", excluded.display());
        }

        let mut plan = RunPlan::default();
        for entry in walk(&source_root, excluded.as_deref()) {
            let entry = entry?;
            match entry.kind {
                EntryKind::Directory => plan.directories += 1,
                EntryKind::Asset => plan.assets += 1,
                EntryKind::Document if self.ledger.contains(&entry.relative) => {
                    plan.already_done.push(entry.relative);
                }
                EntryKind::Document => {
                    debug!("[{}] {}", FileState::Pending, entry.relative);
                    let destination = entry.relative.under(&self.options.dest_root);
                    plan.pending.push(DocumentTask {
                        relative: entry.relative,
                        source: entry.path,
                        destination,
                    });
                }
            }
        }

        debug!(
            "遍历完成: {} 个目录, {} 个待翻译, {} 个已完成, {} 个其他文件",
            plan.directories,
            plan.pending.len(),
            plan.already_done.len(),
            plan.assets
        );
        Ok(plan)
    }

    /// 执行一次完整的翻译运行
    ///
    /// `abort` 策略下第一个失败的文档会终止运行并返回带相对路径的错误；
    /// 并发处理中的其他文档会先处理完并记录。
    /// 已经保存的文档保留在进度日志中，下次运行从中断处继续。
    pub async fn run(&mut self) -> Result<RunReport> {
        let started = Instant::now();
        let plan = self.plan()?;

        for done in &plan.already_done {
            info!("✅ {}: {}", FileState::SkippedAlreadyDone, done);
        }

        let mut report = RunReport {
            documents_found: plan.documents_found(),
            skipped: plan.already_done.len(),
            ..Default::default()
        };

        info!(
            "📂 共发现 {} 个文档，待翻译 {} 个",
            report.documents_found,
            plan.pending.len()
        );

        let translator = &self.translator;
        let validator = &self.validator;
        let options = &self.options;
        // 终止后尚未开始的文档直接跳过
        let aborted = AtomicBool::new(false);
        let aborted = &aborted;
        let mut first_error: Option<TranslationError> = None;

        // 进度日志只在这个循环里写入，并发处理时也保持单一写入者
        let mut outcomes = stream::iter(plan.pending)
            .map(move |task| async move {
                if aborted.load(Ordering::SeqCst) {
                    return (task, None);
                }
                let outcome = process_document(translator, validator, options, &task).await;
                (task, Some(outcome))
            })
            .buffer_unordered(options.workers.max(1));

        // 终止时仍要等已在处理中的文档结束，已写入的文件必须记入进度日志
        while let Some((task, outcome)) = outcomes.next().await {
            match outcome {
                None => debug!("终止后跳过: {}", task.relative),
                Some(Ok(())) => {
                    self.ledger.record_and_persist(task.relative.clone())?;
                    info!("💾 {}: {}", FileState::Persisted, task.destination.display());
                    report.translated.push(task.relative);
                }
                Some(Err(failure)) => {
                    error!("❌ [{}] {}: {}", failure.state, task.relative, failure.error);
                    match options.failure_policy {
                        FailurePolicy::Abort => {
                            aborted.store(true, Ordering::SeqCst);
                            if first_error.is_none() {
                                first_error =
                                    Some(failure.error.for_document(task.relative.as_str()));
                            }
                        }
                        FailurePolicy::Continue => report.failures.push(FailedDocument {
                            path: task.relative,
                            state: failure.state,
                            error: failure.error,
                        }),
                    }
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}

/// 处理单个文档，成功时输出文件已写入磁盘
async fn process_document<T: Translate>(
    translator: &T,
    validator: &ResponseValidator,
    options: &PipelineOptions,
    task: &DocumentTask,
) -> std::result::Result<(), DocumentFailure> {
    let document = tokio::fs::read_to_string(&task.source)
        .await
        .map_err(|source| {
            DocumentFailure::new(
                FileState::FileSystemFailed,
                TranslationError::FileOperation {
                    path: task.source.clone(),
                    operation: "读取".to_string(),
                    source,
                },
            )
        })?;

    info!("🌐 翻译中: {} ({} 字节)", task.relative, document.len());
    let raw = request_with_retry(translator, options, &task.relative, &document)
        .await
        .map_err(|e| DocumentFailure::new(FileState::ServiceFailed, e))?;

    let translated = validator.validate(&raw).map_err(|reason| {
        error!(
            "🚫 译文被拒绝 [{}]: {}\n{}",
            task.relative,
            reason,
            snippet(&raw, validation_config::REJECTED_SNIPPET_CHARS)
        );
        DocumentFailure::new(
            FileState::Rejected,
            TranslationError::ValidationRejected {
                reason,
                response: raw.clone(),
            },
        )
    })?;
    debug!("[{}] {}", FileState::Validated, task.relative);

    write_document(&task.destination, &translated)
        .await
        .map_err(|e| DocumentFailure::new(FileState::FileSystemFailed, e))
}

/// 调用翻译服务，对临时性错误按线性退避重试
async fn request_with_retry<T: Translate>(
    translator: &T,
    options: &PipelineOptions,
    relative: &RelativePath,
    document: &str,
) -> Result<String> {
    let max_attempts = options.retry.max_retries + 1;
    let mut attempt = 1;

    loop {
        debug!("[{}] {} (第 {} 次)", FileState::Requested, relative, attempt);
        match translator.translate(document, &options.target_lang).await {
            Ok(text) => {
                if attempt > 1 {
                    info!("✅ 重试成功: {}", relative);
                }
                return Ok(text);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!("❌ 翻译失败 (尝试 {}/{}): {}", attempt, max_attempts, e);
                let delay = options.retry.delay * attempt as u32;
                info!("⏳ 等待 {:?} 后重试...", delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 写入译文并刷盘，必要时创建输出目录
async fn write_document(destination: &Path, content: &str) -> Result<()> {
    let io_error = |operation: &str, source: std::io::Error| TranslationError::FileOperation {
        path: destination.to_path_buf(),
        operation: operation.to_string(),
        source,
    };

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| TranslationError::FileOperation {
                path: parent.to_path_buf(),
                operation: "创建目录".to_string(),
                source,
            })?;
    }

    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| io_error("创建", e))?;
    file.write_all(content.as_bytes())
        .await
        .map_err(|e| io_error("写入", e))?;
    file.flush().await.map_err(|e| io_error("写入", e))?;
    file.sync_all().await.map_err(|e| io_error("刷盘", e))?;

    Ok(())
}

/// 输出目录严格位于源目录之内时返回其规范化路径
fn nested_dest_root(source_root: &Path, dest_root: &Path) -> Option<PathBuf> {
    let dest = resolve_path(dest_root);
    (dest != source_root && dest.starts_with(source_root)).then_some(dest)
}
