//! 配置管理模块
//!
//! 提供CLI参数解析和站点翻译配置管理功能。
//! 每个参数都可以通过同名环境变量提供，启动时会先加载当前目录下的 `.env`。

// 标准库导入
use std::path::{Path, PathBuf};
use std::time::Duration;

// 第三方crate导入
use clap::Parser;

// 本地模块导入
use crate::api_constants::{api_config, is_valid_api_url, site_config, validation_config};
use crate::error::Result;
use crate::pipeline::{FailurePolicy, PipelineOptions, RetryPolicy};
use crate::translation_error;
use crate::translator::ChatCompletionConfig;
use crate::utils::{generate_dest_root, is_safe_folder_name, resolve_path, validate_source_root};
use crate::validator::ResponseValidator;

/// 站点翻译配置结构体
///
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use site_translation_cli::config::SiteTranslationConfig;
///
/// let config = SiteTranslationConfig::new()
///     .target_language("Spanish")
///     .with_source_root("site")
///     .with_dest_root("translated-sites/es")
///     .with_api_key("sk-test")
///     .with_max_retries(2);
///
/// assert_eq!(config.ledger_path().file_name().unwrap(), "translated-files.json");
/// ```
#[derive(Debug, Clone)]
pub struct SiteTranslationConfig {
    /// 目标语言（语言名称或代码，如 ms、Spanish）
    target_lang: String,
    /// 翻译服务基础地址
    api_url: String,
    /// 模型标识
    model: String,
    /// API密钥
    api_key: Option<String>,
    /// 源站点目录
    source_root: PathBuf,
    /// 输出目录
    dest_root: PathBuf,
    /// 需要原样复制的静态资源目录
    asset_folders: Vec<String>,
    /// 失败策略
    failure_policy: FailurePolicy,
    /// 最大重试次数
    max_retries: usize,
    /// 重试间隔基数
    retry_delay: Duration,
    /// 并发文档数量
    workers: usize,
    /// 单次请求超时
    request_timeout: Duration,
    /// 译文最小字符数
    min_response_chars: usize,
}

impl SiteTranslationConfig {
    /// 创建新的配置实例
    ///
    /// 返回具有默认值的配置实例：
    /// - 目标语言: 马来语 ("ms")
    /// - 源目录: `site`，输出目录: `translated-sites/ms`
    /// - 静态资源目录: `src`
    /// - 失败策略: 立即终止，不重试，顺序处理
    pub fn new() -> Self {
        Self {
            target_lang: site_config::DEFAULT_TARGET_LANG.to_string(),
            api_url: api_config::DEFAULT_API_URL.to_string(),
            model: api_config::DEFAULT_MODEL.to_string(),
            api_key: None,
            source_root: PathBuf::from(site_config::DEFAULT_SOURCE_DIR),
            dest_root: PathBuf::from(site_config::DEFAULT_OUTPUT_ROOT)
                .join(site_config::DEFAULT_TARGET_LANG),
            asset_folders: parse_folder_list(site_config::DEFAULT_ASSET_FOLDERS),
            failure_policy: FailurePolicy::Abort,
            max_retries: site_config::DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(site_config::DEFAULT_RETRY_DELAY_SECONDS),
            workers: site_config::DEFAULT_WORKERS,
            request_timeout: Duration::from_secs(api_config::REQUEST_TIMEOUT_SECONDS),
            min_response_chars: validation_config::MIN_RESPONSE_CHARS,
        }
    }

    /// 从命令行参数构建配置
    pub fn from_cli(cli: &Cli) -> Self {
        let dest_root = generate_dest_root(&cli.output_root, &cli.dest, &cli.lang);

        let mut config = Self::new()
            .target_language(&cli.lang)
            .with_api_url(&cli.api)
            .with_model(&cli.model)
            .with_source_root(&cli.source)
            .with_dest_root(dest_root)
            .with_asset_folders(cli.assets.iter().flat_map(|a| parse_folder_list(a)).collect())
            .with_failure_policy(cli.on_failure)
            .with_max_retries(cli.max_retries)
            .with_retry_delay(Duration::from_secs(cli.retry_delay))
            .with_workers(cli.workers)
            .with_request_timeout(Duration::from_secs(cli.timeout))
            .with_min_response_chars(cli.min_chars);

        if let Some(key) = &cli.api_key {
            config = config.with_api_key(key);
        }

        config
    }

    /// 获取目标语言
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// 获取API地址
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// 获取模型标识
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 获取源目录
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// 获取输出目录
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// 获取静态资源目录列表
    pub fn asset_folders(&self) -> &[String] {
        &self.asset_folders
    }

    /// 获取失败策略
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// 获取并发文档数量
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 进度日志路径，位于输出目录内
    pub fn ledger_path(&self) -> PathBuf {
        self.dest_root.join(site_config::LEDGER_FILE_NAME)
    }

    /// 设置目标语言
    pub fn target_language(mut self, lang: &str) -> Self {
        self.target_lang = lang.trim().to_string();
        self
    }

    /// 设置API地址
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.trim().to_string();
        self
    }

    /// 设置模型
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.trim().to_string();
        self
    }

    /// 设置API密钥
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.trim().to_string());
        self
    }

    /// 设置源目录
    pub fn with_source_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_root = path.as_ref().to_path_buf();
        self
    }

    /// 设置输出目录
    pub fn with_dest_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dest_root = path.as_ref().to_path_buf();
        self
    }

    /// 设置静态资源目录
    pub fn with_asset_folders(mut self, folders: Vec<String>) -> Self {
        self.asset_folders = folders;
        self
    }

    /// 设置失败策略
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// 设置最大重试次数
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// 设置重试间隔基数
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// 设置并发文档数量
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// 设置请求超时
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 设置译文最小字符数
    pub fn with_min_response_chars(mut self, min_chars: usize) -> Self {
        self.min_response_chars = min_chars;
        self
    }

    /// 校验配置
    ///
    /// `require_api_key` 为 false 时（如 `--dry-run`）不检查密钥。
    pub fn validate(&self, require_api_key: bool) -> Result<()> {
        self.validate_service(require_api_key)?;

        validate_source_root(&self.source_root)?;

        if resolve_path(&self.source_root) == resolve_path(&self.dest_root) {
            return Err(translation_error!(config, "dest", "输出目录不能与源目录相同"));
        }

        if self.workers == 0 || self.workers > site_config::MAX_WORKERS {
            return Err(translation_error!(
                config,
                "workers",
                format!("并发数量必须在 1 到 {} 之间", site_config::MAX_WORKERS)
            ));
        }

        if let Some(bad) = self.asset_folders.iter().find(|f| !is_safe_folder_name(f)) {
            return Err(translation_error!(
                config,
                "assets",
                format!("静态资源目录必须是源目录下的相对路径: {}", bad)
            ));
        }

        Ok(())
    }

    /// 只校验翻译服务相关配置，连通性检查不需要源目录
    pub fn validate_service(&self, require_api_key: bool) -> Result<()> {
        if self.target_lang.is_empty() {
            return Err(translation_error!(config, "lang", "目标语言不能为空"));
        }

        if !is_valid_api_url(&self.api_url) {
            return Err(translation_error!(
                config,
                "api-url",
                format!("无效的API地址: {}", self.api_url)
            ));
        }

        if self.model.is_empty() {
            return Err(translation_error!(config, "model", "模型标识不能为空"));
        }

        if require_api_key && self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(translation_error!(
                config,
                "api-key",
                "缺少API密钥，请设置 OPENAI_API_KEY 或使用 --api-key"
            ));
        }

        Ok(())
    }

    /// 流水线运行参数
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            source_root: self.source_root.clone(),
            dest_root: self.dest_root.clone(),
            target_lang: self.target_lang.clone(),
            failure_policy: self.failure_policy,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                delay: self.retry_delay,
            },
            workers: self.workers,
        }
    }

    /// 翻译服务客户端配置
    pub fn chat_config(&self) -> Result<ChatCompletionConfig> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| translation_error!(config, "api-key", "缺少API密钥"))?;

        Ok(ChatCompletionConfig {
            base_url: self.api_url.clone(),
            api_key,
            model: self.model.clone(),
            timeout: self.request_timeout,
        })
    }

    /// 译文校验器
    pub fn validator(&self) -> ResponseValidator {
        ResponseValidator::default().with_min_chars(self.min_response_chars)
    }
}

impl Default for SiteTranslationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析逗号分隔的目录列表，忽略空项
pub fn parse_folder_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "静态网站HTML翻译CLI工具 - 支持断点续跑的整站翻译", long_about = None)]
pub struct Cli {
    /// 目标语言 (语言名称或代码，如: ms, es, Spanish)
    #[arg(short, long, env = "TARGET_LANG", default_value = site_config::DEFAULT_TARGET_LANG)]
    pub lang: String,

    /// 翻译服务基础地址 (OpenAI兼容接口)
    #[arg(short, long = "api-url", env = "OPENAI_URL", default_value = api_config::DEFAULT_API_URL)]
    pub api: String,

    /// 模型标识
    #[arg(short, long, env = "OPENAI_MODEL", default_value = api_config::DEFAULT_MODEL)]
    pub model: String,

    /// API密钥
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// 源站点目录
    #[arg(short, long, env = "SOURCE_DIR", default_value = site_config::DEFAULT_SOURCE_DIR)]
    pub source: PathBuf,

    /// 译文根目录，输出到 <根目录>/<语言>
    #[arg(long, env = "TARGET_ROOT", default_value = site_config::DEFAULT_OUTPUT_ROOT)]
    pub output_root: PathBuf,

    /// 输出目录 (可选，覆盖 <根目录>/<语言>)
    #[arg(short, long, env = "TARGET_DIR")]
    pub dest: Option<PathBuf>,

    /// 需要原样复制的静态资源目录 (逗号分隔)
    #[arg(long, env = "ASSET_FOLDERS", value_delimiter = ',', default_value = site_config::DEFAULT_ASSET_FOLDERS)]
    pub assets: Vec<String>,

    /// 单个文档失败时的处理策略
    #[arg(long, env = "ON_FAILURE", value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_failure: FailurePolicy,

    /// 翻译服务临时性错误的最大重试次数
    #[arg(long, env = "MAX_RETRIES", default_value_t = site_config::DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// 重试间隔基数（秒）
    #[arg(long, env = "RETRY_DELAY_SECS", default_value_t = site_config::DEFAULT_RETRY_DELAY_SECONDS)]
    pub retry_delay: u64,

    /// 同时翻译的文档数量 (默认1，严格顺序)
    #[arg(long, env = "WORKERS", default_value_t = site_config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// 单次请求超时时间（秒）
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = api_config::REQUEST_TIMEOUT_SECONDS)]
    pub timeout: u64,

    /// 译文最小字符数，低于此值视为拒绝回答
    #[arg(long, default_value_t = validation_config::MIN_RESPONSE_CHARS)]
    pub min_chars: usize,

    /// 只检查翻译服务连通性
    #[arg(long, help = "发送一条测试请求检查翻译服务是否可用")]
    pub check: bool,

    /// 只列出待翻译文档，不调用翻译服务
    #[arg(long, help = "列出待翻译和已完成的文档后退出")]
    pub dry_run: bool,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,

    /// 显示运行统计
    #[arg(long)]
    pub stats: bool,
}
