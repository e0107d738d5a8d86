/// 翻译服务与流水线配置常量
///
/// 该文件定义了翻译服务、进度日志和译文校验相关的常量配置，方便统一管理和维护

/// 默认翻译API配置
pub mod api_config {
    /// 默认翻译服务基础地址（OpenAI兼容接口）
    pub const DEFAULT_API_URL: &str = "https://api.openai.com";

    /// 对话补全接口路径
    pub const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

    /// 默认模型
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    /// 采样温度
    pub const TEMPERATURE: f64 = 0.3;

    /// 请求超时时间（秒），大页面的生成可能很慢
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 120;

    /// 错误响应体在日志中保留的最大字符数
    pub const ERROR_BODY_SNIPPET_CHARS: usize = 400;
}

/// 站点与流水线配置
pub mod site_config {
    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "ms";

    /// 默认源站点目录
    pub const DEFAULT_SOURCE_DIR: &str = "site";

    /// 默认译文根目录，实际输出到 `<根目录>/<语言>`
    pub const DEFAULT_OUTPUT_ROOT: &str = "translated-sites";

    /// 进度日志文件名，位于输出目录内
    pub const LEDGER_FILE_NAME: &str = "translated-files.json";

    /// 默认复制的静态资源目录
    pub const DEFAULT_ASSET_FOLDERS: &str = "src";

    /// 文档扩展名（区分大小写）
    pub const DOCUMENT_EXTENSION: &str = "html";

    /// 默认最大重试次数（0 表示失败即放弃）
    pub const DEFAULT_MAX_RETRIES: usize = 0;

    /// 默认重试间隔基数（秒）
    pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 2;

    /// 默认并发文档数量，1 表示严格顺序处理
    pub const DEFAULT_WORKERS: usize = 1;

    /// 并发文档数量上限，避免触发服务限流
    pub const MAX_WORKERS: usize = 16;
}

/// 译文校验配置
pub mod validation_config {
    /// 译文最小字符数，低于此值通常是拒绝回答或截断
    pub const MIN_RESPONSE_CHARS: usize = 30;

    /// 道歉/拒绝标记（不区分大小写）
    pub const REFUSAL_MARKERS: &[&str] = &["sorry", "i can't", "i can’t", "as an ai"];

    /// 被拒绝的响应在日志中保留的最大字符数
    pub const REJECTED_SNIPPET_CHARS: usize = 500;
}

/// 实用工具函数
/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            (parsed.scheme() == "http" || parsed.scheme() == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

/// 拼接对话补全接口完整地址
pub fn chat_completions_url(base_url: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        api_config::CHAT_COMPLETIONS_PATH
    )
}

/// 按字符截断文本用于日志输出
pub fn snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
