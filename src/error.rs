//! 统一错误处理模块
//!
//! 提供站点翻译流水线的统一错误类型定义和处理机制。
//! 流水线中的三类失败（翻译服务失败、译文被拒绝、文件系统失败）都会向上传播，
//! 由编排器按失败策略决定终止整个运行还是记录后继续。

// 标准库导入
use std::path::PathBuf;

// 本地模块导入
use crate::validator::Rejection;

/// 站点翻译统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    /// 翻译服务相关错误（网络、HTTP状态码、响应结构异常）
    #[error("{}", format_service(.message, .status_code))]
    Service {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// 启发式校验拒绝了模型输出
    #[error("译文被拒绝: {reason}")]
    ValidationRejected {
        /// 拒绝原因
        reason: Rejection,
        /// 被拒绝的原始响应，供人工排查
        response: String,
    },

    /// 文件操作相关错误
    #[error("文件{operation}操作失败 [{}]: {source}", .path.display())]
    FileOperation {
        /// 文件路径
        path: PathBuf,
        /// 操作类型（读取、写入、创建目录、复制等）
        operation: String,
        /// 底层错误
        source: std::io::Error,
    },

    /// 进度日志文件内容无法解析
    #[error("进度日志损坏 [{}]: {details}", .path.display())]
    LedgerCorrupt {
        /// 进度日志路径
        path: PathBuf,
        /// 解析失败详情
        details: String,
    },

    /// 配置相关错误
    #[error("配置错误 [{field}]: {reason}")]
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 单个文档处理失败，附带出错文档的相对路径
    #[error("处理文档失败 [{path}]: {source}")]
    Document {
        /// 相对源目录的路径
        path: String,
        /// 底层错误
        source: Box<TranslationError>,
    },
}

fn format_service(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("翻译服务请求失败 [{}]: {}", code, message),
        None => format!("翻译服务请求失败: {}", message),
    }
}

impl TranslationError {
    /// 判断该错误是否值得重试
    ///
    /// 传输层失败、超时、响应结构异常以及 408/429/5xx 视为临时性错误；
    /// 其他 4xx（如认证失败）、译文拒绝和文件系统错误不重试。
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Service { status_code: None, .. } => true,
            TranslationError::Service { status_code: Some(code), .. } => {
                *code == 408 || *code == 429 || *code >= 500
            }
            TranslationError::Document { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// 为错误附加文档相对路径
    pub fn for_document(self, path: impl Into<String>) -> Self {
        TranslationError::Document {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// 站点翻译结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! translation_error {
    (service, $msg:expr) => {
        $crate::error::TranslationError::Service {
            message: $msg.to_string(),
            status_code: None,
        }
    };
    (service, $msg:expr, $code:expr) => {
        $crate::error::TranslationError::Service {
            message: $msg.to_string(),
            status_code: Some($code),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::TranslationError::FileOperation {
            path: ::std::path::PathBuf::from($path),
            operation: $op.to_string(),
            source: $source,
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::TranslationError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}

/// 从reqwest::Error转换为TranslationError
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        TranslationError::Service {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从walkdir::Error转换为TranslationError
impl From<walkdir::Error> for TranslationError {
    fn from(error: walkdir::Error) -> Self {
        let path = error
            .path()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        let source = error
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("检测到目录符号链接循环"));
        TranslationError::FileOperation {
            path,
            operation: "遍历".to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslationError::Service {
            message: "Connection failed".to_string(),
            status_code: Some(500),
        };
        assert_eq!(format!("{}", err), "翻译服务请求失败 [500]: Connection failed");

        let err = translation_error!(service, "timed out");
        assert_eq!(err.to_string(), "翻译服务请求失败: timed out");
    }

    #[test]
    fn test_error_macro() {
        let err = translation_error!(config, "api_key", "不能为空");
        match err {
            TranslationError::Configuration { field, reason } => {
                assert_eq!(field, "api_key");
                assert_eq!(reason, "不能为空");
            }
            _ => panic!("Wrong error type"),
        }

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = translation_error!(file_op, "site/a.html", "读取", io);
        assert!(err.to_string().contains("site/a.html"));
        assert!(err.to_string().contains("读取"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(translation_error!(service, "reset").is_retryable());
        assert!(translation_error!(service, "busy", 429).is_retryable());
        assert!(translation_error!(service, "bad gateway", 502).is_retryable());
        assert!(!translation_error!(service, "unauthorized", 401).is_retryable());

        let rejected = TranslationError::ValidationRejected {
            reason: Rejection::Empty,
            response: String::new(),
        };
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_document_wrapper_keeps_path() {
        let err = translation_error!(service, "busy", 503).for_document("a/b.html");
        assert!(err.to_string().contains("a/b.html"));
        assert!(err.to_string().contains("503"));
        assert!(err.is_retryable());
    }
}
