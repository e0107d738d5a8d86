//! 译文校验模块
//!
//! 模型偶尔会返回拒绝回答、空响应或被截断的片段。此模块在译文写入输出目录之前
//! 做一次廉价的启发式检查，并去掉模型常加的 ```html 代码块包裹。

use crate::api_constants::validation_config;

/// 译文被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// 响应为空或只有空白
    #[error("响应为空")]
    Empty,

    /// 响应过短，通常是拒绝回答或被截断
    #[error("响应过短 ({length} < {minimum} 字符)")]
    TooShort {
        /// 实际字符数
        length: usize,
        /// 最小字符数
        minimum: usize,
    },

    /// 响应包含道歉/拒绝标记
    #[error("响应包含拒绝标记 \"{marker}\"")]
    Refusal {
        /// 命中的标记
        marker: String,
    },
}

/// 译文启发式校验器
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    min_chars: usize,
    /// 已转为小写的拒绝标记
    refusal_markers: Vec<String>,
}

impl ResponseValidator {
    /// 使用指定的最小长度和拒绝标记创建校验器
    pub fn new<I, S>(min_chars: usize, refusal_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            min_chars,
            refusal_markers: refusal_markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// 设置最小字符数
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// 获取最小字符数
    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// 校验模型原始响应
    ///
    /// 按顺序检查：去掉代码块后为空、原始响应过短、原始响应含拒绝标记。
    /// 长度和标记检查针对未去包裹的原始文本，长度按Unicode字符计。
    /// 通过时返回去掉代码块包裹后的译文。
    pub fn validate(&self, raw: &str) -> Result<String, Rejection> {
        let unwrapped = strip_code_fence(raw);
        if unwrapped.trim().is_empty() {
            return Err(Rejection::Empty);
        }

        let length = raw.chars().count();
        if length < self.min_chars {
            return Err(Rejection::TooShort {
                length,
                minimum: self.min_chars,
            });
        }

        let lowered = raw.to_lowercase();
        if let Some(marker) = self
            .refusal_markers
            .iter()
            .find(|marker| lowered.contains(marker.as_str()))
        {
            return Err(Rejection::Refusal {
                marker: marker.clone(),
            });
        }

        Ok(unwrapped.to_string())
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new(
            validation_config::MIN_RESPONSE_CHARS,
            validation_config::REFUSAL_MARKERS,
        )
    }
}

/// 去掉 ```html ... ``` 代码块包裹
///
/// 没有包裹时只去掉首尾空白。
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // 开头行可能带语言标记，如 ```html
        body = match rest.find('\n') {
            Some(newline) if rest[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[newline + 1..]
            }
            Some(_) => rest,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}
