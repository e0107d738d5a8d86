//! 翻译服务模块
//!
//! 流水线只依赖 [`Translate`] 这一窄接口：输入整篇文档和目标语言，返回译文。
//! [`ChatCompletionTranslator`] 是基于OpenAI兼容对话补全接口的实现。
//! 重试不在这里做，由流水线统一负责。

// 标准库导入
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

// 本地模块导入
use crate::api_constants::{api_config, chat_completions_url, snippet};
use crate::error::{Result, TranslationError};
use crate::translation_error;

/// 翻译能力接口
#[async_trait]
pub trait Translate: Send + Sync {
    /// 将整篇HTML文档翻译为目标语言
    async fn translate(&self, document: &str, target_language: &str) -> Result<String>;
}

/// 对话补全客户端配置
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    /// 服务基础地址，如 `https://api.openai.com`
    pub base_url: String,
    /// API密钥
    pub api_key: String,
    /// 模型标识
    pub model: String,
    /// 请求超时
    pub timeout: Duration,
}

/// 基于OpenAI兼容对话补全接口的翻译实现
pub struct ChatCompletionTranslator {
    client: Client,
    endpoint: String,
    config: ChatCompletionConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionTranslator {
    /// 创建翻译客户端
    pub fn new(config: ChatCompletionConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: chat_completions_url(&config.base_url),
            config,
        })
    }

    /// 完整的接口地址
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 连通性自检
    ///
    /// 发送一条极短的对话请求，响应中包含 `choices` 即视为服务可用。
    pub async fn check_connection(&self) -> Result<()> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "Hello!" }
            ]
        });

        let text = self.post(&body).await?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| translation_error!(service, format!("响应不是有效JSON: {}", e)))?;

        if value.get("choices").is_some() {
            Ok(())
        } else {
            Err(translation_error!(service, "响应缺少 choices 字段"))
        }
    }

    /// 发送请求并返回成功响应的原始文本
    async fn post(&self, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        // 先按文本读取，避免JSON解析失败时丢掉错误信息
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TranslationError::Service {
                message: extract_error_message(status, &text),
                status_code: Some(status.as_u16()),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl Translate for ChatCompletionTranslator {
    async fn translate(&self, document: &str, target_language: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": build_prompt(document, target_language) }
            ],
            "temperature": api_config::TEMPERATURE
        });

        debug!("发送翻译请求: {} 字节 -> {}", document.len(), target_language);
        let text = self.post(&body).await?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| translation_error!(service, format!("响应不是有效JSON: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| translation_error!(service, "响应缺少 choices[0].message.content"))
    }
}

fn system_prompt() -> &'static str {
    "You are a helpful assistant that translates HTML websites. \
     Only translate the human-readable content and preserve all tags and attributes."
}

/// 构造翻译指令
pub fn build_prompt(document: &str, target_language: &str) -> String {
    format!(
        "Translate the user-visible text content of the following HTML document into {lang}.\n\
         \n\
         Rules:\n\
         1. Only translate text a user would see rendered on the page, plus user-facing attribute values such as alt and title.\n\
         2. Do not change HTML tags or attributes such as class, id, href, src or style.\n\
         3. Do not translate anything inside <script>, <style> or <code> elements.\n\
         4. Preserve the document structure exactly and keep HTML entities such as &amp; intact.\n\
         5. Reply with the translated HTML document only.\n\
         \n\
         {document}",
        lang = target_language,
        document = document
    )
}

/// 从错误响应中提取可读消息
///
/// 优先取 `{"error": {"message": ...}}` 或 `{"message": ...}`，否则截取响应体。
fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), message);
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), message);
        }
    }

    format!(
        "HTTP {}: {}",
        status.as_u16(),
        snippet(body, api_config::ERROR_BODY_SNIPPET_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator_for(server: &MockServer) -> ChatCompletionTranslator {
        ChatCompletionTranslator::new(ChatCompletionConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_translate_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(json!({ "model": "test-model", "temperature": 0.3 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "<p>Halo dunia</p>" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let translator = translator_for(&server);
        let result = translator.translate("<p>Hello world</p>", "ms").await.unwrap();
        assert_eq!(result, "<p>Halo dunia</p>");
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "Rate limit reached" }
            })))
            .mount(&server)
            .await;

        let err = translator_for(&server)
            .translate("<p>Hello</p>", "ms")
            .await
            .unwrap_err();
        match &err {
            TranslationError::Service { message, status_code } => {
                assert_eq!(*status_code, Some(429));
                assert!(message.contains("Rate limit reached"));
            }
            other => panic!("Wrong error type: {:?}", other),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_content_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = translator_for(&server)
            .translate("<p>Hello</p>", "ms")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::Service { status_code: None, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = translator_for(&server)
            .translate("<p>Hello</p>", "ms")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("JSON"));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "Hi!" } }]
            })))
            .mount(&server)
            .await;
        assert!(translator_for(&server).check_connection().await.is_ok());

        let failing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&failing)
            .await;
        let err = translator_for(&failing).check_connection().await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_prompt_contains_language_and_document() {
        let prompt = build_prompt("<h1>Welcome</h1>", "Spanish");
        assert!(prompt.contains("into Spanish"));
        assert!(prompt.ends_with("<h1>Welcome</h1>"));
        assert!(prompt.contains("<script>"));
    }

    #[test]
    fn test_extract_error_message_fallbacks() {
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, r#"{"message": "bad model"}"#),
            "HTTP 400: bad model"
        );
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "  upstream down "),
            "HTTP 502: upstream down"
        );
    }
}
