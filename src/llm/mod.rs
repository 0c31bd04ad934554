use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ReviewComment, Severity};

/// 审查生成可能长达数分钟，这里给足超时
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// 审查后端错误类型
///
/// 传输失败与序列化失败是"本地"错误，各自独立；远端以非 2xx
/// 拒绝时状态码与响应体原样携带，不做二次归类。
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("审查服务返回错误: {body} (状态码: {status})")]
    Service { status: u16, body: String },

    #[error("请求发送失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 审查选项
///
/// 所有字段可选；缺省字段不上线，由后端取自身默认值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// 目标语言提示
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// 允许的严重程度
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity_levels: Vec<Severity>,

    /// 启用的规则
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
}

/// 发给审查后端的请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub diff: String,
    pub options: ReviewOptions,
}

/// 审查后端返回的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    /// 有序的审查意见
    #[serde(default)]
    pub comments: Vec<ReviewComment>,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub tokens_used: u64,
}

/// 审查后端客户端接口
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 提交 diff 与选项，取回结构化审查结果
    async fn review_code(
        &self,
        diff: &str,
        options: &ReviewOptions,
    ) -> Result<ReviewResult, LlmError>;
}

/// 通过 HTTP 访问审查后端的客户端
pub struct HttpClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LlmClient for HttpClient {
    async fn review_code(
        &self,
        diff: &str,
        options: &ReviewOptions,
    ) -> Result<ReviewResult, LlmError> {
        let request = ReviewRequest {
            diff: diff.to_string(),
            options: options.clone(),
        };
        let payload = serde_json::to_vec(&request)?;

        log::debug!(
            "Sending review request with {} bytes of diff to {}",
            diff.len(),
            self.endpoint
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload);

        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        // 单次阻塞调用，不重试不退避
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let result: ReviewResult = serde_json::from_str(&body)?;

        log::info!(
            "Review backend returned {} comments ({} tokens used)",
            result.comments.len(),
            result.tokens_used
        );

        Ok(result)
    }
}
