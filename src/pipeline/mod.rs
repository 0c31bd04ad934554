use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::git::{ClientFactory, GitClient, GitError, TokenSource};
use crate::llm::{LlmClient, LlmError, ReviewOptions};

/// 流水线阶段标记
///
/// 失败时带在错误上，让外层控制器能区分是提供商问题还是审查后端问题。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStage {
    DiffFetch,
    ReviewInvoke,
    ReviewPost,
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self {
            ReviewStage::DiffFetch => "diff-fetch",
            ReviewStage::ReviewInvoke => "review-invoke",
            ReviewStage::ReviewPost => "review-post",
        };
        f.write_str(marker)
    }
}

/// 单个阶段的失败原因
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// 流水线错误：阶段标记 + 原因
#[derive(Debug, Error)]
#[error("审查流水线在 {stage} 阶段失败: {source}")]
pub struct PipelineError {
    stage: ReviewStage,
    #[source]
    source: StageError,
}

impl PipelineError {
    fn new(stage: ReviewStage, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// 失败发生在哪个阶段
    pub fn stage(&self) -> ReviewStage {
        self.stage
    }

    /// 失败是否来自托管提供商
    pub fn is_provider_error(&self) -> bool {
        matches!(self.source, StageError::Git(_))
    }

    /// 失败是否来自审查后端
    pub fn is_backend_error(&self) -> bool {
        matches!(self.source, StageError::Llm(_))
    }

    pub fn cause(&self) -> &StageError {
        &self.source
    }
}

/// 一次审查请求的目标
#[derive(Debug, Clone)]
pub struct ReviewTarget {
    pub owner: String,
    pub repo: String,
    /// 目标 Pull Request 编号（> 0）
    pub pr_number: u64,
    /// 可选的提交 SHA；给出时 diff 取该提交而非整个 PR
    pub commit_sha: Option<String>,
}

impl ReviewTarget {
    pub fn pull_request(
        owner: impl Into<String>,
        repo: impl Into<String>,
        pr_number: u64,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            pr_number,
            commit_sha: None,
        }
    }
}

/// 一次流水线运行的元数据
#[derive(Debug, Clone)]
pub struct ReviewMetadata {
    pub correlation_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
}

/// 流水线成功结果
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub review_url: String,
    pub comments_posted: usize,
    pub tokens_used: u64,
    pub summary: String,
    pub metadata: ReviewMetadata,
}

/// 审查流水线
///
/// 每次运行相互独立，不共享可变状态；严格按
/// 取 diff → 调审查后端 → 发布评论 的顺序执行，任何一步失败即中止。
pub struct ReviewPipeline {
    client: Box<dyn GitClient>,
    llm: Arc<dyn LlmClient>,
}

impl ReviewPipeline {
    /// 通过工厂解析提供商客户端来构建流水线
    ///
    /// 未注册的提供商类型和构造失败在这里暴露，原样传出注册表的错误。
    pub fn new(
        factory: &ClientFactory,
        provider_type: &str,
        token_source: Arc<dyn TokenSource>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self, GitError> {
        let client = factory.create(provider_type, token_source)?;
        Ok(Self { client, llm })
    }

    /// 跳过工厂直接注入客户端，测试时使用
    pub fn with_client(client: Box<dyn GitClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self { client, llm }
    }

    /// 执行一次完整的审查
    pub async fn run(
        &self,
        target: &ReviewTarget,
        options: &ReviewOptions,
    ) -> Result<ReviewOutcome, PipelineError> {
        let correlation_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = std::time::Instant::now();

        tracing::info!(
            provider = self.client.provider_name(),
            correlation_id = %correlation_id,
            "Starting review of {}/{}#{}",
            target.owner,
            target.repo,
            target.pr_number
        );

        let pr_number = (target.pr_number > 0).then_some(target.pr_number);
        let diff = self
            .client
            .get_diff(
                &target.owner,
                &target.repo,
                pr_number,
                target.commit_sha.as_deref(),
            )
            .await
            .map_err(|err| PipelineError::new(ReviewStage::DiffFetch, err))?;
        tracing::debug!(bytes = diff.len(), "Diff fetched");

        let result = self
            .llm
            .review_code(&diff, options)
            .await
            .map_err(|err| PipelineError::new(ReviewStage::ReviewInvoke, err))?;
        tracing::debug!(
            comments = result.comments.len(),
            tokens_used = result.tokens_used,
            "Review generated"
        );

        let review_url = self
            .client
            .post_review(
                &target.owner,
                &target.repo,
                target.pr_number,
                &result.comments,
                &result.summary,
            )
            .await
            .map_err(|err| PipelineError::new(ReviewStage::ReviewPost, err))?;

        let duration = start.elapsed();
        tracing::info!(
            review_url = %review_url,
            correlation_id = %correlation_id,
            "Review posted in {:?}",
            duration
        );

        Ok(ReviewOutcome {
            review_url,
            comments_posted: result.comments.len(),
            tokens_used: result.tokens_used,
            summary: result.summary,
            metadata: ReviewMetadata {
                correlation_id,
                started_at,
                completed_at: Utc::now(),
                duration,
            },
        })
    }
}
