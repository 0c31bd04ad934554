pub mod github;
pub mod gitlab;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PullRequest, Repository, ReviewComment};

pub use github::GithubClient;
pub use gitlab::GitlabClient;

/// Git 提供商错误类型
///
/// 闭合的错误分类：远端服务的异构失败被归一化成少数几种；
/// 本地失败（构造请求、解析响应）保留独立的变体，与远端失败可区分。
#[derive(Debug, Error)]
pub enum GitError {
    #[error("不支持的 Git 提供商: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("认证失败")]
    AuthenticationFailed,

    #[error("权限不足")]
    PermissionDenied,

    #[error("资源不存在")]
    ResourceNotFound,

    #[error("无效请求: {message}")]
    InvalidRequest { message: String },

    #[error("远端服务错误: {body} (状态码: {status})")]
    RemoteService { status: u16, body: String },

    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("获取访问令牌失败: {message}")]
    Token { message: String },

    #[error("{provider} 客户端尚未实现 {operation}")]
    NotImplemented {
        provider: &'static str,
        operation: &'static str,
    },
}

impl GitError {
    /// 创建无效请求错误
    pub fn invalid_request(message: impl Into<String>) -> Self {
        GitError::InvalidRequest {
            message: message.into(),
        }
    }

    /// 检查错误是否值得外部控制器重试
    ///
    /// 核心自身不做任何重试，这里只提供分类。
    pub fn is_retryable(&self) -> bool {
        match self {
            GitError::Transport(_) => true,
            GitError::RemoteService { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Git 提供商客户端接口
///
/// 每个托管后端各自实现；所有网络操作都是单次调用，超时与取消
/// 由各实现内部的 HTTP 客户端和 tokio 任务取消承担。
#[async_trait]
pub trait GitClient: Send + Sync {
    /// 获取 Pull Request 或单个提交的 diff 文本
    ///
    /// `pr_number`（> 0）与 `commit_sha`（非空）必须二选一；
    /// 两者都缺失时在发起任何网络请求前返回 `InvalidRequest`。
    async fn get_diff(
        &self,
        owner: &str,
        repo: &str,
        pr_number: Option<u64>,
        commit_sha: Option<&str>,
    ) -> Result<String, GitError>;

    /// 把审查意见发布到 Pull Request，返回审查页面 URL
    async fn post_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        comments: &[ReviewComment],
        summary: &str,
    ) -> Result<String, GitError>;

    /// 列出 owner 名下的仓库
    async fn get_repositories(&self, owner: &str) -> Result<Vec<Repository>, GitError>;

    /// 列出仓库中开放的 Pull Request
    async fn get_pull_requests(&self, owner: &str, repo: &str)
        -> Result<Vec<PullRequest>, GitError>;

    /// 提供商标识，纯函数，无 I/O
    fn provider_name(&self) -> &'static str;
}

/// 按需提供当前凭证的来源
///
/// 凭证生命周期由调用方决定；需要刷新凭证的实现可以自带内部同步，
/// 对核心透明。
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<String, GitError>;
}

/// 静态令牌来源
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn token(&self) -> Result<String, GitError> {
        Ok(self.token.clone())
    }
}

/// 从环境变量读取令牌的来源
pub struct EnvTokenSource {
    var: String,
}

impl EnvTokenSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenSource for EnvTokenSource {
    fn token(&self) -> Result<String, GitError> {
        env::var(&self.var).map_err(|_| GitError::Token {
            message: format!("environment variable {} is not set", self.var),
        })
    }
}

/// 客户端构造函数
pub type ClientConstructor =
    Box<dyn Fn(Arc<dyn TokenSource>) -> Result<Box<dyn GitClient>, GitError> + Send + Sync>;

/// Git 客户端工厂
///
/// 进程启动时注册一次，之后只读；同一个 key 重复注册时后写的生效。
/// 按引用传递给需要创建客户端的组件，不做全局单例。
pub struct ClientFactory {
    constructors: HashMap<String, ClientConstructor>,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// 创建带默认提供商的工厂
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register("github", Box::new(GithubClient::create));
        factory.register("gitlab", Box::new(GitlabClient::create));
        factory
    }

    /// 注册提供商构造函数
    pub fn register(&mut self, provider_type: impl Into<String>, constructor: ClientConstructor) {
        self.constructors.insert(provider_type.into(), constructor);
    }

    /// 按提供商类型创建客户端
    ///
    /// 未注册的类型返回 `UnsupportedProvider`，不触碰任何构造函数；
    /// 构造函数自身的失败原样向上传递。
    pub fn create(
        &self,
        provider_type: &str,
        token_source: Arc<dyn TokenSource>,
    ) -> Result<Box<dyn GitClient>, GitError> {
        let constructor = self.constructors.get(provider_type).ok_or_else(|| {
            GitError::UnsupportedProvider {
                provider: provider_type.to_string(),
            }
        })?;

        constructor(token_source)
    }

    /// 列出已注册的提供商类型
    pub fn providers(&self) -> Vec<&str> {
        self.constructors.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_source() {
        let source = StaticTokenSource::new("ghp_test");
        assert_eq!(source.token().unwrap(), "ghp_test");
    }

    #[test]
    fn test_env_token_source_missing_var() {
        let source = EnvTokenSource::new("AI_REVIEW_TEST_TOKEN_MISSING");
        let err = source.token().unwrap_err();
        assert!(matches!(err, GitError::Token { .. }));
    }

    #[test]
    fn test_factory_defaults() {
        let factory = ClientFactory::with_defaults();
        let mut providers = factory.providers();
        providers.sort();
        assert_eq!(providers, vec!["github", "gitlab"]);
    }

    #[test]
    fn test_factory_unknown_provider() {
        let factory = ClientFactory::with_defaults();
        let token: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("t"));
        let err = factory.create("bitbucket", token).err().unwrap();
        assert!(matches!(
            err,
            GitError::UnsupportedProvider { ref provider } if provider == "bitbucket"
        ));
    }

    #[test]
    fn test_factory_create_does_not_touch_constructors_on_unknown_key() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut factory = ClientFactory::new();
        factory.register(
            "github",
            Box::new(|source| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                GithubClient::create(source)
            }),
        );

        let token: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("t"));
        assert!(factory.create("unknown", token).is_err());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_factory_last_registration_wins() {
        let mut factory = ClientFactory::new();
        factory.register("mock", Box::new(GithubClient::create));
        factory.register("mock", Box::new(GitlabClient::create));

        let token: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("t"));
        let client = factory.create("mock", token).unwrap();
        assert_eq!(client.provider_name(), "gitlab");
        assert_eq!(factory.providers().len(), 1);
    }

    #[test]
    fn test_error_retry_classification() {
        assert!(GitError::RemoteService {
            status: 503,
            body: "unavailable".to_string(),
        }
        .is_retryable());
        assert!(!GitError::RemoteService {
            status: 422,
            body: "validation".to_string(),
        }
        .is_retryable());
        assert!(!GitError::AuthenticationFailed.is_retryable());
        assert!(!GitError::invalid_request("missing target").is_retryable());
    }
}
