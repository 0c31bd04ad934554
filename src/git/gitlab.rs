use std::sync::Arc;

use async_trait::async_trait;

use crate::git::{GitClient, GitError, TokenSource};
use crate::models::{PullRequest, Repository, ReviewComment};

/// GitLab 提供商客户端（桩实现）
///
/// 注册在工厂里与完整实现同等对待；每个操作都显式返回未实现错误，
/// 绝不静默空转或返回空的成功结果。
pub struct GitlabClient;

impl GitlabClient {
    pub fn new(_token: Arc<dyn TokenSource>) -> Result<Self, GitError> {
        Ok(Self)
    }

    /// 工厂注册用的构造函数
    pub fn create(token: Arc<dyn TokenSource>) -> Result<Box<dyn GitClient>, GitError> {
        Ok(Box::new(Self::new(token)?))
    }

    fn not_implemented(operation: &'static str) -> GitError {
        GitError::NotImplemented {
            provider: "gitlab",
            operation,
        }
    }
}

#[async_trait]
impl GitClient for GitlabClient {
    async fn get_diff(
        &self,
        _owner: &str,
        _repo: &str,
        _pr_number: Option<u64>,
        _commit_sha: Option<&str>,
    ) -> Result<String, GitError> {
        Err(Self::not_implemented("get_diff"))
    }

    async fn post_review(
        &self,
        _owner: &str,
        _repo: &str,
        _pr_number: u64,
        _comments: &[ReviewComment],
        _summary: &str,
    ) -> Result<String, GitError> {
        Err(Self::not_implemented("post_review"))
    }

    async fn get_repositories(&self, _owner: &str) -> Result<Vec<Repository>, GitError> {
        Err(Self::not_implemented("get_repositories"))
    }

    async fn get_pull_requests(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<Vec<PullRequest>, GitError> {
        Err(Self::not_implemented("get_pull_requests"))
    }

    fn provider_name(&self) -> &'static str {
        "gitlab"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::StaticTokenSource;

    #[tokio::test]
    async fn test_every_operation_fails_explicitly() {
        let token: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("glpat-test"));
        let client = GitlabClient::new(token).unwrap();

        assert!(matches!(
            client.get_diff("o", "r", Some(1), None).await.unwrap_err(),
            GitError::NotImplemented { operation: "get_diff", .. }
        ));
        assert!(matches!(
            client.post_review("o", "r", 1, &[], "summary").await.unwrap_err(),
            GitError::NotImplemented { operation: "post_review", .. }
        ));
        assert!(matches!(
            client.get_repositories("o").await.unwrap_err(),
            GitError::NotImplemented { operation: "get_repositories", .. }
        ));
        assert!(matches!(
            client.get_pull_requests("o", "r").await.unwrap_err(),
            GitError::NotImplemented { operation: "get_pull_requests", .. }
        ));
    }

    #[test]
    fn test_provider_name() {
        let token: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("t"));
        let client = GitlabClient::new(token).unwrap();
        assert_eq!(client.provider_name(), "gitlab");
    }
}
