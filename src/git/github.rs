use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};

use crate::git::{GitClient, GitError, TokenSource};
use crate::models::{PullRequest, Repository, ReviewComment};

/// GitHub API 默认地址
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// diff 内容协商使用的媒体类型
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

const ACCEPT_JSON: &str = "application/json";

/// GitHub 提供商客户端
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    user_agent: String,
    token: Arc<dyn TokenSource>,
}

impl GithubClient {
    pub fn new(token: Arc<dyn TokenSource>) -> Result<Self, GitError> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// 指定 API 地址创建客户端，测试时指向 mock 服务
    pub fn with_api_url(
        token: Arc<dyn TokenSource>,
        api_url: impl Into<String>,
    ) -> Result<Self, GitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            user_agent: format!("ai-review/{}", env!("CARGO_PKG_VERSION")),
            token,
        })
    }

    /// 工厂注册用的构造函数
    pub fn create(token: Arc<dyn TokenSource>) -> Result<Box<dyn GitClient>, GitError> {
        Ok(Box::new(Self::new(token)?))
    }

    /// 执行请求：附加通用头与认证，状态码先于响应体解析映射成错误
    async fn do_request(
        &self,
        builder: reqwest::RequestBuilder,
        accept: &str,
    ) -> Result<String, GitError> {
        let token = self.token.token()?;

        let response = builder
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::ACCEPT, accept)
            .header(header::AUTHORIZATION, format!("token {}", token))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() >= 400 {
            return Err(match status {
                StatusCode::UNAUTHORIZED => GitError::AuthenticationFailed,
                StatusCode::FORBIDDEN => GitError::PermissionDenied,
                StatusCode::NOT_FOUND => GitError::ResourceNotFound,
                _ => GitError::RemoteService {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl GitClient for GithubClient {
    async fn get_diff(
        &self,
        owner: &str,
        repo: &str,
        pr_number: Option<u64>,
        commit_sha: Option<&str>,
    ) -> Result<String, GitError> {
        let url = match (pr_number, commit_sha) {
            (Some(number), _) if number > 0 => {
                format!("{}/repos/{}/{}/pulls/{}", self.api_url, owner, repo, number)
            }
            (_, Some(sha)) if !sha.is_empty() => {
                format!("{}/repos/{}/{}/commits/{}", self.api_url, owner, repo, sha)
            }
            _ => {
                return Err(GitError::invalid_request(
                    "either pr_number or commit_sha must be provided",
                ));
            }
        };

        log::debug!("Fetching diff from {}", url);
        self.do_request(self.client.get(&url), DIFF_MEDIA_TYPE).await
    }

    async fn post_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        comments: &[ReviewComment],
        summary: &str,
    ) -> Result<String, GitError> {
        let github_comments: Vec<GithubReviewComment> = comments
            .iter()
            .map(|comment| GithubReviewComment {
                path: comment.file.clone(),
                line: comment.line,
                body: format_comment_body(comment),
            })
            .collect();

        let request = GithubReviewRequest {
            // commit_id 留空，由 API 端补全
            commit_id: String::new(),
            body: summary.to_string(),
            event: "COMMENT".to_string(),
            comments: github_comments,
        };
        let payload = serde_json::to_vec(&request)?;

        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.api_url, owner, repo, pr_number
        );
        let response = self
            .do_request(
                self.client
                    .post(&url)
                    .header(header::CONTENT_TYPE, ACCEPT_JSON)
                    .body(payload),
                ACCEPT_JSON,
            )
            .await?;

        let review: GithubReviewResponse = serde_json::from_str(&response)?;

        log::info!(
            "Posted review with {} comments to {}/{}#{}",
            comments.len(),
            owner,
            repo,
            pr_number
        );

        // 响应缺少 html_url 时回退到规范的 PR 地址
        Ok(review.html_url.unwrap_or_else(|| {
            format!("https://github.com/{}/{}/pull/{}", owner, repo, pr_number)
        }))
    }

    async fn get_repositories(&self, owner: &str) -> Result<Vec<Repository>, GitError> {
        let user_url = format!("{}/users/{}/repos", self.api_url, owner);

        let response = match self.do_request(self.client.get(&user_url), ACCEPT_JSON).await {
            Ok(body) => body,
            // 用户维度查不到时再按组织查一次；认证、权限等失败直接上抛
            Err(GitError::ResourceNotFound) => {
                let org_url = format!("{}/orgs/{}/repos", self.api_url, owner);
                log::debug!("User lookup for {} failed, retrying as organization", owner);
                self.do_request(self.client.get(&org_url), ACCEPT_JSON).await?
            }
            Err(err) => return Err(err),
        };

        let github_repos: Vec<GithubRepo> = serde_json::from_str(&response)?;

        Ok(github_repos
            .into_iter()
            .map(|repo| {
                let owner = repo
                    .owner
                    .map(|account| account.login)
                    .unwrap_or_else(|| {
                        repo.full_name
                            .split('/')
                            .next()
                            .unwrap_or_default()
                            .to_string()
                    });

                Repository {
                    owner,
                    name: repo.name,
                    full_name: repo.full_name,
                    url: repo.html_url,
                }
            })
            .collect())
    }

    async fn get_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, GitError> {
        let url = format!("{}/repos/{}/{}/pulls", self.api_url, owner, repo);
        let response = self.do_request(self.client.get(&url), ACCEPT_JSON).await?;

        let github_pulls: Vec<GithubPull> = serde_json::from_str(&response)?;

        Ok(github_pulls
            .into_iter()
            .map(|pull| PullRequest {
                number: pull.number,
                title: pull.title,
                base_branch: pull.base.map(|b| b.name).unwrap_or_default(),
                head_branch: pull.head.map(|b| b.name).unwrap_or_default(),
                url: pull.html_url,
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "github"
    }
}

/// 把审查意见格式化成可读的评论正文
///
/// 纯函数：固定的严重程度前缀 + 括号内的规则标识 + 原始内容。
pub fn format_comment_body(comment: &ReviewComment) -> String {
    format!(
        "{} ({}): {}",
        comment.severity.display_prefix(),
        comment.rule,
        comment.content
    )
}

#[derive(Debug, Serialize)]
struct GithubReviewComment {
    path: String,
    line: u32,
    body: String,
}

#[derive(Debug, Serialize)]
struct GithubReviewRequest {
    commit_id: String,
    body: String,
    event: String,
    comments: Vec<GithubReviewComment>,
}

#[derive(Debug, Deserialize)]
struct GithubReviewResponse {
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubAccount {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    full_name: String,
    #[serde(default)]
    html_url: String,
    owner: Option<GithubAccount>,
}

#[derive(Debug, Deserialize)]
struct GithubBranchRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct GithubPull {
    number: u64,
    title: String,
    #[serde(default)]
    html_url: String,
    base: Option<GithubBranchRef>,
    head: Option<GithubBranchRef>,
}
