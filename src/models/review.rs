use serde::{Deserialize, Serialize};

/// 审查意见严重程度
///
/// 线上格式为小写字符串；未识别的值在反序列化时落到 `Unspecified`，
/// 展示优先级最低，不会产生错误。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Suggestion,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl Severity {
    /// 获取展示用的固定前缀
    pub fn display_prefix(&self) -> &'static str {
        match self {
            Severity::Critical => "🚨 **CRITICAL**",
            Severity::Major => "❌ **MAJOR**",
            Severity::Minor => "⚠️ **MINOR**",
            Severity::Suggestion => "💡 **SUGGESTION**",
            Severity::Unspecified => "**INFO**",
        }
    }
}

/// 单条审查意见
///
/// 由审查后端产出，由 Git 提供商客户端转换成平台原生评论后发布。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// 被评论文件的路径
    pub file: String,
    /// 目标文件中的行号（从 1 开始）
    pub line: u32,
    /// 评论正文
    pub content: String,
    #[serde(default)]
    pub severity: Severity,
    /// 触发该评论的规则标识
    #[serde(default)]
    pub rule: String,
}

/// 远端仓库的只读投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    /// 恒等于 "owner/name"
    pub full_name: String,
    pub url: String,
}

/// 开放中的 Pull Request / Merge Request 的只读投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub base_branch: String,
    pub head_branch: String,
    pub url: String,
}
