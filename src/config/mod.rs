use std::env;
use std::path::PathBuf;

/// 核心配置
///
/// 控制器层负责决定何时运行审查；这里只承载两端服务的连接信息。
#[derive(Debug, Clone)]
pub struct Config {
    /// 托管提供商类型（工厂注册表的 key）
    pub provider: String,
    /// 托管提供商访问令牌
    pub git_token: Option<String>,
    /// 覆盖提供商 API 地址（测试或私有部署）
    pub git_api_url: Option<String>,
    /// 审查后端端点
    pub llm_endpoint: String,
    /// 审查后端 API key
    pub llm_api_key: Option<String>,
    /// 审查后端请求超时（秒）
    pub llm_timeout_secs: u64,
}

impl Config {
    pub fn new() -> Self {
        // 默认配置
        let mut config = Config {
            provider: "github".to_string(),
            git_token: None,
            git_api_url: None,
            llm_endpoint: "http://localhost:8000/review".to_string(),
            llm_api_key: None,
            llm_timeout_secs: 300,
        };

        // 加载配置文件
        #[cfg(not(test))]
        config.load_from_env_file();
        // 加载环境变量（覆盖配置文件）
        config.load_from_env();

        config
    }

    pub fn load_from_env_file(&mut self) {
        // 尝试从用户主目录加载
        if let Ok(home) = env::var("HOME") {
            let user_env_path = PathBuf::from(format!("{}/.ai-review/.env", home));
            if user_env_path.exists() {
                dotenvy::from_path(user_env_path).ok();
            }
        }

        // 尝试从当前目录加载
        dotenvy::dotenv().ok();
    }

    pub fn load_from_env(&mut self) {
        if let Ok(provider) = env::var("AI_REVIEW_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(token) = env::var("AI_REVIEW_GIT_TOKEN") {
            self.git_token = Some(token);
        }
        if let Ok(url) = env::var("AI_REVIEW_GIT_API_URL") {
            self.git_api_url = Some(url);
        }
        if let Ok(endpoint) = env::var("AI_REVIEW_LLM_ENDPOINT") {
            self.llm_endpoint = endpoint;
        }
        if let Ok(api_key) = env::var("AI_REVIEW_LLM_API_KEY") {
            self.llm_api_key = Some(api_key);
        }
        if let Ok(timeout) = env::var("AI_REVIEW_LLM_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.llm_timeout_secs = secs;
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
