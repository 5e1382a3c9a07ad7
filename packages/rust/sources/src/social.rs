//! Social feed adapter.
//!
//! Posts are retrieved by an external command run once per account, with the
//! session credentials passed through the environment. Failures are collected
//! per account and never stop the run.

use std::process::Stdio;
use std::time::Duration;

use dailypaper_shared::{DailyPaperError, Post, Result, SocialConfig, expand_home};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::SourceAdapter;
use crate::http::HttpClient;

/// Length cap for error text captured from the command's stderr.
const MAX_ERROR_CHARS: usize = 100;

/// Session cookies for the social platform.
#[derive(Debug, Clone, Deserialize)]
struct Credentials {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    ct0: Option<String>,
}

/// Posts gathered in one run plus the per-account failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialFeed {
    pub posts: Vec<Post>,
    pub errors: Vec<String>,
}

impl SocialFeed {
    /// Posts that mention a paper, preprint, or code release.
    pub fn paper_related(&self) -> Vec<Post> {
        self.posts.iter().filter(|p| p.has_paper).cloned().collect()
    }
}

/// Runs the configured retrieval command for each account.
#[derive(Debug, Clone)]
pub struct SocialAdapter {
    config: SocialConfig,
    accounts: Vec<String>,
}

impl SocialAdapter {
    /// Use the configured account list.
    pub fn new(config: SocialConfig) -> Self {
        let accounts = config.accounts.clone();
        Self { config, accounts }
    }

    /// Replace the account list for this run.
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }

    fn load_credentials(&self) -> Result<(String, String)> {
        let path = expand_home(&self.config.credentials_path);
        let missing = || {
            DailyPaperError::config(format!(
                "social credentials not found. Check {}",
                path.display()
            ))
        };

        let content = std::fs::read_to_string(&path).map_err(|_| missing())?;
        let creds: Credentials = serde_json::from_str(&content).map_err(|e| {
            DailyPaperError::config(format!("invalid credentials file {}: {e}", path.display()))
        })?;
        match (creds.auth_token, creds.ct0) {
            (Some(token), Some(ct0)) if !token.is_empty() && !ct0.is_empty() => Ok((token, ct0)),
            _ => Err(missing()),
        }
    }

    fn args_for(&self, account: &str) -> Vec<String> {
        let count = self.config.posts_per_account.to_string();
        self.config
            .args
            .iter()
            .map(|a| a.replace("{account}", account).replace("{count}", &count))
            .collect()
    }

    /// Run the command for one account; `Err` carries the message to record.
    async fn run_account(
        &self,
        account: &str,
        token: &str,
        ct0: &str,
    ) -> std::result::Result<Vec<Post>, String> {
        let mut command = tokio::process::Command::new(&self.config.command);
        command
            .args(self.args_for(account))
            .env("AUTH_TOKEN", token)
            .env("CT0", ct0)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => return Err("timeout".into()),
            Ok(Err(e)) => return Err(e.to_string()),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message: String = stderr.trim().chars().take(MAX_ERROR_CHARS).collect();
            return Err(if message.is_empty() {
                "Unknown error".into()
            } else {
                message
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_posts(&stdout, account, &self.config.paper_keywords))
    }
}

impl SourceAdapter for SocialAdapter {
    type Output = SocialFeed;

    fn name(&self) -> &'static str {
        "social"
    }

    #[instrument(skip_all, fields(accounts = self.accounts.len()))]
    async fn fetch(&self, _http: &HttpClient) -> Result<SocialFeed> {
        let (token, ct0) = self.load_credentials()?;
        let mut feed = SocialFeed::default();

        for account in &self.accounts {
            match self.run_account(account, &token, &ct0).await {
                Ok(posts) => {
                    info!(%account, count = posts.len(), "fetched posts");
                    feed.posts.extend(posts);
                }
                Err(message) => {
                    warn!(%account, error = %message, "post retrieval failed");
                    feed.errors.push(format!("@{account}: {message}"));
                }
            }
        }
        Ok(feed)
    }
}

/// Turn command output into posts.
///
/// A JSON array maps element-wise; other valid JSON yields nothing; anything
/// that is not JSON becomes one post per non-empty line.
pub fn parse_posts(output: &str, account: &str, paper_keywords: &[String]) -> Vec<Post> {
    let keywords: Vec<String> = paper_keywords.iter().map(|k| k.to_lowercase()).collect();
    let has_paper = |text: &str| {
        let lower = text.to_lowercase();
        keywords.iter().any(|k| lower.contains(k.as_str()))
    };

    match serde_json::from_str::<serde_json::Value>(output) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                let text = item.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                let field = |key: &str| item.get(key).and_then(|v| v.as_str()).map(String::from);
                Post {
                    account: account.to_string(),
                    text: text.to_string(),
                    created_at: field("created_at"),
                    url: field("url"),
                    has_paper: has_paper(text),
                }
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(_) => output
            .trim()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Post {
                account: account.to_string(),
                text: line.to_string(),
                created_at: None,
                url: None,
                has_paper: has_paper(line),
            })
            .collect(),
    }
}
