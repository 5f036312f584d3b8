use crate::error::MediaError;
use async_trait::async_trait;
use regex::Regex;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Starts playing the best match for `query`.
    async fn play(&self, query: &str) -> Result<(), MediaError>;
}

/// Opens the first YouTube search result in the desktop's browser.
pub struct YoutubePlayer {
    client: reqwest::Client,
    base_url: String,
    opener: String,
}

impl YoutubePlayer {
    pub fn new(base_url: &str) -> Self {
        Self::with_opener(base_url, "xdg-open")
    }

    /// Uses `opener` instead of `xdg-open` to launch the video URL.
    pub fn with_opener(base_url: &str, opener: &str) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            opener: opener.to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/results?search_query={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"watch\?v=([A-Za-z0-9_-]{11})").expect("valid regex"))
}

/// First video id linked from a search results page.
pub fn first_video_id(html: &str) -> Option<&str> {
    video_id_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[async_trait]
impl MediaPlayer for YoutubePlayer {
    async fn play(&self, query: &str) -> Result<(), MediaError> {
        let html = self
            .client
            .get(self.search_url(query))
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| MediaError::Search(e.to_string()))?
            .text()
            .await
            .map_err(|e| MediaError::Search(e.to_string()))?;

        let id = first_video_id(&html).ok_or_else(|| MediaError::NotFound(query.to_string()))?;
        let url = format!("{}/watch?v={}", self.base_url, id);
        tracing::info!("Opening {}", url);

        // Browser keeps running on its own
        Command::new(&self.opener)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
