//! Encyclopedia lookups against the MediaWiki action API.

use crate::error::LookupError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Encyclopedia: Send + Sync {
    /// One-sentence summary of `subject`.
    async fn summary(&self, subject: &str) -> Result<String, LookupError>;
}

pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: super::http_client(),
            api_url: api_url.to_string(),
        }
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value, LookupError> {
        let mut query = vec![("action", "query"), ("format", "json"), ("formatversion", "2")];
        query.extend_from_slice(params);

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| LookupError::Transport(format!("invalid response: {}", e)))
    }

    /// Best matching page title for free text, like a search box would pick.
    async fn best_title(&self, subject: &str) -> Result<Option<String>, LookupError> {
        let json = self
            .query(&[("list", "search"), ("srsearch", subject), ("srlimit", "1")])
            .await?;
        Ok(json["query"]["search"]
            .as_array()
            .and_then(|hits| hits.first())
            .and_then(|hit| hit["title"].as_str())
            .map(str::to_string))
    }

    async fn disambiguation_options(&self, title: &str) -> Result<Vec<String>, LookupError> {
        let json = self
            .query(&[
                ("prop", "links"),
                ("titles", title),
                ("plnamespace", "0"),
                ("pllimit", "max"),
            ])
            .await?;
        Ok(first_page(&json)
            .and_then(|page| page["links"].as_array())
            .map(|links| {
                links
                    .iter()
                    .filter_map(|link| link["title"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn first_page(json: &Value) -> Option<&Value> {
    json["query"]["pages"].as_array().and_then(|pages| pages.first())
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    async fn summary(&self, subject: &str) -> Result<String, LookupError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(LookupError::NotFound(String::new()));
        }

        let title = self
            .best_title(subject)
            .await?
            .ok_or_else(|| LookupError::NotFound(subject.to_string()))?;

        let json = self
            .query(&[
                ("prop", "extracts|pageprops"),
                ("titles", title.as_str()),
                ("redirects", "1"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exsentences", "1"),
                ("ppprop", "disambiguation"),
            ])
            .await?;

        let page = first_page(&json).ok_or_else(|| LookupError::NotFound(subject.to_string()))?;
        if page["missing"].as_bool().unwrap_or(false) {
            return Err(LookupError::NotFound(subject.to_string()));
        }
        if page["pageprops"].get("disambiguation").is_some() {
            let options = self.disambiguation_options(&title).await?;
            return Err(LookupError::Ambiguous {
                subject: subject.to_string(),
                options,
            });
        }

        match page["extract"].as_str().map(str::trim) {
            Some(extract) if !extract.is_empty() => Ok(extract.to_string()),
            _ => Err(LookupError::NotFound(subject.to_string())),
        }
    }
}
