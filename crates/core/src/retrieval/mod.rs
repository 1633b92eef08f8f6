use std::{collections::HashMap, time::Duration};

use reqwest::{blocking::Client, header::CONTENT_TYPE, StatusCode};

use crate::{Result, SyncError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the encoded timeline belonging to a video.
pub trait Retriever {
    fn get(&self, source: &str) -> Result<Vec<u8>>;
}

/// Retrieves timelines published as `<base>/<video id>.json`.
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    base_url: String,
    client: Client,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SyncError::Retrieval(err.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// URL of the timeline document for `video_url`.
    pub fn document_url(&self, video_url: &str) -> Result<String> {
        let id = video_id(video_url)
            .ok_or_else(|| SyncError::Retrieval(format!("invalid URL: {video_url}")))?;
        Ok(format!("{}/{id}.json", self.base_url.trim_end_matches('/')))
    }
}

impl Retriever for HttpRetriever {
    fn get(&self, source: &str) -> Result<Vec<u8>> {
        let url = self.document_url(source)?;
        tracing::info!(%url, "fetching timeline");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| SyncError::Retrieval(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::Retrieval(format!(
                "unexpected status code: {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(SyncError::Retrieval(format!(
                "unexpected content type: {content_type}"
            )));
        }

        let body = response
            .bytes()
            .map_err(|err| SyncError::Retrieval(err.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Retriever serving timelines from memory. Unknown sources yield an empty
/// payload.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetriever {
    data: HashMap<String, String>,
}

impl InMemoryRetriever {
    pub fn new(data: HashMap<String, String>) -> Self {
        Self { data }
    }

    pub fn insert(&mut self, source: impl Into<String>, payload: impl Into<String>) {
        self.data.insert(source.into(), payload.into());
    }
}

impl Retriever for InMemoryRetriever {
    fn get(&self, source: &str) -> Result<Vec<u8>> {
        Ok(self
            .data
            .get(source)
            .map(|payload| payload.as_bytes().to_vec())
            .unwrap_or_default())
    }
}

/// Extracts the id from a `watch?v=<id>` style video URL.
pub fn video_id(video_url: &str) -> Option<&str> {
    const MARKER: &str = "watch?v=";

    let start = video_url.find(MARKER)? + MARKER.len();
    let rest = &video_url[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    (end > 0).then_some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{local_client, serve_once};

    fn local_retriever(address: String) -> HttpRetriever {
        HttpRetriever::with_client(address, local_client())
    }

    #[test]
    fn extracts_video_ids() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=abc-DEF_123&t=42"),
            Some("abc-DEF_123")
        );
        assert_eq!(video_id("https://www.youtube.com/watch?v=#########"), None);
        assert_eq!(video_id("https://example.com/video"), None);
    }

    #[test]
    fn rejects_urls_without_video_id() {
        let retriever = HttpRetriever::new("http://127.0.0.1:9").unwrap();
        let err = retriever
            .get("https://www.youtube.com/watch?v=#########")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not retrieve timeline data: invalid URL: https://www.youtube.com/watch?v=#########"
        );
    }

    #[test]
    fn builds_document_urls() {
        let retriever = HttpRetriever::new("https://data.example/v1/").unwrap();
        assert_eq!(
            retriever
                .document_url("https://www.youtube.com/watch?v=abcdefghijk")
                .unwrap(),
            "https://data.example/v1/abcdefghijk.json"
        );
    }

    #[test]
    fn fetches_json_documents() {
        let (address, path) = serve_once("200 OK", "application/json", "data");
        let retriever = local_retriever(address);

        let data = retriever
            .get("https://www.youtube.com/watch?v=abcdefghijk")
            .unwrap();

        assert_eq!(data, b"data");
        assert_eq!(path.recv().unwrap(), "/abcdefghijk.json");
    }

    #[test]
    fn rejects_other_content_types() {
        let (address, _path) = serve_once("200 OK", "text/html", "<html></html>");
        let retriever = local_retriever(address);

        let err = retriever
            .get("https://www.youtube.com/watch?v=abcdefghijk")
            .unwrap_err();
        assert!(err.to_string().contains("unexpected content type: text/html"));
    }

    #[test]
    fn rejects_other_status_codes() {
        let (address, _path) = serve_once("404 Not Found", "application/json", "{}");
        let retriever = local_retriever(address);

        let err = retriever
            .get("https://www.youtube.com/watch?v=abcdefghijk")
            .unwrap_err();
        assert!(matches!(err, SyncError::Retrieval(_)));
        assert!(err.to_string().contains("unexpected status code: 404"));
    }

    #[test]
    fn in_memory_retriever_serves_known_sources() {
        let mut retriever = InMemoryRetriever::default();
        retriever.insert("video", "{}");

        assert_eq!(retriever.get("video").unwrap(), b"{}");
        assert!(retriever.get("other").unwrap().is_empty());
    }
}
