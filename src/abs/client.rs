//! Async client for the Audiobookshelf HTTP API

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::error::AbsError;
use super::models::*;
use crate::chapters::ResolvedChapter;
use crate::config::Connection;

pub(crate) const USER_AGENT: &str = concat!("absctl/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated handle on one server
pub struct AbsClient {
    http: reqwest::Client,
    host: String,
    token: String,
    batch_timeout: Duration,
}

impl AbsClient {
    pub fn new(conn: &Connection) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(conn.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(conn.timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            host: conn.host.clone(),
            token: conn.token.clone(),
            batch_timeout: conn.batch_timeout,
        })
    }

    /// Base URL, used for deep links in reports
    pub fn host(&self) -> &str {
        &self.host
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.host, path))
            .bearer_auth(&self.token)
    }

    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<Response, AbsError> {
        debug!("{}", path);
        let response = request.send().await.map_err(|source| AbsError::Request {
            path: path.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(AbsError::Status {
                path: path.to_string(),
                status: response.status(),
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, AbsError> {
        response.json().await.map_err(|source| AbsError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AbsError> {
        let response = self.execute(self.request(Method::GET, path), path).await?;
        Self::decode(response, path).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, AbsError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, path).await
    }

    /// Batch endpoints run under their own, much longer, timeout
    fn batch_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path)
            .timeout(self.batch_timeout)
            .json(body)
    }

    async fn send_batch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, AbsError> {
        self.execute(self.batch_request(method, path, body), path)
            .await
    }

    // ========================================================================
    // Libraries and items
    // ========================================================================

    pub async fn libraries(&self) -> Result<Vec<Library>, AbsError> {
        let response: LibrariesResponse = self.get("/api/libraries").await?;
        Ok(response.libraries)
    }

    /// List items of a library, optionally narrowed by an encoded filter
    pub async fn library_items(
        &self,
        library_id: &str,
        filter: Option<&str>,
    ) -> Result<Vec<LibraryItem>, AbsError> {
        let mut path = format!("/api/libraries/{}/items", urlencoding::encode(library_id));
        if let Some(filter) = filter {
            path.push_str(&format!("?filter={}", urlencoding::encode(filter)));
        }
        let response: ItemsResponse = self.get(&path).await?;
        Ok(response.results)
    }

    /// Item with audio files and library files populated
    pub async fn expanded_item(&self, item_id: &str) -> Result<LibraryItem, AbsError> {
        self.get(&format!(
            "/api/items/{}?expanded=1",
            urlencoding::encode(item_id)
        ))
        .await
    }

    pub async fn batch_items(&self, item_ids: &[String]) -> Result<Vec<LibraryItem>, AbsError> {
        let path = "/api/items/batch/get";
        let body = json!({ "libraryItemIds": item_ids });
        let response = self.send_batch(Method::POST, path, &body).await?;
        let parsed: BatchItemsResponse = Self::decode(response, path).await?;
        Ok(parsed.library_items)
    }

    /// Apply a media patch to many items in one request
    pub async fn batch_update(&self, updates: &[BatchUpdate]) -> Result<(), AbsError> {
        self.send_batch(Method::POST, "/api/items/batch/update", updates)
            .await?;
        Ok(())
    }

    /// Patch the media of an item (metadata, tags)
    pub async fn patch_media(
        &self,
        item_id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), AbsError> {
        let path = format!("/api/items/{}/media", urlencoding::encode(item_id));
        self.send(Method::PATCH, &path, Some(payload)).await?;
        Ok(())
    }

    /// Replace all chapters of an item
    pub async fn update_chapters(
        &self,
        item_id: &str,
        chapters: &[ResolvedChapter],
    ) -> Result<(), AbsError> {
        let path = format!("/api/items/{}/chapters", urlencoding::encode(item_id));
        let body = json!({ "chapters": chapters });
        self.send(Method::POST, &path, Some(&body)).await?;
        Ok(())
    }

    // ========================================================================
    // Metadata providers
    // ========================================================================

    /// Search a metadata provider by title and author
    pub async fn search_books(
        &self,
        title: &str,
        author: Option<&str>,
        provider: &str,
    ) -> Result<Vec<BookMatch>, AbsError> {
        let mut params = vec![format!("title={}", urlencoding::encode(title))];
        if let Some(author) = author {
            params.push(format!("author={}", urlencoding::encode(author)));
        }
        params.push(format!("provider={}", urlencoding::encode(provider)));

        self.get(&format!("/api/search/books?{}", params.join("&")))
            .await
    }

    /// Let the server match an item against a provider and store the result.
    ///
    /// Returns the updated item. A body without one, or flagged with an
    /// error, is an `AbsError::Api`.
    pub async fn match_item(
        &self,
        item_id: &str,
        provider: &str,
        title: &str,
        author: &str,
    ) -> Result<LibraryItem, AbsError> {
        let path = format!("/api/items/{}/match", urlencoding::encode(item_id));
        let body = json!({ "provider": provider, "title": title, "author": author });
        let response = self.send(Method::POST, &path, Some(&body)).await?;
        let parsed: MatchResponse = Self::decode(response, &path).await?;

        if let Some(error) = parsed.error {
            let message = match error {
                serde_json::Value::String(message) => message,
                other => other.to_string(),
            };
            return Err(AbsError::Api { path, message });
        }
        parsed.library_item.ok_or_else(|| AbsError::Api {
            path,
            message: "No library item returned".to_string(),
        })
    }

    /// Chapters known to the provider for an ASIN
    pub async fn search_chapters(
        &self,
        asin: &str,
        region: &str,
    ) -> Result<Vec<CatalogChapter>, AbsError> {
        let path = format!(
            "/api/search/chapters?asin={}&region={}",
            urlencoding::encode(asin),
            urlencoding::encode(region)
        );
        let response: ChaptersResponse = self.get(&path).await?;

        if let Some(message) = response.error {
            return Err(AbsError::Api { path, message });
        }
        Ok(response.chapters)
    }

    // ========================================================================
    // Users and sessions
    // ========================================================================

    pub async fn users(&self) -> Result<Vec<User>, AbsError> {
        let response: UsersResponse = self.get("/api/users").await?;
        Ok(response.users)
    }

    pub async fn listening_sessions(
        &self,
        user_id: &str,
        page: u64,
        items_per_page: u32,
    ) -> Result<SessionPage, AbsError> {
        self.get(&format!(
            "/api/users/{}/listening-sessions?itemsPerPage={}&page={}",
            urlencoding::encode(user_id),
            items_per_page,
            page
        ))
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), AbsError> {
        let path = format!("/api/sessions/{}", urlencoding::encode(session_id));
        self.send::<()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// Create a session as if it had been recorded offline by a client
    pub async fn create_local_session(&self, session: &ListeningSession) -> Result<(), AbsError> {
        self.send(Method::POST, "/api/session/local", Some(session))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Authors, genres, tags, progress
    // ========================================================================

    pub async fn authors(&self, library_id: &str) -> Result<Vec<Author>, AbsError> {
        let response: AuthorsResponse = self
            .get(&format!(
                "/api/libraries/{}/authors",
                urlencoding::encode(library_id)
            ))
            .await?;
        Ok(response.authors)
    }

    pub async fn delete_author(&self, author_id: &str) -> Result<(), AbsError> {
        let path = format!("/api/authors/{}", urlencoding::encode(author_id));
        self.send::<()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    pub async fn genres(&self) -> Result<Vec<String>, AbsError> {
        let response: GenresResponse = self.get("/api/genres").await?;
        Ok(response.genres)
    }

    pub async fn tags(&self) -> Result<Vec<String>, AbsError> {
        let response: TagsResponse = self.get("/api/tags").await?;
        Ok(response.tags)
    }

    pub async fn update_progress(&self, updates: &[ProgressUpdate]) -> Result<(), AbsError> {
        self.send_batch(Method::PATCH, "/api/me/progress/batch/update", updates)
            .await?;
        Ok(())
    }
}
