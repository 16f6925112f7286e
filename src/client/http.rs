//! Typed HTTP client for the `/api` endpoints

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, de::DeserializeOwned};

use super::error::ClientError;
use crate::api::dto::{
    AuthResponse, CommentEnvelope, CommentResponse, CommentsEnvelope, FeedResponse,
    GoogleLoginRequest, HealthResponse, LikesResponse, LoginRequest, MessageResponse,
    PostEnvelope, PostResponse, ReactRequest, ReactionsResponse, RegisterRequest, ReplyEnvelope,
    ReplyResponse, UpdatePostRequest, UserEnvelope, UserResponse,
};
use crate::data::{ReactionTarget, ReactionType};

/// Sends a reaction for a post or comment
///
/// Seam between `ReactionController` and the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReactionApi: Send + Sync {
    async fn react(
        &self,
        target: ReactionTarget,
        target_id: &str,
        reaction_type: ReactionType,
    ) -> Result<ReactionsResponse, ClientError>;
}

/// Image attached to a post, comment or reply
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    fn into_part(self) -> Result<Part, ClientError> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// API client holding the base URL and, once signed in, the bearer token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Client for a server at `base_url` (e.g. "http://127.0.0.1:8000")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotSignedIn)?;
        Ok(request.bearer_auth(token))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn sign_in(&mut self, response: reqwest::Response) -> Result<AuthResponse, ClientError> {
        let auth: AuthResponse = Self::decode(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Register and keep the returned token
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await?;
        self.sign_in(response).await
    }

    /// Log in and keep the returned token
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&request)
            .send()
            .await?;
        self.sign_in(response).await
    }

    /// Exchange a Google ID token for a session
    pub async fn google_login(&mut self, id_token: &str) -> Result<AuthResponse, ClientError> {
        let request = GoogleLoginRequest {
            id_token: id_token.to_string(),
        };
        let response = self
            .http
            .post(self.url("/auth/google"))
            .json(&request)
            .send()
            .await?;
        self.sign_in(response).await
    }

    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        let response = self.authorized(self.http.get(self.url("/auth/me")))?.send().await?;
        let envelope: UserEnvelope = Self::decode(response).await?;
        Ok(envelope.user)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// One feed page; `None` leaves the server defaults
    pub async fn feed(&self, page: Option<u32>, limit: Option<u32>) -> Result<FeedResponse, ClientError> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        let response = self
            .authorized(self.http.get(self.url("/posts")).query(&query))?
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_post(&self, id: &str) -> Result<PostResponse, ClientError> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/posts/{}", id))))?
            .send()
            .await?;
        let envelope: PostEnvelope = Self::decode(response).await?;
        Ok(envelope.post)
    }

    pub async fn create_post(
        &self,
        content: &str,
        is_private: bool,
        image: Option<ImageFile>,
    ) -> Result<PostResponse, ClientError> {
        let mut form = Form::new()
            .text("content", content.to_string())
            .text("isPrivate", is_private.to_string());
        if let Some(image) = image {
            form = form.part("image", image.into_part()?);
        }

        let response = self
            .authorized(self.http.post(self.url("/posts")).multipart(form))?
            .send()
            .await?;
        let envelope: PostEnvelope = Self::decode(response).await?;
        Ok(envelope.post)
    }

    pub async fn update_post(&self, id: &str, content: &str) -> Result<PostResponse, ClientError> {
        let request = UpdatePostRequest {
            content: content.to_string(),
        };
        let response = self
            .authorized(self.http.put(self.url(&format!("/posts/{}", id))).json(&request))?
            .send()
            .await?;
        let envelope: PostEnvelope = Self::decode(response).await?;
        Ok(envelope.post)
    }

    pub async fn delete_post(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/posts/{}", id))))?
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn react_to_post(
        &self,
        id: &str,
        reaction_type: ReactionType,
    ) -> Result<ReactionsResponse, ClientError> {
        self.send_reaction(&format!("/posts/{}/like", id), reaction_type)
            .await
    }

    // =========================================================================
    // Comments and replies
    // =========================================================================

    pub async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        image: Option<ImageFile>,
    ) -> Result<CommentResponse, ClientError> {
        let mut form = Form::new()
            .text("postId", post_id.to_string())
            .text("content", content.to_string());
        if let Some(image) = image {
            form = form.part("image", image.into_part()?);
        }

        let response = self
            .authorized(self.http.post(self.url("/comments")).multipart(form))?
            .send()
            .await?;
        let envelope: CommentEnvelope = Self::decode(response).await?;
        Ok(envelope.comment)
    }

    pub async fn list_comments(
        &self,
        post_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<CommentResponse>, ClientError> {
        let mut request = self.http.get(self.url(&format!("/comments/post/{}", post_id)));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = self.authorized(request)?.send().await?;
        let envelope: CommentsEnvelope = Self::decode(response).await?;
        Ok(envelope.comments)
    }

    pub async fn react_to_comment(
        &self,
        id: &str,
        reaction_type: ReactionType,
    ) -> Result<ReactionsResponse, ClientError> {
        self.send_reaction(&format!("/comments/{}/like", id), reaction_type)
            .await
    }

    pub async fn reply(
        &self,
        comment_id: &str,
        content: &str,
        image: Option<ImageFile>,
    ) -> Result<ReplyResponse, ClientError> {
        let mut form = Form::new().text("content", content.to_string());
        if let Some(image) = image {
            form = form.part("image", image.into_part()?);
        }

        let response = self
            .authorized(
                self.http
                    .post(self.url(&format!("/comments/{}/reply", comment_id)))
                    .multipart(form),
            )?
            .send()
            .await?;
        let envelope: ReplyEnvelope = Self::decode(response).await?;
        Ok(envelope.reply)
    }

    pub async fn toggle_reply_like(&self, reply_id: &str) -> Result<LikesResponse, ClientError> {
        let response = self
            .authorized(
                self.http
                    .post(self.url(&format!("/comments/reply/{}/like", reply_id))),
            )?
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::decode(response).await
    }

    async fn send_reaction(
        &self,
        path: &str,
        reaction_type: ReactionType,
    ) -> Result<ReactionsResponse, ClientError> {
        let request = ReactRequest {
            reaction_type: Some(reaction_type.as_str().to_string()),
        };
        let response = self
            .authorized(self.http.post(self.url(path)).json(&request))?
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ReactionApi for ApiClient {
    async fn react(
        &self,
        target: ReactionTarget,
        target_id: &str,
        reaction_type: ReactionType,
    ) -> Result<ReactionsResponse, ClientError> {
        match target {
            ReactionTarget::Post => self.react_to_post(target_id, reaction_type).await,
            ReactionTarget::Comment => self.react_to_comment(target_id, reaction_type).await,
        }
    }
}
