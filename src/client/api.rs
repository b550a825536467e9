/**
 * HTTP API Client
 *
 * Thin reqwest wrapper over every mutation-API operation. Non-2xx
 * responses are turned into `ApiClientError::Api` carrying the
 * server's `{"message": ...}` body.
 */

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::model::{CollabList, ListItem, PersonalList};

/// Errors from the API client
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// Network or protocol failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server rejected the request
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    /// An authenticated call was made before `login`
    #[error("not authenticated")]
    NotAuthenticated,
}

/// A freshly registered account
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub email: String,
}

/// An authenticated session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

/// Typed client for the mutation API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<&str, ApiClientError> {
        self.token.as_deref().ok_or(ApiClientError::NotAuthenticated)
    }

    /// Turn a non-success response into `ApiClientError::Api`.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(ApiClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // -- accounts --

    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, ApiClientError> {
        let response = self
            .http
            .post(self.url("/register"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Log in and keep the token for subsequent calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, ApiClientError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: Session = Self::check(response).await?.json().await?;
        self.token = Some(session.token.clone());
        Ok(session)
    }

    // -- personal lists --

    pub async fn fetch_lists(&self) -> Result<Vec<PersonalList>, ApiClientError> {
        let response = self
            .http
            .get(self.url("/lists"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_list(
        &self,
        title: &str,
        items: &[ListItem],
    ) -> Result<(), ApiClientError> {
        let response = self
            .http
            .post(self.url("/lists"))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "title": title, "items": items }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn update_list(
        &self,
        list_id: Uuid,
        title: Option<&str>,
        items: Option<&[ListItem]>,
    ) -> Result<(), ApiClientError> {
        let response = self
            .http
            .put(self.url(&format!("/lists/{list_id}")))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "title": title, "items": items }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Replace the whole personal-list set (bulk save).
    pub async fn override_lists(&self, lists: &[PersonalList]) -> Result<(), ApiClientError> {
        let response = self
            .http
            .put(self.url("/lists"))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "lists": lists }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // -- collab lists --

    pub async fn create_collab_list(&self, title: &str) -> Result<(), ApiClientError> {
        let response = self
            .http
            .post(self.url("/collab-lists"))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "title": title }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn fetch_collab_ids(&self) -> Result<Vec<Uuid>, ApiClientError> {
        let response = self
            .http
            .get(self.url("/collab-lists/ids"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn fetch_collab_lists(&self) -> Result<Vec<CollabList>, ApiClientError> {
        let response = self
            .http
            .get(self.url("/collab-lists"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn fetch_collab_list(&self, list_id: Uuid) -> Result<CollabList, ApiClientError> {
        let response = self
            .http
            .get(self.url(&format!("/collab-lists/{list_id}")))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn update_collab_list(
        &self,
        list_id: Uuid,
        title: Option<&str>,
        items: Option<&[ListItem]>,
    ) -> Result<(), ApiClientError> {
        let response = self
            .http
            .put(self.url(&format!("/collab-lists/{list_id}")))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "title": title, "items": items }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn join_collab_list(&self, list_id: Uuid) -> Result<(), ApiClientError> {
        let response = self
            .http
            .put(self.url("/collab-lists/join"))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "collabListId": list_id }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn draw_random_item(&self, list_id: Uuid, item: &str) -> Result<(), ApiClientError> {
        let response = self
            .http
            .put(self.url(&format!("/collab-lists/{list_id}/draw")))
            .bearer_auth(self.bearer()?)
            .json(&json!({ "item": item }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
