// region:    --- Imports
use super::envelope::Envelope;
use super::MarketApi;
use crate::admin::{AdminLoginRequest, AdminStats, Analytics, UserStatus};
use crate::bidding::model::{Bid, Item, NewBid, NewListing};
use crate::config::ClientConfig;
use crate::conversation::model::{Conversation, Message, NewConversation, NewMessage};
use crate::error::{MarketError, Result};
use crate::session::{
    reduce, AuthResponse, LoginRequest, RefreshResponse, RegisterRequest, RegisteredAccount,
    SessionAction, SessionState,
};
use crate::user::User;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
// endregion: --- Imports

const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Some endpoints answer with a single object, others wrap it in a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_last(self) -> Option<T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.into_iter().last(),
        }
    }
}

// region:    --- Http Market Api
/// [`MarketApi`] over the service's REST endpoints.
///
/// Requests carry `Authorization: Bearer` while a token is held. A 403 triggers
/// one refresh through `GET /auth/refresh` and a single retry of the request.
pub struct HttpMarketApi {
    client: Client,
    base_url: String,
    session: RwLock<SessionState>,
}

impl HttpMarketApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session: RwLock::new(SessionState::default()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn dispatch(&self, action: SessionAction) {
        let mut session = self.session.write();
        *session = reduce(std::mem::take(&mut *session), action);
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.session.read().token.clone();
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request built by `build`, refreshing the token and retrying once on 403.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> Result<RequestBuilder> + Send + Sync,
    {
        let response = self.authorized(build(&self.client)?).send().await?;
        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        warn!("{:<12} --> 403 from {}, refreshing token", "Http", response.url().path());
        self.refresh().await?;
        Ok(self.authorized(build(&self.client)?).send().await?)
    }

    async fn refresh(&self) -> Result<()> {
        let refresh_token = self.session.read().refresh_token.clone();
        let mut request = self.authorized(self.client.get(self.url("/auth/refresh")));
        if let Some(refresh_token) = refresh_token {
            request = request.header(REFRESH_TOKEN_HEADER, refresh_token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::FORBIDDEN {
            warn!("{:<12} --> refresh rejected, session expired", "Http");
            self.dispatch(SessionAction::Logout);
            return Err(MarketError::SessionExpired);
        }
        let refreshed: RefreshResponse = decode(ensure_success(response).await?).await?;
        self.dispatch(SessionAction::TokenRefreshed {
            token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
        });
        info!("{:<12} --> access token refreshed", "Http");
        Ok(())
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("{:<12} --> GET {}", "Http", path);
        let url = self.url(path);
        let response = self.send(|client| Ok(client.get(&url))).await?;
        let envelope: Envelope<T> = decode(ensure_success(response).await?).await?;
        envelope.into_data()
    }

    /// Sends a mutation and only checks the reply for a non-success status.
    async fn mutate<F>(&self, label: &str, build: F) -> Result<()>
    where
        F: Fn(&Client) -> Result<RequestBuilder> + Send + Sync,
    {
        debug!("{:<12} --> {}", "Http", label);
        let response = ensure_success(self.send(build).await?).await?;
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        match serde_json::from_slice::<Envelope<serde_json::Value>>(&body) {
            Ok(envelope) => envelope.check(),
            // plain-text acknowledgements carry no status to check
            Err(_) => Ok(()),
        }
    }

    async fn authenticate<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<SessionState> {
        debug!("{:<12} --> POST {}", "Http", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        let auth: AuthResponse = decode(ensure_success(response).await?).await?;
        if !auth.status.is_empty() && !auth.status.eq_ignore_ascii_case(super::envelope::STATUS_SUCCESS) {
            return Err(MarketError::Rejected(format!("Login failed: {}", auth.status)));
        }

        info!("{:<12} --> logged in as {}", "Http", auth.user.id);
        self.dispatch(auth.into());
        Ok(self.session())
    }
}
// endregion: --- Http Market Api

// region:    --- Market Api Impl
#[async_trait]
impl MarketApi for HttpMarketApi {
    async fn login(&self, req: &LoginRequest) -> Result<SessionState> {
        self.authenticate("/auth", req).await
    }

    async fn admin_login(&self, req: &AdminLoginRequest) -> Result<SessionState> {
        let session = self.authenticate("/admin/auth", req).await?;
        if !session.user.as_ref().map(User::is_admin).unwrap_or(false) {
            self.dispatch(SessionAction::Logout);
            return Err(MarketError::Unauthorized(
                "Admin access required".to_string(),
            ));
        }
        Ok(session)
    }

    async fn register(&self, req: &RegisterRequest) -> Result<RegisteredAccount> {
        debug!("{:<12} --> POST /auth/register", "Http");
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(req)
            .send()
            .await?;
        let envelope: Envelope<RegisteredAccount> = decode(ensure_success(response).await?).await?;
        envelope.into_data()
    }

    async fn logout(&self) -> Result<()> {
        let url = self.url("/auth/logout");
        self.mutate("POST /auth/logout", |client| Ok(client.post(&url)))
            .await?;
        self.dispatch(SessionAction::Logout);
        Ok(())
    }

    fn session(&self) -> SessionState {
        self.session.read().clone()
    }

    fn clear_session(&self) {
        self.dispatch(SessionAction::Logout);
    }

    async fn fetch_items(&self) -> Result<Vec<Item>> {
        self.get_data("/items").await
    }

    async fn create_item(&self, listing: &NewListing) -> Result<()> {
        let mut images = Vec::with_capacity(listing.images.len());
        let stamp = chrono::Utc::now().timestamp_millis();
        for (index, path) in listing.images.iter().enumerate() {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                MarketError::Validation(format!("Could not read image {}: {}", path.display(), e))
            })?;
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("jpg");
            images.push((format!("{}-{}.{}", stamp, index, extension), bytes));
        }

        let url = self.url("/items");
        self.mutate("POST /items", |client| {
            let mut form = Form::new()
                .text("title", listing.title.clone())
                .text("description", listing.description.clone())
                .text("startingprice", listing.starting_price.to_string())
                .text("seller", listing.seller.clone())
                .text("category", listing.category.clone())
                .text("condition", listing.condition.as_str())
                .text("campus", listing.campus.clone())
                .text("status", "Active")
                .text("startdate", listing.start_time.to_rfc3339())
                .text("enddate", listing.end_time.to_rfc3339());
            for (name, bytes) in &images {
                let part = Part::bytes(bytes.clone())
                    .file_name(name.clone())
                    .mime_str("image/jpeg")?;
                form = form.part("images", part);
            }
            Ok(client.post(&url).multipart(form))
        })
        .await
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        let path = format!("/items/{}", item_id);
        let url = self.url(&path);
        self.mutate(&format!("DELETE {}", path), |client| Ok(client.delete(&url)))
            .await
    }

    async fn fetch_bids(&self) -> Result<Vec<Bid>> {
        self.get_data("/bids").await
    }

    async fn submit_bid(&self, bid: &NewBid) -> Result<()> {
        let url = self.url("/bids");
        self.mutate("POST /bids", |client| Ok(client.post(&url).json(bid)))
            .await
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        self.get_data("/conversations").await
    }

    async fn create_conversation(&self, req: &NewConversation) -> Result<Conversation> {
        debug!("{:<12} --> POST /conversations/", "Http");
        let url = self.url("/conversations/");
        let response = self.send(|client| Ok(client.post(&url).json(req))).await?;
        let envelope: Envelope<Conversation> = decode(ensure_success(response).await?).await?;
        envelope.into_data()
    }

    async fn post_message(&self, msg: &NewMessage) -> Result<Message> {
        let path = format!("/conversations/{}/messages", msg.conversation_id);
        debug!("{:<12} --> POST {}", "Http", path);
        let url = self.url(&path);
        let response = self.send(|client| Ok(client.post(&url).json(msg))).await?;
        let envelope: Envelope<OneOrMany<Message>> =
            decode(ensure_success(response).await?).await?;
        envelope
            .into_data()?
            .into_last()
            .ok_or_else(|| MarketError::Rejected("Failed to send message".to_string()))
    }

    async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<()> {
        let path = format!("/conversations/{}/messages/{}", conversation_id, reader_id);
        let url = self.url(&path);
        self.mutate(&format!("PATCH {}", path), |client| Ok(client.patch(&url)))
            .await
    }

    async fn admin_stats(&self) -> Result<AdminStats> {
        self.get_data("/admin/stats").await
    }

    async fn admin_analytics(&self) -> Result<Analytics> {
        self.get_data("/admin/analytics").await
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        self.get_data("/admin/users").await
    }

    async fn update_user_status(&self, user_id: &str, status: UserStatus) -> Result<()> {
        let path = format!("/admin/users/{}/status", user_id);
        let url = self.url(&path);
        let body = json!({ "status": status });
        self.mutate(&format!("PATCH {}", path), |client| {
            Ok(client.patch(&url).json(&body))
        })
        .await
    }
}
// endregion: --- Market Api Impl

// region:    --- Response Helpers
/// Maps non-2xx responses onto the error taxonomy, keeping the server's message.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
    warn!("{:<12} --> {} {}", "Http", status.as_u16(), message);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MarketError::Unauthorized(message),
        StatusCode::NOT_FOUND => MarketError::NotFound(message),
        _ => MarketError::Rejected(message),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
// endregion: --- Response Helpers
