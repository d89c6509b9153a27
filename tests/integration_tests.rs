use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use campus_market::activity::ActivityTracker;
use campus_market::api::{HttpMarketApi, SharedMarketApi};
use campus_market::bidding::{handle_place_bid, BidRejection, PlaceBidCommand};
use campus_market::bidding::model::NewBid;
use campus_market::cache::MarketCache;
use campus_market::config::ClientConfig;
use campus_market::conversation::{unread_count, ConversationResolver, ReadTracker};
use campus_market::scheduler::CachePoller;
use campus_market::session::LoginRequest;
use campus_market::MarketError;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

type Reply = (StatusCode, Json<Value>);

/// Tracing for tests
fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// region:    --- Stub Service
/// Just enough of the marketplace service to drive the HTTP client.
struct Stub {
    valid_token: Mutex<String>,
    refresh_allowed: AtomicBool,
    refreshes: AtomicUsize,
    bid_posts: AtomicUsize,
    next_id: AtomicU64,
    items: Mutex<Vec<Value>>,
    bids: Mutex<Vec<Value>>,
    conversations: Mutex<Vec<Value>>,
}

impl Stub {
    fn new() -> Self {
        Self {
            valid_token: Mutex::new("access-1".to_string()),
            refresh_allowed: AtomicBool::new(true),
            refreshes: AtomicUsize::new(0),
            bid_posts: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            items: Mutex::new(vec![]),
            bids: Mutex::new(vec![]),
            conversations: Mutex::new(vec![]),
        }
    }

    fn id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token.lock());
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false)
    }

    /// Server-side token rotation: the client's current token stops working.
    fn rotate_token(&self, token: &str) {
        *self.valid_token.lock() = token.to_string();
    }
}

fn forbidden() -> Reply {
    (StatusCode::FORBIDDEN, Json(json!({ "message": "Token expired" })))
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

async fn login(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> Reply {
    if body["password"] != "secret1" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password" })),
        );
    }
    ok(json!({
        "status": "SUCCESS",
        "accessToken": stub.valid_token.lock().clone(),
        "refreshToken": "refresh-1",
        "user": { "_id": "u1", "name": "Ada", "email": body["email"] },
        "roles": ["Student"]
    }))
}

async fn refresh(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Reply {
    let presented = headers.get("x-refresh-token").and_then(|v| v.to_str().ok());
    if presented != Some("refresh-1") || !stub.refresh_allowed.load(Ordering::SeqCst) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Refresh token expired" })),
        );
    }
    stub.refreshes.fetch_add(1, Ordering::SeqCst);
    ok(json!({ "accessToken": stub.valid_token.lock().clone() }))
}

async fn list_items(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    ok(json!({ "data": stub.items.lock().clone() }))
}

async fn list_bids(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    ok(json!({ "data": stub.bids.lock().clone() }))
}

async fn place_bid(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    stub.bid_posts.fetch_add(1, Ordering::SeqCst);
    let id = stub.id("b");
    let mut items = stub.items.lock();
    let Some(item) = items.iter_mut().find(|i| i["_id"] == body["item"]) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Item not found" })));
    };
    let current = item["currentprice"]
        .as_f64()
        .or_else(|| item["startingprice"].as_f64())
        .unwrap_or(0.0);
    let amount = body["amount"].as_f64().unwrap_or(0.0);
    if amount <= current {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "ERROR", "message": "Bid must be higher than the current price" })),
        );
    }
    let bid = json!({
        "id": id,
        "item": body["item"],
        "bidder": body["bidder"],
        "amount": amount,
        "createdAt": body["createdAt"]
    });
    item["currentprice"] = json!(amount);
    if let Some(bids) = item["bids"].as_array_mut() {
        bids.push(bid.clone());
    }
    stub.bids.lock().push(bid);
    ok(json!({ "status": "SUCCESS", "message": "Bid placed" }))
}

async fn list_conversations(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    ok(json!({ "data": stub.conversations.lock().clone() }))
}

async fn create_conversation(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    let now = Utc::now().to_rfc3339();
    let conversation = json!({
        "_id": stub.id("c"),
        "participants": body["participants"],
        "messages": [],
        "createdAt": now,
        "updatedAt": now
    });
    stub.conversations.lock().push(conversation.clone());
    ok(json!({ "status": "SUCCESS", "data": conversation }))
}

async fn post_message(
    State(stub): State<Arc<Stub>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    let message = json!({
        "_id": stub.id("m"),
        "sender": body["sender"],
        "receiver": body["receiver"],
        "content": body["content"],
        "read": false,
        "createdAt": Utc::now().to_rfc3339()
    });
    let mut conversations = stub.conversations.lock();
    match conversations.iter_mut().find(|c| c["_id"] == id.as_str()) {
        Some(conversation) => {
            if let Some(messages) = conversation["messages"].as_array_mut() {
                messages.push(message.clone());
            }
            ok(json!({ "status": "SUCCESS", "data": message }))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Conversation not found" })),
        ),
    }
}

async fn mark_read(
    State(stub): State<Arc<Stub>>,
    Path((id, reader)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    let mut conversations = stub.conversations.lock();
    if let Some(messages) = conversations
        .iter_mut()
        .find(|c| c["_id"] == id.as_str())
        .and_then(|c| c["messages"].as_array_mut())
    {
        for message in messages.iter_mut().filter(|m| m["receiver"] == reader.as_str()) {
            message["read"] = json!(true);
        }
    }
    ok(json!({ "status": "SUCCESS" }))
}

async fn delete_item(
    State(stub): State<Arc<Stub>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    let mut items = stub.items.lock();
    let before = items.len();
    items.retain(|i| i["_id"] != id.as_str());
    if items.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Item not found" })));
    }
    ok(json!({ "status": "SUCCESS", "message": "Item deleted" }))
}

async fn analytics(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> Reply {
    if !stub.authorized(&headers) {
        return forbidden();
    }
    ok(json!({
        "status": "SUCCESS",
        "data": {
            "totalRevenue": 18500,
            "activeUsers": 12,
            "newListings": stub.items.lock().len(),
            "conversionRate": 37.5,
            "totalBids": stub.bids.lock().len(),
            "averageBidAmount": 0,
            "completionRate": 50,
            "averageListingDuration": 7
        }
    }))
}

async fn spawn_stub() -> (Arc<Stub>, SharedMarketApi) {
    init_tracing();
    let stub = Arc::new(Stub::new());
    let routes_all = Router::new()
        .route("/auth", post(login))
        .route("/auth/refresh", get(refresh))
        .route("/items", get(list_items))
        .route("/items/:id", delete(delete_item))
        .route("/admin/analytics", get(analytics))
        .route("/bids", get(list_bids).post(place_bid))
        .route("/conversations", get(list_conversations))
        .route("/conversations/", post(create_conversation))
        .route("/conversations/:id/messages", post(post_message))
        .route("/conversations/:id/messages/:reader", patch(mark_read))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    info!("{:<12} --> stub service on {}", "Test", addr);
    tokio::spawn(async move {
        axum::serve(listener, routes_all.into_make_service())
            .await
            .unwrap();
    });

    let config = ClientConfig::default().with_api_url(format!("http://{}", addr));
    let api: SharedMarketApi = Arc::new(HttpMarketApi::new(&config).unwrap());
    (stub, api)
}

async fn sign_in(api: &SharedMarketApi) {
    api.login(&LoginRequest {
        email: "ada@unilag.edu.ng".to_string(),
        password: "secret1".to_string(),
    })
    .await
    .unwrap();
}

fn lamp(seller: &str) -> Value {
    let now = Utc::now();
    json!({
        "_id": "i1",
        "title": "Desk lamp",
        "description": "Warm light, barely used",
        "images": [],
        "category": "Furniture",
        "condition": "Like New",
        "startingprice": 1000,
        "currentprice": null,
        "startdate": (now - Duration::days(1)).to_rfc3339(),
        "enddate": (now + Duration::days(2)).to_rfc3339(),
        "seller": seller,
        "status": "Active",
        "bids": [],
        "campus": "Unilag",
        "createdAt": (now - Duration::days(1)).to_rfc3339()
    })
}
// endregion: --- Stub Service

/// Login, bearer auth and a transparent token refresh
#[tokio::test]
async fn test_refresh_on_forbidden() {
    let (stub, api) = spawn_stub().await;
    stub.items.lock().push(lamp("u9"));

    sign_in(&api).await;
    assert_eq!(api.session().token.as_deref(), Some("access-1"));
    assert_eq!(api.fetch_items().await.unwrap().len(), 1);
    assert_eq!(stub.refreshes.load(Ordering::SeqCst), 0);

    stub.rotate_token("access-2");
    let items = api.fetch_items().await.unwrap();
    assert_eq!(items[0].title, "Desk lamp");
    assert_eq!(stub.refreshes.load(Ordering::SeqCst), 1);

    let session = api.session();
    assert_eq!(session.token.as_deref(), Some("access-2"));
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(session.user_id(), Some("u1"));
}

/// A refused refresh ends the session
#[tokio::test]
async fn test_session_expired() {
    let (stub, api) = spawn_stub().await;
    sign_in(&api).await;

    stub.rotate_token("access-2");
    stub.refresh_allowed.store(false, Ordering::SeqCst);

    let err = api.fetch_items().await.unwrap_err();
    assert!(matches!(err, MarketError::SessionExpired));
    assert_eq!(err.user_message(), "Your login session has expired");
    assert!(!api.session().is_authenticated());
}

/// Wrong credentials keep the server's message
#[tokio::test]
async fn test_login_rejected() {
    let (_stub, api) = spawn_stub().await;
    let err = api
        .login(&LoginRequest {
            email: "ada@unilag.edu.ng".to_string(),
            password: "wrong-pass".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.requires_login());
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(!api.session().is_authenticated());
}

/// Local rejection, accepted bid, then a stale bid refused by the service
#[tokio::test]
async fn test_place_bid() {
    let (stub, api) = spawn_stub().await;
    stub.items.lock().push(lamp("u9"));
    sign_in(&api).await;

    let cache = MarketCache::new();
    let activity = ActivityTracker::new();
    cache.replace_items(api.fetch_items().await.unwrap());

    let low = PlaceBidCommand {
        item_id: "i1".to_string(),
        bidder_id: "u1".to_string(),
        amount: "999".to_string(),
    };
    let err = handle_place_bid(low, &api, &cache, &activity).await.unwrap_err();
    assert_eq!(err.user_message(), "Bid must be higher than ₦1000.00");
    assert!(matches!(err, MarketError::Bid(BidRejection::TooLow { .. })));
    assert_eq!(stub.bid_posts.load(Ordering::SeqCst), 0);

    let good = PlaceBidCommand {
        item_id: "i1".to_string(),
        bidder_id: "u1".to_string(),
        amount: "1500".to_string(),
    };
    handle_place_bid(good, &api, &cache, &activity).await.unwrap();
    assert_eq!(cache.item("i1").unwrap().effective_price(), 1500.0);
    assert_eq!(cache.bids().len(), 1);
    assert!(!activity.is_busy());

    // another client still sees the old price
    let stale = NewBid {
        item: "i1".to_string(),
        bidder: "u2".to_string(),
        amount: 1200.0,
        created_at: Utc::now(),
    };
    let err = api.submit_bid(&stale).await.unwrap_err();
    assert_eq!(err.user_message(), "Bid must be higher than the current price");
    assert_eq!(stub.bid_posts.load(Ordering::SeqCst), 2);
}

/// First message creates the conversation, replies reuse it, opening marks it read
#[tokio::test]
async fn test_conversation_flow() {
    let (stub, api) = spawn_stub().await;
    sign_in(&api).await;
    let cache = Arc::new(MarketCache::new());
    let resolver = ConversationResolver::new(api.clone(), cache.clone());

    resolver
        .send_message("u1", "u2", "Is the lamp still available?")
        .await
        .unwrap();
    resolver.send_message("u1", "u2", "I can pick it up today").await.unwrap();
    assert_eq!(stub.conversations.lock().len(), 1);

    let conversation_id = resolver.open("u2", "u1").unwrap().id;
    {
        let mut conversations = stub.conversations.lock();
        let reply = json!({
            "_id": "reply-1",
            "sender": "u2",
            "receiver": "u1",
            "content": "Yes, come by at 4",
            "read": false,
            "createdAt": (Utc::now() + Duration::seconds(1)).to_rfc3339()
        });
        if let Some(messages) = conversations[0]["messages"].as_array_mut() {
            messages.push(reply);
        }
    }

    CachePoller::new(api.clone(), cache.clone(), std::time::Duration::from_secs(10))
        .refresh_once()
        .await
        .unwrap();
    let opened = resolver.open("u1", "u2").unwrap();
    assert_eq!(opened.messages.len(), 3);
    assert_eq!(opened.messages[2].content, "Yes, come by at 4");
    assert_eq!(unread_count(&opened, "u1"), 1);
    assert_eq!(resolver.inbox("u1", "")[0].unread, 1);

    ReadTracker::new(api.clone(), cache.clone())
        .open_conversation(&conversation_id, "u1")
        .await
        .unwrap();
    assert_eq!(unread_count(&cache.conversation(&conversation_id).unwrap(), "u1"), 0);
    let stored = stub.conversations.lock()[0].clone();
    assert!(stored["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["receiver"] == "u1")
        .all(|m| m["read"] == true));
}

/// Listing removal and the analytics summary
#[tokio::test]
async fn test_delete_listing_and_analytics() {
    let (stub, api) = spawn_stub().await;
    stub.items.lock().push(lamp("u9"));
    sign_in(&api).await;

    let analytics = api.admin_analytics().await.unwrap();
    assert_eq!(analytics.new_listings, 1);
    assert_eq!(analytics.active_users, 12);
    assert_eq!(analytics.conversion_rate, 37.5);

    api.delete_item("i1").await.unwrap();
    assert!(api.fetch_items().await.unwrap().is_empty());

    let err = api.delete_item("i1").await.unwrap_err();
    assert!(matches!(err, MarketError::NotFound(_)));
}
