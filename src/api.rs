//! HTTP surface over per-session cart stores
//!
//! The cart file is the source of truth. Sessions with a live store (and so a
//! possibly applied coupon) are kept in a `moka` cache that forgets idle
//! sessions; empty carts are dropped from it straight away. Disk I/O runs on
//! the blocking pool under the session's own lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use moka::future::Cache;
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::coupons::CouponValidator;
use crate::domain::aggregates::{AddItem, CartState, OrderDraft, PaymentMethod, PricingRules};
use crate::persistence::{self, FileStorage};
use crate::store::CartStore;
use crate::StorefrontError;

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
const MAX_CACHED_SESSIONS: u64 = 10_000;

type SessionCart = Arc<Mutex<CartStore>>;
type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    sessions: Cache<Uuid, SessionCart>,
    data_dir: PathBuf,
    pricing: PricingRules,
    coupons: Arc<dyn CouponValidator>,
}

impl AppState {
    pub fn new(data_dir: impl Into<PathBuf>, pricing: PricingRules, coupons: Arc<dyn CouponValidator>) -> Self {
        Self { sessions: session_cache(DEFAULT_SESSION_IDLE), data_dir: data_dir.into(), pricing, coupons }
    }

    /// Replaces the session cache with one that forgets sessions idle for `idle`.
    pub fn session_idle(mut self, idle: Duration) -> Self { self.sessions = session_cache(idle); self }

    /// Number of sessions currently held in memory.
    pub async fn cached_sessions(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }

    fn storage_for(&self, session: Uuid) -> FileStorage { FileStorage::new(self.data_dir.join(session.to_string())) }

    /// Current cart without keeping the session in memory.
    async fn read_cart(&self, session: Uuid) -> Result<CartState, ApiError> {
        if let Some(cart) = self.sessions.get(&session).await {
            return Ok(cart.lock().await.state().clone());
        }
        let storage = self.storage_for(session);
        let rules = self.pricing;
        tokio::task::spawn_blocking(move || CartState::from_items(persistence::load_items(&storage), &rules))
            .await
            .map_err(internal)
    }

    /// Runs a command against the session's store, restoring it from disk on first use.
    async fn mutate(&self, session: Uuid, f: impl FnOnce(&mut CartStore) -> CartState + Send + 'static) -> Result<CartState, ApiError> {
        let storage = self.storage_for(session);
        let rules = self.pricing;
        let cart = self.sessions
            .try_get_with(session, async move {
                tokio::task::spawn_blocking(move || Arc::new(Mutex::new(CartStore::open(storage, rules)))).await
            })
            .await
            .map_err(internal)?;
        let state = tokio::task::spawn_blocking(move || f(&mut cart.blocking_lock())).await.map_err(internal)?;
        if state.is_empty() { self.sessions.invalidate(&session).await; }
        Ok(state)
    }
}

fn session_cache(idle: Duration) -> Cache<Uuid, SessionCart> {
    Cache::builder()
        .max_capacity(MAX_CACHED_SESSIONS)
        .time_to_idle(idle)
        .build()
}

fn internal(e: impl std::fmt::Display) -> ApiError { (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()) }

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "woodpress-storefront"})) }))
        .route("/api/v1/cart", post(create_cart))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_item))
        .route("/api/v1/cart/:session/items/:item", put(update_quantity).delete(remove_item))
        .route("/api/v1/cart/:session/coupon", post(apply_coupon))
        .route("/api/v1/cart/:session/checkout", get(checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn create_cart() -> (StatusCode, Json<serde_json::Value>) {
    let session = Uuid::new_v4();
    info!(%session, "cart session created");
    (StatusCode::CREATED, Json(serde_json::json!({"session": session})))
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<Uuid>) -> Result<Json<CartState>, ApiError> {
    s.read_cart(session).await.map(Json)
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<Uuid>) -> Result<Json<CartState>, ApiError> {
    s.mutate(session, |c| c.clear().clone()).await.map(Json)
}

async fn add_item(State(s): State<AppState>, Path(session): Path<Uuid>, Json(r): Json<AddItem>) -> Result<Json<CartState>, ApiError> {
    s.mutate(session, move |c| c.add_item(r).clone()).await.map(Json)
}

#[derive(Debug, Deserialize)] pub struct UpdateQuantityRequest { pub quantity: i64 }

async fn update_quantity(State(s): State<AppState>, Path((session, item)): Path<(Uuid, String)>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartState>, ApiError> {
    s.mutate(session, move |c| c.update_quantity(item.into(), r.quantity).clone()).await.map(Json)
}

async fn remove_item(State(s): State<AppState>, Path((session, item)): Path<(Uuid, String)>) -> Result<Json<CartState>, ApiError> {
    s.mutate(session, move |c| c.remove_item(item.into()).clone()).await.map(Json)
}

#[derive(Debug, Deserialize)] pub struct ApplyCouponRequest { pub code: String }

async fn apply_coupon(State(s): State<AppState>, Path(session): Path<Uuid>, Json(r): Json<ApplyCouponRequest>) -> Result<Json<CartState>, ApiError> {
    let coupons = s.coupons.clone();
    s.mutate(session, move |c| {
        let validation = coupons.validate(&r.code, c.state().subtotal());
        info!(%session, code = %r.code, accepted = validation.is_success(), "coupon checked");
        c.apply_coupon(validation).clone()
    }).await.map(Json)
}

#[derive(Debug, Deserialize)] pub struct CheckoutParams { #[serde(default)] pub payment: PaymentMethod }

async fn checkout(State(s): State<AppState>, Path(session): Path<Uuid>, Query(p): Query<CheckoutParams>) -> Result<Json<OrderDraft>, ApiError> {
    let cart = s.read_cart(session).await?;
    OrderDraft::from_cart(&cart, p.payment, &s.pricing)
        .map(Json)
        .map_err(|e| match e {
            StorefrontError::EmptyCart => (StatusCode::BAD_REQUEST, e.to_string()),
            _ => internal(e),
        })
}
