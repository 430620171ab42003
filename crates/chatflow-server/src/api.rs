use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use chatflow_shared::{token, Identity, MessageView};
use chatflow_store::{Database, User};

use crate::auth;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::registry::ConnectionRegistry;
use crate::relay;
use crate::store::MessageStore;

#[derive(Clone)]
pub struct AppState {
    /// Account CRUD goes straight to the database.
    pub db: Arc<Mutex<Database>>,
    /// The relay core sees persistence only through this seam.
    pub store: Arc<dyn MessageStore>,
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out channel every live connection subscribes to.
    pub delivered_tx: broadcast::Sender<MessageView>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = match state.config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(
                origin = %state.config.allowed_origin,
                "Invalid ALLOWED_ORIGIN, allowing any origin"
            );
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any)
        }
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/ws", get(relay::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful register/login body: a credential token plus the profile.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: Identity,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ServerError::Validation(
            "Username, email, and password are required".to_string(),
        ));
    }

    if req.password.len() < 6 {
        return Err(ServerError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&req.password)?;

    let user = {
        let db = state.db.lock().await;

        if db.user_by_email(email)?.is_some() {
            return Err(ServerError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        if db.user_by_username(username)?.is_some() {
            return Err(ServerError::Conflict("Username already taken".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        db.insert_user(&user)?;
        user
    };

    info!(user = %user.username, "user registered");

    let identity = Identity {
        id: user.id,
        username: user.username,
        email: user.email,
    };
    let token = token::issue(&identity, &state.config.jwt_secret)?;

    Ok(Json(AuthResponse {
        message: "User created successfully".to_string(),
        token,
        user: identity,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let email = req.email.trim();

    if email.is_empty() || req.password.is_empty() {
        return Err(ServerError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = {
        let db = state.db.lock().await;
        db.user_by_email(email)?
            .ok_or(ServerError::InvalidCredentials)?
    };

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ServerError::InvalidCredentials);
    }

    info!(user = %user.username, "user logged in");

    let identity = Identity {
        id: user.id,
        username: user.username,
        email: user.email,
    };
    let token = token::issue(&identity, &state.config.jwt_secret)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: identity,
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting relay server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
