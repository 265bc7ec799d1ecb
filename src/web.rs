use crate::{
    app::{AppError, AppLocal},
    auth,
    categories::{CategoryCreate, CategoryUpdate},
    links::{LinkCreate, LinkUpdate},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::RwLock};

#[derive(Clone)]
struct SharedState {
    app: Arc<RwLock<AppLocal>>,
}

async fn start_app(app: AppLocal) {
    let bind_addr = app.config().read().unwrap().bind_addr.clone();
    let app = Arc::new(RwLock::new(app));

    let signal = shutdown_signal(app.clone());

    async fn shutdown_signal(app: Arc<RwLock<AppLocal>>) {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {
                let mut app = app.write().await;
                app.shutdown();

                log::warn!("waiting for task queue to stop");
                app.wait_task_queue_finish();
            },
            _ = terminate => {},
        }
    }

    let router = router(app);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind listen address");
    log::info!("listening on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await
        .expect("server error");
}

pub fn router(app: Arc<RwLock<AppLocal>>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/theme", put(update_theme))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/reorder", put(reorder_categories))
        .route(
            "/api/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/api/links", get(list_links).post(create_link))
        .route("/api/links/reorder", put(reorder_links))
        .route("/api/links/:id/refresh-favicon", post(refresh_favicon))
        .route("/api/links/:id", put(update_link).delete(delete_link))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

pub fn start_daemon(app: AppLocal) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime")
        .block_on(async { start_app(app).await });
}

// Make our own error that wraps `AppError`.
#[derive(Debug)]
struct HttpError(AppError);

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::IO(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, json!({"error": self.0.to_string()}).to_string()).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, HttpError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth::extract_bearer_token)
        .map(str::to_string)
        .ok_or(HttpError(AppError::Unauthorized))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "timestamp": Utc::now().to_rfc3339()}))
}

// --- auth ---

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn register(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let (user, token) = app.register(&payload.username, &payload.email, &payload.password)?;

        Ok((
            StatusCode::CREATED,
            Json(json!({"user": user, "token": token})),
        ))
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn login(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let (user, token) = app.login(&payload.username, &payload.password)?;

        Ok(Json(json!({"user": user, "token": token})))
    })
}

async fn logout(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        if let Ok(token) = bearer_token(&headers) {
            app.logout(&token);
        }

        Ok(Json(json!({"message": "Logged out successfully"})))
    })
}

async fn me(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let user = app.me(&user_id)?;

        Ok(Json(json!({"user": user})))
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeRequest {
    #[serde(default)]
    pub theme: String,
}

async fn update_theme(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<ThemeRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let user = app.set_theme(&user_id, &payload.theme)?;

        Ok(Json(json!({"user": user})))
    })
}

// --- categories ---

async fn list_categories(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let categories = app.list_categories(&user_id)?;

        Ok(Json(json!({"categories": categories})))
    })
}

async fn create_category(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<CategoryCreate>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let category = app.create_category(&user_id, payload)?;

        Ok((StatusCode::CREATED, Json(json!({"category": category}))))
    })
}

async fn update_category(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<CategoryUpdate>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let category = app.update_category(&user_id, &id, payload)?;

        Ok(Json(json!({"category": category})))
    })
}

async fn delete_category(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        app.delete_category(&user_id, &id)?;

        Ok(Json(json!({"message": "Category deleted"})))
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCategoriesRequest {
    #[serde(default)]
    pub category_ids: Vec<String>,
}

async fn reorder_categories(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<ReorderCategoriesRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        app.reorder_categories(&user_id, &payload.category_ids)?;

        Ok(Json(json!({"message": "Categories reordered"})))
    })
}

// --- links ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLinksQuery {
    pub category_id: Option<String>,
}

async fn list_links(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<ListLinksQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let links = app.list_links(&user_id, query.category_id.as_deref())?;

        Ok(Json(json!({"links": links})))
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCreateRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    pub category_id: Option<String>,
}

async fn create_link(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<LinkCreateRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    let link_create = LinkCreate {
        title: payload.title,
        url: payload.url,
        category_id: payload.category_id,
    };

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let link = app.create_link(&user_id, link_create)?;

        Ok((StatusCode::CREATED, Json(json!({"link": link}))))
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdateRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub category_id: Option<String>,
}

async fn update_link(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<LinkUpdateRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    let link_update = LinkUpdate {
        title: payload.title,
        url: payload.url,
        category_id: payload.category_id,
        ..Default::default()
    };

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let link = app.update_link(&user_id, &id, link_update)?;

        Ok(Json(json!({"link": link})))
    })
}

async fn delete_link(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        app.delete_link(&user_id, &id)?;

        Ok(Json(json!({"message": "Link deleted"})))
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderLinksRequest {
    #[serde(default)]
    pub link_ids: Vec<String>,
}

async fn reorder_links(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<ReorderLinksRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        app.reorder_links(&user_id, &payload.link_ids)?;

        Ok(Json(json!({"message": "Links reordered"})))
    })
}

/// Synchronous re-resolution; the response carries which tier produced
/// the icon so the UI can label it.
async fn refresh_favicon(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let user_id = app.authenticate(&token)?;
        let (link, result) = app.refresh_favicon(&user_id, &id)?;

        Ok(Json(
            json!({"link": link, "faviconSource": result.source.as_str()}),
        ))
    })
}
