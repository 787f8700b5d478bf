//! REST API server for AadhaarChain
//!
//! Serves the credential, verification and history endpoints the web client
//! talks to, plus read-only chain inspection under `/api`.

use axum::{
    extract::{Path, Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::history::{HistoryPage, HistoryQuery};
use crate::service::VerificationService;

pub const INVALID_SUBJECT_MESSAGE: &str = "Invalid Aadhaar number";

/// Shared handler state
#[derive(Clone)]
pub struct ApiNode {
    pub service: Arc<VerificationService>,
    reveal_otp: bool,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    otps_issued: u64,
    transactions_verified: u64,
    transactions_rejected: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl ApiNode {
    pub fn new(service: Arc<VerificationService>, reveal_otp: bool) -> Self {
        Self {
            service,
            reveal_otp,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            otps_issued: stats.otps_issued,
            transactions_verified: stats.transactions_verified,
            transactions_rejected: stats.transactions_rejected,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(ChainError::InvalidSubjectFormat(_)) => {
                (StatusCode::BAD_REQUEST, INVALID_SUBJECT_MESSAGE.to_string())
            }
            ApiError::BlockchainError(e @ ChainError::InvalidQuery(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::BlockchainError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateOtpRequest {
    #[serde(default, alias = "aadhar_number")]
    pub subject_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateOtpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTransactionRequest {
    #[serde(default, alias = "aadhar_number")]
    pub subject_id: String,
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTransactionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub otps_issued: u64,
    pub transactions_verified: u64,
    pub transactions_rejected: u64,
    pub uptime_seconds: u64,
}

/// Block listing pages count from 1, like history pages.
#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

// ============================================================================
// Middleware
// ============================================================================

/// Marks a 200 response whose body reports `success: false`.
#[derive(Clone, Copy)]
struct Rejected;

fn rejected<T: IntoResponse>(body: T) -> Response {
    let mut response = body.into_response();
    response.extensions_mut().insert(Rejected);
    response
}

async fn stats_middleware(State(node): State<Arc<ApiNode>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success =
        response.status().is_success() && response.extensions().get::<Rejected>().is_none();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the router with all endpoints
pub fn build_api_router(node: Arc<ApiNode>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let inspection_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        .route("/blockchain/stats", get(get_blockchain_stats))
        .route("/blockchain/blocks", get(get_blocks))
        .route("/blockchain/block/:index", get(get_block_by_index))
        .route("/blockchain/verify", get(verify_chain));

    Router::new()
        .route("/generate-otp", post(generate_otp))
        .route("/verify-transaction", post(verify_transaction))
        .route("/transaction-history/:subject_id", get(transaction_history))
        .nest("/api", inspection_routes)
        // logging before stats so we always record timing
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn run_api_server(node: Arc<ApiNode>, addr: SocketAddr) -> Result<(), ChainError> {
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn generate_otp(
    State(node): State<Arc<ApiNode>>,
    Json(req): Json<GenerateOtpRequest>,
) -> Response {
    let raw = req.subject_id.unwrap_or_default();

    match node.service.issue_credential(&raw) {
        Ok(issued) => {
            node.api_stats.write().await.otps_issued += 1;
            Json(GenerateOtpResponse {
                success: true,
                otp: node.reveal_otp.then_some(issued.code),
                error: None,
            })
            .into_response()
        }
        Err(_) => rejected(Json(GenerateOtpResponse {
            success: false,
            otp: None,
            error: Some(INVALID_SUBJECT_MESSAGE.to_string()),
        })),
    }
}

async fn verify_transaction(
    State(node): State<Arc<ApiNode>>,
    Json(req): Json<VerifyTransactionRequest>,
) -> Result<Response, ApiError> {
    // Sealing is CPU-bound; keep it off the async workers.
    let service = node.service.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        service.submit(&req.subject_id, &req.transaction_type, &req.otp)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Verification task failed: {}", e)))?;

    {
        let mut stats = node.api_stats.write().await;
        if outcome.is_verified() {
            stats.transactions_verified += 1;
        } else {
            stats.transactions_rejected += 1;
        }
    }

    let body = Json(VerifyTransactionResponse {
        success: outcome.is_verified(),
        message: outcome.message().to_string(),
    });
    Ok(if outcome.is_verified() {
        body.into_response()
    } else {
        rejected(body)
    })
}

async fn transaction_history(
    State(node): State<Arc<ApiNode>>,
    Path(subject_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let page = node.service.query_history(&subject_id, &query)?;
    Ok(Json(page))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_api_stats(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}

async fn get_blockchain_stats(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(node.service.stats())
}

async fn get_blocks(
    State(node): State<Arc<ApiNode>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if params.page == 0 || params.limit == 0 {
        return Err(ChainError::InvalidQuery("page and limit must be at least 1".to_string()).into());
    }
    let blocks = node.service.blockchain().snapshot();
    let total = blocks.len();

    let limit = params.limit.min(100); // Max 100 blocks per request
    let offset = (params.page - 1).saturating_mul(limit);

    let page: Vec<_> = blocks
        .into_iter()
        .enumerate()
        .rev()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|(index, b)| {
            serde_json::json!({
                "index": index,
                "sealed_at": b.sealed_at,
                "hash": b.content_hash,
                "previous_hash": b.previous_hash,
                "nonce": b.nonce,
                "payload": b.payload,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "blocks": page,
        "total": total,
        "page": params.page,
        "limit": limit
    })))
}

async fn get_block_by_index(
    State(node): State<Arc<ApiNode>>,
    Path(index): Path<usize>,
) -> Result<Json<Block>, ApiError> {
    node.service
        .blockchain()
        .block(index)
        .ok_or_else(|| ApiError::NotFound(format!("Block at index {} not found", index)))
        .map(Json)
}

async fn verify_chain(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    match node.service.verify_integrity() {
        Ok(()) => Json(serde_json::json!({ "valid": true })),
        Err(ChainError::ChainIntegrityViolation { index, kind }) => Json(serde_json::json!({
            "valid": false,
            "violation": { "index": index, "kind": kind }
        })),
        Err(e) => Json(serde_json::json!({
            "valid": false,
            "error": e.to_string()
        })),
    }
}
