//! # REST API
//!
//! The axum router exposing the local attestation network. All endpoints
//! share [`AppState`] through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                         | Description                              |
//! |--------|------------------------------|------------------------------------------|
//! | GET    | `/health`                    | Liveness probe                           |
//! | GET    | `/status`                    | Network summary                          |
//! | GET    | `/parties`                   | Parties known to the network map         |
//! | POST   | `/attestations`              | Run an issuance flow                     |
//! | GET    | `/attestations/:tx_id`       | Finalised transaction from a party vault |
//! | GET    | `/metrics`                   | Prometheus metrics                       |
//!
//! Flow errors map to HTTP status codes: schema 400, validation 422,
//! counterparty rejection or notary conflict 409, timeout 504, unknown
//! party 404.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use reledger_contracts::{PropertyAddress, SchemaError};
use reledger_protocol::identity::{IdentityService, Party};
use reledger_protocol::network::SessionError;
use reledger_protocol::notary::NotaryError;
use reledger_protocol::transaction::SecureHash;
use reledger_workflows::{FlowError, FlowNode, IssueAttestation, LocalNetwork, SignedAttestation};

use crate::metrics::{self, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub network: Arc<LocalNetwork>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(Arc::clone(&state.metrics));

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/parties", get(parties_handler))
        .route("/attestations", post(issue_handler))
        .route("/attestations/:tx_id", get(attestation_handler))
        .with_state(state)
        .merge(metrics_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /attestations`. Parties are given by name.
///
/// Address lines default to empty. `price` and `selling_date` are required;
/// leaving either out is a schema error.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    /// Node that runs the flow and is recorded as broker.
    pub broker: String,
    #[serde(default)]
    pub apt_number: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub parcel_id: String,
    pub price: Option<i64>,
    pub selling_date: Option<String>,
    pub ledger_authority: String,
    pub sell_attester: String,
    pub buy_attester: String,
}

/// A finalised attestation transaction as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationSummary {
    pub tx_id: String,
    pub notary: String,
    pub address: PropertyAddress,
    pub price: i64,
    pub selling_date: String,
    pub ledger_authority: String,
    pub sell_attester: String,
    pub buy_attester: String,
    pub broker: String,
    /// Hex-encoded keys that signed, notary included.
    pub signers: Vec<String>,
}

impl AttestationSummary {
    pub fn from_signed(stx: &SignedAttestation) -> Option<Self> {
        let record = stx.tx.outputs.first()?;
        Some(Self {
            tx_id: stx.id().to_hex(),
            notary: stx.tx.notary.name().to_string(),
            address: record.address.clone(),
            price: record.price,
            selling_date: record.selling_date.clone(),
            ledger_authority: record.ledger_authority.name().to_string(),
            sell_attester: record.sell_attester.name().to_string(),
            buy_attester: record.buy_attester.name().to_string(),
            broker: record.broker.name().to_string(),
            signers: stx.sigs.iter().map(|s| s.by.to_hex()).collect(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartyInfo {
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
    /// Whether this process runs a node for the party.
    pub local: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub notary: String,
    pub parties: usize,
    pub sessions_opened: u64,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct VaultQuery {
    /// Vault to read. Any local node's vault when omitted.
    pub party: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    UnknownParty(String),
    BadRequest(String),
    NotFound(String),
    Flow(FlowError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownParty(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Flow(err) => flow_status(err),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::UnknownParty(_) => "unknown_party",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Flow(err) => err.kind(),
        }
    }
}

fn flow_status(err: &FlowError) -> StatusCode {
    match err {
        FlowError::Schema(_) => StatusCode::BAD_REQUEST,
        FlowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::CounterpartyRejection { .. } => StatusCode::CONFLICT,
        FlowError::Finality(NotaryError::Conflict { .. }) => StatusCode::CONFLICT,
        FlowError::Finality(NotaryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        FlowError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FlowError::Session(SessionError::UnknownParty(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        ApiError::Flow(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::UnknownParty(name) => write!(f, "unknown party: {name}"),
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => f.write_str(msg),
            ApiError::Flow(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        notary: state.network.notary().identity().name().to_string(),
        parties: state.network.nodes().count(),
        sessions_opened: state.network.sessions_opened(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn parties_handler(State(state): State<AppState>) -> impl IntoResponse {
    let parties: Vec<PartyInfo> = state
        .network
        .identities()
        .all_parties()
        .into_iter()
        .map(|p| PartyInfo {
            local: state.network.node(p.name()).is_some(),
            name: p.name().to_string(),
            public_key: p.owning_key().to_hex(),
            fingerprint: p.owning_key().fingerprint(),
        })
        .collect();
    Json(parties)
}

/// `POST /attestations`: run the issuance flow on the broker's node and
/// return the notarised transaction.
async fn issue_handler(
    State(state): State<AppState>,
    Json(req): Json<IssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let broker = local_node(&state.network, &req.broker)?;
    let request = resolve_request(&state.network, req)?;

    let stx = run_issuance(&state.metrics, &broker, request).await?;
    let summary = AttestationSummary::from_signed(&stx)
        .ok_or_else(|| ApiError::NotFound("transaction has no output".into()))?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn attestation_handler(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
    Query(query): Query<VaultQuery>,
) -> Result<Json<AttestationSummary>, ApiError> {
    let id = SecureHash::from_hex(&tx_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid transaction id: {e}")))?;

    let found = match &query.party {
        Some(name) => local_node(&state.network, name)?.vault().get(&id),
        None => state.network.nodes().find_map(|n| n.vault().get(&id)),
    };
    found
        .as_ref()
        .and_then(AttestationSummary::from_signed)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("transaction {tx_id} not found")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn local_node(network: &LocalNetwork, name: &str) -> Result<Arc<FlowNode>, ApiError> {
    network
        .node(name)
        .ok_or_else(|| ApiError::UnknownParty(name.to_string()))
}

fn known_party(network: &LocalNetwork, name: &str) -> Result<Party, ApiError> {
    network
        .identities()
        .well_known_party(name)
        .ok_or_else(|| ApiError::UnknownParty(name.to_string()))
}

/// Resolve party names and check required fields.
pub fn resolve_request(
    network: &LocalNetwork,
    req: IssueRequest,
) -> Result<IssueAttestation, ApiError> {
    let price = req
        .price
        .ok_or(FlowError::Schema(SchemaError::MissingField("price")))?;
    let selling_date = req
        .selling_date
        .ok_or(FlowError::Schema(SchemaError::MissingField("selling_date")))?;

    Ok(IssueAttestation {
        address: PropertyAddress {
            apt_number: req.apt_number,
            address_line1: req.address_line1,
            address_line2: req.address_line2,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
            parcel_id: req.parcel_id,
        },
        price,
        selling_date,
        ledger_authority: known_party(network, &req.ledger_authority)?,
        sell_attester: known_party(network, &req.sell_attester)?,
        buy_attester: known_party(network, &req.buy_attester)?,
    })
}

/// Run one issuance flow on `broker`, recording metrics.
pub async fn run_issuance(
    metrics: &SharedMetrics,
    broker: &FlowNode,
    request: IssueAttestation,
) -> Result<SignedAttestation, FlowError> {
    metrics.flows_started_total.inc();
    let started = Instant::now();
    let result = broker.issue_attestation(request).await;
    metrics
        .flow_duration_seconds
        .observe(started.elapsed().as_secs_f64());

    match &result {
        Ok(stx) => {
            metrics.flows_finalised_total.inc();
            tracing::info!(tx_id = %stx.id(), broker = %broker.identity(), "attestation finalised");
        }
        Err(err) => {
            metrics.record_flow_failure(err);
            tracing::warn!(broker = %broker.identity(), kind = err.kind(), %err, "attestation failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use reledger_workflows::LocalNetworkBuilder;
    use tower::ServiceExt;

    fn test_app_state() -> AppState {
        let network = LocalNetworkBuilder::new()
            .party("reLedger")
            .party("SellAttester")
            .party("BuyAttester")
            .party("Broker")
            .start();
        AppState {
            version: "0.1.0-test".into(),
            network: Arc::new(network),
            metrics: Arc::new(crate::metrics::NodeMetrics::new()),
        }
    }

    fn issue_body() -> serde_json::Value {
        serde_json::json!({
            "broker": "Broker",
            "apt_number": "12",
            "address_line1": "80 Pineapple St",
            "city": "Brooklyn",
            "state": "NY",
            "zip_code": "11201",
            "parcel_id": "3-00230-0014",
            "price": 2_400_000,
            "selling_date": "2026-05-02",
            "ledger_authority": "reLedger",
            "sell_attester": "SellAttester",
            "buy_attester": "BuyAttester"
        })
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn error_kind(body: &[u8]) -> String {
        serde_json::from_slice::<ErrorResponse>(body).unwrap().kind
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn parties_lists_nodes_and_notary() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/parties").await;

        assert_eq!(status, StatusCode::OK);
        let parties: Vec<PartyInfo> = serde_json::from_slice(&body).unwrap();
        let names: Vec<_> = parties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Broker", "BuyAttester", "Notary", "SellAttester", "reLedger"]
        );
        let notary = parties.iter().find(|p| p.name == "Notary").unwrap();
        assert!(!notary.local);
        assert_eq!(notary.public_key.len(), 64);
    }

    #[tokio::test]
    async fn issuance_returns_created_and_is_queryable() {
        let state = test_app_state();
        let router = create_router(state.clone());

        let (status, body) = post_json(&router, "/attestations", issue_body()).await;
        assert_eq!(status, StatusCode::CREATED);
        let summary: AttestationSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.broker, "Broker");
        assert_eq!(summary.notary, "Notary");
        assert_eq!(summary.price, 2_400_000);
        assert_eq!(summary.address.zip_code, "11201");
        assert_eq!(summary.signers.len(), 5);

        let path = format!("/attestations/{}?party=Broker", summary.tx_id);
        let (status, body) = get(&router, &path).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: AttestationSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched.tx_id, summary.tx_id);

        assert_eq!(state.metrics.flows_started_total.get(), 1);
        assert_eq!(state.metrics.flows_finalised_total.get(), 1);
    }

    #[tokio::test]
    async fn broker_as_attester_is_unprocessable() {
        let router = create_router(test_app_state());
        let mut body = issue_body();
        body["sell_attester"] = "Broker".into();

        let (status, body) = post_json(&router, "/attestations", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_kind(&body), "validation");
    }

    #[tokio::test]
    async fn missing_price_is_a_schema_error() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let mut body = issue_body();
        body.as_object_mut().unwrap().remove("price");

        let (status, body) = post_json(&router, "/attestations", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "schema");
        assert_eq!(state.metrics.flows_started_total.get(), 0);
    }

    #[tokio::test]
    async fn unknown_party_is_not_found() {
        let router = create_router(test_app_state());
        let mut body = issue_body();
        body["ledger_authority"] = "Nobody".into();

        let (status, body) = post_json(&router, "/attestations", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_kind(&body), "unknown_party");
    }

    #[tokio::test]
    async fn halted_notary_is_unavailable() {
        let state = test_app_state();
        state.network.notary().set_halted(true);
        let router = create_router(state.clone());

        let (status, body) = post_json(&router, "/attestations", issue_body()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_kind(&body), "finality");

        let (_, metrics) = get(&router, "/metrics").await;
        let text = String::from_utf8(metrics).unwrap();
        assert!(text.contains(r#"reledger_flows_failed_total{kind="finality"} 1"#));
    }

    #[tokio::test]
    async fn malformed_tx_id_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, _) = get(&router, "/attestations/not-hex").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let router = create_router(test_app_state());
        let path = format!("/attestations/{}", "ab".repeat(32));
        let (status, body) = get(&router, &path).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_kind(&body), "not_found");
    }

    #[tokio::test]
    async fn status_reports_network() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.parties, 4);
        assert_eq!(resp.notary, "Notary");
        assert_eq!(resp.sessions_opened, 0);
    }
}
