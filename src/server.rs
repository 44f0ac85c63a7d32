//! JSON-RPC 2.0 over HTTP for the governance API
//!
//! Every request is a POST to `/` carrying one call or a batch. Methods live
//! under the `dpos_` namespace and take positional parameters; write
//! methods accept an optional trailing transaction-arguments object and
//! read methods an optional trailing block tag.

use alloy_primitives::{Address, U256};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{self, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{GovError, Result};
use crate::rpc::{Backend, GovernanceQueryApi, GovernanceService, TransactionArgs};
use crate::types::BlockNumberOrTag;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// Catch-all server error code, used for execution failures.
pub const SERVER_ERROR: i64 = -32000;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Serialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RpcResponse {
    fn result(id: Value, result: Value) -> Self {
        RpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, err: RpcError) -> Self {
        RpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(err.into_object()),
        }
    }
}

// ============================================================================
// RPC Error Handling
// ============================================================================

#[derive(Debug)]
pub enum RpcError {
    Parse(String),
    InvalidRequest(String),
    MethodNotFound(String),
    InvalidParams(String),
    Internal(String),
    Gov(GovError),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse(_) => PARSE_ERROR,
            RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => INVALID_PARAMS,
            RpcError::Internal(_) => INTERNAL_ERROR,
            RpcError::Gov(err) => match err {
                GovError::Identifier(_) | GovError::InvalidArgs(_) | GovError::Pack { .. } => {
                    INVALID_PARAMS
                }
                _ => SERVER_ERROR,
            },
        }
    }

    fn into_object(self) -> RpcErrorObject {
        let code = self.code();
        let (message, data) = match self {
            RpcError::Parse(msg) => (format!("parse error: {}", msg), None),
            RpcError::InvalidRequest(msg) => (format!("invalid request: {}", msg), None),
            RpcError::MethodNotFound(method) => (
                format!("the method {} does not exist/is not available", method),
                None,
            ),
            RpcError::InvalidParams(msg) => (format!("invalid argument: {}", msg), None),
            RpcError::Internal(msg) => (msg, None),
            RpcError::Gov(err) => {
                let data = err.method().map(|m| json!({ "method": m }));
                (err.to_string(), data)
            }
        };
        RpcErrorObject {
            code,
            message,
            data,
        }
    }
}

impl From<GovError> for RpcError {
    fn from(err: GovError) -> Self {
        RpcError::Gov(err)
    }
}

// ============================================================================
// Positional Parameters
// ============================================================================

struct Params {
    values: Vec<Value>,
    next: usize,
}

impl Params {
    fn new(params: Value) -> std::result::Result<Self, RpcError> {
        let values = match params {
            Value::Null => Vec::new(),
            Value::Array(values) => values,
            _ => {
                return Err(RpcError::InvalidParams(
                    "non-array params are not supported".to_string(),
                ))
            }
        };
        Ok(Params { values, next: 0 })
    }

    fn required<T: DeserializeOwned>(&mut self, name: &str) -> std::result::Result<T, RpcError> {
        let index = self.next;
        match self.optional::<T>(name)? {
            Some(value) => Ok(value),
            None => Err(RpcError::InvalidParams(format!(
                "missing value for required argument {} ({})",
                index, name
            ))),
        }
    }

    /// Missing and `null` both read as `None`.
    fn optional<T: DeserializeOwned>(
        &mut self,
        name: &str,
    ) -> std::result::Result<Option<T>, RpcError> {
        let index = self.next;
        self.next += 1;
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| RpcError::InvalidParams(format!("argument {} ({}): {}", index, name, e))),
        }
    }

    fn block(&mut self) -> std::result::Result<BlockNumberOrTag, RpcError> {
        Ok(self.optional("block")?.unwrap_or_default())
    }

    fn finish(&self) -> std::result::Result<(), RpcError> {
        if self.values.len() > self.next {
            return Err(RpcError::InvalidParams(format!(
                "too many arguments, want at most {}",
                self.next
            )));
        }
        Ok(())
    }
}

fn to_json<T: Serialize>(value: T) -> std::result::Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

// ============================================================================
// Dispatch
// ============================================================================

/// Methods served under the `dpos_` namespace.
pub const METHODS: &[&str] = &[
    "dpos_initProposal",
    "dpos_updateProposal",
    "dpos_cancelProposal",
    "dpos_guarantee",
    "dpos_updateValidatorDeposit",
    "dpos_updateValidatorRate",
    "dpos_updateValidatorNameDetails",
    "dpos_unstake",
    "dpos_restore",
    "dpos_validatorRedeem",
    "dpos_earnValidatorReward",
    "dpos_vote",
    "dpos_cancelVote",
    "dpos_voterRedeem",
    "dpos_earnVoteReward",
    "dpos_addressProposalSets",
    "dpos_allProposalSets",
    "dpos_addressProposals",
    "dpos_allProposals",
    "dpos_addressProposalCount",
    "dpos_proposalCount",
    "dpos_proposalInfos",
    "dpos_topValidators",
];

/// Runs a read on the blocking pool; the engine executes synchronously.
async fn blocking_read<B, T, F>(
    svc: &Arc<GovernanceService<B>>,
    read: F,
) -> std::result::Result<Value, RpcError>
where
    B: Backend + 'static,
    T: Serialize + Send + 'static,
    F: FnOnce(&GovernanceQueryApi<B>) -> Result<T> + Send + 'static,
{
    let svc = Arc::clone(svc);
    let value = tokio::task::spawn_blocking(move || read(&svc.query))
        .await
        .map_err(|e| RpcError::Internal(format!("read task failed: {}", e)))??;
    to_json(value)
}

async fn dispatch<B: Backend + 'static>(
    svc: &Arc<GovernanceService<B>>,
    method: &str,
    params: Value,
) -> std::result::Result<Value, RpcError> {
    let mut p = Params::new(params)?;
    let tx = &svc.tx;

    let result = match method {
        "dpos_initProposal" => {
            let p_type: u8 = p.required("pType")?;
            let rate: u8 = p.required("rate")?;
            let name: String = p.required("name")?;
            let details: String = p.required("details")?;
            let args: Option<TransactionArgs> = p.optional("args")?;
            p.finish()?;
            to_json(tx.init_proposal(p_type, rate, name, details, args).await?)?
        }
        "dpos_updateProposal" => {
            let id: String = p.required("id")?;
            let rate: u8 = p.required("rate")?;
            let deposit = p.required("deposit")?;
            let name: String = p.required("name")?;
            let details: String = p.required("details")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(
                tx.update_proposal(id, rate, deposit, name, details, args)
                    .await?,
            )?
        }
        "dpos_cancelProposal" => {
            let id: String = p.required("id")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.cancel_proposal(id, args).await?)?
        }
        "dpos_guarantee" => {
            let id: String = p.required("id")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.guarantee(id, args).await?)?
        }
        "dpos_updateValidatorDeposit" => {
            let deposit = p.required("deposit")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.update_validator_deposit(deposit, args).await?)?
        }
        "dpos_updateValidatorRate" => {
            let rate: u8 = p.required("rate")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.update_validator_rate(rate, args).await?)?
        }
        "dpos_updateValidatorNameDetails" => {
            let name: String = p.required("name")?;
            let details: String = p.required("details")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.update_validator_name_details(name, details, args).await?)?
        }
        "dpos_unstake" => {
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.unstake(args).await?)?
        }
        "dpos_restore" => {
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.restore(args).await?)?
        }
        "dpos_validatorRedeem" => {
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.validator_redeem(args).await?)?
        }
        "dpos_earnValidatorReward" => {
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.earn_validator_reward(args).await?)?
        }
        "dpos_vote" => {
            let validator = p.required("validator")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.vote(validator, args).await?)?
        }
        "dpos_cancelVote" => {
            let validator = p.required("validator")?;
            let amount = p.required("amount")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.cancel_vote(validator, amount, args).await?)?
        }
        "dpos_voterRedeem" => {
            let validator = p.required("validator")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.voter_redeem(validator, args).await?)?
        }
        "dpos_earnVoteReward" => {
            let validator = p.required("validator")?;
            let args = p.optional("args")?;
            p.finish()?;
            to_json(tx.earn_vote_reward(validator, args).await?)?
        }
        "dpos_addressProposalSets" => {
            let addr: Address = p.required("addr")?;
            let page: U256 = p.required("page")?;
            let size: U256 = p.required("size")?;
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.address_proposal_sets(addr, page, size, block)).await?
        }
        "dpos_allProposalSets" => {
            let page: U256 = p.required("page")?;
            let size: U256 = p.required("size")?;
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.all_proposal_sets(page, size, block)).await?
        }
        "dpos_addressProposals" => {
            let addr: Address = p.required("addr")?;
            let page: U256 = p.required("page")?;
            let size: U256 = p.required("size")?;
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.address_proposals(addr, page, size, block)).await?
        }
        "dpos_allProposals" => {
            let page: U256 = p.required("page")?;
            let size: U256 = p.required("size")?;
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.all_proposals(page, size, block)).await?
        }
        "dpos_addressProposalCount" => {
            let addr: Address = p.required("addr")?;
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.address_proposal_count(addr, block)).await?
        }
        "dpos_proposalCount" => {
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.proposal_count(block)).await?
        }
        "dpos_proposalInfos" => {
            let id: String = p.required("id")?;
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.proposal_infos(&id, block)).await?
        }
        "dpos_topValidators" => {
            let block = p.block()?;
            p.finish()?;
            blocking_read(svc, move |q| q.top_validators(block)).await?
        }
        other => return Err(RpcError::MethodNotFound(other.to_string())),
    };
    Ok(result)
}

async fn handle_call<B: Backend + 'static>(
    svc: &Arc<GovernanceService<B>>,
    call: Value,
) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_value(call) {
        Ok(request) => request,
        Err(e) => return RpcResponse::error(Value::Null, RpcError::InvalidRequest(e.to_string())),
    };
    if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        return RpcResponse::error(
            request.id,
            RpcError::InvalidRequest("unsupported jsonrpc version".to_string()),
        );
    }

    debug!(rpc_method = %request.method, "rpc.dispatch");
    match dispatch(svc, &request.method, request.params).await {
        Ok(result) => RpcResponse::result(request.id, result),
        Err(err) => {
            warn!(rpc_method = %request.method, code = err.code(), error = ?err, "rpc.error");
            RpcResponse::error(request.id, err)
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn rpc_handler<B: Backend + 'static>(
    State(svc): State<Arc<GovernanceService<B>>>,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return Json(RpcResponse::error(Value::Null, RpcError::Parse(e.to_string())))
                .into_response()
        }
    };

    match payload {
        Value::Array(calls) => {
            if calls.is_empty() {
                return Json(RpcResponse::error(
                    Value::Null,
                    RpcError::InvalidRequest("empty batch".to_string()),
                ))
                .into_response();
            }
            let mut responses = Vec::with_capacity(calls.len());
            for call in calls {
                responses.push(handle_call(&svc, call).await);
            }
            Json(responses).into_response()
        }
        call => Json(handle_call(&svc, call).await).into_response(),
    }
}

async fn health_check<B: Backend + 'static>(
    State(svc): State<Arc<GovernanceService<B>>>,
) -> impl IntoResponse {
    let backend = svc.backend();
    let head = backend.current_header();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "chainId": backend.chain_config().chain_id,
            "head": head.number,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Logs method, path, status and duration of every HTTP request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %duration.as_millis(),
        "rpc.request"
    );

    response
}

// ============================================================================
// Server
// ============================================================================

/// CORS for the listed origins only. With no origins configured there is no
/// CORS layer at all, so browsers refuse cross-origin calls to the signing
/// methods.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
            .allow_headers(vec![http::header::CONTENT_TYPE]),
    )
}

/// Router without CORS: same-origin and non-browser clients only.
pub fn build_router<B: Backend + 'static>(service: Arc<GovernanceService<B>>) -> Router {
    build_router_with_origins(service, &[])
}

pub fn build_router_with_origins<B: Backend + 'static>(
    service: Arc<GovernanceService<B>>,
    cors_origins: &[String],
) -> Router {
    let router = Router::new()
        .route("/", post(rpc_handler::<B>))
        .route("/health", get(health_check::<B>))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(service);
    match cors_layer(cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Binds the configured address and serves until the listener fails.
pub async fn serve<B: Backend + 'static>(
    config: &Config,
    service: Arc<GovernanceService<B>>,
) -> Result<()> {
    let addr = config.rpc.socket_addr();
    let app = build_router_with_origins(service, &config.rpc.cors_origins);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "JSON-RPC server listening on http://{}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| GovError::Io(e.to_string()))
}
