use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use super::cors::{cors, CorsPolicy};
use super::log_request;
use crate::agent::PrintAgent;
use crate::error::{PrintError, PrintJob};
use crate::printer::models::DefaultPrinterSelection;
use crate::receipt::sale::SaleRequest;

type AgentRef = State<Arc<PrintAgent>>;

/// `{ok, code}` plus whatever object fields `extra` carries.
fn reply(ok: bool, code: &str, extra: Value) -> Json<Value> {
    let mut body = json!({ "ok": ok, "code": code });
    if let (Some(map), Value::Object(extra)) = (body.as_object_mut(), extra) {
        map.extend(extra);
    }
    Json(body)
}

fn failure(code: &str, err: &PrintError) -> Json<Value> {
    reply(false, code, json!({ "message": err.to_string() }))
}

fn agent_status(enabled: bool) -> Json<Value> {
    let code = if enabled { "AGENT_ON" } else { "AGENT_OFF" };
    reply(true, code, json!({ "enabled": enabled }))
}

fn default_printer_reply(code: &str, selection: Option<DefaultPrinterSelection>) -> Json<Value> {
    reply(true, code, json!({ "defaultPrinter": selection }))
}

/// GET /agent/status
async fn status(State(agent): AgentRef) -> Json<Value> {
    agent_status(agent.is_enabled())
}

/// POST /agent/on
async fn agent_on(State(agent): AgentRef) -> Json<Value> {
    agent.set_enabled(true);
    agent_status(true)
}

/// POST /agent/off
async fn agent_off(State(agent): AgentRef) -> Json<Value> {
    agent.set_enabled(false);
    agent_status(false)
}

/// GET /printer/default
async fn get_default(State(agent): AgentRef) -> Json<Value> {
    default_printer_reply("DEFAULT_PRINTER_GET", agent.default_printer())
}

/// POST /printer/default with `{vendorId, productId}`. Nothing is stored
/// unless both ids validate.
async fn set_default(State(agent): AgentRef, body: Bytes) -> Json<Value> {
    let parsed = serde_json::from_slice::<Value>(&body)
        .map_err(|e| PrintError::InvalidDefault(e.to_string()))
        .and_then(|v| DefaultPrinterSelection::from_json(&v));

    match parsed {
        Ok(selection) => {
            agent.set_default_printer(selection);
            default_printer_reply("DEFAULT_PRINTER_SET", Some(selection))
        }
        Err(e) => {
            tracing::warn!("Rejected default printer: {e}");
            failure("DEFAULT_PRINTER_INVALID", &e)
        }
    }
}

/// DELETE /printer/default
async fn clear_default(State(agent): AgentRef) -> Json<Value> {
    agent.clear_default_printer();
    default_printer_reply("DEFAULT_PRINTER_CLEARED", None)
}

/// GET /printers
async fn printers(State(agent): AgentRef) -> Json<Value> {
    match agent.list_printers().await {
        Ok(list) if list.is_empty() => reply(true, "PRINTER_LIST_EMPTY", json!({ "printers": [] })),
        Ok(list) => reply(true, "PRINTER_LIST_OK", json!({ "printers": list })),
        Err(e) => {
            tracing::warn!("Printer listing failed: {e}");
            let code = match e {
                PrintError::Timeout(_) => "USB_TIMEOUT",
                _ => "USB_ACCESS_DENIED",
            };
            reply(
                false,
                code,
                json!({ "printers": [], "message": e.to_string() }),
            )
        }
    }
}

/// GET /print-test
async fn print_test(State(agent): AgentRef) -> Json<Value> {
    job_reply(PrintJob::Test, agent.print_test().await.map(drop))
}

/// POST /print-sale
async fn print_sale(State(agent): AgentRef, body: Bytes) -> Json<Value> {
    if !agent.is_enabled() {
        return job_reply(PrintJob::Sale, Err(PrintError::AgentDisabled));
    }
    let sale = match serde_json::from_slice::<SaleRequest>(&body) {
        Ok(sale) => sale,
        Err(e) => {
            tracing::warn!("Rejected sale payload: {e}");
            return job_reply(PrintJob::Sale, Err(PrintError::InvalidPayload(e.to_string())));
        }
    };
    job_reply(PrintJob::Sale, agent.print_sale(&sale).await.map(drop))
}

fn job_reply(job: PrintJob, result: Result<(), PrintError>) -> Json<Value> {
    match result {
        Ok(()) => reply(true, job.ok_code(), json!({})),
        Err(e) => failure(e.code(job), &e),
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, reply(false, "NOT_FOUND", json!({})))
}

pub fn build_router(agent: Arc<PrintAgent>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/agent/status", get(status))
        .route("/agent/on", post(agent_on))
        .route("/agent/off", post(agent_off))
        .route(
            "/printer/default",
            get(get_default).post(set_default).delete(clear_default),
        )
        .route("/printers", get(printers))
        .route("/print-test", get(print_test))
        .route("/print-sale", post(print_sale))
        .fallback(not_found)
        .with_state(agent)
        .layer(middleware::from_fn_with_state(
            CorsPolicy::new(cors_origins),
            cors,
        ))
        .layer(middleware::from_fn(log_request))
}
