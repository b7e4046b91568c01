//! Actix-web server for the Cypher-Lens API and page shell

use std::path::{Path, PathBuf};
use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, ResponseError};
use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::html::PAGE_HTML;
use crate::gql::normalize::NormalizedRecord;
use crate::gql::query_interface::{QueryError, QueryService};
use crate::graph_utils::graph::{project_records_with_report, GraphElement, ProjectionFields};
use crate::persistence::settings::AppSettings;

/// Per-server settings shared with every handler.
#[derive(Clone, Debug, Default)]
pub struct ApiConfig {
    // None disables the traffic log file
    pub log_dir: Option<PathBuf>,
    pub projection: ProjectionFields,
}

impl ApiConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self { log_dir: settings.api_log_dir(), projection: settings.projection.clone() }
    }
}

fn ensure_dir(p: &Path) {
    if let Some(parent) = p.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

fn log_line(dir: &Path, line: &str) {
    use std::io::Write;
    let now = time::OffsetDateTime::now_utc();
    let date = time::macros::format_description!("[year][month][day]");
    let ts = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let fname = match now.format(&date) { Ok(s) => format!("api_{}.log", s), Err(_) => "api.log".to_string() };
    let path = dir.join(fname);
    ensure_dir(&path);
    let ts_s = now.format(&ts).unwrap_or_else(|_| String::new());
    let msg = format!("{} | {}\n", ts_s, line);
    if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        let _ = f.write_all(msg.as_bytes());
    }
}

fn log_traffic(cfg: &ApiConfig, line: &str) {
    if let Some(dir) = &cfg.log_dir {
        log_line(dir, line);
    }
}

fn next_request_id() -> String {
    Uuid::now_v7().to_string()
}

#[derive(Deserialize)]
struct QueryBody {
    // Optional so a missing field reports "Query is required" rather than a parse error
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct RecordsDto<'a> {
    records: &'a [NormalizedRecord],
}

#[derive(Serialize)]
struct GraphDto<'a> {
    records: &'a [NormalizedRecord],
    elements: Vec<GraphElement>,
}

#[derive(Serialize)]
struct ErrorDto {
    error: String,
}

impl ResponseError for QueryError {
    fn status_code(&self) -> StatusCode {
        match self {
            QueryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QueryError::QueryExecution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorDto { error: self.to_string() })
    }
}

// Any body that does not parse as a query request is a generic 400
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        info!("rejected request body: {}", err);
        if let Some(cfg) = req.app_data::<web::Data<ApiConfig>>() {
            log_traffic(cfg, &format!("RID={} HTTP {} BAD payload: {}", next_request_id(), req.path(), err));
        }
        QueryError::invalid_request().into()
    })
}

fn peer_of(req: &HttpRequest) -> String {
    req.peer_addr().map(|a| a.to_string()).unwrap_or_else(|| "unknown".into())
}

async fn submit_logged(
    cfg: &ApiConfig,
    service: &QueryService,
    channel: &str,
    peer: &str,
    query: Option<&str>,
) -> Result<Vec<NormalizedRecord>, QueryError> {
    let rid = next_request_id();
    log_traffic(cfg, &format!("RID={} {} from {} qlen={}", rid, channel, peer, query.map(str::len).unwrap_or(0)));
    let t0 = Instant::now();
    let res = service.submit(query).await;
    let dt = t0.elapsed().as_millis();
    match &res {
        Ok(records) => {
            info!("RID={} {} OK records={} dt_ms={}", rid, channel, records.len(), dt);
            log_traffic(cfg, &format!("RID={} {} OK records={} dt_ms={}", rid, channel, records.len(), dt));
        }
        Err(QueryError::InvalidRequest(msg)) => {
            info!("RID={} {} rejected: {}", rid, channel, msg);
            log_traffic(cfg, &format!("RID={} {} BAD {} dt_ms={}", rid, channel, msg, dt));
        }
        Err(QueryError::QueryExecution(msg)) => {
            log_traffic(cfg, &format!("RID={} {} ERR {} dt_ms={}", rid, channel, msg, dt));
        }
    }
    res
}

async fn handle_query(
    cfg: web::Data<ApiConfig>,
    service: web::Data<QueryService>,
    req: HttpRequest,
    body: web::Json<QueryBody>,
) -> Result<HttpResponse, QueryError> {
    let records = submit_logged(&cfg, &service, "HTTP /api/query", &peer_of(&req), body.query.as_deref()).await?;
    Ok(HttpResponse::Ok().json(RecordsDto { records: &records }))
}

async fn handle_graph(
    cfg: web::Data<ApiConfig>,
    service: web::Data<QueryService>,
    req: HttpRequest,
    body: web::Json<QueryBody>,
) -> Result<HttpResponse, QueryError> {
    let records = submit_logged(&cfg, &service, "HTTP /api/graph", &peer_of(&req), body.query.as_deref()).await?;
    let projection = project_records_with_report(&records, &cfg.projection);
    if !projection.skipped.is_empty() {
        warn!("{} of {} records not drawn", projection.skipped.len(), records.len());
    }
    Ok(HttpResponse::Ok().json(GraphDto { records: &records, elements: projection.elements }))
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(PAGE_HTML)
}

/// JSON text sent back over the REPL socket, same shape as the HTTP bodies.
fn reply_text(res: Result<Vec<NormalizedRecord>, QueryError>) -> String {
    let out = match res {
        Ok(records) => serde_json::to_string(&RecordsDto { records: &records }),
        Err(e) => serde_json::to_string(&ErrorDto { error: e.to_string() }),
    };
    out.unwrap_or_else(|_| "{}".into())
}

// WebSocket REPL: one text frame per query
use actix::{Actor, ActorFutureExt, AsyncContext, StreamHandler, WrapFuture};
use actix_web_actors::ws;

pub const REPL_BANNER: &str = "Cypher-Lens REPL ready. Send queries as text.";

struct ReplWs {
    cfg: ApiConfig,
    service: QueryService,
    peer: String,
}

impl Actor for ReplWs {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.text(format!("{}\n", REPL_BANNER));
        log_traffic(&self.cfg, &format!("WS connected from {}", self.peer));
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ReplWs {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                // blank frames are ignored; anything else goes to the database as sent
                if text.trim().is_empty() { return; }
                let q = text.to_string();
                let cfg = self.cfg.clone();
                let service = self.service.clone();
                let peer = self.peer.clone();
                let fut = async move {
                    reply_text(submit_logged(&cfg, &service, "WS", &peer, Some(q.as_str())).await)
                };
                // wait, not spawn: the next frame is handled only after this reply is sent
                ctx.wait(fut.into_actor(self).map(|body, _act, ctx| ctx.text(body)));
            }
            Ok(ws::Message::Ping(b)) => ctx.pong(&b),
            Ok(ws::Message::Close(reason)) => {
                log_traffic(&self.cfg, &format!("WS closed from {}", self.peer));
                ctx.close(reason)
            }
            _ => {}
        }
    }
}

async fn ws_handler(
    cfg: web::Data<ApiConfig>,
    service: web::Data<QueryService>,
    req: HttpRequest,
    stream: web::Payload,
) -> actix_web::Result<HttpResponse> {
    let actor = ReplWs { cfg: cfg.get_ref().clone(), service: service.get_ref().clone(), peer: peer_of(&req) };
    ws::start(actor, &req, stream)
}

/// Route table. Callers install `web::Data<QueryService>` and `web::Data<ApiConfig>`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(index))
        .route("/api/query", web::post().to(handle_query))
        .route("/api/graph", web::post().to(handle_graph))
        .route("/api/repl", web::get().to(ws_handler));
}

/// Serve until the process is stopped.
pub async fn run_server(settings: &AppSettings, service: QueryService) -> anyhow::Result<()> {
    let bind = settings.api_endpoint();
    let cfg = ApiConfig::from_settings(settings);
    log_traffic(&cfg, &format!("Server starting on {}", bind));
    info!("listening on http://{}", bind);

    let service = web::Data::new(service);
    let cfg = web::Data::new(cfg);
    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(cfg.clone())
            .configure(routes)
    })
    .bind(&bind)
    .with_context(|| format!("API server bind failed on {}", bind))?
    .run()
    .await?;
    Ok(())
}
