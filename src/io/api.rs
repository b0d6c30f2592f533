//! HTTP API for the trip roster
//!
//! JSON endpoints over hyper (http1), plus `/health` and a Prometheus
//! `/metrics` page. Roster calls are synchronous and may touch disk, so each
//! one runs on tokio's blocking pool.
//!
//! Routes:
//! - `GET /trips` - every trip, soonest first
//! - `GET /trips/{name}` - trip snapshot
//! - `GET /trips/{name}/me` - snapshot plus the caller's status
//! - `POST|DELETE /trips/{name}/registration` - register / remove
//! - `POST /trips/{name}/check-in`
//! - `POST /api` - `{"action", "tripName", "userName"?}` envelope used by the web front end

use crate::domain::types::is_valid_trip_name;
use crate::infra::metrics::{Operation, LATENCY_BUCKET_BOUNDS, NUM_BUCKETS, REJECTION_KINDS};
use crate::io::identity::{IdentityError, IdentityProvider};
use crate::services::roster::{RosterError, TripRoster};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared by every connection
pub struct ApiState {
    roster: Arc<TripRoster>,
    identity: Arc<dyn IdentityProvider>,
    site_id: String,
}

impl ApiState {
    pub fn new(
        roster: Arc<TripRoster>,
        identity: Arc<dyn IdentityProvider>,
        site_id: impl Into<String>,
    ) -> Self {
        Self { roster, identity, site_id: site_id.into() }
    }
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("{0}")]
    BadRequest(String),

    #[error("No route for {0}")]
    NoRoute(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Roster(e) => e.kind(),
            ApiError::Identity(_) => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NoRoute(_) => "not_found",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            "not_found" => StatusCode::NOT_FOUND,
            "already_registered" | "not_registered" => StatusCode::CONFLICT,
            "outside_window" => StatusCode::FORBIDDEN,
            "busy" => StatusCode::SERVICE_UNAVAILABLE,
            "bad_request" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    kind: &'a str,
}

/// Front-end action names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Action {
    GetTripDetails,
    Register,
    CheckIn,
    Remove,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    action: Action,
    trip_name: String,
    #[serde(default)]
    user_name: Option<String>,
}

enum Route {
    Health,
    Metrics,
    Trips,
    Trip(String),
    Me(String),
    Registration(String),
    CheckIn(String),
    Api,
    Unknown,
}

impl Route {
    fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["health"] => Route::Health,
            ["metrics"] => Route::Metrics,
            ["trips"] => Route::Trips,
            ["trips", name] => Route::Trip(name.to_string()),
            ["trips", name, "me"] => Route::Me(name.to_string()),
            ["trips", name, "registration"] => Route::Registration(name.to_string()),
            ["trips", name, "check-in"] => Route::CheckIn(name.to_string()),
            ["api"] => Route::Api,
            _ => Route::Unknown,
        }
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .expect("static response should not fail")
}

fn error_response(err: &ApiError) -> Response<Full<Bytes>> {
    let body = ErrorBody { error: err.to_string(), kind: err.kind() };
    let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| br#"{"error":"error","kind":"internal"}"#.to_vec());
    json_response(err.status(), bytes)
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response<Full<Bytes>> {
    let encoded = result.and_then(|value| {
        serde_json::to_vec(&value).map_err(|e| ApiError::Internal(e.to_string()))
    });
    match encoded {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

/// Run a roster call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, RosterError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// Names that are not path-safe can never belong to a trip
fn checked_trip_name(name: &str) -> Result<String, ApiError> {
    if is_valid_trip_name(name) {
        Ok(name.to_string())
    } else {
        Err(RosterError::NotFound { trip: name.to_string() }.into())
    }
}

async fn perform(
    state: &ApiState,
    action: Action,
    trip: &str,
    headers: &HeaderMap,
    user_name: Option<&str>,
) -> Result<crate::domain::Trip, ApiError> {
    let trip = checked_trip_name(trip)?;
    let roster = state.roster.clone();

    if action == Action::GetTripDetails {
        return blocking(move || roster.get_details(&trip)).await;
    }

    let caller = state.identity.identify(headers, user_name)?;
    blocking(move || match action {
        Action::GetTripDetails => roster.get_details(&trip),
        Action::Register => roster.register(&trip, &caller),
        Action::CheckIn => roster.check_in(&trip, &caller),
        Action::Remove => roster.remove(&trip, &caller),
    })
    .await
}

async fn caller_view(
    state: &ApiState,
    trip: &str,
    headers: &HeaderMap,
) -> Result<crate::services::roster::CallerView, ApiError> {
    let trip = checked_trip_name(trip)?;
    let caller = state.identity.identify(headers, None)?;
    let roster = state.roster.clone();
    blocking(move || roster.caller_view(&trip, &caller)).await
}

async fn envelope(
    state: &ApiState,
    req: Request<Incoming>,
) -> Result<crate::domain::Trip, ApiError> {
    let (parts, body) = req.into_parts();
    let bytes = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Unreadable body: {e}")))?
        .to_bytes();
    let envelope: Envelope = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request: {e}")))?;

    perform(
        state,
        envelope.action,
        &envelope.trip_name,
        &parts.headers,
        envelope.user_name.as_deref(),
    )
    .await
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, Route::parse(&path)) {
        (&Method::OPTIONS, _) => Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
            .body(Full::new(Bytes::new()))
            .expect("static response should not fail"),
        (&Method::GET, Route::Health) => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail"),
        (&Method::GET, Route::Metrics) => {
            let scrape_state = state.clone();
            let scrape = tokio::task::spawn_blocking(move || {
                format_prometheus_metrics(&scrape_state.roster, &scrape_state.site_id)
            });
            match scrape.await {
                Ok(body) => Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                    .body(Full::new(Bytes::from(body)))
                    .expect("static response should not fail"),
                Err(e) => error_response(&ApiError::Internal(e.to_string())),
            }
        }
        (&Method::GET, Route::Trips) => {
            let roster = state.roster.clone();
            respond(blocking(move || roster.list_trips()).await)
        }
        (&Method::GET, Route::Trip(name)) => {
            respond(perform(&state, Action::GetTripDetails, &name, req.headers(), None).await)
        }
        (&Method::GET, Route::Me(name)) => respond(caller_view(&state, &name, req.headers()).await),
        (&Method::POST, Route::Registration(name)) => {
            respond(perform(&state, Action::Register, &name, req.headers(), None).await)
        }
        (&Method::DELETE, Route::Registration(name)) => {
            respond(perform(&state, Action::Remove, &name, req.headers(), None).await)
        }
        (&Method::POST, Route::CheckIn(name)) => {
            respond(perform(&state, Action::CheckIn, &name, req.headers(), None).await)
        }
        (&Method::POST, Route::Api) => respond(envelope(&state, req).await),
        (_, Route::Unknown) => error_response(&ApiError::NoRoute(path.clone())),
        _ => error_response(&ApiError::BadRequest(format!("Method {method} not allowed on {path}"))),
    };

    debug!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_us = %start.elapsed().as_micros(),
        "api_request"
    );
    Ok(response)
}

/// Serve the API on an already-bound listener until `shutdown` flips to true
pub async fn serve(
    listener: TcpListener,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, site = %state.site_id, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind `bind_address:port` and serve the API
pub async fn start_api_server(
    bind_address: &str,
    port: u16,
    state: Arc<ApiState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind((bind_address, port)).await?;
    serve(listener, state, shutdown).await
}

fn write_metric(output: &mut String, name: &str, help: &str, typ: &str, site: &str, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {typ}");
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// One metric family with an extra label per sample
fn write_labeled<'a>(
    output: &mut String,
    name: &str,
    help: &str,
    typ: &str,
    site: &str,
    label: &str,
    samples: impl IntoIterator<Item = (&'a str, u64)>,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {typ}");
    for (value, count) in samples {
        let _ = writeln!(output, "{name}{{site=\"{site}\",{label}=\"{value}\"}} {count}");
    }
}

fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; NUM_BUCKETS],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in LATENCY_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {cumulative}");
}

/// Format roster metrics in Prometheus text exposition format
fn format_prometheus_metrics(roster: &TripRoster, site: &str) -> String {
    let summary = roster.metrics().snapshot();
    let mut output = String::with_capacity(4096);

    write_labeled(
        &mut output,
        "roster_operations_total",
        "Roster operations handled",
        "counter",
        site,
        "op",
        Operation::ALL.iter().map(|op| op.as_str()).zip(summary.ops_total),
    );
    write_histogram(
        &mut output,
        "roster_operation_latency_us",
        "Roster operation latency in microseconds",
        site,
        &summary.lat_buckets,
        summary.latency_sum_us,
    );
    write_metric(&mut output, "roster_operation_latency_p50_us", "50th percentile operation latency", "gauge", site, summary.lat_p50_us);
    write_metric(&mut output, "roster_operation_latency_p99_us", "99th percentile operation latency", "gauge", site, summary.lat_p99_us);

    write_labeled(
        &mut output,
        "roster_registrations_total",
        "Successful registrations by placement",
        "counter",
        site,
        "placement",
        [("bus", summary.seated_total), ("waitlist", summary.waitlisted_total)],
    );
    write_metric(&mut output, "roster_check_ins_total", "Successful check-ins", "counter", site, summary.check_ins_total);
    write_metric(&mut output, "roster_removals_total", "Registrations removed", "counter", site, summary.removals_total);
    write_metric(&mut output, "roster_promotions_total", "Waitlist entries moved onto the bus", "counter", site, summary.promotions_total);
    write_labeled(
        &mut output,
        "roster_rejections_total",
        "Rejected operations by kind",
        "counter",
        site,
        "kind",
        REJECTION_KINDS.iter().copied().zip(summary.rejections),
    );

    let trips = roster.summaries();
    let per_trip = [
        ("roster_trip_bus_capacity", "Seats on the bus"),
        ("roster_trip_seats_taken", "Seats currently taken"),
        ("roster_trip_waitlist_length", "Registrants on the waitlist"),
    ];
    for (i, (name, help)) in per_trip.iter().enumerate() {
        write_labeled(
            &mut output,
            name,
            help,
            "gauge",
            site,
            "trip",
            trips.iter().map(|t| {
                let value = match i {
                    0 => t.bus_capacity,
                    1 => t.seats_taken,
                    _ => t.waitlist_len,
                };
                (t.name.as_str(), value as u64)
            }),
        );
    }

    output
}
