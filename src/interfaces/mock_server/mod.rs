pub mod routes;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::domain::error::{AppError, Result};
use crate::infrastructure::logging::{add_log, LogBuffer};

pub use routes::{default_routes, BodyRule, CannedResponse, MatchMode, MockRoute, QueryRule};

const LOG_SOURCE: &str = "MockBackend";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockBackendConfig {
    /// 0 picks a free port
    pub port: u16,
    #[serde(default = "default_routes")]
    pub routes: Vec<MockRoute>,
}

impl MockBackendConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            routes: default_routes(),
        }
    }

    /// Read a route table from JSON; a missing file means the canned routes
    pub fn load(path: &Path, port: u16) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(port));
        }
        let content = fs::read_to_string(path).map_err(|err| {
            AppError::IoError(format!("Failed to read mock routes: {}", err))
        })?;
        let routes: Vec<MockRoute> = serde_json::from_str(&content).map_err(|err| {
            AppError::ParseError(format!("Failed to parse mock routes: {}", err))
        })?;
        Ok(Self { port, routes })
    }
}

/// A local stand-in for the OCR service
pub struct MockBackend {
    config: MockBackendConfig,
    server: Mutex<Option<ServerHandle>>,
    address: Mutex<Option<SocketAddr>>,
    logs: LogBuffer,
}

impl MockBackend {
    pub fn new(config: MockBackendConfig, logs: LogBuffer) -> Arc<Self> {
        Arc::new(Self {
            config,
            server: Mutex::new(None),
            address: Mutex::new(None),
            logs,
        })
    }

    /// Bind and serve in the background; returns the bound address
    pub fn start(self: &Arc<Self>) -> Result<SocketAddr> {
        let mut server_guard = lock(&self.server);
        if server_guard.is_some() {
            add_log(
                &self.logs,
                "INFO",
                LOG_SOURCE,
                "Mock backend start requested but already running",
            );
            return Err(AppError::ValidationError(
                "Mock backend is already running.".to_string(),
            ));
        }

        let state = self.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .default_service(web::route().to(handle_request))
        })
        .workers(1)
        .bind(("127.0.0.1", self.config.port))
        .map_err(|err| AppError::Internal(format!("Failed to bind mock backend: {}", err)))?;

        let address = server.addrs().first().copied().ok_or_else(|| {
            AppError::Internal("Mock backend bound no address".to_string())
        })?;
        let server = server.run();

        *server_guard = Some(server.handle());
        *lock(&self.address) = Some(address);
        tokio::spawn(server);

        add_log(
            &self.logs,
            "INFO",
            LOG_SOURCE,
            &format!(
                "Mock backend started on http://{} ({} routes)",
                address,
                self.config.routes.len()
            ),
        );
        Ok(address)
    }

    pub async fn stop(&self) {
        let handle = lock(&self.server).take();
        let Some(handle) = handle else {
            add_log(
                &self.logs,
                "INFO",
                LOG_SOURCE,
                "Mock backend stop requested but already stopped",
            );
            return;
        };

        if timeout(Duration::from_secs(2), handle.stop(true)).await.is_err() {
            handle.stop(false).await;
            add_log(
                &self.logs,
                "WARN",
                LOG_SOURCE,
                "Mock backend forced stop after timeout",
            );
        } else {
            add_log(&self.logs, "INFO", LOG_SOURCE, "Mock backend stopped");
        }
        *lock(&self.address) = None;
    }

    /// `http://host:port` while running
    pub fn base_url(&self) -> Option<String> {
        lock(&self.address).map(|address| format!("http://{}", address))
    }

    pub fn is_running(&self) -> bool {
        lock(&self.server).is_some()
    }

    /// Highest scoring route for the request; earlier routes win ties
    fn find_route(&self, request: &IncomingRequest) -> Option<&MockRoute> {
        let mut best: Option<(&MockRoute, u8)> = None;
        for route in &self.config.routes {
            if !route.method.trim().eq_ignore_ascii_case(&request.method)
                || normalize_path(&route.path) != normalize_path(&request.path)
            {
                continue;
            }
            if let Some(score) = match_score(route, request) {
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((route, score));
                }
            }
        }
        best.map(|(route, _)| route)
    }
}

struct IncomingRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    body: String,
}

async fn handle_request(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<Arc<MockBackend>>,
) -> HttpResponse {
    let request = IncomingRequest {
        method: req.method().as_str().to_uppercase(),
        path: req.path().to_string(),
        query: parse_query(req.query_string()),
        body: String::from_utf8_lossy(&body).to_string(),
    };

    let Some(route) = data.find_route(&request) else {
        add_log(
            &data.logs,
            "INFO",
            LOG_SOURCE,
            &format!(
                "No route matched (method={} path={})",
                request.method, request.path
            ),
        );
        return HttpResponse::NotFound().json(serde_json::json!({
            "error": "No mock route matched.",
            "method": request.method,
            "path": request.path
        }));
    };

    if let Some(delay_ms) = route.response.delay_ms.filter(|delay| *delay > 0) {
        sleep(Duration::from_millis(delay_ms)).await;
    }

    add_log(
        &data.logs,
        "INFO",
        LOG_SOURCE,
        &format!(
            "Served {} {} with route '{}'",
            request.method, request.path, route.name
        ),
    );

    HttpResponse::build(StatusCode::from_u16(route.response.status).unwrap_or(StatusCode::OK))
        .content_type("application/json")
        .body(route.response.body.clone())
}

fn match_score(route: &MockRoute, request: &IncomingRequest) -> Option<u8> {
    let mut score = 0;

    if !route.query.is_empty() {
        let all_present = route.query.iter().all(|rule| {
            request
                .query
                .get(&rule.key.trim().to_lowercase())
                .map_or(false, |value| {
                    rule.value.trim().is_empty() || value == rule.value.trim()
                })
        });
        if !all_present {
            return None;
        }
        score += 1;
    }

    if let Some(rule) = &route.body {
        if !body_matches(rule, &request.body) {
            return None;
        }
        score += 1;
    }

    Some(score)
}

fn body_matches(rule: &BodyRule, body: &str) -> bool {
    let expected = rule.value.trim();
    if expected.is_empty() {
        return true;
    }
    match rule.mode {
        MatchMode::Exact => body.trim() == expected,
        MatchMode::Contains => body.contains(expected),
        MatchMode::Regex => Regex::new(expected)
            .map(|re| re.is_match(body))
            .unwrap_or(false),
    }
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim();
    if trimmed == "/" {
        return trimmed;
    }
    trimmed.trim_end_matches('/')
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
