//! Basic usage of the Rampart gateway middleware in an axum application.
//!
//! Wires a small pattern-matching demo engine into the process-wide
//! gateway and serves two routes behind it. Try it:
//!
//! ```text
//! cargo run --example basic
//! curl "http://localhost:8080/?id=1%20OR%201=1"
//! curl -X POST http://localhost:8080/submit \
//!   -H "Content-Type: application/x-www-form-urlencoded" \
//!   -d "name=<script>alert(1)</script>"
//! ```
//!
//! Both attack requests come back as `403 {"code":0,"msg":...}` with
//! `X-WAF-Blocked: true`; plain requests reach the handlers untouched.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use bytes::BytesMut;
use rampart_core::{
    BodyIngest, BodySource, EngineConfig, EngineTransaction, InspectionEngine, Interruption,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Substrings the demo engine refuses, with mock rule ids.
const SIGNATURES: &[(&str, u64)] = &[
    ("<script", 941100),
    (" or 1=1", 942100),
    ("union select", 942200),
    ("/etc/passwd", 930120),
];

/// Toy engine: denies any request whose target or body contains a
/// signature. Stands in for a real WAF binding.
struct PatternEngine;

impl InspectionEngine for PatternEngine {
    fn new_transaction(&self) -> Box<dyn EngineTransaction> {
        Box::new(PatternTransaction::default())
    }
}

#[derive(Default)]
struct PatternTransaction {
    target: String,
    retained: BytesMut,
}

fn matching_rule(haystack: &str) -> Option<u64> {
    let lowered = haystack.to_lowercase();
    let decoded = lowered.replace("%20", " ").replace('+', " ");
    SIGNATURES
        .iter()
        .find(|(needle, _)| decoded.contains(needle))
        .map(|(_, rule_id)| *rule_id)
}

#[async_trait]
impl EngineTransaction for PatternTransaction {
    fn process_connection(&mut self, _: &str, _: u16, _: &str, _: u16) {}

    fn process_uri(&mut self, uri: &str, _method: &str, _proto: &str) {
        self.target = uri.to_owned();
    }

    fn add_request_header(&mut self, _: &str, _: &str) {}
    fn set_server_name(&mut self, _: &str) {}

    fn process_request_headers(&mut self) -> Option<Interruption> {
        matching_rule(&self.target)
            .map(|rule_id| Interruption::deny(403).with_rule_id(rule_id))
    }

    fn request_body_accessible(&self) -> bool {
        true
    }

    async fn read_request_body_from(
        &mut self,
        source: &mut dyn BodySource,
    ) -> rampart_core::Result<BodyIngest> {
        let mut read = 0u64;
        while let Some(chunk) = source.next_chunk().await? {
            read += chunk.len() as u64;
            self.retained.extend_from_slice(&chunk);
        }
        Ok(BodyIngest::clean(read))
    }

    fn request_body_reader(&mut self) -> rampart_core::Result<Bytes> {
        Ok(self.retained.clone().freeze())
    }

    fn process_request_body(&mut self) -> rampart_core::Result<Option<Interruption>> {
        let body = String::from_utf8_lossy(&self.retained);
        Ok(matching_rule(&body).map(|rule_id| Interruption::deny(403).with_rule_id(rule_id)))
    }

    fn rule_engine_off(&self) -> bool {
        false
    }

    fn process_logging(&mut self) {}

    fn close(&mut self) -> rampart_core::Result<()> {
        Ok(())
    }
}

#[derive(Deserialize)]
struct Submit {
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    // The demo engine carries its rules in code, so no directive files.
    let mut config = EngineConfig::default();
    config.directives.clear();
    config.response_body_access = false;

    let builder = |_: &EngineConfig| -> rampart_core::Result<Arc<dyn InspectionEngine>> {
        Ok(Arc::new(PatternEngine))
    };
    rampart_axum::initialize(config, &builder)?;
    rampart_axum::set_block_message("Request blocked by Rampart WAF");

    let app = Router::new()
        .route("/", get(|| async { "Hello, axum behind Rampart!" }))
        .route(
            "/submit",
            post(|Form(submit): Form<Submit>| async move {
                Json(json!({ "message": format!("Received name: {}", submit.name) }))
            }),
        )
        .layer(axum::middleware::from_fn(rampart_axum::waf_middleware));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    info!("axum app running on http://localhost:8080");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
