//! Scripted engine doubles for exercising the gateway without a real WAF.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use bytes::BytesMut;
use parking_lot::Mutex;
use rampart_core::{
    BodyIngest, BodySource, EngineError, EngineTransaction, InspectionEngine, Interruption,
    RequestScope, ScopedEngine,
};

/// Behavior of a [`ScriptedEngine`]'s transactions, one knob per phase.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Interruption returned by the header phase.
    pub interrupt_on_headers: Option<Interruption>,
    /// Interruption surfaced while ingesting the body.
    pub interrupt_during_ingest: Option<Interruption>,
    /// Interruption returned by the body phase.
    pub interrupt_on_body: Option<Interruption>,
    /// Whether the transaction buffers request bodies.
    pub body_accessible: bool,
    /// Whether the transaction reports rule evaluation as off.
    pub rule_engine_off: bool,
    /// Stop pulling body chunks once at least this many bytes arrived.
    pub ingest_limit: Option<usize>,
    /// Fail `read_request_body_from` outright.
    pub fail_ingest: bool,
    /// Fail `process_request_body`.
    pub fail_body_phase: bool,
    /// Panic inside the header phase.
    pub panic_on_headers: bool,
}

impl Script {
    /// A transaction that inspects bodies and finds nothing.
    pub fn body_inspecting() -> Self {
        Self {
            body_accessible: true,
            ..Self::default()
        }
    }

    /// A transaction that denies at the header phase.
    pub fn deny_headers(status: u16) -> Self {
        Self {
            interrupt_on_headers: Some(Interruption::deny(status)),
            body_accessible: true,
            ..Self::default()
        }
    }

    /// A transaction that denies at the body phase.
    pub fn deny_body(status: u16) -> Self {
        Self {
            interrupt_on_body: Some(Interruption::deny(status)),
            body_accessible: true,
            ..Self::default()
        }
    }
}

/// Everything a scripted transaction observed, for assertions.
#[derive(Debug, Default)]
pub struct Trace {
    pub connection: Option<(String, u16, String, u16)>,
    pub uri: Option<(String, String, String)>,
    pub headers: Vec<(String, String)>,
    pub server_name: Option<String>,
    pub header_phase_runs: usize,
    pub body_phase_runs: usize,
    pub ingested: Vec<Bytes>,
    pub logging_runs: usize,
    pub close_runs: usize,
    pub scopes: Vec<RequestScope>,
}

impl Trace {
    /// Concatenation of every chunk the engine pulled.
    pub fn ingested_bytes(&self) -> Bytes {
        let mut all = BytesMut::new();
        for chunk in &self.ingested {
            all.extend_from_slice(chunk);
        }
        all.freeze()
    }
}

/// Engine double whose transactions follow a [`Script`].
pub struct ScriptedEngine {
    script: Script,
    trace: Arc<Mutex<Trace>>,
    transactions_opened: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            trace: Arc::new(Mutex::new(Trace::default())),
            transactions_opened: AtomicUsize::new(0),
        })
    }

    pub fn trace(&self) -> Arc<Mutex<Trace>> {
        Arc::clone(&self.trace)
    }

    pub fn transactions_opened(&self) -> usize {
        self.transactions_opened.load(Ordering::SeqCst)
    }
}

impl InspectionEngine for ScriptedEngine {
    fn new_transaction(&self) -> Box<dyn EngineTransaction> {
        self.transactions_opened.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedTransaction {
            script: self.script.clone(),
            trace: Arc::clone(&self.trace),
            retained: BytesMut::new(),
        })
    }
}

/// Engine double that also records the scopes it was handed.
pub struct ScopedScriptedEngine {
    inner: ScriptedEngine,
}

impl ScopedScriptedEngine {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            inner: ScriptedEngine {
                script,
                trace: Arc::new(Mutex::new(Trace::default())),
                transactions_opened: AtomicUsize::new(0),
            },
        })
    }

    pub fn trace(&self) -> Arc<Mutex<Trace>> {
        self.inner.trace()
    }
}

impl InspectionEngine for ScopedScriptedEngine {
    fn new_transaction(&self) -> Box<dyn EngineTransaction> {
        self.inner.new_transaction()
    }

    fn as_scoped(&self) -> Option<&dyn ScopedEngine> {
        Some(self)
    }
}

impl ScopedEngine for ScopedScriptedEngine {
    fn new_scoped_transaction(&self, scope: &RequestScope) -> Box<dyn EngineTransaction> {
        self.inner.trace.lock().scopes.push(scope.clone());
        self.inner.new_transaction()
    }
}

struct ScriptedTransaction {
    script: Script,
    trace: Arc<Mutex<Trace>>,
    retained: BytesMut,
}

#[async_trait]
impl EngineTransaction for ScriptedTransaction {
    fn process_connection(
        &mut self,
        client_addr: &str,
        client_port: u16,
        server_addr: &str,
        server_port: u16,
    ) {
        self.trace.lock().connection = Some((
            client_addr.to_owned(),
            client_port,
            server_addr.to_owned(),
            server_port,
        ));
    }

    fn process_uri(&mut self, uri: &str, method: &str, proto: &str) {
        self.trace.lock().uri = Some((uri.to_owned(), method.to_owned(), proto.to_owned()));
    }

    fn add_request_header(&mut self, name: &str, value: &str) {
        self.trace
            .lock()
            .headers
            .push((name.to_owned(), value.to_owned()));
    }

    fn set_server_name(&mut self, name: &str) {
        self.trace.lock().server_name = Some(name.to_owned());
    }

    fn process_request_headers(&mut self) -> Option<Interruption> {
        if self.script.panic_on_headers {
            panic!("scripted header-phase panic");
        }
        self.trace.lock().header_phase_runs += 1;
        self.script.interrupt_on_headers.clone()
    }

    fn request_body_accessible(&self) -> bool {
        self.script.body_accessible
    }

    async fn read_request_body_from(
        &mut self,
        source: &mut dyn BodySource,
    ) -> rampart_core::Result<BodyIngest> {
        if self.script.fail_ingest {
            return Err(EngineError::Internal("scripted ingest failure".into()));
        }
        let mut read = 0u64;
        while let Some(chunk) = source.next_chunk().await? {
            read += chunk.len() as u64;
            self.retained.extend_from_slice(&chunk);
            self.trace.lock().ingested.push(chunk);
            if let Some(limit) = self.script.ingest_limit {
                if self.retained.len() >= limit {
                    break;
                }
            }
        }
        match self.script.interrupt_during_ingest.clone() {
            Some(interruption) => Ok(BodyIngest::interrupted(interruption, read)),
            None => Ok(BodyIngest::clean(read)),
        }
    }

    fn request_body_reader(&mut self) -> rampart_core::Result<Bytes> {
        Ok(self.retained.clone().freeze())
    }

    fn process_request_body(&mut self) -> rampart_core::Result<Option<Interruption>> {
        if self.script.fail_body_phase {
            return Err(EngineError::Internal("scripted body-phase failure".into()));
        }
        self.trace.lock().body_phase_runs += 1;
        Ok(self.script.interrupt_on_body.clone())
    }

    fn rule_engine_off(&self) -> bool {
        self.script.rule_engine_off
    }

    fn process_logging(&mut self) {
        self.trace.lock().logging_runs += 1;
    }

    fn close(&mut self) -> rampart_core::Result<()> {
        self.trace.lock().close_runs += 1;
        Ok(())
    }
}
