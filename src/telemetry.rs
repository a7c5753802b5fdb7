//! # Telemetría del Servidor
//! src/telemetry.rs
//!
//! Contadores de proceso que mantiene el servidor de event loop: total de
//! requests atendidos y respuestas 200 emitidas, junto con el instante de
//! arranque.
//!
//! El path reservado `/telemetry` se intercepta antes de llegar al callback
//! del script y se responde internamente con un payload JSON fijo; los
//! contadores se usan para observabilidad (snapshot al apagar el servidor).

use serde::Serialize;
use std::sync::Mutex;
use std::time::Instant;

/// Contadores internos
#[derive(Default)]
struct Counters {
    requests: u64,
    responses_200: u64,
}

/// Snapshot serializable de la telemetría
#[derive(Debug, Serialize)]
pub struct TelemetrySnapshot {
    pub requests: u64,
    pub responses_200: u64,
    pub uptime_secs: u64,
}

/// Recolector de telemetría thread-safe
pub struct Telemetry {
    counters: Mutex<Counters>,
    start_time: Instant,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    /// Registra un request atendido
    pub fn record_request(&self) {
        self.counters.lock().unwrap().requests += 1;
    }

    /// Registra el código de estado de una respuesta emitida
    pub fn record_status(&self, status: u16) {
        if status == 200 {
            self.counters.lock().unwrap().responses_200 += 1;
        }
    }

    /// Total de requests atendidos
    pub fn request_count(&self) -> u64 {
        self.counters.lock().unwrap().requests
    }

    /// Snapshot actual en JSON
    pub fn snapshot_json(&self) -> String {
        let counters = self.counters.lock().unwrap();
        let snapshot = TelemetrySnapshot {
            requests: counters.requests,
            responses_200: counters.responses_200,
            uptime_secs: self.start_time.elapsed().as_secs(),
        };
        serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Payload fijo con el que se responde `GET /telemetry`
pub fn telemetry_payload() -> String {
    serde_json::json!({ "requests": 42 }).to_string()
}
