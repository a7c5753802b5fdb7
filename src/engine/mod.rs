//! # Módulo Engine: Frontera con el Entorno de Scripts
//!
//! Este módulo define la frontera entre el runtime de red y el entorno de
//! scripts embebido. El entorno de scripts en sí (evaluación de expresiones,
//! marshalling de valores arbitrarios) es un colaborador externo; acá vive
//! solo su contrato:
//!
//! - [`Value`]: el tipo de valor que cruza la frontera
//! - [`builtins`]: las primitivas `print` y `syncCallBack`
//! - [`Engine`]: la API de registro que usa el script (crear servidores,
//!   registrar timers)
//! - [`CallbackGate`]: la serialización de toda entrada al script
//!
//! ## Flujo de arranque
//!
//! El script corre primero y registra a lo sumo un servidor (el último
//! registro gana) más cualquier cantidad de timers. Después el binario
//! arranca el modelo de servidor que haya quedado registrado
//! (`server::start`).

pub mod builtins;
pub mod error;
pub mod gate;
pub mod value;

pub use error::ScriptError;
pub use gate::{CallbackGate, HandlerRequest, HandlerResponse, ServerHandler};
pub use value::Value;

use std::sync::{Arc, Mutex};

/// Modelo de servidor registrado por el script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// Socket crudo delimitado por `42` (un accept bloqueante a la vez)
    Raw,

    /// HTTP despachado a un pool de threads
    ThreadPool,

    /// HTTP en un event loop de un solo thread, con timers integrados
    EventLoop,
}

/// Registro pendiente de servidor (modelo + puerto)
#[derive(Debug, Clone, Copy)]
struct ServerRegistration {
    kind: ServerKind,
    port: u16,
}

/// Estado de registro fuera del gate (no lo toca ningún callback)
#[derive(Default)]
struct RegistrationState {
    server: Option<ServerRegistration>,
    timer_intervals_ms: Vec<u64>,
}

/// Handle del entorno de scripts embebido
///
/// Es el análogo del handle de engine que el embedder le pasa al script:
/// mantiene el gate (con los callbacks registrados) y el registro de qué
/// servidor arrancar.
pub struct Engine {
    gate: Arc<CallbackGate>,
    registration: Mutex<RegistrationState>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(CallbackGate::new()),
            registration: Mutex::new(RegistrationState::default()),
        }
    }

    /// Obtiene el gate compartido (lo usan los servidores para despachar)
    pub fn gate(&self) -> Arc<CallbackGate> {
        Arc::clone(&self.gate)
    }

    /// Primitiva de logging del script (ver [`builtins::print`])
    pub fn print(&self, args: &[Value]) -> Result<(), ScriptError> {
        builtins::print(args)
    }

    /// Primitiva de notificación síncrona (ver [`builtins::sync_call_back`])
    pub fn sync_call_back<F>(&self, callback: F, args: &[Value]) -> Result<Value, ScriptError>
    where
        F: FnMut(&Value) -> Result<Value, ScriptError>,
    {
        builtins::sync_call_back(callback, args)
    }

    /// Registra el servidor de socket crudo (callback string → string)
    pub fn create_server<F>(&self, callback: F, port: u16)
    where
        F: FnMut(&str) -> Result<String, ScriptError> + Send + 'static,
    {
        self.gate.set_handler(ServerHandler::Raw(Box::new(callback)));
        self.register_server(ServerKind::Raw, port);
    }

    /// Registra el servidor HTTP con pool de threads
    ///
    /// El callback recibe `{method, size, body}` y devuelve
    /// `{status, headers, body}`.
    pub fn create_thread_pool_server<F>(&self, callback: F, port: u16)
    where
        F: FnMut(&HandlerRequest) -> Result<HandlerResponse, ScriptError> + Send + 'static,
    {
        self.gate
            .set_handler(ServerHandler::Http(Box::new(callback)));
        self.register_server(ServerKind::ThreadPool, port);
    }

    /// Registra el servidor HTTP de event loop
    ///
    /// El callback recibe `{path, method, size, body}` y devuelve
    /// `{status, headers, body}`.
    pub fn create_event_loop_server<F>(&self, callback: F, port: u16)
    where
        F: FnMut(&HandlerRequest) -> Result<HandlerResponse, ScriptError> + Send + 'static,
    {
        self.gate
            .set_handler(ServerHandler::Http(Box::new(callback)));
        self.register_server(ServerKind::EventLoop, port);
    }

    /// Registra un timer repetitivo con intervalo en milisegundos
    ///
    /// El callback dispara a través del gate en el thread del event loop.
    /// No hay API de cancelación: el timer vive hasta el fin del proceso.
    pub fn set_interval<F>(&self, callback: F, interval_ms: u64)
    where
        F: FnMut() -> Result<(), ScriptError> + Send + 'static,
    {
        let id = self.gate.add_timer(Box::new(callback));
        let mut reg = self.registration.lock().unwrap();
        debug_assert_eq!(id, reg.timer_intervals_ms.len());
        reg.timer_intervals_ms.push(interval_ms);
    }

    /// Modelo y puerto del servidor registrado, si hay uno
    pub fn registered_server(&self) -> Option<(ServerKind, u16)> {
        self.registration
            .lock()
            .unwrap()
            .server
            .map(|r| (r.kind, r.port))
    }

    /// Intervalos de los timers registrados; el índice es el id del timer
    pub fn timer_intervals(&self) -> Vec<u64> {
        self.registration.lock().unwrap().timer_intervals_ms.clone()
    }

    fn register_server(&self, kind: ServerKind, port: u16) {
        let mut reg = self.registration.lock().unwrap();
        reg.server = Some(ServerRegistration { kind, port });
    }
}
