//! # Callback Gate
//! src/engine/gate.rs
//!
//! El entorno de scripts no tolera entrada concurrente: sin importar si la
//! invocación viene de un worker del pool, del thread del event loop o del
//! disparo de un timer, a lo sumo un callback puede estar ejecutando dentro
//! del script en un instante dado.
//!
//! Este módulo es el único punto de serialización: todo camino de código
//! que invoque un callback del script pasa por [`CallbackGate`], que
//! encierra el estado del script (callbacks registrados y cualquier estado
//! compartido que capturen) en un `Mutex`. La I/O de sockets sigue siendo
//! paralela; solo la ejecución del script queda serializada.
//!
//! Un error dentro del callback se atrapa en esta frontera y el mutex se
//! libera en todos los caminos: un callback que falla nunca deja el gate
//! tomado para los requests siguientes.

use super::error::ScriptError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Request tal como lo recibe el callback HTTP del script
///
/// El servidor de pool entrega `{method, size, body}`; el servidor de event
/// loop agrega `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRequest {
    /// Path del request (solo en el modelo event loop)
    pub path: Option<String>,

    /// Método HTTP como token
    pub method: String,

    /// Tamaño declarado del body
    pub size: usize,

    /// Body como string, si existe
    pub body: Option<String>,
}

/// Response tal como la devuelve el callback HTTP del script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// Código de estado (ej: 200)
    pub status: u16,

    /// Headers como pares clave-valor
    pub headers: HashMap<String, String>,

    /// Body de la respuesta, si existe
    pub body: Option<String>,
}

/// Callback del modelo socket crudo: string de entrada, string de salida
pub type RawHandler = Box<dyn FnMut(&str) -> Result<String, ScriptError> + Send>;

/// Callback de los modelos HTTP
pub type HttpHandler =
    Box<dyn FnMut(&HandlerRequest) -> Result<HandlerResponse, ScriptError> + Send>;

/// Callback de timer repetitivo
pub type TimerHandler = Box<dyn FnMut() -> Result<(), ScriptError> + Send>;

/// Callback registrado como handler del servidor
pub enum ServerHandler {
    Raw(RawHandler),
    Http(HttpHandler),
}

/// Estado del entorno de scripts protegido por el gate
#[derive(Default)]
struct ScriptState {
    handler: Option<ServerHandler>,
    timers: Vec<TimerHandler>,
}

/// Punto único de serialización hacia el entorno de scripts
#[derive(Default)]
pub struct CallbackGate {
    state: Mutex<ScriptState>,
}

impl CallbackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toma el lock absorbiendo poisoning: si un callback anterior hizo
    /// panic, el estado sigue siendo usable y el gate no queda bloqueado.
    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registra (o reemplaza) el handler del servidor
    pub fn set_handler(&self, handler: ServerHandler) {
        self.lock().handler = Some(handler);
    }

    /// Registra un callback de timer; retorna su id
    pub fn add_timer(&self, callback: TimerHandler) -> usize {
        let mut state = self.lock();
        state.timers.push(callback);
        state.timers.len() - 1
    }

    /// Invoca el handler crudo con el mensaje delimitado
    pub fn invoke_raw(&self, data: &str) -> Result<String, ScriptError> {
        let mut state = self.lock();
        match state.handler.as_mut() {
            Some(ServerHandler::Raw(callback)) => callback(data),
            _ => Err(ScriptError::NoHandler),
        }
    }

    /// Invoca el handler HTTP con un request estructurado
    pub fn invoke_http(&self, request: &HandlerRequest) -> Result<HandlerResponse, ScriptError> {
        let mut state = self.lock();
        match state.handler.as_mut() {
            Some(ServerHandler::Http(callback)) => callback(request),
            _ => Err(ScriptError::NoHandler),
        }
    }

    /// Invoca el callback del timer `id`
    pub fn invoke_timer(&self, id: usize) -> Result<(), ScriptError> {
        let mut state = self.lock();
        match state.timers.get_mut(id) {
            Some(callback) => callback(),
            None => Err(ScriptError::NoHandler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn http_request() -> HandlerRequest {
        HandlerRequest {
            path: None,
            method: "GET".to_string(),
            size: 0,
            body: None,
        }
    }

    #[test]
    fn test_invoke_without_handler_fails() {
        let gate = CallbackGate::new();
        assert_eq!(gate.invoke_raw("x"), Err(ScriptError::NoHandler));
        assert!(gate.invoke_http(&http_request()).is_err());
        assert!(gate.invoke_timer(0).is_err());
    }

    #[test]
    fn test_raw_handler_roundtrip() {
        let gate = CallbackGate::new();
        gate.set_handler(ServerHandler::Raw(Box::new(|data| {
            Ok(format!("eco: {}", data))
        })));

        assert_eq!(gate.invoke_raw("hola42"), Ok("eco: hola42".to_string()));
    }

    #[test]
    fn test_handler_keeps_state_between_calls() {
        // Un contador compartido entre invocaciones no necesita lock propio:
        // la exclusión mutua ya la garantiza el gate
        let gate = CallbackGate::new();
        let mut counter = 0u64;
        gate.set_handler(ServerHandler::Raw(Box::new(move |_| {
            counter += 1;
            Ok(counter.to_string())
        })));

        assert_eq!(gate.invoke_raw("a"), Ok("1".to_string()));
        assert_eq!(gate.invoke_raw("b"), Ok("2".to_string()));
    }

    #[test]
    fn test_failing_callback_releases_the_gate() {
        let gate = CallbackGate::new();
        let mut fail_next = true;
        gate.set_handler(ServerHandler::Raw(Box::new(move |data| {
            if fail_next {
                fail_next = false;
                return Err(ScriptError::Callback("primera falla".to_string()));
            }
            Ok(data.to_string())
        })));

        assert!(gate.invoke_raw("x").is_err());
        // La siguiente invocación entra sin problemas
        assert_eq!(gate.invoke_raw("y"), Ok("y".to_string()));
    }

    #[test]
    fn test_no_two_callbacks_overlap() {
        // Propiedad central: invocaciones concurrentes desde varios threads
        // entran al script de a una
        let gate = Arc::new(CallbackGate::new());
        let spans = Arc::new(Mutex::new(Vec::<(Instant, Instant)>::new()));

        let spans_inner = Arc::clone(&spans);
        gate.set_handler(ServerHandler::Raw(Box::new(move |data| {
            let start = Instant::now();
            thread::sleep(Duration::from_millis(5));
            let end = Instant::now();
            spans_inner.lock().unwrap().push((start, end));
            Ok(data.to_string())
        })));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            handles.push(thread::spawn(move || {
                gate.invoke_raw("x").unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut spans = spans.lock().unwrap().clone();
        spans.sort_by_key(|(start, _)| *start);
        assert_eq!(spans.len(), 8);
        for pair in spans.windows(2) {
            // El siguiente callback empieza después de que terminó el anterior
            assert!(pair[1].0 >= pair[0].1, "callbacks solapados en el tiempo");
        }
    }

    #[test]
    fn test_timer_callbacks_by_id() {
        let gate = CallbackGate::new();
        let first = gate.add_timer(Box::new(|| Ok(())));
        let second = gate.add_timer(Box::new(|| {
            Err(ScriptError::Callback("tick fallido".to_string()))
        }));

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert!(gate.invoke_timer(first).is_ok());
        assert!(gate.invoke_timer(second).is_err());
    }
}
