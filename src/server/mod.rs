//! # Módulo de Servidores
//! src/server/mod.rs
//!
//! Los tres modelos de servicio comparten el framer, el parser HTTP y el
//! serializador de responses (componentes puros de `crate::http`); lo único
//! que cambia es el scheduling:
//!
//! - `raw`: socket crudo delimitado por `42`, un accept bloqueante a la vez
//! - `pool`: HTTP con pool fijo de threads, I/O bloqueante por conexión
//! - `event_loop`: HTTP en un solo thread con multiplexación por readiness
//!   y timers integrados
//!
//! La ejecución del script queda serializada por el Callback Gate sin
//! importar el modelo; solo la I/O de sockets corre en paralelo.

pub mod conn;
pub mod event_loop;
pub mod pool;
pub mod raw;
pub mod timer;

pub use event_loop::EventLoopServer;
pub use pool::PoolServer;
pub use raw::RawServer;

use crate::config::Config;
use crate::engine::{Engine, HandlerRequest, HandlerResponse, ServerKind};
use crate::http::{Request, Response};
use std::io;

/// Nombre del servidor en el header `Server`
pub(crate) const SERVER_NAME: &str = "script-server/0.1";

/// Arranca el modelo de servidor que el script haya registrado
///
/// El script corre primero y registra su callback; esta función bloquea el
/// thread actual sirviendo hasta que el servidor se detenga.
pub fn start(engine: &Engine, config: &Config) -> io::Result<()> {
    match engine.registered_server() {
        None => {
            eprintln!("[!] Ningún callback de servidor registrado. ¿La app llamó a create_server?");
            Ok(())
        }
        Some((ServerKind::Raw, port)) => {
            let server = RawServer::bind(&config.host, port)?;
            server.run(engine.gate())
        }
        Some((ServerKind::ThreadPool, port)) => {
            let server = PoolServer::bind(
                &config.host,
                port,
                config.pool_workers,
                config.queue_capacity,
                config.read_timeout_ms,
            )?;
            server.run(engine.gate())
        }
        Some((ServerKind::EventLoop, port)) => {
            let mut server = EventLoopServer::bind(&config.host, port)?;
            server.run(engine.gate(), &engine.timer_intervals())
        }
    }
}

/// Construye el request estructurado que recibe el callback del script
///
/// El modelo de pool no expone `path`; el de event loop sí.
pub(crate) fn handler_request_from(request: &Request, include_path: bool) -> HandlerRequest {
    HandlerRequest {
        path: if include_path {
            Some(request.path().to_string())
        } else {
            None
        },
        method: request.method().to_string(),
        size: request.declared_size(),
        body: if request.body().is_empty() {
            None
        } else {
            request.body_string()
        },
    }
}

/// Convierte la respuesta del script en una `Response` lista para serializar
///
/// Los headers del script se preservan verbatim. La decisión de keep-alive
/// sale del request, pero un `Connection` explícito del script la pisa.
/// Retorna la respuesta y la decisión efectiva de keep-alive.
pub(crate) fn response_from_handler(
    handler_response: HandlerResponse,
    request_keep_alive: bool,
) -> (Response, bool) {
    let mut response = Response::new(handler_response.status);
    for (name, value) in &handler_response.headers {
        response.add_header(name, value);
    }
    if let Some(body) = &handler_response.body {
        response = response.with_body(body);
    }

    let keep_alive = match response.header("connection") {
        Some(v) if v.eq_ignore_ascii_case("close") => false,
        Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
        _ => request_keep_alive,
    };

    attach_connection_header(&mut response, keep_alive);
    finalize_response(&mut response);
    (response, keep_alive)
}

/// Agrega el header `Connection` si el caller no puso uno
pub(crate) fn attach_connection_header(response: &mut Response, keep_alive: bool) {
    if !response.has_header("connection") {
        response.add_header("Connection", if keep_alive { "keep-alive" } else { "close" });
    }
}

/// Agrega los headers `Server` y `Date` si el caller no los puso
pub(crate) fn finalize_response(response: &mut Response) {
    if !response.has_header("server") {
        response.add_header("Server", SERVER_NAME);
    }
    if !response.has_header("date") {
        response.add_header("Date", &http_date());
    }
}

/// Fecha actual en formato IMF-fixdate para el header `Date`
pub(crate) fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
