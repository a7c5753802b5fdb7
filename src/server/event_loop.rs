//! # Servidor HTTP de Event Loop
//! src/server/event_loop.rs
//!
//! Un solo thread multiplexa el socket de escucha, todas las conexiones y
//! los timers con una espera por readiness (`mio::Poll`, epoll/kqueue por
//! debajo). Nada bloquea en una conexión individual:
//!
//! - accept no-bloqueante hasta agotar el backlog
//! - lecturas parciales que persisten en la `Connection` entre wakeups
//! - escrituras parciales que se reanudan al recibir WRITABLE
//! - timers como cota del timeout del poll
//!
//! Como el thread del loop es el único caller del gate en este modelo, la
//! serialización hacia el script es inherente; el lock del gate importa
//! cuando este modelo convive con el pool o el servidor crudo en el mismo
//! proceso.
//!
//! El path reservado `GET /telemetry` se responde internamente sin invocar
//! el callback. Tras cada respuesta se aplica la decisión de keep-alive:
//! reciclar la conexión para otro ciclo de parseo, o cerrarla.

use super::conn::{Connection, ConnectionRegistry};
use super::timer::TimerQueue;
use super::{
    attach_connection_header, finalize_response, handler_request_from, response_from_handler,
};
use crate::engine::CallbackGate;
use crate::http::{Request, Response};
use crate::telemetry::{telemetry_payload, Telemetry};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const LISTENER: Token = Token(0);
const MAX_EVENTS: usize = 64;
const READ_BUFFER_SIZE: usize = 1024;

/// Espera máxima del poll cuando no hay timers próximos
const POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Servidor HTTP de un solo thread, dirigido por readiness
pub struct EventLoopServer {
    poll: Poll,
    listener: TcpListener,
    registry: ConnectionRegistry,
    telemetry: Telemetry,
    running: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl EventLoopServer {
    /// Crea el socket de escucha no-bloqueante y lo registra en el poll
    pub fn bind(host: &str, port: u16) -> io::Result<Self> {
        let std_listener = std::net::TcpListener::bind((host, port))?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;
        let mut listener = TcpListener::from_std(std_listener);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            poll,
            listener,
            registry: ConnectionRegistry::new(1),
            telemetry: Telemetry::new(),
            running: Arc::new(AtomicBool::new(true)),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag compartido para detener el loop
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Loop principal: timers vencidos, conexiones nuevas y sockets listos
    pub fn run(&mut self, gate: Arc<CallbackGate>, timer_intervals_ms: &[u64]) -> io::Result<()> {
        println!(
            "[+] Servidor de event loop escuchando en {}",
            self.local_addr
        );

        let mut events = Events::with_capacity(MAX_EVENTS);
        let mut timers = TimerQueue::new(timer_intervals_ms, Instant::now());

        while self.running.load(Ordering::SeqCst) {
            let timeout = timers
                .next_timeout(Instant::now())
                .map(|t| t.min(POLL_TIMEOUT))
                .unwrap_or(POLL_TIMEOUT);

            if let Err(e) = self.poll.poll(&mut events, Some(timeout)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e);
            }

            // Timers vencidos: cada uno dispara a lo sumo una vez por wakeup
            for id in timers.take_due(Instant::now()) {
                if let Err(e) = gate.invoke_timer(id) {
                    eprintln!("[!] Error en el callback del timer {}: {}", id, e);
                }
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_pending(),
                    token => self.handle_connection_event(
                        token,
                        event.is_readable(),
                        event.is_writable(),
                        &gate,
                    ),
                }
            }
        }

        println!(
            "[*] Servidor de event loop detenido; telemetría final: {}",
            self.telemetry.snapshot_json()
        );
        Ok(())
    }

    /// Acepta conexiones hasta agotar el backlog
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    let token = self.registry.insert(stream);
                    let registered = match self.registry.get_mut(token) {
                        Some(conn) => self.poll.registry().register(
                            &mut conn.stream,
                            token,
                            Interest::READABLE,
                        ),
                        None => Ok(()),
                    };
                    if let Err(e) = registered {
                        eprintln!("[!] No se pudo registrar la conexión: {}", e);
                        self.registry.remove(token);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    eprintln!("[!] Error al aceptar conexión: {}", e);
                    return;
                }
            }
        }
    }

    /// Procesa un evento de readiness de una conexión
    fn handle_connection_event(
        &mut self,
        token: Token,
        readable: bool,
        writable: bool,
        gate: &CallbackGate,
    ) {
        let mut drop_conn = false;

        if writable {
            if let Some(conn) = self.registry.get_mut(token) {
                match conn.flush() {
                    Ok(true) => {
                        if conn.closing {
                            drop_conn = true;
                        } else {
                            // Salida drenada: volver a interés de solo lectura
                            let _ = self.poll.registry().reregister(
                                &mut conn.stream,
                                token,
                                Interest::READABLE,
                            );
                        }
                    }
                    Ok(false) => {} // seguirá pendiente hasta el próximo WRITABLE
                    Err(_) => drop_conn = true,
                }
            }
        }

        if readable && !drop_conn {
            drop_conn = self.read_and_dispatch(token, gate);
        }

        if drop_conn {
            self.close_connection(token);
        }
    }

    /// Lee hasta agotar el socket y despacha los mensajes completos
    ///
    /// Retorna `true` si la conexión debe cerrarse ya.
    fn read_and_dispatch(&mut self, token: Token, gate: &CallbackGate) -> bool {
        let telemetry = &self.telemetry;
        let conn = match self.registry.get_mut(token) {
            Some(conn) => conn,
            None => return false,
        };

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let mut peer_closed = false;

        loop {
            match conn.stream.read(&mut buffer) {
                Ok(0) => {
                    peer_closed = true;
                    break;
                }
                Ok(n) => {
                    if let Err(e) = conn.framer.feed(&buffer[..n]) {
                        // Framing inválido: responder 400 y cerrar
                        telemetry.record_request();
                        let mut response = Response::error(400, &e.to_string());
                        response.add_header("Connection", "close");
                        finalize_response(&mut response);
                        telemetry.record_status(response.status());
                        conn.queue_bytes(&response.to_bytes());
                        conn.closing = true;
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => {
                    peer_closed = true;
                    break;
                }
            }
        }

        // Despachar todos los requests completos acumulados
        while !conn.closing && conn.framer.is_complete() {
            if let Some(message) = conn.framer.take_message() {
                dispatch_message(conn, &message, gate, telemetry);
            }
        }

        // Intentar escribir lo encolado de inmediato
        if conn.has_pending_write() {
            match conn.flush() {
                Ok(true) => {}
                Ok(false) => {
                    // Socket lleno: esperar WRITABLE; el cierre (si aplica)
                    // ocurre al terminar de drenar
                    let _ = self.poll.registry().reregister(
                        &mut conn.stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    );
                    return false;
                }
                Err(_) => return true,
            }
        }

        conn.closing || peer_closed
    }

    /// Da de baja la conexión del poll y la destruye
    fn close_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.registry.remove(token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }
}

/// Atiende un request completo: telemetría, intercepción, gate y respuesta
fn dispatch_message(
    conn: &mut Connection,
    message: &[u8],
    gate: &CallbackGate,
    telemetry: &Telemetry,
) {
    telemetry.record_request();

    let (response, keep_alive, head_only) = match Request::parse(message) {
        Ok(request) => {
            let request_keep_alive = request.keep_alive();
            let head_only = request.method() == "HEAD";

            if request.header("host").is_none() {
                // HTTP/1.1 exige el header Host
                let mut response = Response::error(400, "missing Host header");
                attach_connection_header(&mut response, request_keep_alive);
                finalize_response(&mut response);
                (response, request_keep_alive, head_only)
            } else if request.method() == "GET" && request.path() == "/telemetry" {
                // Path reservado: se responde internamente, sin invocar el
                // callback del script
                let mut response = Response::json(&telemetry_payload());
                attach_connection_header(&mut response, request_keep_alive);
                finalize_response(&mut response);
                (response, request_keep_alive, head_only)
            } else {
                match gate.invoke_http(&handler_request_from(&request, true)) {
                    Ok(handler_response) => {
                        let (response, keep_alive) =
                            response_from_handler(handler_response, request_keep_alive);
                        (response, keep_alive, head_only)
                    }
                    Err(e) => {
                        eprintln!("[!] Error en el callback del script: {}", e);
                        let mut response = Response::error(500, "script callback failed");
                        attach_connection_header(&mut response, request_keep_alive);
                        finalize_response(&mut response);
                        (response, request_keep_alive, head_only)
                    }
                }
            }
        }
        Err(e) => {
            let mut response = Response::error(400, &e.to_string());
            response.add_header("Connection", "close");
            finalize_response(&mut response);
            (response, false, false)
        }
    };

    telemetry.record_status(response.status());

    let bytes = if head_only {
        response.head_bytes()
    } else {
        response.to_bytes()
    };
    conn.queue_bytes(&bytes);

    if !keep_alive {
        conn.closing = true;
    }
}
