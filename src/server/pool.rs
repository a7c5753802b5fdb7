//! # Servidor HTTP con Pool de Threads
//! src/server/pool.rs
//!
//! Un pool fijo de workers atiende conexiones con I/O bloqueante. El accept
//! corre en el thread principal y encola cada conexión en una cola
//! bloqueante (Mutex + Condvar); cada worker toma una conexión y la posee
//! completa: leer → parsear → gate → responder → cerrar.
//!
//! El tamaño del pool acota cuántas conexiones se atienden en paralelo a
//! nivel de threads del SO, pero la ejecución del script sigue serializada
//! por el Callback Gate. Las conexiones excedentes esperan en la cola o en
//! el backlog de accept del SO.

use super::{finalize_response, handler_request_from, response_from_handler};
use crate::engine::CallbackGate;
use crate::http::{HttpFramer, ParseError, Request, Response};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

const READ_BUFFER_SIZE: usize = 1024;

/// Cola bloqueante de conexiones pendientes
///
/// Los workers bloquean en `dequeue` hasta que haya una conexión; el accept
/// bloquea en `enqueue` si la cola está llena. `close` despierta a todos
/// para el shutdown.
pub struct ConnQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct QueueState {
    queue: VecDeque<TcpStream>,
    open: bool,
}

impl ConnQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                open: true,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Encola una conexión; bloquea mientras la cola esté llena
    pub fn enqueue(&self, stream: TcpStream) {
        let mut state = self.state.lock().unwrap();
        while state.queue.len() >= self.capacity && state.open {
            state = self.not_full.wait(state).unwrap();
        }
        if !state.open {
            return; // en shutdown la conexión se descarta
        }
        state.queue.push_back(stream);
        self.not_empty.notify_one();
    }

    /// Desencola una conexión; bloquea hasta que haya una o se cierre la cola
    pub fn dequeue(&self) -> Option<TcpStream> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(stream) = state.queue.pop_front() {
                self.not_full.notify_one();
                return Some(stream);
            }
            if !state.open {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Cierra la cola y despierta a todos los workers
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.open = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Servidor HTTP con pool fijo de threads
pub struct PoolServer {
    listener: TcpListener,
    queue: Arc<ConnQueue>,
    running: Arc<AtomicBool>,
    workers: usize,
    read_timeout: Duration,
}

impl PoolServer {
    /// Crea el socket de escucha y la cola de conexiones
    pub fn bind(
        host: &str,
        port: u16,
        workers: usize,
        queue_capacity: usize,
        read_timeout_ms: u64,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port))?;
        Ok(Self {
            listener,
            queue: Arc::new(ConnQueue::new(queue_capacity)),
            running: Arc::new(AtomicBool::new(true)),
            workers: workers.max(1),
            read_timeout: Duration::from_millis(read_timeout_ms.max(1)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Flag compartido para detener el loop de accept
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Arranca los workers y el loop de accept
    pub fn run(&self, gate: Arc<CallbackGate>) -> io::Result<()> {
        println!(
            "[+] Servidor de pool escuchando en {} ({} workers)",
            self.listener.local_addr()?,
            self.workers
        );

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let queue = Arc::clone(&self.queue);
            let gate = Arc::clone(&gate);
            let read_timeout = self.read_timeout;
            handles.push(thread::spawn(move || {
                // Cada worker posee una conexión por vez, de punta a punta
                while let Some(stream) = queue.dequeue() {
                    if let Err(e) = handle_connection(stream, &gate, read_timeout) {
                        eprintln!("[!] Error en worker {}: {}", worker_id, e);
                    }
                }
            }));
        }

        for stream in self.listener.incoming() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => self.queue.enqueue(stream),
                Err(e) => eprintln!("[!] Error al aceptar conexión: {}", e),
            }
        }

        self.queue.close();
        for handle in handles {
            let _ = handle.join();
        }

        println!("[*] Servidor de pool detenido");
        Ok(())
    }
}

enum ReadOutcome {
    /// Request completo
    Message(Vec<u8>),
    /// El peer cerró o venció el timeout sin un request completo
    Truncated,
    /// Framing inválido (ej: Content-Length malformado)
    Framing(ParseError),
}

/// Lee del socket hasta tener un request completo según el framer
///
/// El body puede llegar fragmentado en cualquier cantidad de lecturas; el
/// framer espera exactamente los bytes declarados por `Content-Length`.
fn read_full_request(stream: &mut TcpStream) -> io::Result<ReadOutcome> {
    let mut framer = HttpFramer::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match stream.read(&mut buffer) {
            Ok(0) => return Ok(ReadOutcome::Truncated),
            Ok(n) => match framer.feed(&buffer[..n]) {
                Ok(true) => {
                    let message = framer.take_message().unwrap_or_default();
                    return Ok(ReadOutcome::Message(message));
                }
                Ok(false) => continue,
                Err(e) => return Ok(ReadOutcome::Framing(e)),
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                // Cliente lento o colgado: abortar sin respuesta
                return Ok(ReadOutcome::Truncated);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Atiende una conexión completa y la cierra al responder
fn handle_connection(
    mut stream: TcpStream,
    gate: &CallbackGate,
    read_timeout: Duration,
) -> io::Result<()> {
    stream.set_read_timeout(Some(read_timeout))?;

    let message = match read_full_request(&mut stream)? {
        ReadOutcome::Message(message) => message,
        ReadOutcome::Truncated => return Ok(()), // sin respuesta
        ReadOutcome::Framing(e) => {
            let mut response = Response::error(400, &e.to_string());
            response.add_header("Connection", "close");
            finalize_response(&mut response);
            stream.write_all(&response.to_bytes())?;
            return Ok(());
        }
    };

    let (response, head_only) = match Request::parse(&message) {
        Ok(request) => {
            let head_only = request.method() == "HEAD";
            let handler_request = handler_request_from(&request, false);

            let response = match gate.invoke_http(&handler_request) {
                // El pool no mantiene conexiones: la decisión base es cerrar
                Ok(handler_response) => response_from_handler(handler_response, false).0,
                Err(e) => {
                    eprintln!("[!] Error en el callback del script: {}", e);
                    let mut response = Response::error(500, "script callback failed");
                    response.add_header("Connection", "close");
                    finalize_response(&mut response);
                    response
                }
            };
            (response, head_only)
        }
        Err(e) => {
            let mut response = Response::error(400, &e.to_string());
            response.add_header("Connection", "close");
            finalize_response(&mut response);
            (response, false)
        }
    };

    let bytes = if head_only {
        response.head_bytes()
    } else {
        response.to_bytes()
    };
    stream.write_all(&bytes)?;
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HandlerResponse, ServerHandler};

    #[test]
    fn test_queue_fifo_order() {
        let queue = ConnQueue::new(8);
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let _c1 = TcpStream::connect(addr).unwrap();
        let _c2 = TcpStream::connect(addr).unwrap();
        let (s1, _) = listener.accept().unwrap();
        let (s2, _) = listener.accept().unwrap();
        let p1 = s1.peer_addr().unwrap();
        let p2 = s2.peer_addr().unwrap();

        queue.enqueue(s1);
        queue.enqueue(s2);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue().unwrap().peer_addr().unwrap(), p1);
        assert_eq!(queue.dequeue().unwrap().peer_addr().unwrap(), p2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closed_queue_unblocks_workers() {
        let queue = Arc::new(ConnQueue::new(8));

        let worker_queue = Arc::clone(&queue);
        let worker = thread::spawn(move || worker_queue.dequeue());

        // El worker está bloqueado esperando; cerrar la cola lo libera
        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert!(worker.join().unwrap().is_none());
    }

    #[test]
    fn test_handle_connection_post_roundtrip() {
        let gate = Arc::new(CallbackGate::new());
        gate.set_handler(ServerHandler::Http(Box::new(|request| {
            Ok(HandlerResponse {
                status: 200,
                headers: Default::default(),
                body: Some(format!(
                    "method={} size={} body={}",
                    request.method,
                    request.size,
                    request.body.as_deref().unwrap_or("")
                )),
            })
        })));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_gate = Arc::clone(&gate);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &server_gate, Duration::from_secs(5)).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"POST /foo/bar HTTP/1.1\r\nHost: x\r\nContent-Length: 11\r\n\r\nhello world")
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Connection: close"));
        assert!(response.ends_with("method=POST size=11 body=hello world"));

        server.join().unwrap();
    }

    #[test]
    fn test_handle_connection_invalid_content_length() {
        let gate = Arc::new(CallbackGate::new());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_gate = Arc::clone(&gate);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &server_gate, Duration::from_secs(5)).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: nope\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(response.contains("400 Bad Request"));

        server.join().unwrap();
    }

    #[test]
    fn test_handle_connection_callback_error_yields_500() {
        use crate::engine::ScriptError;

        let gate = Arc::new(CallbackGate::new());
        gate.set_handler(ServerHandler::Http(Box::new(|_| {
            Err(ScriptError::Callback("se rompió".to_string()))
        })));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_gate = Arc::clone(&gate);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &server_gate, Duration::from_secs(5)).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(response.contains("500 Internal Server Error"));

        server.join().unwrap();
    }
}
