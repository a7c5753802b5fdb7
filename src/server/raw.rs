//! # Servidor de Socket Crudo
//! src/server/raw.rs
//!
//! Modelo más simple: un accept bloqueante a la vez. Cada mensaje termina
//! en la primera ocurrencia de la secuencia `42`; el string completo (hasta
//! el delimitador inclusive) se pasa al callback del script a través del
//! gate, y lo que el callback retorna se escribe al socket sin framing
//! adicional.
//!
//! La misma conexión puede entregar varios mensajes delimitados; se atiende
//! hasta que el peer cierra.

use crate::engine::CallbackGate;
use crate::http::DelimiterFramer;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const READ_BUFFER_SIZE: usize = 1024;

/// Servidor de socket crudo delimitado por `42`
pub struct RawServer {
    listener: TcpListener,
    running: Arc<AtomicBool>,
}

impl RawServer {
    /// Crea el socket de escucha
    pub fn bind(host: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port))?;
        Ok(Self {
            listener,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Flag compartido para detener el loop de accept
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Acepta conexiones de a una y las atiende hasta que el peer cierre
    pub fn run(&self, gate: Arc<CallbackGate>) -> io::Result<()> {
        println!(
            "[+] Servidor de socket crudo escuchando en {}",
            self.listener.local_addr()?
        );

        for stream in self.listener.incoming() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => Self::handle_client(stream, &gate),
                Err(e) => eprintln!("[!] Error al aceptar conexión: {}", e),
            }
        }

        println!("[*] Servidor de socket crudo detenido");
        Ok(())
    }

    /// Atiende una conexión: frame por `42` → gate → respuesta verbatim
    fn handle_client(mut stream: TcpStream, gate: &CallbackGate) {
        let mut framer = DelimiterFramer::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            // Despachar todos los mensajes ya delimitados en el buffer
            while let Some(message) = framer.take_message() {
                let text = String::from_utf8_lossy(&message);
                match gate.invoke_raw(&text) {
                    Ok(reply) => {
                        if stream.write_all(reply.as_bytes()).is_err() {
                            return;
                        }
                    }
                    // Error del callback: se loguea y la conexión sigue viva
                    Err(e) => eprintln!("[!] Error en el callback del script: {}", e),
                }
            }

            match stream.read(&mut buffer) {
                Ok(0) => return, // el peer cerró
                Ok(n) => {
                    framer.feed(&buffer[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ServerHandler;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_handle_client_echoes_through_gate() {
        let gate = Arc::new(CallbackGate::new());
        gate.set_handler(ServerHandler::Raw(Box::new(|data| {
            Ok(format!("eco:{}", data))
        })));

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().unwrap();

        let server_gate = Arc::clone(&gate);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            RawServer::handle_client(stream, &server_gate);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        client.write_all(b"hello world42").unwrap();

        let mut buffer = [0u8; 256];
        let n = client.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"eco:hello world42");

        // La conexión sigue abierta para otro mensaje delimitado
        client.write_all(b"otra vez42").unwrap();
        let n = client.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"eco:otra vez42");

        drop(client);
        server.join().unwrap();
    }

    #[test]
    fn test_handle_client_survives_callback_error() {
        use crate::engine::ScriptError;

        let gate = Arc::new(CallbackGate::new());
        let mut first = true;
        gate.set_handler(ServerHandler::Raw(Box::new(move |data| {
            if first {
                first = false;
                return Err(ScriptError::Callback("falla".to_string()));
            }
            Ok(data.to_string())
        })));

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().unwrap();

        let server_gate = Arc::clone(&gate);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            RawServer::handle_client(stream, &server_gate);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        // El primer mensaje falla en el callback: no hay respuesta, pero la
        // conexión no se corta
        client.write_all(b"uno42").unwrap();
        client.write_all(b"dos42").unwrap();

        let mut buffer = [0u8; 64];
        let n = client.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"dos42");

        drop(client);
        server.join().unwrap();
    }
}
