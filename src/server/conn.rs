//! # Estado por Conexión del Event Loop
//! src/server/conn.rs
//!
//! Cada conexión del event loop conserva su progreso entre wakeups: el
//! framer con los bytes acumulados, el buffer de salida pendiente y la
//! decisión de cierre. Las lecturas y escrituras parciales se *reanudan*,
//! nunca se reinician.
//!
//! El registro asigna tokens crecientes; una conexión es propiedad
//! exclusiva del thread del loop, nunca se comparte.

use crate::http::HttpFramer;
use mio::net::TcpStream;
use mio::Token;
use std::collections::HashMap;
use std::io::{self, Write};

/// Estado de una conexión multiplexada
pub struct Connection {
    /// Socket no-bloqueante registrado en el poll
    pub stream: TcpStream,

    /// Framer con los bytes acumulados y el progreso de parsing
    pub framer: HttpFramer,

    /// Cerrar la conexión cuando se termine de escribir lo pendiente
    pub closing: bool,

    /// Bytes de salida pendientes
    write_buf: Vec<u8>,

    /// Offset ya escrito dentro de `write_buf`
    written: usize,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            framer: HttpFramer::new(),
            closing: false,
            write_buf: Vec::new(),
            written: 0,
        }
    }

    /// Encola bytes de salida (se escriben cuando el socket lo permita)
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.write_buf.extend_from_slice(bytes);
    }

    /// Quedan bytes de salida sin escribir
    pub fn has_pending_write(&self) -> bool {
        self.written < self.write_buf.len()
    }

    /// Intenta drenar el buffer de salida
    ///
    /// Retorna `Ok(true)` si quedó vacío, `Ok(false)` si el socket se llenó
    /// (reintentamos en el próximo evento WRITABLE). El offset persiste, así
    /// que una escritura parcial continúa donde quedó.
    pub fn flush(&mut self) -> io::Result<bool> {
        while self.written < self.write_buf.len() {
            match self.stream.write(&self.write_buf[self.written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "peer dejó de leer",
                    ))
                }
                Ok(n) => self.written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.write_buf.clear();
        self.written = 0;
        Ok(true)
    }
}

/// Registro de conexiones activas, indexadas por token del poll
pub struct ConnectionRegistry {
    connections: HashMap<Token, Connection>,
    next_token: usize,
}

impl ConnectionRegistry {
    /// `first_token` reserva los tokens menores para otros fds (listener)
    pub fn new(first_token: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_token: first_token,
        }
    }

    /// Registra una conexión nueva y retorna su token
    pub fn insert(&mut self, stream: TcpStream) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        self.connections.insert(token, Connection::new(stream));
        token
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Connection> {
        self.connections.get_mut(&token)
    }

    pub fn remove(&mut self, token: Token) -> Option<Connection> {
        self.connections.remove(&token)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
