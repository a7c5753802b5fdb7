//! # Módulo HTTP
//!
//! Este módulo implementa el subconjunto de HTTP/1.1 que usa el runtime,
//! sin librerías de alto nivel. Incluye:
//!
//! - Framing de mensajes (delimitador crudo y mensajes HTTP)
//! - Parsing de requests HTTP/1.1
//! - Construcción y serialización de responses
//! - Reason phrases de códigos de estado
//!
//! ## Alcance del protocolo
//!
//! Subconjunto HTTP/1.1: request line, headers terminados en CRLF, body
//! dimensionado por `Content-Length` y conexiones persistentes (keep-alive).
//! Fuera de alcance: TLS, HTTP/2, chunked transfer-encoding y reordenamiento
//! de requests pipelined.
//!
//! Los tres componentes (framer, parser, serializador) son puros: no tocan
//! sockets. Los servidores de `crate::server` los comparten.

pub mod framing;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
pub use framing::{DelimiterFramer, HttpFramer};
pub use request::{ParseError, Request};
pub use response::Response;
