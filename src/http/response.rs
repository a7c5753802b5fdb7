//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Este módulo proporciona una API para construir respuestas HTTP/1.1
//! de forma programática y serializarlas a bytes para enviar al cliente.
//!
//! ## Formato de una respuesta HTTP/1.1
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! Los headers que puso el caller se emiten tal cual (incluido un
//! `Connection` o un `Content-Length` propio); el serializador solo agrega
//! `Content-Length` cuando el caller no lo especificó.

use super::status::reason_phrase;
use std::collections::HashMap;

/// Representa una respuesta HTTP/1.1 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP (el script puede devolver cualquier entero)
    status: u16,

    /// Headers HTTP; HashMap para evitar duplicados exactos
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta con el código de estado especificado
    ///
    /// # Ejemplo
    /// ```
    /// use script_server::http::Response;
    ///
    /// let response = Response::new(200);
    /// ```
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header a la respuesta (builder)
    ///
    /// Si el header ya existe con el mismo nombre exacto, se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Busca el valor de un header sin importar el casing del nombre
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Verifica si existe un header (comparación case-insensitive)
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Establece el cuerpo de la respuesta desde un string (builder)
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Establece el cuerpo de la respuesta desde bytes (builder)
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Crea una respuesta JSON exitosa (200 OK)
    ///
    /// # Ejemplo
    /// ```
    /// use script_server::http::Response;
    ///
    /// let response = Response::json(r#"{"status": "ok"}"#);
    /// ```
    pub fn json(body: &str) -> Self {
        Self::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Crea una respuesta de error con mensaje JSON
    ///
    /// Formato del JSON: `{"error": "mensaje"}`
    ///
    /// # Ejemplo
    /// ```
    /// use script_server::http::Response;
    ///
    /// let response = Response::error(400, "Invalid Content-Length");
    /// ```
    pub fn error(status: u16, message: &str) -> Self {
        let body = format!(r#"{{"error": "{}"}}"#, message);
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&body)
    }

    /// Serializa la respuesta completa a bytes
    ///
    /// Genera el formato HTTP/1.1:
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - Headers del caller, tal cual fueron especificados
    /// - `Content-Length` calculado, solo si el caller no puso uno
    /// - Línea vacía y body
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize(true)
    }

    /// Serializa status line y headers sin el body (para requests HEAD)
    ///
    /// El `Content-Length` emitido sigue reflejando el body que se habría
    /// enviado.
    pub fn head_bytes(&self) -> Vec<u8> {
        self.serialize(false)
    }

    fn serialize(&self, include_body: bool) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line
        let status_line = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        );
        result.extend_from_slice(status_line.as_bytes());

        // 2. Headers del caller, verbatim
        for (name, value) in &self.headers {
            let header_line = format!("{}: {}\r\n", name, value);
            result.extend_from_slice(header_line.as_bytes());
        }

        // 3. Content-Length derivado (sin duplicar el del caller)
        if !self.has_header("content-length") {
            let line = format!("Content-Length: {}\r\n", self.body.len());
            result.extend_from_slice(line.as_bytes());
        }

        // 4. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");

        // 5. Body
        if include_body {
            result.extend_from_slice(&self.body);
        }

        result
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
