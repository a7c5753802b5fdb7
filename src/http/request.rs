//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Este módulo implementa un parser HTTP/1.1 desde cero.
//!
//! ## Formato de un Request HTTP/1.1
//!
//! ```text
//! POST /foo/bar HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 11\r\n
//! \r\n
//! hello world
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path HTTP/1.1`
//! 2. **Headers**: Pares `Name: Value` (uno por línea, nombres case-insensitive)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: exactamente `Content-Length` bytes (si el header está presente)
//!
//! El parser recibe siempre un mensaje *completo*; la acumulación de bytes
//! parciales es responsabilidad del framer (ver `http::framing`).

use std::collections::HashMap;

/// Representa un request HTTP parseado
///
/// El método se conserva como token textual: el callback del entorno de
/// scripts recibe el método tal cual llegó en la request line.
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP como token (ej: "GET", "POST")
    method: String,

    /// Path de la petición (ej: "/foo/bar")
    path: String,

    /// Versión HTTP ("HTTP/1.0" o "HTTP/1.1")
    version: String,

    /// Headers HTTP, claves normalizadas a minúsculas
    headers: HashMap<String, String>,

    /// Body del request (exactamente `Content-Length` bytes)
    body: Vec<u8>,
}

/// Errores que pueden ocurrir durante el parsing o el framing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request incompleto o truncado
    Incomplete,

    /// Request vacío
    EmptyRequest,

    /// Formato inválido de la request line
    InvalidRequestLine,

    /// Versión HTTP no soportada
    InvalidHttpVersion(String),

    /// Header malformado (sin ':')
    InvalidHeader(String),

    /// Content-Length que no es un entero no-negativo válido
    InvalidContentLength(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Incomplete => write!(f, "Incomplete HTTP request"),
            ParseError::EmptyRequest => write!(f, "Empty request"),
            ParseError::InvalidRequestLine => write!(f, "Invalid request line format"),
            ParseError::InvalidHttpVersion(v) => write!(f, "Invalid HTTP version: {}", v),
            ParseError::InvalidHeader(h) => write!(f, "Invalid header: {}", h),
            ParseError::InvalidContentLength(v) => write!(f, "Invalid Content-Length: {}", v),
        }
    }
}

impl std::error::Error for ParseError {}

/// Busca el fin del bloque de headers (`\r\n\r\n`)
///
/// Retorna la posición donde comienza la secuencia, o `None` si el bloque
/// todavía no está completo.
pub(crate) fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

impl Request {
    /// Parsea un request HTTP completo desde bytes
    ///
    /// # Argumentos
    ///
    /// * `buffer` - Buffer conteniendo el request HTTP completo
    ///   (headers terminados en `\r\n\r\n` + body de `Content-Length` bytes)
    ///
    /// # Retorna
    ///
    /// * `Ok(Request)` - Request parseado exitosamente
    /// * `Err(ParseError)` - Error durante el parsing
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use script_server::http::Request;
    ///
    /// let raw = b"POST /foo/bar HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), "POST");
    /// assert_eq!(request.path(), "/foo/bar");
    /// assert_eq!(request.body(), b"hello world");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let headers_end = find_headers_end(buffer).ok_or(ParseError::Incomplete)?;

        // El bloque de headers debe ser UTF-8 válido
        let header_str = std::str::from_utf8(&buffer[..headers_end])
            .map_err(|_| ParseError::InvalidRequestLine)?;

        if header_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = header_str.split("\r\n");

        // 1. Parsear la request line (primera línea)
        let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
        let (method, path, version) = Self::parse_request_line(request_line)?;

        // 2. Parsear headers (resto de líneas)
        let headers = Self::parse_headers(lines)?;

        // 3. Extraer el body según Content-Length
        let content_length = match headers.get("content-length") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength(v.clone()))?,
            None => 0,
        };

        let body_start = headers_end + 4;
        if buffer.len() < body_start + content_length {
            return Err(ParseError::Incomplete);
        }
        let body = buffer[body_start..body_start + content_length].to_vec();

        Ok(Request {
            method,
            path,
            version,
            headers,
            body,
        })
    }

    /// Parsea la request line (primera línea del request)
    ///
    /// Formato: `METHOD /path HTTP/1.1`
    fn parse_request_line(line: &str) -> Result<(String, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = parts[0].to_string();
        let path = parts[1].to_string();

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, version))
    }

    /// Parsea los headers HTTP
    ///
    /// Cada header tiene formato `Name: Value`. Los nombres llegan con casing
    /// arbitrario, así que se normalizan a minúsculas para el lookup.
    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }

            // Separar en el primer ':'
            if let Some(colon_pos) = line.find(':') {
                let name = line[..colon_pos].trim().to_ascii_lowercase();
                let value = line[colon_pos + 1..].trim().to_string();
                headers.insert(name, value);
            } else {
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Obtiene el path del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene todos los headers (claves en minúsculas)
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico (lookup case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Obtiene el tamaño declarado del body (`Content-Length`, 0 si ausente)
    pub fn declared_size(&self) -> usize {
        self.body.len()
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Obtiene el body del request como String (UTF-8)
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Decide si la conexión persiste después de responder
    ///
    /// Reglas HTTP/1.1:
    /// - `Connection: close` explícito → cerrar
    /// - `Connection: keep-alive` explícito → persistir (cualquier versión)
    /// - Sin header `Connection`: persistir solo en HTTP/1.1
    pub fn keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version == "HTTP/1.1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), "HTTP/1.1");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_post_with_body() {
        let raw = b"POST /foo/bar HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.path(), "/foo/bar");
        assert_eq!(request.declared_size(), 11);
        assert_eq!(request.body(), b"hello world");
    }

    #[test]
    fn test_headers_case_insensitive() {
        let raw = b"GET / HTTP/1.1\r\ncOnTeNt-TyPe: text/plain\r\nHOST: x\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header("host"), Some("x"));
    }

    #[test]
    fn test_body_cut_to_content_length() {
        // Bytes sobrantes después del body declarado no forman parte del request
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloEXTRA";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.body(), b"hello");
    }

    #[test]
    fn test_invalid_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::InvalidContentLength(_))));
    }

    #[test]
    fn test_negative_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: -3\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::InvalidContentLength(_))));
    }

    #[test]
    fn test_incomplete_body() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nhi";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::Incomplete)));
    }

    #[test]
    fn test_incomplete_headers() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::Incomplete)));
    }

    #[test]
    fn test_invalid_version() {
        let raw = b"GET / HTTP/2.0\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::InvalidHttpVersion(_))));
    }

    #[test]
    fn test_invalid_request_line() {
        let raw = b"GET\r\n\r\n"; // Falta path y version
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::InvalidRequestLine)));
    }

    #[test]
    fn test_header_without_colon() {
        let raw = b"GET / HTTP/1.1\r\nEstoNoEsUnHeader\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::InvalidHeader(_))));
    }

    // === keep-alive ===

    #[test]
    fn test_keep_alive_default_http11() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert!(Request::parse(raw).unwrap().keep_alive());
    }

    #[test]
    fn test_keep_alive_explicit_close() {
        let raw = b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n";
        assert!(!Request::parse(raw).unwrap().keep_alive());
    }

    #[test]
    fn test_keep_alive_explicit_keep_alive_http10() {
        let raw = b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n";
        assert!(Request::parse(raw).unwrap().keep_alive());
    }

    #[test]
    fn test_keep_alive_default_http10() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        assert!(!Request::parse(raw).unwrap().keep_alive());
    }
}
