//! # Framing de Mensajes
//! src/http/framing.rs
//!
//! Un stream TCP entrega bytes sin límites de mensaje; estos framers
//! acumulan lo leído y deciden cuándo hay un mensaje lógico completo:
//!
//! - [`DelimiterFramer`]: el mensaje termina en la primera ocurrencia de la
//!   secuencia literal `42` (modo socket crudo).
//! - [`HttpFramer`]: el mensaje termina cuando el bloque de headers está
//!   cerrado (`\r\n\r\n`) y llegaron exactamente `Content-Length` bytes más.
//!
//! Ambos retienen los bytes sobrantes para el siguiente mensaje de la misma
//! conexión, y ninguno asume que un mensaje llega en una sola lectura.

use super::request::{find_headers_end, ParseError};

/// Secuencia que delimita mensajes en el modo socket crudo
const DELIMITER: &[u8] = b"42";

/// Framer por delimitador literal `42`
///
/// La secuencia puede aparecer en cualquier posición del stream (no tiene
/// que estar alineada a líneas ni tokens), e incluso partida entre dos
/// lecturas consecutivas.
#[derive(Debug, Default)]
pub struct DelimiterFramer {
    buffer: Vec<u8>,
}

impl DelimiterFramer {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Acumula bytes y retorna si ya existe un mensaje completo
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        self.buffer.extend_from_slice(bytes);
        self.has_message()
    }

    /// Verifica si el buffer contiene la secuencia delimitadora
    pub fn has_message(&self) -> bool {
        self.find_delimiter().is_some()
    }

    /// Extrae el siguiente mensaje: todo hasta el delimitador inclusive
    ///
    /// Los bytes posteriores quedan en el buffer para el próximo mensaje.
    pub fn take_message(&mut self) -> Option<Vec<u8>> {
        let pos = self.find_delimiter()?;
        let end = pos + DELIMITER.len();
        let message = self.buffer[..end].to_vec();
        self.buffer.drain(..end);
        Some(message)
    }

    fn find_delimiter(&self) -> Option<usize> {
        self.buffer
            .windows(DELIMITER.len())
            .position(|w| w == DELIMITER)
    }
}

/// Estado de framing de un mensaje HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Esperando el fin del bloque de headers (`\r\n\r\n`)
    AwaitingHeaders,

    /// Headers completos; esperando el body declarado
    AwaitingBody {
        body_start: usize,
        content_length: usize,
    },

    /// Mensaje completo de `total` bytes al frente del buffer
    Complete { total: usize },
}

/// Framer de mensajes HTTP
///
/// Acumula bytes a través de cualquier cantidad de lecturas parciales y
/// reporta cuándo hay un request completo. Un `Content-Length` inválido se
/// detecta acá (antes de parsear el request entero) para poder abortar la
/// conexión con un 400.
#[derive(Debug)]
pub struct HttpFramer {
    buffer: Vec<u8>,
    state: FrameState,
}

impl Default for HttpFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: FrameState::AwaitingHeaders,
        }
    }

    /// Acumula bytes y retorna si ya existe un mensaje completo
    ///
    /// # Errores
    ///
    /// `ParseError::InvalidContentLength` si el header declara un largo que
    /// no es un entero no-negativo.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<bool, ParseError> {
        self.buffer.extend_from_slice(bytes);
        self.advance()
    }

    /// El mensaje al frente del buffer está completo
    pub fn is_complete(&self) -> bool {
        matches!(self.state, FrameState::Complete { .. })
    }

    /// El buffer no tiene bytes pendientes
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Extrae el mensaje completo al frente del buffer
    ///
    /// Resetea el estado de framing; los bytes sobrantes quedan acumulados
    /// para el siguiente mensaje (conexiones keep-alive).
    pub fn take_message(&mut self) -> Option<Vec<u8>> {
        match self.state {
            FrameState::Complete { total } => {
                let message = self.buffer[..total].to_vec();
                self.buffer.drain(..total);
                self.state = FrameState::AwaitingHeaders;
                // Puede haber otro mensaje completo ya buffereado
                let _ = self.advance();
                Some(message)
            }
            _ => None,
        }
    }

    /// Avanza la máquina de estados con lo que haya en el buffer
    fn advance(&mut self) -> Result<bool, ParseError> {
        if let FrameState::AwaitingHeaders = self.state {
            match find_headers_end(&self.buffer) {
                Some(pos) => {
                    let body_start = pos + 4;
                    let content_length = scan_content_length(&self.buffer[..pos])?;
                    self.state = FrameState::AwaitingBody {
                        body_start,
                        content_length,
                    };
                }
                None => return Ok(false),
            }
        }

        if let FrameState::AwaitingBody {
            body_start,
            content_length,
        } = self.state
        {
            if self.buffer.len() >= body_start + content_length {
                self.state = FrameState::Complete {
                    total: body_start + content_length,
                };
            }
        }

        Ok(self.is_complete())
    }
}

/// Busca `Content-Length` en un bloque de headers sin parsear
///
/// Retorna 0 si el header no está presente (body vacío).
fn scan_content_length(header_block: &[u8]) -> Result<usize, ParseError> {
    let text = String::from_utf8_lossy(header_block);

    // La primera línea es la request line; el resto son headers
    for line in text.split("\r\n").skip(1) {
        if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim();
            if name.eq_ignore_ascii_case("content-length") {
                let value = line[colon_pos + 1..].trim();
                return value
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength(value.to_string()));
            }
        }
    }

    Ok(0)
}
