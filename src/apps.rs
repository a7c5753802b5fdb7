//! # Apps de Ejemplo
//! src/apps.rs
//!
//! Aplicaciones de demostración que usan la API de registro del engine, una
//! por modelo de servidor. Son el equivalente de los scripts que un usuario
//! le daría al runtime; el binario elige cuál registrar con `--app`.

use crate::engine::{builtins, Engine, HandlerResponse, ScriptError, Value};
use std::collections::HashMap;

/// Demo de la primitiva `print` y su chequeo de aridad
///
/// No registra ningún servidor: imprime valores de distintos tipos y
/// muestra que llamar a `print` con cero o varios argumentos falla con un
/// error atrapable.
pub fn run_print_demo(engine: &Engine) -> Result<(), ScriptError> {
    engine.print(&[Value::from(
        "\n    ~~ wow, this is really simple, but it works! ~~\n",
    )])?;

    engine.print(&[Value::from(42i64)])?;

    let mut object = HashMap::new();
    object.insert("foo".to_string(), Value::from("bar"));
    engine.print(&[Value::Object(object)])?;

    if engine.print(&[]).is_err() {
        engine.print(&[Value::from("Printing nothing fails!")])?;
    }

    if engine
        .print(&[Value::from("more"), Value::from(32i64)])
        .is_err()
    {
        engine.print(&[Value::from("Printing multiple arguments fails!")])?;
    }

    Ok(())
}

/// App del servidor de socket crudo
///
/// El callback recibe el string hasta el `42` inclusive y responde con un
/// mensaje que incluye un contador. El contador compartido no necesita lock
/// propio: el Callback Gate ya serializa las invocaciones.
pub fn register_raw_echo(engine: &Engine, port: u16) -> Result<(), ScriptError> {
    let mut counter = 0u64;
    engine.create_server(
        move |data| {
            builtins::print(&[Value::Str(format!("Received request: {}", data))])?;
            let reply = format!("You asked '{}', my answer is: {}\n", data, counter);
            counter += 1;
            Ok(reply)
        },
        port,
    );

    engine.sync_call_back(
        |message| {
            builtins::print(std::slice::from_ref(message))?;
            Ok(Value::Null)
        },
        &[Value::Str(format!(
            "Socket server started on port {}",
            port
        ))],
    )?;

    Ok(())
}

/// App del servidor HTTP con pool de threads
///
/// Responde JSON con los datos del request (`{method, size, body}`) y un
/// contador de invocaciones.
pub fn register_pool_app(engine: &Engine, port: u16) -> Result<(), ScriptError> {
    let mut counter = 0u64;
    engine.create_thread_pool_server(
        move |request| {
            let message = format!(
                "Counter: {} | Method: {} | Size: {}",
                counter, request.method, request.size
            );
            counter += 1;

            let body = serde_json::json!({
                "message": message,
                "method": request.method,
                "body": request.body.as_deref().unwrap_or(""),
            })
            .to_string();

            let mut headers = HashMap::new();
            headers.insert("Content-Type".to_string(), "application/json".to_string());

            Ok(HandlerResponse {
                status: 200,
                headers,
                body: Some(body),
            })
        },
        port,
    );

    engine.print(&[Value::Str(format!(
        "Multi-threaded server started on port {}",
        port
    ))])?;

    Ok(())
}

/// App del servidor HTTP de event loop
///
/// Enruta por path con keep-alive explícito, y registra un timer que
/// imprime un tick cada segundo en el thread del loop.
pub fn register_event_loop_app(engine: &Engine, port: u16) -> Result<(), ScriptError> {
    let mut counter = 0u64;
    engine.create_event_loop_server(
        move |request| {
            let path = request.path.as_deref().unwrap_or("/");

            let (status, content_type, connection, body) = match path {
                "/favicon.ico" => (404, "text/plain", "keep-alive", "Not Found".to_string()),
                "/index.html" => {
                    let body = format!(
                        "<html><body><h1>Counter: {}</h1><p>Path: {}</p>\
                         <p>Method: {}</p><p>Size: {}</p></body></html>",
                        counter, path, request.method, request.size
                    );
                    counter += 1;
                    (200, "text/html", "keep-alive", body)
                }
                _ => {
                    let body = serde_json::json!({
                        "path": path,
                        "method": request.method,
                        "body": request.body.as_deref().unwrap_or(""),
                    })
                    .to_string();
                    (200, "application/json", "close", body)
                }
            };

            let mut headers = HashMap::new();
            headers.insert("Content-Type".to_string(), content_type.to_string());
            headers.insert("Connection".to_string(), connection.to_string());

            Ok(HandlerResponse {
                status,
                headers,
                body: Some(body),
            })
        },
        port,
    );

    let mut tick = 0u64;
    engine.set_interval(
        move || {
            builtins::print(&[Value::Str(format!("Event loop is running... {}", tick))])?;
            tick += 1;
            Ok(())
        },
        1000,
    );

    engine.print(&[Value::Str(format!(
        "Event-based server started on port {}",
        port
    ))])?;

    Ok(())
}

/// App de demostración del path reservado `/telemetry`
///
/// El servidor responde `/telemetry` internamente; el callback solo ve el
/// resto de los paths.
pub fn register_telemetry_app(engine: &Engine, port: u16) -> Result<(), ScriptError> {
    engine.create_event_loop_server(
        |_request| {
            let mut headers = HashMap::new();
            headers.insert("Content-Type".to_string(), "text/plain".to_string());
            Ok(HandlerResponse {
                status: 404,
                headers,
                body: Some("Not Found".to_string()),
            })
        },
        port,
    );

    engine.print(&[Value::Str(format!("Server started on port {}", port))])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HandlerRequest, ServerKind};

    fn http_request(path: &str, method: &str, body: Option<&str>) -> HandlerRequest {
        HandlerRequest {
            path: Some(path.to_string()),
            method: method.to_string(),
            size: body.map(|b| b.len()).unwrap_or(0),
            body: body.map(|b| b.to_string()),
        }
    }

    #[test]
    fn test_print_demo_runs() {
        let engine = Engine::new();
        run_print_demo(&engine).unwrap();
        assert!(engine.registered_server().is_none());
    }

    #[test]
    fn test_raw_echo_counts_per_invocation() {
        let engine = Engine::new();
        register_raw_echo(&engine, 8080).unwrap();
        assert_eq!(engine.registered_server(), Some((ServerKind::Raw, 8080)));

        let gate = engine.gate();
        let first = gate.invoke_raw("hello world42").unwrap();
        assert_eq!(first, "You asked 'hello world42', my answer is: 0\n");

        let second = gate.invoke_raw("again42").unwrap();
        assert_eq!(second, "You asked 'again42', my answer is: 1\n");
    }

    #[test]
    fn test_pool_app_reflects_request() {
        let engine = Engine::new();
        register_pool_app(&engine, 8080).unwrap();

        let request = HandlerRequest {
            path: None,
            method: "POST".to_string(),
            size: 11,
            body: Some("hello world".to_string()),
        };
        let response = engine.gate().invoke_http(&request).unwrap();

        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert!(body.contains(r#""method":"POST""#));
        assert!(body.contains(r#""body":"hello world""#));
    }

    #[test]
    fn test_event_loop_app_routes_by_path() {
        let engine = Engine::new();
        register_event_loop_app(&engine, 8080).unwrap();
        assert_eq!(engine.timer_intervals(), vec![1000]);

        let gate = engine.gate();

        let favicon = gate
            .invoke_http(&http_request("/favicon.ico", "GET", None))
            .unwrap();
        assert_eq!(favicon.status, 404);

        let index = gate
            .invoke_http(&http_request("/index.html", "GET", None))
            .unwrap();
        assert_eq!(index.status, 200);
        assert!(index.body.unwrap().contains("Counter: 0"));

        let other = gate
            .invoke_http(&http_request("/api", "POST", Some("datos")))
            .unwrap();
        assert_eq!(other.status, 200);
        assert_eq!(other.headers.get("Connection").unwrap(), "close");
    }
}
