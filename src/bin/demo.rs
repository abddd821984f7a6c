//! Minimal demo server.
//!
//! Wires the parser and body conduit up to a real TCP socket and echoes
//! each request's body back to the client once it has been fully read.
//! There is no routing, no response streaming, and no TLS — generating
//! responses and writing them back to the wire are the enclosing
//! application's job, not this crate's.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use wireframe::{decide_100_continue, BodyConduit, ContinueDecision, ParseStatus, Parser, RequestHead};

fn main() -> std::io::Result<()> {
    env_logger::init();

    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:7878".to_string());
    let listener = TcpListener::bind(&addr)?;
    log::info!("listening on {addr}");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream) {
                        log::warn!("connection error: {e}");
                    }
                });
            }
            Err(e) => log::warn!("accept error: {e}"),
        }
    }

    Ok(())
}

/// One thread per connection, matching the thread-per-connection model
/// used elsewhere in this crate's pack of reference servers. Within a
/// connection, the reader loop below is the network-reader thread: it
/// pumps bytes into the parser and never blocks on a body. Each request's
/// body is instead drained by a short-lived handler thread, spawned from
/// `on_headers`, so request N+1's headers can start arriving while
/// request N's body is still being read — backpressure is left to the
/// conduit's byte budget rather than stalling the socket read.
fn handle_connection(mut stream: TcpStream) -> std::io::Result<()> {
    loop {
        let handler_slot: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));
        let handler_slot_cb = handler_slot.clone();
        let response_stream = stream.try_clone()?;

        let mut parser = Parser::new(Box::new(move |head: RequestHead, conduit| {
            log::info!("{} {} {}", head.method, head.uri, head.version);
            let mut response_stream = response_stream.try_clone().expect("clone tcp stream");

            match decide_100_continue(&head.headers) {
                ContinueDecision::Send100 => {
                    let _ = response_stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
                }
                ContinueDecision::Expectation417 => {
                    let _ = response_stream.write_all(b"HTTP/1.1 417 Expectation Failed\r\n\r\n");
                }
                ContinueDecision::NotRequested => {}
            }

            let join = thread::spawn(move || echo_body(conduit, response_stream));
            *handler_slot_cb.lock().unwrap() = Some(join);
        }));

        let mut buf = [0u8; 8192];
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                parser.notify_peer_closed();
                if let Some(join) = handler_slot.lock().unwrap().take() {
                    join.join().ok();
                }
                return Ok(());
            }
            match parser.offer(&buf[..n]) {
                Ok(ParseStatus::Complete(_)) => break,
                Ok(ParseStatus::Incomplete) => continue,
                Err(e) => {
                    log::warn!("parse error: {e}");
                    let _ = stream.write_all(format!("HTTP/1.1 {}\r\n\r\n", status_line(&e)).as_bytes());
                    return Ok(());
                }
            }
        }

        if let Some(join) = handler_slot.lock().unwrap().take() {
            join.join().ok();
        }
    }
}

fn echo_body(conduit: Option<Arc<BodyConduit>>, mut response_stream: TcpStream) {
    let mut body = Vec::new();
    if let Some(conduit) = conduit {
        let mut reader: &BodyConduit = &conduit;
        let _ = reader.read_to_end(&mut body);
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n",
        body.len()
    );
    if response_stream.write_all(response.as_bytes()).is_ok() {
        let _ = response_stream.write_all(&body);
    }
}

fn status_line(err: &wireframe::RequestError) -> String {
    match err {
        wireframe::RequestError::Invalid(e) => format!("{} {}", e.status.as_u16(), e.status.canonical_reason().unwrap_or("")),
        wireframe::RequestError::Conduit(_) => "500 Internal Server Error".to_string(),
    }
}
