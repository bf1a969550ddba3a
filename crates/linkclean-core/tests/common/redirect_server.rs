//! Minimal HTTP/1.1 server for integration tests: fixed redirects and pages.
//!
//! `{base}` in a location or page body is replaced with the server's base URL
//! (e.g. "http://127.0.0.1:12345"), so routes can point back at the server.
//! Unknown paths answer 404. HEAD gets headers only.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
pub enum Route {
    Redirect { status: u16, location: String },
    Page(Vec<u8>),
}

impl Route {
    pub fn redirect(status: u16, location: &str) -> Self {
        Route::Redirect {
            status,
            location: location.to_string(),
        }
    }

    pub fn page(body: impl Into<Vec<u8>>) -> Self {
        Route::Page(body.into())
    }
}

/// Starts a server in a background thread. Returns the base URL without a
/// trailing slash. The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}", port);

    let routes: HashMap<String, Route> = routes
        .into_iter()
        .map(|(path, route)| (path.to_string(), expand(route, &base)))
        .collect();
    let routes = Arc::new(routes);

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    base
}

fn expand(route: Route, base: &str) -> Route {
    match route {
        Route::Redirect { status, location } => Route::Redirect {
            status,
            location: location.replace("{base}", base),
        },
        Route::Page(body) => match String::from_utf8(body) {
            Ok(text) => Route::Page(text.replace("{base}", base).into_bytes()),
            Err(e) => Route::Page(e.into_bytes()),
        },
    }
}

fn handle(mut stream: std::net::TcpStream, routes: &HashMap<String, Route>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("GET");
    let path = parts.next().unwrap_or("/");
    let head = method.eq_ignore_ascii_case("HEAD");

    match routes.get(path) {
        Some(Route::Redirect { status, location }) => {
            let reason = if *status == 301 { "Moved Permanently" } else { "Found" };
            let body = b"redirecting";
            let response = format!(
                "HTTP/1.1 {} {}\r\nLocation: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason,
                location,
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            if !head {
                let _ = stream.write_all(body);
            }
        }
        Some(Route::Page(body)) => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            if !head {
                let _ = stream.write_all(body);
            }
        }
        None => {
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    }
    let _ = stream.flush();
}
