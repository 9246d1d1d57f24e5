//! Scripted local HTTP server for transport tests.

use std::thread::{self, JoinHandle};

use tiny_http::{Header, Response, Server};

/// What the server saw for one request.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Serve `responses` in order, one per request, then stop.
///
/// Returns the base URL and a handle yielding the captured requests.
pub fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Captured>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr().to_ip().unwrap());
    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let Ok(mut request) = server.recv() else {
                break;
            };
            let mut sent = String::new();
            request.as_reader().read_to_string(&mut sent).unwrap();
            captured.push(Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization: request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.to_string()),
                body: sent,
            });
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
            request.respond(response).unwrap();
        }
        captured
    });
    (base, handle)
}
