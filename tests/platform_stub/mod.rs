use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

pub static PIXEL_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub location: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            location: None,
        }
    }

    #[allow(dead_code)]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            body: Vec::new(),
            location: Some(location.into()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!("status {status}").into_bytes(),
            location: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub cookie: Option<String>,
}

/// Stand-in for the e-reader platform. Each path answers with its replies in
/// order and the last reply repeats. Unknown paths answer 404.
pub struct PlatformStub {
    pub base_url: String,
    routes: Arc<Mutex<HashMap<String, (Vec<Reply>, usize)>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PlatformStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start platform stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let routes: Arc<Mutex<HashMap<String, (Vec<Reply>, usize)>>> = Arc::default();
        let routes_by_server = Arc::clone(&routes);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_server = Arc::clone(&seen);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let cookie = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Cookie"))
                    .map(|h| h.value.as_str().to_owned());
                seen_by_server
                    .lock()
                    .expect("lock seen requests")
                    .push(SeenRequest {
                        path: path.clone(),
                        cookie,
                    });

                let reply = {
                    let mut routes = routes_by_server.lock().expect("lock routes");
                    match routes.get_mut(&path) {
                        Some((replies, served)) if !replies.is_empty() => {
                            let idx = (*served).min(replies.len() - 1);
                            *served += 1;
                            replies[idx].clone()
                        }
                        _ => Reply::status(404),
                    }
                };

                let mut response =
                    tiny_http::Response::from_data(reply.body).with_status_code(reply.status);
                if let Some(location) = reply.location.as_deref() {
                    let header =
                        tiny_http::Header::from_bytes(&b"Location"[..], location.as_bytes())
                            .expect("build location header");
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            routes,
            seen,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn route(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .expect("lock routes")
            .insert(path.to_owned(), (replies, 0));
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("lock seen requests").clone()
    }

    #[allow(dead_code)]
    pub fn hits(&self, path: &str) -> usize {
        self.seen().iter().filter(|r| r.path == path).count()
    }
}

impl Drop for PlatformStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spine markup whose content root lives on the stub itself.
#[allow(dead_code)]
pub fn spine_html(base_url: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head>
    <base href="{base_url}/books/42/EPUB/text/"/>
    <link rel="stylesheet" href="../../static/reader/reader.css"/>
    <link rel="stylesheet" href="../styles/book.css"/>
    <script type="text/javascript">
      window.reader.boot({{ live: true }});
    </script>
  </head>
  <body>
{body}
  </body>
</html>
"#
    )
}
