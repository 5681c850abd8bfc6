//! Minimal HTTP/1.1 server for exercising the real clients in tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl Route {
    pub fn new(path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_string(),
            status,
            content_type: "application/json".to_string(),
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }
}

/// Serve `routes` on an ephemeral local port and return its base URL.
/// Requests are matched on path alone; unknown paths get a 404.
pub async fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let _ = respond(stream, &routes).await;
            });
        }
    });

    format!("http://{}", addr)
}

async fn respond(mut stream: TcpStream, routes: &[Route]) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < header_end + content_length {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);

    let (status, content_type, body) = match routes.iter().find(|r| r.path == path) {
        Some(route) => (route.status, route.content_type.as_str(), route.body.as_slice()),
        None => (404, "text/plain", b"no route".as_slice()),
    };

    let head = format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.shutdown().await
}
