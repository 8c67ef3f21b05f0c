//! Configuration for the chessdesk console client
//!
//! Arbiter address precedence:
//! 1. --server-url flag
//! 2. CHESSDESK_SERVER_URL environment variable
//! 3. http://localhost:8080 (the arbiter's default port)

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

pub fn resolve_server_url(flag: Option<&str>) -> String {
    if let Some(url) = flag {
        return url.to_string();
    }
    if let Ok(url) = std::env::var("CHESSDESK_SERVER_URL") {
        if !url.is_empty() {
            return url;
        }
    }
    DEFAULT_SERVER_URL.to_string()
}
