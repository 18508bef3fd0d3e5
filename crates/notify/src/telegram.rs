//! Telegram Bot API dispatcher.
//!
//! Delivers the summary via the `sendMessage` endpoint. Long texts are split
//! on line boundaries to respect Telegram's message size limit, and a
//! message whose markup Telegram rejects is re-sent once as plain text.

use async_trait::async_trait;
use resumer_common::{DispatchError, ErrorKind, ResumerError, TelegramConfig};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;

/// Maximum characters in a single Telegram message
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

/// How Telegram answered a `sendMessage` call
#[derive(Debug)]
enum ApiOutcome {
    Sent,
    MarkupRejected(String),
    Failed(DispatchError),
}

/// Sends messages via the Telegram Bot API.
pub struct TelegramDispatcher {
    bot_token: String,
    api_base: String,
    parse_mode: Option<String>,
    client: reqwest::Client,
}

impl fmt::Debug for TelegramDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramDispatcher")
            .field("bot_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

impl TelegramDispatcher {
    /// Creates a new `TelegramDispatcher` from configuration values.
    pub fn new(config: &TelegramConfig) -> Result<Self, ResumerError> {
        if config.bot_token.trim().is_empty() {
            return Err(ResumerError::config("Telegram bot token must not be empty"));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            bot_token: config.bot_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            parse_mode: config.parse_mode.clone(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    /// Send one message part, falling back to plain text on markup errors
    async fn send_part(&self, chat_id: &str, text: &str) -> Result<(), DispatchError> {
        match self.post(chat_id, text, self.parse_mode.as_deref()).await {
            ApiOutcome::Sent => Ok(()),
            ApiOutcome::MarkupRejected(description) => {
                warn!("Telegram rejected message markup ({}), retrying as plain text", description);
                match self.post(chat_id, text, None).await {
                    ApiOutcome::Sent => Ok(()),
                    ApiOutcome::MarkupRejected(description) => {
                        Err(DispatchError::permanent(description))
                    }
                    ApiOutcome::Failed(e) => Err(e),
                }
            }
            ApiOutcome::Failed(e) => Err(e),
        }
    }

    async fn post(&self, chat_id: &str, text: &str, parse_mode: Option<&str>) -> ApiOutcome {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };

        debug!(chat_id = %chat_id, parse_mode = ?parse_mode, "Sending Telegram message");

        let response = match self.client.post(self.endpoint()).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => return ApiOutcome::Failed(transport_failure(e)),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ApiOutcome::Failed(transport_failure(e)),
        };

        interpret_response(status, &body)
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        let parts = split_message(text, TELEGRAM_MESSAGE_LIMIT);

        for (i, part) in parts.iter().enumerate() {
            self.send_part(recipient, part).await?;
            debug!("Sent part {}/{}", i + 1, parts.len());
        }

        info!(chat_id = %recipient, parts = parts.len(), "Telegram message sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}

/// Strips the URL, which carries the bot token
fn transport_failure(err: reqwest::Error) -> DispatchError {
    DispatchError::transient(err.without_url().to_string())
}

fn interpret_response(status: u16, body: &str) -> ApiOutcome {
    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            return ApiOutcome::Failed(DispatchError {
                kind: ErrorKind::from_status(status),
                message: format!("unexpected Telegram response (HTTP {})", status),
            })
        }
    };

    if parsed.get("ok") == Some(&serde_json::Value::Bool(true)) {
        return ApiOutcome::Sent;
    }

    let description = parsed
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Telegram API error")
        .to_string();

    if status == 400 && description.to_lowercase().contains("can't parse entities") {
        return ApiOutcome::MarkupRejected(description);
    }

    if status == 429 {
        let retry_after = parsed
            .get("parameters")
            .and_then(|p| p.get("retry_after"))
            .and_then(|v| v.as_u64())
            .unwrap_or(30);
        return ApiOutcome::Failed(DispatchError::transient(format!(
            "rate limited by Telegram, retry after {}s",
            retry_after
        )));
    }

    ApiOutcome::Failed(DispatchError {
        kind: ErrorKind::from_status(status),
        message: format!("Telegram API error: {}", description),
    })
}

/// Split a long message into parts of at most `max_length` characters.
///
/// Parts break between lines; a single line longer than the limit is cut.
pub fn split_message(message: &str, max_length: usize) -> Vec<String> {
    if message.chars().count() <= max_length {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in message.split('\n') {
        let line_len = line.chars().count();

        if line_len > max_length {
            if !current.trim().is_empty() {
                parts.push(current.trim().to_string());
            }
            current.clear();
            current_len = 0;

            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_length) {
                parts.push(piece.iter().collect());
            }
            continue;
        }

        if current_len + line_len + 1 > max_length && !current.is_empty() {
            if !current.trim().is_empty() {
                parts.push(current.trim().to_string());
            }
            current.clear();
            current_len = 0;
        }

        current.push_str(line);
        current.push('\n');
        current_len += line_len + 1;
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    const MARKUP_REJECTED: &str = r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 3"}"#;
    const SENT: &str = r#"{"ok":true,"result":{"message_id":7}}"#;

    /// Local Bot API stand-in: answers one connection per canned
    /// `(status, body)` pair and yields each request line with its JSON body
    async fn fake_bot_api(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, JoinHandle<Vec<(String, Value)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let (request_line, payload) = read_request(&mut socket).await;
                seen.push((request_line, serde_json::from_slice(&payload).unwrap_or(Value::Null)));

                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            seen
        });

        (base, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> (String, Vec<u8>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request headers ended");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = head_end + 4;
        while buf.len() < body_start + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let request_line = head.lines().next().unwrap_or_default().to_string();
        let body_end = buf.len().min(body_start + content_length);
        (request_line, buf[body_start..body_end].to_vec())
    }

    fn local_dispatcher(api_base: String) -> TelegramDispatcher {
        let mut config = config("123:ABC");
        config.api_base = api_base;
        TelegramDispatcher::new(&config).unwrap()
    }

    fn config(token: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.to_string(),
            chat_id: "12345".to_string(),
            parse_mode: Some("Markdown".to_string()),
            api_base: "https://api.telegram.org/".to_string(),
        }
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = TelegramDispatcher::new(&config("  ")).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_endpoint() {
        let dispatcher = TelegramDispatcher::new(&config("123:ABC")).unwrap();
        assert_eq!(dispatcher.endpoint(), "https://api.telegram.org/bot123:ABC/sendMessage");
        assert_eq!(dispatcher.channel_name(), "telegram");
    }

    #[test]
    fn test_debug_hides_token() {
        let dispatcher = TelegramDispatcher::new(&config("123:ABC")).unwrap();
        assert!(!format!("{:?}", dispatcher).contains("123:ABC"));
    }

    #[test]
    fn test_payload() {
        let payload = SendMessage {
            chat_id: "42",
            text: "*Hello*",
            parse_mode: None,
            disable_web_page_preview: true,
        };
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["chat_id"], "42");
        assert_eq!(body["text"], "*Hello*");
        assert!(body.get("parse_mode").is_none());
    }

    #[test]
    fn test_interpret_success() {
        assert!(matches!(interpret_response(200, r#"{"ok":true,"result":{}}"#), ApiOutcome::Sent));
    }

    #[test]
    fn test_interpret_markup_error() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 12"}"#;
        assert!(matches!(interpret_response(400, body), ApiOutcome::MarkupRejected(_)));
    }

    #[test]
    fn test_interpret_permanent_and_transient() {
        let not_found = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        match interpret_response(400, not_found) {
            ApiOutcome::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::Permanent);
                assert!(e.message.contains("chat not found"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let limited = r#"{"ok":false,"error_code":429,"description":"Too Many Requests","parameters":{"retry_after":7}}"#;
        match interpret_response(429, limited) {
            ApiOutcome::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::Transient);
                assert!(e.message.contains("7s"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        match interpret_response(502, "<html>Bad Gateway</html>") {
            ApiOutcome::Failed(e) => assert_eq!(e.kind, ErrorKind::Transient),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("Hello", 50), vec!["Hello".to_string()]);
    }

    #[test]
    fn test_split_message() {
        let long_message = "Line 1\n".repeat(100);
        let chunks = split_message(&long_message, 50);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
        assert_eq!(chunks.join("\n").matches("Line 1").count(), 100);
    }

    #[test]
    fn test_split_overlong_line() {
        let message = format!("intro\n{}\noutro", "x".repeat(120));
        let chunks = split_message(&message, 50);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
        assert_eq!(chunks.first().map(String::as_str), Some("intro"));
        assert_eq!(chunks.last().map(String::as_str), Some("outro"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transient() {
        let mut config = config("123:ABC");
        config.api_base = "http://127.0.0.1:9".to_string();
        let dispatcher = TelegramDispatcher::new(&config).unwrap();

        let err = dispatcher.dispatch("42", "hello").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transient);
        assert!(!err.message.contains("123:ABC"));
    }

    #[tokio::test]
    async fn test_rejected_markup_is_resent_as_plain_text() {
        let (base, server) = fake_bot_api(vec![(400, MARKUP_REJECTED), (200, SENT)]).await;
        let dispatcher = local_dispatcher(base);

        dispatcher.dispatch("42", "*Budget* approved").await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        for (request_line, body) in &requests {
            assert!(request_line.starts_with("POST /bot123:ABC/sendMessage "));
            assert_eq!(body["chat_id"], "42");
            assert_eq!(body["text"], "*Budget* approved");
        }
        assert_eq!(requests[0].1["parse_mode"], "Markdown");
        assert!(requests[1].1.get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn test_second_markup_rejection_is_permanent() {
        let (base, server) =
            fake_bot_api(vec![(400, MARKUP_REJECTED), (400, MARKUP_REJECTED)]).await;
        let dispatcher = local_dispatcher(base);

        let err = dispatcher.dispatch("42", "*broken").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Permanent);
        assert!(err.message.contains("can't parse entities"));
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_long_message_sent_in_parts() {
        let (base, server) = fake_bot_api(vec![(200, SENT), (200, SENT)]).await;
        let dispatcher = local_dispatcher(base);
        let text = "• a line of the summary\n".repeat(200);

        dispatcher.dispatch("42", &text).await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        let lines: usize = requests
            .iter()
            .map(|(_, body)| body["text"].as_str().unwrap().lines().count())
            .sum();
        assert_eq!(lines, 200);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let (base, server) = fake_bot_api(vec![(502, "<html>Bad Gateway</html>")]).await;
        let dispatcher = local_dispatcher(base);

        let err = dispatcher.dispatch("42", "hello").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transient);
        assert_eq!(server.await.unwrap().len(), 1);
    }
}
