//! # Bank Client SDK
//!
//! A typed Rust client for the Bank API: plain HTTP for the unary routes and
//! WebSocket calls for the three streams.

use bank_types::{
    AccountResponse, BalanceResponse, CreateAccountRequest, CurrencyCode, ExchangeRateRequest,
    ExchangeRateResponse, Frame, Status, TransactionMessage, TransactionResponse,
    TransactionSummaryResponse, TransferId, TransferRecordResponse, TransferRequest,
    TransferResponse,
};
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{
    self, Message, client::IntoClientRequest, http::HeaderValue,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Header the server uses to pick a rate limit bucket.
const CLIENT_ID_HEADER: &str = "x-client-id";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the call with a structured status.
    #[error("{0}")]
    Status(Status),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(err))
    }
}

impl ClientError {
    /// Structured status, when the server sent one.
    pub fn status(&self) -> Option<&Status> {
        match self {
            ClientError::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Bank API client.
pub struct BankClient {
    base_url: String,
    client_id: Option<String>,
    http: Client,
}

impl BankClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: None,
            http: Client::new(),
        }
    }

    /// Sets the identifier sent as `x-client-id`.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unary routes
    // ─────────────────────────────────────────────────────────────────────────

    /// Provisions an account with zero balance.
    pub async fn create_account(
        &self,
        account_number: &str,
        account_name: &str,
        currency: CurrencyCode,
    ) -> Result<AccountResponse, ClientError> {
        let req = CreateAccountRequest {
            account_number: account_number.to_string(),
            account_name: account_name.to_string(),
            currency,
        };
        self.post("/api/accounts", &req).await
    }

    pub async fn get_account(&self, account_number: &str) -> Result<AccountResponse, ClientError> {
        self.get(&format!("/api/accounts/{}", account_number)).await
    }

    /// Current balance and its USD to IDR value.
    pub async fn get_balance(&self, account_number: &str) -> Result<BalanceResponse, ClientError> {
        self.get(&format!("/api/accounts/{}/balance", account_number))
            .await
    }

    pub async fn list_transactions(
        &self,
        account_number: &str,
    ) -> Result<Vec<TransactionResponse>, ClientError> {
        self.get(&format!("/api/accounts/{}/transactions", account_number))
            .await
    }

    pub async fn get_transfer(
        &self,
        id: TransferId,
    ) -> Result<TransferRecordResponse, ClientError> {
        self.get(&format!("/api/transfers/{}", id)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Streams
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a rate feed for one currency pair.
    pub async fn exchange_rates(
        &self,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<StreamCall<ExchangeRateResponse>, ClientError> {
        let mut call = self.open("/rpc/exchange-rates").await?;
        call.send(&ExchangeRateRequest {
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
        })
        .await?;
        Ok(call)
    }

    /// Applies `messages` in order and returns the server's summary.
    pub async fn summarize(
        &self,
        messages: &[TransactionMessage],
    ) -> Result<TransactionSummaryResponse, ClientError> {
        let mut call = self.open("/rpc/transactions/summarize").await?;
        for msg in messages {
            if let Err(e) = call.send(msg).await {
                return Err(call.rejection_or(e).await);
            }
        }
        if let Err(e) = call.finish().await {
            return Err(call.rejection_or(e).await);
        }

        let summary = call
            .recv()
            .await?
            .ok_or_else(|| ClientError::Protocol("stream ended without a summary".into()))?;
        call.recv().await?;
        Ok(summary)
    }

    /// Runs `requests` one at a time, waiting for each result before sending
    /// the next. Stops at the first failed transfer.
    pub async fn transfer_multiple(
        &self,
        requests: &[TransferRequest],
    ) -> Result<Vec<TransferResponse>, ClientError> {
        let mut call = self.open("/rpc/transfers").await?;
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            if let Err(e) = call.send(req).await {
                return Err(call.rejection_or(e).await);
            }
            match call.recv().await? {
                Some(resp) => results.push(resp),
                None => {
                    return Err(ClientError::Protocol(
                        "stream ended before all transfers were answered".into(),
                    ));
                }
            }
        }
        call.finish().await?;
        call.recv().await?;
        Ok(results)
    }

    /// Opens a raw streaming call for callers that drive the frames themselves.
    pub async fn open<Resp: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<StreamCall<Resp>, ClientError> {
        let mut request = ws_url(&self.base_url, path).into_client_request()?;
        if let Some(id) = &self.client_id {
            let value = HeaderValue::from_str(id)
                .map_err(|e| ClientError::Protocol(format!("invalid client id: {}", e)))?;
            request.headers_mut().insert(CLIENT_ID_HEADER, value);
        }

        let (socket, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(StreamCall {
            socket,
            done: false,
            _resp: std::marker::PhantomData,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(id) = &self.client_id {
            req = req.header(CLIENT_ID_HEADER, id);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(id) = &self.client_id {
            req = req.header(CLIENT_ID_HEADER, id);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(error_from_body(status.as_u16(), body))
        }
    }
}

fn error_from_body(status: u16, body: String) -> ClientError {
    if let Ok(parsed) = serde_json::from_str::<Status>(&body) {
        return ClientError::Status(parsed);
    }
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body);
    ClientError::Api { status, message }
}

fn ws_url(base_url: &str, path: &str) -> String {
    let base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };
    format!("{}{}", base, path)
}

/// One open streaming call.
pub struct StreamCall<Resp> {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    done: bool,
    _resp: std::marker::PhantomData<fn() -> Resp>,
}

impl<Resp: DeserializeOwned> StreamCall<Resp> {
    pub async fn send<Req: Serialize>(&mut self, msg: &Req) -> Result<(), ClientError> {
        self.send_frame(&Frame::Message(msg)).await
    }

    /// Half-closes the call: no more messages will be sent.
    pub async fn finish(&mut self) -> Result<(), ClientError> {
        self.send_frame(&Frame::<()>::End).await
    }

    /// Next response, `None` once the server ended the call normally.
    ///
    /// An error frame from the server is returned as [`ClientError::Status`].
    pub async fn recv(&mut self) -> Result<Option<Resp>, ClientError> {
        if self.done {
            return Ok(None);
        }

        while let Some(message) = self.socket.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            return match serde_json::from_str::<Frame<Resp>>(&text)? {
                Frame::Message(resp) => Ok(Some(resp)),
                Frame::End => {
                    self.done = true;
                    Ok(None)
                }
                Frame::Error(status) => {
                    self.done = true;
                    Err(ClientError::Status(status))
                }
            };
        }

        self.done = true;
        Ok(None)
    }

    /// Cancels the call.
    pub async fn close(mut self) -> Result<(), ClientError> {
        match self.socket.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The status the server ended the call with, if one is still buffered
    /// on the socket; otherwise `err`.
    async fn rejection_or(&mut self, err: ClientError) -> ClientError {
        loop {
            match self.recv().await {
                Ok(Some(_)) => continue,
                Err(ClientError::Status(status)) => return ClientError::Status(status),
                Ok(None) | Err(_) => return err,
            }
        }
    }

    async fn send_frame<T: Serialize>(&mut self, frame: &Frame<T>) -> Result<(), ClientError> {
        let json = serde_json::to_string(frame)?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_types::Code;
    use tokio::net::TcpListener;

    #[test]
    fn test_client_creation() {
        let client = BankClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = BankClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_client_id() {
        let client = BankClient::new("http://localhost:3000").with_client_id("teller-7");
        assert_eq!(client.client_id, Some("teller-7".to_string()));
    }

    #[test]
    fn test_ws_url_follows_scheme() {
        assert_eq!(
            ws_url("http://localhost:3000", "/rpc/transfers"),
            "ws://localhost:3000/rpc/transfers"
        );
        assert_eq!(
            ws_url("https://bank.example", "/rpc/exchange-rates"),
            "wss://bank.example/rpc/exchange-rates"
        );
    }

    #[test]
    fn test_error_body_with_status_is_structured() {
        let body = serde_json::to_string(
            &Status::new(Code::NotFound, "Account 1 not found")
                .with_reason("NOT_FOUND", [("account_number", "1")]),
        )
        .unwrap();

        let err = error_from_body(404, body);

        let status = err.status().unwrap();
        assert_eq!(status.code, Code::NotFound);
        assert_eq!(status.reason(), Some("NOT_FOUND"));
    }

    #[test]
    fn test_error_body_without_status_falls_back() {
        let err = error_from_body(
            429,
            r#"{"error":"Rate limit exceeded. Please try again later.","retry_after_seconds":60}"#
                .into(),
        );

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.starts_with("Rate limit exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Rejects every summarize call as soon as it opens, then hangs up.
    async fn rejecting_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let frame = Frame::<()>::Error(
                Status::invalid_argument("Account 1001 not found")
                    .with_reason("ACCOUNT_NOT_FOUND", [("account_number", "1001")]),
            );
            let json = serde_json::to_string(&frame).unwrap();
            ws.send(Message::Text(json)).await.unwrap();
            let _ = ws.close(None).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_summarize_returns_status_sent_before_input_finished() {
        let base_url = rejecting_server().await;
        let msg: TransactionMessage =
            serde_json::from_str(r#"{"account_number":"1001","amount":"1"}"#).unwrap();
        let messages = vec![msg; 5000];

        let err = BankClient::new(base_url)
            .summarize(&messages)
            .await
            .unwrap_err();

        let status = err.status().expect("server status was lost");
        assert_eq!(status.code, Code::InvalidArgument);
        assert_eq!(status.reason(), Some("ACCOUNT_NOT_FOUND"));
    }
}
