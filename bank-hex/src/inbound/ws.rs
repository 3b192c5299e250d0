//! WebSocket transport for the streaming RPCs.
//!
//! Every text frame is a JSON [`Frame`]. A reader task decodes client frames
//! into the handler's inbound stream while the handler's responses are
//! forwarded to the socket. A client `end` frame closes the inbound stream
//! only; a Close frame or a dropped socket cancels the call.
//!
//! The reader keeps draining the socket after the handler stops consuming
//! input, so a Close frame is always seen.

use std::future::Future;

use axum::extract::ws::Message;
use futures_util::stream::{self, SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::mpsc;

use bank_types::{Frame, Status};

use crate::rpc::{CallContext, CancelHandle, Completion};

const INBOUND_BUFFER: usize = 16;
const OUTBOUND_BUFFER: usize = 16;

/// Decoded client messages, in arrival order.
pub type Inbound<T> = Box<dyn Stream<Item = Result<T, Status>> + Send + Unpin>;

/// Drives a client-stream or bidirectional call over `socket`.
pub async fn serve_stream<S, Req, Resp, F, Fut>(socket: S, handler: F)
where
    S: Stream<Item = Result<Message, axum::Error>>
        + Sink<Message, Error = axum::Error>
        + Send
        + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: FnOnce(CallContext, Inbound<Req>, mpsc::Sender<Resp>) -> Fut,
    Fut: Future<Output = Result<Completion, Status>> + Send,
{
    let (mut sink, source) = socket.split();
    let (ctx, cancel) = CallContext::new();
    let (in_tx, mut in_rx) = mpsc::channel(INBOUND_BUFFER);
    let (out_tx, out_rx) = mpsc::channel::<Resp>(OUTBOUND_BUFFER);

    let reader = tokio::spawn(read_frames(source, in_tx, cancel));
    let inbound: Inbound<Req> = Box::new(stream::poll_fn(move |cx| in_rx.poll_recv(cx)));

    let call = handler(ctx, inbound, out_tx);
    // Owns the receiver: once the socket fails it is dropped with this
    // future and the handler's next send fails.
    let forward = async {
        let mut out_rx = out_rx;
        while let Some(msg) = out_rx.recv().await {
            if send_frame(&mut sink, &Frame::Message(msg)).await.is_err() {
                return false;
            }
        }
        true
    };
    let (result, connected) = tokio::join!(call, forward);

    let trailer = match result {
        Ok(Completion::Finished) => Some(Frame::<Resp>::End),
        Ok(Completion::Cancelled) => None,
        Err(status) => {
            tracing::info!(
                code = %status.code,
                reason = status.reason(),
                "stream ended with error"
            );
            Some(Frame::Error(status))
        }
    };
    if connected {
        if let Some(frame) = trailer {
            let _ = send_frame(&mut sink, &frame).await;
        }
        let _ = sink.send(Message::Close(None)).await;
    }
    reader.abort();
}

/// Drives a server-stream call: the first client message is the request.
///
/// Later client messages are read and discarded.
pub async fn serve_server_stream<S, Req, Resp, F, Fut>(socket: S, handler: F)
where
    S: Stream<Item = Result<Message, axum::Error>>
        + Sink<Message, Error = axum::Error>
        + Send
        + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: FnOnce(CallContext, Req, mpsc::Sender<Resp>) -> Fut + Send,
    Fut: Future<Output = Result<Completion, Status>> + Send,
{
    serve_stream(socket, |ctx, mut inbound: Inbound<Req>, out| async move {
        let first = inbound.next().await;
        drop(inbound);

        match first {
            Some(Ok(req)) => handler(ctx, req, out).await,
            Some(Err(status)) => Err(status),
            None if ctx.is_cancelled() => Ok(Completion::Cancelled),
            None => Err(Status::invalid_argument(
                "stream ended before the request was sent",
            )),
        }
    })
    .await
}

async fn read_frames<S, Req>(
    mut source: SplitStream<S>,
    in_tx: mpsc::Sender<Result<Req, Status>>,
    cancel: CancelHandle,
) where
    S: Stream<Item = Result<Message, axum::Error>>,
    Req: DeserializeOwned,
{
    let mut in_tx = Some(in_tx);

    while let Some(message) = source.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let item = match serde_json::from_str::<Frame<Req>>(text.as_str()) {
            Ok(Frame::Message(req)) => Ok(req),
            Ok(Frame::End) => {
                in_tx = None;
                continue;
            }
            Ok(Frame::Error(status)) => {
                tracing::debug!(%status, "client aborted stream");
                break;
            }
            Err(e) => Err(Status::invalid_argument(format!("malformed frame: {}", e))),
        };

        if let Some(tx) = &in_tx {
            if tx.send(item).await.is_err() {
                in_tx = None;
            }
        }
    }

    cancel.cancel();
}

async fn send_frame<S, T>(
    sink: &mut SplitSink<S, Message>,
    frame: &Frame<T>,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error>,
    T: Serialize,
{
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sink.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use bank_types::{CurrencyCode, ExchangeRateRequest};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::BankService;
    use crate::rpc;
    use crate::service_tests::tests::MockRepo;

    /// In-memory socket: the test pushes client messages and reads server ones.
    struct TestSocket {
        incoming: mpsc::UnboundedReceiver<Message>,
        outgoing: mpsc::UnboundedSender<Message>,
    }

    impl Stream for TestSocket {
        type Item = Result<Message, axum::Error>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.incoming.poll_recv(cx).map(|msg| msg.map(Ok))
        }
    }

    impl Sink<Message> for TestSocket {
        type Error = axum::Error;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
            self.outgoing.send(item).map_err(axum::Error::new)
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    fn socket() -> (
        TestSocket,
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        let (client_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, client_rx) = mpsc::unbounded_channel();
        (TestSocket { incoming, outgoing }, client_tx, client_rx)
    }

    fn text<T: Serialize>(frame: &Frame<T>) -> Message {
        Message::Text(serde_json::to_string(frame).unwrap().into())
    }

    /// Request, then more frames than the inbound buffer holds.
    fn push_request_and_flood(client: &mpsc::UnboundedSender<Message>) {
        let req = ExchangeRateRequest {
            from_currency: "USD".into(),
            to_currency: "IDR".into(),
        };
        for _ in 0..(INBOUND_BUFFER * 3) {
            client.send(text(&Frame::Message(req.clone()))).unwrap();
        }
    }

    async fn serve_rate_feed(socket: TestSocket) {
        let repo = Arc::new(MockRepo::new());
        repo.seed_rate(CurrencyCode::USD, CurrencyCode::IDR, dec!(2150));
        let resolver = BankService::from_shared(repo).rates().clone();

        serve_server_stream(socket, move |ctx, req: ExchangeRateRequest, out| async move {
            rpc::fetch_exchange_rates(&resolver, ctx, req, Duration::from_millis(1), out).await
        })
        .await;
    }

    #[tokio::test]
    async fn test_close_after_extra_frames_cancels_feed() {
        let (socket, client, mut server) = socket();
        push_request_and_flood(&client);
        client.send(Message::Close(None)).unwrap();

        tokio::time::timeout(Duration::from_secs(5), serve_rate_feed(socket))
            .await
            .expect("feed did not stop after Close");

        let mut frames = Vec::new();
        while let Ok(msg) = server.try_recv() {
            frames.push(msg);
        }
        assert!(matches!(frames.last(), Some(Message::Close(_))));
        assert!(frames[..frames.len() - 1].iter().all(|msg| match msg {
            Message::Text(text) => text.as_str().contains("\"message\""),
            _ => false,
        }));
    }

    #[tokio::test]
    async fn test_broken_sink_stops_feed() {
        let (socket, client, server) = socket();
        drop(server);
        // The client never closes; only the failed write can end the call.
        push_request_and_flood(&client);

        tokio::time::timeout(Duration::from_secs(5), serve_rate_feed(socket))
            .await
            .expect("feed kept running after the socket failed");
    }
}
