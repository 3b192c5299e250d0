use std::sync::Arc;

use futures_util::stream;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use bank_types::{
    Code, CurrencyCode, ExchangeRateRequest, Status, TransactionDirection, TransactionMessage,
    TransferOutcome, TransferRequest,
};

use super::status::*;
use super::*;
use crate::BankService;
use crate::service_tests::tests::MockRepo;

fn setup() -> (BankService<MockRepo>, Arc<MockRepo>) {
    let repo = Arc::new(MockRepo::new());
    (BankService::from_shared(repo.clone()), repo)
}

fn txn(account: &str, amount: Decimal, direction: TransactionDirection) -> TransactionMessage {
    TransactionMessage {
        account_number: account.into(),
        amount,
        direction,
        timestamp: None,
        notes: String::new(),
    }
}

fn transfer(from: &str, to: &str, amount: Decimal) -> TransferRequest {
    TransferRequest {
        from_account: from.into(),
        to_account: to.into(),
        currency: "USD".into(),
        amount,
        notes: String::new(),
    }
}

fn inbound<T>(items: Vec<T>) -> impl futures_util::Stream<Item = Result<T, Status>> + Unpin {
    stream::iter(items.into_iter().map(Ok))
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate feed
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_rate_feed_emits_then_stops_on_cancel() {
    let (service, repo) = setup();
    repo.seed_rate(CurrencyCode::USD, CurrencyCode::IDR, dec!(2150));
    let resolver = service.rates().clone();
    let (ctx, handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(8);

    let feed = tokio::spawn(async move {
        let req = ExchangeRateRequest {
            from_currency: "USD".into(),
            to_currency: "IDR".into(),
        };
        fetch_exchange_rates(&resolver, ctx, req, DEFAULT_TICK, tx).await
    });

    let first = rx.recv().await.unwrap();
    assert_eq!(first.from_currency, "USD");
    assert_eq!(first.to_currency, "IDR");
    assert_eq!(first.rate, dec!(2150));
    assert!(first.timestamp.ends_with('Z'));
    assert!(!first.timestamp.contains('.'));

    handle.cancel();
    let result = tokio::time::timeout(DEFAULT_TICK, feed)
        .await
        .expect("feed did not stop within one tick")
        .unwrap();

    assert_eq!(result, Ok(Completion::Cancelled));
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rate_feed_ticks_at_interval() {
    let (service, repo) = setup();
    repo.seed_rate(CurrencyCode::USD, CurrencyCode::IDR, dec!(2000));
    let resolver = service.rates().clone();
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(8);

    tokio::spawn(async move {
        let req = ExchangeRateRequest {
            from_currency: "USD".into(),
            to_currency: "IDR".into(),
        };
        fetch_exchange_rates(&resolver, ctx, req, DEFAULT_TICK, tx).await
    });

    let start = tokio::time::Instant::now();
    rx.recv().await.unwrap();
    rx.recv().await.unwrap();
    assert!(start.elapsed() >= DEFAULT_TICK);
}

#[tokio::test]
async fn test_rate_feed_rejects_unknown_currency() {
    let (service, _) = setup();
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(8);

    let result = fetch_exchange_rates(
        service.rates(),
        ctx,
        ExchangeRateRequest {
            from_currency: "USD".into(),
            to_currency: "ABC".into(),
        },
        DEFAULT_TICK,
        tx,
    )
    .await;

    let status = result.unwrap_err();
    assert_eq!(status.code, Code::InvalidArgument);
    assert_eq!(status.reason(), Some(REASON_INVALID_CURRENCY));
    assert_eq!(status.metadata("to_currency"), Some("ABC"));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_rate_feed_errors_when_no_rate() {
    let (service, _) = setup();
    let (ctx, _handle) = CallContext::new();
    let (tx, _rx) = mpsc::channel(8);

    let result = fetch_exchange_rates(
        service.rates(),
        ctx,
        ExchangeRateRequest {
            from_currency: "IDR".into(),
            to_currency: "USD".into(),
        },
        DEFAULT_TICK,
        tx,
    )
    .await;

    let status = result.unwrap_err();
    assert_eq!(status.code, Code::NotFound);
    assert_eq!(status.reason(), Some(REASON_RATE_NOT_FOUND));
    assert_eq!(status.metadata("from_currency"), Some("IDR"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Summarizer
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_summarize_folds_in_and_out() {
    let (service, repo) = setup();
    repo.seed_account("1001", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(1);

    let result = summarize_transactions(
        service.ledger(),
        ctx,
        inbound(vec![
            txn("1001", dec!(100), TransactionDirection::In),
            txn("1001", dec!(40), TransactionDirection::Out),
        ]),
        tx,
    )
    .await;

    assert_eq!(result, Ok(Completion::Finished));
    let summary = rx.recv().await.unwrap();
    assert_eq!(summary.account_number, "1001");
    assert_eq!(summary.sum_amount_in, dec!(100));
    assert_eq!(summary.sum_amount_out, dec!(40));
    assert_eq!(summary.sum_amount, dec!(60));
    assert!(rx.recv().await.is_none());
    assert_eq!(repo.balance_of("1001"), dec!(60));
}

#[tokio::test]
async fn test_summarize_negative_amount_stops_processing() {
    let (service, repo) = setup();
    repo.seed_account("1001", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(1);

    let result = summarize_transactions(
        service.ledger(),
        ctx,
        inbound(vec![
            txn("1001", dec!(10), TransactionDirection::In),
            txn("1001", dec!(-5), TransactionDirection::In),
            txn("1001", dec!(20), TransactionDirection::In),
        ]),
        tx,
    )
    .await;

    let status = result.unwrap_err();
    assert_eq!(status.code, Code::InvalidArgument);
    assert_eq!(status.reason(), Some(REASON_NEGATIVE_AMOUNT));
    assert_eq!(status.field_violations().next().unwrap().field, "amount");
    assert!(rx.recv().await.is_none());
    assert_eq!(repo.balance_of("1001"), dec!(10));
}

#[tokio::test]
async fn test_summarize_total_overflow_is_invalid_argument() {
    let (service, repo) = setup();
    repo.seed_account("1001", Decimal::ZERO);
    let before = repo.transaction_count();
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(1);

    // The balance never leaves [0, MAX]; only the running sum of credits overflows.
    let result = summarize_transactions(
        service.ledger(),
        ctx,
        inbound(vec![
            txn("1001", Decimal::MAX, TransactionDirection::In),
            txn("1001", Decimal::MAX, TransactionDirection::Out),
            txn("1001", Decimal::MAX, TransactionDirection::In),
        ]),
        tx,
    )
    .await;

    let status = result.unwrap_err();
    assert_eq!(status.code, Code::InvalidArgument);
    assert_eq!(status.reason(), Some(REASON_INVALID_ARGUMENT));
    assert_eq!(status.field_violations().next().unwrap().field, "amount");
    assert!(rx.recv().await.is_none());
    assert_eq!(repo.balance_of("1001"), Decimal::ZERO);
    assert_eq!(repo.transaction_count(), before + 2);
}

#[tokio::test]
async fn test_summarize_maps_ledger_errors_to_fields() {
    let (service, repo) = setup();
    repo.seed_account("1001", dec!(5));

    let cases = [
        (
            txn("4040", dec!(1), TransactionDirection::In),
            "account_number",
            REASON_ACCOUNT_NOT_FOUND,
        ),
        (
            txn("1001", dec!(6), TransactionDirection::Out),
            "amount",
            REASON_INSUFFICIENT_FUNDS,
        ),
    ];

    for (msg, field, reason) in cases {
        let (ctx, _handle) = CallContext::new();
        let (tx, _rx) = mpsc::channel(1);

        let status = summarize_transactions(service.ledger(), ctx, inbound(vec![msg]), tx)
            .await
            .unwrap_err();

        assert_eq!(status.code, Code::InvalidArgument);
        assert_eq!(status.reason(), Some(reason));
        assert_eq!(status.field_violations().next().unwrap().field, field);
    }
    assert_eq!(repo.balance_of("1001"), dec!(5));
}

#[tokio::test]
async fn test_summarize_rejects_mixed_accounts() {
    let (service, repo) = setup();
    repo.seed_account("1001", Decimal::ZERO);
    repo.seed_account("1002", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, _rx) = mpsc::channel(1);

    let status = summarize_transactions(
        service.ledger(),
        ctx,
        inbound(vec![
            txn("1001", dec!(1), TransactionDirection::In),
            txn("1002", dec!(1), TransactionDirection::In),
        ]),
        tx,
    )
    .await
    .unwrap_err();

    assert_eq!(status.reason(), Some(REASON_MIXED_ACCOUNTS));
    assert_eq!(repo.balance_of("1002"), Decimal::ZERO);
}

#[tokio::test]
async fn test_summarize_cancelled_sends_nothing() {
    let (service, _) = setup();
    let (ctx, handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(1);
    handle.cancel();

    let result = summarize_transactions(
        service.ledger(),
        ctx,
        stream::pending::<Result<TransactionMessage, Status>>(),
        tx,
    )
    .await;

    assert_eq!(result, Ok(Completion::Cancelled));
    assert!(rx.recv().await.is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfer pipeline
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transfer_pipeline_answers_in_order() {
    let (service, repo) = setup();
    repo.seed_account("1001", dec!(10));
    repo.seed_account("1002", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(8);

    let result = transfer_multiple(
        service.transfers(),
        ctx,
        inbound(vec![
            transfer("1001", "1002", dec!(3)),
            transfer("1002", "1001", dec!(1)),
        ]),
        tx,
    )
    .await;

    assert_eq!(result, Ok(Completion::Finished));
    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!((first.from_account.as_str(), first.amount), ("1001", dec!(3)));
    assert_eq!((second.from_account.as_str(), second.amount), ("1002", dec!(1)));
    assert_eq!(first.status, TransferOutcome::Success);
    assert!(rx.recv().await.is_none());
    assert_eq!(repo.balance_of("1001"), dec!(8));
    assert_eq!(repo.balance_of("1002"), dec!(2));
}

#[tokio::test]
async fn test_transfer_pipeline_negative_amount_stops_processing() {
    let (service, repo) = setup();
    repo.seed_account("1001", dec!(10));
    repo.seed_account("1002", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, mut rx) = mpsc::channel(8);

    let status = transfer_multiple(
        service.transfers(),
        ctx,
        inbound(vec![
            transfer("1001", "1002", dec!(1)),
            transfer("1001", "1002", dec!(-1)),
            transfer("1001", "1002", dec!(1)),
        ]),
        tx,
    )
    .await
    .unwrap_err();

    assert_eq!(status.code, Code::InvalidArgument);
    assert_eq!(status.reason(), Some(REASON_NEGATIVE_AMOUNT));
    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_none());
    assert_eq!(repo.balance_of("1002"), dec!(1));
}

#[tokio::test]
async fn test_transfer_pipeline_unknown_source_is_terminal() {
    let (service, repo) = setup();
    repo.seed_account("1002", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, _rx) = mpsc::channel(8);

    let status = transfer_multiple(
        service.transfers(),
        ctx,
        inbound(vec![transfer("0000", "1002", dec!(1))]),
        tx,
    )
    .await
    .unwrap_err();

    assert_eq!(status.code, Code::FailedPrecondition);
    assert_eq!(status.reason(), Some(REASON_SOURCE_NOT_FOUND));
}

#[tokio::test]
async fn test_transfer_pipeline_client_gone_is_cancelled() {
    let (service, repo) = setup();
    repo.seed_account("1001", dec!(10));
    repo.seed_account("1002", Decimal::ZERO);
    let (ctx, _handle) = CallContext::new();
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let result = transfer_multiple(
        service.transfers(),
        ctx,
        inbound(vec![
            transfer("1001", "1002", dec!(1)),
            transfer("1001", "1002", dec!(1)),
        ]),
        tx,
    )
    .await;

    assert_eq!(result, Ok(Completion::Cancelled));
    assert_eq!(repo.balance_of("1002"), dec!(1));
}
