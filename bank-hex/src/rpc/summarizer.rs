use chrono::Utc;
use futures_util::{Stream, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use bank_types::{
    BankRepository, Status, TransactionDirection, TransactionMessage, TransactionSummaryResponse,
};

use super::{CallContext, Completion, status};
use crate::service::AccountLedger;

#[derive(Default)]
struct Totals {
    account_number: Option<String>,
    sum_in: Decimal,
    sum_out: Decimal,
}

impl Totals {
    /// Sums with `amount` added, or `None` if one of them would overflow.
    fn with(
        &self,
        direction: TransactionDirection,
        amount: Decimal,
    ) -> Option<(Decimal, Decimal)> {
        match direction {
            TransactionDirection::In => Some((self.sum_in.checked_add(amount)?, self.sum_out)),
            TransactionDirection::Out => Some((self.sum_in, self.sum_out.checked_add(amount)?)),
            TransactionDirection::Unknown => Some((self.sum_in, self.sum_out)),
        }
    }

    fn into_response(self) -> TransactionSummaryResponse {
        TransactionSummaryResponse {
            account_number: self.account_number.unwrap_or_default(),
            sum_amount_in: self.sum_in,
            sum_amount_out: self.sum_out,
            // Both sums are non-negative, so the difference cannot overflow.
            sum_amount: self.sum_in - self.sum_out,
            timestamp: Utc::now(),
        }
    }
}

/// Client stream: applies each transaction in order, then replies once with
/// the totals.
///
/// The first failing message ends the call; transactions already applied
/// stay applied. A message that would overflow a running total is rejected
/// before it reaches the ledger.
#[tracing::instrument(skip_all)]
pub async fn summarize_transactions<R, S>(
    ledger: &AccountLedger<R>,
    ctx: CallContext,
    mut inbound: S,
    out: mpsc::Sender<TransactionSummaryResponse>,
) -> Result<Completion, Status>
where
    R: BankRepository,
    S: Stream<Item = Result<TransactionMessage, Status>> + Unpin,
{
    let mut totals = Totals::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(Completion::Cancelled),
            next = inbound.next() => next,
        };
        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(status)) => return Err(status),
            None => break,
        };

        if msg.amount < Decimal::ZERO {
            return Err(status::negative_amount(msg.amount));
        }

        match &totals.account_number {
            Some(expected) if *expected != msg.account_number => {
                return Err(status::mixed_accounts(expected, &msg.account_number));
            }
            Some(_) => {}
            None => totals.account_number = Some(msg.account_number.clone()),
        }

        let (sum_in, sum_out) = totals
            .with(msg.direction, msg.amount)
            .ok_or_else(|| status::summary_overflow(&msg))?;

        ledger
            .apply(
                &msg.account_number,
                msg.amount,
                msg.direction,
                &msg.notes,
                msg.timestamp,
            )
            .await
            .map_err(|e| status::transaction_failed(&e, &msg))?;

        totals.sum_in = sum_in;
        totals.sum_out = sum_out;
    }

    let summary = totals.into_response();
    tracing::info!(
        account_number = %summary.account_number,
        sum_in = %summary.sum_amount_in,
        sum_out = %summary.sum_amount_out,
        "transactions summarized"
    );

    if out.send(summary).await.is_err() {
        return Ok(Completion::Cancelled);
    }
    Ok(Completion::Finished)
}
