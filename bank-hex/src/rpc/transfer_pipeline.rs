use chrono::Utc;
use futures_util::{Stream, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use bank_types::{BankRepository, Status, TransferOutcome, TransferRequest, TransferResponse};

use super::{CallContext, Completion, status};
use crate::service::TransferOrchestrator;

/// Bidirectional stream: one transfer per request, strictly in arrival order.
///
/// The next request is not read until the previous response is queued, and
/// the first failing transfer ends the call.
#[tracing::instrument(skip_all)]
pub async fn transfer_multiple<R, S>(
    orchestrator: &TransferOrchestrator<R>,
    ctx: CallContext,
    mut inbound: S,
    out: mpsc::Sender<TransferResponse>,
) -> Result<Completion, Status>
where
    R: BankRepository,
    S: Stream<Item = Result<TransferRequest, Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(Completion::Cancelled),
            next = inbound.next() => next,
        };
        let req = match next {
            Some(Ok(req)) => req,
            Some(Err(status)) => return Err(status),
            None => return Ok(Completion::Finished),
        };

        if req.amount < Decimal::ZERO {
            return Err(status::negative_amount(req.amount));
        }

        let (transfer_id, succeeded) = orchestrator
            .transfer(
                &req.from_account,
                &req.to_account,
                &req.currency,
                req.amount,
                &req.notes,
            )
            .await
            .map_err(|e| status::transfer_failed(&e, &req))?;

        let response = TransferResponse {
            transfer_id,
            from_account: req.from_account,
            to_account: req.to_account,
            currency: req.currency,
            amount: req.amount,
            status: TransferOutcome::from(succeeded),
            timestamp: Utc::now(),
        };
        let sent = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(Completion::Cancelled),
            sent = out.send(response) => sent,
        };
        if sent.is_err() {
            return Ok(Completion::Cancelled);
        }
    }
}
