// Expiry sweep
//
// A periodic task with two jobs: reject Pending withdrawals nobody
// decided within the configured window, and finish reservation work a
// crash cut off mid-operation (a request terminal on disk with its hold
// still in place, or a hold whose request record was never written).

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use metrics::counter;
use sika_common::{
    api::WithdrawalDecision,
    error::{LedgerError, LedgerResult},
    time::{get_current_time_in_millis, TimestampMillis},
    tokio::{spawn_task, task::JoinHandle, time::interval},
    withdrawal::WithdrawalStatus,
};

use super::{ledger::Ledger, storage::LedgerStorage};

/// What one sweep pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending requests rejected for age
    pub expired: usize,
    /// Holds released (orphaned, or backing a Rejected request)
    pub released: usize,
    /// Holds settled behind a request already Settled on disk
    pub settled: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired == 0 && self.released == 0 && self.settled == 0
    }
}

/// Spawn the sweep loop. Runs until the handle is aborted on shutdown.
pub fn spawn_expiry_sweep<S: LedgerStorage>(
    ledger: Arc<Ledger<S>>,
    period: Duration,
) -> JoinHandle<()> {
    spawn_task("expiry-sweep", async move {
        // The first tick fires immediately, so anything a previous run
        // left behind is reconciled before traffic builds up
        let mut timer = interval(period);
        loop {
            timer.tick().await;
            match sweep_once(&ledger).await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => info!(
                    "Sweep pass: {} expired, {} holds released, {} holds settled",
                    report.expired, report.released, report.settled
                ),
                Err(err) => warn!("Sweep pass failed: {}", err),
            }
        }
    })
}

/// One reconciliation pass over pending requests and held reservations.
pub async fn sweep_once<S: LedgerStorage>(ledger: &Ledger<S>) -> LedgerResult<SweepReport> {
    let now = get_current_time_in_millis();
    let expiry_ms = ledger.config().withdrawal_expiry.as_millis() as TimestampMillis;
    let mut report = SweepReport::default();

    for request in ledger.storage().get_pending_withdrawals().await? {
        if now.saturating_sub(request.created_at) < expiry_ms {
            continue;
        }
        match ledger
            .decide_withdrawal(
                &request.id,
                WithdrawalDecision::Reject,
                Some("expired".to_string()),
            )
            .await
        {
            Ok(_) => {
                debug!("Expired withdrawal {} rejected", request.id);
                counter!("sika_sweep_expired_total").increment(1u64);
                report.expired += 1;
            }
            // Lost the race to an operator decision
            Err(LedgerError::InvalidTransition { .. }) => {}
            Err(err) => warn!("Could not expire withdrawal {}: {}", request.id, err),
        }
    }

    for reservation in ledger.storage().get_held_reservations().await? {
        match reservation.withdrawal_id {
            None => {
                // A submit that died between taking the hold and
                // writing the request. The grace period is the expiry
                // window, so a submit still in flight is never touched
                if now.saturating_sub(reservation.created_at) < expiry_ms {
                    continue;
                }
                warn!(
                    "Releasing orphaned reservation {} on investment {}",
                    reservation.id, reservation.investment_id
                );
                match ledger.storage().release_reservation(&reservation.id).await {
                    Ok(_) => report.released += 1,
                    Err(err) => {
                        warn!("Could not release reservation {}: {}", reservation.id, err)
                    }
                }
            }
            Some(withdrawal_id) => {
                let request = match ledger.storage().get_withdrawal(&withdrawal_id).await {
                    Ok(request) => request,
                    Err(err) => {
                        warn!(
                            "Reservation {} points at unreadable withdrawal {}: {}",
                            reservation.id, withdrawal_id, err
                        );
                        continue;
                    }
                };
                match request.status {
                    // In flight, nothing to reconcile
                    WithdrawalStatus::Pending | WithdrawalStatus::Approved => {}
                    WithdrawalStatus::Rejected => {
                        match ledger.storage().release_reservation(&reservation.id).await {
                            Ok(_) => {
                                debug!(
                                    "Released hold {} behind rejected withdrawal {}",
                                    reservation.id, withdrawal_id
                                );
                                report.released += 1;
                            }
                            Err(err) => warn!(
                                "Could not release reservation {}: {}",
                                reservation.id, err
                            ),
                        }
                    }
                    WithdrawalStatus::Settled => {
                        match ledger.storage().settle_reservation(&reservation.id).await {
                            Ok(_) => {
                                debug!(
                                    "Settled hold {} behind settled withdrawal {}",
                                    reservation.id, withdrawal_id
                                );
                                report.settled += 1;
                            }
                            Err(err) => warn!(
                                "Could not settle reservation {}: {}",
                                reservation.id, err
                            ),
                        }
                    }
                }
            }
        }
    }

    Ok(report)
}
