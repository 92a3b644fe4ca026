// HTTP handlers
//
// Thin translation layer: deserialize the wire type, call the ledger, wrap
// the outcome. Ledger failures surface through ApiError; idempotent replays
// are success bodies carrying their own outcome tag.

use actix_web::{
    web::{Bytes, Data, Json, Path, Query},
    HttpRequest, HttpResponse,
};
use log::warn;
use serde::Deserialize;
use sika_common::{
    api::{
        payout::{
            verify_payout_signature, PayoutCallback, PAYOUT_SIGNATURE_HEADER,
            PAYOUT_TIMESTAMP_HEADER,
        },
        ActivateInvestmentRequest, ActivateInvestmentResponse, BindReferrerRequest,
        BindReferrerResponse, CreditVideoWatchRequest, CreditVideoWatchResponse,
        DecideWithdrawalRequest, DecideWithdrawalResponse, ErrorResponse, HealthResponse,
        InvestmentsResponse, RewardsResponse, SetInvestmentStatusRequest, SubmitWithdrawalRequest,
        WithdrawalResponse, WithdrawalsResponse,
    },
    ids::{InvestmentId, UserId, WithdrawalId},
    time::LedgerDay,
};

use crate::core::{
    activation::ActivateOutcome,
    ledger::Ledger,
    referral::BindOutcome,
    storage::{CreditResult, LedgerStorage},
};

use super::{ApiError, GatewayAuth};

pub async fn credit_video_watch<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    body: Json<CreditVideoWatchRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let result = ledger
        .credit_video_watch(
            &request.user_id,
            &request.video_id,
            &request.investment_id,
            request.amount,
        )
        .await?;

    let response = match result {
        CreditResult::Applied { investment, reward } => CreditVideoWatchResponse::Credited {
            reward,
            investment: ledger.summarize(&investment),
        },
        CreditResult::AlreadyApplied { investment, reward } => {
            CreditVideoWatchResponse::AlreadyCredited {
                reward,
                investment: ledger.summarize(&investment),
            }
        }
    };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn submit_withdrawal<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    body: Json<SubmitWithdrawalRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let (withdrawal, investment) = ledger
        .submit_withdrawal(&request.investment_id, request.amount, request.account_details)
        .await?;

    Ok(HttpResponse::Ok().json(WithdrawalResponse {
        withdrawal,
        investment: ledger.summarize(&investment),
    }))
}

pub async fn decide_withdrawal<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<WithdrawalId>,
    body: Json<DecideWithdrawalRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let outcome = ledger
        .decide_withdrawal(&path.into_inner(), request.decision, request.reason)
        .await?;

    Ok(HttpResponse::Ok().json(DecideWithdrawalResponse {
        investment: ledger.summarize(&outcome.investment),
        withdrawal: outcome.withdrawal,
        payout: outcome.payout,
    }))
}

/// Signed gateway callback settling or rejecting an approved withdrawal.
///
/// The signature covers the raw body bytes, so the body is read before any
/// deserialization. A bad or stale signature is a 401 and never reaches the
/// ledger.
pub async fn payout_callback<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    auth: Data<GatewayAuth>,
    request: HttpRequest,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let Some(timestamp) = header_value(&request, PAYOUT_TIMESTAMP_HEADER)
        .and_then(|value| value.parse::<u64>().ok())
    else {
        return Ok(unauthorized("missing_timestamp", "Missing or invalid timestamp header"));
    };
    let Some(signature) = header_value(&request, PAYOUT_SIGNATURE_HEADER) else {
        return Ok(unauthorized("missing_signature", "Missing signature header"));
    };
    let Ok(raw) = std::str::from_utf8(&body) else {
        return Ok(unauthorized("invalid_signature", "Body is not valid UTF-8"));
    };

    if !verify_payout_signature(auth.secret(), timestamp, raw, signature) {
        warn!("Rejected payout callback with invalid signature");
        return Ok(unauthorized("invalid_signature", "Signature verification failed"));
    }

    let callback: PayoutCallback = match serde_json::from_str(raw) {
        Ok(callback) => callback,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(ErrorResponse {
                code: "invalid_body".to_string(),
                message: format!("Invalid callback body: {}", e),
            }))
        }
    };

    let (withdrawal, investment) = ledger.apply_payout_callback(&callback).await?;
    Ok(HttpResponse::Ok().json(WithdrawalResponse {
        withdrawal,
        investment: ledger.summarize(&investment),
    }))
}

pub async fn activate_investment<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    body: Json<ActivateInvestmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let outcome = ledger
        .activate_investment(
            &request.investment_id,
            &request.user_id,
            request.plan_level,
            request.amount_invested,
        )
        .await?;

    let response = match outcome {
        ActivateOutcome::Activated(investment) => ActivateInvestmentResponse::Activated {
            investment: ledger.summarize(&investment),
        },
        ActivateOutcome::AlreadyActivated(investment) => {
            ActivateInvestmentResponse::AlreadyActivated {
                investment: ledger.summarize(&investment),
            }
        }
    };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn set_investment_status<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<InvestmentId>,
    body: Json<SetInvestmentStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let investment = ledger
        .set_investment_status(&path.into_inner(), body.into_inner().status)
        .await?;
    Ok(HttpResponse::Ok().json(ledger.summarize(&investment)))
}

pub async fn bind_referrer<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    body: Json<BindReferrerRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let outcome = ledger
        .bind_referrer(&request.user_id, &request.referrer_id)
        .await?;

    let response = match outcome {
        BindOutcome::Bound(binding) => BindReferrerResponse::Bound { binding },
        BindOutcome::AlreadyBound(binding) => BindReferrerResponse::AlreadyBound { binding },
    };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn get_investment<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<InvestmentId>,
) -> Result<HttpResponse, ApiError> {
    let investment = ledger.get_investment(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ledger.summarize(&investment)))
}

pub async fn get_user_investments<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<UserId>,
) -> Result<HttpResponse, ApiError> {
    let investments = ledger.get_user_investments(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(InvestmentsResponse {
        investments: investments
            .iter()
            .map(|investment| ledger.summarize(investment))
            .collect(),
    }))
}

pub async fn daily_stats<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<UserId>,
) -> Result<HttpResponse, ApiError> {
    let stats = ledger.daily_stats(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Deserialize)]
pub struct RewardsQuery {
    /// Day index to narrow the history to, as carried in reward events
    day: Option<u32>,
}

pub async fn get_user_rewards<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<UserId>,
    query: Query<RewardsQuery>,
) -> Result<HttpResponse, ApiError> {
    let day = query.day.map(LedgerDay);
    let rewards = ledger.get_user_rewards(&path.into_inner(), day).await?;
    Ok(HttpResponse::Ok().json(RewardsResponse { rewards }))
}

pub async fn get_investment_withdrawals<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
    path: Path<InvestmentId>,
) -> Result<HttpResponse, ApiError> {
    let withdrawals = ledger
        .get_investment_withdrawals(&path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(WithdrawalsResponse { withdrawals }))
}

/// Operator view of the review queue.
pub async fn get_pending_withdrawals<S: LedgerStorage>(
    ledger: Data<Ledger<S>>,
) -> Result<HttpResponse, ApiError> {
    let withdrawals = ledger.storage().get_pending_withdrawals().await?;
    Ok(HttpResponse::Ok().json(WithdrawalsResponse { withdrawals }))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::default())
}

fn header_value<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

fn unauthorized(code: &str, message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(ErrorResponse {
        code: code.to_string(),
        message: message.to_string(),
    })
}
