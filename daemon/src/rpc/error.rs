use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sika_common::{api::ErrorResponse, error::LedgerError};
use std::fmt::{Display, Formatter};

/// HTTP-facing wrapper around [`LedgerError`].
///
/// Every taxonomy error maps to a status code and a stable machine code;
/// no storage or serde detail ever reaches a client verbatim.
#[derive(Debug)]
pub struct ApiError(LedgerError);

impl ApiError {
    /// Stable machine-readable code carried in the JSON body.
    pub fn code(&self) -> &'static str {
        match &self.0 {
            LedgerError::InvestmentNotFound(_) => "investment_not_found",
            LedgerError::WithdrawalNotFound(_) => "withdrawal_not_found",
            LedgerError::ReservationNotFound(_) => "reservation_not_found",
            LedgerError::InvestmentNotActive { .. } => "investment_not_active",
            LedgerError::InvalidTransition { .. } => "invalid_transition",
            LedgerError::InvalidInvestmentTransition { .. } => "invalid_investment_transition",
            LedgerError::ReservationClosed { .. } => "reservation_closed",
            LedgerError::QuotaExceeded { .. } => "quota_exceeded",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::NonPositiveAmount => "non_positive_amount",
            LedgerError::InvalidAccountDetails(_) => "invalid_account_details",
            LedgerError::UnknownPlanLevel(_) => "unknown_plan_level",
            LedgerError::BelowPlanMinimum { .. } => "below_plan_minimum",
            LedgerError::AlreadyBound => "already_bound",
            LedgerError::SelfReferral => "self_referral",
            LedgerError::NoActiveInvestment(_) => "no_active_investment",
            LedgerError::BalanceOverflow(_) => "balance_overflow",
            LedgerError::Storage(_) => "storage_unavailable",
        }
    }

    pub fn inner(&self) -> &LedgerError {
        &self.0
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        Self(error)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            LedgerError::InvestmentNotFound(_)
            | LedgerError::WithdrawalNotFound(_)
            | LedgerError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::InvestmentNotActive { .. }
            | LedgerError::InvalidTransition { .. }
            | LedgerError::InvalidInvestmentTransition { .. }
            | LedgerError::ReservationClosed { .. }
            | LedgerError::AlreadyBound
            | LedgerError::SelfReferral
            | LedgerError::NoActiveInvestment(_) => StatusCode::CONFLICT,
            LedgerError::InvalidAmount(_)
            | LedgerError::NonPositiveAmount
            | LedgerError::InvalidAccountDetails(_)
            | LedgerError::UnknownPlanLevel(_)
            | LedgerError::BelowPlanMinimum { .. } => StatusCode::BAD_REQUEST,
            LedgerError::QuotaExceeded { .. } | LedgerError::InsufficientBalance { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LedgerError::BalanceOverflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // The only retryable class; clients may back off and resend
            LedgerError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            code: self.code().to_string(),
            message: self.0.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sika_common::{ids::Id, time::LedgerDay};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(LedgerError::InvestmentNotFound(Id::random())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LedgerError::QuotaExceeded {
                limit: 5,
                day: LedgerDay(20_000)
            })
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(LedgerError::SelfReferral).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LedgerError::Storage("io".to_string())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_machine_codes_are_snake_case() {
        let error = ApiError::from(LedgerError::NonPositiveAmount);
        assert_eq!(error.code(), "non_positive_amount");
        assert!(error
            .code()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '_'));
    }
}
