//! Loan and auction endpoints
//!
//! Mutating handlers read the clock only once they hold the protocol write
//! lock, so the timestamps of successive operations never run backwards.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use auction_lending::{
    calculate_apr_percent, CallContext, Collateral, LoanId, StartAuctionParams,
};

use super::{lending_failure, parse_address, parse_amount_field, ApiFailure};
use crate::dto::{
    CallerRequest, CeilingRequest, LoanCountResponse, LoanDto, LoanPageResponse, PageQuery,
    RateQuery, RateResponse, StartAuctionRequest,
};
use crate::state::Protocol;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiFailure>;

/// Create loan routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list_loans))
        .route("/loans/count", get(count_loans))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/rate", get(get_rate))
        .route("/loans/:id/cancel", post(cancel_auction))
        .route("/loans/:id/accept", post(accept))
        .route("/loans/:id/ceiling", post(update_ceiling))
        .route("/loans/:id/repay", post(repay))
        .route("/loans/:id/liquidate", post(liquidate))
        .route("/auctions", get(list_auctions).post(start_auction))
        .route("/active-loans", get(list_active_loans))
        .route("/accounts/:address/loans", get(list_account_loans))
}

fn loan_dto(protocol: &Protocol, id: LoanId) -> ApiResult<LoanDto> {
    let loan = protocol.loan(id).map_err(lending_failure)?;
    Ok(Json(LoanDto::from_loan(id, loan)))
}

/// GET /loans - Every loan ever created, in id order
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<LoanPageResponse> {
    let protocol = state.protocol().await;
    let page = protocol.loans(query.offset, query.clamped_limit());
    Json(LoanPageResponse::new(&page, &query, protocol.loans_count()))
}

/// GET /loans/count
pub async fn count_loans(State(state): State<AppState>) -> Json<LoanCountResponse> {
    let protocol = state.protocol().await;
    Json(LoanCountResponse {
        loans: protocol.loans_count(),
        active_auctions: protocol.active_auctions_count(),
        active_loans: protocol.active_loans_count(),
    })
}

/// GET /loans/:id
pub async fn get_loan(State(state): State<AppState>, Path(id): Path<LoanId>) -> ApiResult<LoanDto> {
    loan_dto(&*state.protocol().await, id)
}

/// GET /loans/:id/rate - Rate an accept would lock in, now or at `?at=`
pub async fn get_rate(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
    Query(query): Query<RateQuery>,
) -> ApiResult<RateResponse> {
    let protocol = state.protocol().await;
    let at = query.at.unwrap_or_else(|| state.now());
    let rate = protocol.current_rate(id, at).map_err(lending_failure)?;
    Ok(Json(RateResponse {
        loan_id: id,
        at,
        interest_rate: rate,
        apr_percent: calculate_apr_percent(rate),
    }))
}

/// GET /auctions - Open auctions
pub async fn list_auctions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<LoanPageResponse> {
    let protocol = state.protocol().await;
    let page = protocol.active_auctions(query.offset, query.clamped_limit());
    Json(LoanPageResponse::new(
        &page,
        &query,
        protocol.active_auctions_count(),
    ))
}

/// GET /active-loans - Funded, unsettled loans
pub async fn list_active_loans(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<LoanPageResponse> {
    let protocol = state.protocol().await;
    let page = protocol.active_loans(query.offset, query.clamped_limit());
    Json(LoanPageResponse::new(&page, &query, protocol.active_loans_count()))
}

/// GET /accounts/:address/loans - Loans an account borrowed or funded
pub async fn list_account_loans(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<LoanPageResponse> {
    let account = parse_address("address", &address)?;
    let protocol = state.protocol().await;
    let page = protocol.account_loans(&account, query.offset, query.clamped_limit());
    Ok(Json(LoanPageResponse::new(
        &page,
        &query,
        protocol.account_loans_count(&account),
    )))
}

/// POST /auctions - Lock collateral and open an auction
pub async fn start_auction(
    State(state): State<AppState>,
    Json(request): Json<StartAuctionRequest>,
) -> ApiResult<LoanDto> {
    let caller = parse_address("caller", &request.caller)?;
    let collateral = Collateral::new(
        request.collateral.kind,
        request.collateral.asset,
        parse_amount_field("collateral.idOrAmount", &request.collateral.id_or_amount)?,
    );
    let params = StartAuctionParams {
        duration_days: request.duration_days,
        interest_rate_min: request.interest_rate_min,
        interest_rate_max: request.interest_rate_max,
        collateral,
        debt_asset: parse_address("debtAsset", &request.debt_asset)?,
        debt_amount: parse_amount_field("debtAmount", &request.debt_amount)?,
    };

    let mut protocol = state.protocol_mut().await;
    let ctx = CallContext::new(caller, state.now());
    let id = protocol
        .start_auction(&ctx, params)
        .map_err(lending_failure)?;
    loan_dto(&protocol, id)
}

/// POST /loans/:id/cancel
pub async fn cancel_auction(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<LoanDto> {
    let caller = parse_address("caller", &request.caller)?;
    let mut protocol = state.protocol_mut().await;
    let ctx = CallContext::new(caller, state.now());
    protocol.cancel_auction(&ctx, id).map_err(lending_failure)?;
    loan_dto(&protocol, id)
}

/// POST /loans/:id/accept - Fund the auction at the current rate
pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<LoanDto> {
    let caller = parse_address("caller", &request.caller)?;
    let mut protocol = state.protocol_mut().await;
    let ctx = CallContext::new(caller, state.now());
    protocol.accept(&ctx, id).map_err(lending_failure)?;
    loan_dto(&protocol, id)
}

/// POST /loans/:id/ceiling - Raise the max rate after the window elapsed
pub async fn update_ceiling(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
    Json(request): Json<CeilingRequest>,
) -> ApiResult<LoanDto> {
    let caller = parse_address("caller", &request.caller)?;
    let mut protocol = state.protocol_mut().await;
    let ctx = CallContext::new(caller, state.now());
    protocol
        .update_interest_ceiling(&ctx, id, request.new_max)
        .map_err(lending_failure)?;
    loan_dto(&protocol, id)
}

/// POST /loans/:id/repay
pub async fn repay(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<LoanDto> {
    let caller = parse_address("caller", &request.caller)?;
    let mut protocol = state.protocol_mut().await;
    let ctx = CallContext::new(caller, state.now());
    protocol.repay(&ctx, id).map_err(lending_failure)?;
    loan_dto(&protocol, id)
}

/// POST /loans/:id/liquidate - Open to any caller once the loan is overdue
pub async fn liquidate(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult<LoanDto> {
    let caller = parse_address("caller", &request.caller)?;
    let mut protocol = state.protocol_mut().await;
    let ctx = CallContext::new(caller, state.now());
    protocol.liquidate(&ctx, id).map_err(lending_failure)?;
    loan_dto(&protocol, id)
}
