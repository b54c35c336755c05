//! HTTP server setup and configuration

use std::net::SocketAddr;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::routes::create_router;
use crate::AppState;

/// Create the full application router with middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the API on localhost at the configured port
pub async fn start_server(state: AppState) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config().api_port));
    let app = create_app(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use dutchlend_core::{Address, AppConfig, AssetConfig, AssetKind};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::ManualClock;

    const T0: u64 = 1_700_000_000;

    fn hex(n: u64) -> String {
        Address::from_low_u64(n).to_hex()
    }

    fn test_state() -> (AppState, Arc<ManualClock>) {
        let mut config = AppConfig::default();
        config.protocol.auction_duration_secs = 8 * 3600;
        config.protocol.operator_treasury = Some(Address::from_low_u64(201));
        config.assets = vec![
            AssetConfig {
                address: Address::from_low_u64(0xa1),
                kind: AssetKind::Fungible,
                symbol: "COL".into(),
                custom_fee_bp: None,
            },
            AssetConfig {
                address: Address::from_low_u64(0xa2),
                kind: AssetKind::Fungible,
                symbol: "USDX".into(),
                custom_fee_bp: None,
            },
        ];
        let clock = Arc::new(ManualClock::new(T0));
        let state = AppState::with_clock(config, clock.clone()).unwrap();
        (state, clock)
    }

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = create_app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn fund(state: &AppState, asset: u64, account: u64, amount: &str) {
        let uri = format!("/vault/assets/{}/mint", hex(asset));
        let (status, _) = call(state, "POST", &uri, Some(json!({ "to": hex(account), "idOrAmount": amount }))).await;
        assert_eq!(status, StatusCode::OK);
        let uri = format!("/vault/assets/{}/approve", hex(asset));
        let (status, _) = call(state, "POST", &uri, Some(json!({ "owner": hex(account), "amount": amount }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    fn auction_body() -> Value {
        json!({
            "caller": hex(1),
            "durationDays": 30,
            "interestRateMin": 100,
            "interestRateMax": 1100,
            "collateral": { "kind": "fungible", "asset": hex(0xa1), "idOrAmount": "5000" },
            "debtAsset": hex(0xa2),
            "debtAmount": "1000000"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state();
        let (status, body) = call(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_parameters() {
        let (state, _) = test_state();
        let (status, body) = call(&state, "GET", "/parameters", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["auctionDurationSecs"], 28_800);
        assert_eq!(body["baseFeeBp"], 100);
        assert_eq!(body["operatorTreasury"], hex(201));
        assert!(body["operatorFeeBp"].is_null());
        assert_eq!(body["assets"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_auction_lifecycle_over_http() {
        let (state, clock) = test_state();
        fund(&state, 0xa1, 1, "5000").await;
        fund(&state, 0xa2, 1, "2000000").await;
        fund(&state, 0xa2, 2, "1000000").await;

        let (status, loan) = call(&state, "POST", "/auctions", Some(auction_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["id"], 0);
        assert_eq!(loan["state"], "auctionStarted");

        clock.advance(4 * 3600);
        let (_, rate) = call(&state, "GET", "/loans/0/rate", None).await;
        assert_eq!(rate["interestRate"], 600);

        let (status, loan) = call(&state, "POST", "/loans/0/accept", Some(json!({ "caller": hex(2) }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["state"], "issued");
        assert_eq!(loan["interestRate"], 600);
        assert_eq!(loan["totalDebt"], "1004931");

        let uri = format!("/vault/assets/{}/balances/{}", hex(0xa2), hex(1));
        let (_, balance) = call(&state, "GET", &uri, None).await;
        assert_eq!(balance["balance"], "2990000");

        let (_, counts) = call(&state, "GET", "/loans/count", None).await;
        assert_eq!(counts["activeAuctions"], 0);
        assert_eq!(counts["activeLoans"], 1);

        let uri = format!("/accounts/{}/loans", hex(2));
        let (_, page) = call(&state, "GET", &uri, None).await;
        assert_eq!(page["total"], 1);

        clock.advance(86_400);
        let (status, loan) = call(&state, "POST", "/loans/0/repay", Some(json!({ "caller": hex(1) }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["state"], "finished");

        let uri = format!("/vault/assets/{}/balances/{}", hex(0xa1), hex(1));
        let (_, balance) = call(&state, "GET", &uri, None).await;
        assert_eq!(balance["balance"], "5000");
    }

    #[tokio::test]
    async fn test_cancel_over_http() {
        let (state, _) = test_state();
        fund(&state, 0xa1, 1, "5000").await;
        call(&state, "POST", "/auctions", Some(auction_body())).await;

        let (status, body) = call(&state, "POST", "/loans/0/cancel", Some(json!({ "caller": hex(2) }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "auth_failed");

        let (status, loan) = call(&state, "POST", "/loans/0/cancel", Some(json!({ "caller": hex(1) }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["state"], "auctionCancelled");

        let uri = format!("/vault/assets/{}/balances/{}", hex(0xa1), hex(1));
        let (_, balance) = call(&state, "GET", &uri, None).await;
        assert_eq!(balance["balance"], "5000");
        let (_, counts) = call(&state, "GET", "/loans/count", None).await;
        assert_eq!(counts["activeAuctions"], 0);
        assert_eq!(counts["loans"], 1);
    }

    #[tokio::test]
    async fn test_ceiling_over_http() {
        let (state, clock) = test_state();
        fund(&state, 0xa1, 1, "5000").await;
        call(&state, "POST", "/auctions", Some(auction_body())).await;

        clock.advance(8 * 3600);
        let restart = T0 + 8 * 3600;
        let (status, loan) = call(&state, "POST", "/loans/0/ceiling", Some(json!({ "caller": hex(1), "newMax": 2000 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["interestRateMax"], 2000);
        assert_eq!(loan["interestRateMin"], 100);
        assert_eq!(loan["startTimestamp"], restart);

        let (_, rate) = call(&state, "GET", "/loans/0/rate", None).await;
        assert_eq!(rate["interestRate"], 100);
        let uri = format!("/loans/0/rate?at={}", restart + 4 * 3600);
        let (_, rate) = call(&state, "GET", &uri, None).await;
        assert_eq!(rate["interestRate"], 1050);
    }

    #[tokio::test]
    async fn test_liquidate_over_http() {
        let (state, clock) = test_state();
        fund(&state, 0xa1, 1, "5000").await;
        fund(&state, 0xa2, 2, "1000000").await;
        call(&state, "POST", "/auctions", Some(auction_body())).await;
        let (status, _) = call(&state, "POST", "/loans/0/accept", Some(json!({ "caller": hex(2) }))).await;
        assert_eq!(status, StatusCode::OK);

        clock.advance(30 * 86_400);
        let (status, body) = call(&state, "POST", "/loans/0/liquidate", Some(json!({ "caller": hex(3) }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "loan_still_active");

        clock.advance(1);
        let (status, loan) = call(&state, "POST", "/loans/0/liquidate", Some(json!({ "caller": hex(3) }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["state"], "liquidated");

        let uri = format!("/vault/assets/{}/balances/{}", hex(0xa1), hex(2));
        let (_, balance) = call(&state, "GET", &uri, None).await;
        assert_eq!(balance["balance"], "5000");
        let (_, counts) = call(&state, "GET", "/loans/count", None).await;
        assert_eq!(counts["activeLoans"], 0);
    }

    #[tokio::test]
    async fn test_mutations_read_clock_under_lock() {
        let (state, clock) = test_state();
        fund(&state, 0xa1, 1, "5000").await;
        fund(&state, 0xa2, 2, "1000000").await;
        call(&state, "POST", "/auctions", Some(auction_body())).await;

        let guard = state.protocol_mut().await;
        let pending = tokio::spawn({
            let state = state.clone();
            async move { call(&state, "POST", "/loans/0/accept", Some(json!({ "caller": hex(2) }))).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // the accept is parked on the lock; time moves before it gets in
        clock.advance(4 * 3600);
        drop(guard);

        let (status, loan) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["issuedTimestamp"], T0 + 4 * 3600);
        assert_eq!(loan["interestRate"], 600);
    }

    #[tokio::test]
    async fn test_errors_map_to_status_codes() {
        let (state, _) = test_state();
        fund(&state, 0xa1, 1, "5000").await;

        let (status, body) = call(&state, "GET", "/loans/9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "invalid_loan_id");

        let mut bad = auction_body();
        bad["durationDays"] = json!(0);
        let (status, body) = call(&state, "POST", "/auctions", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_loan_duration");

        let mut bad = auction_body();
        bad["debtAmount"] = json!("lots");
        let (status, body) = call(&state, "POST", "/auctions", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_amount");

        call(&state, "POST", "/auctions", Some(auction_body())).await;
        let (status, body) = call(&state, "POST", "/loans/0/accept", Some(json!({ "caller": hex(1) }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "own_auction");

        let (status, body) = call(&state, "POST", "/loans/0/ceiling", Some(json!({ "caller": hex(1), "newMax": 2000 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "too_early_update");

        let (status, body) = call(&state, "POST", "/loans/0/accept", Some(json!({ "caller": hex(2) }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "insufficient_allowance");
    }

    #[tokio::test]
    async fn test_vault_unknown_asset() {
        let (state, _) = test_state();
        let uri = format!("/vault/assets/{}/balances/{}", hex(0xff), hex(1));
        let (status, body) = call(&state, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "unknown_asset");
    }
}
