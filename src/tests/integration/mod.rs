//! HTTP round trips through the assembled warp routes, plus the storefront
//! flow controller driven against a live coordinator.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::{Filter, Reply};

use crate::application::services::checkout_service::CheckoutFailure;
use crate::client::flow::{CheckoutApi, CheckoutFlowController, CheckoutUi, FlowState, PaymentWidget};
use crate::client::models::{
    ClientError, ClientResult, DeleteReply, FinalizeReply, ParamsReply, ReceiptReply, SessionReply, WidgetSession,
};
use crate::config::AppConfig;
use crate::domain::checkout::CheckoutForm;
use crate::infrastructure::adapters::OrderRepository;
use crate::infrastructure::http::models::ErrorBody;
use crate::infrastructure::http::routes::RouteBuilder;
use crate::tests::fixtures::{self, cart_with_prices, valid_form, Harness};

const COOKIE: &str = "checkout_session=int-session";

fn routes_for(h: &Harness) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    RouteBuilder::build_routes(&h.config, h.coordinator.clone())
}

async fn post<F>(route: &F, path: &str, body: Value) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let res = warp::test::request()
        .method("POST")
        .path(path)
        .header("cookie", COOKIE)
        .json(&body)
        .reply(route)
        .await;
    (res.status(), serde_json::from_slice(res.body()).unwrap_or(Value::Null))
}

async fn params<F>(route: &F) -> Value
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let res = warp::test::request()
        .method("GET")
        .path("/checkout/params")
        .header("cookie", COOKIE)
        .reply(route)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn test_params_sets_session_cookie() {
    let h = fixtures::harness(fixtures::test_config(true));
    let route = routes_for(&h);

    let res = warp::test::request().method("GET").path("/checkout/params").reply(&route).await;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("checkout_session="));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["popup_timeout_ms"], 3_600_000);
    assert_eq!(body["storefront_path"], "shop.test.onfastspring.com/popup-shop");
    assert_eq!(body["test_mode"], true);
    assert_eq!(body["available"], true);
    assert!(body["session_credential"].as_str().is_some_and(|c| !c.is_empty()));
    assert!(body.get("session_id").is_none());
}

#[tokio::test]
async fn test_params_keeps_existing_cookie() {
    let h = fixtures::harness(fixtures::test_config(true));
    let route = routes_for(&h);

    let res = warp::test::request()
        .method("GET")
        .path("/checkout/params")
        .header("cookie", COOKIE)
        .reply(&route)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("set-cookie").is_none());
    assert!(h.sessions.get("int-session").await.unwrap().is_some());
}

#[tokio::test]
async fn test_checkout_round_trip_over_http() {
    let h = fixtures::harness(fixtures::test_config(true));
    h.carts.put("int-session", cart_with_prices(&[dec!(25), dec!(75)])).await;
    let route = routes_for(&h);

    let credential = params(&route).await["session_credential"].as_str().unwrap().to_string();

    let (status, session) = post(
        &route,
        "/checkout/session",
        json!({ "credential": credential, "form_data": valid_form() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{session}");
    assert_eq!(session["result"], "success");
    assert_eq!(session["session"]["key"], "");
    assert_eq!(session["session"]["payload"]["items"].as_array().unwrap().len(), 2);
    let order_id = session["temp_order_data"]["temp_order_id"].as_u64().unwrap();
    assert_eq!(session["session"]["payload"]["tags"]["store_order_id"], order_id);

    let (status, finalized) = post(
        &route,
        "/checkout/finalize",
        json!({
            "credential": session["temp_order_data"]["finalize_credential"],
            "external_reference": "FS-HTTP-1",
            "form_data": valid_form(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{finalized}");
    assert_eq!(finalized["order_id"], order_id);

    let (status, receipt) = post(
        &route,
        "/checkout/receipt",
        json!({ "credential": finalized["receipt_credential"], "reference": "FS-HTTP-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["redirect_url"], format!("/checkout/order-received/{order_id}"));
}

#[tokio::test]
async fn test_invalid_credential_is_uniform() {
    let h = fixtures::harness(fixtures::test_config(true));
    h.carts.put("int-session", cart_with_prices(&[dec!(10)])).await;
    let route = routes_for(&h);

    let (status, body) = post(
        &route,
        "/checkout/session",
        json!({ "credential": "not-a-token", "form_data": valid_form() }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["result"], "error");
    assert_eq!(body["type"], "invalid");
    assert_eq!(body["messages"], json!(["Invalid request"]));
    assert_eq!(body["refresh"], true);
    assert!(body["session_credential"].as_str().is_some());

    let (status, _) = post(&route, "/checkout/delete", json!({ "credential": "not-a-token" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_session_cookie_is_rejected() {
    let h = fixtures::harness(fixtures::test_config(true));
    let route = routes_for(&h);

    let res = warp::test::request()
        .method("POST")
        .path("/checkout/delete")
        .json(&json!({ "credential": "x" }))
        .reply(&route)
        .await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: ErrorBody = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body.kind, "invalid");
    assert!(body.session_credential.is_none());
}

#[tokio::test]
async fn test_validation_errors_are_listed() {
    let h = fixtures::harness(fixtures::test_config(true));
    h.carts.put("int-session", cart_with_prices(&[dec!(10)])).await;
    let route = routes_for(&h);
    let credential = params(&route).await["session_credential"].clone();

    let mut form = valid_form();
    form.billing_first_name = None;
    let (status, body) = post(&route, "/checkout/session", json!({ "credential": credential, "form_data": form })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["type"], "validation");
    assert_eq!(body["messages"], json!(["Billing First name is a required field."]));
    assert_eq!(body["refresh"], false);
}

#[tokio::test]
async fn test_malformed_body_is_a_bad_request() {
    let h = fixtures::harness(fixtures::test_config(true));
    let route = routes_for(&h);

    let res = warp::test::request()
        .method("POST")
        .path("/checkout/session")
        .header("cookie", COOKIE)
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&route)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["type"], "bad_request");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let h = fixtures::harness(fixtures::test_config(true));
    let route = routes_for(&h);

    let res = warp::test::request().method("GET").path("/checkout/nope").reply(&route).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unavailable_gateway_returns_503() {
    let mut config = fixtures::test_config(true);
    config.gateway.enabled = false;
    let h = fixtures::harness(config);
    h.carts.put("int-session", cart_with_prices(&[dec!(10)])).await;
    let route = routes_for(&h);

    let body = params(&route).await;
    assert_eq!(body["available"], false);

    let (status, body) = post(
        &route,
        "/checkout/session",
        json!({ "credential": body["session_credential"], "form_data": valid_form() }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["type"], "unavailable");
}

#[tokio::test]
async fn test_rate_limit_per_client_ip() {
    let mut config: AppConfig = fixtures::test_config(true);
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_minute = 60;
    config.rate_limit.burst_size = 2;
    let h = fixtures::harness(config);
    let route = routes_for(&h);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let res = warp::test::request()
            .method("GET")
            .path("/checkout/params")
            .header("x-forwarded-for", "203.0.113.5")
            .reply(&route)
            .await;
        statuses.push(res.status());
    }
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);

    let other = warp::test::request()
        .method("GET")
        .path("/checkout/params")
        .header("x-forwarded-for", "203.0.113.6")
        .reply(&route)
        .await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_bypass_limit_when_untrusted() {
    let mut config: AppConfig = fixtures::test_config(true);
    config.server.trusted_proxy_headers.clear();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_minute = 60;
    config.rate_limit.burst_size = 2;
    let h = fixtures::harness(config);
    let route = routes_for(&h);

    let mut statuses = Vec::new();
    for i in 0..3 {
        let res = warp::test::request()
            .method("GET")
            .path("/checkout/params")
            .header("x-forwarded-for", format!("198.51.100.{i}"))
            .reply(&route)
            .await;
        statuses.push(res.status());
    }
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);
}

/// [`CheckoutApi`] that calls the coordinator in-process for one session
struct InProcessApi {
    harness: Harness,
    session_id: String,
}

fn convert<T: serde::Serialize, R: serde::de::DeserializeOwned>(value: &T) -> ClientResult<R> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|e| ClientError::Protocol(e.to_string()))
}

fn rejected(failure: CheckoutFailure) -> ClientError {
    ClientError::Rejected(ErrorBody::from(&failure))
}

#[async_trait]
impl CheckoutApi for InProcessApi {
    async fn params(&self) -> ClientResult<ParamsReply> {
        let params = self
            .harness
            .coordinator
            .issue_params(Some(&self.session_id))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        convert(&params)
    }

    async fn create_session(&self, credential: &str, form: &CheckoutForm) -> ClientResult<SessionReply> {
        let reply = self
            .harness
            .coordinator
            .create_or_update(&self.session_id, credential, form)
            .await
            .map_err(rejected)?;
        convert(&reply)
    }

    async fn finalize(&self, credential: &str, reference: &str, form: &CheckoutForm) -> ClientResult<FinalizeReply> {
        let reply = self
            .harness
            .coordinator
            .finalize(&self.session_id, credential, reference, form)
            .await
            .map_err(rejected)?;
        convert(&reply)
    }

    async fn delete(&self, credential: &str) -> ClientResult<DeleteReply> {
        let reply = self.harness.coordinator.delete(&self.session_id, credential).await.map_err(rejected)?;
        convert(&reply)
    }

    async fn receipt(&self, credential: &str, reference: &str) -> ClientResult<ReceiptReply> {
        let reply = self
            .harness
            .coordinator
            .get_receipt(&self.session_id, credential, reference)
            .await
            .map_err(rejected)?;
        convert(&reply)
    }
}

#[derive(Default)]
struct RecordingWidget {
    sessions: Mutex<Vec<WidgetSession>>,
}

impl PaymentWidget for RecordingWidget {
    fn launch(&self, session: &WidgetSession) -> ClientResult<()> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingUi {
    navigations: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl CheckoutUi for RecordingUi {
    fn set_busy(&self, _busy: bool) {}
    fn show_errors(&self, messages: &[String]) {
        self.errors.lock().unwrap().extend(messages.iter().cloned());
    }
    fn refresh_checkout(&self) {}
    fn reload(&self) {}
    fn navigate(&self, url: &str) {
        self.navigations.lock().unwrap().push(url.to_string());
    }
}

#[tokio::test]
async fn test_flow_controller_against_coordinator() {
    let harness = fixtures::harness(fixtures::test_config(true));
    harness.carts.put("shopper", cart_with_prices(&[dec!(19.99)])).await;
    let orders = harness.orders.clone();

    let api = Arc::new(InProcessApi { harness, session_id: "shopper".to_string() });
    let widget = Arc::new(RecordingWidget::default());
    let ui = Arc::new(RecordingUi::default());
    let flow = CheckoutFlowController::new(api, widget.clone(), ui.clone());

    let params = flow.bootstrap().await.unwrap();
    assert!(params.test_mode);

    assert!(flow.submit(valid_form()).await.unwrap());
    let order_id = match flow.state().await {
        FlowState::AwaitingPayment { order_id } => order_id,
        other => panic!("unexpected state {other:?}"),
    };
    let launched = widget.sessions.lock().unwrap()[0].clone();
    assert_eq!(launched.key, "");
    assert_eq!(launched.payload["items"][0]["pricing"]["price"]["USD"], json!(19.99));

    flow.on_widget_closed(Some("FS-FLOW-1".to_string())).await.unwrap();

    assert_eq!(
        *ui.navigations.lock().unwrap(),
        vec![format!("/checkout/order-received/{order_id}")]
    );
    assert!(ui.errors.lock().unwrap().is_empty());
    let order = orders.get(order_id).await.unwrap().unwrap();
    assert_eq!(order.external_reference.as_deref(), Some("FS-FLOW-1"));
}

#[tokio::test]
async fn test_flow_controller_surfaces_server_errors() {
    let harness = fixtures::harness(fixtures::test_config(true));
    let api = Arc::new(InProcessApi { harness, session_id: "empty-cart".to_string() });
    let ui = Arc::new(RecordingUi::default());
    let flow = CheckoutFlowController::new(api, Arc::new(RecordingWidget::default()), ui.clone());

    let err = flow.submit(valid_form()).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref body) if body.kind == "empty_cart"));
    assert_eq!(flow.state().await, FlowState::Idle);
    assert_eq!(
        *ui.errors.lock().unwrap(),
        vec!["Your cart is empty. Please add items to your cart before attempting to checkout.".to_string()]
    );
}
