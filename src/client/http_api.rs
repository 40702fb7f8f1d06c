//! reqwest-backed checkout API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::client::flow::CheckoutApi;
use crate::client::models::{
    ClientError, ClientResult, DeleteReply, FinalizeReply, ParamsReply, ReceiptReply, SessionReply,
};
use crate::domain::checkout::CheckoutForm;
use crate::infrastructure::http::models::ErrorBody;

/// Talks to the checkout endpoints; the session cookie lives in the client's cookie store
#[derive(Clone)]
pub struct HttpCheckoutApi {
    client: Client,
    base_url: String,
}

impl HttpCheckoutApi {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/checkout/{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await?;
        debug!(%status, body = %body, "Checkout endpoint returned an error");
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(error) => Err(ClientError::Rejected(error)),
            Err(_) if status == StatusCode::SERVICE_UNAVAILABLE => Err(ClientError::Unavailable),
            Err(e) => Err(ClientError::Protocol(format!("{}: {}", status, e))),
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::read(response).await
    }
}

#[async_trait]
impl CheckoutApi for HttpCheckoutApi {
    async fn params(&self) -> ClientResult<ParamsReply> {
        let response = self.client.get(self.url("params")).send().await?;
        Self::read(response).await
    }

    async fn create_session(&self, credential: &str, form: &CheckoutForm) -> ClientResult<SessionReply> {
        self.post("session", &json!({ "credential": credential, "form_data": form })).await
    }

    async fn finalize(&self, credential: &str, reference: &str, form: &CheckoutForm) -> ClientResult<FinalizeReply> {
        self.post(
            "finalize",
            &json!({ "credential": credential, "external_reference": reference, "form_data": form }),
        )
        .await
    }

    async fn delete(&self, credential: &str) -> ClientResult<DeleteReply> {
        self.post("delete", &json!({ "credential": credential })).await
    }

    async fn receipt(&self, credential: &str, reference: &str) -> ClientResult<ReceiptReply> {
        self.post("receipt", &json!({ "credential": credential, "reference": reference })).await
    }
}
