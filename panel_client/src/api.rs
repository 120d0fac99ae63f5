use std::{collections::BTreeMap, sync::Arc};

use log::*;
use reqwest::Client;
use serde_json::Value;

use crate::{
    data_objects::{loose_money, loose_string, CancelOutcome, OrderParams, PanelBalance, PlacedOrder, RawService, RemoteOrderStatus},
    PanelApiError,
    PanelConfig,
};

/// One connection to one upstream panel.
///
/// All operations are a single synchronous call: serialize an action name plus parameters as a form-encoded POST,
/// parse the response as JSON, and inspect it for a provider-reported `error` field. There are no retries here; retry
/// policy belongs to the background job layer, and synchronous order placement is one attempt, fail fast.
#[derive(Clone)]
pub struct PanelApi {
    config: PanelConfig,
    client: Arc<Client>,
}

impl PanelApi {
    pub fn new(config: PanelConfig) -> Result<Self, PanelApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            // the legacy panels routinely run with broken TLS chains
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| PanelApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Sends one `action` request and returns the parsed JSON body.
    ///
    /// The API key is injected into every request. Any transport failure (non-2xx, timeout, malformed body) and any
    /// provider-reported `error` payload surface as a [`PanelApiError`].
    pub async fn request(&self, action: &str, params: &[(String, String)]) -> Result<Value, PanelApiError> {
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        form.push(("key", self.config.api_key.reveal().as_str()));
        form.push(("action", action));
        for (k, v) in params {
            form.push((k.as_str(), v.as_str()));
        }
        trace!("Sending '{action}' request to {}", self.config.api_url);
        let response = self
            .client
            .post(&self.config.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PanelApiError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PanelApiError::RequestFailed { status: status.as_u16(), message });
        }
        let body = response.json::<Value>().await.map_err(|e| PanelApiError::Json(e.to_string()))?;
        if let Some(message) = extract_error(&body) {
            return Err(PanelApiError::Upstream(message));
        }
        Ok(body)
    }

    /// Fetches the full live service list (`action=services`).
    pub async fn list_services(&self) -> Result<Vec<RawService>, PanelApiError> {
        let body = self.request("services", &[]).await?;
        let records = body
            .as_array()
            .ok_or_else(|| PanelApiError::Json("expected a list of services".to_string()))?;
        debug!("Fetched {} service records from {}", records.len(), self.config.api_url);
        Ok(records.iter().cloned().map(RawService::new).collect())
    }

    /// Fetches the provider account balance (`action=balance`).
    ///
    /// A response without a parseable `balance` field is an upstream error; there is deliberately no fallback to
    /// other fields.
    pub async fn balance(&self) -> Result<PanelBalance, PanelApiError> {
        let body = self.request("balance", &[]).await?;
        let balance = body
            .get("balance")
            .and_then(loose_money)
            .ok_or_else(|| PanelApiError::Upstream("balance response has no balance field".to_string()))?;
        let currency = body.get("currency").and_then(loose_string).unwrap_or_else(|| "USD".to_string());
        Ok(PanelBalance { balance, currency })
    }

    /// Places one order (`action=add`) and returns the provider-assigned order id.
    pub async fn place_order(&self, params: &OrderParams) -> Result<PlacedOrder, PanelApiError> {
        let body = self.request("add", &params.to_form()).await?;
        let order_id = body
            .get("order")
            .and_then(loose_string)
            .ok_or_else(|| PanelApiError::Upstream("add response has no order id".to_string()))?;
        debug!("Panel accepted order for service {}: provider order id {order_id}", params.service());
        Ok(PlacedOrder { order_id, raw: body })
    }

    /// Fetches the status of a single order (`action=status`).
    pub async fn order_status(&self, provider_order_id: &str) -> Result<RemoteOrderStatus, PanelApiError> {
        let body = self.request("status", &[("order".to_string(), provider_order_id.to_string())]).await?;
        Ok(RemoteOrderStatus::from_value(&body))
    }

    /// Fetches the status of several orders in one call. Upstream reports per-order errors inside the map, so each
    /// entry resolves independently.
    pub async fn orders_status(
        &self,
        provider_order_ids: &[&str],
    ) -> Result<BTreeMap<String, Result<RemoteOrderStatus, String>>, PanelApiError> {
        let ids = provider_order_ids.join(",");
        let body = self.request("status", &[("orders".to_string(), ids)]).await?;
        let map = body.as_object().ok_or_else(|| PanelApiError::Json("expected a status map".to_string()))?;
        let mut result = BTreeMap::new();
        for (order_id, entry) in map {
            let outcome = match extract_error(entry) {
                Some(message) => Err(message),
                None => Ok(RemoteOrderStatus::from_value(entry)),
            };
            result.insert(order_id.clone(), outcome);
        }
        Ok(result)
    }

    /// Requests a refill for one order (`action=refill`). Returns the provider's refill id.
    pub async fn refill(&self, provider_order_id: &str) -> Result<String, PanelApiError> {
        let body = self.request("refill", &[("order".to_string(), provider_order_id.to_string())]).await?;
        body.get("refill")
            .and_then(loose_string)
            .ok_or_else(|| PanelApiError::Upstream("refill response has no refill id".to_string()))
    }

    /// Fetches the status of a refill (`action=refill_status`).
    pub async fn refill_status(&self, refill_id: &str) -> Result<String, PanelApiError> {
        let body = self.request("refill_status", &[("refill".to_string(), refill_id.to_string())]).await?;
        body.get("status")
            .and_then(loose_string)
            .ok_or_else(|| PanelApiError::Upstream("refill_status response has no status".to_string()))
    }

    /// Cancels a batch of orders (`action=cancel`). Panels answer with one entry per order.
    pub async fn cancel_orders(&self, provider_order_ids: &[&str]) -> Result<Vec<CancelOutcome>, PanelApiError> {
        let ids = provider_order_ids.join(",");
        let body = self.request("cancel", &[("orders".to_string(), ids)]).await?;
        let entries = body.as_array().ok_or_else(|| PanelApiError::Json("expected a list of cancel results".to_string()))?;
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let order_id = entry.get("order").and_then(loose_string).unwrap_or_default();
            let result = match entry.get("cancel").map(extract_error) {
                Some(Some(message)) => Err(message),
                _ => match extract_error(entry) {
                    Some(message) => Err(message),
                    None => Ok(()),
                },
            };
            outcomes.push(CancelOutcome { order_id, result });
        }
        Ok(outcomes)
    }
}

/// Pulls a provider-reported error message out of a response body, whether the body is an object or a map entry.
fn extract_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_envelope_variants() {
        assert_eq!(extract_error(&json!({"error": "Incorrect API key"})).as_deref(), Some("Incorrect API key"));
        assert_eq!(
            extract_error(&json!({"error": {"message": "not enough funds"}})).as_deref(),
            Some(r#"{"message":"not enough funds"}"#)
        );
        assert_eq!(extract_error(&json!({"error": null})), None);
        assert_eq!(extract_error(&json!({"order": 12345})), None);
        assert_eq!(extract_error(&json!([1, 2, 3])), None);
    }
}
