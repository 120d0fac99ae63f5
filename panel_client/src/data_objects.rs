use serde::Serialize;
use serde_json::Value;
use smm_common::Money;

/// Extracts a string from a JSON value that may be a string or a bare number.
pub(crate) fn loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a currency amount from a JSON value that panels may encode as a string or a number.
/// "Rate returned as a string" is the norm for this protocol, not the exception.
pub(crate) fn loose_money(value: &Value) -> Option<Money> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Money::from_units(i))
            } else {
                n.as_f64().and_then(|f| Money::try_from_f64(f).ok())
            }
        },
        _ => None,
    }
}

pub(crate) fn loose_i64(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

//--------------------------------------    RawService     -----------------------------------------------------------
/// One service record exactly as the panel returned it, with typed accessors over the known field variants.
///
/// The full raw payload is retained so the catalog can store it as forward-compatible metadata.
#[derive(Debug, Clone)]
pub struct RawService {
    raw: Value,
}

impl RawService {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// The provider-native service id: the first non-empty of the `service` and `id` fields.
    pub fn service_id(&self) -> Option<String> {
        self.raw.get("service").and_then(loose_string).or_else(|| self.raw.get("id").and_then(loose_string))
    }

    pub fn name(&self) -> String {
        self.raw.get("name").and_then(loose_string).unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn service_type(&self) -> String {
        self.raw.get("type").and_then(loose_string).unwrap_or_else(|| "default".to_string())
    }

    pub fn category(&self) -> Option<String> {
        self.raw.get("category").and_then(loose_string)
    }

    /// The provider's raw per-1000 rate. Missing or unparseable rates read as zero, matching the upstream convention.
    pub fn rate(&self) -> Money {
        self.raw.get("rate").and_then(loose_money).unwrap_or(Money::ZERO)
    }

    pub fn min(&self) -> Option<i64> {
        self.raw.get("min").and_then(loose_i64)
    }

    pub fn max(&self) -> Option<i64> {
        self.raw.get("max").and_then(loose_i64)
    }

    pub fn description(&self) -> Option<String> {
        self.raw.get("description").and_then(loose_string)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}

//--------------------------------------   PanelBalance    -----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelBalance {
    pub balance: Money,
    pub currency: String,
}

//--------------------------------------    PlacedOrder    -----------------------------------------------------------
/// The result of a successful `add` call: the provider-assigned order id plus the raw response for the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: String,
    pub raw: Value,
}

//--------------------------------------  RemoteOrderStatus ----------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoteOrderStatus {
    pub charge: Option<Money>,
    pub start_count: Option<i64>,
    pub status: Option<String>,
    pub remains: Option<i64>,
    pub currency: Option<String>,
}

impl RemoteOrderStatus {
    pub(crate) fn from_value(value: &Value) -> Self {
        Self {
            charge: value.get("charge").and_then(loose_money),
            start_count: value.get("start_count").and_then(loose_i64),
            status: value.get("status").and_then(loose_string),
            remains: value.get("remains").and_then(loose_i64),
            currency: value.get("currency").and_then(loose_string),
        }
    }
}

//--------------------------------------   CancelOutcome   -----------------------------------------------------------
/// Per-order result of a batch cancel. Panels report success and failure per entry, not per request.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub order_id: String,
    pub result: Result<(), String>,
}

//--------------------------------------    OrderParams    -----------------------------------------------------------
/// The form parameters for one `add` request.
///
/// The constructors for the specialized order sub-types (drip-feed, custom comments, polls, subscriptions and so on)
/// are pure parameter shaping over the same wire call; they carry no additional contract.
#[derive(Debug, Clone, Default)]
pub struct OrderParams {
    service: String,
    params: Vec<(String, String)>,
}

impl OrderParams {
    pub fn new<S: Into<String>>(service: S) -> Self {
        Self { service: service.into(), params: Vec::new() }
    }

    pub fn with_link<S: Into<String>>(self, link: S) -> Self {
        self.with_param("link", link)
    }

    pub fn with_quantity(self, quantity: i64) -> Self {
        self.with_param("quantity", quantity.to_string())
    }

    /// Drip-feed delivery: split the order into `runs` deliveries, `interval` minutes apart.
    pub fn drip_feed(self, runs: i64, interval: i64) -> Self {
        self.with_param("runs", runs.to_string()).with_param("interval", interval.to_string())
    }

    /// Custom comment list, one comment per line.
    pub fn custom_comments<S: Into<String>>(self, comments: S) -> Self {
        self.with_param("comments", comments)
    }

    /// Poll vote orders take the answer number to vote for.
    pub fn poll_answer<S: Into<String>>(self, answer_number: S) -> Self {
        self.with_param("answer_number", answer_number)
    }

    /// Subscription orders watch an account and order on new posts.
    pub fn subscription(self, username: &str, min: i64, max: i64, posts: i64, delay: i64, expiry: &str) -> Self {
        self.with_param("username", username)
            .with_param("min", min.to_string())
            .with_param("max", max.to_string())
            .with_param("posts", posts.to_string())
            .with_param("delay", delay.to_string())
            .with_param("expiry", expiry)
    }

    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::with_capacity(self.params.len() + 1);
        form.push(("service".to_string(), self.service.clone()));
        form.extend(self.params.iter().cloned());
        form
    }
}
