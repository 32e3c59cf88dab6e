// models/mpesa_callback.rs
use serde::Deserialize;
use serde_json::Value;

/// Result code used when the callback carries none; never a success.
pub const MISSING_RESULT_CODE: i64 = -1;

/// The two callback shapes Daraja is known to send. Both hold the result
/// object itself as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackPayload {
    /// `{"Body": {"stkCallback": {...}}}`
    Nested(Value),
    /// The result object at the top level.
    Flat(Value),
}

impl CallbackPayload {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok().map(Self::from_value)
    }

    pub fn from_value(body: Value) -> Self {
        match body.pointer("/Body/stkCallback") {
            Some(inner) if inner.is_object() => CallbackPayload::Nested(inner.clone()),
            _ => CallbackPayload::Flat(body),
        }
    }

    pub fn raw(&self) -> &Value {
        match self {
            CallbackPayload::Nested(raw) | CallbackPayload::Flat(raw) => raw,
        }
    }

    /// Each field is read on its own, so one badly typed field never hides
    /// the request id or the result code. Unrecognised shapes read as a
    /// failure with no request id.
    pub fn result(&self) -> StkCallback {
        StkCallback::from_value(self.raw())
    }
}

#[derive(Debug, Default)]
pub struct StkCallback {
    pub checkout_request_id: Option<String>,
    pub result_code: Option<Value>,
    pub result_desc: Option<String>,
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value", default)]
    pub value: Value,
}

impl StkCallback {
    pub fn from_value(raw: &Value) -> Self {
        StkCallback {
            checkout_request_id: field(raw, &["CheckoutRequestID", "checkoutRequestID"])
                .and_then(Value::as_str)
                .map(str::to_string),
            result_code: field(raw, &["ResultCode", "resultCode"]).cloned(),
            result_desc: field(raw, &["ResultDesc", "resultDesc"])
                .and_then(Value::as_str)
                .map(str::to_string),
            items: metadata_items(raw),
        }
    }

    pub fn checkout_request_id(&self) -> Option<&str> {
        self.checkout_request_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn result_code(&self) -> i64 {
        match &self.result_code {
            None | Some(Value::Null) => MISSING_RESULT_CODE,
            Some(code) => code.as_i64().unwrap_or(MISSING_RESULT_CODE),
        }
    }

    /// Only the integer `0` counts; `"0"` does not.
    pub fn is_success(&self) -> bool {
        matches!(&self.result_code, Some(Value::Number(n)) if n.as_i64() == Some(0))
    }

    /// Looks up a metadata item by name. Empty values (null, `""`, `0`,
    /// `false`) are treated as absent.
    pub fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.value)
            .filter(|value| !is_blank(value))
    }

    pub fn metadata_text(&self, name: &str) -> Option<String> {
        self.metadata_value(name).map(value_to_text)
    }
}

fn field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| raw.get(*name))
}

/// Items without a string `Name` are skipped; a missing or non-array
/// `Item` list reads as empty.
fn metadata_items(raw: &Value) -> Vec<CallbackItem> {
    raw.pointer("/CallbackMetadata/Item")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
