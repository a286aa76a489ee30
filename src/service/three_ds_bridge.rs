use serde::Serialize;
use serde_json::{Map, Value};

pub const RESULT_MESSAGE_TYPE: &str = "POWERTRANZ_3DS_RESULT";

/// Classified PowerTranz callback, shared by the 3DS bridge and the hosted-page handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResult {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub success: bool,
    pub spi_token: Option<String>,
    pub iso_response_code: Option<String>,
    pub response_message: Option<String>,
    pub order_identifier: Option<String>,
    pub message: String,
}

/// Callbacks arrive as JSON or as a form post; either way the result may be wrapped in
/// a `Response` field holding a JSON string.
pub fn parse_callback_body(body: &[u8]) -> Value {
    let parsed = match serde_json::from_slice::<Value>(body) {
        Ok(v @ Value::Object(_)) => v,
        _ => {
            let map: Map<String, Value> = url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            Value::Object(map)
        }
    };
    unwrap_response(parsed)
}

pub fn unwrap_response(payload: Value) -> Value {
    let nested = match payload.get("Response") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).ok(),
        Some(inner) => Some(inner.clone()),
        None => None,
    };
    match nested {
        Some(inner @ Value::Object(_)) => inner,
        _ => payload,
    }
}

fn text(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Success is decided in order: the 3-D Secure risk block when present (`3D0`), then an
/// ISO code of `SP4`, otherwise failure with any reported errors as the reason.
pub fn classify(payload: &Value) -> CallbackResult {
    let iso_response_code = text(payload, "IsoResponseCode");
    let response_message = text(payload, "ResponseMessage");

    let (success, message) = if let Some(three_ds) = payload.pointer("/RiskManagement/ThreeDSecure") {
        let code = three_ds.get("ResponseCode").and_then(Value::as_str).unwrap_or_default();
        if code == "3D0" {
            (true, "3-D Secure authentication succeeded".to_string())
        } else {
            let reason = three_ds
                .get("CardholderInfo")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| response_message.clone())
                .unwrap_or_else(|| format!("3-D Secure authentication failed ({code})"));
            (false, reason)
        }
    } else if iso_response_code.as_deref() == Some("SP4") {
        (true, "3-D Secure authentication succeeded".to_string())
    } else if let Some(errors) = payload.get("Errors").and_then(Value::as_array) {
        let joined = errors
            .iter()
            .filter_map(|e| e.get("Message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; ");
        (false, if joined.is_empty() { "payment was not authenticated".to_string() } else { joined })
    } else {
        let reason = response_message
            .clone()
            .unwrap_or_else(|| "payment was not authenticated".to_string());
        (false, reason)
    };

    CallbackResult {
        kind: RESULT_MESSAGE_TYPE,
        success,
        spi_token: text(payload, "SpiToken"),
        iso_response_code,
        response_message,
        order_identifier: text(payload, "OrderIdentifier"),
        message,
    }
}

/// Self-posting page rendered inside the checkout iframe. The message is sent again
/// after 100ms in case the parent listener was not attached yet.
pub fn bridge_page(result: &CallbackResult, target_origin: &str) -> String {
    let payload = script_json(&serde_json::to_value(result).unwrap_or(Value::Null));
    let origin = script_json(&Value::String(target_origin.to_string()));
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Completing payment</title></head>
<body>
<p>Completing payment&hellip;</p>
<script>
(function () {{
  var result = {payload};
  var origin = {origin};
  function send() {{
    var target = window.parent && window.parent !== window ? window.parent : window.opener;
    if (target) {{ target.postMessage(result, origin); }}
  }}
  send();
  setTimeout(send, 100);
}})();
</script>
</body>
</html>"#
    )
}

// JSON inside a <script> block must not be able to close the tag.
fn script_json(v: &Value) -> String {
    v.to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
