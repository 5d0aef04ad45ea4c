//! Record-store wire format.
//!
//! The store keeps one sheet per collection; cells arrive as strings or
//! numbers depending on how they were typed, so every inbound field is read
//! leniently into `Option<String>` and cleaned afterwards.

use crate::error::SyncError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Inbound rows ──────────────────────────────────────────────────────────────

fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAccountRow {
    #[serde(deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "text")]
    pub company: Option<String>,
    #[serde(deserialize_with = "text")]
    pub address: Option<String>,
    #[serde(deserialize_with = "text")]
    pub role: Option<String>,
    #[serde(deserialize_with = "text")]
    pub department: Option<String>,
    #[serde(deserialize_with = "text")]
    pub last_contacted: Option<String>,
    /// A JSON array, or a string holding one.
    pub notes: Option<Value>,
    #[serde(deserialize_with = "text")]
    pub grade: Option<String>,
    #[serde(deserialize_with = "text")]
    pub target_amount: Option<String>,
    #[serde(rename = "type", deserialize_with = "text")]
    pub account_type: Option<String>,
    #[serde(deserialize_with = "text")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "text")]
    pub owner_id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDealRow {
    #[serde(deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub title: Option<String>,
    /// Only read for legacy rows without a breakdown.
    #[serde(deserialize_with = "text")]
    pub value: Option<String>,
    #[serde(deserialize_with = "text")]
    pub product_amount: Option<String>,
    #[serde(deserialize_with = "text")]
    pub goods_amount: Option<String>,
    #[serde(deserialize_with = "text")]
    pub item_details: Option<String>,
    #[serde(deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "text")]
    pub stage: Option<String>,
    #[serde(deserialize_with = "text")]
    pub contact_id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub expected_close_date: Option<String>,
    #[serde(deserialize_with = "text")]
    pub probability: Option<String>,
    #[serde(deserialize_with = "text")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "text")]
    pub owner_id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub team: Option<String>,
    #[serde(deserialize_with = "text")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRepRow {
    #[serde(deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "text")]
    pub team: Option<String>,
    #[serde(deserialize_with = "text")]
    pub department: Option<String>,
    #[serde(deserialize_with = "text")]
    pub role: Option<String>,
    #[serde(deserialize_with = "text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "text")]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPayload {
    pub contacts: Option<Vec<RawAccountRow>>,
    pub deals: Option<Vec<RawDealRow>>,
    pub sales_reps: Option<Vec<RawRepRow>>,
}

/// Parse a `fetchAll` response. The store may double-encode the body as a
/// JSON string; both shapes are accepted.
pub fn parse_payload(body: &str) -> Result<RawPayload, SyncError> {
    let value: Value = serde_json::from_str(body.trim())
        .map_err(|e| SyncError::MalformedResponse(format!("response is not JSON: {}", e)))?;

    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner).map_err(|e| {
            SyncError::MalformedResponse(format!("embedded payload is not JSON: {}", e))
        })?,
        other => other,
    };

    if !value.is_object() {
        return Err(SyncError::MalformedResponse(format!(
            "expected an object with contacts/deals/salesReps, got {}",
            kind_of(&value)
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| SyncError::MalformedResponse(format!("unexpected payload shape: {}", e)))
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Outbound rows ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub company: &'a str,
    pub address: &'a str,
    pub role: &'a str,
    pub department: &'a str,
    pub last_contacted: String,
    /// String-encoded list.
    pub notes: String,
    pub grade: &'a str,
    pub target_amount: u64,
    #[serde(rename = "type")]
    pub account_type: &'a str,
    pub owner: &'a str,
    pub owner_id: &'a str,
    pub team: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRow<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub value: u64,
    pub product_amount: u64,
    pub goods_amount: u64,
    pub item_details: &'a str,
    pub status: &'a str,
    pub stage: &'a str,
    pub contact_id: &'a str,
    pub expected_close_date: String,
    pub probability: u8,
    pub owner: &'a str,
    pub owner_id: &'a str,
    pub team: &'a str,
    pub department: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub team: &'a str,
    pub department: &'a str,
    pub role: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
}

/// Body of a `replaceCollection` request.
#[derive(Debug, Serialize)]
pub struct SaveRequest {
    pub action: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "jsonData")]
    pub json_data: String,
}

impl SaveRequest {
    pub fn new<T: Serialize>(kind: &'static str, rows: &[T]) -> serde_json::Result<Self> {
        Ok(Self {
            action: "saveCRMData",
            kind,
            json_data: serde_json::to_string(rows)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_double_encoded() {
        let body = r#"{"contacts":[{"id":"c1","targetAmount":120000000}],"deals":[],"salesReps":null}"#;
        let parsed = parse_payload(body).unwrap();
        let contacts = parsed.contacts.unwrap();
        assert_eq!(contacts[0].target_amount.as_deref(), Some("120000000"));
        assert!(parsed.sales_reps.is_none());

        let wrapped = serde_json::to_string(body).unwrap();
        let parsed = parse_payload(&wrapped).unwrap();
        assert_eq!(parsed.contacts.unwrap()[0].id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_lenient_cells() {
        let body = r#"{"deals":[{"id":7,"productAmount":"1,000","probability":90.0,"stage":null}]}"#;
        let deals = parse_payload(body).unwrap().deals.unwrap();
        assert_eq!(deals[0].id.as_deref(), Some("7"));
        assert_eq!(deals[0].product_amount.as_deref(), Some("1,000"));
        assert_eq!(deals[0].probability.as_deref(), Some("90.0"));
        assert!(deals[0].stage.is_none());
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(parse_payload("<html>"), Err(SyncError::MalformedResponse(_))));
        assert!(matches!(parse_payload("[1,2]"), Err(SyncError::MalformedResponse(_))));
        assert!(matches!(
            parse_payload(r#"{"contacts":"oops"}"#),
            Err(SyncError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_save_request_encodes_rows_as_string() {
        let rows = vec![RepRow {
            id: "s1",
            name: "Hong",
            team: "T1",
            department: "",
            role: "staff",
            email: "hong@example.com",
            phone: "",
        }];
        let req = SaveRequest::new("salesReps", &rows).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "saveCRMData");
        assert_eq!(json["type"], "salesReps");
        assert!(json["jsonData"].as_str().unwrap().starts_with("[{\"id\":\"s1\""));
    }
}
