use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ComplianceError;
use crate::verdict::{ComplianceType, ComplianceVerdict};

pub const ACCOUNT_RESOURCE_TYPE: &str = "AWS::::Account";
pub const MISSING_RESULT_TOKEN: &str = "No token found.";
pub const ALLOWED_REGIONS_PARAMETER: &str = "allowed_regions";

/// Epoch numbers at or above this magnitude are read as milliseconds,
/// smaller ones as seconds.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 100_000_000_000.0;
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Raw AWS Config custom rule event, as delivered to the Lambda function.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRuleEvent {
    #[serde(default)]
    pub invoking_event: Option<String>,
    #[serde(default)]
    pub rule_parameters: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub result_token: Option<String>,
}

/// The decoded `invokingEvent` payload.
///
/// `notificationCreationTime` may be an RFC 3339 string, an ISO 8601 string
/// without offset (read as UTC) or an epoch number.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvokingEvent {
    pub notification_creation_time: Value,
}

/// A config rule event whose nested payloads have been decoded.
///
/// `rule_parameters` stays an untyped object here; the evaluator owns the
/// check for required parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRuleInvocation {
    pub account_id: String,
    pub ordering_timestamp: DateTime<Utc>,
    pub rule_parameters: Map<String, Value>,
    pub result_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParameters {
    pub allowed_regions: Vec<String>,
}

impl RuleParameters {
    /// Reads `allowed_regions` from decoded rule parameters.
    ///
    /// Config rule parameter values arrive as strings, so besides a JSON array
    /// this accepts a string holding a JSON array or a comma-separated list.
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self, ComplianceError> {
        let raw = match parameters.get(ALLOWED_REGIONS_PARAMETER) {
            None | Some(Value::Null) => {
                return Err(ComplianceError::missing_parameter(ALLOWED_REGIONS_PARAMETER));
            }
            Some(value) => value,
        };

        let allowed_regions = match raw {
            Value::Array(items) => region_list_from_array(items)?,
            Value::String(text) => region_list_from_string(text)?,
            other => {
                return Err(ComplianceError::malformed_event(format!(
                    "{ALLOWED_REGIONS_PARAMETER} must be a list of region names, got {other}"
                )));
            }
        };

        Ok(Self { allowed_regions })
    }

    pub fn allows(&self, region: &str) -> bool {
        self.allowed_regions.iter().any(|allowed| allowed == region)
    }
}

/// The record submitted to AWS Config for one evaluation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EvaluationRecord {
    pub compliance_resource_type: String,
    pub compliance_resource_id: String,
    pub compliance_type: ComplianceType,
    pub annotation: String,
    pub ordering_timestamp: DateTime<Utc>,
    pub result_token: String,
}

impl EvaluationRecord {
    pub fn for_account(invocation: &ConfigRuleInvocation, verdict: &ComplianceVerdict) -> Self {
        Self {
            compliance_resource_type: ACCOUNT_RESOURCE_TYPE.to_string(),
            compliance_resource_id: invocation.account_id.clone(),
            compliance_type: verdict.compliance_type(),
            annotation: verdict.annotation(),
            ordering_timestamp: invocation.ordering_timestamp,
            result_token: invocation.result_token.clone(),
        }
    }
}

pub fn parse_config_rule_event(event: Value) -> Result<ConfigRuleInvocation, ComplianceError> {
    if !event.is_object() {
        return Err(ComplianceError::malformed_event(
            "event payload must be a JSON object",
        ));
    }

    let raw: ConfigRuleEvent = serde_json::from_value(event)
        .map_err(|error| ComplianceError::malformed_event(format!("invalid event: {error}")))?;

    let invoking_event_json = raw
        .invoking_event
        .ok_or_else(|| ComplianceError::malformed_event("invokingEvent is required"))?;
    let invoking_event: InvokingEvent =
        serde_json::from_str(&invoking_event_json).map_err(|error| {
            ComplianceError::malformed_event(format!("invokingEvent is not valid JSON: {error}"))
        })?;
    let ordering_timestamp = parse_notification_time(&invoking_event.notification_creation_time)?;

    let rule_parameters_json = raw
        .rule_parameters
        .ok_or_else(|| ComplianceError::malformed_event("ruleParameters is required"))?;
    let rule_parameters = parse_rule_parameters(&rule_parameters_json)?;

    let account_id = raw
        .account_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ComplianceError::malformed_event("accountId is required"))?;

    Ok(ConfigRuleInvocation {
        account_id,
        ordering_timestamp,
        rule_parameters,
        result_token: raw
            .result_token
            .unwrap_or_else(|| MISSING_RESULT_TOKEN.to_string()),
    })
}

pub fn parse_rule_parameters(payload: &str) -> Result<Map<String, Value>, ComplianceError> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(parameters)) => Ok(parameters),
        Ok(_) => Err(ComplianceError::malformed_event(
            "ruleParameters must be a JSON object",
        )),
        Err(error) => Err(ComplianceError::malformed_event(format!(
            "ruleParameters is not valid JSON: {error}"
        ))),
    }
}

fn parse_notification_time(value: &Value) -> Result<DateTime<Utc>, ComplianceError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64().and_then(timestamp_from_epoch),
        Value::String(text) => timestamp_from_text(text.trim()),
        _ => None,
    };

    parsed.ok_or_else(|| {
        ComplianceError::malformed_event(format!(
            "notificationCreationTime {value} is not a supported timestamp"
        ))
    })
}

fn timestamp_from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1_000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

fn timestamp_from_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|timestamp| timestamp.and_utc())
    })
}

fn region_list_from_array(items: &[Value]) -> Result<Vec<String>, ComplianceError> {
    let mut regions = Vec::with_capacity(items.len());
    for item in items {
        let Some(region) = item.as_str() else {
            return Err(ComplianceError::malformed_event(format!(
                "{ALLOWED_REGIONS_PARAMETER} entries must be strings, got {item}"
            )));
        };
        let region = region.trim();
        if !region.is_empty() {
            regions.push(region.to_string());
        }
    }
    Ok(regions)
}

fn region_list_from_string(text: &str) -> Result<Vec<String>, ComplianceError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed).map_err(|error| {
            ComplianceError::malformed_event(format!(
                "{ALLOWED_REGIONS_PARAMETER} is not a valid JSON list: {error}"
            ))
        })?;
        return region_list_from_array(&items);
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|region| !region.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_event() -> Value {
        json!({
            "invokingEvent": "{\"messageType\":\"ScheduledNotification\",\"notificationCreationTime\":\"2016-07-13T21:50:00.373Z\"}",
            "ruleParameters": "{\"allowed_regions\":[\"eu-west-1\"]}",
            "accountId": "123456789012",
            "resultToken": "token-1",
        })
    }

    fn invoking_event(notification_time: Value) -> Value {
        let payload = json!({ "notificationCreationTime": notification_time });
        Value::String(payload.to_string())
    }

    fn parameters(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object parameters")
    }

    #[test]
    fn parses_complete_event() {
        let invocation = parse_config_rule_event(sample_event()).expect("event should parse");

        assert_eq!(invocation.account_id, "123456789012");
        assert_eq!(invocation.result_token, "token-1");
        assert_eq!(
            invocation.ordering_timestamp.to_rfc3339(),
            "2016-07-13T21:50:00.373+00:00"
        );
        assert_eq!(
            invocation.rule_parameters.get("allowed_regions"),
            Some(&json!(["eu-west-1"]))
        );
    }

    #[test]
    fn falls_back_when_result_token_is_absent() {
        let mut event = sample_event();
        event
            .as_object_mut()
            .expect("object event")
            .remove("resultToken");

        let invocation = parse_config_rule_event(event).expect("event should parse");
        assert_eq!(invocation.result_token, MISSING_RESULT_TOKEN);
    }

    #[test]
    fn rejects_missing_or_invalid_nested_payloads() {
        let mut missing_invoking = sample_event();
        missing_invoking
            .as_object_mut()
            .expect("object event")
            .remove("invokingEvent");
        assert!(matches!(
            parse_config_rule_event(missing_invoking),
            Err(ComplianceError::MalformedEvent(_))
        ));

        let mut invalid_parameters = sample_event();
        invalid_parameters["ruleParameters"] = json!("{not json");
        assert!(matches!(
            parse_config_rule_event(invalid_parameters),
            Err(ComplianceError::MalformedEvent(_))
        ));

        let mut missing_parameters = sample_event();
        missing_parameters
            .as_object_mut()
            .expect("object event")
            .remove("ruleParameters");
        assert!(matches!(
            parse_config_rule_event(missing_parameters),
            Err(ComplianceError::MalformedEvent(_))
        ));
    }

    #[test]
    fn rejects_unparseable_notification_time() {
        for notification_time in [json!("yesterday"), json!(true), json!(null)] {
            let mut event = sample_event();
            event["invokingEvent"] = invoking_event(notification_time);

            let error = parse_config_rule_event(event).expect_err("event should fail");
            assert_eq!(error.error_code(), "malformed_event");
        }
    }

    fn ordering_timestamp_for(notification_time: Value) -> String {
        let mut event = sample_event();
        event["invokingEvent"] = invoking_event(notification_time);

        parse_config_rule_event(event)
            .expect("event should parse")
            .ordering_timestamp
            .to_rfc3339()
    }

    #[test]
    fn accepts_epoch_milliseconds_notification_time() {
        assert_eq!(
            ordering_timestamp_for(json!(1468446600373_i64)),
            "2016-07-13T21:50:00.373+00:00"
        );
    }

    #[test]
    fn accepts_epoch_seconds_notification_time() {
        assert_eq!(
            ordering_timestamp_for(json!(1468446600)),
            "2016-07-13T21:50:00+00:00"
        );
        assert_eq!(
            ordering_timestamp_for(json!(1468446600.373)),
            "2016-07-13T21:50:00.373+00:00"
        );
    }

    #[test]
    fn reads_offset_less_notification_time_as_utc() {
        assert_eq!(
            ordering_timestamp_for(json!("2016-07-13T21:50:00.373")),
            "2016-07-13T21:50:00.373+00:00"
        );
        assert_eq!(
            ordering_timestamp_for(json!("2016-07-13 21:50:00")),
            "2016-07-13T21:50:00+00:00"
        );
    }

    #[test]
    fn converts_offset_notification_time_to_utc() {
        assert_eq!(
            ordering_timestamp_for(json!("2016-07-13T23:50:00.373+02:00")),
            "2016-07-13T21:50:00.373+00:00"
        );
    }

    #[test]
    fn rejects_blank_account_id() {
        let mut event = sample_event();
        event["accountId"] = json!("  ");

        assert!(matches!(
            parse_config_rule_event(event),
            Err(ComplianceError::MalformedEvent(_))
        ));
    }

    #[test]
    fn rejects_non_object_event() {
        assert!(matches!(
            parse_config_rule_event(json!("invokingEvent")),
            Err(ComplianceError::MalformedEvent(_))
        ));
    }

    #[test]
    fn allowed_regions_is_required() {
        let error = RuleParameters::from_parameters(&parameters(json!({"other": "x"})))
            .expect_err("parameters should fail");
        assert_eq!(
            error,
            ComplianceError::MissingParameter("allowed_regions".to_string())
        );

        let null_value = RuleParameters::from_parameters(&parameters(json!({
            "allowed_regions": null
        })));
        assert!(matches!(
            null_value,
            Err(ComplianceError::MissingParameter(_))
        ));
    }

    #[test]
    fn accepts_string_encoded_region_lists() {
        let from_json_string = RuleParameters::from_parameters(&parameters(json!({
            "allowed_regions": "[\"eu-west-1\", \"eu-west-2\"]"
        })))
        .expect("json string should parse");
        assert_eq!(from_json_string.allowed_regions, ["eu-west-1", "eu-west-2"]);

        let from_csv = RuleParameters::from_parameters(&parameters(json!({
            "allowed_regions": " eu-west-1 ,eu-central-1,, "
        })))
        .expect("csv should parse");
        assert_eq!(from_csv.allowed_regions, ["eu-west-1", "eu-central-1"]);
        assert!(from_csv.allows("eu-central-1"));
        assert!(!from_csv.allows("eu-west"));
    }

    #[test]
    fn rejects_non_string_region_entries() {
        let result = RuleParameters::from_parameters(&parameters(json!({
            "allowed_regions": ["eu-west-1", 7]
        })));
        assert!(matches!(result, Err(ComplianceError::MalformedEvent(_))));

        let result = RuleParameters::from_parameters(&parameters(json!({
            "allowed_regions": 7
        })));
        assert!(matches!(result, Err(ComplianceError::MalformedEvent(_))));
    }

    #[test]
    fn evaluation_record_targets_the_account() {
        let invocation = parse_config_rule_event(sample_event()).expect("event should parse");
        let record = EvaluationRecord::for_account(&invocation, &ComplianceVerdict::Compliant);

        assert_eq!(record.compliance_resource_type, ACCOUNT_RESOURCE_TYPE);
        assert_eq!(record.compliance_resource_id, "123456789012");
        assert_eq!(record.compliance_type, ComplianceType::Compliant);
        assert_eq!(record.ordering_timestamp, invocation.ordering_timestamp);
        assert_eq!(record.result_token, "token-1");
    }
}
