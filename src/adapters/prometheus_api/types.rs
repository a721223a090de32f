//! Prometheus HTTP API Response Types
//!
//! Typed decoding of the `/api/v1/query` envelope. The decode is done
//! in two steps: the envelope first, then `data.result` according to
//! `data.resultType`, so that every failure surfaces as a `QueryError`
//! variant instead of a panic on an unexpected shape.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::Error as _;

use crate::domain::error::QueryError;
use crate::ports::RawSample;

/// Top-level response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryEnvelope {
  /// `"success"` or `"error"`.
  #[serde(default = "default_status")]
  pub status: String,
  /// Result payload, present on success.
  pub data: Option<QueryData>,
  /// Error category, present on error.
  #[serde(rename = "errorType")]
  pub error_type: Option<String>,
  /// Error message, present on error.
  pub error: Option<String>,
}

/// The `data` object. `result` is decoded lazily by result type.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
  /// `vector`, `scalar`, `matrix` or `string`. Treated as `vector`
  /// when absent.
  #[serde(rename = "resultType")]
  pub result_type: Option<String>,
  /// Raw result payload.
  pub result: serde_json::Value,
}

/// One element of an instant vector.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
  /// Series labels.
  #[serde(default)]
  pub metric: BTreeMap<String, String>,
  /// `[timestamp, "value"]`. Absent on native histogram rows, which
  /// carry `histogram` instead.
  pub value: Option<SampleValue>,
}

/// `[unix_seconds, "string-encoded number"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleValue(pub f64, pub String);

fn default_status() -> String {
  "success".to_string()
}

impl QueryEnvelope {
  /// Convert the envelope into result rows.
  pub fn into_samples(self) -> Result<Vec<RawSample>, QueryError> {
    if self.status != "success" {
      return Err(QueryError::Backend {
        error_type: self.error_type.unwrap_or_else(|| "unknown".to_string()),
        message: self.error.unwrap_or_default(),
      });
    }

    let data = self
      .data
      .ok_or_else(|| QueryError::Decode(serde_json::Error::custom("missing field `data`")))?;

    match data.result_type.as_deref() {
      None | Some("vector") => {
        let rows: Vec<VectorSample> = serde_json::from_value(data.result)?;
        Ok(
          rows
            .into_iter()
            .map(|row| RawSample {
              metric: row.metric,
              // An empty value fails to parse later and only that row is skipped.
              value: row.value.map(|SampleValue(_, value)| value).unwrap_or_default(),
            })
            .collect(),
        )
      }
      Some("scalar") => {
        let SampleValue(_, value) = serde_json::from_value(data.result)?;
        Ok(vec![RawSample {
          metric: BTreeMap::new(),
          value,
        }])
      }
      Some(other) => Err(QueryError::UnsupportedResultType(other.to_string())),
    }
  }
}

/// Decode a response body into result rows.
pub fn decode_response(body: &[u8]) -> Result<Vec<RawSample>, QueryError> {
  serde_json::from_slice::<QueryEnvelope>(body)?.into_samples()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_vector() {
    let body = br#"{
      "status": "success",
      "data": {
        "resultType": "vector",
        "result": [
          {"metric": {"job": "node", "instance": "a:9100"}, "value": [1700000000.123, "1"]},
          {"metric": {"job": "node", "instance": "b:9100"}, "value": [1700000000.123, "0"]}
        ]
      }
    }"#;
    let rows = decode_response(body).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].metric["instance"], "a:9100");
    assert_eq!(rows[1].value, "0");
  }

  #[test]
  fn test_decode_without_result_type_defaults_to_vector() {
    let body = br#"{"data": {"result": [{"metric": {}, "value": [1, "12.5"]}]}}"#;
    let rows = decode_response(body).unwrap();
    assert_eq!(rows, vec![RawSample::new::<&str, &str>([], "12.5")]);
  }

  #[test]
  fn test_decode_scalar() {
    let body = br#"{"status":"success","data":{"resultType":"scalar","result":[1700000000,"42"]}}"#;
    let rows = decode_response(body).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].metric.is_empty());
    assert_eq!(rows[0].value, "42");
  }

  #[test]
  fn test_backend_error_envelope() {
    let body = br#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#;
    match decode_response(body) {
      Err(QueryError::Backend { error_type, message }) => {
        assert_eq!(error_type, "bad_data");
        assert!(message.contains("parse error"));
      }
      other => panic!("expected backend error, got {other:?}"),
    }
  }

  #[test]
  fn test_matrix_is_unsupported() {
    let body = br#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;
    assert!(matches!(
      decode_response(body),
      Err(QueryError::UnsupportedResultType(t)) if t == "matrix"
    ));
  }

  #[test]
  fn test_histogram_row_is_kept_without_value() {
    let body = br#"{"status":"success","data":{"resultType":"vector","result":[
      {"metric":{"le":"native"},"histogram":[1700000000,{"count":"3","sum":"1.5"}]},
      {"metric":{"job":"api"},"value":[1700000000,"2"]}
    ]}}"#;
    let rows = decode_response(body).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].value, "");
    assert_eq!(rows[1], RawSample::new([("job", "api")], "2"));
  }

  #[test]
  fn test_malformed_rows_fail_whole_envelope() {
    for body in [
      &br#"not json"#[..],
      br#"{"status":"success"}"#,
      br#"{"data":{"result":[{"metric":{},"value":"12"}]}}"#,
      br#"{"data":{"result":[{"metric":{"a":1},"value":[1,"1"]}]}}"#,
    ] {
      assert!(
        matches!(decode_response(body), Err(QueryError::Decode(_))),
        "{}",
        String::from_utf8_lossy(body)
      );
    }
  }
}
