//! Device event kinds
//!
//! Closed tagged union over the callback event types. Parsing happens once
//! at the boundary; dispatch is an exhaustive match, so adding an event
//! kind is a compile-time-checked extension.

use serde::Deserialize;

use crate::error::ServiceError;
use crate::models::DeviceStatus;

/// One parsed device callback
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Periodic liveness signal; refreshes the online TTL
    Heartbeat,

    /// Field update pushed by the device; applied verbatim
    StatusChange {
        status: Option<DeviceStatus>,
        location: Option<String>,
    },

    /// Wash started for the correlated order
    WashStart {
        order_no: String,
        duration_minutes: u32,
    },

    /// Wash finished for the correlated order
    WashEnd {
        order_no: String,
        result: serde_json::Value,
    },

    /// Device fault report
    Error {
        code: Option<String>,
        message: Option<String>,
    },

    /// Unrecognized event type: recorded, no state mutation
    Unknown { event_type: String },
}

#[derive(Deserialize)]
struct StatusChangePayload {
    status: Option<String>,
    location: Option<String>,
}

#[derive(Deserialize)]
struct WashStartPayload {
    #[serde(alias = "orderNo")]
    order_no: String,
    #[serde(alias = "duration")]
    duration_minutes: u32,
}

#[derive(Deserialize)]
struct WashEndPayload {
    #[serde(alias = "orderNo")]
    order_no: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct ErrorPayload {
    code: Option<String>,
    message: Option<String>,
}

impl DeviceEvent {
    /// Parse a callback into its event kind.
    ///
    /// An unrecognized `event_type` parses into [`DeviceEvent::Unknown`];
    /// a recognized type with a malformed payload is an error.
    pub fn parse(event_type: &str, payload: &serde_json::Value) -> Result<Self, ServiceError> {
        match event_type {
            "heartbeat" => Ok(DeviceEvent::Heartbeat),
            "status_change" => {
                let p: StatusChangePayload = from_payload(payload)?;
                let status = match p.status {
                    Some(s) => Some(DeviceStatus::parse(&s).ok_or_else(|| {
                        ServiceError::InvalidPayload(format!("unknown device status: {}", s))
                    })?),
                    None => None,
                };
                Ok(DeviceEvent::StatusChange {
                    status,
                    location: p.location,
                })
            }
            "wash_start" => {
                let p: WashStartPayload = from_payload(payload)?;
                if p.duration_minutes == 0 {
                    return Err(ServiceError::InvalidPayload(
                        "wash_start duration must be greater than zero".into(),
                    ));
                }
                Ok(DeviceEvent::WashStart {
                    order_no: p.order_no,
                    duration_minutes: p.duration_minutes,
                })
            }
            "wash_end" => {
                let p: WashEndPayload = from_payload(payload)?;
                Ok(DeviceEvent::WashEnd {
                    order_no: p.order_no,
                    result: p.result,
                })
            }
            "error" => {
                let p: ErrorPayload = from_payload(payload)?;
                Ok(DeviceEvent::Error {
                    code: p.code,
                    message: p.message,
                })
            }
            other => Ok(DeviceEvent::Unknown {
                event_type: other.to_string(),
            }),
        }
    }

    /// Correlated order number, if this event kind carries one
    pub fn order_no(&self) -> Option<&str> {
        match self {
            DeviceEvent::WashStart { order_no, .. } | DeviceEvent::WashEnd { order_no, .. } => {
                Some(order_no)
            }
            _ => None,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceEvent::Heartbeat => "heartbeat",
            DeviceEvent::StatusChange { .. } => "status_change",
            DeviceEvent::WashStart { .. } => "wash_start",
            DeviceEvent::WashEnd { .. } => "wash_end",
            DeviceEvent::Error { .. } => "error",
            DeviceEvent::Unknown { .. } => "unknown",
        }
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(
    payload: &serde_json::Value,
) -> Result<T, ServiceError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| ServiceError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_heartbeat() {
        let event = DeviceEvent::parse("heartbeat", &json!({})).unwrap();
        assert_eq!(event, DeviceEvent::Heartbeat);
        assert_eq!(event.order_no(), None);
    }

    #[test]
    fn test_parse_status_change() {
        let event =
            DeviceEvent::parse("status_change", &json!({"status": "offline", "location": "lot B"}))
                .unwrap();
        assert_eq!(
            event,
            DeviceEvent::StatusChange {
                status: Some(DeviceStatus::Offline),
                location: Some("lot B".into()),
            }
        );
    }

    #[test]
    fn test_parse_status_change_partial() {
        let event = DeviceEvent::parse("status_change", &json!({})).unwrap();
        assert_eq!(
            event,
            DeviceEvent::StatusChange {
                status: None,
                location: None,
            }
        );
    }

    #[test]
    fn test_parse_status_change_bad_status() {
        let err = DeviceEvent::parse("status_change", &json!({"status": "sideways"})).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_wash_start() {
        let event =
            DeviceEvent::parse("wash_start", &json!({"orderNo": "W123", "duration": 15})).unwrap();
        assert_eq!(
            event,
            DeviceEvent::WashStart {
                order_no: "W123".into(),
                duration_minutes: 15,
            }
        );
        assert_eq!(event.order_no(), Some("W123"));
    }

    #[test]
    fn test_parse_wash_start_snake_case() {
        let event = DeviceEvent::parse(
            "wash_start",
            &json!({"order_no": "W123", "duration_minutes": 15}),
        )
        .unwrap();
        assert_eq!(event.order_no(), Some("W123"));
    }

    #[test]
    fn test_parse_wash_start_missing_order() {
        let err = DeviceEvent::parse("wash_start", &json!({"duration": 15})).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_wash_start_zero_duration() {
        let err =
            DeviceEvent::parse("wash_start", &json!({"orderNo": "W1", "duration": 0})).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_wash_end() {
        let event = DeviceEvent::parse(
            "wash_end",
            &json!({"orderNo": "W123", "result": {"water_used": 42}}),
        )
        .unwrap();
        match event {
            DeviceEvent::WashEnd { order_no, result } => {
                assert_eq!(order_no, "W123");
                assert_eq!(result["water_used"], 42);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_event() {
        let event =
            DeviceEvent::parse("error", &json!({"code": "E07", "message": "pump jam"})).unwrap();
        assert_eq!(
            event,
            DeviceEvent::Error {
                code: Some("E07".into()),
                message: Some("pump jam".into()),
            }
        );
    }

    #[test]
    fn test_parse_unknown_event_type() {
        let event = DeviceEvent::parse("firmware_update", &json!({"v": 2})).unwrap();
        assert_eq!(
            event,
            DeviceEvent::Unknown {
                event_type: "firmware_update".into()
            }
        );
        assert_eq!(event.kind(), "unknown");
    }
}
