use crate::error::InputError;
use crate::resolution::DeviceId;
use serde_json::Value;
use tracing::{debug, info};

/// Fields of an NVR alarm notification worth keeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmNotice {
    pub device: DeviceId,
    pub alarm_name: Option<String>,
    pub trigger_key: Option<String>,
    pub event_id: Option<String>,
}

/// Extract the device of the first trigger from an alarm notification.
///
/// Expected shape: `{"alarm": {"name": ..., "triggers": [{"key": ..., "device": ...}]}}`.
pub fn parse_alert(body: &[u8]) -> Result<AlarmNotice, InputError> {
    let root: Value = serde_json::from_slice(body).map_err(|e| InputError::MalformedPayload {
        details: e.to_string(),
    })?;

    let alarm = root
        .get("alarm")
        .filter(|alarm| alarm.is_object())
        .ok_or(InputError::MissingAlarm)?;
    let triggers = alarm
        .get("triggers")
        .and_then(Value::as_array)
        .ok_or(InputError::MissingTriggers)?;
    let trigger = triggers.first().ok_or(InputError::EmptyTriggers)?;
    let raw_device = trigger
        .get("device")
        .and_then(Value::as_str)
        .ok_or(InputError::MissingDevice)?;
    let device = DeviceId::parse(raw_device)?;

    let notice = AlarmNotice {
        device,
        alarm_name: string_field(alarm, "name"),
        trigger_key: string_field(trigger, "key"),
        event_id: string_field(trigger, "eventId"),
    };

    info!(
        "Alarm '{}' ({}) from device {}",
        notice.alarm_name.as_deref().unwrap_or("unnamed"),
        notice.trigger_key.as_deref().unwrap_or("no key"),
        notice.device
    );
    if triggers.len() > 1 {
        debug!("Ignoring {} additional triggers", triggers.len() - 1);
    }

    Ok(notice)
}

fn string_field(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFI_ALARM: &str = r#"{
        "alarm": {
            "name": "Person",
            "sources": [],
            "conditions": [{"condition": {"type": "is", "source": "person"}}],
            "triggers": [
                {"key": "person", "device": "70A7413F0FD7", "eventId": "690e50b200ba0503e40e9015", "timestamp": 1762545842310},
                {"key": "person", "device": "70A7413F0FD7", "eventId": "690e50b2030c0503e40e9029", "timestamp": 1762545842808}
            ],
            "eventPath": "/protect/events/event/690e50b200ba0503e40e9015"
        },
        "timestamp": 1762545843235
    }"#;

    #[test]
    fn test_parse_full_notification() {
        let notice = parse_alert(UNIFI_ALARM.as_bytes()).unwrap();
        assert_eq!(notice.device.as_str(), "70A7413F0FD7");
        assert_eq!(notice.alarm_name.as_deref(), Some("Person"));
        assert_eq!(notice.trigger_key.as_deref(), Some("person"));
        assert_eq!(notice.event_id.as_deref(), Some("690e50b200ba0503e40e9015"));
    }

    #[test]
    fn test_parse_minimal_notification() {
        let notice = parse_alert(br#"{"alarm":{"triggers":[{"device":"E063DA00602B"}]}}"#).unwrap();
        assert_eq!(notice.device.as_str(), "E063DA00602B");
        assert_eq!(notice.alarm_name, None);
    }

    #[test]
    fn test_parse_errors_are_distinct() {
        let cases: [(&[u8], InputError); 7] = [
            (br#"{"alarm":{}}"#, InputError::MissingTriggers),
            (br#"{"other":1}"#, InputError::MissingAlarm),
            (br#"{"alarm":"Person"}"#, InputError::MissingAlarm),
            (br#"{"alarm":{"triggers":{}}}"#, InputError::MissingTriggers),
            (br#"{"alarm":{"triggers":[]}}"#, InputError::EmptyTriggers),
            (br#"{"alarm":{"triggers":[{"key":"person"}]}}"#, InputError::MissingDevice),
            (br#"{"alarm":{"triggers":[{"device":42}]}}"#, InputError::MissingDevice),
        ];

        for (body, expected) in cases {
            assert_eq!(parse_alert(body), Err(expected));
        }
    }

    #[test]
    fn test_parse_rejects_bad_json_and_bad_device() {
        assert!(matches!(
            parse_alert(b"not json"),
            Err(InputError::MalformedPayload { .. })
        ));
        assert!(matches!(
            parse_alert(b""),
            Err(InputError::MalformedPayload { .. })
        ));
        assert_eq!(
            parse_alert(br#"{"alarm":{"triggers":[{"device":"garage"}]}}"#),
            Err(InputError::InvalidDeviceId {
                value: "garage".to_string()
            })
        );
    }
}
