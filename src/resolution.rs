use crate::config::DeviceEntry;
use crate::error::{AlarmviewError, InputError, Result, UnknownDevice};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Number of hex digits in a hardware address
const DEVICE_ID_LEN: usize = 12;

/// Hardware address of the device that raised an event, normalized to
/// upper-case hex without separators
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Parse `E063DA00602B`, `e0:63:da:00:60:2b` or `E0-63-DA-00-60-2B`
    pub fn parse(raw: &str) -> std::result::Result<Self, InputError> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if normalized.len() != DEVICE_ID_LEN || !normalized.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(InputError::InvalidDeviceId {
                value: raw.chars().take(32).collect(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Camera a trigger resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    /// Camera id used to build the snapshot URL
    pub camera: String,
    /// Human name, for logs
    pub name: String,
}

impl TargetRef {
    pub fn new(camera: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            camera: camera.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.camera)
    }
}

/// Read-only device to camera lookup, built once at startup
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    entries: HashMap<DeviceId, TargetRef>,
}

impl ResolutionTable {
    /// Build the table from configured entries; duplicates are rejected
    pub fn from_entries(entries: &[DeviceEntry]) -> Result<Self> {
        let mut table = HashMap::with_capacity(entries.len());

        for entry in entries {
            let id = DeviceId::parse(&entry.device)?;
            let target = TargetRef::new(entry.camera.clone(), entry.name.clone());
            if table.insert(id.clone(), target).is_some() {
                return Err(AlarmviewError::component(
                    "resolution".to_string(),
                    format!("duplicate device {}", id),
                ));
            }
        }

        debug!("Resolution table built with {} devices", table.len());
        Ok(Self { entries: table })
    }

    pub fn resolve(&self, id: &DeviceId) -> std::result::Result<TargetRef, UnknownDevice> {
        self.entries.get(id).cloned().ok_or_else(|| UnknownDevice {
            device: id.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<DeviceEntry> {
        vec![
            DeviceEntry {
                device: "E063DA00602B".to_string(),
                camera: "6096c66202197e0387001879".to_string(),
                name: "front door".to_string(),
            },
            DeviceEntry {
                device: "70:a7:41:3f:0f:d7".to_string(),
                camera: "65b2e8d400858f03e4014f3a".to_string(),
                name: "garage".to_string(),
            },
        ]
    }

    #[test]
    fn test_device_id_normalization() {
        let id = DeviceId::parse("e0:63:da:00:60:2b").unwrap();
        assert_eq!(id.as_str(), "E063DA00602B");
        assert_eq!(DeviceId::parse("E0-63-DA-00-60-2B").unwrap(), id);
        assert_eq!(DeviceId::parse(" E063DA00602B ").unwrap(), id);
    }

    #[test]
    fn test_device_id_rejects_bad_format() {
        assert!(DeviceId::parse("").is_err());
        assert!(DeviceId::parse("E063DA00602").is_err());
        assert!(DeviceId::parse("E063DA00602BX").is_err());
        assert!(DeviceId::parse("G063DA00602B").is_err());
    }

    #[test]
    fn test_invalid_device_id_is_truncated_in_error() {
        let long = "Z".repeat(200);
        match DeviceId::parse(&long) {
            Err(InputError::InvalidDeviceId { value }) => assert_eq!(value.len(), 32),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_known_devices() {
        let table = ResolutionTable::from_entries(&entries()).unwrap();
        assert_eq!(table.len(), 2);

        let front = table
            .resolve(&DeviceId::parse("E063DA00602B").unwrap())
            .unwrap();
        assert_eq!(front.name, "front door");
        assert_eq!(front.camera, "6096c66202197e0387001879");

        let garage = table
            .resolve(&DeviceId::parse("70A7413F0FD7").unwrap())
            .unwrap();
        assert_eq!(garage.name, "garage");
    }

    #[test]
    fn test_resolve_unknown_device() {
        let table = ResolutionTable::from_entries(&entries()).unwrap();
        let err = table
            .resolve(&DeviceId::parse("000000000000").unwrap())
            .unwrap_err();
        assert_eq!(err.device, "000000000000");
    }

    #[test]
    fn test_duplicate_devices_rejected() {
        let mut list = entries();
        list.push(DeviceEntry {
            device: "e063da00602b".to_string(),
            camera: "other".to_string(),
            name: "other".to_string(),
        });
        assert!(ResolutionTable::from_entries(&list).is_err());
    }

    #[test]
    fn test_concurrent_lookups() {
        let table = std::sync::Arc::new(ResolutionTable::from_entries(&entries()).unwrap());
        let id = DeviceId::parse("E063DA00602B").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = std::sync::Arc::clone(&table);
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert_eq!(table.resolve(&id).unwrap().name, "front door");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
