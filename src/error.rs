use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlarmviewError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Webhook server error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl AlarmviewError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Problems with an inbound event payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Payload is not valid JSON: {details}")]
    MalformedPayload { details: String },

    #[error("Alarm element not found")]
    MissingAlarm,

    #[error("Triggers element not found")]
    MissingTriggers,

    #[error("First element in triggers not found")]
    EmptyTriggers,

    #[error("Device element not found")]
    MissingDevice,

    #[error("Invalid device identifier '{value}'")]
    InvalidDeviceId { value: String },
}

/// Lookup miss in the device resolution table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown device: {device}")]
pub struct UnknownDevice {
    pub device: String,
}

/// Network retrieval failures
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {details}")]
    Transport { url: String, details: String },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("HTTP client setup failed: {details}")]
    ClientSetup { details: String },
}

/// Artifact persistence failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Artifact for {camera} is empty")]
    Empty { camera: String },

    #[error("Artifact for {camera} is {size} bytes, limit is {limit}")]
    TooLarge {
        camera: String,
        size: usize,
        limit: usize,
    },

    #[error("Failed to decode base64 contents for {camera}: {details}")]
    Decode { camera: String, details: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while applying an update to the display
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Timed out after {waited_ms}ms waiting for the display lock")]
    LockTimeout { waited_ms: u64 },

    #[error("Image {path} is not readable")]
    MissingImage { path: PathBuf },

    #[error("Invalid image scale {scale}")]
    InvalidScale { scale: u32 },

    #[error("Target slot {slot} out of range (max {max})")]
    SlotOutOfRange { slot: usize, max: usize },
}

/// Radar read failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Radar read failed: {details}")]
    Read { details: String },
}

/// HTTP listener failures
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {details}")]
    ServeFailed { details: String },
}

pub type Result<T> = std::result::Result<T, AlarmviewError>;
