use crate::resolution::DeviceId;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Largest queue capacity accepted for either work queue
pub const MAX_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlarmviewConfig {
    pub webhook: WebhookConfig,
    pub queues: QueueConfig,
    pub fetch: FetchConfig,
    pub display: DisplayConfig,
    pub sensor: SensorConfig,
    pub buttons: ButtonConfig,
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookConfig {
    /// IP address to bind to
    #[serde(default = "default_webhook_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// How long the handler may wait for space in the fetch queue
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QueueConfig {
    /// Pending fetch requests before producers start dropping
    #[serde(default = "default_queue_capacity")]
    pub fetch_capacity: usize,

    /// Pending render items before producers start dropping
    #[serde(default = "default_queue_capacity")]
    pub render_capacity: usize,

    /// Worker dequeue timeout; bounds how late a worker notices shutdown
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FetchConfig {
    /// Snapshot URL, `{camera}` is replaced with the camera id
    #[serde(default = "default_snapshot_url")]
    pub snapshot_url: String,

    /// API key sent with every snapshot request
    pub api_key: Option<String>,

    /// Header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Accept self-signed certificates from the NVR
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Directory holding stored snapshots
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// Largest snapshot accepted, in bytes
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: usize,

    /// How long the fetch worker waits for room in the render queue
    #[serde(default = "default_enqueue_timeout_ms")]
    pub publish_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Scale used when a request carries none (256 = 100%)
    #[serde(default = "default_image_scale")]
    pub default_scale: u32,

    /// Longest wait for the display lock before an update is dropped
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// View shown after startup
    #[serde(default = "default_initial_view")]
    pub initial_view: DisplayView,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SensorConfig {
    /// Poll the radar at all
    #[serde(default = "default_sensor_enabled")]
    pub enabled: bool,

    /// Radar polling period
    #[serde(default = "default_sensor_poll_period_ms")]
    pub poll_period_ms: u64,

    /// Distance a tracked target must move before it is redrawn
    #[serde(default = "default_movement_threshold_mm")]
    pub movement_threshold_mm: f32,

    /// Number of target slots tracked by the radar
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,

    /// How long the sensor task waits for room in the render queue
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ButtonConfig {
    /// How long a button press waits for room in a queue
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,

    #[serde(default = "default_button_bindings")]
    pub bindings: Vec<ButtonBinding>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ButtonBinding {
    pub index: usize,
    pub action: ButtonActionKind,
    /// Camera fetched by a `fetch` binding
    pub camera: Option<String>,
    /// Human name of the camera, for logs
    pub name: Option<String>,
    /// Image scale requested with the fetch
    pub scale: Option<u32>,
    /// Swallow the first press
    #[serde(default)]
    pub prime_first: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonActionKind {
    Fetch,
    ToggleView,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Hardware address reported in alarm triggers
    pub device: String,
    /// Camera id used in the snapshot URL
    pub camera: String,
    /// Human name, for logs
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayView {
    #[default]
    Image,
    Radar,
}

impl DisplayView {
    pub fn toggled(self) -> Self {
        match self {
            DisplayView::Image => DisplayView::Radar,
            DisplayView::Radar => DisplayView::Image,
        }
    }
}

impl AlarmviewConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("alarmview.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("webhook.ip", default_webhook_ip())?
            .set_default("webhook.port", default_webhook_port())?
            .set_default("webhook.enqueue_timeout_ms", default_enqueue_timeout_ms())?
            .set_default("webhook.max_body_bytes", default_max_body_bytes() as i64)?
            .set_default("queues.fetch_capacity", default_queue_capacity() as i64)?
            .set_default("queues.render_capacity", default_queue_capacity() as i64)?
            .set_default("queues.poll_interval_ms", default_poll_interval_ms())?
            .set_default("fetch.snapshot_url", default_snapshot_url())?
            .set_default("fetch.api_key_header", default_api_key_header())?
            .set_default("fetch.request_timeout_ms", default_request_timeout_ms())?
            .set_default("fetch.accept_invalid_certs", default_accept_invalid_certs())?
            .set_default("fetch.storage_dir", default_storage_dir())?
            .set_default(
                "fetch.max_artifact_bytes",
                default_max_artifact_bytes() as i64,
            )?
            .set_default("fetch.publish_timeout_ms", default_enqueue_timeout_ms())?
            .set_default("display.default_scale", default_image_scale())?
            .set_default("display.lock_timeout_ms", default_lock_timeout_ms())?
            .set_default("display.initial_view", "image")?
            .set_default("sensor.enabled", default_sensor_enabled())?
            .set_default("sensor.poll_period_ms", default_sensor_poll_period_ms())?
            .set_default(
                "sensor.movement_threshold_mm",
                default_movement_threshold_mm() as f64,
            )?
            .set_default("sensor.max_targets", default_max_targets() as i64)?
            .set_default("sensor.enqueue_timeout_ms", default_enqueue_timeout_ms())?
            .set_default("buttons.enqueue_timeout_ms", default_enqueue_timeout_ms())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // ALARMVIEW_WEBHOOK__PORT=9000 style overrides
            .add_source(
                Environment::with_prefix("ALARMVIEW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AlarmviewConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, capacity) in [
            ("fetch_capacity", self.queues.fetch_capacity),
            ("render_capacity", self.queues.render_capacity),
        ] {
            if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
                return Err(ConfigError::Message(format!(
                    "Queue {} must be between 1 and {}",
                    name, MAX_QUEUE_CAPACITY
                )));
            }
        }

        if self.queues.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Queue poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.webhook.max_body_bytes == 0 {
            return Err(ConfigError::Message(
                "Webhook max_body_bytes must be greater than 0".to_string(),
            ));
        }

        if !self.fetch.snapshot_url.contains("{camera}") {
            return Err(ConfigError::Message(
                "Fetch snapshot_url must contain a {camera} placeholder".to_string(),
            ));
        }

        if self.fetch.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Fetch request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.fetch.max_artifact_bytes == 0 {
            return Err(ConfigError::Message(
                "Fetch max_artifact_bytes must be greater than 0".to_string(),
            ));
        }

        if self.display.default_scale == 0 {
            return Err(ConfigError::Message(
                "Display default_scale must be greater than 0".to_string(),
            ));
        }

        if self.display.lock_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Display lock_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.sensor.poll_period_ms == 0 {
            return Err(ConfigError::Message(
                "Sensor poll_period_ms must be greater than 0".to_string(),
            ));
        }

        if !(self.sensor.movement_threshold_mm > 0.0) {
            return Err(ConfigError::Message(
                "Sensor movement_threshold_mm must be greater than 0".to_string(),
            ));
        }

        if self.sensor.max_targets == 0 {
            return Err(ConfigError::Message(
                "Sensor max_targets must be greater than 0".to_string(),
            ));
        }

        let mut devices = HashSet::new();
        for entry in &self.devices {
            let id = DeviceId::parse(&entry.device)
                .map_err(|e| ConfigError::Message(format!("Device list: {}", e)))?;
            if !devices.insert(id) {
                return Err(ConfigError::Message(format!(
                    "Device {} is listed more than once",
                    entry.device
                )));
            }
        }

        let mut indices = HashSet::new();
        for binding in &self.buttons.bindings {
            if !indices.insert(binding.index) {
                return Err(ConfigError::Message(format!(
                    "Button {} is bound more than once",
                    binding.index
                )));
            }
            if binding.action == ButtonActionKind::Fetch && binding.camera.is_none() {
                return Err(ConfigError::Message(format!(
                    "Button {} fetch binding has no camera",
                    binding.index
                )));
            }
            if binding.scale == Some(0) {
                return Err(ConfigError::Message(format!(
                    "Button {} scale must be greater than 0",
                    binding.index
                )));
            }
        }

        Ok(())
    }
}

impl WebhookConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl FetchConfig {
    /// Snapshot URL for one camera
    pub fn snapshot_url_for(&self, camera: &str) -> String {
        self.snapshot_url.replace("{camera}", camera)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl DisplayConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl SensorConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

impl ButtonConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

impl Default for AlarmviewConfig {
    fn default() -> Self {
        Self {
            webhook: WebhookConfig {
                ip: default_webhook_ip(),
                port: default_webhook_port(),
                enqueue_timeout_ms: default_enqueue_timeout_ms(),
                max_body_bytes: default_max_body_bytes(),
            },
            queues: QueueConfig {
                fetch_capacity: default_queue_capacity(),
                render_capacity: default_queue_capacity(),
                poll_interval_ms: default_poll_interval_ms(),
            },
            fetch: FetchConfig {
                snapshot_url: default_snapshot_url(),
                api_key: None,
                api_key_header: default_api_key_header(),
                request_timeout_ms: default_request_timeout_ms(),
                accept_invalid_certs: default_accept_invalid_certs(),
                storage_dir: default_storage_dir(),
                max_artifact_bytes: default_max_artifact_bytes(),
                publish_timeout_ms: default_enqueue_timeout_ms(),
            },
            display: DisplayConfig {
                default_scale: default_image_scale(),
                lock_timeout_ms: default_lock_timeout_ms(),
                initial_view: default_initial_view(),
            },
            sensor: SensorConfig {
                enabled: default_sensor_enabled(),
                poll_period_ms: default_sensor_poll_period_ms(),
                movement_threshold_mm: default_movement_threshold_mm(),
                max_targets: default_max_targets(),
                enqueue_timeout_ms: default_enqueue_timeout_ms(),
            },
            buttons: ButtonConfig {
                enqueue_timeout_ms: default_enqueue_timeout_ms(),
                bindings: default_button_bindings(),
            },
            devices: default_devices(),
        }
    }
}

// Default value functions
fn default_webhook_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_webhook_port() -> u16 {
    8080
}
fn default_enqueue_timeout_ms() -> u64 {
    50
}
fn default_max_body_bytes() -> usize {
    16 * 1024
}

fn default_queue_capacity() -> usize {
    MAX_QUEUE_CAPACITY
}
fn default_poll_interval_ms() -> u64 {
    500
}

fn default_snapshot_url() -> String {
    "https://10.100.1.1/proxy/protect/integration/v1/cameras/{camera}/snapshot".to_string()
}
fn default_api_key_header() -> String {
    "X-API-KEY".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_accept_invalid_certs() -> bool {
    true
}
fn default_storage_dir() -> String {
    "./artifacts".to_string()
}
fn default_max_artifact_bytes() -> usize {
    512 * 1024
}

fn default_image_scale() -> u32 {
    80
}
fn default_lock_timeout_ms() -> u64 {
    1_000
}
fn default_initial_view() -> DisplayView {
    DisplayView::Image
}

fn default_sensor_enabled() -> bool {
    true
}
fn default_sensor_poll_period_ms() -> u64 {
    250
}
fn default_movement_threshold_mm() -> f32 {
    75.0
}
fn default_max_targets() -> usize {
    3
}

fn default_button_bindings() -> Vec<ButtonBinding> {
    vec![
        ButtonBinding {
            index: 0,
            action: ButtonActionKind::ToggleView,
            camera: None,
            name: None,
            scale: None,
            prime_first: false,
        },
        ButtonBinding {
            index: 1,
            action: ButtonActionKind::Fetch,
            camera: Some("65b2e8d400858f03e4014f3a".to_string()),
            name: Some("garage".to_string()),
            scale: Some(192),
            prime_first: true,
        },
        ButtonBinding {
            index: 2,
            action: ButtonActionKind::Fetch,
            camera: Some("6096c66202197e0387001879".to_string()),
            name: Some("front door".to_string()),
            scale: Some(80),
            prime_first: false,
        },
    ]
}

fn default_devices() -> Vec<DeviceEntry> {
    vec![
        DeviceEntry {
            device: "E063DA00602B".to_string(),
            camera: "6096c66202197e0387001879".to_string(),
            name: "front door".to_string(),
        },
        DeviceEntry {
            device: "70A7413F0FD7".to_string(),
            camera: "65b2e8d400858f03e4014f3a".to_string(),
            name: "garage".to_string(),
        },
    ]
}
