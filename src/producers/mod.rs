//! Everything that puts work on the queues.

pub mod buttons;
pub mod keyboard_input;
pub mod sensor;
pub mod webhook;

pub use buttons::{ButtonAction, ButtonOutcome, ButtonProducer};
pub use keyboard_input::{KeyCommand, KeyboardInputHandler};
pub use sensor::{
    describe_position, has_target_moved, RadarSensor, RadarTarget, SensorProducer, SimulatedRadar,
};
pub use webhook::{
    parse_alert, AlarmNotice, HealthProbe, IngestOutcome, WebhookIngest, WebhookServer,
};
