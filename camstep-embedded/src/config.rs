use serde::{Deserialize, Serialize};

pub const DEFAULT_HOSTNAME: &str = "camera-motor";
pub const DEFAULT_STEP_INTERVAL_US: u32 = 1000;
pub const DEFAULT_DURATION_SECS: u32 = 5;
pub const DEFAULT_IDLE_DELAY_MS: u64 = 1;
pub const DEFAULT_HEARTBEAT_MS: u64 = 5000;
pub const DEFAULT_REBOOT_DELAY_MS: u64 = 3000;

/// GPIO numbers of one A4988 driver stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap {
    pub dir: u8,
    pub step: u8,
    pub enable: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub hostname: alloc::string::String,
    pub step_interval_us: u32,
    pub default_duration_secs: u32,
    pub idle_delay_ms: u64,
    pub heartbeat_ms: u64,
    pub reboot_delay_ms: u64,
    pub motor1: PinMap,
    pub motor2: PinMap,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: alloc::string::String::from(DEFAULT_HOSTNAME),
            step_interval_us: DEFAULT_STEP_INTERVAL_US,
            default_duration_secs: DEFAULT_DURATION_SECS,
            idle_delay_ms: DEFAULT_IDLE_DELAY_MS,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
            reboot_delay_ms: DEFAULT_REBOOT_DELAY_MS,
            motor1: PinMap {
                dir: 2,
                step: 3,
                enable: 12,
            },
            motor2: PinMap {
                dir: 10,
                step: 6,
                enable: 18,
            },
        }
    }
}
