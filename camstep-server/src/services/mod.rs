mod control_service;
mod device_service;
mod reboot_service;
mod sim_driver;
mod update_service;

pub use control_service::ControlService;
pub use device_service::{DeviceService, SimBank};
pub use reboot_service::schedule_reboot;
pub use sim_driver::{SimDelay, SimMotor, SimPin};
pub use update_service::{FileSink, UpdateService};
