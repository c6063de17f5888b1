use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camstep_embedded::ControlLoop;

use super::device_service::DeviceService;

/// The device's main loop on a dedicated thread: tick, release the bank, idle.
pub struct ControlService {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ControlService {
    pub fn spawn(device: DeviceService) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::Builder::new()
            .name("control-loop".into())
            .spawn(move || {
                let mut control = ControlLoop::new(device.config());
                let idle = Duration::from_millis(control.idle_delay_ms());

                tracing::info!("control loop started");

                while flag.load(Ordering::Relaxed) {
                    if let Err(e) = device.with_bank(|bank, now| control.tick(bank, now)) {
                        tracing::error!("control loop stopped: {}", e);
                        break;
                    }
                    thread::sleep(idle);
                }
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("control loop panicked");
            }
        }
    }
}

impl Drop for ControlService {
    fn drop(&mut self) {
        self.stop();
    }
}
