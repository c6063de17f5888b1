use std::time::Duration;

use tokio::task::JoinHandle;

use super::device_service::DeviceService;

/// Simulated restart: after `delay` the bank returns to its boot state.
pub fn schedule_reboot(device: DeviceService, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        tracing::warn!("restarting device");

        match tokio::task::spawn_blocking(move || device.reset()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("restart failed: {}", e),
            Err(e) => tracing::error!("restart task failed: {}", e),
        }
    })
}
