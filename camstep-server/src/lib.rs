use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::app::create_app;
use crate::configs::Settings;
use crate::services::{ControlService, DeviceService};

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod services;

pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let device = DeviceService::new(settings.motors.clone());
    let _control = ControlService::spawn(device.clone())?;

    let app = create_app(settings, device);

    let ip_addr = settings
        .server
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("invalid server host {:?}", settings.server.host))?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("listening on {:?}", address);
    tracing::info!(
        "web console at http://{}.local:{} (simulated)",
        settings.motors.hostname,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
