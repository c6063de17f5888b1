use std::thread;
use std::time::Duration;

use esp_idf_svc::ipv4::IpInfo;
use esp_idf_svc::wifi::*;
use log::{info, warn};

use crate::error::{FirmwareError, Result};

const RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiManager {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { wifi }
    }

    pub fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| FirmwareError::WifiConnection("Invalid SSID".to_string()))?,
            bssid: None,
            auth_method: AuthMethod::WPA2Personal,
            password: password
                .try_into()
                .map_err(|_| FirmwareError::WifiConnection("Invalid password".to_string()))?,
            channel: None,
            ..Default::default()
        });

        self.wifi.set_configuration(&wifi_configuration)?;

        if !self.wifi.is_started()? {
            self.wifi.start()?;
            info!("WiFi started");
        }

        self.wifi.connect()?;
        info!("WiFi connected");

        self.wifi.wait_netif_up()?;
        info!("WiFi netif up");

        Ok(())
    }

    /// Keeps retrying every second until the station is associated.
    pub fn connect_forever(&mut self, ssid: &str, password: &str) -> Result<IpInfo> {
        info!("Connecting to WiFi: {}", ssid);

        loop {
            match self.connect(ssid, password) {
                Ok(()) => return self.get_ip_info(),
                Err(FirmwareError::WifiConnection(reason)) => {
                    return Err(FirmwareError::WifiConnection(reason));
                }
                Err(e) => {
                    warn!("WiFi not ready ({}), retrying", e);
                    let _ = self.wifi.disconnect();
                    thread::sleep(RETRY_INTERVAL);
                }
            }
        }
    }

    pub fn get_ip_info(&self) -> Result<IpInfo> {
        Ok(self.wifi.wifi().sta_netif().get_ip_info()?)
    }
}
