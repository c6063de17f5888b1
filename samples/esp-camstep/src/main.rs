mod error;
mod ota;
mod server;
mod storage;
mod wifi;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use camstep_embedded::{Clock, ControlLoop, DeviceConfig, MotorBank, PinMap, TwoPinMotor};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::mdns::EspMdns;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::systime::EspSystemTime;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use crate::error::Result;
use crate::wifi::WifiManager;

const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "camera-rig",
};
const WIFI_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(password) => password,
    None => "",
};
const OTA_PASSWORD: &str = match option_env!("OTA_PASSWORD") {
    Some(password) => password,
    None => "",
};

pub type FirmwareMotor = TwoPinMotor<PinDriver<'static, AnyOutputPin, Output>, Ets>;
pub type SharedBank = Arc<Mutex<MotorBank<FirmwareMotor>>>;

/// Milliseconds since boot from `esp_timer`.
#[derive(Debug, Clone, Copy)]
pub struct EspClock;

impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        EspSystemTime.now().as_millis() as u64
    }
}

fn output(gpio: u8) -> Result<PinDriver<'static, AnyOutputPin, Output>> {
    // Pin numbers come from DeviceConfig; nothing else in the firmware claims them.
    let pin = unsafe { AnyOutputPin::new(i32::from(gpio)) };
    Ok(PinDriver::output(pin)?)
}

fn driver(pins: &PinMap) -> Result<FirmwareMotor> {
    Ok(TwoPinMotor::new(
        output(pins.step)?,
        output(pins.dir)?,
        output(pins.enable)?,
        Ets,
    ))
}

fn advertise(hostname: &str) -> Result<EspMdns> {
    let mut mdns = EspMdns::take()?;
    mdns.set_hostname(hostname)?;
    mdns.set_instance_name(hostname)?;
    mdns.add_service(
        None,
        "_http",
        "_tcp",
        80,
        &[("version", "1.0"), ("device", "camera-motor-controller")],
    )?;

    info!("mDNS started: http://{}.local", hostname);
    Ok(mdns)
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = DeviceConfig::default();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let bank: SharedBank = Arc::new(Mutex::new(MotorBank::new(
        driver(&config.motor1)?,
        driver(&config.motor2)?,
        config.step_interval_us,
    )));
    info!(
        "motors ready: {}us step interval",
        config.step_interval_us
    );

    if let Err(e) = storage::mount() {
        warn!("{}", e);
    }

    let mut wifi_manager = WifiManager::new(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    )?);
    let ip_info = wifi_manager.connect_forever(WIFI_SSID, WIFI_PASSWORD)?;
    info!("WiFi DHCP info: {:?}", ip_info);

    let _mdns = advertise(&config.hostname)
        .inspect_err(|e| warn!("mDNS failed to start: {}", e))
        .ok();

    let _server = server::setup_http_server(bank.clone(), &config, OTA_PASSWORD)?;
    info!("HTTP server started on http://{}", ip_info.ip);

    let clock = EspClock;
    let mut control = ControlLoop::new(&config);
    let idle = Duration::from_millis(control.idle_delay_ms());

    loop {
        {
            let mut bank = bank
                .lock()
                .map_err(|_| anyhow::anyhow!("motor bank poisoned"))?;
            control.tick(&mut bank, clock.now_ms());
        }
        thread::sleep(idle);
    }
}
