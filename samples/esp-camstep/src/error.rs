use esp_idf_svc::sys::EspError;

#[derive(thiserror::Error, Debug)]
pub enum FirmwareError {
    #[error("WiFi connection failed: {0}")]
    WifiConnection(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Update error: {0}")]
    Update(String),

    #[error("System error: {0}")]
    System(String),
}

impl From<EspError> for FirmwareError {
    fn from(err: EspError) -> Self {
        FirmwareError::System(format!("ESP error: {}", err))
    }
}

pub type Result<T> = core::result::Result<T, FirmwareError>;
