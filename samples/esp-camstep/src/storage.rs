use std::ffi::CStr;
use std::ptr;

use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};
use log::info;

use crate::error::{FirmwareError, Result};

pub const BASE_PATH: &str = "/spiffs";
const BASE_PATH_C: &CStr = c"/spiffs";

/// Mounts the data partition at [`BASE_PATH`].
pub fn mount() -> Result<()> {
    let conf = esp_vfs_spiffs_conf_t {
        base_path: BASE_PATH_C.as_ptr(),
        partition_label: ptr::null(),
        max_files: 5,
        format_if_mount_failed: false,
    };

    esp!(unsafe { esp_vfs_spiffs_register(&conf) })
        .map_err(|e| FirmwareError::Storage(format!("SPIFFS mount failed: {}", e)))?;

    info!("SPIFFS mounted at {}", BASE_PATH);
    Ok(())
}

pub fn read(name: &str) -> Option<Vec<u8>> {
    std::fs::read(format!("{}/{}", BASE_PATH, name)).ok()
}
