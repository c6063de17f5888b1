use std::ptr;

use camstep_embedded::{FirmwareSink, UpdateKind};
use esp_idf_svc::ota::{EspOta, EspOtaUpdate};
use esp_idf_svc::sys::{
    esp, esp_partition_erase_range, esp_partition_find_first, esp_partition_subtype_t_ESP_PARTITION_SUBTYPE_DATA_SPIFFS,
    esp_partition_t, esp_partition_type_t_ESP_PARTITION_TYPE_DATA, esp_partition_write,
};
use log::info;

use crate::error::FirmwareError;

/// Application images go through `EspOta`; filesystem images are written raw to the SPIFFS partition.
pub struct OtaSink<'a> {
    ota: Option<&'a mut EspOta>,
    target: Target<'a>,
}

enum Target<'a> {
    Idle,
    App(EspOtaUpdate<'a>),
    Data {
        partition: *const esp_partition_t,
        offset: usize,
    },
}

impl<'a> OtaSink<'a> {
    pub fn new(ota: &'a mut EspOta) -> Self {
        Self {
            ota: Some(ota),
            target: Target::Idle,
        }
    }

    fn begin_data(&mut self, total: Option<usize>) -> Result<(), FirmwareError> {
        let partition = unsafe {
            esp_partition_find_first(
                esp_partition_type_t_ESP_PARTITION_TYPE_DATA,
                esp_partition_subtype_t_ESP_PARTITION_SUBTYPE_DATA_SPIFFS,
                ptr::null(),
            )
        };
        if partition.is_null() {
            return Err(FirmwareError::Update("no spiffs partition".into()));
        }

        let size = unsafe { (*partition).size } as usize;
        if total.is_some_and(|total| total > size) {
            return Err(FirmwareError::Update(format!("image larger than {} bytes", size)));
        }

        esp!(unsafe { esp_partition_erase_range(partition, 0, size) })?;
        self.target = Target::Data {
            partition,
            offset: 0,
        };
        Ok(())
    }
}

impl FirmwareSink for OtaSink<'_> {
    type Error = FirmwareError;

    fn begin(&mut self, kind: UpdateKind, total: Option<usize>) -> Result<(), Self::Error> {
        info!("OTA begin: {} ({:?} bytes)", kind.label(), total);

        match kind {
            UpdateKind::Firmware => {
                let ota = self
                    .ota
                    .take()
                    .ok_or_else(|| FirmwareError::Update("OTA handle already in use".into()))?;
                self.target = Target::App(ota.initiate_update()?);
                Ok(())
            }
            UpdateKind::Filesystem => self.begin_data(total),
        }
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        match &mut self.target {
            Target::App(update) => Ok(update.write(chunk)?),
            Target::Data { partition, offset } => {
                esp!(unsafe {
                    esp_partition_write(*partition, *offset, chunk.as_ptr().cast(), chunk.len())
                })?;
                *offset += chunk.len();
                Ok(())
            }
            Target::Idle => Err(FirmwareError::Update("update not started".into())),
        }
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        match std::mem::replace(&mut self.target, Target::Idle) {
            Target::App(update) => Ok(update.complete()?),
            Target::Data { offset, .. } => {
                info!("filesystem image written: {} bytes", offset);
                Ok(())
            }
            Target::Idle => Err(FirmwareError::Update("update not started".into())),
        }
    }

    fn abort(&mut self) {
        if let Target::App(update) = std::mem::replace(&mut self.target, Target::Idle) {
            if let Err(e) = update.abort() {
                log::warn!("OTA abort failed: {}", e);
            }
        }
    }
}
