use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use camstep_embedded::{FirmwareSink, UpdateError, UpdateGuard, UpdateKind, UpdateSession};

use super::device_service::DeviceService;
use crate::configs::Update;

const CHUNK_SIZE: usize = 4096;

/// Writes an image to `<dir>/<kind>.bin`, staged as `.part` until complete.
pub struct FileSink {
    dir: PathBuf,
    target: Option<(PathBuf, File)>,
    kind: UpdateKind,
}

impl FileSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            target: None,
            kind: UpdateKind::default(),
        }
    }

    pub fn image_path(dir: impl AsRef<Path>, kind: UpdateKind) -> PathBuf {
        dir.as_ref().join(format!("{}.bin", kind.label()))
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{}.bin.part", self.kind.label()))
    }
}

impl FirmwareSink for FileSink {
    type Error = io::Error;

    fn begin(&mut self, kind: UpdateKind, total: Option<usize>) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir)?;
        self.kind = kind;

        let path = self.staging_path();
        let file = File::create(&path)?;
        tracing::debug!("receiving {:?} bytes into {:?}", total, path);

        self.target = Some((path, file));
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        match &mut self.target {
            Some((_, file)) => file.write_all(chunk),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "sink not started")),
        }
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        let (path, mut file) = self
            .target
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink not started"))?;

        let result = file.flush().and_then(|_| file.sync_all());
        drop(file);

        let result = result.and_then(|_| fs::rename(&path, Self::image_path(&self.dir, self.kind)));
        if result.is_err() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("could not remove {:?}: {}", path, e);
            }
        }

        result
    }

    fn abort(&mut self) {
        if let Some((path, file)) = self.target.take() {
            drop(file);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("could not remove {:?}: {}", path, e);
            }
        }
    }
}

/// Fires the bank's update hooks, locking it only for the duration of each hook.
struct LockedGuard<'a> {
    device: &'a DeviceService,
}

impl UpdateGuard for LockedGuard<'_> {
    fn on_update_start(&mut self, kind: UpdateKind) {
        if let Err(e) = self.device.with_bank(|bank, _| bank.on_update_start(kind)) {
            tracing::error!("update start hook: {}", e);
        }
    }

    fn on_update_error(&mut self, error: UpdateError) {
        if let Err(e) = self.device.with_bank(|bank, _| bank.on_update_error(error)) {
            tracing::error!("update error hook: {}", e);
        }
    }

    fn on_update_end(&mut self) {
        if let Err(e) = self.device.with_bank(|bank, _| bank.on_update_end()) {
            tracing::error!("update end hook: {}", e);
        }
    }
}

#[derive(Clone)]
pub struct UpdateService {
    device: DeviceService,
    settings: Update,
}

impl UpdateService {
    pub fn new(device: DeviceService, settings: Update) -> Self {
        Self { device, settings }
    }

    pub fn device(&self) -> &DeviceService {
        &self.device
    }

    /// Streams `image` through an update session in fixed-size chunks.
    pub fn apply(
        &self,
        kind: UpdateKind,
        password: Option<&str>,
        image: &[u8],
    ) -> Result<(), UpdateError> {
        let mut guard = LockedGuard {
            device: &self.device,
        };

        let mut session = UpdateSession::begin(
            FileSink::new(&self.settings.dir),
            kind,
            Some(image.len()),
            &self.settings.password,
            password,
            &mut guard,
        )?;

        for chunk in image.chunks(CHUNK_SIZE) {
            session.write(chunk, &mut guard)?;
        }

        session.finish(&mut guard)
    }
}
