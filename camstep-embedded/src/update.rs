use core::fmt;

use crate::bank::MotorBank;
use crate::stepper::Motor;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    #[default]
    Firmware,
    Filesystem,
}

impl UpdateKind {
    /// `filesystem` selects the data partition image; anything else is application firmware.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("filesystem") => UpdateKind::Filesystem,
            _ => UpdateKind::Firmware,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UpdateKind::Firmware => "sketch",
            UpdateKind::Filesystem => "filesystem",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    Auth,
    Begin,
    Connect,
    Receive,
    End,
}

impl UpdateError {
    pub fn code(self) -> u8 {
        match self {
            UpdateError::Auth => 0,
            UpdateError::Begin => 1,
            UpdateError::Connect => 2,
            UpdateError::Receive => 3,
            UpdateError::End => 4,
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::Auth => write!(f, "Auth Failed"),
            UpdateError::Begin => write!(f, "Begin Failed"),
            UpdateError::Connect => write!(f, "Connect Failed"),
            UpdateError::Receive => write!(f, "Receive Failed"),
            UpdateError::End => write!(f, "End Failed"),
        }
    }
}

impl core::error::Error for UpdateError {}

/// Hooks the update transport fires around an image transfer.
pub trait UpdateGuard {
    fn on_update_start(&mut self, kind: UpdateKind);

    fn on_update_error(&mut self, error: UpdateError);

    fn on_update_end(&mut self);
}

impl<M: Motor> UpdateGuard for MotorBank<M> {
    /// Motors must not move while flash is being rewritten.
    fn on_update_start(&mut self, kind: UpdateKind) {
        log::info!("[update] start: {}", kind.label());
        self.halt_all();
    }

    /// Drivers come back powered, but no run is resumed.
    fn on_update_error(&mut self, error: UpdateError) {
        log::error!("[update] error[{}]: {}", error.code(), error);
        self.reenable_drivers();
    }

    fn on_update_end(&mut self) {
        log::info!("[update] complete");
    }
}

/// Destination for an uploaded image: an OTA partition on the device, a file on the host.
pub trait FirmwareSink {
    type Error: fmt::Debug;

    fn begin(&mut self, kind: UpdateKind, total: Option<usize>) -> Result<(), Self::Error>;

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error>;

    fn complete(&mut self) -> Result<(), Self::Error>;

    fn abort(&mut self);
}

/// One image transfer. Every failure path aborts the sink and fires `on_update_error`.
///
/// The guard is passed per call so that a transport holding the bank behind a mutex
/// only locks it for the hook itself, not for the whole upload.
pub struct UpdateSession<S: FirmwareSink> {
    sink: S,
    kind: UpdateKind,
    total: Option<usize>,
    received: usize,
    last_percent: Option<u8>,
}

impl<S: FirmwareSink> UpdateSession<S> {
    /// An empty `expected_password` disables the check.
    pub fn begin<G: UpdateGuard + ?Sized>(
        mut sink: S,
        kind: UpdateKind,
        total: Option<usize>,
        expected_password: &str,
        password: Option<&str>,
        guard: &mut G,
    ) -> Result<Self, UpdateError> {
        if !expected_password.is_empty() && password != Some(expected_password) {
            guard.on_update_error(UpdateError::Auth);
            return Err(UpdateError::Auth);
        }

        guard.on_update_start(kind);

        if let Err(err) = sink.begin(kind, total) {
            log::error!("[update] sink refused to begin: {:?}", err);
            sink.abort();
            guard.on_update_error(UpdateError::Begin);
            return Err(UpdateError::Begin);
        }

        Ok(Self {
            sink,
            kind,
            total,
            received: 0,
            last_percent: None,
        })
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    pub fn received(&self) -> usize {
        self.received
    }

    /// Current progress in percent, `None` when the total size was not announced.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some((self.received.min(total) * 100 / total) as u8),
            None => None,
        }
    }

    pub fn write<G: UpdateGuard + ?Sized>(
        &mut self,
        chunk: &[u8],
        guard: &mut G,
    ) -> Result<(), UpdateError> {
        if let Err(err) = self.sink.write(chunk) {
            log::error!("[update] write failed after {} bytes: {:?}", self.received, err);
            self.sink.abort();
            guard.on_update_error(UpdateError::Receive);
            return Err(UpdateError::Receive);
        }

        self.received += chunk.len();

        let percent = self.percent();
        if percent.is_some() && percent != self.last_percent {
            self.last_percent = percent;
            log::debug!("[update] progress: {}%", percent.unwrap_or_default());
        }

        Ok(())
    }

    /// Fails with `End` if the byte count disagrees with the announced total.
    pub fn finish<G: UpdateGuard + ?Sized>(mut self, guard: &mut G) -> Result<(), UpdateError> {
        if let Some(total) = self.total {
            if total != self.received {
                log::error!(
                    "[update] size mismatch: expected {} bytes, got {}",
                    total,
                    self.received
                );
                return self.abort(UpdateError::End, guard);
            }
        }

        if let Err(err) = self.sink.complete() {
            log::error!("[update] finalize failed: {:?}", err);
            guard.on_update_error(UpdateError::End);
            return Err(UpdateError::End);
        }

        guard.on_update_end();
        Ok(())
    }

    /// Abandons the transfer, e.g. when the connection drops (`Connect`).
    pub fn abort<G: UpdateGuard + ?Sized>(
        mut self,
        error: UpdateError,
        guard: &mut G,
    ) -> Result<(), UpdateError> {
        self.sink.abort();
        guard.on_update_error(error);
        Err(error)
    }
}
