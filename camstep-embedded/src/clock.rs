use core::cell::Cell;

/// Monotonic millisecond source the control loop and dispatcher read deadlines against.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

#[cfg(feature = "embassy")]
#[derive(Debug, Clone)]
pub struct EmbassyClock {
    boot_instant: embassy_time::Instant,
}

#[cfg(feature = "embassy")]
impl EmbassyClock {
    pub fn new() -> Self {
        Self {
            boot_instant: embassy_time::Instant::now(),
        }
    }
}

#[cfg(feature = "embassy")]
impl Default for EmbassyClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embassy")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        self.boot_instant.elapsed().as_millis()
    }
}

#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct StdClock {
    boot_instant: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            boot_instant: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.boot_instant.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for simulated ticks.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
