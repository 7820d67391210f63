use crate::config::ConfigurationError;
use crate::frame::{FLAG_DATA, MAX_ADDRESS};
use crate::sensor_frame;
use crate::sensors::{SensorKind, SensorSource};
use crate::transport::Transport;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MAX_SOURCES: usize = 32;

/// Suspension between slots. Injected so tests can run cycles without real time passing.
pub trait Clock {
    fn sleep(&mut self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real time, backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn sleep(&mut self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Records requested suspensions and returns immediately.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    sleeps: std::vec::Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    /// Total simulated time slept.
    pub fn elapsed(&self) -> Duration {
        self.sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&mut self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.sleeps.push(duration);
        std::future::ready(())
    }
}

/// Cooperative cancellation flag, observed only between slots.
#[derive(Debug, Default, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerStats {
    pub cycles_completed: u64,
    pub slots_run: u64,
    pub frames_transmitted: u64,
    pub transport_failures: u64,
    pub encode_failures: u64,
    pub last_error: Option<String>,
}

struct RegisteredSource {
    address: u16,
    source: Box<dyn SensorSource + Send>,
}

impl core::fmt::Debug for RegisteredSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisteredSource")
            .field("address", &self.address)
            .field("kind", &self.source.kind())
            .finish()
    }
}

/// Round-robin TDMA scheduler: one DATA frame per registered source per cycle.
///
/// `slot_duration` is the budget of a whole cycle; each source gets
/// `slot_duration / source_count`. Registration order is transmission order
/// and is frozen once the first cycle starts.
#[derive(Debug)]
pub struct TdmaScheduler {
    sources: Vec<RegisteredSource, MAX_SOURCES>,
    slot_duration: Duration,
    gateway_address: u16,
    state: SchedulerState,
    stop: StopHandle,
    stats: SchedulerStats,
}

impl TdmaScheduler {
    pub fn new(slot_duration: Duration, gateway_address: u16) -> Result<Self, ConfigurationError> {
        if slot_duration.is_zero() {
            return Err(ConfigurationError::InvalidSlotDuration);
        }
        if gateway_address > MAX_ADDRESS {
            return Err(ConfigurationError::AddressOutOfRange(gateway_address));
        }

        Ok(Self {
            sources: Vec::new(),
            slot_duration,
            gateway_address,
            state: SchedulerState::Idle,
            stop: StopHandle::default(),
            stats: SchedulerStats::default(),
        })
    }

    /// Append a source; it transmits with `address` as source address.
    pub fn add_source<S>(&mut self, address: u16, source: S) -> Result<(), ConfigurationError>
    where
        S: SensorSource + Send + 'static,
    {
        if self.state != SchedulerState::Idle {
            return Err(ConfigurationError::AlreadyRunning);
        }
        if address > MAX_ADDRESS {
            return Err(ConfigurationError::AddressOutOfRange(address));
        }

        let kind = source.kind();
        self.sources
            .push(RegisteredSource {
                address,
                source: Box::new(source),
            })
            .map_err(|_| ConfigurationError::TooManySources { max: MAX_SOURCES })?;

        debug!(address, %kind, position = self.sources.len(), "registered sensor source");
        Ok(())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Registered sources in transmission order.
    pub fn sources(&self) -> impl Iterator<Item = (u16, SensorKind)> + '_ {
        self.sources.iter().map(|s| (s.address, s.source.kind()))
    }

    pub fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    pub fn gateway_address(&self) -> u16 {
        self.gateway_address
    }

    /// Suspension after each source's transmission.
    pub fn slot_interval(&self) -> Result<Duration, ConfigurationError> {
        if self.sources.is_empty() {
            return Err(ConfigurationError::NoSourcesRegistered);
        }
        Ok(Duration::from_secs_f64(
            self.slot_duration.as_secs_f64() / self.sources.len() as f64,
        ))
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Run cycles until [`StopHandle::stop`] is observed at a slot boundary.
    ///
    /// A stop requested before the call ends the run before the first slot.
    /// The request is consumed when the run returns, so the scheduler can be
    /// started again.
    pub async fn start<T, C>(&mut self, transport: &mut T, clock: &mut C) -> Result<SchedulerStats, ConfigurationError>
    where
        T: Transport,
        C: Clock,
    {
        self.run(transport, clock, None).await
    }

    /// Run exactly `cycles` full cycles unless stopped earlier.
    pub async fn run_cycles<T, C>(
        &mut self,
        transport: &mut T,
        clock: &mut C,
        cycles: u64,
    ) -> Result<SchedulerStats, ConfigurationError>
    where
        T: Transport,
        C: Clock,
    {
        self.run(transport, clock, Some(cycles)).await
    }

    async fn run<T, C>(
        &mut self,
        transport: &mut T,
        clock: &mut C,
        cycle_limit: Option<u64>,
    ) -> Result<SchedulerStats, ConfigurationError>
    where
        T: Transport,
        C: Clock,
    {
        let interval = self.slot_interval()?;
        self.state = SchedulerState::Running;
        info!(
            sources = self.sources.len(),
            cycle_ms = self.slot_duration.as_millis() as u64,
            slot_ms = interval.as_millis() as u64,
            "TDMA scheduler started"
        );

        let mut cycles_this_run = 0u64;
        'cycles: while !cycle_limit.is_some_and(|limit| cycles_this_run >= limit) {
            for index in 0..self.sources.len() {
                if self.stop.is_stopped() {
                    break 'cycles;
                }

                self.run_slot(index, transport);

                if self.stop.is_stopped() {
                    break 'cycles;
                }
                clock.sleep(interval).await;
            }

            cycles_this_run += 1;
            self.stats.cycles_completed += 1;
            debug!(cycle = self.stats.cycles_completed, "TDMA cycle complete");
        }

        self.state = SchedulerState::Stopped;
        self.stop.reset();
        info!(
            cycles = self.stats.cycles_completed,
            transmitted = self.stats.frames_transmitted,
            failures = self.stats.transport_failures,
            "TDMA scheduler stopped"
        );
        Ok(self.stats.clone())
    }

    /// Read, encode and hand off one source's frame. Failures abandon the slot only.
    fn run_slot<T: Transport>(&mut self, index: usize, transport: &mut T) {
        self.stats.slots_run += 1;
        let gateway = self.gateway_address;
        let slot = &mut self.sources[index];
        let kind = slot.source.kind();
        let value = slot.source.read_value();

        let encoded = kind
            .reading(value)
            .and_then(|reading| sensor_frame::encode(FLAG_DATA, gateway, slot.address, reading));
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(address = slot.address, %kind, value, "cannot encode reading: {}", e);
                self.stats.encode_failures += 1;
                self.stats.last_error = Some(format!("source {}: {}", slot.address, e));
                return;
            }
        };

        match transport.transmit(&bytes) {
            Ok(()) => {
                self.stats.frames_transmitted += 1;
                debug!(address = slot.address, %kind, value, "frame transmitted");
            }
            Err(e) => {
                warn!(address = slot.address, "transmit failed: {}", e);
                self.stats.transport_failures += 1;
                self.stats.last_error = Some(format!("source {}: {}", slot.address, e));
            }
        }
    }
}
