//! Watches for devices being connected and disconnected.
//!
//! [`DeviceMonitor`] probes its [`Transport`] on a fixed interval and publishes
//! an event every time the presence of a device changes. Probing never opens
//! the device, so the monitor can run next to a transfer.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use log::{debug, error, info};
use tokio::{
    sync::{broadcast, watch},
    task::{self, JoinHandle},
    time::{self, MissedTickBehavior},
};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use crate::Transport;

/// Time between two probes unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

const EVENT_CAPACITY: usize = 16;

/// Presence of a device as last observed by a [`DeviceMonitor`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ConnectionState {
    /// No probe has completed since monitoring started.
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl From<bool> for ConnectionState {
    fn from(present: bool) -> Self {
        if present {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// Polls a transport for device presence on a background task.
///
/// Events carry `true` when a device was connected and `false` when it was
/// disconnected. The first probe after [`start`](Self::start) always emits.
/// Probes never overlap: ticks that fire while a probe is still running are
/// skipped.
pub struct DeviceMonitor<T> {
    transport: Arc<T>,
    interval: Duration,
    events: broadcast::Sender<bool>,
    state: Arc<watch::Sender<ConnectionState>>,
    run: Option<Run>,
}

/// A started polling task.
struct Run {
    task: JoinHandle<()>,
    active: Arc<AtomicBool>,
}

impl Run {
    fn cancel(self) {
        self.active.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

impl<T: Transport + Send + Sync + 'static> DeviceMonitor<T> {
    pub fn new(transport: Arc<T>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Unknown);

        Self {
            transport,
            interval: DEFAULT_POLL_INTERVAL,
            events,
            state: Arc::new(state),
            run: None,
        }
    }

    /// Sets the time between two probes. Takes effect on the next [`start`](Self::start).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Probes the transport once, on the calling thread.
    pub fn is_device_connected(&self) -> bool {
        self.transport.is_device_connected()
    }

    /// Receives every future connectivity event.
    ///
    /// Dropping the receiver cancels the subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }

    /// Every future connectivity event as a stream.
    ///
    /// Events missed by a slow consumer are skipped.
    pub fn events(&self) -> impl Stream<Item = bool> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| event.ok())
    }

    /// Last observed presence of a device.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receives the last observed presence of a device and its changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.task.is_finished())
    }

    /// Starts probing. Does nothing if the monitor is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.state.send_replace(ConnectionState::Unknown);
        debug!("Starting device monitor every {:?}", self.interval);

        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(poll(
            self.transport.clone(),
            self.interval,
            self.events.clone(),
            self.state.clone(),
            active.clone(),
        ));
        self.run = Some(Run { task, active });
    }

    /// Stops probing.
    ///
    /// A probe in progress completes in the background but is not reported.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel();
            debug!("Stopped device monitor");
        }
    }
}

impl<T> Drop for DeviceMonitor<T> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel();
        }
    }
}

async fn poll<T: Transport + Send + Sync + 'static>(
    transport: Arc<T>,
    period: Duration,
    events: broadcast::Sender<bool>,
    state: Arc<watch::Sender<ConnectionState>>,
    active: Arc<AtomicBool>,
) {
    let mut ticks = time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticks.tick().await;

        let probe = transport.clone();
        let present = match task::spawn_blocking(move || probe.is_device_connected()).await {
            Ok(present) => present,
            Err(e) => {
                error!("Device probe failed: {}", e);
                continue;
            }
        };

        publish(&state, &events, &active, present);
    }
}

/// Records the outcome of a probe, emitting an event if it changed the state.
///
/// Outcomes of a cancelled run are dropped. The check and the event both
/// happen under the state lock, so they are ordered with the reset done by
/// [`DeviceMonitor::start`].
fn publish(
    state: &watch::Sender<ConnectionState>,
    events: &broadcast::Sender<bool>,
    active: &AtomicBool,
    present: bool,
) -> bool {
    state.send_if_modified(|state| {
        let observed = ConnectionState::from(present);
        if !active.load(Ordering::SeqCst) || *state == observed {
            return false;
        }
        *state = observed;

        info!("Device {}", if present { "connected" } else { "disconnected" });
        // Nobody listening is fine.
        _ = events.send(present);
        true
    })
}
