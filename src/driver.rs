//! Session engine: owns the transport, drives the lifecycle state machine,
//! and multiplexes the read loop, the heartbeat, and caller sends.

use crate::commands::CommandMapping::*;
use crate::config::{DongleConfig, MicType, WifiType};
use crate::events::{EventEmitter, ListenerId};
use crate::message::{HEADER_SIZE, Message, MessageHeader};
use crate::sendable::{
    FileAddress, HeartBeat, SendBoolean, SendBoxSettings, SendCommand, SendNumber, SendOpen,
    SendString, SendableMessage,
};
use crate::transport::{Transport, TransportError, UsbChannel};
use log::{error, info, warn};
use nusb::Device;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

pub const MAX_ERROR_COUNT: u32 = 5;
const READ_TIMEOUT: Duration = Duration::from_millis(1000);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
const WIFI_CONNECT_DELAY: Duration = Duration::from_secs(1);
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum StateError {
    #[error("not initialized - call initialize first")]
    NotInitialized,
    #[error("already running")]
    AlreadyRunning,
    #[error("closed - a closed driver cannot be reused")]
    Closed,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("illegal driver state: {0}")]
    State(#[from] StateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DriverState {
    Uninitialized = 0,
    Initialized = 1,
    Running = 2,
    Closed = 3,
}

impl DriverState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => DriverState::Uninitialized,
            1 => DriverState::Initialized,
            2 => DriverState::Running,
            _ => DriverState::Closed,
        }
    }
}

/// State shared with the background tasks. The write lock serializes every
/// frame onto the OUT endpoint so caller sends, the heartbeat and the
/// initialization burst never interleave bytes.
struct DriverShared {
    state: AtomicU8,
    error_count: AtomicU32,
    channel: RwLock<Option<Arc<dyn UsbChannel>>>,
    write_lock: tokio::sync::Mutex<()>,
    stop: watch::Sender<bool>,
    events: EventEmitter,
}

impl DriverShared {
    fn state(&self) -> DriverState {
        DriverState::from_raw(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: DriverState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.state() == DriverState::Running
    }

    fn channel(&self) -> Option<Arc<dyn UsbChannel>> {
        self.channel.read().unwrap().clone()
    }

    /// Signal stop and release the transport. Safe to call from inside a
    /// background task; joining is left to the owner.
    fn shut_down(&self) {
        self.set_state(DriverState::Closed);
        self.stop.send_replace(true);
        *self.channel.write().unwrap() = None;
    }

    async fn send<M: SendableMessage + ?Sized>(&self, message: &M) -> Option<bool> {
        let channel = self.channel()?;
        let frame = message.serialize();
        let _write_guard = self.write_lock.lock().await;
        match channel.write(&frame).await {
            Ok(written) => Some(written == frame.len()),
            Err(err) => {
                error!("failure sending message to dongle: {err}");
                Some(false)
            }
        }
    }
}

/// Driver for one dongle session.
///
/// Lifecycle: `initialize` attaches the transport, `start` performs the
/// configuration burst and spawns the background tasks, `close` tears
/// everything down. A closed driver is spent; connect again with a fresh
/// instance.
pub struct DongleDriver {
    shared: Arc<DriverShared>,
    read_handle: Option<JoinHandle<()>>,
    heartbeat_handle: Option<JoinHandle<()>>,
}

impl Default for DongleDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DongleDriver {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            shared: Arc::new(DriverShared {
                state: AtomicU8::new(DriverState::Uninitialized as u8),
                error_count: AtomicU32::new(0),
                channel: RwLock::new(None),
                write_lock: tokio::sync::Mutex::new(()),
                stop,
                events: EventEmitter::new(),
            }),
            read_handle: None,
            heartbeat_handle: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.shared.state()
    }

    pub fn error_count(&self) -> u32 {
        self.shared.error_count.load(Ordering::SeqCst)
    }

    pub fn on_message(&self, listener: impl Fn(&Message) + Send + Sync + 'static) -> ListenerId {
        self.shared.events.on_message(listener)
    }

    pub fn on_failure(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.shared.events.on_failure(listener)
    }

    pub fn remove_message_listener(&self, id: ListenerId) {
        self.shared.events.remove_message_listener(id);
    }

    pub fn remove_failure_listener(&self, id: ListenerId) {
        self.shared.events.remove_failure_listener(id);
    }

    /// Open the USB transport for `device`. A no-op when already
    /// initialized; on failure the driver is closed and the error surfaced.
    pub async fn initialize(&mut self, device: Device) -> Result<(), DriverError> {
        match self.shared.state() {
            DriverState::Initialized | DriverState::Running => return Ok(()),
            DriverState::Closed => return Err(StateError::Closed.into()),
            DriverState::Uninitialized => {}
        }

        info!("initializing dongle transport");
        match Transport::open(device) {
            Ok(transport) => {
                self.attach_channel(Arc::new(transport));
                Ok(())
            }
            Err(err) => {
                self.close().await;
                Err(err.into())
            }
        }
    }

    /// Attach an already-open byte channel instead of claiming a USB device.
    pub fn initialize_channel(&mut self, channel: Arc<dyn UsbChannel>) -> Result<(), DriverError> {
        match self.shared.state() {
            DriverState::Initialized | DriverState::Running => Ok(()),
            DriverState::Closed => Err(StateError::Closed.into()),
            DriverState::Uninitialized => {
                self.attach_channel(channel);
                Ok(())
            }
        }
    }

    fn attach_channel(&self, channel: Arc<dyn UsbChannel>) {
        *self.shared.channel.write().unwrap() = Some(channel);
        self.shared.set_state(DriverState::Initialized);
    }

    /// Serialize and write one message. `None` when no transport is
    /// attached; otherwise whether the complete frame was written. Write
    /// failures are the caller's concern and never count toward the
    /// session error ceiling.
    pub async fn send<M: SendableMessage + ?Sized>(&self, message: &M) -> Option<bool> {
        self.shared.send(message).await
    }

    /// Configure the dongle and bring the session up: emits the
    /// initialization burst in order, waits one second, requests the Wi-Fi
    /// connect, then spawns the read and heartbeat tasks.
    pub async fn start(&mut self, config: &DongleConfig) -> Result<(), DriverError> {
        match self.shared.state() {
            DriverState::Initialized => {}
            DriverState::Uninitialized => return Err(StateError::NotInitialized.into()),
            DriverState::Running => return Err(StateError::AlreadyRunning.into()),
            DriverState::Closed => return Err(StateError::Closed.into()),
        }

        self.shared.error_count.store(0, Ordering::SeqCst);

        let mut burst: Vec<Box<dyn SendableMessage + Send + Sync>> = vec![
            Box::new(SendNumber::new(config.dpi, FileAddress::Dpi)),
            Box::new(SendOpen::new(config.clone())),
            Box::new(SendBoolean::new(config.night_mode, FileAddress::NightMode)),
            Box::new(SendNumber::new(
                config.hand as u32,
                FileAddress::HandDriveMode,
            )),
            Box::new(SendBoolean::new(true, FileAddress::ChargeMode)),
            Box::new(SendString::new(
                config.box_name.clone(),
                FileAddress::BoxName,
            )),
            Box::new(SendBoxSettings::new(config.clone(), None)),
            Box::new(SendCommand::new(WifiEnable)),
            Box::new(SendCommand::new(match config.wifi_type {
                WifiType::Ghz5 => Wifi5g,
                WifiType::Ghz2_4 => Wifi24g,
            })),
            Box::new(SendCommand::new(match config.mic_type {
                MicType::Box => BoxMic,
                MicType::Os => Mic,
            })),
            Box::new(SendCommand::new(if config.audio_transfer_mode {
                AudioTransferOn
            } else {
                AudioTransferOff
            })),
        ];
        if let Some(mode) = config.android_work_mode {
            burst.push(Box::new(SendBoolean::new(
                mode,
                FileAddress::AndroidWorkMode,
            )));
        }

        for message in &burst {
            self.shared.send(message.as_ref()).await;
        }

        time::sleep(WIFI_CONNECT_DELAY).await;
        self.shared.send(&SendCommand::new(WifiConnect)).await;

        self.shared.set_state(DriverState::Running);
        self.read_handle = Some(tokio::spawn(read_loop(self.shared.clone())));
        self.heartbeat_handle = Some(tokio::spawn(heartbeat_loop(
            self.shared.clone(),
            self.shared.stop.subscribe(),
        )));

        Ok(())
    }

    /// Stop the background tasks and release the transport. Idempotent;
    /// after closing, `send` returns `None`.
    pub async fn close(&mut self) {
        self.shared.shut_down();
        for handle in [self.heartbeat_handle.take(), self.read_handle.take()]
            .into_iter()
            .flatten()
        {
            if time::timeout(TASK_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("background task did not stop within {TASK_JOIN_TIMEOUT:?}");
            }
        }
    }
}

/// Read loop. Header failures and USB errors count toward the ceiling;
/// timeouts are the shutdown polling point. On reaching the ceiling the
/// task shuts the session down itself and emits `failure`.
async fn read_loop(shared: Arc<DriverShared>) {
    let Some(channel) = shared.channel() else {
        return;
    };

    while shared.is_running() {
        if shared.error_count.load(Ordering::SeqCst) >= MAX_ERROR_COUNT {
            error!("too many read errors, giving up on the dongle");
            shared.shut_down();
            shared.events.emit_failure();
            return;
        }

        let header_data = match channel.read_exact(HEADER_SIZE, READ_TIMEOUT).await {
            Ok(data) => data,
            Err(TransportError::Timeout) => continue,
            Err(err) => {
                error!("USB error in read loop: {err}");
                shared.error_count.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        let header = match MessageHeader::from_bytes(&header_data) {
            Ok(header) => header,
            Err(err) => {
                error!("error parsing header: {err}");
                shared.error_count.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        let payload = if header.length > 0 {
            match channel
                .read_exact(header.length as usize, READ_TIMEOUT)
                .await
            {
                Ok(data) => Some(data),
                Err(err) => {
                    // Payload loss is logged only; the next header read
                    // either re-synchronizes or times out.
                    error!("failed to read {}-byte payload: {err}", header.length);
                    continue;
                }
            }
        } else {
            None
        };

        if let Some(message) = header.decode_payload(payload) {
            shared.events.emit_message(&message);
        }
    }
}

/// Heartbeat loop: one empty frame every two seconds. A failed send is
/// logged and the loop keeps going; only a stop signal or a detached
/// channel ends it.
async fn heartbeat_loop(shared: Arc<DriverShared>, mut stop: watch::Receiver<bool>) {
    let mut interval = time::interval(HEARTBEAT_INTERVAL);
    while shared.is_running() {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.changed() => return,
        }
        if !shared.is_running() {
            return;
        }
        match shared.send(&HeartBeat).await {
            Some(true) => {}
            Some(false) => warn!("heartbeat send failed"),
            None => return,
        }
    }
}
