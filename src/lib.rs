//! Host-side protocol engine for USB CarPlay/Android Auto dongles.
//!
//! The dongle negotiates with the phone over Bluetooth/Wi-Fi and exposes a
//! pair of bulk USB endpoints. This crate speaks the framed message protocol
//! on those endpoints: it opens the session, keeps it alive with heartbeats,
//! decodes inbound frames (video, audio, media metadata, lifecycle events)
//! into typed messages, and serializes outbound messages (touch input,
//! microphone audio, configuration, control commands).
//!
//! ```no_run
//! use carlink::{DongleConfig, DongleDriver, find_dongle};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let info = find_dongle()?.ok_or("no dongle connected")?;
//! let mut driver = DongleDriver::new();
//! driver.on_message(|message| println!("{message:?}"));
//! driver.on_failure(|| eprintln!("dongle gone"));
//! driver.initialize(info.open()?).await?;
//! driver.start(&DongleConfig::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Decoding video and playing audio are the caller's business; the engine
//! hands over encoded payloads untouched.

pub mod commands;
pub mod config;
pub mod device_finder;
pub mod driver;
pub mod events;
pub mod message;
pub mod messagetypes;
pub mod readable;
pub mod sendable;
pub mod transport;

pub use commands::CommandMapping;
pub use config::{DongleConfig, HandDriveType, MicType, PhoneTypeConfig, WifiType};
pub use device_finder::{DeviceFinder, KNOWN_DEVICES, KnownDevice, find_dongle};
pub use driver::{DongleDriver, DriverError, DriverState, MAX_ERROR_COUNT, StateError};
pub use events::{EventEmitter, ListenerId};
pub use message::{HeaderError, Message, MessageHeader};
pub use messagetypes::MessageType;
pub use readable::PhoneType;
pub use sendable::{SendableMessage, TouchAction};
pub use transport::{Transport, TransportError, UsbChannel};
