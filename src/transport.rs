//! USB bulk transport: a pair of endpoints exposed as a framed byte channel.

use async_trait::async_trait;
use log::trace;
use nusb::transfer::{Direction, RequestBuffer};
use nusb::{Device, Interface};
use std::time::Duration;
use thiserror::Error;

const CONFIG_NUMBER: u8 = 1;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The read window elapsed with no completed transfer. Expected during
    /// idle periods; callers use it to poll for shutdown.
    #[error("bulk transfer timed out")]
    Timeout,
    #[error("USB transfer error: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),
    #[error("device has no active configuration")]
    NoConfig,
    #[error("no IN endpoint found")]
    NoInEndpoint,
    #[error("no OUT endpoint found")]
    NoOutEndpoint,
}

/// Byte-level channel to the dongle. The session engine depends on this
/// seam only, so tests can substitute a scripted channel.
#[async_trait]
pub trait UsbChannel: Send + Sync {
    /// Read exactly `len` bytes from the IN endpoint, or time out.
    async fn read_exact(&self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Single-shot write to the OUT endpoint; returns bytes accepted.
    async fn write(&self, data: &[u8]) -> Result<usize, TransportError>;
}

/// The real nusb-backed channel. Endpoint handles are owned exclusively;
/// dropping the last reference releases the interface and device.
pub struct Transport {
    interface: Interface,
    in_ep: u8,
    out_ep: u8,
}

impl Transport {
    /// Claim interface (0, 0) of an opened device and resolve its bulk
    /// endpoint pair by transfer direction.
    pub fn open(device: Device) -> Result<Self, TransportError> {
        device.set_configuration(CONFIG_NUMBER)?;
        let config = device
            .active_configuration()
            .map_err(|_| TransportError::NoConfig)?;
        let interface_group = config.interfaces().next().ok_or(TransportError::NoConfig)?;
        let alt_setting = interface_group
            .alt_settings()
            .next()
            .ok_or(TransportError::NoConfig)?;

        let in_ep = alt_setting
            .endpoints()
            .find(|ep| ep.direction() == Direction::In)
            .ok_or(TransportError::NoInEndpoint)?
            .address();
        let out_ep = alt_setting
            .endpoints()
            .find(|ep| ep.direction() == Direction::Out)
            .ok_or(TransportError::NoOutEndpoint)?
            .address();

        let interface = device.claim_interface(interface_group.interface_number())?;

        Ok(Self {
            interface,
            in_ep,
            out_ep,
        })
    }
}

#[async_trait]
impl UsbChannel for Transport {
    async fn read_exact(&self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut buf = Vec::with_capacity(len);
        while buf.len() < len {
            let request = RequestBuffer::new(len - buf.len());
            let transfer = self.interface.bulk_in(self.in_ep, request);
            let chunk = tokio::time::timeout(timeout, transfer)
                .await
                .map_err(|_| TransportError::Timeout)?
                .into_result()?;
            trace!("bulk in: {} bytes", chunk.len());
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    async fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let completion = self
            .interface
            .bulk_out(self.out_ep, data.to_vec())
            .await
            .into_result()?;
        trace!("bulk out: {} bytes", completion.actual_length());
        Ok(completion.actual_length())
    }
}
