//! Discovery of compatible dongles on the USB bus.

use log::{debug, info};
use nusb::DeviceInfo;

/// VID/PID pair of a recognized dongle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDevice {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl KnownDevice {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    fn matches(&self, info: &DeviceInfo) -> bool {
        info.vendor_id() == self.vendor_id && info.product_id() == self.product_id
    }
}

/// Dongles recognized out of the box.
pub const KNOWN_DEVICES: [KnownDevice; 2] =
    [KnownDevice::new(0x1314, 0x1520), KnownDevice::new(0x1314, 0x1521)];

/// Searches the bus for recognized dongles. The protocol engine itself only
/// needs a bulk endpoint pair, so any VID/PID can be registered.
pub struct DeviceFinder {
    devices: Vec<KnownDevice>,
}

impl Default for DeviceFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceFinder {
    pub fn new() -> Self {
        Self {
            devices: KNOWN_DEVICES.to_vec(),
        }
    }

    pub fn with_custom_devices(custom: &[KnownDevice]) -> Self {
        let mut finder = Self::new();
        finder.devices.extend_from_slice(custom);
        finder
    }

    pub fn add_device(&mut self, vendor_id: u16, product_id: u16) {
        let device = KnownDevice::new(vendor_id, product_id);
        debug!("registered device {vendor_id:04x}:{product_id:04x}");
        self.devices.push(device);
    }

    pub fn known_devices(&self) -> &[KnownDevice] {
        &self.devices
    }

    /// First recognized dongle currently on the bus, if any.
    pub fn find_device(&self) -> Result<Option<DeviceInfo>, nusb::Error> {
        let found = nusb::list_devices()?
            .find(|info| self.devices.iter().any(|device| device.matches(info)));
        if let Some(info) = &found {
            info!(
                "found dongle {:04x}:{:04x}",
                info.vendor_id(),
                info.product_id()
            );
        }
        Ok(found)
    }

    /// All recognized dongles currently on the bus.
    pub fn find_all_devices(&self) -> Result<Vec<DeviceInfo>, nusb::Error> {
        Ok(nusb::list_devices()?
            .filter(|info| self.devices.iter().any(|device| device.matches(info)))
            .collect())
    }
}

/// Find the first dongle using the default recognized set.
pub fn find_dongle() -> Result<Option<DeviceInfo>, nusb::Error> {
    DeviceFinder::new().find_device()
}
