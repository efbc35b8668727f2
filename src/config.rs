//! Dongle session configuration, consumed once at `start`.

use crate::readable::PhoneType;
use std::collections::HashMap;

/// Steering-wheel side reported to the dongle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandDriveType {
    Lhd = 0,
    Rhd = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiType {
    Ghz2_4,
    Ghz5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicType {
    Box,
    Os,
}

/// Per-phone-type tuning. The protocol core exposes this but does not consume
/// it; frame-pacing consumers read `frame_interval`.
#[derive(Debug, Clone)]
pub struct PhoneTypeConfig {
    pub frame_interval: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DongleConfig {
    pub android_work_mode: Option<bool>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub dpi: u32,
    pub format: u32,
    pub i_box_version: u32,
    pub packet_max: u32,
    pub phone_work_mode: u32,
    pub night_mode: bool,
    pub box_name: String,
    pub hand: HandDriveType,
    pub media_delay: u32,
    pub audio_transfer_mode: bool,
    pub wifi_type: WifiType,
    pub mic_type: MicType,
    pub phone_config: HashMap<PhoneType, PhoneTypeConfig>,
}

impl Default for DongleConfig {
    fn default() -> Self {
        let phone_config = HashMap::from([
            (
                PhoneType::CarPlay,
                PhoneTypeConfig {
                    frame_interval: Some(5000),
                },
            ),
            (
                PhoneType::AndroidAuto,
                PhoneTypeConfig {
                    frame_interval: None,
                },
            ),
        ]);

        Self {
            android_work_mode: None,
            width: 800,
            height: 640,
            fps: 20,
            dpi: 160,
            format: 5,
            i_box_version: 2,
            packet_max: 49152,
            phone_work_mode: 2,
            night_mode: false,
            box_name: "nodePlay".to_string(),
            hand: HandDriveType::Lhd,
            media_delay: 300,
            audio_transfer_mode: false,
            wifi_type: WifiType::Ghz5,
            mic_type: MicType::Os,
            phone_config,
        }
    }
}
