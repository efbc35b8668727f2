//! Outbound messages and their wire serialization.

use crate::commands::CommandMapping;
use crate::config::DongleConfig;
use crate::message::MessageHeader;
use crate::messagetypes::MessageType;
use byteorder::{LittleEndian, WriteBytesExt};
use log::warn;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// A message the host can emit. `serialize` produces the complete frame:
/// 16-byte header followed by the payload.
pub trait SendableMessage {
    fn message_type(&self) -> MessageType;

    fn get_payload(&self) -> Vec<u8> {
        Vec::new()
    }

    fn serialize(&self) -> Vec<u8> {
        let data = self.get_payload();
        let header = MessageHeader {
            msg_type: self.message_type(),
            length: data.len() as u32,
        };
        let mut frame = Vec::with_capacity(data.len() + header.to_bytes().len());
        frame.extend(header.to_bytes());
        frame.extend(data);
        frame
    }
}

#[derive(Clone, Debug)]
pub struct SendCommand {
    pub value: CommandMapping,
}

impl SendCommand {
    pub fn new(value: CommandMapping) -> Self {
        Self { value }
    }
}

impl SendableMessage for SendCommand {
    fn message_type(&self) -> MessageType {
        MessageType::Command
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4);
        buf.write_u32::<LittleEndian>(self.value.into()).unwrap();
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down = 14,
    Move = 15,
    Up = 16,
}

/// Single-pointer touch event. Coordinates are fractions of the screen in
/// [0, 1]; the wire carries them scaled to [0, 10000].
#[derive(Clone, Debug)]
pub struct SendTouch {
    pub x: f32,
    pub y: f32,
    pub action: TouchAction,
}

impl SendTouch {
    pub fn new(x: f32, y: f32, action: TouchAction) -> Self {
        Self { x, y, action }
    }

    fn scale(value: f32) -> u32 {
        (10000.0 * value).round().clamp(0.0, 10000.0) as u32
    }
}

impl SendableMessage for SendTouch {
    fn message_type(&self) -> MessageType {
        MessageType::Touch
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.write_u32::<LittleEndian>(self.action as u32).unwrap();
        buf.write_u32::<LittleEndian>(Self::scale(self.x)).unwrap();
        buf.write_u32::<LittleEndian>(Self::scale(self.y)).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf
    }
}

/// Multi-touch uses a different action encoding than single touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiTouchAction {
    Up = 0,
    Down = 1,
    Move = 2,
}

#[derive(Debug, Clone, Copy)]
struct TouchItem {
    x: f32,
    y: f32,
    action: MultiTouchAction,
    id: u32,
}

impl TouchItem {
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.write_f32::<LittleEndian>(self.x).unwrap();
        buf.write_f32::<LittleEndian>(self.y).unwrap();
        buf.write_u32::<LittleEndian>(self.action as u32).unwrap();
        buf.write_u32::<LittleEndian>(self.id).unwrap();
    }
}

#[derive(Clone, Debug)]
pub struct SendMultiTouch {
    touches: Vec<TouchItem>,
}

impl SendMultiTouch {
    pub fn new(touch_data: Vec<(f32, f32, MultiTouchAction)>) -> Self {
        let touches = touch_data
            .into_iter()
            .enumerate()
            .map(|(index, (x, y, action))| TouchItem {
                x,
                y,
                action,
                id: index as u32,
            })
            .collect();
        Self { touches }
    }
}

impl SendableMessage for SendMultiTouch {
    fn message_type(&self) -> MessageType {
        MessageType::MultiTouch
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.touches.len() * 16);
        for item in &self.touches {
            item.write_to(&mut buf);
        }
        buf
    }
}

/// Microphone audio toward the dongle; fixed 16 kHz mono prefix.
pub struct SendAudio {
    data: Vec<i16>,
}

impl SendAudio {
    pub fn new(data: Vec<i16>) -> Self {
        Self { data }
    }
}

impl SendableMessage for SendAudio {
    fn message_type(&self) -> MessageType {
        MessageType::AudioData
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.data.len() * 2);
        buf.write_u32::<LittleEndian>(5).unwrap(); // decode_type
        buf.write_f32::<LittleEndian>(0.0).unwrap(); // volume
        buf.write_u32::<LittleEndian>(3).unwrap(); // audio_type
        for &sample in &self.data {
            buf.write_i16::<LittleEndian>(sample).unwrap();
        }
        buf
    }
}

/// Well-known dongle filesystem destinations for `SendFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAddress {
    Dpi,
    NightMode,
    HandDriveMode,
    ChargeMode,
    BoxName,
    OemIcon,
    AirplayConfig,
    Icon120,
    Icon180,
    Icon250,
    AndroidWorkMode,
}

impl FileAddress {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAddress::Dpi => "/tmp/screen_dpi",
            FileAddress::NightMode => "/tmp/night_mode",
            FileAddress::HandDriveMode => "/tmp/hand_drive_mode",
            FileAddress::ChargeMode => "/tmp/charge_mode",
            FileAddress::BoxName => "/etc/box_name",
            FileAddress::OemIcon => "/etc/oem_icon.png",
            FileAddress::AirplayConfig => "/etc/airplay.conf",
            FileAddress::Icon120 => "/etc/icon_120x120.png",
            FileAddress::Icon180 => "/etc/icon_180x180.png",
            FileAddress::Icon250 => "/etc/icon_256x256.png",
            FileAddress::AndroidWorkMode => "/etc/android_work_mode",
        }
    }
}

/// Write a file on the dongle. Payload: name length, NUL-terminated name,
/// content length, content bytes.
#[derive(Clone, Debug)]
pub struct SendFile {
    content: Vec<u8>,
    file_name: String,
}

impl SendFile {
    pub fn new(content: Vec<u8>, file_name: String) -> Self {
        Self { content, file_name }
    }
}

impl SendableMessage for SendFile {
    fn message_type(&self) -> MessageType {
        MessageType::SendFile
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut name = self.file_name.clone().into_bytes();
        name.push(0);

        let mut buf = Vec::with_capacity(8 + name.len() + self.content.len());
        buf.write_u32::<LittleEndian>(name.len() as u32).unwrap();
        buf.extend_from_slice(&name);
        buf.write_u32::<LittleEndian>(self.content.len() as u32)
            .unwrap();
        buf.extend_from_slice(&self.content);
        buf
    }
}

/// A little-endian u32 written to a dongle file.
pub struct SendNumber {
    inner: SendFile,
}

impl SendNumber {
    pub fn new(content: u32, file: FileAddress) -> Self {
        let inner = SendFile::new(content.to_le_bytes().to_vec(), file.as_str().to_string());
        Self { inner }
    }
}

impl SendableMessage for SendNumber {
    fn message_type(&self) -> MessageType {
        self.inner.message_type()
    }
    fn get_payload(&self) -> Vec<u8> {
        self.inner.get_payload()
    }
}

pub struct SendBoolean {
    inner: SendNumber,
}

impl SendBoolean {
    pub fn new(content: bool, file: FileAddress) -> Self {
        Self {
            inner: SendNumber::new(content as u32, file),
        }
    }
}

impl SendableMessage for SendBoolean {
    fn message_type(&self) -> MessageType {
        self.inner.message_type()
    }
    fn get_payload(&self) -> Vec<u8> {
        self.inner.get_payload()
    }
}

pub struct SendString {
    inner: SendFile,
}

impl SendString {
    pub fn new(content: String, file: FileAddress) -> Self {
        if content.len() > 16 {
            warn!("string for {} exceeds 16 bytes, sending anyway", file.as_str());
        }
        let inner = SendFile::new(content.into_bytes(), file.as_str().to_string());
        Self { inner }
    }
}

impl SendableMessage for SendString {
    fn message_type(&self) -> MessageType {
        self.inner.message_type()
    }
    fn get_payload(&self) -> Vec<u8> {
        self.inner.get_payload()
    }
}

/// Empty liveness frame, emitted every two seconds while a session runs.
#[derive(Clone, Debug)]
pub struct HeartBeat;

impl SendableMessage for HeartBeat {
    fn message_type(&self) -> MessageType {
        MessageType::HeartBeat
    }
}

/// Session open request carrying the projected display parameters.
#[derive(Clone, Debug)]
pub struct SendOpen {
    config: DongleConfig,
}

impl SendOpen {
    pub fn new(config: DongleConfig) -> Self {
        Self { config }
    }
}

impl SendableMessage for SendOpen {
    fn message_type(&self) -> MessageType {
        MessageType::Open
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(28);
        buf.write_u32::<LittleEndian>(self.config.width).unwrap();
        buf.write_u32::<LittleEndian>(self.config.height).unwrap();
        buf.write_u32::<LittleEndian>(self.config.fps).unwrap();
        buf.write_u32::<LittleEndian>(self.config.format).unwrap();
        buf.write_u32::<LittleEndian>(self.config.packet_max)
            .unwrap();
        buf.write_u32::<LittleEndian>(self.config.i_box_version)
            .unwrap();
        buf.write_u32::<LittleEndian>(self.config.phone_work_mode)
            .unwrap();
        buf
    }
}

/// JSON settings blob sent during initialization. `sync_time` defaults to
/// the current epoch seconds.
#[derive(Clone, Debug)]
pub struct SendBoxSettings {
    config: DongleConfig,
    sync_time: Option<u64>,
}

impl SendBoxSettings {
    pub fn new(config: DongleConfig, sync_time: Option<u64>) -> Self {
        Self { config, sync_time }
    }

    fn current_epoch_seconds() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl SendableMessage for SendBoxSettings {
    fn message_type(&self) -> MessageType {
        MessageType::BoxSettings
    }
    fn get_payload(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct BoxSettingsPayload {
            #[serde(rename = "mediaDelay")]
            media_delay: u32,
            #[serde(rename = "syncTime")]
            sync_time: u64,
            #[serde(rename = "androidAutoSizeW")]
            android_auto_size_w: u32,
            #[serde(rename = "androidAutoSizeH")]
            android_auto_size_h: u32,
        }

        let payload = BoxSettingsPayload {
            media_delay: self.config.media_delay,
            sync_time: self.sync_time.unwrap_or_else(Self::current_epoch_seconds),
            android_auto_size_w: self.config.width,
            android_auto_size_h: self.config.height,
        };

        serde_json::to_vec(&payload).unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoType {
    HomeButton = 1,
    Siri = 2,
}

#[derive(Clone, Debug)]
pub struct SendLogoType {
    logo_type: LogoType,
}

impl SendLogoType {
    pub fn new(logo_type: LogoType) -> Self {
        Self { logo_type }
    }
}

impl SendableMessage for SendLogoType {
    fn message_type(&self) -> MessageType {
        MessageType::LogoType
    }
    fn get_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4);
        buf.write_u32::<LittleEndian>(self.logo_type as u32).unwrap();
        buf
    }
}

#[derive(Debug, Default)]
pub struct IconConfig {
    pub label: Option<&'static str>,
}

/// Writes the AirPlay icon configuration file to the dongle.
pub struct SendIconConfig {
    inner: SendFile,
}

impl SendIconConfig {
    pub fn new(config: IconConfig) -> Self {
        let mut value_map = vec![
            ("oemIconVisible", "1"),
            ("name", "AutoBox"),
            ("model", "Magic-Car-Link-1.00"),
            ("oemIconPath", FileAddress::OemIcon.as_str()),
        ];

        if let Some(label) = config.label {
            value_map.push(("oemIconLabel", label));
        }

        let mut file_data = value_map
            .iter()
            .map(|(k, v)| format!("{k} = {v}"))
            .collect::<Vec<_>>()
            .join("\n");
        file_data.push('\n');

        Self {
            inner: SendFile::new(
                file_data.into_bytes(),
                FileAddress::AirplayConfig.as_str().to_string(),
            ),
        }
    }
}

impl SendableMessage for SendIconConfig {
    fn message_type(&self) -> MessageType {
        self.inner.message_type()
    }
    fn get_payload(&self) -> Vec<u8> {
        self.inner.get_payload()
    }
}

/// Disconnect the phone session and shut the dongle down.
#[derive(Clone, Debug)]
pub struct SendCloseDongle;

impl SendableMessage for SendCloseDongle {
    fn message_type(&self) -> MessageType {
        MessageType::CloseDongle
    }
}

/// Disconnect the phone session, keeping the dongle up.
#[derive(Clone, Debug)]
pub struct SendDisconnectPhone;

impl SendableMessage for SendDisconnectPhone {
    fn message_type(&self) -> MessageType {
        MessageType::DisconnectPhone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageHeader;

    #[test]
    fn touch_payload_scales_and_orders_fields() {
        let payload = SendTouch::new(0.5, 0.75, TouchAction::Down).get_payload();
        let mut expected = Vec::new();
        for field in [14u32, 5000, 7500, 0] {
            expected.extend_from_slice(&field.to_le_bytes());
        }
        assert_eq!(payload, expected);
    }

    #[test]
    fn touch_clamps_out_of_range_coordinates() {
        for (x, y) in [(-1.0f32, 2.0f32), (-0.001, 1.0001), (55.0, -55.0)] {
            let payload = SendTouch::new(x, y, TouchAction::Move).get_payload();
            let sx = u32::from_le_bytes(payload[4..8].try_into().unwrap());
            let sy = u32::from_le_bytes(payload[8..12].try_into().unwrap());
            assert!(sx <= 10000);
            assert!(sy <= 10000);
        }
    }

    #[test]
    fn touch_scaling_is_monotone() {
        let mut previous = 0;
        for step in 0..=100 {
            let x = step as f32 / 100.0;
            let payload = SendTouch::new(x, x, TouchAction::Move).get_payload();
            let scaled = u32::from_le_bytes(payload[4..8].try_into().unwrap());
            assert!(scaled >= previous);
            previous = scaled;
        }
        assert_eq!(previous, 10000);
    }

    #[test]
    fn heartbeat_is_a_bare_header() {
        let frame = HeartBeat.serialize();
        assert_eq!(
            frame,
            [
                0xAA, 0x55, 0xAA, 0x55, // magic
                0x00, 0x00, 0x00, 0x00, // length
                0xAA, 0x00, 0x00, 0x00, // type
                0x55, 0xFF, 0xFF, 0xFF, // !type
            ]
        );
    }

    #[test]
    fn open_payload_with_default_config() {
        let payload = SendOpen::new(DongleConfig::default()).get_payload();
        let mut expected = Vec::new();
        for field in [800u32, 640, 20, 5, 49152, 2, 2] {
            expected.extend_from_slice(&field.to_le_bytes());
        }
        assert_eq!(payload, expected);

        let frame = SendOpen::new(DongleConfig::default()).serialize();
        let header = MessageHeader::from_bytes(&frame[..16]).unwrap();
        assert_eq!(u32::from(header.msg_type), 0x01);
        assert_eq!(header.length, 28);
    }

    #[test]
    fn send_file_layout() {
        let payload = SendFile::new(vec![0xA0, 0x00, 0x00, 0x00], "/tmp/screen_dpi".to_string())
            .get_payload();
        let name_len = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
        assert_eq!(name_len, "/tmp/screen_dpi".len() + 1);
        assert_eq!(&payload[4..4 + name_len - 1], b"/tmp/screen_dpi");
        assert_eq!(payload[4 + name_len - 1], 0);
        let content_len =
            u32::from_le_bytes(payload[4 + name_len..8 + name_len].try_into().unwrap());
        assert_eq!(content_len, 4);
        assert_eq!(&payload[8 + name_len..], &[0xA0, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn send_number_writes_little_endian_value() {
        let payload = SendNumber::new(160, FileAddress::Dpi).get_payload();
        assert_eq!(&payload[payload.len() - 4..], &160u32.to_le_bytes());
    }

    #[test]
    fn box_settings_uses_wire_key_names() {
        let config = DongleConfig::default();
        let payload = SendBoxSettings::new(config, Some(1700000000)).get_payload();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["mediaDelay"], 300);
        assert_eq!(value["syncTime"], 1700000000u64);
        assert_eq!(value["androidAutoSizeW"], 800);
        assert_eq!(value["androidAutoSizeH"], 640);
    }

    #[test]
    fn multi_touch_packs_one_record_per_pointer() {
        let payload = SendMultiTouch::new(vec![
            (0.1, 0.2, MultiTouchAction::Down),
            (0.3, 0.4, MultiTouchAction::Up),
        ])
        .get_payload();
        assert_eq!(payload.len(), 32);
        assert_eq!(
            u32::from_le_bytes(payload[8..12].try_into().unwrap()),
            MultiTouchAction::Down as u32
        );
        assert_eq!(u32::from_le_bytes(payload[12..16].try_into().unwrap()), 0);
        assert_eq!(u32::from_le_bytes(payload[28..32].try_into().unwrap()), 1);
    }

    #[test]
    fn audio_frame_has_fixed_prefix() {
        let payload = SendAudio::new(vec![1, -2]).get_payload();
        assert_eq!(u32::from_le_bytes(payload[0..4].try_into().unwrap()), 5);
        assert_eq!(f32::from_le_bytes(payload[4..8].try_into().unwrap()), 0.0);
        assert_eq!(u32::from_le_bytes(payload[8..12].try_into().unwrap()), 3);
        assert_eq!(&payload[12..], &[1, 0, 0xFE, 0xFF]);
    }

    #[test]
    fn icon_config_renders_key_value_file() {
        let payload = SendIconConfig::new(IconConfig {
            label: Some("MyCar"),
        })
        .get_payload();
        let text = String::from_utf8(payload).unwrap();
        assert!(text.contains("/etc/airplay.conf"));
        assert!(text.contains("oemIconLabel = MyCar\n"));
        assert!(text.contains("oemIconPath = /etc/oem_icon.png"));
    }

    #[test]
    fn empty_bodied_messages_serialize_to_bare_headers() {
        for (frame, code) in [
            (SendCloseDongle.serialize(), 0x15u32),
            (SendDisconnectPhone.serialize(), 0x0f),
        ] {
            assert_eq!(frame.len(), 16);
            let header = MessageHeader::from_bytes(&frame).unwrap();
            assert_eq!(u32::from(header.msg_type), code);
            assert_eq!(header.length, 0);
        }
    }

    #[test]
    fn command_round_trips_through_the_codec() {
        let frame = SendCommand::new(crate::commands::CommandMapping::RequestHostUI).serialize();
        let header = MessageHeader::from_bytes(&frame[..16]).unwrap();
        match header.decode_payload(Some(frame[16..].to_vec())) {
            Some(crate::message::Message::Command(cmd)) => {
                assert_eq!(cmd.value, crate::commands::CommandMapping::RequestHostUI)
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }
}
