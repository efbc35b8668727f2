//! Inbound message payloads and their parsers.
//!
//! Every parser is fallible: a payload that is too short for its layout (or
//! carries malformed JSON) yields a [`PayloadError`] which the codec logs and
//! turns into a skipped frame. Parsers never panic on wire data.

use crate::commands::CommandMapping;
use crate::message::MessageHeader;
use byteorder::{ByteOrder, LittleEndian};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown audio command code: {0}")]
    UnknownAudioCommand(i8),
}

fn require_len(data: &[u8], expected: usize) -> Result<(), PayloadError> {
    if data.len() < expected {
        return Err(PayloadError::Truncated {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Stream-control codes delivered inline in a one-byte `AudioData` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AudioCommand {
    AudioOutputStart = 1,
    AudioOutputStop = 2,
    AudioInputConfig = 3,
    AudioPhonecallStart = 4,
    AudioPhonecallStop = 5,
    AudioNaviStart = 6,
    AudioNaviStop = 7,
    AudioSiriStart = 8,
    AudioSiriStop = 9,
    AudioMediaStart = 10,
    AudioMediaStop = 11,
    AudioAlertStart = 12,
    AudioAlertStop = 13,
}

impl AudioCommand {
    fn from_raw(value: i8) -> Option<Self> {
        use AudioCommand::*;
        match value {
            1 => Some(AudioOutputStart),
            2 => Some(AudioOutputStop),
            3 => Some(AudioInputConfig),
            4 => Some(AudioPhonecallStart),
            5 => Some(AudioPhonecallStop),
            6 => Some(AudioNaviStart),
            7 => Some(AudioNaviStop),
            8 => Some(AudioSiriStart),
            9 => Some(AudioSiriStop),
            10 => Some(AudioMediaStart),
            11 => Some(AudioMediaStop),
            12 => Some(AudioAlertStart),
            13 => Some(AudioAlertStop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhoneType {
    AndroidMirror,
    CarPlay,
    IphoneMirror,
    AndroidAuto,
    HiCar,
    Unknown(u32),
}

impl From<u32> for PhoneType {
    fn from(value: u32) -> Self {
        use PhoneType::*;
        match value {
            1 => AndroidMirror,
            3 => CarPlay,
            4 => IphoneMirror,
            5 => AndroidAuto,
            6 => HiCar,
            other => Unknown(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub header: MessageHeader,
    pub value: CommandMapping,
}

impl Command {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 4)?;
        Ok(Command {
            header,
            value: CommandMapping::from(LittleEndian::read_u32(&data[0..4])),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ManufacturerInfo {
    pub header: MessageHeader,
    pub a: u32,
    pub b: u32,
}

impl ManufacturerInfo {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 8)?;
        Ok(ManufacturerInfo {
            header,
            a: LittleEndian::read_u32(&data[0..4]),
            b: LittleEndian::read_u32(&data[4..8]),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SoftwareVersion {
    pub header: MessageHeader,
    pub version: String,
}

impl SoftwareVersion {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(SoftwareVersion {
            header,
            version: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BluetoothAddress {
    pub header: MessageHeader,
    pub address: String,
}

impl BluetoothAddress {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(BluetoothAddress {
            header,
            address: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BluetoothPIN {
    pub header: MessageHeader,
    pub pin: String,
}

impl BluetoothPIN {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(BluetoothPIN {
            header,
            pin: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BluetoothDeviceName {
    pub header: MessageHeader,
    pub name: String,
}

impl BluetoothDeviceName {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(BluetoothDeviceName {
            header,
            name: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct WifiDeviceName {
    pub header: MessageHeader,
    pub name: String,
}

impl WifiDeviceName {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(WifiDeviceName {
            header,
            name: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HiCarLink {
    pub header: MessageHeader,
    pub link: String,
}

impl HiCarLink {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(HiCarLink {
            header,
            link: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BluetoothPairedList {
    pub header: MessageHeader,
    pub data: String,
}

impl BluetoothPairedList {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(BluetoothPairedList {
            header,
            data: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

/// Phone plugged in; eight-byte payloads additionally report Wi-Fi
/// availability.
#[derive(Debug, Clone)]
pub struct Plugged {
    pub header: MessageHeader,
    pub phone_type: PhoneType,
    pub wifi: Option<u32>,
}

impl Plugged {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 4)?;
        let phone_type = PhoneType::from(LittleEndian::read_u32(&data[0..4]));
        let wifi = if data.len() == 8 {
            Some(LittleEndian::read_u32(&data[4..8]))
        } else {
            None
        };

        info!(
            "phone plugged: type {:?}, wifi {}",
            phone_type,
            match wifi {
                Some(w) => format!("available ({w})"),
                None => "not available".to_string(),
            }
        );

        Ok(Plugged {
            header,
            phone_type,
            wifi,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Unplugged {
    pub header: MessageHeader,
}

#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
}

lazy_static::lazy_static! {
    /// `decode_type` → S16LE PCM stream parameters.
    pub static ref DECODE_TYPE_MAP: HashMap<u32, AudioFormat> = {
        let mut m = HashMap::new();
        m.insert(1, AudioFormat { sample_rate: 44100, channels: 2, bit_depth: 16 });
        m.insert(2, AudioFormat { sample_rate: 44100, channels: 2, bit_depth: 16 });
        m.insert(3, AudioFormat { sample_rate: 8000, channels: 1, bit_depth: 16 });
        m.insert(4, AudioFormat { sample_rate: 48000, channels: 2, bit_depth: 16 });
        m.insert(5, AudioFormat { sample_rate: 16000, channels: 1, bit_depth: 16 });
        m.insert(6, AudioFormat { sample_rate: 24000, channels: 1, bit_depth: 16 });
        m.insert(7, AudioFormat { sample_rate: 16000, channels: 2, bit_depth: 16 });
        m
    };
}

/// Audio frame. After the fixed 12-byte prefix the remainder is one of: a
/// single command byte, a 4-byte volume ramp duration, or raw S16LE samples.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub header: MessageHeader,
    pub command: Option<AudioCommand>,
    pub decode_type: u32,
    pub volume: f32,
    pub volume_duration: Option<f32>,
    pub audio_type: u32,
    pub data: Option<Vec<i16>>,
}

impl AudioData {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 12)?;
        let decode_type = LittleEndian::read_u32(&data[0..4]);
        let volume = LittleEndian::read_f32(&data[4..8]);
        let audio_type = LittleEndian::read_u32(&data[8..12]);

        let rest = &data[12..];
        let (command, volume_duration, samples) = match rest.len() {
            1 => {
                let raw = rest[0] as i8;
                let command =
                    AudioCommand::from_raw(raw).ok_or(PayloadError::UnknownAudioCommand(raw))?;
                (Some(command), None, None)
            }
            4 => (None, Some(LittleEndian::read_f32(rest)), None),
            _ => {
                let samples = rest
                    .chunks_exact(2)
                    .map(LittleEndian::read_i16)
                    .collect::<Vec<_>>();
                (None, None, Some(samples))
            }
        };

        Ok(AudioData {
            header,
            command,
            decode_type,
            volume,
            volume_duration,
            audio_type,
            data: samples,
        })
    }

    pub fn audio_format(&self) -> Option<&'static AudioFormat> {
        DECODE_TYPE_MAP.get(&self.decode_type)
    }
}

/// Encoded video frame. The 20-byte prefix describes the frame; the remainder
/// is the opaque encoded bitstream, delivered to the caller undecoded.
#[derive(Debug, Clone)]
pub struct VideoData {
    pub header: MessageHeader,
    pub width: u32,
    pub height: u32,
    pub flags: u32,
    pub length: u32,
    pub unknown: u32,
    pub data: Vec<u8>,
}

impl VideoData {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 20)?;
        Ok(VideoData {
            header,
            width: LittleEndian::read_u32(&data[0..4]),
            height: LittleEndian::read_u32(&data[4..8]),
            flags: LittleEndian::read_u32(&data[8..12]),
            length: LittleEndian::read_u32(&data[12..16]),
            unknown: LittleEndian::read_u32(&data[16..20]),
            data: data[20..].to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MediaType {
    Data = 1,
    AlbumCover = 3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(rename = "MediaSongName")]
    pub media_song_name: Option<String>,
    #[serde(rename = "MediaAlbumName")]
    pub media_album_name: Option<String>,
    #[serde(rename = "MediaArtistName")]
    pub media_artist_name: Option<String>,
    #[serde(rename = "MediaAPPName")]
    pub media_app_name: Option<String>,
    #[serde(rename = "MediaSongDuration")]
    pub media_song_duration: Option<f64>,
    #[serde(rename = "MediaSongPlayTime")]
    pub media_song_play_time: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum MediaPayload {
    Data { media: MediaInfo },
    AlbumCover { base64_image: String },
}

/// Now-playing metadata or album art. An unexpected media type is reported
/// with `payload: None` rather than dropped, so the caller still sees the
/// frame.
#[derive(Debug, Clone)]
pub struct MediaData {
    pub header: MessageHeader,
    pub payload: Option<MediaPayload>,
}

impl MediaData {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        use base64::{Engine as _, engine::general_purpose};
        require_len(data, 4)?;
        let media_type = LittleEndian::read_u32(&data[0..4]);

        let payload = match media_type {
            1 => {
                // JSON metadata carries a trailing NUL.
                require_len(data, 5)?;
                let media_data = &data[4..data.len() - 1];
                let media = serde_json::from_slice::<MediaInfo>(media_data)?;
                Some(MediaPayload::Data { media })
            }
            3 => Some(MediaPayload::AlbumCover {
                base64_image: general_purpose::STANDARD.encode(&data[4..]),
            }),
            other => {
                warn!("unexpected media type: {other}");
                None
            }
        };

        Ok(MediaData { header, payload })
    }
}

/// Dongle's acknowledgement of the session `Open` request.
#[derive(Debug, Clone)]
pub struct Opened {
    pub header: MessageHeader,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: u32,
    pub packet_max: u32,
    pub i_box: u32,
    pub phone_mode: u32,
}

impl Opened {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 28)?;
        Ok(Opened {
            header,
            width: LittleEndian::read_u32(&data[0..4]),
            height: LittleEndian::read_u32(&data[4..8]),
            fps: LittleEndian::read_u32(&data[8..12]),
            format: LittleEndian::read_u32(&data[12..16]),
            packet_max: LittleEndian::read_u32(&data[16..20]),
            i_box: LittleEndian::read_u32(&data[20..24]),
            phone_mode: LittleEndian::read_u32(&data[24..28]),
        })
    }
}

/// Dongle-reported settings blob. The shape varies by firmware, so the JSON
/// is kept as a value rather than forced into one schema.
#[derive(Debug, Clone)]
pub struct BoxInfo {
    pub header: MessageHeader,
    pub settings: serde_json::Value,
}

impl BoxInfo {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        Ok(BoxInfo {
            header,
            settings: serde_json::from_slice(data)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Phase {
    pub header: MessageHeader,
    pub phase: u32,
}

impl Phase {
    pub fn parse(header: MessageHeader, data: &[u8]) -> Result<Self, PayloadError> {
        require_len(data, 4)?;
        Ok(Phase {
            header,
            phase: LittleEndian::read_u32(&data[0..4]),
        })
    }
}

/// Frame with an unrecognized type code; payload bytes preserved for
/// upstream logging.
#[derive(Debug, Clone)]
pub struct Unknown {
    pub header: MessageHeader,
    pub code: u32,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messagetypes::MessageType;

    fn header(msg_type: MessageType, length: u32) -> MessageHeader {
        MessageHeader { length, msg_type }
    }

    #[test]
    fn plugged_with_wifi() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        let msg = Plugged::parse(header(MessageType::Plugged, 8), &data).unwrap();
        assert_eq!(msg.phone_type, PhoneType::CarPlay);
        assert_eq!(msg.wifi, Some(1));
    }

    #[test]
    fn plugged_without_wifi() {
        let data = 5u32.to_le_bytes();
        let msg = Plugged::parse(header(MessageType::Plugged, 4), &data).unwrap();
        assert_eq!(msg.phone_type, PhoneType::AndroidAuto);
        assert_eq!(msg.wifi, None);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let err = Opened::parse(header(MessageType::Open, 3), &[0, 1, 2]).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::Truncated {
                expected: 28,
                actual: 3
            }
        ));
    }

    fn audio_prefix(decode_type: u32, volume: f32, audio_type: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&decode_type.to_le_bytes());
        data.extend_from_slice(&volume.to_le_bytes());
        data.extend_from_slice(&audio_type.to_le_bytes());
        data
    }

    #[test]
    fn audio_command_byte() {
        let mut data = audio_prefix(5, 1.0, 3);
        data.push(8);
        let msg = AudioData::parse(header(MessageType::AudioData, 13), &data).unwrap();
        assert_eq!(msg.command, Some(AudioCommand::AudioSiriStart));
        assert_eq!(msg.decode_type, 5);
        assert_eq!(msg.audio_type, 3);
        assert!(msg.data.is_none());
        assert!(msg.volume_duration.is_none());
        let format = msg.audio_format().unwrap();
        assert_eq!(format.sample_rate, 16000);
        assert_eq!(format.channels, 1);
    }

    #[test]
    fn audio_volume_duration() {
        let mut data = audio_prefix(1, 0.5, 1);
        data.extend_from_slice(&0.25f32.to_le_bytes());
        let msg = AudioData::parse(header(MessageType::AudioData, 16), &data).unwrap();
        assert_eq!(msg.volume_duration, Some(0.25));
        assert!(msg.command.is_none());
        assert!(msg.data.is_none());
    }

    #[test]
    fn audio_pcm_samples() {
        let mut data = audio_prefix(4, 1.0, 1);
        for sample in [-1i16, 0, 1, 32767] {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        let msg = AudioData::parse(header(MessageType::AudioData, 20), &data).unwrap();
        assert_eq!(msg.data.as_deref(), Some(&[-1i16, 0, 1, 32767][..]));
    }

    #[test]
    fn unknown_audio_command_is_an_error() {
        let mut data = audio_prefix(5, 1.0, 3);
        data.push(200);
        assert!(AudioData::parse(header(MessageType::AudioData, 13), &data).is_err());
    }

    #[test]
    fn video_data_splits_prefix_from_bitstream() {
        let mut data = Vec::new();
        for field in [800u32, 640, 1, 4, 0] {
            data.extend_from_slice(&field.to_le_bytes());
        }
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        let msg = VideoData::parse(header(MessageType::VideoData, 24), &data).unwrap();
        assert_eq!(msg.width, 800);
        assert_eq!(msg.height, 640);
        assert_eq!(msg.flags, 1);
        assert_eq!(msg.length, 4);
        assert_eq!(msg.data, vec![0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn media_data_json() {
        let json = br#"{"MediaSongName":"Song","MediaArtistName":"Artist"}"#;
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(json);
        data.push(0);
        let msg = MediaData::parse(header(MessageType::MediaData, data.len() as u32), &data).unwrap();
        match msg.payload {
            Some(MediaPayload::Data { media }) => {
                assert_eq!(media.media_song_name.as_deref(), Some("Song"));
                assert_eq!(media.media_artist_name.as_deref(), Some("Artist"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn media_data_album_cover() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0xff, 0xd8, 0xff]);
        let msg = MediaData::parse(header(MessageType::MediaData, 7), &data).unwrap();
        match msg.payload {
            Some(MediaPayload::AlbumCover { base64_image }) => {
                assert_eq!(base64_image, "/9j/");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn box_info_keeps_arbitrary_json() {
        let json = br#"{"MDLinkType":"wifi","cpuTemp":46.5}"#;
        let msg = BoxInfo::parse(header(MessageType::BoxSettings, json.len() as u32), json).unwrap();
        assert_eq!(msg.settings["MDLinkType"], "wifi");
        assert_eq!(msg.settings["cpuTemp"], 46.5);
    }

    #[test]
    fn opened_fields() {
        let mut data = Vec::new();
        for field in [800u32, 640, 20, 5, 49152, 2, 2] {
            data.extend_from_slice(&field.to_le_bytes());
        }
        let msg = Opened::parse(header(MessageType::Open, 28), &data).unwrap();
        assert_eq!(msg.width, 800);
        assert_eq!(msg.height, 640);
        assert_eq!(msg.fps, 20);
        assert_eq!(msg.packet_max, 49152);
        assert_eq!(msg.phone_mode, 2);
    }
}
