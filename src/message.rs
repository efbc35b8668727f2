//! Frame header codec and the inbound message dispatch.
//!
//! A frame is a 16-byte header followed by `length` payload bytes. Header
//! layout, all little-endian u32: magic `0x55AA55AA`, payload length, type
//! code, and the bitwise complement of the type code as a check value.

use crate::messagetypes::MessageType;
use crate::readable::{
    self, AudioData, BluetoothAddress, BluetoothDeviceName, BluetoothPIN, BluetoothPairedList,
    BoxInfo, Command, HiCarLink, ManufacturerInfo, MediaData, Opened, PayloadError, Phase,
    Plugged, SoftwareVersion, Unknown, VideoData, WifiDeviceName,
};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use thiserror::Error;

pub const HEADER_SIZE: usize = 16;
const MAGIC: u32 = 0x55AA55AA;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid header size: expected {HEADER_SIZE}, got {0}")]
    Size(usize),
    #[error("invalid magic number: {0:#010x}")]
    Magic(u32),
    #[error("invalid type check: expected {expected:#010x}, got {actual:#010x}")]
    TypeCheck { expected: u32, actual: u32 },
}

/// Decoded inbound frame, one variant per recognized message type.
#[derive(Debug, Clone)]
pub enum Message {
    Opened(Opened),
    Plugged(Plugged),
    Phase(Phase),
    Unplugged(readable::Unplugged),
    VideoData(VideoData),
    AudioData(AudioData),
    Command(Command),
    BluetoothAddress(BluetoothAddress),
    BluetoothPIN(BluetoothPIN),
    BluetoothDeviceName(BluetoothDeviceName),
    WifiDeviceName(WifiDeviceName),
    BluetoothPairedList(BluetoothPairedList),
    ManufacturerInfo(ManufacturerInfo),
    HiCarLink(HiCarLink),
    BoxInfo(BoxInfo),
    MediaData(MediaData),
    SoftwareVersion(SoftwareVersion),
    Unknown(Unknown),
}

#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub length: u32,
    pub msg_type: MessageType,
}

impl MessageHeader {
    /// Parse and validate a 16-byte header. The type check is verified even
    /// for unrecognized type codes; those surface later as `Unknown`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, HeaderError> {
        if data.len() != HEADER_SIZE {
            return Err(HeaderError::Size(data.len()));
        }

        let magic = LittleEndian::read_u32(&data[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::Magic(magic));
        }

        let length = LittleEndian::read_u32(&data[4..8]);
        let type_raw = LittleEndian::read_u32(&data[8..12]);
        let type_check = LittleEndian::read_u32(&data[12..16]);

        let expected_check = !type_raw;
        if type_check != expected_check {
            return Err(HeaderError::TypeCheck {
                expected: expected_check,
                actual: type_check,
            });
        }

        Ok(Self {
            length,
            msg_type: MessageType::from(type_raw),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buffer = [0u8; HEADER_SIZE];
        let type_raw = u32::from(self.msg_type);
        LittleEndian::write_u32(&mut buffer[0..4], MAGIC);
        LittleEndian::write_u32(&mut buffer[4..8], self.length);
        LittleEndian::write_u32(&mut buffer[8..12], type_raw);
        LittleEndian::write_u32(&mut buffer[12..16], !type_raw);
        buffer
    }

    /// Decode the payload read for this header into a typed message.
    ///
    /// `None` means the frame is skipped: a payload that does not match its
    /// type's layout (logged at `warn`), or an echo of a host-outbound type
    /// the dongle has no business sending content for. Unrecognized type
    /// codes are delivered as [`Message::Unknown`] so callers can log them.
    pub fn decode_payload(&self, data: Option<Vec<u8>>) -> Option<Message> {
        use MessageType::*;
        let data = data.unwrap_or_default();

        if data.is_empty() {
            return match self.msg_type {
                Unplugged => Some(Message::Unplugged(readable::Unplugged {
                    header: self.clone(),
                })),
                // Host-outbound types; an empty echo is valid but carries
                // nothing to deliver.
                HeartBeat | CloseDongle | DisconnectPhone => {
                    debug!("ignoring empty {:?} frame", self.msg_type);
                    None
                }
                Unknown(code) => Some(self.unknown(code, data)),
                other => {
                    warn!("skipping {other:?} frame with empty payload");
                    None
                }
            };
        }

        match self.msg_type {
            Open => self.parsed(Opened::parse(self.clone(), &data), Message::Opened),
            Plugged => self.parsed(
                readable::Plugged::parse(self.clone(), &data),
                Message::Plugged,
            ),
            Phase => self.parsed(readable::Phase::parse(self.clone(), &data), Message::Phase),
            VideoData => self.parsed(
                readable::VideoData::parse(self.clone(), &data),
                Message::VideoData,
            ),
            AudioData => self.parsed(
                readable::AudioData::parse(self.clone(), &data),
                Message::AudioData,
            ),
            Command => self.parsed(
                readable::Command::parse(self.clone(), &data),
                Message::Command,
            ),
            BluetoothAddress => self.parsed(
                readable::BluetoothAddress::parse(self.clone(), &data),
                Message::BluetoothAddress,
            ),
            BluetoothPIN => self.parsed(
                readable::BluetoothPIN::parse(self.clone(), &data),
                Message::BluetoothPIN,
            ),
            BluetoothDeviceName => self.parsed(
                readable::BluetoothDeviceName::parse(self.clone(), &data),
                Message::BluetoothDeviceName,
            ),
            WifiDeviceName => self.parsed(
                readable::WifiDeviceName::parse(self.clone(), &data),
                Message::WifiDeviceName,
            ),
            BluetoothPairedList => self.parsed(
                readable::BluetoothPairedList::parse(self.clone(), &data),
                Message::BluetoothPairedList,
            ),
            ManufacturerInfo => self.parsed(
                readable::ManufacturerInfo::parse(self.clone(), &data),
                Message::ManufacturerInfo,
            ),
            HiCarLink => self.parsed(
                readable::HiCarLink::parse(self.clone(), &data),
                Message::HiCarLink,
            ),
            BoxSettings => self.parsed(
                readable::BoxInfo::parse(self.clone(), &data),
                Message::BoxInfo,
            ),
            MediaData => self.parsed(
                readable::MediaData::parse(self.clone(), &data),
                Message::MediaData,
            ),
            SoftwareVersion => self.parsed(
                readable::SoftwareVersion::parse(self.clone(), &data),
                Message::SoftwareVersion,
            ),
            Unknown(code) => Some(self.unknown(code, data)),
            other => {
                warn!(
                    "skipping {other:?} frame with unexpected {}-byte payload",
                    data.len()
                );
                None
            }
        }
    }

    fn parsed<T>(
        &self,
        result: Result<T, PayloadError>,
        wrap: impl FnOnce(T) -> Message,
    ) -> Option<Message> {
        match result {
            Ok(message) => Some(wrap(message)),
            Err(err) => {
                warn!("failed to decode {:?} payload: {err}", self.msg_type);
                None
            }
        }
    }

    fn unknown(&self, code: u32, data: Vec<u8>) -> Message {
        warn!(
            "unknown message type {code:#04x} with {} payload bytes",
            data.len()
        );
        Message::Unknown(Unknown {
            header: self.clone(),
            code,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandMapping;

    #[test]
    fn parses_valid_header() {
        let data = [
            0xAA, 0x55, 0xAA, 0x55, // magic
            0x04, 0x00, 0x00, 0x00, // length
            0x08, 0x00, 0x00, 0x00, // type = Command
            0xF7, 0xFF, 0xFF, 0xFF, // !type
        ];
        let header = MessageHeader::from_bytes(&data).unwrap();
        assert_eq!(header.length, 4);
        assert_eq!(header.msg_type, MessageType::Command);
    }

    #[test]
    fn command_frame_decodes_to_wifi_connect() {
        let header = MessageHeader {
            length: 4,
            msg_type: MessageType::Command,
        };
        let message = header.decode_payload(Some(vec![0xEA, 0x03, 0x00, 0x00]));
        match message {
            Some(Message::Command(cmd)) => assert_eq!(cmd.value, CommandMapping::WifiConnect),
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn rejects_wrong_size() {
        assert!(matches!(
            MessageHeader::from_bytes(&[0u8; 15]),
            Err(HeaderError::Size(15))
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = [0u8; 16];
        data[0..4].copy_from_slice(&0xdeadbeefu32.to_le_bytes());
        assert!(matches!(
            MessageHeader::from_bytes(&data),
            Err(HeaderError::Magic(0xdeadbeef))
        ));
    }

    #[test]
    fn rejects_bad_type_check() {
        let mut data = [0u8; 16];
        data[0..4].copy_from_slice(&0x55AA55AAu32.to_le_bytes());
        data[8..12].copy_from_slice(&0x08u32.to_le_bytes());
        data[12..16].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            MessageHeader::from_bytes(&data),
            Err(HeaderError::TypeCheck { .. })
        ));
    }

    #[test]
    fn header_round_trips_for_arbitrary_types_and_lengths() {
        for (type_raw, length) in [
            (0x01u32, 0u32),
            (0x08, 4),
            (0xaa, 0),
            (0xcc, 65535),
            (0x7fff_ffff, 1),
            (0xffff_ffff, u32::MAX),
        ] {
            let header = MessageHeader {
                length,
                msg_type: MessageType::from(type_raw),
            };
            let bytes = header.to_bytes();
            // Emitted headers satisfy the magic and complement law.
            assert_eq!(LittleEndian::read_u32(&bytes[0..4]), 0x55AA55AA);
            assert_eq!(
                LittleEndian::read_u32(&bytes[12..16]),
                !LittleEndian::read_u32(&bytes[8..12])
            );
            let parsed = MessageHeader::from_bytes(&bytes).unwrap();
            assert_eq!(parsed.length, length);
            assert_eq!(u32::from(parsed.msg_type), type_raw);
        }
    }

    #[test]
    fn unknown_type_is_delivered_with_raw_bytes() {
        let header = MessageHeader {
            length: 2,
            msg_type: MessageType::from(0x26),
        };
        match header.decode_payload(Some(vec![1, 2])) {
            Some(Message::Unknown(unknown)) => {
                assert_eq!(unknown.code, 0x26);
                assert_eq!(unknown.data, vec![1, 2]);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn empty_unplugged_is_valid() {
        let header = MessageHeader {
            length: 0,
            msg_type: MessageType::Unplugged,
        };
        assert!(matches!(
            header.decode_payload(None),
            Some(Message::Unplugged(_))
        ));
    }

    #[test]
    fn empty_payload_for_payload_bearing_type_is_skipped() {
        let header = MessageHeader {
            length: 0,
            msg_type: MessageType::Open,
        };
        assert!(header.decode_payload(None).is_none());
    }

    #[test]
    fn short_payload_is_skipped_not_fatal() {
        let header = MessageHeader {
            length: 2,
            msg_type: MessageType::Open,
        };
        assert!(header.decode_payload(Some(vec![0, 1])).is_none());
    }

    #[test]
    fn outbound_only_echoes_are_skipped() {
        for msg_type in [
            MessageType::HeartBeat,
            MessageType::CloseDongle,
            MessageType::DisconnectPhone,
        ] {
            let header = MessageHeader {
                length: 0,
                msg_type,
            };
            assert!(header.decode_payload(None).is_none());
        }
    }
}
