//! Message type codes shared by both wire directions.

/// Frame type codes recognized by the dongle protocol. Codes outside the
/// known set are carried verbatim in `Unknown` so nothing is lost on the way
/// to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Open,
    Plugged,
    Phase,
    Unplugged,
    Touch,
    VideoData,
    AudioData,
    Command,
    LogoType,
    BluetoothAddress,
    BluetoothPIN,
    BluetoothDeviceName,
    WifiDeviceName,
    DisconnectPhone,
    BluetoothPairedList,
    ManufacturerInfo,
    CloseDongle,
    MultiTouch,
    HiCarLink,
    BoxSettings,
    MediaData,
    SendFile,
    HeartBeat,
    SoftwareVersion,
    Unknown(u32),
}

impl From<u32> for MessageType {
    fn from(value: u32) -> Self {
        use MessageType::*;
        match value {
            0x01 => Open,
            0x02 => Plugged,
            0x03 => Phase,
            0x04 => Unplugged,
            0x05 => Touch,
            0x06 => VideoData,
            0x07 => AudioData,
            0x08 => Command,
            0x09 => LogoType,
            0x0a => BluetoothAddress,
            0x0c => BluetoothPIN,
            0x0d => BluetoothDeviceName,
            0x0e => WifiDeviceName,
            0x0f => DisconnectPhone,
            0x12 => BluetoothPairedList,
            0x14 => ManufacturerInfo,
            0x15 => CloseDongle,
            0x17 => MultiTouch,
            0x18 => HiCarLink,
            0x19 => BoxSettings,
            0x2a => MediaData,
            0x99 => SendFile,
            0xaa => HeartBeat,
            0xcc => SoftwareVersion,
            other => Unknown(other),
        }
    }
}

impl From<MessageType> for u32 {
    fn from(msg: MessageType) -> u32 {
        use MessageType::*;
        match msg {
            Open => 0x01,
            Plugged => 0x02,
            Phase => 0x03,
            Unplugged => 0x04,
            Touch => 0x05,
            VideoData => 0x06,
            AudioData => 0x07,
            Command => 0x08,
            LogoType => 0x09,
            BluetoothAddress => 0x0a,
            BluetoothPIN => 0x0c,
            BluetoothDeviceName => 0x0d,
            WifiDeviceName => 0x0e,
            DisconnectPhone => 0x0f,
            BluetoothPairedList => 0x12,
            ManufacturerInfo => 0x14,
            CloseDongle => 0x15,
            MultiTouch => 0x17,
            HiCarLink => 0x18,
            BoxSettings => 0x19,
            MediaData => 0x2a,
            SendFile => 0x99,
            HeartBeat => 0xaa,
            SoftwareVersion => 0xcc,
            Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MessageType;

    #[test]
    fn known_codes_round_trip() {
        for code in [
            0x01u32, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0c, 0x0d, 0x0e,
            0x0f, 0x12, 0x14, 0x15, 0x17, 0x18, 0x19, 0x2a, 0x99, 0xaa, 0xcc,
        ] {
            let msg_type = MessageType::from(code);
            assert!(!matches!(msg_type, MessageType::Unknown(_)), "{code:#04x}");
            assert_eq!(u32::from(msg_type), code);
        }
    }

    #[test]
    fn unrecognized_codes_are_preserved() {
        // 0x1aa must not alias HeartBeat (0xaa); the full 32 bits matter.
        assert_eq!(MessageType::from(0x1aa), MessageType::Unknown(0x1aa));
        assert_eq!(u32::from(MessageType::Unknown(0x1aa)), 0x1aa);
        assert_eq!(MessageType::from(0x26), MessageType::Unknown(0x26));
    }
}
