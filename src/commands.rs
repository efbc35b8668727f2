//! Control command codes carried in `Command` frames (type 0x08).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandMapping {
    Invalid = 0,
    StartRecordAudio = 1,
    StopRecordAudio = 2,
    RequestHostUI = 3, // "My Car" button in the CarPlay interface
    Siri = 5,
    Mic = 7, // host-side microphone
    Frame = 12,
    BoxMic = 15, // dongle-side microphone
    EnableNightMode = 16,
    DisableNightMode = 17,
    AudioTransferOn = 22,  // phone streams audio straight to the car
    AudioTransferOff = 23, // phone streams audio through the dongle
    Wifi24g = 24,
    Wifi5g = 25,
    Left = 100,
    Right = 101,
    SelectDown = 104,
    SelectUp = 105,
    Back = 106,
    Up = 113,
    Down = 114,
    Home = 200,
    Play = 201,
    Pause = 202,
    PlayOrPause = 203,
    Next = 204,
    Prev = 205,
    AcceptPhone = 300,
    RejectPhone = 301,
    RequestVideoFocus = 500,
    ReleaseVideoFocus = 501,
    WifiEnable = 1000,
    AutoConnectEnable = 1001,
    WifiConnect = 1002,
    ScanningDevice = 1003,
    DeviceFound = 1004,
    DeviceNotFound = 1005,
    ConnectDeviceFailed = 1006,
    BtConnected = 1007,
    BtDisconnected = 1008,
    WifiConnected = 1009,
    WifiDisconnected = 1010,
    BtPairStart = 1011,
    WifiPair = 1012,
}

impl From<u32> for CommandMapping {
    fn from(value: u32) -> Self {
        use CommandMapping::*;
        match value {
            1 => StartRecordAudio,
            2 => StopRecordAudio,
            3 => RequestHostUI,
            5 => Siri,
            7 => Mic,
            12 => Frame,
            15 => BoxMic,
            16 => EnableNightMode,
            17 => DisableNightMode,
            22 => AudioTransferOn,
            23 => AudioTransferOff,
            24 => Wifi24g,
            25 => Wifi5g,
            100 => Left,
            101 => Right,
            104 => SelectDown,
            105 => SelectUp,
            106 => Back,
            113 => Up,
            114 => Down,
            200 => Home,
            201 => Play,
            202 => Pause,
            203 => PlayOrPause,
            204 => Next,
            205 => Prev,
            300 => AcceptPhone,
            301 => RejectPhone,
            500 => RequestVideoFocus,
            501 => ReleaseVideoFocus,
            1000 => WifiEnable,
            1001 => AutoConnectEnable,
            1002 => WifiConnect,
            1003 => ScanningDevice,
            1004 => DeviceFound,
            1005 => DeviceNotFound,
            1006 => ConnectDeviceFailed,
            1007 => BtConnected,
            1008 => BtDisconnected,
            1009 => WifiConnected,
            1010 => WifiDisconnected,
            1011 => BtPairStart,
            1012 => WifiPair,
            _ => Invalid,
        }
    }
}

impl From<CommandMapping> for u32 {
    fn from(cmd: CommandMapping) -> u32 {
        cmd as u32
    }
}

#[cfg(test)]
mod tests {
    use super::CommandMapping;

    #[test]
    fn wifi_connect_code() {
        assert_eq!(u32::from(CommandMapping::WifiConnect), 1002);
        assert_eq!(CommandMapping::from(1002), CommandMapping::WifiConnect);
    }

    #[test]
    fn unknown_codes_fall_back_to_invalid() {
        assert_eq!(CommandMapping::from(4), CommandMapping::Invalid);
        assert_eq!(CommandMapping::from(99999), CommandMapping::Invalid);
    }
}
