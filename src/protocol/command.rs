//! Command catalogue
//!
//! One-byte command keys understood by the watch. Setters live in 0x1_, their
//! getters usually at the same low nibble in 0x2_ (and 0x7_ / 0x8_ for the
//! period settings).

use std::fmt;

use crate::error::WatchError;

macro_rules! command_keys {
    ($($(#[$doc:meta])* $name:ident = $value:literal,)+) => {
        /// Known command keys
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum CommandKey {
            $($(#[$doc])* $name = $value,)+
        }

        impl CommandKey {
            /// Every known command, in key order
            pub const ALL: &'static [CommandKey] = &[$(CommandKey::$name,)+];

            /// Name of the command
            pub fn name(&self) -> &'static str {
                match self {
                    $(CommandKey::$name => stringify!($name),)+
                }
            }
        }

        impl TryFrom<u8> for CommandKey {
            type Error = WatchError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(CommandKey::$name),)+
                    _ => Err(WatchError::Argument(format!("Unknown command key: 0x{value:02x}"))),
                }
            }
        }
    };
}

command_keys! {
    SetUserInfo = 0x12,
    SetStepsGoal = 0x16,
    SetTimeFormat = 0x17,
    SetQuickView = 0x18,
    SetWatchFace = 0x19,
    SetMetricSystem = 0x1A,
    SetOtherMessage = 0x1C,
    SetSedentaryReminder = 0x1D,
    SetTimingMeasureHeartRate = 0x1F,
    GetAlarms = 0x21,
    GetUserInfo = 0x22,
    GetStepsGoal = 0x26,
    GetTimeFormat = 0x27,
    GetQuickView = 0x28,
    GetWatchFace = 0x29,
    GetMetricSystem = 0x2A,
    GetOtherMessage = 0x2C,
    GetSedentaryReminder = 0x2D,
    GetTimingMeasureHeartRate = 0x2F,
    SyncTime = 0x31,
    GetHeartRate = 0x35,
    SendMessage = 0x41,
    Shutdown = 0x51,
    SetStepLength = 0x54,
    FindDevice = 0x61,
    /// Shared by the DND and sedentary reminder periods
    SetDndPeriod = 0x71,
    SetQuickViewPeriod = 0x72,
    SetBreathingLight = 0x78,
    GetDndPeriod = 0x81,
    GetQuickViewPeriod = 0x82,
    GetBreathingLight = 0x88,
}

impl CommandKey {
    /// Raw key byte
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl From<CommandKey> for u8 {
    fn from(key: CommandKey) -> u8 {
        key as u8
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", *self as u8)
    }
}
