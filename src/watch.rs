//! Watch Module
//!
//! Typed commands for the Uwatch2, built on [`CommandClient`].
//!
//! Every method is one command exchange. Layouts are those the watch
//! firmware uses, including its quirks:
//! - the steps goal is written big-endian but read back little-endian
//! - watch faces are 1-based on the device and 0-based here
//! - the DND and sedentary reminder periods share command keys

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::client::CommandClient;
use crate::config::ClientConfig;
use crate::error::{Result, WatchError};
use crate::protocol::{
    decode_minute_pair, encode_minute_pair, minute_pair_layout, CommandKey, Endian, Field, Layout,
};
use crate::transport::Transport;

/// Longest notification text: the argument block minus its length byte
pub const MAX_MESSAGE_LEN: usize = crate::protocol::MAX_ARGS_SIZE - 1;

// =============================================================================
// Value Types
// =============================================================================

/// User profile stored on the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserInfo {
    pub height_cm: u8,
    pub weight_kg: u8,
    pub age_years: u8,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    fn from_raw(value: i64) -> Self {
        if value == 0 {
            Gender::Male
        } else {
            Gender::Female
        }
    }

    fn raw(self) -> i64 {
        match self {
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }
}

/// Clock display format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    TwelveHour,
    TwentyFourHour,
}

/// Distance units shown on the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
    Imperial,
}

/// Time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(WatchError::Argument(format!(
                "Invalid time of day {hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };

    /// Minutes from midnight
    pub fn to_minutes(self) -> i64 {
        encode_minute_pair(i64::from(self.hour), i64::from(self.minute))
    }

    /// Time of day for a minutes-from-midnight value reported by the watch
    pub fn from_minutes(value: i64) -> Result<Self> {
        let (hour, minute) = decode_minute_pair(value);
        if !(0..24).contains(&hour) {
            return Err(WatchError::Protocol(format!(
                "Minutes-from-midnight value out of range: {value}"
            )));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = WatchError;

    /// Parse `HH:MM` (24 hour clock)
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || WatchError::Argument(format!("Expected HH:MM, got {s:?}"));
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute)
    }
}

/// Daily period; `00:00`-`00:00` means all the time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: TimeOfDay,
    pub to: TimeOfDay,
}

impl Period {
    pub const ALWAYS: Period = Period {
        from: TimeOfDay::MIDNIGHT,
        to: TimeOfDay::MIDNIGHT,
    };

    pub fn new(from: TimeOfDay, to: TimeOfDay) -> Self {
        Self { from, to }
    }

    fn values(&self) -> [i64; 4] {
        [
            i64::from(self.from.hour),
            i64::from(self.from.minute),
            i64::from(self.to.hour),
            i64::from(self.to.minute),
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.from, self.to)
    }
}

/// Set of weekdays, bit 0 = Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weekdays(pub u8);

impl Weekdays {
    const NAMES: [&'static str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

    pub fn is_empty(&self) -> bool {
        self.0 & 0x7F == 0
    }

    /// Short names of the days in the set, Sunday first
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        (0..7)
            .filter(move |&day| (self.0 >> day) & 1 == 1)
            .map(|day| Self::NAMES[day])
    }
}

/// One of the three alarms
///
/// Raw layout (8 bytes): index, enabled, ?, hour, minute, second, ?, days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alarm {
    pub index: u8,
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub days: Weekdays,
}

impl Alarm {
    pub const RAW_SIZE: usize = 8;

    fn from_raw(raw: &[i64]) -> Self {
        Self {
            index: raw[0] as u8,
            enabled: raw[1] != 0,
            hour: raw[3] as u8,
            minute: raw[4] as u8,
            second: raw[5] as u8,
            days: Weekdays(raw[7] as u8),
        }
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alarm {}: {:02}:{:02}:{:02} {}",
            self.index,
            self.hour,
            self.minute,
            self.second,
            if self.enabled { "ON " } else { "OFF" }
        )?;
        if self.days.is_empty() {
            f.write_str(" Once")
        } else {
            f.write_str(" Repeats:")?;
            for name in self.days.names() {
                write!(f, " {name}")?;
            }
            Ok(())
        }
    }
}

/// Heart rate block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartRate {
    /// Values at the positions that look like the highest and lowest rates
    pub high: u8,
    pub low: u8,

    /// All non-zero values of the block, in order
    pub readings: Vec<u8>,
}

impl HeartRate {
    pub const RAW_SIZE: usize = 73;

    fn from_raw(raw: &[i64]) -> Self {
        Self {
            high: raw[4] as u8,
            low: raw[10] as u8,
            readings: raw.iter().filter(|v| **v != 0).map(|v| *v as u8).collect(),
        }
    }
}

// =============================================================================
// Watch
// =============================================================================

/// Typed command API for a connected watch
pub struct Watch<T: Transport> {
    client: CommandClient<T>,
}

fn u8s(count: usize) -> Layout {
    Layout::repeat(Field::u8(), count)
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

impl<T: Transport> Watch<T> {
    /// Connect through `transport`
    pub fn connect(transport: T, config: ClientConfig) -> Result<Self> {
        Ok(Self::new(CommandClient::connect(transport, config)?))
    }

    pub fn new(client: CommandClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CommandClient<T> {
        &self.client
    }

    pub fn into_client(self) -> CommandClient<T> {
        self.client
    }

    pub fn close(self) -> Result<()> {
        self.client.close()
    }

    fn set(&self, key: CommandKey, layout: &Layout, values: &[i64]) -> Result<()> {
        self.client.send_command(key, layout, values)
    }

    fn get(&self, key: CommandKey, response: &Layout) -> Result<Vec<i64>> {
        self.client.query(key, &Layout::empty(), &[], response)
    }

    fn get_one(&self, key: CommandKey, response: &Layout) -> Result<i64> {
        Ok(self.get(key, response)?[0])
    }

    fn get_flag(&self, key: CommandKey) -> Result<bool> {
        Ok(self.get_one(key, &u8s(1))? != 0)
    }

    fn get_period(&self, key: CommandKey) -> Result<Period> {
        let minutes = self.get(key, &minute_pair_layout())?;
        Ok(Period::new(
            TimeOfDay::from_minutes(minutes[0])?,
            TimeOfDay::from_minutes(minutes[1])?,
        ))
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    /// Vibrate and queue `text` for display
    pub fn send_message(&self, text: &str) -> Result<()> {
        let bytes = text.as_bytes();
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(WatchError::Argument(format!(
                "Message too long: {} bytes (max {})",
                bytes.len(),
                MAX_MESSAGE_LEN
            )));
        }
        tracing::info!("Sending message: {}", text);

        let mut args = Vec::with_capacity(1 + bytes.len());
        args.push(bytes.len() as u8);
        args.extend_from_slice(bytes);
        self.client.send_raw(CommandKey::SendMessage, &args)
    }

    // -------------------------------------------------------------------------
    // User Profile
    // -------------------------------------------------------------------------

    pub fn set_user_info(&self, info: UserInfo) -> Result<()> {
        self.set(
            CommandKey::SetUserInfo,
            &u8s(4),
            &[
                i64::from(info.height_cm),
                i64::from(info.weight_kg),
                i64::from(info.age_years),
                info.gender.raw(),
            ],
        )
    }

    pub fn get_user_info(&self) -> Result<UserInfo> {
        let v = self.get(CommandKey::GetUserInfo, &u8s(4))?;
        Ok(UserInfo {
            height_cm: v[0] as u8,
            weight_kg: v[1] as u8,
            age_years: v[2] as u8,
            gender: Gender::from_raw(v[3]),
        })
    }

    // -------------------------------------------------------------------------
    // Steps
    // -------------------------------------------------------------------------

    /// Daily steps goal
    pub fn set_steps_goal(&self, steps: u32) -> Result<()> {
        self.set(
            CommandKey::SetStepsGoal,
            &Layout::new(vec![Field::u32(Endian::Big)]),
            &[i64::from(steps)],
        )
    }

    pub fn get_steps_goal(&self) -> Result<u32> {
        let layout = Layout::new(vec![Field::u32(Endian::Little)]);
        Ok(self.get_one(CommandKey::GetStepsGoal, &layout)? as u32)
    }

    /// Length of one step in cm (write only)
    pub fn set_step_length(&self, step_length_cm: u8) -> Result<()> {
        self.set(CommandKey::SetStepLength, &u8s(1), &[i64::from(step_length_cm)])
    }

    // -------------------------------------------------------------------------
    // Quick View
    // -------------------------------------------------------------------------

    /// Turn the display on when the wrist is raised
    pub fn set_quick_view(&self, enabled: bool) -> Result<()> {
        self.set(CommandKey::SetQuickView, &u8s(1), &[flag(enabled)])
    }

    pub fn get_quick_view(&self) -> Result<bool> {
        self.get_flag(CommandKey::GetQuickView)
    }

    pub fn set_quick_view_period(&self, period: Period) -> Result<()> {
        self.set(CommandKey::SetQuickViewPeriod, &u8s(4), &period.values())
    }

    pub fn get_quick_view_period(&self) -> Result<Period> {
        self.get_period(CommandKey::GetQuickViewPeriod)
    }

    // -------------------------------------------------------------------------
    // Display Settings
    // -------------------------------------------------------------------------

    pub fn set_time_format(&self, format: TimeFormat) -> Result<()> {
        let value = matches!(format, TimeFormat::TwentyFourHour);
        self.set(CommandKey::SetTimeFormat, &u8s(1), &[flag(value)])
    }

    pub fn get_time_format(&self) -> Result<TimeFormat> {
        Ok(if self.get_flag(CommandKey::GetTimeFormat)? {
            TimeFormat::TwentyFourHour
        } else {
            TimeFormat::TwelveHour
        })
    }

    pub fn set_metric_system(&self, units: UnitSystem) -> Result<()> {
        let value = matches!(units, UnitSystem::Imperial);
        self.set(CommandKey::SetMetricSystem, &u8s(1), &[flag(value)])
    }

    pub fn get_metric_system(&self) -> Result<UnitSystem> {
        Ok(if self.get_flag(CommandKey::GetMetricSystem)? {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        })
    }

    /// Watch face to display, 0 to 2
    pub fn set_watch_face(&self, index: u8) -> Result<()> {
        if index > 2 {
            return Err(WatchError::Argument(format!(
                "Watch face index must be 0, 1 or 2, got {index}"
            )));
        }
        self.set(CommandKey::SetWatchFace, &u8s(1), &[i64::from(index) + 1])
    }

    pub fn get_watch_face(&self) -> Result<u8> {
        let raw = self.get_one(CommandKey::GetWatchFace, &u8s(1))?;
        if raw == 0 {
            return Err(WatchError::Protocol("Watch reported face 0 (faces are 1-based)".to_string()));
        }
        Ok(raw as u8 - 1)
    }

    pub fn set_breathing_light(&self, enabled: bool) -> Result<()> {
        self.set(CommandKey::SetBreathingLight, &u8s(1), &[flag(enabled)])
    }

    pub fn get_breathing_light(&self) -> Result<bool> {
        self.get_flag(CommandKey::GetBreathingLight)
    }

    /// Retained by the watch; effect unknown
    pub fn set_other_message(&self, enabled: bool) -> Result<()> {
        self.set(CommandKey::SetOtherMessage, &u8s(1), &[flag(enabled)])
    }

    pub fn get_other_message(&self) -> Result<bool> {
        self.get_flag(CommandKey::GetOtherMessage)
    }

    // -------------------------------------------------------------------------
    // Do Not Disturb / Sedentary Reminder
    // -------------------------------------------------------------------------

    pub fn set_dnd_period(&self, period: Period) -> Result<()> {
        self.set(CommandKey::SetDndPeriod, &u8s(4), &period.values())
    }

    pub fn get_dnd_period(&self) -> Result<Period> {
        self.get_period(CommandKey::GetDndPeriod)
    }

    pub fn set_sedentary_reminder(&self, enabled: bool) -> Result<()> {
        self.set(CommandKey::SetSedentaryReminder, &u8s(1), &[flag(enabled)])
    }

    pub fn get_sedentary_reminder(&self) -> Result<bool> {
        self.get_flag(CommandKey::GetSedentaryReminder)
    }

    pub fn set_sedentary_reminder_period(&self, period: Period) -> Result<()> {
        self.set_dnd_period(period)
    }

    pub fn get_sedentary_reminder_period(&self) -> Result<Period> {
        self.get_dnd_period()
    }

    // -------------------------------------------------------------------------
    // Heart Rate
    // -------------------------------------------------------------------------

    pub fn set_timing_measure_heart_rate(&self, value: u8) -> Result<()> {
        self.set(CommandKey::SetTimingMeasureHeartRate, &u8s(1), &[i64::from(value)])
    }

    pub fn get_timing_measure_heart_rate(&self) -> Result<u8> {
        Ok(self.get_one(CommandKey::GetTimingMeasureHeartRate, &u8s(1))? as u8)
    }

    pub fn get_heart_rate(&self) -> Result<HeartRate> {
        let raw = self.get(CommandKey::GetHeartRate, &u8s(HeartRate::RAW_SIZE))?;
        Ok(HeartRate::from_raw(&raw))
    }

    // -------------------------------------------------------------------------
    // Alarms
    // -------------------------------------------------------------------------

    pub fn get_alarms(&self) -> Result<[Alarm; 3]> {
        let raw = self.get(CommandKey::GetAlarms, &u8s(3 * Alarm::RAW_SIZE))?;
        let mut alarms = raw.chunks(Alarm::RAW_SIZE).map(Alarm::from_raw);
        match (alarms.next(), alarms.next(), alarms.next()) {
            (Some(a), Some(b), Some(c)) => Ok([a, b, c]),
            _ => Err(WatchError::Protocol("Alarm block shorter than 3 alarms".to_string())),
        }
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    /// Set the clock to `unix_secs` in a timezone `utc_offset_secs` from UTC
    ///
    /// The watch only supports whole-hour offsets.
    pub fn sync_time(&self, unix_secs: u32, utc_offset_secs: i32) -> Result<()> {
        if utc_offset_secs % 3600 != 0 {
            return Err(WatchError::Argument(format!(
                "Only full hour timezones are supported, got offset {utc_offset_secs}s"
            )));
        }
        let layout = Layout::new(vec![Field::u32(Endian::Big), Field::i8()]);
        self.set(
            CommandKey::SyncTime,
            &layout,
            &[i64::from(unix_secs), i64::from(utc_offset_secs / 3600)],
        )
    }

    /// Set the clock to the current system time
    pub fn sync_time_now(&self, utc_offset_secs: i32) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| WatchError::Argument(format!("System clock before epoch: {e}")))?;
        let secs = u32::try_from(now.as_secs())
            .map_err(|_| WatchError::Argument("System time does not fit 32 bits".to_string()))?;
        self.sync_time(secs, utc_offset_secs)
    }

    // -------------------------------------------------------------------------
    // Device
    // -------------------------------------------------------------------------

    /// Vibrate for a few seconds
    pub fn find_device(&self) -> Result<()> {
        self.set(CommandKey::FindDevice, &Layout::empty(), &[])
    }

    /// Turn the watch off (tap and hold the face to turn it back on)
    pub fn shutdown(&self) -> Result<()> {
        self.set(CommandKey::Shutdown, &u8s(1), &[255])
    }
}
