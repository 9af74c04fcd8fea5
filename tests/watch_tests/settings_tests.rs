//! Settings Tests
//!
//! Tests for the argument and response layouts of each typed command.

use uwatch2::protocol::from_hex_str;
use uwatch2::watch::{
    Gender, Period, TimeFormat, TimeOfDay, UnitSystem, UserInfo, MAX_MESSAGE_LEN,
};
use uwatch2::WatchError;

use super::{fake_watch, last_packet};

fn hex(s: &str) -> Vec<u8> {
    from_hex_str(s).unwrap()
}

fn period(from: &str, to: &str) -> Period {
    Period::new(from.parse().unwrap(), to.parse().unwrap())
}

// =============================================================================
// Steps Tests
// =============================================================================

#[test]
fn test_set_steps_goal_is_big_endian() {
    let (watch, link) = fake_watch(&[]);
    watch.set_steps_goal(3000).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 09 16 00 00 0b b8"));
}

#[test]
fn test_get_steps_goal_is_little_endian() {
    let (watch, link) = fake_watch(&[(0x26, hex("b8 0b 00 00"))]);
    assert_eq!(watch.get_steps_goal().unwrap(), 3000);
    assert_eq!(last_packet(&link), hex("fe ea 10 05 26"));
}

#[test]
fn test_set_step_length() {
    let (watch, link) = fake_watch(&[]);
    watch.set_step_length(72).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 54 48"));
}

// =============================================================================
// User Profile Tests
// =============================================================================

#[test]
fn test_set_user_info() {
    let (watch, link) = fake_watch(&[]);
    watch
        .set_user_info(UserInfo {
            height_cm: 180,
            weight_kg: 75,
            age_years: 30,
            gender: Gender::Female,
        })
        .unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 09 12 b4 4b 1e 01"));
}

#[test]
fn test_get_user_info() {
    let (watch, _link) = fake_watch(&[(0x22, vec![165, 60, 41, 0])]);
    let info = watch.get_user_info().unwrap();
    assert_eq!(
        info,
        UserInfo {
            height_cm: 165,
            weight_kg: 60,
            age_years: 41,
            gender: Gender::Male,
        }
    );
}

// =============================================================================
// Flag Setting Tests
// =============================================================================

#[test]
fn test_flag_settings() {
    let (watch, link) = fake_watch(&[
        (0x28, vec![1]),
        (0x27, vec![1]),
        (0x2A, vec![0]),
        (0x88, vec![0]),
        (0x2C, vec![1]),
        (0x2D, vec![1]),
    ]);

    assert!(watch.get_quick_view().unwrap());
    assert_eq!(watch.get_time_format().unwrap(), TimeFormat::TwentyFourHour);
    assert_eq!(watch.get_metric_system().unwrap(), UnitSystem::Metric);
    assert!(!watch.get_breathing_light().unwrap());
    assert!(watch.get_other_message().unwrap());
    assert!(watch.get_sedentary_reminder().unwrap());

    watch.set_quick_view(false).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 18 00"));
    watch.set_time_format(TimeFormat::TwelveHour).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 17 00"));
    watch.set_metric_system(UnitSystem::Imperial).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 1a 01"));
    watch.set_breathing_light(true).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 78 01"));
    watch.set_other_message(true).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 1c 01"));
    watch.set_sedentary_reminder(false).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 1d 00"));
}

#[test]
fn test_heart_rate_timing() {
    let (watch, link) = fake_watch(&[(0x2F, vec![3])]);
    assert_eq!(watch.get_timing_measure_heart_rate().unwrap(), 3);
    watch.set_timing_measure_heart_rate(1).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 1f 01"));
}

// =============================================================================
// Watch Face Tests
// =============================================================================

#[test]
fn test_set_watch_face_is_one_based_on_the_wire() {
    let (watch, link) = fake_watch(&[]);
    watch.set_watch_face(0).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 19 01"));
    watch.set_watch_face(2).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 06 19 03"));
}

#[test]
fn test_set_watch_face_out_of_range() {
    let (watch, link) = fake_watch(&[]);
    assert!(matches!(watch.set_watch_face(3), Err(WatchError::Argument(_))));
    assert!(link.written_packets().is_empty());
}

#[test]
fn test_get_watch_face() {
    let (watch, _link) = fake_watch(&[(0x29, vec![2])]);
    assert_eq!(watch.get_watch_face().unwrap(), 1);
}

#[test]
fn test_get_watch_face_zero_is_protocol_error() {
    let (watch, _link) = fake_watch(&[(0x29, vec![0])]);
    assert!(watch.get_watch_face().unwrap_err().is_protocol());
}

// =============================================================================
// Period Tests
// =============================================================================

#[test]
fn test_set_quick_view_period() {
    let (watch, link) = fake_watch(&[]);
    watch.set_quick_view_period(period("07:30", "22:00")).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 09 72 07 1e 16 00"));
}

#[test]
fn test_get_quick_view_period() {
    // 08:00 - 21:30 as big-endian minutes from midnight
    let (watch, _link) = fake_watch(&[(0x82, hex("01 e0 05 0a"))]);
    assert_eq!(watch.get_quick_view_period().unwrap(), period("08:00", "21:30"));
}

#[test]
fn test_dnd_period() {
    let (watch, link) = fake_watch(&[(0x81, hex("05 46 01 e0"))]);
    assert_eq!(watch.get_dnd_period().unwrap(), period("22:30", "08:00"));

    watch.set_dnd_period(Period::ALWAYS).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 09 71 00 00 00 00"));
}

#[test]
fn test_sedentary_reminder_period_shares_dnd_keys() {
    let (watch, link) = fake_watch(&[(0x81, hex("02 1c 04 38"))]);
    assert_eq!(
        watch.get_sedentary_reminder_period().unwrap(),
        period("09:00", "18:00")
    );
    assert_eq!(last_packet(&link)[4], 0x81);

    watch.set_sedentary_reminder_period(period("09:00", "18:00")).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 09 71 09 00 12 00"));
}

#[test]
fn test_period_out_of_range_is_protocol_error() {
    // 1500 minutes = 25:00
    let (watch, _link) = fake_watch(&[(0x81, hex("05 dc 00 00"))]);
    assert!(watch.get_dnd_period().unwrap_err().is_protocol());
}

// =============================================================================
// Message Tests
// =============================================================================

#[test]
fn test_send_message_is_length_prefixed() {
    let (watch, link) = fake_watch(&[]);
    watch.send_message("Hi").unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 08 41 02 48 69"));
}

#[test]
fn test_send_message_utf8_length_in_bytes() {
    let (watch, link) = fake_watch(&[]);
    watch.send_message("é").unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 08 41 02 c3 a9"));
}

#[test]
fn test_send_message_max_length() {
    let (watch, link) = fake_watch(&[]);
    watch.send_message(&"a".repeat(MAX_MESSAGE_LEN)).unwrap();
    let packet = last_packet(&link);
    assert_eq!(packet.len(), 255);
    assert_eq!(packet[5] as usize, MAX_MESSAGE_LEN);

    let err = watch.send_message(&"a".repeat(MAX_MESSAGE_LEN + 1)).unwrap_err();
    assert!(matches!(err, WatchError::Argument(_)));
}

// =============================================================================
// Time Tests
// =============================================================================

#[test]
fn test_sync_time() {
    let (watch, link) = fake_watch(&[]);
    watch.sync_time(1_600_000_000, -5 * 3600).unwrap();
    assert_eq!(last_packet(&link), hex("fe ea 10 0a 31 5f 5e 10 00 fb"));
}

#[test]
fn test_sync_time_rejects_partial_hour_offset() {
    let (watch, link) = fake_watch(&[]);
    let err = watch.sync_time(1_600_000_000, 5 * 3600 + 1800).unwrap_err();
    assert!(matches!(err, WatchError::Argument(_)));
    assert!(link.written_packets().is_empty());
}

#[test]
fn test_sync_time_now() {
    let (watch, link) = fake_watch(&[]);
    watch.sync_time_now(3600).unwrap();
    let packet = last_packet(&link);
    assert_eq!(packet[4], 0x31);
    assert_eq!(packet[9], 1);
}

// =============================================================================
// Device Tests
// =============================================================================

#[test]
fn test_find_device_and_shutdown() {
    let (watch, link) = fake_watch(&[]);
    watch.find_device().unwrap();
    watch.shutdown().unwrap();
    assert_eq!(
        link.written_packets(),
        vec![hex("fe ea 10 05 61"), hex("fe ea 10 06 51 ff")]
    );
}

#[test]
fn test_time_of_day_parse() {
    assert_eq!("07:05".parse::<TimeOfDay>().unwrap(), TimeOfDay::new(7, 5).unwrap());
    assert!("24:00".parse::<TimeOfDay>().is_err());
    assert!("7".parse::<TimeOfDay>().is_err());
}
