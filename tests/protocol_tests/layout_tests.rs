//! Layout Tests
//!
//! Tests for argument packing, response unpacking and minute pairs.

use uwatch2::protocol::{
    decode_minute_pair, encode_minute_pair, minute_pair_layout, parse_values, Endian, Field,
    Layout, Width,
};
use uwatch2::WatchError;

// =============================================================================
// Packing Tests
// =============================================================================

#[test]
fn test_pack_big_endian_u32() {
    let layout: Layout = ">I".parse().unwrap();
    assert_eq!(layout.pack(&[3000]).unwrap(), vec![0x00, 0x00, 0x0B, 0xB8]);
}

#[test]
fn test_pack_sync_time() {
    let layout: Layout = ">Ib".parse().unwrap();
    let packed = layout.pack(&[0x5F5E_1000, -5]).unwrap();
    assert_eq!(packed, vec![0x5F, 0x5E, 0x10, 0x00, 0xFB]);
}

#[test]
fn test_pack_defaults_to_little_endian() {
    let layout: Layout = "H".parse().unwrap();
    assert_eq!(layout.pack(&[0x1234]).unwrap(), vec![0x34, 0x12]);
}

#[test]
fn test_pack_wrong_arity() {
    let layout: Layout = "BBBB".parse().unwrap();
    let err = layout.pack(&[1, 2, 3]).unwrap_err();
    assert!(matches!(err, WatchError::Argument(_)));
}

#[test]
fn test_pack_out_of_range() {
    let layout = Layout::new(vec![Field::u8()]);
    assert!(layout.pack(&[256]).is_err());
    assert!(layout.pack(&[-1]).is_err());

    let signed = Layout::new(vec![Field::i8()]);
    assert!(signed.pack(&[-128]).is_ok());
    assert!(signed.pack(&[128]).is_err());
}

#[test]
fn test_pack_empty_layout() {
    assert_eq!(Layout::empty().pack(&[]).unwrap(), Vec::<u8>::new());
    assert!(Layout::empty().pack(&[1]).is_err());
}

// =============================================================================
// Unpacking Tests
// =============================================================================

#[test]
fn test_unpack_steps_goal_little_endian() {
    let layout: Layout = "<I".parse().unwrap();
    assert_eq!(layout.unpack(&[0xB8, 0x0B, 0x00, 0x00]).unwrap(), vec![3000]);
}

#[test]
fn test_unpack_signed_fields() {
    let layout: Layout = ">hb".parse().unwrap();
    assert_eq!(layout.unpack(&[0xFF, 0xFE, 0x80]).unwrap(), vec![-2, -128]);
}

#[test]
fn test_unpack_length_mismatch() {
    let layout: Layout = "BB".parse().unwrap();
    assert!(matches!(layout.unpack(&[1]), Err(WatchError::Argument(_))));
    assert!(matches!(layout.unpack(&[1, 2, 3]), Err(WatchError::Argument(_))));
}

#[test]
fn test_pack_unpack_mixed_layout() {
    let layout: Layout = ">HhI<iB?".parse().unwrap();
    let values = vec![65535, -32768, 4_000_000_000, -7, 200, 1];
    let packed = layout.pack(&values).unwrap();
    assert_eq!(packed.len(), layout.byte_len());
    assert_eq!(layout.unpack(&packed).unwrap(), values);
}

// =============================================================================
// Field Width Tests
// =============================================================================

#[test]
fn test_field_rejects_unsupported_widths() {
    for bytes in [0usize, 3, 8] {
        let err = Field::new(bytes, true, Endian::Big).unwrap_err();
        assert!(matches!(err, WatchError::Argument(_)));
    }
}

#[test]
fn test_field_from_byte_width() {
    let field = Field::new(4, true, Endian::Big).unwrap();
    assert_eq!(field, Field::i32(Endian::Big));
    assert_eq!(field.width, Width::Four);

    let layout = Layout::new(vec![field]);
    let packed = layout.pack(&[-1]).unwrap();
    assert_eq!(packed, vec![0xFF; 4]);
    assert_eq!(layout.unpack(&packed).unwrap(), vec![-1]);
}

#[test]
fn test_parse_rejects_wide_codes() {
    // 64-bit struct codes have no wire equivalent
    assert!(matches!("q".parse::<Layout>(), Err(WatchError::Argument(_))));
    assert!(matches!("Q".parse::<Layout>(), Err(WatchError::Argument(_))));
}

// =============================================================================
// Notation Tests
// =============================================================================

#[test]
fn test_parse_repeat_count() {
    let layout: Layout = "24B".parse().unwrap();
    assert_eq!(layout.len(), 24);
    assert_eq!(layout, Layout::repeat(Field::u8(), 24));
}

#[test]
fn test_parse_endian_markers() {
    let layout: Layout = "!h<H".parse().unwrap();
    assert_eq!(
        layout.fields(),
        &[Field::i16(Endian::Big), Field::u16(Endian::Little)]
    );
}

#[test]
fn test_parse_rejects_unknown_code() {
    assert!("Q".parse::<Layout>().is_err());
    assert!("4".parse::<Layout>().is_err());
}

#[test]
fn test_display_layout() {
    let layout: Layout = ">Ib".parse().unwrap();
    assert_eq!(layout.to_string(), "\">Ib\"");
    assert_eq!(Layout::empty().to_string(), "\"\"");
}

// =============================================================================
// Value Coercion Tests
// =============================================================================

#[test]
fn test_parse_values() {
    let values = parse_values(&["12", "0x10", "-3", "true", "off"]).unwrap();
    assert_eq!(values, vec![12, 16, -3, 1, 0]);
}

#[test]
fn test_parse_values_rejects_text() {
    assert!(matches!(parse_values(&["twelve"]), Err(WatchError::Argument(_))));
}

// =============================================================================
// Minute Pair Tests
// =============================================================================

#[test]
fn test_minute_pair_encode() {
    assert_eq!(encode_minute_pair(22, 30), 1350);
    assert_eq!(encode_minute_pair(0, 0), 0);
}

#[test]
fn test_minute_pair_round_trip_in_range() {
    for hour in 0..24 {
        for minute in 0..60 {
            assert_eq!(decode_minute_pair(encode_minute_pair(hour, minute)), (hour, minute));
        }
    }
}

#[test]
fn test_minute_pair_negative_is_floored() {
    assert_eq!(decode_minute_pair(-1), (-1, 59));
    assert_eq!(decode_minute_pair(-60), (-1, 0));
}

#[test]
fn test_minute_pair_layout() {
    let layout = minute_pair_layout();
    assert_eq!(layout.unpack(&[0x05, 0x46, 0x01, 0xE0]).unwrap(), vec![1350, 480]);
}
