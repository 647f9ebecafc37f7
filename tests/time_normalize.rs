use chart_sync_wasm::domain::errors::SyncError;
use chart_sync_wasm::time_utils::{RawTime, normalize};
use chrono::{TimeZone, Utc};
use quickcheck_macros::quickcheck;

#[quickcheck]
fn millis_floor_to_seconds(ms: i64) -> bool {
    // keep within the range f64 represents exactly
    let ms = ms % (1 << 50);
    normalize(&RawTime::Millis(ms as f64)).unwrap() == ms.div_euclid(1_000)
}

#[quickcheck]
fn rfc3339_matches_epoch_millis(seconds: u32) -> bool {
    let seconds = i64::from(seconds);
    let Some(date) = Utc.timestamp_opt(seconds, 0).single() else {
        return true;
    };
    let text = date.to_rfc3339();
    normalize(&RawTime::from(text.as_str())).unwrap() == seconds
        && normalize(&RawTime::Millis(seconds as f64 * 1_000.0 + 999.0)).unwrap() == seconds
}

#[test]
fn all_forms_of_one_instant_agree() {
    let expected = 1_758_285_240;
    let forms = [
        RawTime::from("2025-09-19T12:34:00Z"),
        RawTime::from("2025-09-19T12:34:00.250Z"),
        RawTime::from("2025-09-19T08:34:00-04:00"),
        RawTime::from("2025-09-19T12:34:00"),
        RawTime::from(" 2025-09-19 12:34:00 "),
        RawTime::Millis(1_758_285_240_999.0),
        RawTime::from(Utc.with_ymd_and_hms(2025, 9, 19, 12, 34, 0).unwrap()),
    ];
    for raw in forms {
        assert_eq!(normalize(&raw).unwrap(), expected, "{raw:?}");
    }
}

#[test]
fn unusable_values_are_time_errors() {
    for raw in [
        RawTime::from("19/09/2025"),
        RawTime::from("2025-13-45"),
        RawTime::Millis(f64::INFINITY),
    ] {
        assert!(matches!(normalize(&raw), Err(SyncError::InvalidTimeFormat(_))), "{raw:?}");
    }
}

#[test]
fn numbers_and_strings_deserialize_untagged() {
    let raw: Vec<RawTime> = serde_json::from_str(r#"[1758285240000, "2025-09-19T12:34:00Z"]"#).unwrap();
    assert_eq!(raw[0], RawTime::Millis(1_758_285_240_000.0));
    assert_eq!(normalize(&raw[0]).unwrap(), normalize(&raw[1]).unwrap());
}
