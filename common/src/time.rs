use time::OffsetDateTime;

/// The current time, in UTC, truncated to microseconds.
///
/// PostgreSQL stores timestamps with microsecond precision. Truncating up front means a value
/// returned to the caller right after an insert is equal to the one read back later.
pub fn now() -> OffsetDateTime {
    truncate_to_micros(OffsetDateTime::now_utc())
}

pub fn truncate_to_micros(input: OffsetDateTime) -> OffsetDateTime {
    let nanos = input.nanosecond();
    input - time::Duration::nanoseconds((nanos % 1_000) as i64)
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test_log::test(rstest::rstest)]
    #[case(datetime!(2024-12-24 15:16:17.123_456_789 UTC), datetime!(2024-12-24 15:16:17.123_456 UTC))]
    #[case(datetime!(2024-12-24 15:16:17.000_000_999 UTC), datetime!(2024-12-24 15:16:17 UTC))]
    #[case(datetime!(2024-12-24 15:16:17 UTC), datetime!(2024-12-24 15:16:17 UTC))]
    fn truncate(#[case] input: OffsetDateTime, #[case] output: OffsetDateTime) {
        assert_eq!(truncate_to_micros(input), output)
    }

    #[test]
    fn now_has_no_sub_micros() {
        assert_eq!(now().nanosecond() % 1_000, 0);
    }
}
