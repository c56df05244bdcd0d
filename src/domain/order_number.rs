//! Order numbers look like `NOV-12345678`: three letters picked (with
//! replacement) from the current month's English name, then two random
//! digits, the second of the minute, two random digits and the hour (24h).
//!
//! Values are not guaranteed unique. Collisions are absorbed by the
//! idempotent `create_order` and the store's unique constraint.

use chrono::{Datelike, Local, Timelike};
use rand::Rng;

const MONTHS: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

pub fn generate() -> String {
    generate_at(&Local::now(), &mut rand::thread_rng())
}

pub fn generate_at<T, R>(now: &T, rng: &mut R) -> String
where
    T: Datelike + Timelike,
    R: Rng,
{
    let letters = MONTHS[now.month0() as usize].as_bytes();
    let prefix: String = (0..3)
        .map(|_| letters[rng.gen_range(0..letters.len())] as char)
        .collect();

    format!(
        "{}-{:02}{:02}{:02}{:02}",
        prefix,
        rng.gen_range(0..100u32),
        now.second(),
        rng.gen_range(0..100u32),
        now.hour()
    )
}

/// Whether `value` has the `AAA-00000000` shape.
pub fn is_well_formed(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 12
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3] == b'-'
        && bytes[4..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn at(month: u32, hour: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, month, 14)
            .and_then(|d| d.and_hms_opt(hour, 7, second))
            .expect("valid timestamp")
    }

    #[test]
    fn generated_numbers_are_well_formed() {
        for _ in 0..500 {
            let number = generate();
            assert!(is_well_formed(&number), "malformed order number {number}");
        }
    }

    #[test]
    fn prefix_letters_come_from_the_month_name() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let number = generate_at(&at(11, 9, 3), &mut rng);
            assert!(number[..3].chars().all(|c| "NOVEMBER".contains(c)), "{number}");
        }
    }

    #[test]
    fn second_and_hour_are_embedded() {
        let mut rng = StdRng::seed_from_u64(42);
        let number = generate_at(&at(5, 23, 4), &mut rng);
        assert!(is_well_formed(&number));
        assert_eq!(&number[6..8], "04");
        assert_eq!(&number[10..12], "23");
        assert!(number[..3].chars().all(|c| "MAY".contains(c)));
    }

    #[test]
    fn midnight_hour_is_zero_padded() {
        let mut rng = StdRng::seed_from_u64(1);
        let number = generate_at(&at(1, 0, 59), &mut rng);
        assert_eq!(&number[6..8], "59");
        assert_eq!(&number[10..12], "00");
    }

    #[test]
    fn well_formed_check() {
        assert!(is_well_formed("NOV-12345678"));
        assert!(!is_well_formed("NOV-1234567"));
        assert!(!is_well_formed("nov-12345678"));
        assert!(!is_well_formed("NOV_12345678"));
        assert!(!is_well_formed("NOV-1234567a"));
    }
}
