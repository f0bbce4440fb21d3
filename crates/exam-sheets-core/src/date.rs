//! Excel serial date conversion
//!
//! Excel stores dates as serial numbers: whole days since a base date plus a
//! fraction of a day for the time. In the 1900 date system Excel keeps the
//! historical "1900 leap year" bug, inserting a non-existent 1900-02-29 as
//! serial 60. The 1904 system (old Mac workbooks) counts from 1904-01-01.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const SECONDS_PER_DAY: i64 = 86_400;

/// Largest serial Excel accepts (9999-12-31)
const MAX_SERIAL_DAYS: i64 = 2_958_465;

fn base_1900() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid base date")
}

fn base_1904() -> NaiveDate {
    NaiveDate::from_ymd_opt(1904, 1, 1).expect("valid base date")
}

/// Convert an Excel serial number into a calendar date and time.
///
/// The time of day is rounded to the nearest second. Returns `None` for
/// negative, non-finite or out-of-range serials, and for the fictional
/// 1900-02-29.
pub fn serial_to_datetime(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let mut days = serial.floor() as i64;
    let mut seconds = ((serial - serial.floor()) * SECONDS_PER_DAY as f64).round() as i64;
    if seconds >= SECONDS_PER_DAY {
        days += 1;
        seconds -= SECONDS_PER_DAY;
    }
    if days > MAX_SERIAL_DAYS {
        return None;
    }

    let date = if date_1904 {
        base_1904().checked_add_signed(Duration::days(days))?
    } else {
        match days {
            60 => return None,
            d if d < 60 => base_1900().checked_add_signed(Duration::days(d))?,
            d => base_1900().checked_add_signed(Duration::days(d - 1))?,
        }
    };

    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)?;
    Some(date.and_time(time))
}

/// Convert a calendar date and time into an Excel serial number
pub fn datetime_to_serial(datetime: NaiveDateTime, date_1904: bool) -> f64 {
    let date = datetime.date();
    let days = if date_1904 {
        (date - base_1904()).num_days()
    } else {
        let d = (date - base_1900()).num_days();
        // Dates from 1900-03-01 on sit one past the fictional leap day
        if d >= 60 {
            d + 1
        } else {
            d
        }
    };

    let seconds = datetime.time() - NaiveTime::MIN;
    days as f64 + seconds.num_seconds() as f64 / SECONDS_PER_DAY as f64
}
