// Copyright (c) 2021-2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

#[cfg(feature = "chrono")]
use chrono::{DateTime, Datelike, LocalResult, TimeZone, Timelike, Utc};

// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#446

/// A date and time stored as per the MS-DOS representation used by ZIP files.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ZipDateTime {
    pub(crate) date: u16,
    pub(crate) time: u16,
}

impl ZipDateTime {
    /// The fixed stamp every TorrentZip entry carries: 1996-12-24 23:32:00.
    pub const TORRENTZIP: ZipDateTime = ZipDateTime { date: 0x2198, time: 0xBC00 };

    /// Constructs a date & time from its raw MS-DOS date and time words.
    pub const fn from_raw(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Constructs a date & time from its parts.
    ///
    /// Out of range values are clamped; the year must lie between 1980 and 2107.
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let year = (year.clamp(1980, 2107) - 1980) as u16;
        let month = month.clamp(1, 12) as u16;
        let day = day.clamp(1, 31) as u16;
        let hour = hour.min(23) as u16;
        let minute = minute.min(59) as u16;
        let second = (second.min(59) / 2) as u16;

        Self { date: (year << 9) | (month << 5) | day, time: (hour << 11) | (minute << 5) | second }
    }

    /// Returns the raw MS-DOS date word.
    pub fn date(&self) -> u16 {
        self.date
    }

    /// Returns the raw MS-DOS time word.
    pub fn time(&self) -> u16 {
        self.time
    }

    /// Returns the year of this date & time.
    pub fn year(&self) -> i32 {
        (((self.date & 0xFE00) >> 9) + 1980).into()
    }

    /// Returns the month of this date & time.
    pub fn month(&self) -> u32 {
        ((self.date & 0x1E0) >> 5).into()
    }

    /// Returns the day of this date & time.
    pub fn day(&self) -> u32 {
        (self.date & 0x1F).into()
    }

    /// Returns the hour of this date & time.
    pub fn hour(&self) -> u32 {
        ((self.time & 0xF800) >> 11).into()
    }

    /// Returns the minute of this date & time.
    pub fn minute(&self) -> u32 {
        ((self.time & 0x7E0) >> 5).into()
    }

    /// Returns the second of this date & time.
    ///
    /// Note that MS-DOS has a maximum granularity of two seconds.
    pub fn second(&self) -> u32 {
        ((self.time & 0x1F) << 1).into()
    }

    /// Constructs chrono's [`DateTime`] representation of this date & time.
    ///
    /// Note that this requires the `chrono` feature.
    #[cfg(feature = "chrono")]
    pub fn as_chrono(&self) -> LocalResult<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year(), self.month(), self.day(), self.hour(), self.minute(), self.second())
    }

    /// Constructs this date & time from chrono's [`DateTime`] representation.
    ///
    /// Note that this requires the `chrono` feature.
    #[cfg(feature = "chrono")]
    pub fn from_chrono(dt: &DateTime<Utc>) -> Self {
        Self::new(
            dt.date_naive().year(),
            dt.date_naive().month(),
            dt.date_naive().day(),
            dt.time().hour(),
            dt.time().minute(),
            dt.time().second(),
        )
    }
}

impl Default for ZipDateTime {
    fn default() -> Self {
        Self::TORRENTZIP
    }
}
