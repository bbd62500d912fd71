use std::fmt::{self, Display};

const DAYS_PER_MONTH: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Longest rendered date: `65535.12.31`
pub const MAX_DATE_LEN: usize = 11;

/// A calendar date as stored in the binary save format.
///
/// The game does not follow a traditional calendar and instead treats every
/// year as a non-leap year of 365 days. Years are offset by 5000 in the binary
/// encoding so only years `0..=65535` are representable here.
///
/// ```
/// use ck3bin::common::Ck3Date;
/// let date = Ck3Date::from_binary(60759371).unwrap();
/// assert_eq!(date.to_string(), "1936.1.1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ck3Date {
    year: u16,
    month: u8,
    day: u8,
}

impl Ck3Date {
    /// Create a date from its components. Returns none if the month or day
    /// fall outside the game calendar.
    pub fn from_ymd_opt(year: u16, month: u8, day: u8) -> Option<Self> {
        if month != 0 && month < 13 && day != 0 && day <= DAYS_PER_MONTH[usize::from(month)] {
            Some(Ck3Date { year, month, day })
        } else {
            None
        }
    }

    /// Decode a date from the packed binary integer.
    ///
    /// The integer counts hours since year -5000. The hour component is
    /// discarded. Returns none when the year would be negative or does not
    /// fit into 16 bits.
    ///
    /// ```
    /// use ck3bin::common::Ck3Date;
    /// assert_eq!(Ck3Date::from_binary(56379360), Ck3Date::from_ymd_opt(1436, 1, 1));
    /// assert_eq!(Ck3Date::from_binary(-1), None);
    /// ```
    pub fn from_binary(raw: i32) -> Option<Self> {
        let days = raw / 24;
        let days_since_jan1 = days % 365;
        if days_since_jan1 < 0 {
            return None;
        }

        let year = (days / 365).checked_sub(5000)?;
        let year = u16::try_from(year).ok()?;
        let (month, day) = month_day_from_julian(days_since_jan1);
        Some(Ck3Date { year, month, day })
    }

    /// Encode the date into the packed binary integer (hour zero)
    pub fn to_binary(self) -> i32 {
        let ordinal_day = julian_ordinal_day(self.month) + i32::from(self.day);
        ((i32::from(self.year) + 5000) * 365 + ordinal_day) * 24
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    /// Returns the month. Range: [1, 12]
    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }
}

impl Display for Ck3Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.day)
    }
}

fn month_day_from_julian(days_since_jan1: i32) -> (u8, u8) {
    // https://landweb.modaps.eosdis.nasa.gov/browse/calendar.html
    // except we start at 0 instead of 1
    let (month, day) = match days_since_jan1 {
        0..=30 => (1, days_since_jan1 + 1),
        31..=58 => (2, days_since_jan1 - 30),
        59..=89 => (3, days_since_jan1 - 58),
        90..=119 => (4, days_since_jan1 - 89),
        120..=150 => (5, days_since_jan1 - 119),
        151..=180 => (6, days_since_jan1 - 150),
        181..=211 => (7, days_since_jan1 - 180),
        212..=242 => (8, days_since_jan1 - 211),
        243..=272 => (9, days_since_jan1 - 242),
        273..=303 => (10, days_since_jan1 - 272),
        304..=333 => (11, days_since_jan1 - 303),
        334..=364 => (12, days_since_jan1 - 333),
        _ => unreachable!(),
    };

    debug_assert!(day < 255);
    (month, day as u8)
}

fn julian_ordinal_day(month: u8) -> i32 {
    match month {
        1 => -1,
        2 => 30,
        3 => 58,
        4 => 89,
        5 => 119,
        6 => 150,
        7 => 180,
        8 => 211,
        9 => 242,
        10 => 272,
        11 => 303,
        12 => 333,
        _ => unreachable!(),
    }
}
