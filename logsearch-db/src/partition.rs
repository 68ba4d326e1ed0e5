//! 시간 범위 파티션 계산.
//!
//! 한 달을 1, 8, 15, 22일 00:00:00 UTC 기준으로 네 구간으로 나눈다.
//! 마지막 구간은 22일부터 다음 달 1일 직전까지이므로 달마다 길이가 다르다(7~10일).
//! 모든 구간은 `[start, end)` 반개구간이며 빈틈이나 겹침 없이 시간축을 덮는다.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use logsearch_error::{LogSearchError, Result};

/// 각 구간이 시작하는 날짜
const CUT_DAYS: [u32; 4] = [1, 8, 15, 22];

/// 파티션 이름이 항상 네 자리 연도를 갖도록 제한
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// 하나의 물리 파티션에 대응하는 시간 구간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionWindow {
    year: i32,
    month: u32,
    quarter: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl PartitionWindow {
    /// 주어진 시각을 포함하는 구간
    pub fn containing(instant: DateTime<Utc>) -> Result<Self> {
        let quarter = match instant.day() {
            1..=7 => 1,
            8..=14 => 2,
            15..=21 => 3,
            _ => 4,
        };
        Self::from_parts(instant.year(), instant.month(), quarter)
    }

    /// RFC3339 문자열이 가리키는 시각의 구간, 과거 데이터 적재용 파티션 준비에 쓴다
    pub fn from_rfc3339(text: &str) -> Result<Self> {
        let instant = DateTime::parse_from_rfc3339(text)
            .map_err(|e| LogSearchError::InvalidTimestamp(format!("{text:?}: {e}")))?;
        Self::containing(instant.with_timezone(&Utc))
    }

    /// 연, 월, 구간 번호(1~4)로 생성
    pub fn from_parts(year: i32, month: u32, quarter: u32) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(LogSearchError::InvalidTimestamp(format!(
                "지원하지 않는 연도: {year}"
            )));
        }
        if !(1..=4).contains(&quarter) {
            return Err(LogSearchError::InvalidTimestamp(format!(
                "잘못된 구간 번호: {quarter}"
            )));
        }

        let start = midnight(year, month, CUT_DAYS[quarter as usize - 1])?;
        let end = if quarter < 4 {
            midnight(year, month, CUT_DAYS[quarter as usize])?
        } else {
            let (next_year, next_month) = following_month(year, month);
            midnight(next_year, next_month, 1)?
        };

        Ok(Self {
            year,
            month,
            quarter,
            start,
            end,
        })
    }

    /// 바로 앞 구간
    pub fn previous(&self) -> Result<Self> {
        if self.quarter > 1 {
            Self::from_parts(self.year, self.month, self.quarter - 1)
        } else if self.month > 1 {
            Self::from_parts(self.year, self.month - 1, 4)
        } else {
            Self::from_parts(self.year - 1, 12, 4)
        }
    }

    /// 바로 뒤 구간
    pub fn next(&self) -> Result<Self> {
        if self.quarter < 4 {
            Self::from_parts(self.year, self.month, self.quarter + 1)
        } else {
            let (year, month) = following_month(self.year, self.month);
            Self::from_parts(year, month, 1)
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// 파티션 이름 접미사 (`202403q3`)
    pub fn suffix(&self) -> String {
        format!("{:04}{:02}q{}", self.year, self.month, self.quarter)
    }

    /// 부모 테이블 기준 파티션 테이블 이름
    pub fn partition_name(&self, parent: &str) -> String {
        format!("{parent}_{}", self.suffix())
    }
}

impl fmt::Display for PartitionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {})",
            self.suffix(),
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

fn midnight(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            LogSearchError::InvalidTimestamp(format!("잘못된 날짜: {year}-{month}-{day}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn mid_month_instant_lands_in_third_quarter() {
        let window = PartitionWindow::containing(utc(2024, 3, 15, 10, 0, 0)).unwrap();
        assert_eq!(window.start(), utc(2024, 3, 15, 0, 0, 0));
        assert_eq!(window.end(), utc(2024, 3, 22, 0, 0, 0));
        assert_eq!(window.suffix(), "202403q3");
        assert_eq!(window.partition_name("request_info"), "request_info_202403q3");
    }

    #[test]
    fn cut_points_belong_to_the_later_window() {
        let at_cut = PartitionWindow::containing(utc(2024, 3, 8, 0, 0, 0)).unwrap();
        assert_eq!(at_cut.suffix(), "202403q2");

        let just_before = PartitionWindow::containing(
            utc(2024, 3, 8, 0, 0, 0) - chrono::Duration::nanoseconds(1),
        )
        .unwrap();
        assert_eq!(just_before.suffix(), "202403q1");
        assert_eq!(just_before.end(), at_cut.start());
    }

    #[test]
    fn last_quarter_runs_to_next_month() {
        let feb_leap = PartitionWindow::from_parts(2024, 2, 4).unwrap();
        assert_eq!(feb_leap.start(), utc(2024, 2, 22, 0, 0, 0));
        assert_eq!(feb_leap.end(), utc(2024, 3, 1, 0, 0, 0));

        let december = PartitionWindow::from_parts(2023, 12, 4).unwrap();
        assert_eq!(december.end(), utc(2024, 1, 1, 0, 0, 0));
        assert_eq!(december.next().unwrap().suffix(), "202401q1");
    }

    #[test]
    fn previous_crosses_year_boundary() {
        let first = PartitionWindow::from_parts(2024, 1, 1).unwrap();
        let prev = first.previous().unwrap();
        assert_eq!(prev.suffix(), "202312q4");
        assert_eq!(prev.end(), first.start());
    }

    #[test]
    fn rfc3339_input_is_validated() {
        let window = PartitionWindow::from_rfc3339("2024-03-15T10:00:00.123456789Z").unwrap();
        assert_eq!(window.suffix(), "202403q3");

        let offset = PartitionWindow::from_rfc3339("2024-03-01T01:00:00+02:00").unwrap();
        assert_eq!(offset.suffix(), "202402q4");

        assert!(matches!(
            PartitionWindow::from_rfc3339("15/03/2024"),
            Err(LogSearchError::InvalidTimestamp(_))
        ));
        assert!(PartitionWindow::from_parts(2024, 13, 1).is_err());
        assert!(PartitionWindow::from_parts(2024, 1, 5).is_err());
    }

    #[test]
    fn year_range_is_bounded() {
        let last = PartitionWindow::from_parts(9999, 12, 4).unwrap();
        assert!(last.next().is_err());
        assert!(PartitionWindow::from_parts(10_000, 1, 1).is_err());
        assert!(PartitionWindow::from_parts(1, 1, 1).unwrap().previous().is_err());
    }

    proptest! {
        #[test]
        fn windows_tile_the_timeline(
            secs in 0i64..7_258_118_400, // 1970-01-01 ~ 2200-01-01
            nanos in 0u32..1_000_000_000,
        ) {
            let instant = DateTime::from_timestamp(secs, nanos).unwrap();
            let window = PartitionWindow::containing(instant).unwrap();
            prop_assert!(window.contains(instant));
            prop_assert!(window.start() < window.end());

            let prev = window.previous().unwrap();
            let next = window.next().unwrap();
            prop_assert_eq!(prev.end(), window.start());
            prop_assert_eq!(next.start(), window.end());
            prop_assert!(!prev.contains(instant));
            prop_assert!(!next.contains(instant));
            prop_assert_eq!(prev.next().unwrap(), window);
            prop_assert_eq!(next.previous().unwrap(), window);
        }

        #[test]
        fn window_lengths_stay_within_bounds(
            year in 1971i32..2199,
            month in 1u32..=12,
            quarter in 1u32..=4,
        ) {
            let window = PartitionWindow::from_parts(year, month, quarter).unwrap();
            let days = (window.end() - window.start()).num_days();
            if quarter < 4 {
                prop_assert_eq!(days, 7);
            } else {
                prop_assert!((7..=10).contains(&days));
            }
            prop_assert_eq!(PartitionWindow::containing(window.start()).unwrap(), window);
        }
    }
}
