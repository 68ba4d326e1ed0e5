//! `1h30m`, `250ms`, `1.5s` 형식의 기간 문자열 해석.
//!
//! 감사 이벤트의 `timeToResponse` 필드와 검색 요청의 `last` 파라미터가
//! 같은 표기를 사용한다.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use logsearch_error::{Result, parse_err};

static WHOLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+(?:\.[0-9]+)?(?:ns|us|µs|ms|s|m|h|d))+$")
        .expect("duration pattern is valid")
});

static PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)(?:\.([0-9]+))?(ns|us|µs|ms|s|m|h|d)").expect("duration pattern is valid")
});

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" | "µs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => 86_400 * 1_000_000_000,
    }
}

/// 기간 문자열을 `Duration`으로 변환
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if !WHOLE.is_match(text) {
        return Err(parse_err(format!("기간 형식 오류: {text:?}")));
    }

    let overflow = || parse_err(format!("기간 범위 초과: {text:?}"));
    let mut total: u128 = 0;
    for caps in PART.captures_iter(text) {
        let unit = unit_nanos(&caps[3]);
        let whole: u128 = caps[1].parse().map_err(|_| overflow())?;
        let mut nanos = whole.checked_mul(unit).ok_or_else(overflow)?;

        if let Some(frac) = caps.get(2) {
            // 단위보다 작은 자릿수는 버림
            let digits = frac.as_str();
            let mut scale = unit;
            for digit in digits.bytes() {
                scale /= 10;
                if scale == 0 {
                    break;
                }
                nanos = nanos
                    .checked_add(u128::from(digit - b'0') * scale)
                    .ok_or_else(overflow)?;
            }
        }
        total = total.checked_add(nanos).ok_or_else(overflow)?;
    }

    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| overflow())?;
    let subsec = (total % 1_000_000_000) as u32;
    Ok(Duration::new(secs, subsec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsearch_error::LogSearchError;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("123ns").unwrap(), Duration::from_nanos(123));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("15s").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(7 * 86_400));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parses_compound_and_fractional_values() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(
            parse_duration("2.345678ms").unwrap(),
            Duration::from_nanos(2_345_678)
        );
        assert_eq!(parse_duration("3µs").unwrap(), Duration::from_micros(3));
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "10", "abc", "5 s", "-1s", "1h-", "s"] {
            assert!(
                matches!(parse_duration(text), Err(LogSearchError::Parse(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn oversized_values_are_errors_not_panics() {
        for text in [
            "340282366920938463463374607431768211.999us",
            "340282366920938463463374607431768211455ns1ns",
            "99999999999999999999999999999999999999999d",
            "6000000000000000h",
        ] {
            assert!(
                matches!(parse_duration(text), Err(LogSearchError::Parse(_))),
                "{text:?} should overflow"
            );
        }
    }
}
