use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};
use log::{LevelFilter, error};

/// 저장하지 못한 이벤트를 남기는 로그 타겟
pub const UNSAVED_EVENT_TARGET: &str = "logsearch::unsaved";

/// 로거 세팅, `RUST_LOG`가 있으면 우선한다
pub fn setup_logger() {
    #[cfg(debug_assertions)]
    let level = LevelFilter::Debug;
    #[cfg(not(debug_assertions))]
    let level = LevelFilter::Info;

    let mut builder = Builder::new();
    builder.filter(None, level);

    #[cfg(debug_assertions)]
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {} {}:{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    builder.parse_env(Env::default());

    // 테스트 등에서 두 번 호출될 수 있음
    let _ = builder.try_init();
}

/// 저장 실패한 이벤트 원문을 수동 복구용으로 기록
pub fn log_unsaved_event(payload: &[u8], cause: &dyn std::fmt::Display) {
    error!(
        target: UNSAVED_EVENT_TARGET,
        "감사 이벤트 저장 실패: {} (원인: {cause})",
        String::from_utf8_lossy(payload)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_logger_is_idempotent() {
        setup_logger();
        setup_logger();
        log_unsaved_event(b"{\"time\":\"x\"}", &"timeout");
    }
}
