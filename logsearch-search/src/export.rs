//! 검색 결과를 출력 형식으로 직렬화.
//!
//! ndjson과 csv는 한 행씩 버퍼에 인코딩해 바로 내보낸다. 기본 형식은 페이지 크기로
//! 제한된 결과를 모아 하나의 JSON 배열로 한 번에 쓴다. 중간에 실패하면 이미 쓴
//! 출력은 되돌리지 않으므로 호출자는 실패한 결과를 버려야 한다.

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use logsearch_db::{RawLogRecord, RequestInfoRecord, TableKind};
use logsearch_error::{LogSearchError, Result, internal_err, sink_err};

use crate::cursor::{Record, RowCursor};
use crate::request::ExportFormat;

/// 로그 문서를 해석한 원본 로그 출력 행
#[derive(Debug, Serialize)]
struct LogEventRow {
    event_time: DateTime<Utc>,
    log: Value,
}

/// JSON 출력 행
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JsonRow {
    Log(LogEventRow),
    RequestInfo(RequestInfoRecord),
}

impl JsonRow {
    fn decode(record: Record) -> Result<Self> {
        match record {
            Record::RawLog(raw) => {
                let log = serde_json::from_str(&raw.log).map_err(|e| {
                    LogSearchError::Parse(format!(
                        "{} 로그 문서 해석 실패: {e}",
                        raw.event_time
                    ))
                })?;
                Ok(JsonRow::Log(LogEventRow {
                    event_time: raw.event_time,
                    log,
                }))
            }
            Record::RequestInfo(info) => Ok(JsonRow::RequestInfo(info)),
        }
    }
}

/// 커서의 모든 행을 형식에 맞춰 쓰고 행 수를 돌려준다
pub async fn write_records<C, W>(
    cursor: &mut C,
    target: TableKind,
    format: ExportFormat,
    sink: &mut W,
) -> Result<u64>
where
    C: RowCursor + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let count = match format {
        ExportFormat::Ndjson => write_ndjson(cursor, sink).await?,
        ExportFormat::Csv => write_csv(cursor, target, sink).await?,
        ExportFormat::None => write_json_page(cursor, sink).await?,
    };
    sink.flush()
        .await
        .map_err(|e| sink_err(format!("출력 스트림 flush 실패: {e}")))?;

    debug!("{target:?} 검색 결과 {count}건 전송 ({format:?})");
    Ok(count)
}

async fn write_ndjson<C, W>(cursor: &mut C, sink: &mut W) -> Result<u64>
where
    C: RowCursor + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = Vec::with_capacity(1024);
    let mut count = 0;

    while let Some(record) = cursor.next_record().await? {
        buf.clear();
        serde_json::to_writer(&mut buf, &JsonRow::decode(record)?)
            .map_err(|e| internal_err(format!("JSON 인코딩 실패: {e}")))?;
        buf.push(b'\n');
        write_chunk(sink, &buf).await?;
        count += 1;
    }
    Ok(count)
}

async fn write_csv<C, W>(cursor: &mut C, target: TableKind, sink: &mut W) -> Result<u64>
where
    C: RowCursor + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = Vec::with_capacity(1024);
    encode_csv_row(&mut buf, target.columns())?;
    write_chunk(sink, &buf).await?;

    let mut count = 0;
    while let Some(record) = cursor.next_record().await? {
        let fields = match (target, record) {
            (TableKind::RawLog, Record::RawLog(raw)) => raw_log_fields(raw),
            (TableKind::RequestInfo, Record::RequestInfo(info)) => request_info_fields(info),
            (target, record) => {
                return Err(internal_err(format!(
                    "{target:?} 결과에 다른 유형의 행: {record:?}"
                )));
            }
        };
        buf.clear();
        encode_csv_row(&mut buf, &fields)?;
        write_chunk(sink, &buf).await?;
        count += 1;
    }
    Ok(count)
}

/// csv 한 행을 버퍼 끝에 인코딩
fn encode_csv_row<I, T>(buf: &mut Vec<u8>, fields: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(&mut *buf);
    writer
        .write_record(fields)
        .and_then(|()| writer.flush().map_err(csv::Error::from))
        .map_err(|e| internal_err(format!("CSV 인코딩 실패: {e}")))
}

async fn write_json_page<C, W>(cursor: &mut C, sink: &mut W) -> Result<u64>
where
    C: RowCursor + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let mut rows = Vec::new();
    while let Some(record) = cursor.next_record().await? {
        rows.push(JsonRow::decode(record)?);
    }

    let mut buf = serde_json::to_vec(&rows)
        .map_err(|e| internal_err(format!("JSON 인코딩 실패: {e}")))?;
    buf.push(b'\n');
    write_chunk(sink, &buf).await?;
    Ok(rows.len() as u64)
}

async fn write_chunk<W>(sink: &mut W, chunk: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    sink.write_all(chunk)
        .await
        .map_err(|e| sink_err(format!("출력 스트림 쓰기 실패: {e}")))
}

/// CSV 시각 형식, 나노초 9자리 고정
fn csv_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// 없으면 빈 문자열
fn csv_optional(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn raw_log_fields(raw: RawLogRecord) -> Vec<String> {
    vec![csv_time(raw.event_time), raw.log]
}

fn request_info_fields(info: RequestInfoRecord) -> Vec<String> {
    vec![
        csv_time(info.time),
        info.api_name,
        info.access_key,
        info.bucket,
        info.object,
        csv_optional(info.time_to_response_ns),
        info.remote_host,
        info.request_id,
        info.user_agent,
        info.response_status,
        info.response_status_code.to_string(),
        csv_optional(info.request_content_length),
        csv_optional(info.response_content_length),
    ]
}
