//! CSV output.

use crate::error::{Result, ScrapeError};
use crate::record::VideoRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of every export.
pub const HEADER: [&str; 7] = [
    "video_id",
    "title",
    "views",
    "likes",
    "upload_date",
    "transcript_available",
    "transcript",
];

/// Writes a header row and one row per record, returning the number of data rows.
///
/// Rows end in CRLF as RFC 4180 prescribes. Unknown counts and dates are written as empty
/// fields, never as `0`.
pub fn write_csv<W: Write>(writer: W, records: &[VideoRecord]) -> Result<usize> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    csv.write_record(HEADER)?;

    for record in records {
        let details = &record.details;
        let views = optional(details.views);
        let likes = optional(details.likes);
        let upload_date = optional(details.upload_date);
        let transcript_available = if record.transcript.is_available() {
            "True"
        } else {
            "False"
        };
        csv.write_record([
            record.video_id.as_str(),
            details.title.as_str(),
            views.as_str(),
            likes.as_str(),
            upload_date.as_str(),
            transcript_available,
            record.transcript.text(),
        ])?;
    }

    csv.flush().map_err(ScrapeError::export_io)?;
    Ok(records.len())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Renders the records as an in-memory CSV document.
pub fn to_csv_bytes(records: &[VideoRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    Ok(buf)
}

/// Writes the records to `path` in one go.
///
/// The document is rendered fully before the file is touched, so a failure while
/// rendering leaves no file behind. There is no guarantee beyond that.
pub async fn export_to_path(path: &Path, records: &[VideoRecord]) -> Result<usize> {
    let bytes = to_csv_bytes(records)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(ScrapeError::export_io)?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote CSV");
    Ok(records.len())
}

/// `youtube_channel_<channel>_<YYYYmmdd_HHMMSS>.csv`, using the local time.
pub fn default_file_name(channel_id: &str) -> PathBuf {
    let timestamp = jiff::Zoned::now().strftime("%Y%m%d_%H%M%S");
    PathBuf::from(format!("youtube_channel_{channel_id}_{timestamp}.csv"))
}
