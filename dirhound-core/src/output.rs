// Output sink for persisted findings

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A genuine finding, as handed to printers and writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub url: String,
    pub status_code: u16,
    pub size: Option<u64>,
    pub is_dir: bool,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Wall time of the probe, HEAD plus any verification GET.
    #[serde(default)]
    pub response_time_ms: u64,
}

/// Called for every displayed finding, reliable or not
pub type FindingCallback = Arc<dyn Fn(&Finding) + Send + Sync>;

/// Destination for findings worth persisting. The engine guarantees each
/// slash-normalized URL is written at most once per scan.
pub trait OutputSink: Send + Sync {
    fn write_finding(&self, finding: &Finding) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// URL only
    Url,
    /// `[status] [DIR|FILE] [size] [content-type] [time] url`
    Full,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "url" => Some(OutputFormat::Url),
            "full" => Some(OutputFormat::Full),
            "json" | "jsonl" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Line-buffered file writer, flushed after every finding
pub struct OutputWriter {
    path: PathBuf,
    format: OutputFormat,
    writer: Mutex<BufWriter<File>>,
}

impl OutputWriter {
    pub fn create(path: &Path, format: OutputFormat) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            format,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> io::Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .flush()
    }
}

impl OutputSink for OutputWriter {
    fn write_finding(&self, finding: &Finding) -> io::Result<()> {
        let line = format_finding(finding, self.format)?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

pub fn format_finding(finding: &Finding, format: OutputFormat) -> io::Result<String> {
    match format {
        OutputFormat::Url => Ok(finding.url.clone()),
        OutputFormat::Full => {
            let kind = if finding.is_dir { "DIR" } else { "FILE" };
            let size = finding
                .size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let content_type = finding.content_type.as_deref().unwrap_or("-");
            Ok(format!(
                "[{}] [{}] [{}] [{}] [{}ms] {}",
                finding.status_code,
                kind,
                size,
                content_type,
                finding.response_time_ms,
                finding.url
            ))
        }
        OutputFormat::Json => serde_json::to_string(finding).map_err(io::Error::other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn finding() -> Finding {
        Finding {
            url: "http://e.com/admin/".to_string(),
            status_code: 301,
            size: Some(0),
            is_dir: true,
            depth: 0,
            redirect_to: Some("/admin/login".to_string()),
            content_type: Some("text/html".to_string()),
            response_time_ms: 42,
        }
    }

    #[test]
    fn test_format_url_and_full() {
        assert_eq!(
            format_finding(&finding(), OutputFormat::Url).unwrap(),
            "http://e.com/admin/"
        );
        assert_eq!(
            format_finding(&finding(), OutputFormat::Full).unwrap(),
            "[301] [DIR] [0] [text/html] [42ms] http://e.com/admin/"
        );

        let mut bare = finding();
        bare.content_type = None;
        assert_eq!(
            format_finding(&bare, OutputFormat::Full).unwrap(),
            "[301] [DIR] [0] [-] [42ms] http://e.com/admin/"
        );
    }

    #[test]
    fn test_format_json_parses_back() {
        let line = format_finding(&finding(), OutputFormat::Json).unwrap();
        let parsed: Finding = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, finding());
        assert!(line.contains(r#""content_type":"text/html""#));
        assert!(line.contains(r#""response_time_ms":42"#));
    }

    #[test]
    fn test_writer_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let writer = OutputWriter::create(&path, OutputFormat::Url).unwrap();

        writer.write_finding(&finding()).unwrap();
        let mut second = finding();
        second.url = "http://e.com/backup.zip".to_string();
        writer.write_finding(&second).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "http://e.com/admin/\nhttp://e.com/backup.zip\n");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("full"), Some(OutputFormat::Full));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }
}
