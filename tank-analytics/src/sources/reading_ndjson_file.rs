use std::{path::PathBuf, sync::Arc};

use async_stream::stream;
use futures::Stream;
use tank_domain::domain::Reading;
use time::{OffsetDateTime, UtcOffset};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::pipeline::{Envelope, PipelineError, Source};

/// Already-canonical readings, one JSON object per line.
///
/// ```text
/// {"timestamp":"2024-01-01T00:00:00Z","asset_id":"TK-1","level_percent":52.0}
/// ```
///
/// Malformed lines are reported as errors on the stream and skipped; blank
/// lines are ignored.
pub struct ReadingNdjsonFileSource {
    path: PathBuf,
}

#[derive(serde::Deserialize)]
struct IncomingReading {
    #[serde(alias = "ts", with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(alias = "asset")]
    asset_id: String,
    #[serde(default, alias = "level_pct")]
    level_percent: Option<f64>,
    #[serde(default, alias = "level")]
    level_absolute: Option<f64>,
}

impl From<IncomingReading> for Reading {
    fn from(i: IncomingReading) -> Self {
        Reading {
            timestamp: i.timestamp.to_offset(UtcOffset::UTC),
            asset_id: i.asset_id.trim().to_string(),
            level_percent: i.level_percent,
            level_absolute: i.level_absolute,
        }
    }
}

impl ReadingNdjsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<Reading> for ReadingNdjsonFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send>> {
        let path = self.path.clone();
        let s = stream! {
            let origin: Arc<str> = Arc::from(path.display().to_string());
            let file = match File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open readings file: {e}")));
                    return;
                }
            };
            let mut lines = BufReader::new(file).lines();

            let mut line_no = 0_usize;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(PipelineError::Source(format!("failed to read readings line: {e}")));
                        break;
                    }
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<IncomingReading>(&line) {
                    Ok(parsed) => yield Ok(Envelope::new(Reading::from(parsed), origin.clone())),
                    Err(e) => {
                        metrics::counter!("reading_ndjson_parse_errors_total").increment(1);
                        yield Err(PipelineError::Source(format!(
                            "failed to parse readings line {line_no}: {e}"
                        )));
                    }
                }
            }
        };

        Box::pin(s)
    }
}
