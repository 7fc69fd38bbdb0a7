//! Events command implementation.
//!
//! Reads the scheduler event log from disk; no master connection needed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;

use lava_client::{EventLogReader, EventRecord, format_job_id};

use super::common::{GlobalOpts, full_time, load_config, print_json};

/// Event selection for `lava events`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub job_id: Option<i64>,
    pub event_type: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &EventRecord) -> bool {
        if self.job_id.is_some_and(|id| event.job_id() != Some(id)) {
            return false;
        }
        self.event_type
            .as_deref()
            .is_none_or(|t| event.event_type.name().eq_ignore_ascii_case(t))
    }
}

/// Execute the events command.
pub async fn execute(
    opts: &GlobalOpts,
    file: Option<PathBuf>,
    job_id: Option<i64>,
    event_type: Option<&str>,
) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => load_config(opts)?
            .event_log()
            .context("Cannot locate the event log, pass --file")?,
    };
    let filter = EventFilter {
        job_id,
        event_type: event_type.map(str::to_string),
    };

    let mut reader = EventLogReader::open(&path)
        .await
        .with_context(|| format!("Failed to open event log: {}", path.display()))?;

    let mut events = Vec::new();
    while let Some(event) = reader.next_event().await? {
        if filter.matches(&event) {
            events.push(event);
        }
    }

    if opts.json {
        print_json(&events)?;
    } else {
        print_events(&events);
    }

    let malformed = reader.malformed();
    if !malformed.is_empty() {
        eprintln!(
            "{} {} malformed line(s) skipped in {}",
            style("⚠").yellow().bold(),
            malformed.len(),
            path.display()
        );
        for bad in malformed {
            eprintln!("  line {}: {}", bad.line, style(&bad.reason).dim());
        }
    }

    Ok(())
}

fn print_events(events: &[EventRecord]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    println!(
        "{:<6}  {:<20}  {:<12}  {}",
        style("LINE").bold(),
        style("TIME").bold(),
        style("EVENT").bold(),
        style("JOBID").bold()
    );
    for event in events {
        println!(
            "{:<6}  {:<20}  {:<12}  {}",
            event.line,
            full_time(&event.event_time),
            event.event_type.name(),
            event.job_id().map(format_job_id).unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = concat!(
        r#""JOB_CLEAN" "2.0" 1389283800 101 0"#,
        "\n",
        r#""JOB_CLEAN" "2.0" 1389283810 102 0"#,
        "\n",
        "garbage\n",
        r#""LOG_SWITCH" "2.0" 1389283900 102"#,
        "\n",
    );

    async fn read(filter: &EventFilter) -> Vec<EventRecord> {
        let mut reader = EventLogReader::new(LOG.as_bytes());
        let mut out = Vec::new();
        while let Some(event) = reader.next_event().await.unwrap() {
            if filter.matches(&event) {
                out.push(event);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_filter_by_job() {
        let events = read(&EventFilter {
            job_id: Some(102),
            ..EventFilter::default()
        })
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].line, 2);
    }

    #[tokio::test]
    async fn test_filter_by_type_ignores_case() {
        let events = read(&EventFilter {
            event_type: Some("log_switch".into()),
            ..EventFilter::default()
        })
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].job_id(), None);
    }

    #[tokio::test]
    async fn test_events_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lsb.events");
        std::fs::write(&path, LOG).unwrap();

        let opts = GlobalOpts {
            json: true,
            ..GlobalOpts::default()
        };
        execute(&opts, Some(path), None, None).await.unwrap();

        let missing = dir.path().join("nope");
        assert!(execute(&opts, Some(missing), None, None).await.is_err());
    }
}
