use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, PurgeReport, SyncReport, TitleCheck};
use crate::package::PackageDocument;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Machine-readable results on stdout; progress is dropped.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sync(report: &SyncReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_purge(report: &PurgeReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_package(package: &PackageDocument) -> io::Result<()> {
        Self::print_json(package)
    }

    pub fn print_title_check(check: &TitleCheck) -> io::Result<()> {
        Self::print_json(check)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Prints one progress line per event.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn format_event(event: &ProgressEvent) -> String {
        match event.elapsed {
            Some(elapsed) => format!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => event.message.clone(),
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        println!("{}", Self::format_event(&event));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn elapsed_is_appended() {
        let event = ProgressEvent {
            message: "created clm-a".to_string(),
            elapsed: Some(Duration::from_millis(1300)),
        };
        assert_eq!(ConsoleSink::format_event(&event), "created clm-a (1.3s)");

        let event = ProgressEvent {
            message: "creating A".to_string(),
            elapsed: None,
        };
        assert_eq!(ConsoleSink::format_event(&event), "creating A");
    }
}
