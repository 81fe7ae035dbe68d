use std::io;

use nu_ansi_term::Color::{Blue, DarkGray, Magenta, Red, Yellow};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
};

use crate::{cli::Args, utils::Colored};

/// Collects an event's message and its structured fields.
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

/// Prints `[LEVEL] message key=value ...`.
///
/// `INFO` is the program's regular output: no label and no fields.
pub struct LineFormatter;

impl LineFormatter {
    fn label(level: Level) -> Option<String> {
        let label = match level {
            Level::TRACE => Colored(Magenta, "[TRACE]").to_string(),
            Level::DEBUG => Colored(Blue, "[DEBUG]").to_string(),
            Level::INFO => return None,
            Level::WARN => Colored(Yellow, "[WARN]").to_string(),
            Level::ERROR => Colored(Red, "[ERROR]").to_string(),
        };
        Some(label)
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let level = *event.metadata().level();
        let Some(label) = Self::label(level) else {
            return writeln!(writer, "{}", collector.message);
        };

        write!(writer, "{label} {}", collector.message)?;
        for (name, value) in &collector.fields {
            write!(writer, " {}={value}", Colored(DarkGray, name))?;
        }
        writeln!(writer)
    }
}

/// Plain `INFO` messages are program output and go to stdout; diagnostics
/// go to stderr.
enum StdioWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl io::Write for StdioWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StdioWriter::Stdout(out) => out.write(buf),
            StdioWriter::Stderr(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StdioWriter::Stdout(out) => out.flush(),
            StdioWriter::Stderr(err) => err.flush(),
        }
    }
}

struct WriterBuilder;

impl<'a> MakeWriter<'a> for WriterBuilder {
    type Writer = StdioWriter;

    fn make_writer(&'a self) -> Self::Writer {
        StdioWriter::Stdout(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        if meta.level() == &Level::INFO {
            StdioWriter::Stdout(io::stdout())
        } else {
            StdioWriter::Stderr(io::stderr())
        }
    }
}

fn filter_level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

pub fn setup_logging(args: &Args) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("repokit={}", filter_level(args)))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(WriterBuilder)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(LineFormatter).finish())
    };

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {err}");
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_filter_level() {
        let level = |argv: &[&str]| filter_level(&Args::parse_from(argv));

        assert_eq!(level(&["repokit", "config"]), Level::INFO);
        assert_eq!(level(&["repokit", "-v", "config"]), Level::DEBUG);
        assert_eq!(level(&["repokit", "-vv", "config"]), Level::TRACE);
        assert_eq!(level(&["repokit", "-q", "-vv", "config"]), Level::ERROR);
    }

    #[test]
    fn test_info_has_no_label() {
        assert!(LineFormatter::label(Level::INFO).is_none());
        assert!(LineFormatter::label(Level::WARN).unwrap().contains("[WARN]"));
        assert!(LineFormatter::label(Level::TRACE).unwrap().contains("[TRACE]"));
    }
}
