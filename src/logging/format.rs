//! Event formatters for terminal output

use console::Style;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Prefix stripped from targets of this crate
const CRATE_TARGET: &str = "sputnik_treasury::";

/// Default text formatter.
///
/// ```text
/// 2024-01-15 10:30:45 INFO  queries::proposals dao_id=treasury.sputnik-dao.near proposal page ready
/// ```
///
/// Levels are coloured when the writer supports ANSI escapes.
pub struct TreasuryFormatter;

impl<S, N> FormatEvent<S, N> for TreasuryFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let ansi = writer.has_ansi_escapes();
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        write!(
            writer,
            "{} {} {} ",
            timestamp,
            styled_level(*metadata.level(), ansi),
            short_target(metadata.target())
        )?;

        // Enclosing spans, outermost first
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}:", span.name())?;
            }
            write!(writer, " ")?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Level and message only, for interactive CLI use.
///
/// ```text
/// warn: indexer unavailable, scanning contract
/// ```
pub struct CompactFormatter;

impl<S, N> FormatEvent<S, N> for CompactFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let label = level_label(*event.metadata().level()).trim_end().to_lowercase();
        if writer.has_ansi_escapes() {
            write!(writer, "{}: ", level_style(*event.metadata().level()).force_styling(true).apply_to(label))?;
        } else {
            write!(writer, "{}: ", label)?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO ",
        Level::WARN => "WARN ",
        Level::ERROR => "ERROR",
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::TRACE => Style::new().dim(),
        Level::DEBUG => Style::new().blue(),
        Level::INFO => Style::new().green(),
        Level::WARN => Style::new().yellow(),
        Level::ERROR => Style::new().red().bold(),
    }
}

fn styled_level(level: Level, ansi: bool) -> String {
    let label = level_label(level);
    if ansi {
        level_style(level).force_styling(true).apply_to(label).to_string()
    } else {
        label.to_string()
    }
}

fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_TARGET).unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_labels_are_aligned() {
        for level in [Level::TRACE, Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR] {
            assert_eq!(level_label(level).len(), 5);
        }
    }

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("sputnik_treasury::voting"), "voting");
        assert_eq!(short_target("reqwest::connect"), "reqwest::connect");
    }

    #[test]
    fn test_plain_level_has_no_escapes() {
        assert_eq!(styled_level(Level::WARN, false), "WARN ");
        assert!(styled_level(Level::WARN, true).contains('\u{1b}'));
    }
}
