//! Script execution against an in-memory applet.
//!
//! A script holds one hex command APDU per line. Whitespace inside a line is
//! ignored and everything after `#` is a comment:
//!
//! ```text
//! # create table T (a, b)
//! 00 10 00 80 08 01 54 02 01 61 01 62
//! 00 10 00 88   # open
//! ```

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use scql_apdu::{CommandApdu, ResponseApdu, ScqlApplet};
use scql_engine::Database;

use crate::formatter::{format_exchange, OutputFormat};

/// Outcome of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Commands executed.
    pub commands: usize,
    /// Commands answered with a status other than `9000`.
    pub failures: usize,
}

/// A card session: one applet and the output settings.
pub struct Session {
    applet: ScqlApplet,
    format: OutputFormat,
    echo: bool,
    stop_on_error: bool,
}

impl Session {
    /// Creates a session over `db`.
    pub fn new(db: Database, format: OutputFormat) -> Self {
        Self {
            applet: ScqlApplet::from_database(db),
            format,
            echo: true,
            stop_on_error: false,
        }
    }

    /// Sets whether command APDUs are echoed.
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Sets whether a failing status ends the script.
    #[must_use]
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Returns the database behind the applet.
    pub fn database(&self) -> &Database {
        self.applet.database()
    }

    /// Sends one hex APDU and returns the response with its rendering.
    pub fn execute(&mut self, hex_apdu: &str) -> Result<(ResponseApdu, String)> {
        let apdu = CommandApdu::parse_hex(hex_apdu)?;
        let command = apdu.to_string();
        debug!(apdu = %command, "sending command");

        let response = self.applet.process_command(&apdu);
        let rendered = format_exchange(&command, &response, self.format, self.echo);
        Ok((response, rendered))
    }

    /// Runs a script, printing each exchange to stdout.
    pub fn run_script(&mut self, content: &str) -> Result<Summary> {
        self.run_script_with(content, |line| println!("{line}"))
    }

    /// Runs a script, handing each rendered exchange to `out`.
    pub fn run_script_with(
        &mut self,
        content: &str,
        mut out: impl FnMut(&str),
    ) -> Result<Summary> {
        let mut summary = Summary::default();

        for (line_no, apdu) in script_lines(content) {
            let (response, rendered) = self
                .execute(apdu)
                .with_context(|| format!("line {line_no}: invalid APDU"))?;
            out(&rendered);

            summary.commands += 1;
            if !response.is_success() {
                summary.failures += 1;
                if self.stop_on_error {
                    bail!("line {line_no}: command failed with {}", response.status);
                }
            }
        }

        info!(
            commands = summary.commands,
            failures = summary.failures,
            "script finished"
        );
        Ok(summary)
    }

    /// Ends the session, returning the database.
    pub fn into_database(self) -> Database {
        self.applet.into_database()
    }
}

/// Returns the non-empty lines of a script with their 1-based numbers,
/// comments removed.
pub fn script_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content.lines().enumerate().filter_map(|(i, line)| {
        let code = line.split('#').next().unwrap_or_default().trim();
        (!code.is_empty()).then_some((i + 1, code))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scql_apdu::StatusWord;

    const SCRIPT: &str = "\
# create table T (a, b)
00 10 00 80 08 01 54 02 01 61 01 62

# insert (x, y)
00 10 00 8C 07 01 54 02 01 78 01 79
00 10 00 87 03 01 54 00   # declare
00100088
0010008A
";

    fn session() -> Session {
        Session::new(Database::default(), OutputFormat::Hex)
    }

    #[test]
    fn test_script_lines() {
        let lines: Vec<_> = script_lines(SCRIPT).collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].0, 2);
        assert_eq!(lines[2].1, "00 10 00 87 03 01 54 00");
    }

    #[test]
    fn test_run_script() {
        let mut session = session();
        let mut output = Vec::new();
        let summary = session
            .run_script_with(SCRIPT, |line| output.push(line.to_string()))
            .unwrap();

        assert_eq!(summary, Summary { commands: 5, failures: 0 });
        assert_eq!(output.last().unwrap(), "02017801799000");
    }

    #[test]
    fn test_failures_are_counted() {
        let mut session = session();
        let summary = session
            .run_script_with("00100088\n00100089\n", |_| {})
            .unwrap();
        assert_eq!(summary.failures, 2);

        let mut session = session.with_stop_on_error(true);
        let err = session.run_script_with("00100088\n00100089\n", |_| {}).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_invalid_hex_line() {
        let mut session = session();
        let err = session.run_script_with("00100088\nnot hex\n", |_| {}).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_execute_single() {
        let mut session = session();
        let (response, rendered) = session.execute("00 A4 04 00").unwrap();
        assert_eq!(response.status, StatusWord::SUCCESS);
        assert_eq!(rendered, "9000");
        assert!(session.into_database().catalog().tables().next().is_none());
    }
}
