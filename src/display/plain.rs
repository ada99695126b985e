// src/display/plain.rs
//! Line-per-tick output for pipes and logs

use super::{format_status_line, TrackingDisplay};
use crate::{error::Result, session::SessionSnapshot};
use std::io::Write;

pub struct PlainDisplay<W: Write> {
    out: W,
    last_line: Option<String>,
}

impl PlainDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> PlainDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out, last_line: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TrackingDisplay for PlainDisplay<W> {
    fn render(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        let line = format_status_line(snapshot);
        // unchanged lines are not repeated
        if self.last_line.as_deref() == Some(line.as_str()) {
            return Ok(());
        }
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        self.last_line = Some(line);
        Ok(())
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "!! {}", message)?;
        Ok(())
    }
}
