use crate::RuntimeError;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use tracing::debug;

/// Copy a component's log stream to `writer`.
///
/// With `follow` every byte is forwarded as it arrives until the stream
/// closes. Otherwise only the last `max_lines` lines are written, or the
/// whole stream when no bound is given. Returns the number of lines written.
pub fn display_log(
    follow: bool,
    reader: impl Read,
    mut writer: impl Write,
    component: &str,
    max_lines: Option<usize>,
) -> Result<usize, RuntimeError> {
    debug!("displaying logs of {component} (follow: {follow})");
    let mut reader = BufReader::new(reader);

    if follow || max_lines.is_none() {
        let mut lines = 0;
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            writer.write_all(&line)?;
            // Followed output must show up immediately.
            writer.flush()?;
            lines += 1;
        }
        return Ok(lines);
    }

    let limit = max_lines.unwrap_or(usize::MAX);
    let mut tail: VecDeque<String> = VecDeque::new();
    // Read to the end even when nothing is kept so a failing source is seen.
    for line in reader.lines() {
        let line = line?;
        if limit == 0 {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    for line in &tail {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(tail.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LOG: &str = "starting\nlistening on 3000\nGET /\nGET /health\n";

    #[test]
    fn unbounded_copies_everything() {
        let mut out = Vec::new();
        let n = display_log(false, Cursor::new(LOG), &mut out, "web", None).unwrap();
        assert_eq!(n, 4);
        assert_eq!(String::from_utf8(out).unwrap(), LOG);
    }

    #[test]
    fn bounded_keeps_the_tail() {
        let mut out = Vec::new();
        let n = display_log(false, Cursor::new(LOG), &mut out, "web", Some(2)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "GET /\nGET /health\n");
    }

    #[test]
    fn follow_ignores_the_bound() {
        let mut out = Vec::new();
        let n = display_log(true, Cursor::new(LOG), &mut out, "web", Some(1)).unwrap();
        assert_eq!(n, 4);
        assert_eq!(String::from_utf8(out).unwrap(), LOG);
    }

    #[test]
    fn zero_bound_writes_nothing() {
        let mut out = Vec::new();
        let n = display_log(false, Cursor::new(LOG), &mut out, "web", Some(0)).unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    /// Yields some output, then fails the way a dead platform log command does.
    struct FailsAtEnd(Cursor<&'static str>);

    impl Read for FailsAtEnd {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(std::io::Error::other("pod not found")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn source_failure_at_end_is_an_error() {
        for max_lines in [None, Some(0), Some(2)] {
            let mut out = Vec::new();
            let result =
                display_log(false, FailsAtEnd(Cursor::new(LOG)), &mut out, "web", max_lines);
            assert!(matches!(result, Err(RuntimeError::Io(_))), "{max_lines:?}");
        }
    }

    #[test]
    fn partial_last_line_is_kept_when_following() {
        let mut out = Vec::new();
        display_log(true, Cursor::new("a\nb"), &mut out, "web", None).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb");
    }
}
