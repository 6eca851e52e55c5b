//! Scripted standard input.

use std::io::{self, Cursor, Read};

/// Standard input that serves a fixed script, reports end-of-input once, and
/// fails every read after that.
///
/// A program that keeps reading past the script is waiting for input nobody
/// will type, so the extra read fails fast and is recorded instead of
/// blocking the run.
#[derive(Debug)]
pub struct ScriptedStdin {
    script: Cursor<Vec<u8>>,
    end_reported: bool,
    overread: bool,
}

impl ScriptedStdin {
    /// Serves `script` byte for byte.
    #[must_use]
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: Cursor::new(script.into()),
            end_reported: false,
            overread: false,
        }
    }

    /// Whether the program read again after end-of-input was reported.
    #[must_use]
    pub const fn overread(&self) -> bool {
        self.overread
    }
}

impl Read for ScriptedStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.script.read(buf)?;
        if read > 0 || buf.is_empty() {
            return Ok(read);
        }
        if self.end_reported {
            self.overread = true;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "scripted stdin is exhausted",
            ));
        }
        self.end_reported = true;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]

    use std::io::{BufRead, BufReader};

    use super::*;

    #[test]
    fn serves_the_script_then_end_of_input() {
        let mut stdin = BufReader::new(ScriptedStdin::new("y\n"));
        let mut line = String::new();
        assert_eq!(stdin.read_line(&mut line).expect("first line"), 2);
        assert_eq!(line, "y\n");

        line.clear();
        assert_eq!(stdin.read_line(&mut line).expect("end of input"), 0);
        assert!(!stdin.get_ref().overread());
    }

    #[test]
    fn reading_past_the_end_fails_and_is_recorded() {
        let mut stdin = ScriptedStdin::new("n");
        let mut contents = String::new();
        stdin.read_to_string(&mut contents).expect("script read");
        assert_eq!(contents, "n");

        let error = stdin.read(&mut [0; 8]).expect_err("second end-of-input fails");
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        assert!(stdin.overread());
    }

    #[test]
    fn empty_scripts_end_immediately() {
        let mut stdin = ScriptedStdin::new("");
        assert_eq!(stdin.read(&mut [0; 4]).expect("end of input"), 0);
        assert!(stdin.read(&mut [0; 4]).is_err());
    }
}
