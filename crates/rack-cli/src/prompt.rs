//! Interactive confirmation for destructive commands.

use std::io::{BufRead, Write};

use crate::AppError;

/// Prints `question (N/y): ` and reads one answer line from `stdin`.
///
/// Only `y` or `yes` (any case) confirm. End of input declines.
pub(crate) fn confirm<R, W>(stdin: &mut R, stdout: &mut W, question: &str) -> Result<bool, AppError>
where
    R: BufRead,
    W: Write,
{
    write!(stdout, "{question} (N/y): ").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)?;

    let mut answer = String::new();
    stdin
        .read_line(&mut answer)
        .map_err(AppError::ReadConfirmation)?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("y", true)]
    #[case("Y\n", true)]
    #[case("yes\r\n", true)]
    #[case("n", false)]
    #[case("", false)]
    #[case("yep", false)]
    fn interprets_answers(#[case] input: &str, #[case] expected: bool) {
        let mut stdin = Cursor::new(input.as_bytes().to_vec());
        let mut stdout = Vec::new();
        let confirmed = confirm(&mut stdin, &mut stdout, "Delete it?").expect("prompt succeeds");
        assert_eq!(confirmed, expected);
        assert_eq!(String::from_utf8(stdout).expect("utf8"), "Delete it? (N/y): ");
    }

    #[test]
    fn reads_only_the_first_line() {
        let mut stdin = Cursor::new(b"y\nleftover\n".to_vec());
        let mut stdout = Vec::new();
        assert!(confirm(&mut stdin, &mut stdout, "Go?").expect("prompt succeeds"));
        let mut rest = String::new();
        stdin.read_line(&mut rest).expect("read remainder");
        assert_eq!(rest, "leftover\n");
    }
}
