//! The yes/no confirmation shown before anything is renamed.

use std::io::{BufRead, Result, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Proceed,
    Cancel,
}

/// Asks `question` until it gets an answer it understands: `y`, `Y` or `1`
/// to proceed, `n`, `N` or `0` to cancel. Surrounding whitespace is ignored.
/// Running out of input counts as cancelling.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<Answer> {
    let mut line = String::new();
    loop {
        write!(output, "{question} ")?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(Answer::Cancel);
        }
        match line.trim() {
            "y" | "Y" | "1" => return Ok(Answer::Proceed),
            "n" | "N" | "0" => return Ok(Answer::Cancel),
            _ => writeln!(output, "Not understood, please answer y or n.")?,
        }
    }
}
