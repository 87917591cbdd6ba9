//! Stdin/stdout handling for the one-shot commands
//!
//! - Input: a JSON body via stdin (empty input reads as `{}`)
//! - Output: the response body on stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use super::errors::CliResult;

/// Read the whole request body from stdin
pub fn read_body() -> CliResult<String> {
    let mut body = String::new();
    io::stdin().lock().read_to_string(&mut body)?;
    Ok(body)
}

/// Write text to stdout, newline terminated
pub fn write_output(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    if text.ends_with('\n') {
        write!(stdout, "{}", text)?;
    } else {
        writeln!(stdout, "{}", text)?;
    }
    stdout.flush()?;

    Ok(())
}
