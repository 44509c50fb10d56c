use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::error::DownloadError;

/// Line-based questions on a terminal (or any reader/writer pair).
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks until `validate` accepts the answer. An empty answer is replaced
    /// by `default` before validation.
    pub fn text<T>(
        &mut self,
        message: &str,
        default: &str,
        validate: impl Fn(&str) -> Result<T, DownloadError>,
    ) -> Result<T, DownloadError> {
        loop {
            if default.is_empty() {
                write!(self.output, "{}: ", message)?;
            } else {
                write!(self.output, "{} [{}]: ", message, default)?;
            }
            self.output.flush()?;

            let answer = self.read_line()?;
            let answer = if answer.is_empty() { default } else { answer.as_str() };
            match validate(answer) {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
    }

    pub fn confirm(&mut self, message: &str, default: bool) -> Result<bool, DownloadError> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.output, "{} [{}]: ", message, hint)?;
            self.output.flush()?;

            match self.read_line()?.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer yes or no")?,
            }
        }
    }

    fn read_line(&mut self) -> Result<String, DownloadError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(DownloadError::InvalidConfig(String::from("input closed before all questions were answered")));
        }
        Ok(line.trim().to_string())
    }
}
