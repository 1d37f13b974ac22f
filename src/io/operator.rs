//! Operator interaction - line-based prompts and messages

use crate::infra::error::{CollectError, CollectResult};
use std::io::{self, BufRead, Write};

pub trait Operator {
    /// Show an informational message
    fn say(&mut self, message: &str);

    /// Show a prompt and block until the operator answers with a line
    fn ask(&mut self, prompt: &str) -> CollectResult<String>;
}

/// Operator on a line-based console (stdin/stdout by default)
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl ConsoleOperator<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn say(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
        let _ = self.output.flush();
    }

    fn ask(&mut self, prompt: &str) -> CollectResult<String> {
        write!(self.output, "{}", prompt)
            .and_then(|()| self.output.flush())
            .map_err(|e| CollectError::OperatorInput(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| CollectError::OperatorInput(e.to_string()))?;
        if read == 0 {
            return Err(CollectError::OperatorInput("input closed".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
