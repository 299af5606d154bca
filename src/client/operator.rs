use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// The person driving a runner session.
pub trait Operator {
    /// Shows `prompt` and returns the answer without its line ending.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;

    /// Echoes a single progress character for a streamed result.
    fn progress(&mut self, mark: char);

    /// Shows a full line of status text.
    fn notice(&mut self, text: &str);
}

/// Operator on the process's stdin and stdout.
#[derive(Default)]
pub struct ConsoleOperator {
    mid_line: bool,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the operator presses Enter.
    pub fn wait_for_acknowledgment(&mut self) {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }

    fn end_progress_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }
}

impl Operator for ConsoleOperator {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.end_progress_line();
        if prompt.ends_with(' ') {
            print!("{}", prompt);
        } else {
            println!("{}", prompt);
        }
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "console input closed",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn progress(&mut self, mark: char) {
        print!("{}", mark);
        let _ = io::stdout().flush();
        self.mid_line = true;
    }

    fn notice(&mut self, text: &str) {
        self.end_progress_line();
        println!("{}", text);
    }
}

/// Operator answering from a fixed script and recording what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub marks: String,
    pub notices: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedOperator {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "operator script exhausted")
        })
    }

    fn progress(&mut self, mark: char) {
        self.marks.push(mark);
    }

    fn notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}
