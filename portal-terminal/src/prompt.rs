use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

/// Line-oriented input on stdin. `None` means the input was closed.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
    out: Stdout,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            out: tokio::io::stdout(),
        }
    }

    pub async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        self.out.write_all(format!("{}: ", label).as_bytes()).await?;
        self.out.flush().await?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    /// Ask for a value, keeping `current` when the answer is blank.
    pub async fn ask_with_default(&mut self, label: &str, current: &str) -> Result<Option<String>> {
        let answer = self.ask(&format!("{} [{}]", label, current)).await?;
        Ok(answer.map(|a| if a.is_empty() { current.to_string() } else { a }))
    }
}

/// Resolve a menu answer to one of `options`, by 1-based number or exact text.
pub fn pick<'a>(answer: &str, options: &'a [String]) -> Option<&'a str> {
    if let Ok(n) = answer.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|idx| options.get(idx))
            .map(String::as_str);
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(answer))
        .map(String::as_str)
}
