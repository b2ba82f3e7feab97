//! Console adapter for development/testing

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::Outbound;
use crate::domain::traits::Speaker;

/// Console adapter for local development
///
/// Reads lines from stdin and prints whatever the bots say to stdout.
pub struct ConsoleAdapter {
    name: String,
    input: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Next line typed by the user, or `None` at end of input
    pub async fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        match self.input.lock().await.next_line().await {
            Ok(line) => line.map(|l| l.trim_end().to_string()),
            Err(e) => {
                tracing::error!("Failed to read from console: {}", e);
                None
            }
        }
    }
}

impl Speaker for ConsoleAdapter {
    fn say(&self, message: &Outbound) -> Result<(), BotError> {
        let mut stdout = std::io::stdout().lock();
        for line in message.content.lines() {
            writeln!(stdout, "[{}] {}", self.name, line)
                .map_err(|e| BotError::Delivery(e.to_string()))?;
        }
        if let Some(file) = &message.file {
            writeln!(stdout, "[{}] (file) {}", self.name, file)
                .map_err(|e| BotError::Delivery(e.to_string()))?;
        }
        Ok(())
    }

    fn platform(&self) -> &str {
        "console"
    }
}
