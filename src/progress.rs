//! Terminal spinner around a single pending LLM call.

use std::future::Future;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Await `work` behind a spinner, then report success or failure on stderr.
///
/// The spinner hides itself when stderr is not a terminal.
pub async fn with_spinner<T, E, F>(message: &str, done: &str, failed: &str, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = work.await;
    spinner.finish_and_clear();

    if !spinner.is_hidden() {
        match &result {
            Ok(_) => eprintln!("{} {}", "✓".green(), done),
            Err(_) => eprintln!("{} {}", "✗".red(), failed),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok, block_on};

    #[test]
    fn test_passes_result_through() {
        let ok: Result<u32, String> = block_on(with_spinner("working", "done", "failed", async { Ok(7) }));
        assert_eq!(assert_ok!(ok), 7);

        let err: Result<u32, String> = block_on(with_spinner("working", "done", "failed", async {
            Err("boom".to_string())
        }));
        assert_eq!(assert_err!(err), "boom");
    }
}
