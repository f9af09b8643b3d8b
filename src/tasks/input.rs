use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::events::{Direction, UserInput};

/// Map one command line to an input event. Blank or unknown lines yield `None`.
pub fn parse_command(line: &str) -> Option<UserInput> {
    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "next" => Some(UserInput::Navigate(Direction::Next)),
        "p" | "prev" | "previous" => Some(UserInput::Navigate(Direction::Prev)),
        "q" | "quit" | "exit" => Some(UserInput::Quit),
        _ => None,
    }
}

/// Forward commands read from `reader` until EOF, `Quit`, or cancellation.
#[instrument(skip_all)]
pub async fn run<R>(
    reader: R,
    to_controller: Sender<UserInput>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting input task");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("input closed");
                    break;
                };
                let Some(input) = parse_command(&line) else {
                    debug!(line = %line.trim(), "unrecognized command");
                    continue;
                };
                if to_controller.send(input).await.is_err() || input == UserInput::Quit {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio::sync::mpsc;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("n"),
            Some(UserInput::Navigate(Direction::Next))
        );
        assert_eq!(
            parse_command("  PREV \n"),
            Some(UserInput::Navigate(Direction::Prev))
        );
        assert_eq!(parse_command("q"), Some(UserInput::Quit));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("jump"), None);
    }

    #[tokio::test]
    async fn forwards_until_quit() {
        let input = BufReader::new(&b"n\n\nbogus\np\nq\nn\n"[..]);
        let (tx, mut rx) = mpsc::channel(8);
        run(input, tx, CancellationToken::new()).await.unwrap();

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                UserInput::Navigate(Direction::Next),
                UserInput::Navigate(Direction::Prev),
                UserInput::Quit,
            ]
        );
    }
}
