use std::io::BufRead;
use std::str::FromStr;
use std::sync::mpsc::{channel, Receiver};

use anyhow::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    Stop,
    Faster,
    Slower,
    Speed(f64),
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let mut words = raw.split_whitespace();
        let cmd = match (words.next(), words.next()) {
            (Some("p"), None) | (Some("pause"), None) => Command::Pause,
            (Some("r"), None) | (Some("resume"), None) => Command::Resume,
            (Some("s"), None) | (Some("stop"), None) => Command::Stop,
            (Some("+"), None) => Command::Faster,
            (Some("-"), None) => Command::Slower,
            (Some("speed"), Some(x)) => {
                let multiplier: f64 = x
                    .parse()
                    .map_err(|_| anyhow!("speed needs a number, not {}", x))?;
                Command::Speed(multiplier)
            }
            _ => bail!("Unknown command {:?}; try p, r, s, +, -, or speed N", raw.trim()),
        };
        if words.next().is_some() {
            bail!("Too many words in {:?}", raw.trim());
        }
        Ok(cmd)
    }
}

/// Reads commands from stdin on a helper thread. The channel closes when stdin does.
pub fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("Can't read stdin: {}", err);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("{}", err),
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("p".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!(" resume ".parse::<Command>().unwrap(), Command::Resume);
        assert_eq!("+".parse::<Command>().unwrap(), Command::Faster);
        assert_eq!("speed 60".parse::<Command>().unwrap(), Command::Speed(60.0));
        assert!("speed".parse::<Command>().is_err());
        assert!("speed fast".parse::<Command>().is_err());
        assert!("p now".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
    }
}
