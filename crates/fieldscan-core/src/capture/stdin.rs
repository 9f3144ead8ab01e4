//! Operator triggers read line by line from a terminal.

use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, trace};

use super::{Trigger, TriggerSource};

/// Triggers typed on stdin: `s` saves, `q` quits.
///
/// A reader thread feeds a channel and `poll` never blocks. Once the input
/// is closed no further trigger can arrive, so a closed input reads as `Quit`.
pub struct StdinTriggers {
    rx: Receiver<Trigger>,
}

impl StdinTriggers {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    /// Read triggers from any line-oriented source.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                match parse_trigger(&line) {
                    Some(trigger) => {
                        if tx.send(trigger).is_err() {
                            break;
                        }
                    }
                    None => trace!("Ignoring input {:?}", line),
                }
            }
            debug!("Trigger input closed");
        });

        Self { rx }
    }
}

impl Default for StdinTriggers {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerSource for StdinTriggers {
    fn poll(&mut self) -> Option<Trigger> {
        match self.rx.try_recv() {
            Ok(trigger) => Some(trigger),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Trigger::Quit),
        }
    }
}

fn parse_trigger(line: &str) -> Option<Trigger> {
    match line.trim() {
        "s" | "S" => Some(Trigger::Save),
        "q" | "Q" => Some(Trigger::Quit),
        _ => None,
    }
}
