use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::protocol::EngineCommand;
use crate::error::OpponentError;

/// A running engine: line-oriented text in, text out.
pub trait OpponentProcess {
    fn send(&mut self, cmd: &EngineCommand) -> Result<(), OpponentError>;

    /// Next line from the engine. `wait == None` never blocks; `Ok(None)`
    /// means nothing arrived in time. An engine that went away is an error.
    fn recv(&mut self, wait: Option<Duration>) -> Result<Option<String>, OpponentError>;

    fn terminate(&mut self);
}

pub trait Launcher {
    fn launch(&self) -> Result<Box<dyn OpponentProcess>, OpponentError>;
}

/// Spawns an executable speaking UCI on stdin/stdout.
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self { Self { program: program.into(), args: Vec::new() } }

    pub fn arg(mut self, a: impl Into<String>) -> Self { self.args.push(a.into()); self }
}

impl Launcher for ProcessLauncher {
    fn launch(&self) -> Result<Box<dyn OpponentProcess>, OpponentError> {
        Ok(Box::new(UciProcess::spawn(self)?))
    }
}

pub struct UciProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

impl UciProcess {
    pub fn spawn(launcher: &ProcessLauncher) -> Result<Self, OpponentError> {
        let unavailable = |what: String| OpponentError::Unavailable(format!("{}: {what}", launcher.program.display()));
        let mut child = Command::new(&launcher.program)
            .args(&launcher.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| unavailable(e.to_string()))?;
        let stdin = child.stdin.take().ok_or_else(|| unavailable("no stdin handle".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| unavailable("no stdout handle".to_string()))?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("uci-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() { continue; }
                    if tx.send(line).is_err() { break; }
                }
            })
            .map_err(|e| unavailable(e.to_string()))?;
        log::info!("spawned opponent {} (pid {})", launcher.program.display(), child.id());
        Ok(Self { child, stdin: BufWriter::new(stdin), lines: rx, reader: Some(reader) })
    }
}

impl OpponentProcess for UciProcess {
    fn send(&mut self, cmd: &EngineCommand) -> Result<(), OpponentError> {
        log::debug!(">> {cmd}");
        writeln!(self.stdin, "{cmd}")
            .and_then(|_| self.stdin.flush())
            .map_err(|e| OpponentError::Unavailable(format!("write failed: {e}")))
    }

    fn recv(&mut self, wait: Option<Duration>) -> Result<Option<String>, OpponentError> {
        let gone = || OpponentError::Unavailable("engine closed its output".to_string());
        let line = match wait {
            None => match self.lines.try_recv() {
                Ok(l) => Some(l),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => return Err(gone()),
            },
            Some(d) => match self.lines.recv_timeout(d) {
                Ok(l) => Some(l),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return Err(gone()),
            },
        };
        if let Some(ref l) = line { log::trace!("<< {l}"); }
        Ok(line)
    }

    fn terminate(&mut self) {
        let _ = self.send(&EngineCommand::Quit);
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(h) = self.reader.take() { let _ = h.join(); }
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        if self.reader.is_some() { self.terminate(); }
    }
}
