use std::{
    fmt,
    fs::File,
    io::{self, LineWriter, Write},
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use crate::table::{ActorId, ActorState};

// 観測可能なイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Became(ActorId, ActorState),
    Departed(ActorId),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Became(id, state) => write!(f, "Philosopher {id} is {state}"),
            Event::Departed(id) => write!(f, "Philosopher {id} has left."),
        }
    }
}

impl Event {
    // Display の逆変換。記録された行を検証するときに使う
    pub fn parse(line: &str) -> Option<Event> {
        let rest = line.strip_prefix("Philosopher ")?;
        let (id, rest) = rest.split_once(' ')?;
        let id = id.parse().ok()?;
        match rest {
            "has left." => Some(Event::Departed(id)),
            "is THINKING" => Some(Event::Became(id, ActorState::Thinking)),
            "is HUNGRY" => Some(Event::Became(id, ActorState::Hungry)),
            "is EATING" => Some(Event::Became(id, ActorState::Eating)),
            _ => None,
        }
    }
}

/// Destination for the one-line diner events emitted by the monitor.
///
/// `record` is called while the monitor lock is held, so it must not call
/// back into the monitor and must not panic on I/O failure.
pub trait EventSink: Send + Sync {
    fn record(&self, line: String);
}

// 書き込みに失敗したら一度だけ警告して、以降は何も書かない
pub struct WriterSink<W: Write> {
    writer: Mutex<Option<W>>,
}

pub type ConsoleSink = WriterSink<io::Stdout>;
pub type FileSink = WriterSink<LineWriter<File>>;

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(Some(writer)),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        WriterSink::new(io::stdout())
    }
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(WriterSink::new(LineWriter::new(file)))
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn record(&self, line: String) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(w) = writer.as_mut() {
            if let Err(e) = writeln!(w, "{line}").and_then(|()| w.flush()) {
                tracing::warn!(error = %e, "event log is not writable, dropping further events");
                *writer = None;
            }
        }
    }
}

impl<W: Write> Drop for WriterSink<W> {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(w) = writer.as_mut() {
            if let Err(e) = w.flush() {
                tracing::warn!(error = %e, "failed to flush event log");
            }
        }
    }
}

// メモリ上に記録するだけのシンク。clone したものは同じバッファを共有する
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.lines()
            .iter()
            .filter_map(|l| Event::parse(l))
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}
