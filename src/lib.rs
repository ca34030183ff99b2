//! Dining philosophers around a monitor.
//!
//! Every philosopher is a tokio task that thinks, asks the [`Monitor`] for
//! both of its chopsticks, eats and puts them back. The monitor keeps the
//! state of the whole table behind one lock and only lets a philosopher eat
//! while neither neighbour is eating, so no one ever holds a single
//! chopstick and the table cannot deadlock.

pub mod config;
pub mod error;
pub mod event;
pub mod monitor;
pub mod party;
pub mod philosopher;
pub mod table;

pub use config::{Appetite, DelayRange, PartyConfig, DINERS};
pub use error::{Error, Result};
pub use event::{ConsoleSink, Event, EventSink, FileSink, MemorySink, WriterSink};
pub use monitor::Monitor;
pub use party::Party;
pub use philosopher::Philosopher;
pub use table::{ActorId, ActorState};
