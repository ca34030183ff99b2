use thiserror::Error;

use crate::table::ActorId;

#[derive(Debug, Error)]
pub enum Error {
    // 空腹のまま待機中にキャンセルされた。異常ではなく終了経路の一つ
    #[error("philosopher {0} stopped waiting for chopsticks")]
    Cancelled(ActorId),

    #[error("a party needs at least two diners, got {0}")]
    TooFewDiners(usize),

    #[error("invalid {phase} delay: {min_ms}..={max_ms} ms")]
    InvalidDelay {
        phase: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("if you wish to use logging, you must have a positive time value >0")]
    LoggingNeedsLength,

    #[error("philosopher {0} just had a heart attack! Party is over!")]
    HeartAttack(ActorId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
