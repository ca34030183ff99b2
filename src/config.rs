use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

use rand::Rng;

use crate::error::{Error, Result};

pub const DINERS: usize = 5;

// 考える時間・食べる時間の範囲 (ミリ秒、両端を含む)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        DelayRange { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        DelayRange::new(ms, ms)
    }

    fn range(&self) -> RangeInclusive<u64> {
        self.min_ms..=self.max_ms
    }

    pub fn sample(&self) -> Duration {
        Duration::from_millis(rand::thread_rng().gen_range(self.range()))
    }

    fn validate(&self, phase: &'static str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(Error::InvalidDelay {
                phase,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        DelayRange::new(1000, 5000)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Appetite {
    pub think: DelayRange,
    pub eat: DelayRange,
}

impl Appetite {
    pub fn validate(&self) -> Result<()> {
        self.think.validate("think")?;
        self.eat.validate("eat")
    }
}

#[derive(Debug, Clone)]
pub struct PartyConfig {
    pub diners: usize,
    // None ならシグナルを受けるまで続ける
    pub length: Option<Duration>,
    pub appetite: Appetite,
    pub log_file: Option<PathBuf>,
    // 哲学者のタスクが生きているかを確認する間隔
    pub heartbeat: Duration,
}

impl Default for PartyConfig {
    fn default() -> Self {
        PartyConfig {
            diners: DINERS,
            length: None,
            appetite: Appetite::default(),
            log_file: None,
            heartbeat: Duration::from_secs(3),
        }
    }
}

impl PartyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.diners < 2 {
            return Err(Error::TooFewDiners(self.diners));
        }
        self.appetite.validate()?;
        if self.log_file.is_some() && self.length.map_or(true, |l| l.is_zero()) {
            return Err(Error::LoggingNeedsLength);
        }
        Ok(())
    }
}
