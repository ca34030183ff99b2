use std::{future, sync::Arc, thread, time::Duration};

use libc::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::PartyConfig,
    error::{Error, Result},
    event::{ConsoleSink, EventSink, FileSink},
    monitor::Monitor,
    philosopher::Philosopher,
};

// ログファイルが開けなければ標準出力に書く
pub fn open_sink(config: &PartyConfig) -> Arc<dyn EventSink> {
    match &config.log_file {
        Some(path) => match FileSink::create(path) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot open log file, logging to stdout");
                Arc::new(ConsoleSink::stdout())
            }
        },
        None => Arc::new(ConsoleSink::stdout()),
    }
}

/// Runs a whole dinner party: signals, timer, liveness checks and shutdown.
/// Returns the number of meals each philosopher ate.
pub async fn run(config: PartyConfig) -> Result<Vec<u64>> {
    config.validate()?;
    let sink = open_sink(&config);
    let party = Party::new(config, sink)?;
    let signals = watch_signals(party.shutdown_token())?;
    let result = party.run().await;
    signals.close();
    result
}

pub struct Party {
    config: PartyConfig,
    monitor: Arc<Monitor>,
    shutdown: CancellationToken,
}

impl Party {
    pub fn new(config: PartyConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;
        let monitor = Arc::new(Monitor::with_sink(config.diners, sink));
        Ok(Party {
            config,
            monitor,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    // キャンセルするとパーティが終わる
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> Result<Vec<u64>> {
        let handles: Vec<JoinHandle<u64>> = (0..self.config.diners)
            .map(|id| {
                let p = Philosopher::new(
                    id,
                    self.monitor.clone(),
                    self.config.appetite,
                    self.shutdown.child_token(),
                );
                tokio::spawn(p.dine())
            })
            .collect();
        tracing::info!(diners = self.config.diners, length = ?self.config.length, "party started");

        let mut outcome = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => {
                tracing::info!("party interrupted");
                Ok(())
            }
            () = until(self.config.length) => {
                println!("Alright, time's up, let's wrap up this party please.");
                Ok(())
            }
            e = check_pulse(&handles, self.config.heartbeat, &self.shutdown) => Err(e),
        };

        self.shutdown.cancel();
        let mut meals = Vec::with_capacity(handles.len());
        for (id, r) in futures::future::join_all(handles).await.into_iter().enumerate() {
            match r {
                Ok(n) => {
                    tracing::info!(philosopher = id, meals = n, "philosopher went home");
                    meals.push(n);
                }
                Err(e) => {
                    tracing::error!(philosopher = id, error = %e, "philosopher task failed");
                    if outcome.is_ok() {
                        outcome = Err(e.into());
                    }
                    meals.push(0);
                }
            }
        }
        outcome.map(|()| meals)
    }
}

async fn until(length: Option<Duration>) {
    match length {
        Some(d) if !d.is_zero() => tokio::time::sleep(d).await,
        _ => future::pending().await,
    }
}

// 一定間隔で哲学者のタスクが生きているか確認する
// パーティ中に終わってしまったタスクがあればその番号を返す
async fn check_pulse(
    handles: &[JoinHandle<u64>],
    heartbeat: Duration,
    shutdown: &CancellationToken,
) -> Error {
    let mut ticker = tokio::time::interval(heartbeat);
    loop {
        ticker.tick().await;
        if shutdown.is_cancelled() {
            continue;
        }
        if let Some(id) = handles.iter().position(|h| h.is_finished()) {
            return Error::HeartAttack(id);
        }
    }
}

// 最初のシグナルでパーティを終わらせ、二度目で即座に終了する
fn watch_signals(shutdown: CancellationToken) -> Result<Handle> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();
    thread::spawn(move || {
        for sig in signals.forever() {
            if shutdown.is_cancelled() {
                std::process::exit(128 + sig);
            }
            tracing::info!(signal = sig, "received signal, wrapping up the party");
            shutdown.cancel();
        }
    });
    Ok(handle)
}
