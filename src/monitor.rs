use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    event::{Event, EventSink},
    table::{ActorId, ActorState, Table},
};

/// Monitor that hands out both chopsticks of a philosopher at once.
///
/// The state of every philosopher lives in one table guarded by a single
/// mutex. A hungry philosopher whose neighbours are eating parks on its own
/// wait slot and is woken only by a neighbour's `release_resources`, which
/// has already switched it to `Eating` under the lock.
pub struct Monitor {
    table: Mutex<Table>,
    // 哲学者ごとの待機スロット。添字は ActorId
    slots: Box<[Notify]>,
    sink: Arc<dyn EventSink>,
    // シンクが一度 panic したら以降は何も記録しない
    muted: AtomicBool,
}

impl Monitor {
    pub fn new(n: usize, sink: impl EventSink + 'static) -> Self {
        Self::with_sink(n, Arc::new(sink))
    }

    pub fn with_sink(n: usize, sink: Arc<dyn EventSink>) -> Self {
        Monitor {
            table: Mutex::new(Table::new(n)),
            slots: (0..n).map(|_| Notify::new()).collect(),
            sink,
            muted: AtomicBool::new(false),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    // ロック中に状態を取得したスナップショット
    pub fn snapshot(&self) -> Vec<ActorState> {
        self.lock().states().to_vec()
    }

    /// Makes `id` hungry and returns once it is eating.
    ///
    /// Returns `Error::Cancelled` if `cancel` fires while the philosopher
    /// is parked. In that case its entry stays `Hungry` but it is never
    /// granted chopsticks again.
    pub async fn request_resources(&self, id: ActorId, cancel: &CancellationToken) -> Result<()> {
        self.check(id);
        {
            let mut table = self.lock();
            table.advance(id, ActorState::Hungry);
            self.emit(Event::Became(id, ActorState::Hungry));
            if table.grant(id) {
                self.emit(Event::Became(id, ActorState::Eating));
                return Ok(());
            }
        }

        // ロックを手放してから待機する
        // ロック解放後、待機前に notify_one されても permit が残るので取りこぼさない
        tokio::select! {
            biased;
            () = self.slots[id].notified() => Ok(()),
            () = cancel.cancelled() => {
                self.abandon(id);
                Err(Error::Cancelled(id))
            }
        }
    }

    /// Puts both chopsticks of `id` back and wakes whichever neighbour can
    /// now eat, left first.
    pub fn release_resources(&self, id: ActorId) {
        self.check(id);
        let mut table = self.lock();
        assert_eq!(
            table.state(id),
            ActorState::Eating,
            "philosopher {id} released chopsticks without eating"
        );
        self.put_down(&mut table, id);
    }

    // 席を立つ。以降この哲学者に箸は割り当てない
    pub fn leave(&self, id: ActorId) {
        self.check(id);
        let mut table = self.lock();
        table.depart(id);
        self.emit(Event::Departed(id));
    }

    pub fn has_left(&self, id: ActorId) -> bool {
        self.check(id);
        self.lock().is_departed(id)
    }

    // 待機中のキャンセル。状態は Hungry のまま残し、割り当て対象から外す
    fn abandon(&self, id: ActorId) {
        let mut table = self.lock();
        table.depart(id);
        // キャンセルとほぼ同時に隣人から箸を割り当てられていた場合は返却する
        if table.state(id) == ActorState::Eating {
            self.put_down(&mut table, id);
        }
    }

    fn put_down(&self, table: &mut Table, id: ActorId) {
        table.advance(id, ActorState::Thinking);
        self.emit(Event::Became(id, ActorState::Thinking));

        for neighbor in [table.left(id), table.right(id)] {
            if table.grant(neighbor) {
                self.slots[neighbor].notify_one();
                self.emit(Event::Became(neighbor, ActorState::Eating));
            }
        }
    }

    fn check(&self, id: ActorId) {
        assert!(
            id < self.len(),
            "philosopher {id} does not exist, there are {} diners",
            self.len()
        );
    }

    // assert はすべて状態を書き換える前に行い、シンクの panic は emit で止めるので
    // poison されても表は一貫している
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ロック中に呼ばれる。シンクが panic しても状態遷移や起床を途中で止めない
    fn emit(&self, event: Event) {
        if self.muted.load(Ordering::Relaxed) {
            return;
        }
        let line = event.to_string();
        if panic::catch_unwind(AssertUnwindSafe(|| self.sink.record(line))).is_err() {
            tracing::warn!(%event, "event sink panicked, events are no longer recorded");
            self.muted.store(true, Ordering::Relaxed);
        }
    }
}
