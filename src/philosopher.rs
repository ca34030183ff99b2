use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::{Appetite, DelayRange},
    monitor::Monitor,
    table::ActorId,
};

pub struct Philosopher {
    id: ActorId,
    monitor: Arc<Monitor>,
    appetite: Appetite,
    cancel: CancellationToken,
}

impl Philosopher {
    pub fn new(
        id: ActorId,
        monitor: Arc<Monitor>,
        appetite: Appetite,
        cancel: CancellationToken,
    ) -> Self {
        Philosopher {
            id,
            monitor,
            appetite,
            cancel,
        }
    }

    /// Thinks, eats and puts the chopsticks back until cancelled.
    /// Returns the number of meals eaten.
    pub async fn dine(self) -> u64 {
        let mut meals = 0;

        while !self.cancel.is_cancelled() {
            // 考えている途中でキャンセルされたら箸を取りに行かない
            if !self.pause(self.appetite.think).await {
                break;
            }

            if let Err(e) = self.monitor.request_resources(self.id, &self.cancel).await {
                tracing::debug!(philosopher = self.id, "{e}");
                break;
            }

            // 食事中にキャンセルされても箸は必ず返す
            let full = self.pause(self.appetite.eat).await;
            self.monitor.release_resources(self.id);
            meals += 1;
            if !full {
                break;
            }
        }

        self.monitor.leave(self.id);
        meals
    }

    // キャンセルされずに待ち終えたら true
    async fn pause(&self, delay: DelayRange) -> bool {
        tokio::select! {
            () = tokio::time::sleep(delay.sample()) => true,
            () = self.cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{
        event::{Event, MemorySink},
        table::ActorState::*,
    };

    fn appetite(think_ms: u64, eat_ms: u64) -> Appetite {
        Appetite {
            think: DelayRange::fixed(think_ms),
            eat: DelayRange::fixed(eat_ms),
        }
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_thinking() {
        let sink = MemorySink::new();
        let monitor = Arc::new(Monitor::new(3, sink.clone()));
        let cancel = CancellationToken::new();
        let p = Philosopher::new(0, monitor.clone(), appetite(1000, 1000), cancel.clone());
        let task = tokio::spawn(p.dine());

        wait(10).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap(), 0);
        assert_eq!(sink.events(), vec![Event::Departed(0)]);
        assert_eq!(monitor.snapshot(), vec![Thinking; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_eating_puts_chopsticks_back() {
        let sink = MemorySink::new();
        let monitor = Arc::new(Monitor::new(3, sink.clone()));
        let cancel = CancellationToken::new();
        let p = Philosopher::new(1, monitor.clone(), appetite(0, 1000), cancel.clone());
        let task = tokio::spawn(p.dine());

        wait(10).await;
        assert_eq!(monitor.snapshot(), vec![Thinking, Eating, Thinking]);
        cancel.cancel();
        assert_eq!(task.await.unwrap(), 1);
        assert_eq!(monitor.snapshot(), vec![Thinking; 3]);
        assert_eq!(
            sink.events(),
            vec![
                Event::Became(1, Hungry),
                Event::Became(1, Eating),
                Event::Became(1, Thinking),
                Event::Departed(1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_hungry() {
        let sink = MemorySink::new();
        let monitor = Arc::new(Monitor::new(3, sink.clone()));
        let outer = CancellationToken::new();
        monitor.request_resources(1, &outer).await.unwrap();

        let cancel = CancellationToken::new();
        let p = Philosopher::new(0, monitor.clone(), appetite(0, 10), cancel.clone());
        let task = tokio::spawn(p.dine());

        wait(10).await;
        assert_eq!(monitor.snapshot()[0], Hungry);
        cancel.cancel();
        assert_eq!(task.await.unwrap(), 0);
        assert!(monitor.has_left(0));

        // 0 は Hungry のまま残るが、1 が箸を置いても食事を始めない
        monitor.release_resources(1);
        assert_eq!(monitor.snapshot(), vec![Hungry, Thinking, Thinking]);
        assert_eq!(sink.events().last(), Some(&Event::Became(1, Thinking)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_neighbors_keep_eating() {
        let sink = MemorySink::new();
        let monitor = Arc::new(Monitor::new(2, sink.clone()));
        let cancel = CancellationToken::new();

        let tasks: Vec<_> = (0..2)
            .map(|id| {
                let p = Philosopher::new(id, monitor.clone(), appetite(3, 5), cancel.child_token());
                tokio::spawn(p.dine())
            })
            .collect();

        wait(500).await;
        cancel.cancel();
        for t in tasks {
            assert!(t.await.unwrap() > 0);
        }

        // 待機中にキャンセルされた方は Hungry で残りうるが、誰も食事中ではない
        assert!(!monitor.snapshot().contains(&Eating));
        let events = sink.events();
        assert!(events.contains(&Event::Departed(0)));
        assert!(events.contains(&Event::Departed(1)));
    }
}
