use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Periodic event source tied to a screen's lifetime.
///
/// The first event fires one `period` after start. The task is aborted on
/// `stop` or when the ticker is dropped.
#[derive(Default)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn start<E, F>(period: Duration, tx: mpsc::Sender<E>, mut make_event: F) -> Self
    where
        E: Send + 'static,
        F: FnMut() -> E + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(make_event()).await.is_err() {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<u32>) -> usize {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period() {
        let (tx, mut rx) = mpsc::channel(16);
        let _ticker = Ticker::start(Duration::from_secs(1), tx, || 1u32);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(drain(&mut rx), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_future_ticks() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut ticker = Ticker::start(Duration::from_secs(1), tx, || 1u32);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        ticker.stop();
        assert!(!ticker.is_running());
        let before = drain(&mut rx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(before, 1);
        assert_eq!(drain(&mut rx), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_task() {
        let (tx, mut rx) = mpsc::channel(16);
        {
            let _ticker = Ticker::start(Duration::from_secs(1), tx, || 1u32);
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(drain(&mut rx), 0);
    }
}
