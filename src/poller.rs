use std::future::Future;
use std::time::Duration;

use async_channel::{Receiver, Sender, TrySendError, bounded};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Lance un cycle de fusion tout de suite, puis à période fixe et à la demande.
///
/// La boucle attend la fin de chaque cycle avant de relire l'horloge : deux
/// cycles ne se chevauchent jamais, les ticks manqués sont sautés et les
/// demandes se regroupent en une seule exécution en attente.
pub struct Poller {
    cancel: CancellationToken,
    trigger: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn start<F, Fut>(period: Duration, cycle: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (trigger, requests) = bounded(1);
        let handle = tokio::spawn(run_loop(period, cycle, requests, cancel.clone()));
        info!(period = ?period, "poller started");
        Self {
            cancel,
            trigger,
            handle: Some(handle),
        }
    }

    /// Demande un cycle supplémentaire. Retourne `false` une fois le poller arrêté.
    pub fn trigger(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.trigger.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("refresh already pending");
                true
            }
            Err(TrySendError::Closed(())) => false,
        }
    }

    /// Annule la planification et attend la fin du cycle en cours.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        self.trigger.close();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "poller task terminated unexpectedly");
            }
        }
        info!("poller stopped");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop<F, Fut>(
    period: Duration,
    mut cycle: F,
    requests: Receiver<()>,
    cancel: CancellationToken,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    cycle().await;

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            req = requests.recv() => {
                if req.is_err() {
                    break;
                }
                debug!("on-demand refresh");
            }
        }
        if cancel.is_cancelled() {
            break;
        }
        cycle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::Poller;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn counting_poller(period: Duration) -> (Poller, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let poller = Poller::start(period, move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        (poller, count)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_on_period() {
        let (poller, count) = counting_poller(Duration::from_secs(30));
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycles_after_stop() {
        let (poller, count) = counting_poller(Duration::from_secs(30));
        sleep(Duration::from_millis(10)).await;
        poller.stop().await;

        sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_runs_an_extra_cycle() {
        let (poller, count) = counting_poller(Duration::from_secs(30));
        sleep(Duration::from_millis(10)).await;
        assert!(poller.trigger());
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let (a, o) = (Arc::clone(&active), Arc::clone(&overlaps));
        let poller = Poller::start(Duration::from_secs(1), move || {
            let (active, overlaps) = (Arc::clone(&a), Arc::clone(&o));
            async move {
                if active.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                sleep(Duration::from_millis(2_500)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        });
        for _ in 0..5 {
            poller.trigger();
        }
        sleep(Duration::from_secs(10)).await;
        poller.stop().await;
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
