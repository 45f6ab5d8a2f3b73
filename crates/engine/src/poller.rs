use crate::{render, PollEngine, PollState, PollTicket, SettleOutcome, View};
use async_trait::async_trait;
use now_listening_core::NowPlayingResponse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Cooperative cancellation shared between a poller and its in-flight
/// fetches. The underlying request is not aborted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    /// One poll. Returns `None` only when `cancel` was observed; every
    /// failure is folded into a synthetic payload.
    async fn fetch(&self, cancel: &CancelFlag) -> Option<NowPlayingResponse>;
}

type ResultCallback = Box<dyn Fn(&View) + Send + Sync>;

struct Shared {
    engine: Mutex<PollEngine>,
    cancel: CancelFlag,
    state_tx: watch::Sender<PollState>,
    on_result: ResultCallback,
}

impl Shared {
    fn engine(&self) -> MutexGuard<'_, PollEngine> {
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> PollTicket {
        self.engine().begin()
    }

    fn settle(&self, ticket: PollTicket, response: NowPlayingResponse) {
        let view = {
            let mut engine = self.engine();
            // Checked under the lock so no state lands once `stop` has returned.
            if self.cancel.is_cancelled() {
                trace!(seq = ticket.seq(), "poll settled after stop; dropped");
                return;
            }
            match engine.settle(ticket, response) {
                SettleOutcome::Applied => {
                    let state = engine.state().clone();
                    let view = render(&state);
                    self.state_tx.send_replace(state);
                    view
                }
                SettleOutcome::Stale => {
                    debug!(seq = ticket.seq(), "stale poll result discarded");
                    return;
                }
            }
        };

        // Unlocked: the callback may block or call `stop`.
        if !self.cancel.is_cancelled() {
            (self.on_result)(&view);
        }
    }
}

/// Periodic now-playing poll bound to the lifetime of its owner.
///
/// Must be started from within a tokio runtime. Dropping the poller stops it.
pub struct Poller {
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn start<F>(source: Arc<dyn NowPlayingSource>, interval: Duration, on_result: F) -> Self
    where
        F: Fn(&View) + Send + Sync + 'static,
    {
        let (state_tx, _) = watch::channel(PollState::Loading);
        let shared = Arc::new(Shared {
            engine: Mutex::new(PollEngine::new()),
            cancel: CancelFlag::new(),
            state_tx,
            on_result: Box::new(on_result),
        });

        let timer_shared = Arc::clone(&shared);
        let timer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if timer_shared.cancel.is_cancelled() {
                    break;
                }
                let ticket = timer_shared.begin();
                trace!(seq = ticket.seq(), "poll started");

                // Polls may overlap; ordering is settled by ticket.
                let shared = Arc::clone(&timer_shared);
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    let Some(response) = source.fetch(&shared.cancel).await else {
                        return;
                    };
                    shared.settle(ticket, response);
                });
            }
        });

        Self {
            shared,
            timer: Some(timer),
        }
    }

    pub fn state(&self) -> PollState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn view(&self) -> View {
        render(&self.shared.state_tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.shared.state_tx.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            {
                let _engine = self.shared.engine();
                self.shared.cancel.cancel();
            }
            timer.abort();
            debug!("poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelFlag, NowPlayingSource, Poller};
    use crate::{PollState, View};
    use async_trait::async_trait;
    use now_listening_core::NowPlayingResponse;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Scripted {
        replies: Mutex<VecDeque<NowPlayingResponse>>,
    }

    impl Scripted {
        fn new(replies: Vec<NowPlayingResponse>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl NowPlayingSource for Scripted {
        async fn fetch(&self, _cancel: &CancelFlag) -> Option<NowPlayingResponse> {
            let next = self.replies.lock().unwrap().pop_front();
            Some(next.unwrap_or_else(NowPlayingResponse::no_track))
        }
    }

    /// Blocks until released and ignores the cancel flag, so only the
    /// poller's own guard keeps the result out.
    struct Gated {
        release: Notify,
        entered: AtomicUsize,
    }

    #[async_trait]
    impl NowPlayingSource for Gated {
        async fn fetch(&self, _cancel: &CancelFlag) -> Option<NowPlayingResponse> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Some(NowPlayingResponse::no_track())
        }
    }

    async fn let_tasks_run() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_lands_then_refreshes_on_interval() {
        let source = Scripted::new(vec![
            NowPlayingResponse::not_configured(),
            NowPlayingResponse::no_track(),
        ]);
        let poller = Poller::start(source, Duration::from_secs(60), |_| {});
        let mut rx = poller.subscribe();
        assert_eq!(*rx.borrow(), PollState::Loading);

        let started = tokio::time::Instant::now();
        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            PollState::Loaded(NowPlayingResponse::not_configured())
        );

        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            PollState::Loaded(NowPlayingResponse::no_track())
        );
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn not_configured_renders_guidance_not_skeleton() {
        let source = Scripted::new(vec![NowPlayingResponse::not_configured()]);
        let views = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&views);
        let poller = Poller::start(source, Duration::from_secs(60), move |v| {
            sink.lock().unwrap().push(v.clone());
        });

        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();

        let views = views.lock().unwrap();
        assert_eq!(views.len(), 1);
        assert!(!matches!(views[0], View::Skeleton));
        assert!(views[0].to_string().starts_with("Connect your Last.fm account"));
        assert_eq!(poller.view(), views[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_settle_drops_result() {
        let source = Arc::new(Gated {
            release: Notify::new(),
            entered: AtomicUsize::new(0),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut poller = Poller::start(source.clone(), Duration::from_secs(60), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let_tasks_run().await;
        assert_eq!(source.entered.load(Ordering::SeqCst), 1);

        poller.stop();
        source.release.notify_one();
        let_tasks_run().await;

        assert!(poller.is_stopped());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(poller.state(), PollState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_the_timer() {
        let source = Arc::new(Gated {
            release: Notify::new(),
            entered: AtomicUsize::new(0),
        });
        let mut poller = Poller::start(source.clone(), Duration::from_secs(60), |_| {});
        let_tasks_run().await;
        poller.stop();

        tokio::time::advance(Duration::from_secs(600)).await;
        let_tasks_run().await;
        assert_eq!(source.entered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_stop_its_own_poller() {
        let source = Scripted::new(vec![NowPlayingResponse::no_track()]);
        let slot: Arc<Mutex<Option<Poller>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = Arc::clone(&slot);
        let counter = Arc::clone(&calls);
        let poller = Poller::start(source, Duration::from_secs(60), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(poller) = handle.lock().unwrap().as_mut() {
                poller.stop();
            }
        });
        let mut rx = poller.subscribe();
        *slot.lock().unwrap() = Some(poller);

        rx.changed().await.unwrap();
        let_tasks_run().await;

        tokio::time::advance(Duration::from_secs(180)).await;
        let_tasks_run().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(slot.lock().unwrap().as_ref().unwrap().is_stopped());
        assert_eq!(*rx.borrow(), PollState::Loaded(NowPlayingResponse::no_track()));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_poller_stops_it() {
        let source = Arc::new(Gated {
            release: Notify::new(),
            entered: AtomicUsize::new(0),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let poller = Poller::start(source.clone(), Duration::from_secs(60), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let_tasks_run().await;
        drop(poller);

        source.release.notify_one();
        tokio::time::advance(Duration::from_secs(120)).await;
        let_tasks_run().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.entered.load(Ordering::SeqCst), 1);
    }
}
