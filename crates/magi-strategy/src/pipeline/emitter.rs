//! Timed Emission
//!
//! Releases a pipeline script one event at a time on tokio timers. Event `i`
//! goes out `delay_ms(i)` after event `i - 1`; the first waits its own delay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::events::{LogEvent, STEPS, Step, build_events, current_step_index, total_duration_ms};

/// One released event plus the progress it implies
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Emission {
    /// Position of `event` in the script
    pub index: usize,
    pub event: LogEvent,
    /// Events released so far, this one included
    pub emitted: usize,
    /// Active step after this release
    pub step_index: usize,
    /// Sum of delays of every released event
    pub elapsed_ms: u64,
}

/// Deterministic generator for one ticker's pipeline log
#[derive(Clone, Debug)]
pub struct PipelineSimulator {
    ticker: String,
    events: Arc<[LogEvent]>,
}

impl PipelineSimulator {
    pub fn new(ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        let events = build_events(&ticker).into();
        Self { ticker, events }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub const fn steps(&self) -> &'static [Step] {
        &STEPS
    }

    pub fn total_duration_ms(&self) -> u64 {
        total_duration_ms(&self.events)
    }

    /// Start releasing events to `on_event`. Must be called inside a tokio runtime.
    ///
    /// Emission stops when the returned [`Subscription`] is cancelled or dropped.
    pub fn subscribe<F>(&self, mut on_event: F) -> Subscription
    where
        F: FnMut(Emission) + Send + 'static,
    {
        let cancelled = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&cancelled);
        let events = Arc::clone(&self.events);

        let handle = tokio::spawn(async move {
            run(events, move |emission| {
                // held across the callback so `cancel` waits for it
                let cancelled = lock(&flag);
                if *cancelled {
                    return false;
                }
                on_event(emission);
                true
            })
            .await
        });

        tracing::debug!(ticker = %self.ticker, "pipeline subscription started");
        Subscription {
            cancelled,
            handle: Some(handle),
        }
    }

    /// The same emissions as a stream. Dropping the stream stops emission.
    pub fn stream(&self) -> UnboundedReceiverStream<Emission> {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = Arc::clone(&self.events);

        tokio::spawn(run(events, move |emission| tx.send(emission).is_ok()));

        UnboundedReceiverStream::new(rx)
    }
}

/// Drive the script. `release` returns false to stop early.
/// Returns true when every event was released.
async fn run<F>(events: Arc<[LogEvent]>, mut release: F) -> bool
where
    F: FnMut(Emission) -> bool,
{
    let mut elapsed_ms = 0;

    for (index, event) in events.iter().enumerate() {
        tokio::time::sleep(Duration::from_millis(event.delay_ms)).await;

        elapsed_ms += event.delay_ms;
        let emitted = index + 1;
        let emission = Emission {
            index,
            event: event.clone(),
            emitted,
            step_index: current_step_index(emitted),
            elapsed_ms,
        };

        if !release(emission) {
            tracing::debug!(emitted = index, "pipeline emission stopped");
            return false;
        }
    }

    true
}

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running emission
#[derive(Debug)]
pub struct Subscription {
    cancelled: Arc<Mutex<bool>>,
    handle: Option<JoinHandle<bool>>,
}

impl Subscription {
    /// Stop emission. Idempotent; waits for an in-flight callback, and
    /// nothing is released after this returns.
    ///
    /// Must not be called from inside the subscriber callback.
    pub fn cancel(&mut self) {
        *lock(&self.cancelled) = true;
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.cancelled)
    }

    /// Wait for the script to end. True if every event was released.
    pub async fn finished(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;
    use tokio_stream::StreamExt;

    fn collector() -> (Arc<Mutex<Vec<(Emission, Duration)>>>, impl FnMut(Emission) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let start = Instant::now();
        (seen, move |emission| {
            sink.lock().unwrap().push((emission, start.elapsed()));
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_timing() {
        let simulator = PipelineSimulator::new("AAPL");
        let (seen, on_event) = collector();

        let completed = simulator.subscribe(on_event).finished().await;
        assert!(completed);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), simulator.events().len());

        let mut last_step = 0;
        for (i, (emission, at)) in seen.iter().enumerate() {
            assert_eq!(emission.index, i);
            assert_eq!(emission.emitted, i + 1);
            assert_eq!(emission.event, simulator.events()[i]);
            assert!(emission.step_index >= last_step);
            last_step = emission.step_index;
            assert_eq!(*at, Duration::from_millis(emission.elapsed_ms));
        }

        let (last, _) = seen.last().unwrap();
        assert_eq!(last.step_index, STEPS.len() - 1);
        assert_eq!(last.elapsed_ms, simulator.total_duration_ms());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_emission() {
        let simulator = PipelineSimulator::new("SPY");
        let (seen, on_event) = collector();

        let mut subscription = simulator.subscribe(on_event);
        // releases at 400ms and 700ms, the third is due at 1200ms
        tokio::time::sleep(Duration::from_millis(1000)).await;
        subscription.cancel();
        assert!(subscription.is_cancelled());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(!subscription.finished().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let simulator = PipelineSimulator::new("SPY");
        let (seen, on_event) = collector();

        let subscription = simulator.subscribe(on_event);
        tokio::time::sleep(Duration::from_millis(450)).await;
        drop(subscription);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_matches_script() {
        let simulator = PipelineSimulator::new("MSFT");
        let emissions: Vec<Emission> = simulator.stream().collect().await;

        assert_eq!(emissions.len(), simulator.events().len());
        assert!(emissions.windows(2).all(|w| w[1].emitted == w[0].emitted + 1));
        assert_eq!(emissions.last().unwrap().elapsed_ms, simulator.total_duration_ms());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stream_stops() {
        let simulator = PipelineSimulator::new("MSFT");
        let stream = simulator.stream();
        // the emitting task holds the only other reference to the script
        assert_eq!(Arc::strong_count(&simulator.events), 2);

        let first: Vec<Emission> = stream.take(3).collect().await;
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].elapsed_ms, 1200);

        tokio::time::sleep(Duration::from_millis(simulator.total_duration_ms())).await;
        assert_eq!(Arc::strong_count(&simulator.events), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_waits_for_inflight_callback() {
        let simulator = PipelineSimulator::new("SPY");
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let released = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&released);

        let mut subscription = simulator.subscribe(move |emission: Emission| {
            let _ = entered_tx.send(());
            std::thread::sleep(Duration::from_millis(50));
            sink.lock().unwrap().push(emission.index);
        });

        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap()).await.unwrap();
        subscription.cancel();
        let after_cancel = released.lock().unwrap().len();
        assert_eq!(after_cancel, 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(released.lock().unwrap().len(), after_cancel);
    }
}
