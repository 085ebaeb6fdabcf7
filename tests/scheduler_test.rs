mod common;

use async_trait::async_trait;
use common::policy;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use volume_refill::scheduler::{AdaptiveScheduler, PollAction};

/// Counts cycles; optionally reschedules itself or takes a while
struct Probe {
    scheduler: Arc<AdaptiveScheduler>,
    fired_at: Vec<Instant>,
    reschedule_to: Option<u64>,
    work: Duration,
    completed: usize,
}

impl Probe {
    fn new(scheduler: &Arc<AdaptiveScheduler>) -> Self {
        Self {
            scheduler: Arc::clone(scheduler),
            fired_at: Vec::new(),
            reschedule_to: None,
            work: Duration::ZERO,
            completed: 0,
        }
    }
}

#[async_trait]
impl PollAction for Probe {
    async fn run_cycle(&mut self) {
        self.fired_at.push(Instant::now());
        if !self.work.is_zero() {
            sleep(self.work).await;
        }
        if let Some(secs) = self.reschedule_to {
            self.scheduler.reschedule(secs);
        }
        self.completed += 1;
    }
}

#[tokio::test(start_paused = true)]
async fn test_fires_at_current_interval() {
    let scheduler = Arc::new(AdaptiveScheduler::new(policy(false)));
    let mut probe = Probe::new(&scheduler);
    let start = Instant::now();

    scheduler.run_forever(&mut probe, sleep(Duration::from_secs(185))).await;

    let offsets: Vec<u64> = probe.fired_at.iter().map(|t| (*t - start).as_secs()).collect();
    assert_eq!(offsets, vec![60, 120, 180]);
    assert_eq!(scheduler.next_run_at(), None);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_can_reschedule_itself() {
    let scheduler = Arc::new(AdaptiveScheduler::new(policy(false)));
    let mut probe = Probe::new(&scheduler);
    probe.reschedule_to = Some(10);

    scheduler.run_forever(&mut probe, sleep(Duration::from_secs(95))).await;

    // 60, then every 10 seconds
    assert_eq!(probe.completed, 4);
    assert_eq!(scheduler.current_interval(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_running_cycle() {
    let scheduler = Arc::new(AdaptiveScheduler::new(policy(false)));
    let mut probe = Probe::new(&scheduler);
    probe.work = Duration::from_secs(30);
    let start = Instant::now();

    scheduler.run_forever(&mut probe, sleep(Duration::from_secs(70))).await;

    assert_eq!(probe.fired_at.len(), 1);
    assert_eq!(probe.completed, 1);
    assert!(Instant::now() - start >= Duration::from_secs(90));
}

#[tokio::test(start_paused = true)]
async fn test_resolved_shutdown_runs_nothing() {
    let scheduler = Arc::new(AdaptiveScheduler::new(policy(false)));
    let mut probe = Probe::new(&scheduler);

    scheduler.run_forever(&mut probe, std::future::ready(())).await;

    assert_eq!(probe.completed, 0);
    assert_eq!(scheduler.next_run_at(), None);
}

#[tokio::test(start_paused = true)]
async fn test_dynamic_scheduler_starts_with_initial_interval() {
    let mut dynamic = policy(true);
    dynamic.initial_interval_secs = 30;
    let scheduler = Arc::new(AdaptiveScheduler::new(dynamic));
    let mut probe = Probe::new(&scheduler);
    let start = Instant::now();

    scheduler.run_forever(&mut probe, sleep(Duration::from_secs(45))).await;

    assert_eq!(probe.fired_at.len(), 1);
    assert_eq!((probe.fired_at[0] - start).as_secs(), 30);
}
