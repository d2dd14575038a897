//! End-to-end pass behavior: resolver, consolidator, pipeline, and
//! dispatcher wired together against an in-memory store and a recording
//! transport. Each test pins one delivery guarantee.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;

use cakeday_content::{ContentPipeline, RenderedBatch};
use cakeday_core::config::ScheduleConfig;
use cakeday_core::{Anniversary, Clock};
use cakeday_scheduler::{
    CelebrationEngine, CheckMode, Transport, TransportError, UserProfile,
};
use cakeday_store::{BirthdayStore, EngineState, Ledger};

struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Transport fake: fixed channel roster, canned profiles, every delivered
/// message recorded. `failures_left` makes the next N sends fail.
struct FakeTransport {
    members: Vec<String>,
    profiles: HashMap<String, UserProfile>,
    sent: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl FakeTransport {
    fn with_members(members: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            members: members.iter().map(|m| m.to_string()).collect(),
            profiles: HashMap::new(),
            sent: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(0),
        })
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, rendered: &RenderedBatch) -> Result<(), TransportError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(TransportError::DeliveryFailed("injected".to_string()));
        }
        self.sent.lock().unwrap().push(rendered.text.clone());
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> Result<UserProfile, TransportError> {
        Ok(self.profiles.get(user_id).cloned().unwrap_or_default())
    }

    async fn channel_members(&self) -> Result<Vec<String>, TransportError> {
        if self.members.is_empty() {
            return Err(TransportError::Api {
                code: "channel_not_found".to_string(),
                message: "no roster".to_string(),
            });
        }
        Ok(self.members.clone())
    }
}

struct Harness {
    engine: Arc<CelebrationEngine>,
    store: Arc<BirthdayStore>,
    ledger: Arc<Ledger>,
    state: Arc<EngineState>,
    transport: Arc<FakeTransport>,
    clock: Arc<FixedClock>,
}

fn harness(now: DateTime<Utc>, members: &[&str]) -> Harness {
    let store = Arc::new(BirthdayStore::new(Connection::open_in_memory().unwrap()).unwrap());
    let ledger = Arc::new(Ledger::new(Connection::open_in_memory().unwrap()).unwrap());
    let state = Arc::new(EngineState::new(Connection::open_in_memory().unwrap()).unwrap());
    let transport = FakeTransport::with_members(members);
    let clock = FixedClock::at(now);
    let config = ScheduleConfig::default();
    let pipeline = Arc::new(ContentPipeline::disabled(config.personality.clone()));
    let engine = Arc::new(CelebrationEngine::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        Arc::clone(&state),
        transport.clone() as Arc<dyn Transport>,
        pipeline,
        clock.clone() as Arc<dyn Clock>,
        config,
    ));
    Harness {
        engine,
        store,
        ledger,
        state,
        transport,
        clock,
    }
}

fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap()
}

#[tokio::test]
async fn hourly_pass_celebrates_and_commits() {
    // 07:00 UTC is 09:00 in Madrid (CEST).
    let h = harness(utc(2026, 6, 15, 7), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, Some(1990)).unwrap(), "Europe/Madrid")
        .unwrap();

    let dispatched = h.engine.run_pass(CheckMode::Hourly).await.unwrap();

    assert_eq!(dispatched, 1);
    let sent = h.transport.sent_texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("<@U1>"));
    assert!(h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());
}

#[tokio::test]
async fn repeated_pass_sends_nothing_twice() {
    let h = harness(utc(2026, 6, 15, 7), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "Europe/Madrid")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);
    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 0);
    assert_eq!(h.transport.sent_texts().len(), 1);
}

#[tokio::test]
async fn hourly_then_daily_does_not_double_announce() {
    let h = harness(utc(2026, 6, 15, 7), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "Europe/Madrid")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);

    // Safety net later the same day finds the ledger entry and stays quiet.
    h.clock.set(utc(2026, 6, 15, 10));
    assert_eq!(h.engine.run_pass(CheckMode::Daily).await.unwrap(), 0);
    assert_eq!(h.transport.sent_texts().len(), 1);
}

#[tokio::test]
async fn same_date_members_share_one_message() {
    let h = harness(utc(2026, 6, 15, 9), &["U1", "U2"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();
    h.store
        .upsert("U2", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 2);
    let sent = h.transport.sent_texts();
    assert_eq!(sent.len(), 1, "two celebrants, one consolidated message");
    assert!(sent[0].contains("<@U1>") && sent[0].contains("<@U2>"));
    assert!(sent[0].contains("Twins"));
}

#[tokio::test]
async fn partially_announced_batch_celebrates_remainder_only() {
    let h = harness(utc(2026, 6, 15, 9), &["U1", "U2"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();
    h.store
        .upsert("U2", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();
    h.ledger
        .commit(
            date(2026, 6, 15),
            &["U1".to_string()],
            cakeday_store::DetectionPath::Hourly,
        )
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Daily).await.unwrap(), 1);
    let sent = h.transport.sent_texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("<@U2>"));
    assert!(!sent[0].contains("<@U1>"));
}

#[tokio::test]
async fn different_local_hours_are_separate_batches() {
    // Kyiv is UTC+3 in June, Lima UTC-5. Same calendar birthday, but their
    // local clocks reach 09:00 eight hours apart.
    let h = harness(utc(2026, 6, 15, 6), &["KYIV", "LIMA"]);
    h.store
        .upsert("KYIV", Anniversary::new(6, 15, None).unwrap(), "Europe/Kyiv")
        .unwrap();
    h.store
        .upsert("LIMA", Anniversary::new(6, 15, None).unwrap(), "America/Lima")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);
    assert!(h.transport.sent_texts()[0].contains("<@KYIV>"));

    h.clock.set(utc(2026, 6, 15, 14));
    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);

    let sent = h.transport.sent_texts();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].contains("<@LIMA>"));
    assert!(!sent[1].contains("<@KYIV>"));
}

#[tokio::test]
async fn daily_check_does_not_preempt_local_morning() {
    // 10:00 UTC is 05:00 in Lima. The safety net must not celebrate (and
    // ledger-block) a member whose local celebration hour is still ahead.
    let h = harness(utc(2026, 6, 15, 10), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "America/Lima")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Daily).await.unwrap(), 0);
    assert!(h.transport.sent_texts().is_empty());
    assert!(!h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());

    // The hourly sweep at 09:00 local still owns the celebration.
    h.clock.set(utc(2026, 6, 15, 14));
    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);
    assert!(h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());
}

#[tokio::test]
async fn failed_delivery_leaves_ledger_untouched_and_retries() {
    let h = harness(utc(2026, 6, 15, 9), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();

    h.transport.fail_next(1);
    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 0);
    assert!(!h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());

    // Next tick finds U1 still due and succeeds.
    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);
    assert!(h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());
    assert_eq!(h.transport.sent_texts().len(), 1);
}

#[tokio::test]
async fn recovery_is_bounded_by_lookback() {
    // Down for ten days; default lookback is seven. U1's birthday fell
    // inside the window, U2's before it.
    let h = harness(utc(2026, 6, 20, 12), &["U1", "U2"]);
    h.store
        .upsert("U1", Anniversary::new(6, 16, None).unwrap(), "UTC")
        .unwrap();
    h.store
        .upsert("U2", Anniversary::new(6, 12, None).unwrap(), "UTC")
        .unwrap();

    let since = utc(2026, 6, 10, 12);
    assert_eq!(
        h.engine.run_pass(CheckMode::Recovery { since }).await.unwrap(),
        1
    );
    assert!(h.ledger.is_announced(date(2026, 6, 16), "U1").unwrap());
    assert!(!h.ledger.is_announced(date(2026, 6, 12), "U2").unwrap());
}

#[tokio::test]
async fn failed_recovery_batch_is_retried_after_restart() {
    // A past date only recovery can reach: if its dispatch fails, last_tick
    // must stay put so the next startup still finds the date.
    let h = harness(utc(2026, 6, 20, 12), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 16, None).unwrap(), "UTC")
        .unwrap();
    h.state.set_last_tick(utc(2026, 6, 14, 9)).unwrap();

    h.transport.fail_next(1);
    assert_eq!(h.engine.startup_recovery().await.unwrap(), 0);
    assert!(!h.ledger.is_announced(date(2026, 6, 16), "U1").unwrap());
    assert_eq!(h.state.last_tick().unwrap(), Some(utc(2026, 6, 14, 9)));

    // Restart: the recovery window still covers the missed date.
    assert_eq!(h.engine.startup_recovery().await.unwrap(), 1);
    assert!(h.ledger.is_announced(date(2026, 6, 16), "U1").unwrap());
}

#[tokio::test]
async fn recovery_after_clean_shutdown_is_quiet() {
    let h = harness(utc(2026, 6, 15, 12), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();
    h.ledger
        .commit(
            date(2026, 6, 15),
            &["U1".to_string()],
            cakeday_store::DetectionPath::Hourly,
        )
        .unwrap();

    let since = utc(2026, 6, 15, 9);
    assert_eq!(
        h.engine.run_pass(CheckMode::Recovery { since }).await.unwrap(),
        0
    );
    assert!(h.transport.sent_texts().is_empty());
}

#[tokio::test]
async fn member_outside_channel_is_not_celebrated() {
    let h = harness(utc(2026, 6, 15, 9), &["OTHER"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 0);
    assert!(h.transport.sent_texts().is_empty());
    // Not committed either: rejoining the channel before the daily check
    // still gets them celebrated.
    assert!(!h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());
}

#[tokio::test]
async fn roster_failure_skips_pass_without_commit() {
    let h = harness(utc(2026, 6, 15, 9), &[]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 0);
    assert!(!h.ledger.is_announced(date(2026, 6, 15), "U1").unwrap());
}

#[tokio::test]
async fn paused_member_is_skipped() {
    let h = harness(utc(2026, 6, 15, 9), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, None).unwrap(), "UTC")
        .unwrap();
    h.store.set_paused("U1", true).unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 0);
    assert!(h.transport.sent_texts().is_empty());
}

#[tokio::test]
async fn template_fallback_still_dispatches() {
    // The harness pipeline has no backends at all; a celebration must
    // still go out with template text.
    let h = harness(utc(2026, 6, 15, 9), &["U1"]);
    h.store
        .upsert("U1", Anniversary::new(6, 15, Some(1996)).unwrap(), "UTC")
        .unwrap();

    assert_eq!(h.engine.run_pass(CheckMode::Hourly).await.unwrap(), 1);
    let sent = h.transport.sent_texts();
    assert!(sent[0].contains("Happy Birthday"));
    assert!(sent[0].contains("30"), "age from birth year: {}", sent[0]);
}
