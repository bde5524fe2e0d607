use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::foundation::core::{AccountId, Address};
use crate::manager::pending::PendingSet;

fn key(addr: &str) -> FetchKey {
    FetchKey::new(AccountId::new("romeo@montague.lit"), Address::new(addr))
}

fn job<F>(addr: &str, fut: F) -> FetchJob
where
    F: std::future::Future<Output = AvatarResult<()>> + Send + 'static,
{
    FetchJob {
        key: key(addr),
        run: fut.boxed(),
    }
}

fn ok() -> AvatarResult<()> {
    Ok(())
}

fn fail(err: AvatarError) -> AvatarResult<()> {
    Err(err)
}

fn explode(msg: &str) -> AvatarResult<()> {
    panic!("{msg}")
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn outcomes_are_counted_by_kind() {
    let pool = FetchWorkerPool::spawn(&Handle::current(), 2);

    assert!(pool.submit(job("ok", async { ok() })));
    assert!(pool.submit(job("failed", async { fail(AvatarError::NotPrepared) })));
    assert!(pool.submit(job("slow", async {
        fail(AvatarError::FetchTimeout {
            address: Address::new("slow"),
            after: Duration::from_millis(1),
        })
    })));
    assert!(pool.submit(job("boom", async { explode("renderer exploded") })));

    wait_for(|| {
        let s = pool.stats();
        s.completed + s.failed + s.timed_out + s.panicked == 4
    })
    .await;

    assert_eq!(
        pool.stats(),
        FetchStats {
            enqueued: 4,
            completed: 1,
            timed_out: 1,
            failed: 1,
            panicked: 1,
        }
    );
}

#[tokio::test]
async fn a_panicking_job_does_not_kill_its_worker() {
    let pool = FetchWorkerPool::spawn(&Handle::current(), 1);
    pool.submit(job("boom", async { explode("boom") }));
    pool.submit(job("after", async { ok() }));

    wait_for(|| pool.stats().completed == 1).await;
    assert_eq!(pool.stats().panicked, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded_by_worker_count() {
    let pool = FetchWorkerPool::spawn(&Handle::current(), 2);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..6 {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        pool.submit(job(&format!("peer{i}"), async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            ok()
        }));
    }

    wait_for(|| pool.stats().completed == 6).await;
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn closed_pool_drops_new_jobs_and_releases_their_keys() {
    let pool = FetchWorkerPool::spawn(&Handle::current(), 1);
    pool.close();
    assert!(pool.is_closed());

    let pending = PendingSet::default();
    let guard = pending.try_claim(key("juliet")).unwrap();
    let accepted = pool.submit(job("juliet", async move {
        drop(guard);
        ok()
    }));

    assert!(!accepted);
    assert_eq!(pending.len(), 0);
    assert_eq!(pool.stats().enqueued, 0);
}

#[test]
fn panic_payloads_are_rendered_for_logging() {
    let formatted = std::panic::catch_unwind(|| panic!("decoder overflow at {}", 7)).unwrap_err();
    assert_eq!(panic_message(formatted.as_ref()), "decoder overflow at 7");

    let literal = std::panic::catch_unwind(|| std::panic::panic_any("static message")).unwrap_err();
    assert_eq!(panic_message(literal.as_ref()), "static message");

    let opaque = std::panic::catch_unwind(|| std::panic::panic_any(42_u32)).unwrap_err();
    assert_eq!(panic_message(opaque.as_ref()), "non-string panic payload");
}
