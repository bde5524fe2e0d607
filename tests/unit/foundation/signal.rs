use std::sync::atomic::AtomicUsize;

use super::*;

fn counter() -> (Arc<AtomicUsize>, impl Fn(&u32) + Send + Sync + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    (hits, move |_: &u32| {
        h.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn emit_reaches_every_handler_until_disconnected() {
    let signal = Signal::<u32>::new();
    let (a_hits, a) = counter();
    let (b_hits, b) = counter();
    let a_token = signal.connect(a);
    let _b_token = signal.connect(b);

    signal.emit(&1);
    assert!(signal.disconnect(a_token));
    signal.emit(&2);

    assert_eq!(a_hits.load(Ordering::SeqCst), 1);
    assert_eq!(b_hits.load(Ordering::SeqCst), 2);
    assert_eq!(signal.handler_count(), 1);
}

#[test]
fn disconnect_twice_reports_false() {
    let signal = Signal::<u32>::new();
    let token = signal.connect(|_| {});
    let again = SubscriptionToken(token.0);
    assert!(signal.disconnect(token));
    assert!(!signal.disconnect(again));
}

#[test]
fn handlers_may_connect_reentrantly() {
    let signal = Signal::<u32>::new();
    let inner = signal.clone();
    signal.connect(move |_| {
        inner.connect(|_| {});
    });
    signal.emit(&0);
    assert_eq!(signal.handler_count(), 2);
}

#[test]
fn subscriptions_release_on_disconnect_all_and_drop() {
    let signal = Signal::<u32>::new();
    let mut subs = Subscriptions::new();
    subs.connect(&signal, |_| {});
    subs.connect(&signal, |_| {});
    assert_eq!(subs.len(), 2);
    subs.disconnect_all();
    assert!(subs.is_empty());
    assert_eq!(signal.handler_count(), 0);

    {
        let mut scoped = Subscriptions::new();
        scoped.connect(&signal, |_| {});
        assert_eq!(signal.handler_count(), 1);
    }
    assert_eq!(signal.handler_count(), 0);
}
