use people_core::{ChangeNotifier, ResourceScope};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(10);
const WORKERS: usize = 8;
const ROUNDS: usize = 200;

async fn wait_for_publishes(published: &AtomicUsize, count: usize) {
    let target = published.load(Ordering::Acquire) + count;
    while published.load(Ordering::Acquire) < target {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn publish_racing_removal_never_reaches_removed_observers() {
    let notifier = ChangeNotifier::new();
    let scope = ResourceScope::parse("/person");
    let stop = Arc::new(AtomicBool::new(false));
    let published = Arc::new(AtomicUsize::new(0));

    let publisher = {
        let notifier = notifier.clone();
        let scope = scope.clone();
        let stop = Arc::clone(&stop);
        let published = Arc::clone(&published);
        tokio::task::spawn_blocking(move || {
            while !stop.load(Ordering::Acquire) {
                notifier.publish(&scope);
                published.fetch_add(1, Ordering::Release);
            }
        })
    };

    let mut workers = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let notifier = notifier.clone();
        let scope = scope.child(format!("w{worker}"));
        let published = Arc::clone(&published);
        workers.push(tokio::spawn(async move {
            for round in 0..ROUNDS {
                let mut subscription = notifier.subscribe(&scope, round % 2 == 0);
                tokio::task::yield_now().await;

                if (worker + round) % 2 == 0 {
                    assert!(notifier.unsubscribe(subscription.id()));
                    while subscription.try_changed().is_some() {}
                    wait_for_publishes(&published, 2).await;
                    assert!(
                        subscription.try_changed().is_none(),
                        "removed observer was signalled"
                    );
                } else {
                    drop(subscription);
                }
            }
        }));
    }

    timeout(DEADLINE, async {
        for worker in workers {
            worker.await.unwrap();
        }
    })
    .await
    .expect("subscribe/unsubscribe must not deadlock against publish");

    stop.store(true, Ordering::Release);
    timeout(DEADLINE, publisher).await.unwrap().unwrap();
    assert_eq!(notifier.observer_count(), 0);
    assert_eq!(notifier.publish(&scope), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn live_observers_keep_receiving_while_others_churn() {
    let notifier = ChangeNotifier::new();
    let scope = ResourceScope::parse("/person");
    let mut steady = notifier.subscribe(&scope, true);

    let churn = {
        let notifier = notifier.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                let subscription = notifier.subscribe(&scope, true);
                tokio::task::yield_now().await;
                drop(subscription);
            }
        })
    };

    for _ in 0..100 {
        assert!(notifier.publish(&scope) >= 1);
        tokio::task::yield_now().await;
    }
    timeout(DEADLINE, churn).await.unwrap().unwrap();

    let mut received = 0;
    while steady.try_changed().is_some() {
        received += 1;
    }
    assert_eq!(received, 100);
    assert_eq!(notifier.observer_count(), 1);
}
