use merch_ledger::config::LedgerConfig;
use merch_ledger::domain::item::Item;
use merch_ledger::error::ErrorKind;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_never_overdraw() {
    let (ledger, store, ids) =
        common::ledger_with_users(Item::merch_catalog(), LedgerConfig::default(), &["alice", "bob"])
            .await;
    let ledger = Arc::new(ledger);
    let (alice, bob) = (ids[0], ids[1]);

    // 50 attempts of 30 coins against a balance of 1000: exactly 33 fit.
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.send_coins(alice, "bob", 30).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientFunds),
        }
    }

    assert_eq!(succeeded, 33);
    assert_eq!(common::balance(&ledger, alice).await, 10);
    assert_eq!(common::balance(&ledger, bob).await, 1990);
    assert_eq!(store.transactions().await.len(), 33);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_random_sends_conserve_coins() {
    let (ledger, store, ids) = common::ledger_with_users(
        Item::merch_catalog(),
        LedgerConfig::default(),
        &["alice", "bob", "carol"],
    )
    .await;
    let ledger = Arc::new(ledger);
    let names = ["alice", "bob", "carol"];

    let mut rng = rand::thread_rng();
    let plan: Vec<(usize, usize, i64)> = (0..200)
        .map(|_| {
            let from = rng.gen_range(0..3);
            let to = (from + rng.gen_range(1..3)) % 3;
            (from, to, rng.gen_range(1..=400))
        })
        .collect();

    let handles: Vec<_> = plan
        .into_iter()
        .map(|(from, to, amount)| {
            let ledger = Arc::clone(&ledger);
            let sender = ids[from];
            tokio::spawn(async move { ledger.send_coins(sender, names[to], amount).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientFunds),
        }
    }

    let mut total = 0;
    for id in &ids {
        let info = ledger.user_info(*id).await.unwrap();
        let sent: u64 = info.coin_history.sent.iter().map(|t| t.amount).sum();
        let received: u64 = info.coin_history.received.iter().map(|t| t.amount).sum();
        assert_eq!(info.coins + sent, 1000 + received);
        total += info.coins;
    }
    assert_eq!(total, 3000);
    assert_eq!(store.transactions().await.len(), committed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_do_not_deadlock() {
    let (ledger, _store, ids) =
        common::ledger_with_users(Item::merch_catalog(), LedgerConfig::default(), &["alice", "bob"])
            .await;
    let ledger = Arc::new(ledger);
    let (alice, bob) = (ids[0], ids[1]);

    let mut handles = Vec::new();
    for _ in 0..100 {
        let forward = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            forward.send_coins(alice, "bob", 1).await
        }));
        let backward = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            backward.send_coins(bob, "alice", 1).await
        }));
    }

    tokio::time::timeout(Duration::from_secs(10), async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    })
    .await
    .expect("opposite transfers deadlocked");

    assert_eq!(common::balance(&ledger, alice).await, 1000);
    assert_eq!(common::balance(&ledger, bob).await, 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_info_is_consistent_during_transfers() {
    let (ledger, _store, ids) =
        common::ledger_with_users(Item::merch_catalog(), LedgerConfig::default(), &["alice", "bob"])
            .await;
    let ledger = Arc::new(ledger);
    let (alice, bob) = (ids[0], ids[1]);

    let writer = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for i in 0..200 {
                let (sender, receiver) = if i % 2 == 0 { (alice, "bob") } else { (bob, "alice") };
                ledger.send_coins(sender, receiver, 7).await.unwrap();
            }
        })
    };

    let reader = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for _ in 0..200 {
                for id in [alice, bob] {
                    let info = ledger.user_info(id).await.unwrap();
                    let sent: u64 = info.coin_history.sent.iter().map(|t| t.amount).sum();
                    let received: u64 =
                        info.coin_history.received.iter().map(|t| t.amount).sum();
                    assert_eq!(info.coins + sent, 1000 + received);
                }
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}
