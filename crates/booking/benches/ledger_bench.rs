use booking::{InMemoryReservationStore, NewBooking, SlotLedger};
use chrono::{NaiveDate, NaiveTime, Utc};
use common::{ResourceId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 1).unwrap_or_default()
}

fn time(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default()
}

fn bench_generate_day(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/generate_day_30min", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ledger = SlotLedger::new(InMemoryReservationStore::new());
                ledger
                    .generate(ResourceId::new(), date(), time(6), time(23), 30)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_claim_single(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/claim_single", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ledger = SlotLedger::new(InMemoryReservationStore::new());
                let resource = ResourceId::new();
                ledger
                    .generate(resource, date(), time(9), time(10), 60)
                    .await
                    .unwrap();
                ledger
                    .claim(resource, date(), time(9), NewBooking::for_user(UserId::new(), Utc::now()))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_contended_claims(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/contended_claims_16", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ledger = SlotLedger::new(InMemoryReservationStore::new());
                let resource = ResourceId::new();
                ledger
                    .generate(resource, date(), time(9), time(10), 60)
                    .await
                    .unwrap();

                let handles: Vec<_> = (0..16)
                    .map(|_| {
                        let ledger = ledger.clone();
                        tokio::spawn(async move {
                            ledger
                                .claim(
                                    resource,
                                    date(),
                                    time(9),
                                    NewBooking::for_user(UserId::new(), Utc::now()),
                                )
                                .await
                                .is_ok()
                        })
                    })
                    .collect();

                let mut wins = 0;
                for handle in handles {
                    if handle.await.unwrap() {
                        wins += 1;
                    }
                }
                assert_eq!(wins, 1);
            });
        });
    });
}

fn bench_list_available(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ledger = SlotLedger::new(InMemoryReservationStore::new());
    let resources: Vec<ResourceId> = (0..20).map(|_| ResourceId::new()).collect();

    // Pre-populate 20 resources with a day of hourly slots
    rt.block_on(async {
        for resource in &resources {
            ledger
                .generate(*resource, date(), time(6), time(23), 60)
                .await
                .unwrap();
        }
    });

    c.bench_function("ledger/list_available_17_of_340", |b| {
        b.iter(|| {
            rt.block_on(async {
                ledger.list_available(resources[0], date()).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_generate_day,
    bench_claim_single,
    bench_contended_claims,
    bench_list_available,
);
criterion_main!(benches);
