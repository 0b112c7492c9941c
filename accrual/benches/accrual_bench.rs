use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;

use drip_accrual::{AccrualLedger, MintingState, RecordingAccrualLedger, SingleIssuer};
use drip_nullables::NullClock;
use drip_types::{AccountId, Timestamp};

fn populated_ledger(accounts: usize) -> (Rc<NullClock>, AccrualLedger) {
    let clock = Rc::new(NullClock::new(0));
    let mut ledger: AccrualLedger =
        AccrualLedger::new(Rc::clone(&clock), SingleIssuer::new("issuer"));
    let issuer = AccountId::new("issuer");
    for i in 0..accounts {
        let id = AccountId::new(format!("acct_{i}"));
        ledger.mint(&issuer, &id, 1_000).unwrap();
        ledger.set_minting_speed(&issuer, &id, 1 + i as u128).unwrap();
    }
    clock.advance(3_600);
    (clock, ledger)
}

fn bench_effective_balance(c: &mut Criterion) {
    let state = MintingState::<drip_accrual::NoRecord> {
        amount: 1_000,
        speed: 277_777_777_777_778,
        last_settled: Timestamp::new(0),
        record: Default::default(),
    };
    c.bench_function("state_effective", |b| {
        b.iter(|| black_box(state.effective(black_box(Timestamp::new(86_400)))));
    });
}

fn bench_verify_invariants(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_invariants");
    for accounts in [10, 100, 1_000] {
        let (_clock, ledger) = populated_ledger(accounts);
        group.bench_with_input(BenchmarkId::new("accounts", accounts), &accounts, |b, _| {
            b.iter(|| black_box(ledger.verify_invariants()));
        });
    }
    group.finish();
}

fn bench_transfer(c: &mut Criterion) {
    let from = AccountId::new("acct_0");
    let to = AccountId::new("acct_1");
    c.bench_function("transfer_settled", |b| {
        b.iter_batched(
            || populated_ledger(2),
            |(_clock, mut ledger)| {
                let _ = black_box(ledger.transfer_settled(&from, &to, 2_000));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_recording_speed_change(c: &mut Criterion) {
    let issuer = AccountId::new("issuer");
    let x = AccountId::new("x");
    c.bench_function("recording_set_minting_speed", |b| {
        b.iter_batched(
            || {
                let clock = Rc::new(NullClock::new(0));
                let ledger =
                    RecordingAccrualLedger::new(Rc::clone(&clock), SingleIssuer::new("issuer"));
                (clock, ledger)
            },
            |(clock, mut ledger)| {
                for i in 1u128..=10 {
                    clock.advance(60);
                    ledger
                        .set_minting_speed(&issuer, &x, black_box(100 + i))
                        .unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_effective_balance,
    bench_verify_invariants,
    bench_transfer,
    bench_recording_speed_change,
);
criterion_main!(benches);
