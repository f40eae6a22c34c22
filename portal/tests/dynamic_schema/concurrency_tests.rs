use std::sync::{Arc, Barrier};
use std::thread;

use crate::support::*;

#[test]
fn concurrent_adds_of_the_same_column_have_one_winner() {
    const WORKERS: usize = 8;

    let t = TestPortal::new();
    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let config = t.config();
            let admin = t.admin;
            thread::spawn(move || {
                let portal = Portal::open(config).expect("open portal");
                barrier.wait();
                portal
                    .add_field(&admin, &FieldSpec::new("patents", "npi_code", "text"))
                    .expect("add field")
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|handle| handle.join().expect("worker")).collect();
    let added = outcomes.iter().filter(|outcome| outcome.is_added()).count();
    let rejected = outcomes
        .iter()
        .filter(|outcome| **outcome == AddColumnOutcome::Rejected(RejectReason::AlreadyExists))
        .count();
    assert_eq!(added, 1, "{outcomes:?}");
    assert_eq!(rejected, WORKERS - 1, "{outcomes:?}");

    let fields = t.portal.fields(EntityTable::Patents, false).unwrap();
    assert_eq!(fields.len(), 1);
    assert!(t.portal.reconcile(EntityTable::Patents).unwrap().is_consistent());
}
