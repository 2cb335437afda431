//! Attribution migration: batch-move orders to a new group and shift the
//! group rollups to match.
//!
//! Pointer updates come first, one order at a time. Only orders whose
//! pointer actually moved contribute to the aggregate shift, accumulated
//! into per-old-group valid and breach buckets. Terminal orders move
//! pointer-only: their history stays with the group that earned it.
//! Aggregate deltas run after the pointer phase; if they fail the pointer
//! updates stand and the gap is left for reconciliation.

use crate::{
    category::StatCategory,
    clock::ReportingClock,
    error::LoanResult,
    order::OrderState,
    stats::StatUpdateEngine,
    store::LoanStore,
    types::GroupId,
};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub moved: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Bucket {
    count: i64,
    amount: f64,
}

pub struct AttributionMigrator<'a> {
    store: &'a LoanStore,
    clock: &'a ReportingClock,
}

impl<'a> AttributionMigrator<'a> {
    pub fn new(store: &'a LoanStore, clock: &'a ReportingClock) -> Self {
        Self { store, clock }
    }

    pub fn migrate_orders(
        &self,
        order_ids: &[String],
        new_group: &str,
    ) -> LoanResult<MigrationOutcome> {
        let mut outcome = MigrationOutcome::default();
        let mut valid_buckets: BTreeMap<GroupId, Bucket> = BTreeMap::new();
        let mut breach_buckets: BTreeMap<GroupId, Bucket> = BTreeMap::new();

        for order_id in order_ids {
            let order = match self.store.order_by_id(order_id)? {
                Some(o) => o,
                None => {
                    log::warn!("migration: order {} not found", order_id);
                    outcome.failed += 1;
                    continue;
                }
            };
            if order.group_id == new_group {
                outcome.moved += 1;
                continue;
            }
            if !self.store.update_order_group(order_id, new_group)? {
                log::warn!("migration: pointer update failed for {}", order_id);
                outcome.failed += 1;
                continue;
            }
            outcome.moved += 1;

            match order.state {
                OrderState::Normal | OrderState::Overdue => {
                    let b = valid_buckets.entry(order.group_id.clone()).or_default();
                    b.count += 1;
                    b.amount += order.amount;
                }
                OrderState::Breach => {
                    let b = breach_buckets.entry(order.group_id.clone()).or_default();
                    b.count += 1;
                    b.amount += order.amount;
                }
                // Terminal orders: pointer only.
                OrderState::End | OrderState::BreachEnd => {}
            }
        }

        if let Err(e) = self.shift_aggregates(&valid_buckets, &breach_buckets, new_group) {
            log::error!(
                "migration to {}: aggregate shift failed after pointer phase, \
                 run reconciliation: {}",
                new_group,
                e
            );
        }

        log::info!(
            "migration to {}: {} moved, {} failed",
            new_group,
            outcome.moved,
            outcome.failed
        );
        Ok(outcome)
    }

    fn shift_aggregates(
        &self,
        valid_buckets: &BTreeMap<GroupId, Bucket>,
        breach_buckets: &BTreeMap<GroupId, Bucket>,
        new_group: &str,
    ) -> LoanResult<()> {
        let engine = StatUpdateEngine::new(self.store, self.clock);
        self.store.ensure_group_row(new_group)?;

        // Deltas take the engine's normal fan-out. The paired negative and
        // positive writes cancel on the global tier and on the all-groups
        // daily row; per-group daily rows for daily-tracked buckets move
        // on the migration date.
        for (category, buckets) in [
            (StatCategory::Valid, valid_buckets),
            (StatCategory::Breach, breach_buckets),
        ] {
            let mut total = Bucket::default();
            for (old_group, bucket) in buckets {
                engine.apply_delta(category, -bucket.amount, -bucket.count, Some(old_group), false)?;
                total.count += bucket.count;
                total.amount += bucket.amount;
            }
            if total.count != 0 || total.amount != 0.0 {
                engine.apply_delta(category, total.amount, total.count, Some(new_group), false)?;
            }
        }
        Ok(())
    }
}
