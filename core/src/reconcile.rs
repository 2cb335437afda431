//! Reconciliation: recompute what the aggregates should say from the
//! orders table, report the drift, and optionally repair it.
//!
//! Repairs go through the same additive delta path as live updates, so a
//! group correction keeps the global tier in step. Running a repair twice
//! is a no-op: the second pass recomputes against the corrected rows.

use crate::{
    category::StatCategory,
    clock::ReportingClock,
    config::LoanConfig,
    error::LoanResult,
    ledger::{IncomeCategory, IncomeLedger},
    order::OrderState,
    stats::StatUpdateEngine,
    store::LoanStore,
    types::{GroupId, OrderId},
};
use chrono::NaiveDate;
use serde::Serialize;

/// What `reconcile_group` found and did for one group.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupCorrection {
    pub group_id: GroupId,
    pub count_diff: i64,
    pub amount_diff: f64,
    pub corrected: bool,
}

/// One drifted counter pair, recorded vs recomputed. No mutation.
#[derive(Debug, Clone, Serialize)]
pub struct DriftEntry {
    pub group_id: GroupId,
    pub category: StatCategory,
    pub recorded_count: i64,
    pub actual_count: i64,
    pub recorded_amount: f64,
    pub actual_amount: f64,
}

/// A valid-pool order whose amount is not a round thousand.
#[derive(Debug, Clone, Serialize)]
pub struct AmountRemainder {
    pub group_id: GroupId,
    pub order_id: OrderId,
    pub amount: f64,
    pub remainder: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterestCheck {
    pub ledger_total: f64,
    pub aggregate_total: f64,
    pub diff: f64,
}

pub struct ReconciliationService<'a> {
    store: &'a LoanStore,
    config: &'a LoanConfig,
    clock: &'a ReportingClock,
}

impl<'a> ReconciliationService<'a> {
    pub fn new(store: &'a LoanStore, config: &'a LoanConfig, clock: &'a ReportingClock) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Recompute the group's valid pool from the orders table and repair
    /// the recorded counters if they drifted beyond the epsilon. The
    /// corrective delta is additive, so the global tier moves with it.
    pub fn reconcile_group(&self, group_id: &str) -> LoanResult<GroupCorrection> {
        let (actual_count, actual_amount) = self
            .store
            .count_and_sum_by_states(group_id, &[OrderState::Normal, OrderState::Overdue])?;
        let recorded = self.store.group_aggregate(group_id)?.unwrap_or_default();

        let count_diff = actual_count - recorded.valid_orders;
        let amount_diff = actual_amount - recorded.valid_amount;
        let drifted = count_diff != 0 || amount_diff.abs() > self.config.drift_epsilon;

        if drifted {
            log::warn!(
                "group {} drifted: count {:+}, amount {:+.2}; correcting",
                group_id,
                count_diff,
                amount_diff
            );
            self.store.ensure_group_row(group_id)?;
            StatUpdateEngine::new(self.store, self.clock).apply_delta(
                StatCategory::Valid,
                amount_diff,
                count_diff,
                Some(group_id),
                true,
            )?;
        }

        Ok(GroupCorrection {
            group_id: group_id.to_string(),
            count_diff,
            amount_diff,
            corrected: drifted,
        })
    }

    /// Reconcile every group the book knows about.
    pub fn reconcile_all(&self) -> LoanResult<Vec<GroupCorrection>> {
        let mut corrections = Vec::new();
        for group_id in self.store.known_group_ids()? {
            corrections.push(self.reconcile_group(&group_id)?);
        }
        Ok(corrections)
    }

    /// Diff recorded vs recomputed valid and breach counters for every
    /// group. Read-only: the report is for an operator or the audit tool.
    pub fn find_aggregate_drift(&self) -> LoanResult<Vec<DriftEntry>> {
        let mut entries = Vec::new();
        for group_id in self.store.known_group_ids()? {
            let recorded = self.store.group_aggregate(&group_id)?.unwrap_or_default();
            let checks = [
                (
                    StatCategory::Valid,
                    &[OrderState::Normal, OrderState::Overdue][..],
                    recorded.valid_orders,
                    recorded.valid_amount,
                ),
                (
                    StatCategory::Breach,
                    &[OrderState::Breach][..],
                    recorded.breach_orders,
                    recorded.breach_amount,
                ),
            ];
            for (category, states, recorded_count, recorded_amount) in checks {
                let (actual_count, actual_amount) =
                    self.store.count_and_sum_by_states(&group_id, states)?;
                let drifted = actual_count != recorded_count
                    || (actual_amount - recorded_amount).abs() > self.config.drift_epsilon;
                if drifted {
                    entries.push(DriftEntry {
                        group_id: group_id.clone(),
                        category,
                        recorded_count,
                        actual_count,
                        recorded_amount,
                        actual_amount,
                    });
                }
            }
        }
        Ok(entries)
    }

    /// Walk the valid pool and report every amount that is not a round
    /// thousand. Principal reductions are the usual source; anything else
    /// is worth a look.
    pub fn trace_amount_remainders(&self) -> LoanResult<Vec<AmountRemainder>> {
        let eps = self.config.drift_epsilon;
        let mut remainders = Vec::new();
        for order in self.store.valid_orders()? {
            let rem = order.amount.rem_euclid(1000.0);
            if rem > eps && (1000.0 - rem) > eps {
                remainders.push(AmountRemainder {
                    group_id: order.group_id,
                    order_id: order.order_id,
                    amount: order.amount,
                    remainder: rem,
                });
            }
        }
        Ok(remainders)
    }

    /// Compare the aggregate interest counter against the ledger, which is
    /// authoritative. Pass a window spanning the book's whole life to
    /// check the lifetime counter; a positive diff means the aggregate
    /// overstates interest.
    pub fn verify_interest_against_ledger(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        group_id: Option<&str>,
    ) -> LoanResult<InterestCheck> {
        let ledger_total = IncomeLedger::new(self.store).sum_category(
            start,
            end,
            IncomeCategory::Interest,
            group_id,
        )?;
        let aggregate_total = match group_id {
            Some(g) => self
                .store
                .group_aggregate(g)?
                .map(|r| r.interest)
                .unwrap_or(0.0),
            None => self.store.global_aggregate()?.interest,
        };
        Ok(InterestCheck {
            ledger_total,
            aggregate_total,
            diff: aggregate_total - ledger_total,
        })
    }
}
