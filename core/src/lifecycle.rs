//! Order lifecycle: creation and the state machine, with every
//! transition's aggregate and ledger side effects in one place.

use crate::{
    category::StatCategory,
    clock::ReportingClock,
    config::LoanConfig,
    error::{LoanError, LoanResult},
    ledger::{IncomeCategory, IncomeLedger},
    order::{weekday_group, CustomerClass, NewOrder, Order, OrderState},
    stats::StatUpdateEngine,
    store::LoanStore,
    types::ChatId,
};
use anyhow::anyhow;

pub struct LifecycleController<'a> {
    store: &'a LoanStore,
    config: &'a LoanConfig,
    clock: &'a ReportingClock,
}

impl<'a> LifecycleController<'a> {
    pub fn new(store: &'a LoanStore, config: &'a LoanConfig, clock: &'a ReportingClock) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    fn engine(&self) -> StatUpdateEngine<'a> {
        StatUpdateEngine::new(self.store, self.clock)
    }

    fn ledger(&self) -> IncomeLedger<'a> {
        IncomeLedger::new(self.store)
    }

    /// Create an order, in the caller's group or the configured default.
    ///
    /// Orders dated before the historical cutoff are backfill: they enter
    /// the valid (or breach) pool but move no cash, no client-class stats
    /// and no daily rows. Live orders are refused when the book's liquid
    /// funds cannot cover the disbursement.
    pub fn create_order(&self, new: &NewOrder) -> LoanResult<Order> {
        if new.amount <= 0.0 {
            return Err(LoanError::NonPositiveAmount { amount: new.amount });
        }
        if self.store.order_exists(&new.order_id)? {
            return Err(LoanError::DuplicateOrder {
                order_id: new.order_id.clone(),
            });
        }
        if let Some(existing) = self.store.active_order_for_chat(new.chat_id)? {
            return Err(LoanError::ChatOccupied {
                chat_id: new.chat_id,
                order_id: existing.order_id,
            });
        }

        let historical = new.date < self.config.historical_cutoff;
        if !historical {
            let global = self.store.global_aggregate()?;
            if global.liquid_funds < new.amount {
                return Err(LoanError::InsufficientFunds {
                    balance: global.liquid_funds,
                    required: new.amount,
                });
            }
        }

        let order = Order {
            order_id: new.order_id.clone(),
            group_id: new
                .group_id
                .clone()
                .unwrap_or_else(|| self.config.default_group.clone()),
            chat_id: new.chat_id,
            date: new.date,
            weekday_group: weekday_group(new.date).to_string(),
            customer: new.customer,
            amount: new.amount,
            state: new.initial_state,
        };
        self.store.insert_order(&order)?;

        let engine = self.engine();
        let group = Some(order.group_id.as_str());
        let pool = if order.state == OrderState::Breach {
            StatCategory::Breach
        } else {
            StatCategory::Valid
        };
        engine.apply_delta(pool, order.amount, 1, group, historical)?;

        if !historical {
            engine.apply_cash_flow(-order.amount)?;
            let class = match order.customer {
                CustomerClass::New => StatCategory::NewClients,
                CustomerClass::Returning => StatCategory::OldClients,
            };
            engine.apply_delta(class, order.amount, 1, group, false)?;
        } else {
            log::debug!(
                "historical order {} ({}): cash and client stats skipped",
                order.order_id,
                order.date
            );
        }

        Ok(order)
    }

    /// Drive the chat's active order to `target`, applying the
    /// transition's aggregate and ledger effects. `supplied_amount` is the
    /// settlement figure for breach -> breach_end; every other transition
    /// ignores it. Returns the order as it stood before the transition.
    pub fn transition_order(
        &self,
        chat_id: ChatId,
        target: OrderState,
        supplied_amount: Option<f64>,
    ) -> LoanResult<Order> {
        let order = self
            .store
            .active_order_for_chat(chat_id)?
            .ok_or(LoanError::NotFound { chat_id })?;

        if !order.state.can_transition_to(target) {
            return Err(LoanError::InvalidTransition {
                from: order.state,
                to: target,
            });
        }

        // Settlement amount is validated before anything is written.
        let supplied = supplied_amount.unwrap_or(order.amount);
        if target == OrderState::BreachEnd && supplied <= 0.0 {
            return Err(LoanError::NonPositiveAmount { amount: supplied });
        }

        // One reporting date for every row this transition touches.
        let date = self.clock.reporting_date();
        let engine = self.engine();
        let group = Some(order.group_id.as_str());

        self.store.update_order_state(chat_id, target)?;

        match (order.state, target) {
            // Pointer move inside the valid pool; aggregates unchanged.
            (OrderState::Normal, OrderState::Overdue)
            | (OrderState::Overdue, OrderState::Normal) => {}

            (OrderState::Normal | OrderState::Overdue, OrderState::Breach) => {
                engine.apply_delta_as_of(date, StatCategory::Valid, -order.amount, -1, group, false)?;
                engine.apply_delta_as_of(date, StatCategory::Breach, order.amount, 1, group, false)?;
            }

            (OrderState::Normal | OrderState::Overdue, OrderState::End) => {
                engine.apply_delta_as_of(date, StatCategory::Valid, -order.amount, -1, group, false)?;
                engine.apply_delta_as_of(
                    date,
                    StatCategory::Completed,
                    order.amount,
                    1,
                    group,
                    false,
                )?;
                engine.apply_cash_flow_as_of(date, order.amount)?;
                self.ledger().record_event(
                    date,
                    IncomeCategory::Completed,
                    order.amount,
                    group,
                    Some(&order.order_id),
                    Some(order.customer),
                    None,
                    None,
                )?;
            }

            (OrderState::Breach, OrderState::BreachEnd) => {
                // The breach pool drains by what it was charged with; the
                // settlement may differ from the original amount.
                engine.apply_delta_as_of(date, StatCategory::Breach, -order.amount, -1, group, false)?;
                engine.apply_delta_as_of(date, StatCategory::BreachEnd, supplied, 1, group, false)?;
                engine.apply_cash_flow_as_of(date, supplied)?;
                self.ledger().record_event(
                    date,
                    IncomeCategory::BreachEnd,
                    supplied,
                    group,
                    Some(&order.order_id),
                    Some(order.customer),
                    None,
                    None,
                )?;
            }

            // can_transition_to already rejected everything else.
            (from, to) => {
                return Err(LoanError::InvalidTransition { from, to });
            }
        }

        log::info!(
            "order {} (chat {}) {} -> {}",
            order.order_id,
            chat_id,
            order.state.as_str(),
            target.as_str()
        );
        Ok(order)
    }

    /// Record an interest payment on the chat's active order.
    pub fn collect_interest(&self, chat_id: ChatId, amount: f64) -> LoanResult<()> {
        if amount <= 0.0 {
            return Err(LoanError::NonPositiveAmount { amount });
        }
        let order = self
            .store
            .active_order_for_chat(chat_id)?
            .ok_or(LoanError::NotFound { chat_id })?;

        let date = self.clock.reporting_date();
        let group = Some(order.group_id.as_str());
        self.engine()
            .apply_delta_as_of(date, StatCategory::Interest, amount, 0, group, false)?;
        self.engine().apply_cash_flow_as_of(date, amount)?;
        self.ledger().record_event(
            date,
            IncomeCategory::Interest,
            amount,
            group,
            Some(&order.order_id),
            Some(order.customer),
            None,
            None,
        )?;
        Ok(())
    }

    /// Partial repayment of principal on a valid-pool order. The order's
    /// amount shrinks in place; the valid pool loses the repaid portion
    /// without losing the order.
    pub fn reduce_principal(&self, chat_id: ChatId, amount: f64) -> LoanResult<()> {
        if amount <= 0.0 {
            return Err(LoanError::NonPositiveAmount { amount });
        }
        let order = self
            .store
            .active_order_for_chat(chat_id)?
            .ok_or(LoanError::NotFound { chat_id })?;
        if !order.state.is_valid_pool() {
            return Err(LoanError::Other(anyhow!(
                "principal reduction requires a normal/overdue order, chat {} is {}",
                chat_id,
                order.state.as_str()
            )));
        }
        if amount >= order.amount {
            return Err(LoanError::Other(anyhow!(
                "principal reduction {:.2} must be below the order amount {:.2}; settle the order instead",
                amount,
                order.amount
            )));
        }

        let date = self.clock.reporting_date();
        let group = Some(order.group_id.as_str());
        self.store
            .update_order_amount(chat_id, order.amount - amount)?;
        self.engine()
            .apply_delta_as_of(date, StatCategory::Valid, -amount, 0, group, false)?;
        self.engine().apply_cash_flow_as_of(date, amount)?;
        self.ledger().record_event(
            date,
            IncomeCategory::PrincipalReduction,
            amount,
            group,
            Some(&order.order_id),
            Some(order.customer),
            None,
            None,
        )?;
        Ok(())
    }

    /// Manual liquid-funds correction. Signed; zero is rejected. Leaves an
    /// adjustment event so the correction is auditable.
    pub fn adjust_funds(&self, amount: f64, note: Option<&str>) -> LoanResult<()> {
        if amount == 0.0 {
            return Err(LoanError::NonPositiveAmount { amount });
        }
        let date = self.clock.reporting_date();
        self.engine().apply_cash_flow_as_of(date, amount)?;
        self.ledger().record_event(
            date,
            IncomeCategory::Adjustment,
            amount,
            None,
            None,
            None,
            note,
            None,
        )?;
        log::info!("liquid funds adjusted by {:+.2}", amount);
        Ok(())
    }
}
