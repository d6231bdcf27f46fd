use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity, StockItemId};

use crate::movement::{
    MovementType, NewMovement, REASON_ADJUSTMENT_ENTRY, REASON_ADJUSTMENT_WRITE_OFF,
    REASON_INITIAL_REGISTRATION, REASON_STOCK_ENTRY,
};
use crate::validator::{MAX_REASON_LEN, optional_text, validate_quantity};

/// A named consumable kept in stock.
///
/// `quantity` is the only mutable state; it always equals the signed sum of the
/// item's movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: StockItemId,
    pub name: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for StockItem {
    type Id = StockItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl StockItem {
    /// Quantity after applying one movement (see [`next_quantity`]).
    pub fn quantity_after(&self, movement_type: MovementType, quantity: i64) -> DomainResult<i64> {
        next_quantity(self.quantity, movement_type, quantity)
    }
}

/// The per-item state machine.
///
/// ENTRY adds, every other type subtracts. A debit larger than `current` fails
/// with [`DomainError::InsufficientStock`] carrying `current` as the available amount.
pub fn next_quantity(current: i64, movement_type: MovementType, quantity: i64) -> DomainResult<i64> {
    validate_quantity(quantity)?;

    if movement_type.is_debit() {
        if current < quantity {
            return Err(DomainError::insufficient_stock(current, quantity));
        }
        Ok(current - quantity)
    } else {
        current
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("quantity overflow"))
    }
}

/// Fold a sequence of movements over an initial quantity.
///
/// Stops at the first movement the state machine rejects.
pub fn replay<I>(initial: i64, movements: I) -> DomainResult<i64>
where
    I: IntoIterator<Item = (MovementType, i64)>,
{
    movements
        .into_iter()
        .try_fold(initial, |current, (t, qty)| next_quantity(current, t, qty))
}

/// The ENTRY appended by a deposit.
///
/// `creates_item` selects the reason: a deposit under an unknown name registers
/// the item, a deposit under a known name is a plain stock entry.
pub fn deposit_movement(quantity: i64, creates_item: bool) -> DomainResult<NewMovement> {
    let quantity = validate_quantity(quantity)?;
    let reason = if creates_item {
        REASON_INITIAL_REGISTRATION
    } else {
        REASON_STOCK_ENTRY
    };

    Ok(NewMovement {
        movement_type: MovementType::Entry,
        quantity,
        location: None,
        reason: Some(reason.to_string()),
    })
}

/// Outcome of planning a manual adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentPlan {
    /// Net change, `add - sub`.
    pub delta: i64,
    pub new_quantity: i64,
    /// ENTRY first (if any), then LOSS (if any).
    pub movements: Vec<NewMovement>,
}

/// Plan a manual adjustment of `+add` and `-sub` units against `current`.
///
/// Both halves may be present at once. A result below zero is a validation
/// failure that reports the current quantity.
pub fn plan_adjustment(
    current: i64,
    add: i64,
    sub: i64,
    reason: Option<&str>,
) -> DomainResult<AdjustmentPlan> {
    if add < 0 || sub < 0 {
        return Err(DomainError::validation(
            "adjustment quantities cannot be negative",
        ));
    }
    let reason = optional_text(reason, MAX_REASON_LEN, "reason")?;

    let delta = add - sub;
    let new_quantity = current
        .checked_add(delta)
        .ok_or_else(|| DomainError::validation("quantity overflow"))?;
    if new_quantity < 0 {
        return Err(DomainError::validation(format!(
            "adjustment would leave negative stock (current quantity: {current})"
        )));
    }

    let mut movements = Vec::with_capacity(2);
    if add > 0 {
        movements.push(NewMovement {
            movement_type: MovementType::Entry,
            quantity: add,
            location: None,
            reason: Some(reason.clone().unwrap_or_else(|| REASON_ADJUSTMENT_ENTRY.to_string())),
        });
    }
    if sub > 0 {
        movements.push(NewMovement {
            movement_type: MovementType::Loss,
            quantity: sub,
            location: None,
            reason: Some(reason.unwrap_or_else(|| REASON_ADJUSTMENT_WRITE_OFF.to_string())),
        });
    }

    Ok(AdjustmentPlan {
        delta,
        new_quantity,
        movements,
    })
}

/// Stored quantity versus the quantity implied by the movement log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub item_id: StockItemId,
    pub stored: i64,
    pub computed: i64,
}

impl Reconciliation {
    /// `movements` is the item's full log as (type, quantity) pairs.
    pub fn compute<I>(item: &StockItem, movements: I) -> Self
    where
        I: IntoIterator<Item = (MovementType, i64)>,
    {
        let computed = movements.into_iter().map(|(t, q)| t.signed(q)).sum();
        Self {
            item_id: item.id,
            stored: item.quantity,
            computed,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.stored == self.computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_item(quantity: i64) -> StockItem {
        let now = Utc::now();
        StockItem {
            id: StockItemId::from_i64(1),
            name: "Cabo HDMI".to_string(),
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn entry_credits_and_debits_subtract() {
        assert_eq!(next_quantity(10, MovementType::Entry, 5), Ok(15));
        assert_eq!(next_quantity(10, MovementType::Use, 4), Ok(6));
        assert_eq!(next_quantity(10, MovementType::Loss, 10), Ok(0));
        assert_eq!(next_quantity(10, MovementType::Damage, 1), Ok(9));
    }

    #[test]
    fn debit_beyond_stock_reports_available_amount() {
        let item = test_item(3);
        assert_eq!(
            item.quantity_after(MovementType::Use, 7),
            Err(DomainError::InsufficientStock {
                available: 3,
                requested: 7
            })
        );
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(matches!(
            next_quantity(10, MovementType::Entry, 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn deposit_reason_depends_on_item_creation() {
        let first = deposit_movement(20, true).unwrap();
        assert_eq!(first.movement_type, MovementType::Entry);
        assert_eq!(first.reason.as_deref(), Some(REASON_INITIAL_REGISTRATION));

        let again = deposit_movement(5, false).unwrap();
        assert_eq!(again.reason.as_deref(), Some(REASON_STOCK_ENTRY));

        assert!(deposit_movement(0, true).is_err());
    }

    #[test]
    fn adjustment_with_both_halves_appends_entry_then_loss() {
        let plan = plan_adjustment(10, 5, 3, None).unwrap();
        assert_eq!(plan.new_quantity, 12);
        assert_eq!(plan.delta, 2);
        assert_eq!(plan.movements.len(), 2);
        assert_eq!(plan.movements[0].movement_type, MovementType::Entry);
        assert_eq!(plan.movements[0].quantity, 5);
        assert_eq!(plan.movements[0].reason.as_deref(), Some(REASON_ADJUSTMENT_ENTRY));
        assert_eq!(plan.movements[1].movement_type, MovementType::Loss);
        assert_eq!(plan.movements[1].quantity, 3);
        assert_eq!(plan.movements[1].reason.as_deref(), Some(REASON_ADJUSTMENT_WRITE_OFF));
    }

    #[test]
    fn adjustment_uses_supplied_reason_for_both_halves() {
        let plan = plan_adjustment(0, 2, 1, Some("inventory count")).unwrap();
        assert!(plan
            .movements
            .iter()
            .all(|m| m.reason.as_deref() == Some("inventory count")));
    }

    #[test]
    fn adjustment_below_zero_reports_current_quantity() {
        let err = plan_adjustment(4, 0, 9, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("current quantity: 4")));
    }

    #[test]
    fn rename_only_adjustment_has_no_movements() {
        let plan = plan_adjustment(4, 0, 0, None).unwrap();
        assert_eq!(plan.new_quantity, 4);
        assert!(plan.movements.is_empty());
    }

    #[test]
    fn negative_adjustment_halves_are_rejected() {
        assert!(plan_adjustment(4, -1, 0, None).is_err());
        assert!(plan_adjustment(4, 0, -1, None).is_err());
    }

    #[test]
    fn reconciliation_detects_drift() {
        let item = test_item(25);
        let log = [(MovementType::Entry, 20), (MovementType::Entry, 5)];
        assert!(Reconciliation::compute(&item, log).is_balanced());

        let drifted = test_item(24);
        let rec = Reconciliation::compute(&drifted, log);
        assert!(!rec.is_balanced());
        assert_eq!(rec.computed, 25);
    }

    fn movement_strategy() -> impl Strategy<Value = (MovementType, i64)> {
        (
            prop_oneof![
                Just(MovementType::Entry),
                Just(MovementType::Use),
                Just(MovementType::Loss),
                Just(MovementType::Damage),
            ],
            1i64..50,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        /// Accepted movements always sum to the final quantity; rejected debits never move it.
        #[test]
        fn replay_matches_signed_sum(
            initial in 0i64..100,
            movements in prop::collection::vec(movement_strategy(), 0..40),
        ) {
            let mut current = initial;
            let mut accepted = Vec::new();
            for (t, q) in &movements {
                match next_quantity(current, *t, *q) {
                    Ok(next) => {
                        current = next;
                        accepted.push((*t, *q));
                    }
                    Err(DomainError::InsufficientStock { available, requested }) => {
                        prop_assert_eq!(available, current);
                        prop_assert_eq!(requested, *q);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
            }

            let entries: i64 = accepted.iter().filter(|(t, _)| !t.is_debit()).map(|(_, q)| q).sum();
            let debits: i64 = accepted.iter().filter(|(t, _)| t.is_debit()).map(|(_, q)| q).sum();
            prop_assert_eq!(current, initial + entries - debits);
            prop_assert_eq!(replay(initial, accepted.iter().copied()), Ok(current));
            prop_assert!(current >= 0);
        }

        #[test]
        fn adjustment_never_goes_negative(
            current in 0i64..100,
            add in 0i64..100,
            sub in 0i64..200,
        ) {
            match plan_adjustment(current, add, sub, None) {
                Ok(plan) => {
                    prop_assert_eq!(plan.new_quantity, current + add - sub);
                    prop_assert!(plan.new_quantity >= 0);
                    let replayed = replay(current, plan.movements.iter().map(|m| (m.movement_type, m.quantity)));
                    prop_assert_eq!(replayed, Ok(plan.new_quantity));
                }
                Err(DomainError::Validation(_)) => prop_assert!(current + add - sub < 0),
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
    }
}
