//! Property tests over the pure domain logic.

use proptest::prelude::*;

use commerce_core::domain::{
    calculate_cart_summary, Cart, CartId, CartItemId, CartLine, CartSnapshot, OrderStatus,
    ProductId, VariantId,
};
use chrono::Utc;

const ALL_STATUSES: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

fn arb_status() -> impl Strategy<Value = OrderStatus> {
    prop::sample::select(ALL_STATUSES.to_vec())
}

fn arb_line() -> impl Strategy<Value = CartLine> {
    // Prices and quantities stay in ranges where subtotals cannot overflow
    // even across the maximum line count.
    (0i64..1_000_000, 1i64..1_000, any::<bool>()).prop_map(|(price, quantity, has_variant)| {
        CartLine {
            id: CartItemId::new(),
            product_id: ProductId::new(),
            variant_id: has_variant.then(VariantId::new),
            name: "item".to_string(),
            unit_price_cents: price,
            quantity,
            available_stock: quantity,
        }
    })
}

fn arb_snapshot() -> impl Strategy<Value = CartSnapshot> {
    prop::collection::vec(arb_line(), 0..32).prop_map(|lines| CartSnapshot {
        cart: Cart {
            id: CartId::new(),
            session_token: Some("sess".to_string()),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        lines,
    })
}

proptest! {
    #[test]
    fn summary_is_deterministic(snap in arb_snapshot()) {
        prop_assert_eq!(calculate_cart_summary(&snap), calculate_cart_summary(&snap));
    }

    #[test]
    fn summary_matches_naive_fold(snap in arb_snapshot()) {
        let summary = calculate_cart_summary(&snap);
        prop_assert_eq!(summary.item_count, snap.lines.len());
        prop_assert_eq!(
            summary.total_quantity,
            snap.lines.iter().map(|l| l.quantity).sum::<i64>()
        );
        prop_assert_eq!(
            summary.subtotal_cents,
            snap.lines.iter().map(|l| l.unit_price_cents * l.quantity).sum::<i64>()
        );
    }

    #[test]
    fn summary_is_additive_over_concatenation(a in arb_snapshot(), b in arb_snapshot()) {
        let sum_a = calculate_cart_summary(&a);
        let sum_b = calculate_cart_summary(&b);

        let mut combined = a.clone();
        combined.lines.extend(b.lines.iter().cloned());
        let sum_ab = calculate_cart_summary(&combined);

        prop_assert_eq!(sum_ab.item_count, sum_a.item_count + sum_b.item_count);
        prop_assert_eq!(sum_ab.total_quantity, sum_a.total_quantity + sum_b.total_quantity);
        prop_assert_eq!(sum_ab.subtotal_cents, sum_a.subtotal_cents + sum_b.subtotal_cents);
    }

    #[test]
    fn adding_a_line_never_decreases_the_summary(snap in arb_snapshot(), line in arb_line()) {
        let before = calculate_cart_summary(&snap);
        let mut grown = snap.clone();
        grown.lines.push(line);
        let after = calculate_cart_summary(&grown);

        prop_assert!(after.item_count > before.item_count);
        prop_assert!(after.total_quantity > before.total_quantity);
        prop_assert!(after.subtotal_cents >= before.subtotal_cents);
    }

    #[test]
    fn transitions_out_of_terminal_states_never_exist(from in arb_status(), to in arb_status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    #[test]
    fn legal_transitions_are_cancel_or_one_step_forward(from in arb_status(), to in arb_status()) {
        if from.can_transition_to(to) {
            prop_assert!(to == OrderStatus::Cancelled || from.next() == Some(to));
            prop_assert_ne!(from, to);
        }
    }

    #[test]
    fn forward_walk_from_pending_terminates_at_delivered(steps in 0usize..10) {
        let mut status = OrderStatus::Pending;
        for _ in 0..steps {
            match status.next() {
                Some(next) => {
                    prop_assert!(status.can_transition_to(next));
                    status = next;
                }
                None => break,
            }
        }
        prop_assert!(status.next().is_some() || status == OrderStatus::Delivered);
    }

    #[test]
    fn status_strings_round_trip(status in arb_status()) {
        prop_assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
    }
}
