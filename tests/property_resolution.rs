//! Disambiguation must not depend on registration order.

use ferrous_ioc::{ComponentBuilder, ComponentCollection, Container, Resolver};
use proptest::prelude::*;

struct Tagged(usize);

fn order_and_pick() -> impl Strategy<Value = (Vec<usize>, usize)> {
    (2usize..7).prop_flat_map(|n| (Just((0..n).collect::<Vec<_>>()).prop_shuffle(), 0..n))
}

fn build<F>(order: &[usize], configure: F) -> Container
where
    F: Fn(usize, ComponentBuilder<Tagged>) -> ComponentBuilder<Tagged>,
{
    let mut components = ComponentCollection::new();
    for &i in order {
        let builder = ComponentBuilder::<Tagged>::new().supplier(move |_| Ok(Tagged(i)));
        components.add_component(&format!("tagged_{}", i), configure(i, builder));
    }
    components.build().unwrap()
}

proptest! {
    #[test]
    fn primary_wins_in_any_registration_order((order, primary) in order_and_pick()) {
        let container = build(&order, |i, builder| if i == primary { builder.primary() } else { builder });
        prop_assert_eq!(container.get::<Tagged>().unwrap().0, primary);
    }

    #[test]
    fn lowest_priority_wins_in_any_registration_order((order, lowest) in order_and_pick()) {
        // Priorities are distinct; `lowest` gets the smallest value
        let container = build(&order, |i, builder| {
            let priority = if i == lowest { -1 } else { i as i32 * 10 };
            builder.priority(priority)
        });
        prop_assert_eq!(container.get::<Tagged>().unwrap().0, lowest);
    }

    #[test]
    fn ordered_collection_is_independent_of_registration_order(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
        let container = build(&order, |i, builder| builder.order(i as i32));
        let tags: Vec<usize> = container.get_all::<Tagged>().unwrap().iter().map(|t| t.0).collect();
        prop_assert_eq!(tags, (0..6).collect::<Vec<_>>());
    }
}
