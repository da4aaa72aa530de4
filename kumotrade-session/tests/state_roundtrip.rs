//! Property test: durable state survives a disk round-trip unchanged.

use proptest::prelude::*;
use std::collections::BTreeMap;

use kumotrade_session::{CarriedPosition, SessionState};

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..10_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_carried() -> impl Strategy<Value = BTreeMap<String, CarriedPosition>> {
    prop::collection::btree_map(
        "[A-Z]{1,5}",
        arb_price().prop_map(|buffer_price| CarriedPosition { buffer_price }),
        0..6,
    )
}

proptest! {
    #[test]
    fn state_round_trips_through_disk(
        balance in arb_price(),
        sells in arb_carried(),
        buys in arb_carried(),
    ) {
        // Overlapping carryover is invalid by contract, so keep the maps
        // disjoint: the sell side wins ties.
        let mut buys = buys;
        for symbol in sells.keys() {
            buys.remove(symbol);
        }

        let mut state = SessionState::new("prop", balance);
        state.stocks_to_sell = sells;
        state.stocks_to_buy_back = buys;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_info.json");
        state.save(&path).unwrap();
        let loaded = SessionState::load(&path).unwrap();

        prop_assert_eq!(state, loaded);
    }
}
