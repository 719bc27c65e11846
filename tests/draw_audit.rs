#![allow(non_snake_case)]
use jdb_raffle::{
    H256,
    U256,
    animals::SESSION_SIZE,
    audit::{
        audit_draw,
        winning_index,
    },
    test_helpers::{
        PUBLISHED_DRAWS,
        historical_draws,
        published_draw,
    },
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn winning_index__is_random_mod_96(bytes in proptest::array::uniform32(any::<u8>())) {
        let random = H256::from(bytes);
        let index = winning_index(&random);
        prop_assert!(index < SESSION_SIZE);
        let expected = U256::from_big_endian(random.as_bytes()) % U256::from(96u64);
        prop_assert_eq!(U256::from(index), expected);
    }
}

#[test]
fn audit_draw__verifies_recorded_history() {
    // given
    let draws = historical_draws();
    assert_eq!(draws.len(), PUBLISHED_DRAWS.len());

    for (draw, (_, number, animal)) in draws.iter().zip(PUBLISHED_DRAWS) {
        // when
        let audit = audit_draw(draw);

        // then
        assert!(audit.verified(), "draw {} failed audit", draw.id);
        assert_eq!(audit.computed_number, number);
        assert_eq!(audit.computed_animal, Some(animal));
    }
}

#[test]
fn audit_draw__flags_wrong_animal_for_a_correct_number() {
    // given 0x60 = 96, which reduces to 0 (Monlandak)
    let draw = published_draw(4, H256::from_low_u64_be(0x60), 0, "Chog");

    // when
    let audit = audit_draw(&draw);

    // then
    assert!(audit.number_matches);
    assert!(!audit.animal_matches);
    assert!(!audit.verified());
}

#[test]
fn audit_draw__flags_tampered_number() {
    // given 200 = 2 * 96 + 8, published as 9
    let draw = published_draw(9, H256::from_low_u64_be(200), 9, "Chog");

    // when
    let audit = audit_draw(&draw);

    // then
    assert!(!audit.verified());
    assert!(!audit.number_matches);
    assert!(audit.animal_matches);
    assert_eq!(audit.computed_number, 8);
}
