use std::ops::RangeInclusive;

/// Numbers drawn per session; the winning number is `random mod SESSION_SIZE`.
pub const SESSION_SIZE: u8 = 96;
pub const NUMBERS_PER_ANIMAL: u8 = 6;

pub const ANIMALS: [&str; 16] = [
    "Monlandak",
    "Chog",
    "Moyaki",
    "Mouch",
    "Salmonad",
    "Moncock",
    "Snelly",
    "Salandak",
    "Honk",
    "Mokadel",
    "Lyraffe",
    "Spidermon",
    "Montiger",
    "Moxy",
    "Birbie",
    "MonCoringa",
];

pub fn animal_for(number: u8) -> Option<&'static str> {
    if number >= SESSION_SIZE {
        return None;
    }
    ANIMALS.get((number / NUMBERS_PER_ANIMAL) as usize).copied()
}

pub fn animal_index(name: &str) -> Option<usize> {
    ANIMALS.iter().position(|animal| *animal == name)
}

pub fn numbers_for(index: usize) -> Option<RangeInclusive<u8>> {
    if index >= ANIMALS.len() {
        return None;
    }
    let start = index as u8 * NUMBERS_PER_ANIMAL;
    Some(start..=start + NUMBERS_PER_ANIMAL - 1)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn animal_for__maps_each_block_of_six() {
        assert_eq!(animal_for(0), Some("Monlandak"));
        assert_eq!(animal_for(5), Some("Monlandak"));
        assert_eq!(animal_for(6), Some("Chog"));
        assert_eq!(animal_for(95), Some("MonCoringa"));
        assert_eq!(animal_for(96), None);
    }

    #[test]
    fn numbers_for__is_inverse_of_animal_for() {
        for (index, name) in ANIMALS.iter().enumerate() {
            let range = numbers_for(index).unwrap();
            assert_eq!(range.clone().count(), NUMBERS_PER_ANIMAL as usize);
            assert!(range.into_iter().all(|n| animal_for(n) == Some(*name)));
            assert_eq!(animal_index(name), Some(index));
        }
        assert_eq!(numbers_for(16), None);
    }
}
