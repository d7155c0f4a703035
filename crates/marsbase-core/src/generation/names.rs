//! Colonist name generation

use crate::components::Name;
use rand::Rng;

/// Generate a random colonist name
pub fn generate_name(rng: &mut impl Rng) -> Name {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())];

    Name::new(format!("{} {}", given, family))
}

static GIVEN_NAMES: &[&str] = &[
    "Ada", "Amara", "Anton", "Beatriz", "Chidi", "Dana", "Emeka", "Esther", "Farid", "Greta",
    "Hana", "Ilya", "Imani", "Jonas", "Kaito", "Lena", "Mateo", "Mira", "Nikolai", "Noor",
    "Oskar", "Paloma", "Quinn", "Rafael", "Saoirse", "Soren", "Tamar", "Tomas", "Uma", "Valentina",
    "Wen", "Yara", "Yusuf", "Zofia",
];

static FAMILY_NAMES: &[&str] = &[
    "Abara", "Bergstrom", "Castillo", "Dubois", "Eze", "Fontaine", "Goldberg", "Haddad", "Ishikawa",
    "Jovanovic", "Kaur", "Lindqvist", "Mbeki", "Novak", "Okafor", "Pereira", "Quispe", "Rahman",
    "Sorensen", "Takahashi", "Umarov", "Varga", "Whitfield", "Xu", "Yilmaz", "Zhou",
];
