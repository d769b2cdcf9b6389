//! Pseudonym source.
//!
//! Supplies display names for freshly paired users. Pure and stateless:
//! each draw is independent, and the pool is large enough that collisions
//! between the handful of concurrently live names are tolerable.

use rand::seq::IndexedRandom;

const ADJECTIVES: &[&str] = &[
    "Amber", "Ashen", "Bold", "Brisk", "Cobalt", "Coral", "Crimson", "Dapper", "Dusky", "Eager",
    "Ember", "Fabled", "Feral", "Gilded", "Hazel", "Hidden", "Hollow", "Iron", "Ivory", "Jade",
    "Keen", "Lunar", "Mellow", "Misty", "Nimble", "Ochre", "Opal", "Pale", "Quiet", "Rustic",
    "Sable", "Scarlet", "Shrewd", "Silent", "Silver", "Sly", "Solemn", "Swift", "Tidal", "Umber",
    "Vivid", "Wry",
];

const CREATURES: &[&str] = &[
    "Badger", "Bison", "Crane", "Falcon", "Ferret", "Finch", "Fox", "Hare", "Heron", "Ibis",
    "Jackal", "Kestrel", "Lark", "Lynx", "Magpie", "Marten", "Mole", "Moth", "Newt", "Otter",
    "Owl", "Pike", "Raven", "Shrike", "Sparrow", "Stoat", "Swift", "Tern", "Vole", "Wren",
];

/// Draw a fresh pseudonym from the pool, e.g. `SilentOtter`.
pub fn random_name() -> String {
    let mut rng = rand::rng();
    // Both pools are non-empty consts; the fallbacks are unreachable.
    let adjective = ADJECTIVES.choose(&mut rng).unwrap_or(&"Quiet");
    let creature = CREATURES.choose(&mut rng).unwrap_or(&"Fox");
    format!("{adjective}{creature}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_well_formed() {
        let name = random_name();
        assert!(!name.is_empty());
        assert!(!name.contains(char::is_whitespace));
    }

    #[test]
    fn draws_vary() {
        let names: std::collections::HashSet<_> = (0..100).map(|_| random_name()).collect();
        assert!(names.len() > 1, "100 draws produced a single name");
    }
}
