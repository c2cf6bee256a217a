use serde::{Deserialize, Serialize};

/// Ordering principle used to lift element and rule preferences to
/// argument preferences (Prakken 2010).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ordering {
    #[default]
    WeakestLink,
    LastLink,
}

/// Elitist set comparison: `set1` counts as less preferred than `set2`
/// when some preference pair `(x, y)` has `x` in `set1` and `y` in
/// `set2`. An empty `set1` never loses out; an empty `set2` or an empty
/// preference relation always does.
pub fn check_preference(
    set1: &[String],
    set2: &[String],
    preferences: &[(String, String)],
) -> bool {
    if set1.is_empty() {
        return false;
    }
    if set2.is_empty() {
        return true;
    }
    if preferences.is_empty() {
        return true;
    }
    set1.iter().any(|x| {
        set2.iter()
            .any(|y| preferences.iter().any(|(px, py)| px == x && py == y))
    })
}
