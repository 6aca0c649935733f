use serde::{Deserialize, Serialize};

/// Rule for deciding whether an available file matches a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatching {
    /// `0001_Users.sql` and `0001_users.sql` are the same migration.
    #[default]
    CaseInsensitive,
    /// Names must match byte for byte.
    CaseSensitive,
}

impl NameMatching {
    fn matches(self, a: &str, b: &str) -> bool {
        match self {
            NameMatching::CaseInsensitive => a.to_lowercase() == b.to_lowercase(),
            NameMatching::CaseSensitive => a == b,
        }
    }
}

/// Returns the migrations in `available` that are missing from `applied`, in
/// execution order.
///
/// Exclusion follows `matching`. Ordering is always plain lexicographic
/// string order, so the result does not depend on the order of either input.
pub fn pending<A, B>(available: &[A], applied: &[B], matching: NameMatching) -> Vec<String>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut pending: Vec<String> = available
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !applied.iter().any(|a| matching.matches(name, a.as_ref())))
        .map(str::to_string)
        .collect();

    pending.sort();
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_excludes_applied() {
        let available = ["b.sql", "a.sql", "c.sql"];
        let applied = ["a.sql"];

        let result = pending(&available, &applied, NameMatching::default());
        assert_eq!(result, vec!["b.sql", "c.sql"]);
    }

    #[test]
    fn test_pending_order_independent_of_input_order() {
        let forward = ["2019_01_01_000000_a.sql", "2019_01_02_000000_b.sql", "2020_01_01_000000_c.sql"];
        let shuffled = [forward[2], forward[0], forward[1]];

        let empty: [&str; 0] = [];
        assert_eq!(
            pending(&forward, &empty, NameMatching::default()),
            pending(&shuffled, &empty, NameMatching::default())
        );
        assert_eq!(
            pending(&shuffled, &empty, NameMatching::default()),
            forward.to_vec()
        );
    }

    #[test]
    fn test_pending_sort_is_case_sensitive() {
        let available = ["b.sql", "B.sql", "a.sql", "A.sql"];
        let applied: Vec<String> = Vec::new();

        let result = pending(&available, &applied, NameMatching::CaseSensitive);
        assert_eq!(result, vec!["A.sql", "B.sql", "a.sql", "b.sql"]);
    }

    #[test]
    fn test_case_insensitive_exclusion() {
        let available = ["0001_Users.sql", "0002_posts.sql"];
        let applied = ["0001_users.sql"];

        let result = pending(&available, &applied, NameMatching::CaseInsensitive);
        assert_eq!(result, vec!["0002_posts.sql"]);
    }

    #[test]
    fn test_case_sensitive_exclusion() {
        let available = ["0001_Users.sql", "0002_posts.sql"];
        let applied = ["0001_users.sql"];

        let result = pending(&available, &applied, NameMatching::CaseSensitive);
        assert_eq!(result, vec!["0001_Users.sql", "0002_posts.sql"]);
    }

    #[test]
    fn test_nothing_pending() {
        let available = ["a.sql"];
        let applied = ["z.sql", "a.sql"];
        assert!(pending(&available, &applied, NameMatching::default()).is_empty());

        let none: [&str; 0] = [];
        assert!(pending(&none, &applied, NameMatching::default()).is_empty());
    }

    #[test]
    fn test_parse_matching() {
        #[derive(Deserialize)]
        struct Wrapper {
            matching: NameMatching,
        }
        let w: Wrapper = toml::from_str(r#"matching = "case_sensitive""#).unwrap();
        assert_eq!(w.matching, NameMatching::CaseSensitive);
    }
}
