use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Environment variables passed to a workload container.
///
/// Keys are unique and kept in sorted order, so rendering the environment into a
/// container spec is deterministic.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(BTreeMap<String, String>);

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    // Return len.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Create an environment containing a single key–value pair.
    pub fn single<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new();
        env.insert(key, value);
        env
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    /// Insert or overwrite a variable.
    ///
    /// Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Merge two environments, where entries from `other` override entries of `self`.
    ///
    /// Every key of either side appears exactly once in the result.
    pub fn merged(&self, other: &Env) -> Env {
        let mut out = self.0.clone();
        out.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Env(out)
    }
}

impl<K, V> FromIterator<(K, V)> for Env
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Env(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

impl From<BTreeMap<String, String>> for Env {
    fn from(map: BTreeMap<String, String>) -> Self {
        Env(map)
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Env;

    #[test]
    fn env_new_is_empty() {
        let env = Env::new();
        assert_eq!(env.len(), 0);
        assert!(env.get("FOO").is_none());
    }

    #[test]
    fn env_single_creates_one_entry() {
        let env = Env::single("FOO", "bar");
        let items: Vec<_> = env.iter().collect();
        assert_eq!(items, vec![("FOO", "bar")]);
        assert_eq!(env.get("FOO"), Some("bar"));
    }

    #[test]
    fn env_insert_overwrites_existing_key() {
        let mut env = Env::new();
        env.insert("FOO", "one").insert("BAR", "x").insert("FOO", "two");

        assert_eq!(env.len(), 2);
        assert_eq!(env.get("FOO"), Some("two"));
        assert_eq!(env.get("BAR"), Some("x"));
    }

    #[test]
    fn env_iterates_in_key_order() {
        let env: Env = [("ZED", "1"), ("ALPHA", "2"), ("MID", "3")]
            .into_iter()
            .collect();
        let keys: Vec<_> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["ALPHA", "MID", "ZED"]);
    }

    #[test]
    fn env_merged_other_overrides_base() {
        let base: Env = [("FOO", "base"), ("BAR", "bar")].into_iter().collect();
        let other: Env = [("FOO", "override"), ("BAZ", "baz")].into_iter().collect();

        let merged = base.merged(&other);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("FOO"), Some("override"));
        assert_eq!(merged.get("BAR"), Some("bar"));
        assert_eq!(merged.get("BAZ"), Some("baz"));
    }

    #[test]
    fn merge_law_holds_for_overlapping_maps() {
        let cases: Vec<(Vec<(&str, &str)>, Vec<(&str, &str)>)> = vec![
            (vec![], vec![]),
            (vec![("A", "1")], vec![]),
            (vec![], vec![("A", "s")]),
            (vec![("A", "1"), ("B", "2")], vec![("B", "s"), ("C", "s")]),
            (vec![("A", "1"), ("B", "2")], vec![("A", "s"), ("B", "t")]),
        ];

        for (args, secrets) in cases {
            let a: Env = args.iter().copied().collect();
            let s: Env = secrets.iter().copied().collect();
            let merged = a.merged(&s);

            let mut keys: Vec<&str> = args.iter().chain(secrets.iter()).map(|(k, _)| *k).collect();
            keys.sort();
            keys.dedup();
            assert_eq!(merged.len(), keys.len());

            for key in keys {
                let expected = s.get(key).or_else(|| a.get(key));
                assert_eq!(merged.get(key), expected, "key {key}");
            }
        }
    }

    #[test]
    fn serde_is_a_plain_json_object() {
        let env: Env = [("FOO", "bar"), ("BAZ", "qux")].into_iter().collect();

        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"BAZ":"qux","FOO":"bar"}"#);

        let back: Env = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }
}
