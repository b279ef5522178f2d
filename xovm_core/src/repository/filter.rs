use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Equality predicates over remote field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_owned(), value.to_owned());
        self
    }
    pub fn id(self, id: &str) -> Self {
        self.field("id", id)
    }
    pub fn name(self, name: &str) -> Self {
        self.field("name_label", name)
    }
    pub fn pool(self, pool_id: &str) -> Self {
        self.field("$pool", pool_id)
    }
    pub fn sr(self, sr_id: &str) -> Self {
        self.field("$SR", sr_id)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
    /*
     * Whether a serialized snapshot satisfies every predicate.
     * Scalars are compared through their string form.
     */
    pub fn matches(&self, object: &Value) -> bool {
        self.0.iter().all(|(key, expected)| match object.get(key) {
            Some(Value::String(v)) => v == expected,
            Some(Value::Bool(v)) => &v.to_string() == expected,
            Some(Value::Number(v)) => &v.to_string() == expected,
            _ => false,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_on_every_field() {
        let object = json!({ "id": "sr-1", "name_label": "local", "$pool": "pool-a", "shared": false });
        assert!(Filter::new().id("sr-1").matches(&object));
        assert!(Filter::new().name("local").pool("pool-a").matches(&object));
        assert!(Filter::new().field("shared", "false").matches(&object));
        assert!(!Filter::new().name("local").pool("pool-b").matches(&object));
        assert!(!Filter::new().sr("sr-1").matches(&object));
    }

    #[test]
    fn display_filter() {
        let filter = Filter::new().name("local").pool("pool-a");
        assert_eq!(filter.to_string(), "{$pool=pool-a, name_label=local}");
    }
}
