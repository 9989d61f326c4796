use serde::Serialize;
use serde_json::Value;
use serde_json::value::Index;

/// Decoded response body. Read-only; object key order is the server's.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultCollection {
    value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey<'a> {
    Index(usize),
    Name(&'a str),
}

impl ResultCollection {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Elements of an array or members of an object; scalars have none.
    pub fn len(&self) -> usize {
        match &self.value {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get<I: Index>(&self, index: I) -> Option<&Value> {
        self.value.get(index)
    }

    pub fn entries(&self) -> Entries<'_> {
        let inner = match &self.value {
            Value::Array(items) => EntriesInner::Array(items.iter().enumerate()),
            Value::Object(map) => EntriesInner::Object(map.iter()),
            _ => EntriesInner::Empty,
        };
        Entries { inner }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }
}

impl From<Value> for ResultCollection {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

pub struct Entries<'a> {
    inner: EntriesInner<'a>,
}

enum EntriesInner<'a> {
    Array(std::iter::Enumerate<std::slice::Iter<'a, Value>>),
    Object(serde_json::map::Iter<'a>),
    Empty,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (EntryKey<'a>, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EntriesInner::Array(it) => it.next().map(|(i, v)| (EntryKey::Index(i), v)),
            EntriesInner::Object(it) => it.next().map(|(k, v)| (EntryKey::Name(k.as_str()), v)),
            EntriesInner::Empty => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            EntriesInner::Array(it) => it.size_hint(),
            EntriesInner::Object(it) => it.size_hint(),
            EntriesInner::Empty => (0, Some(0)),
        }
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = (EntryKey<'a>, &'a Value);
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team() -> Value {
        json!({
            "Key": "NE",
            "City": "New England",
            "Name": "Patriots",
            "Conference": "AFC",
            "Division": "East",
            "FullName": "New England Patriots",
            "StadiumID": 17,
            "StadiumDetails": {
                "StadiumID": 17,
                "Name": "Gillette Stadium",
                "City": "Foxborough",
                "State": "MA",
                "Country": "USA",
                "Capacity": 68756,
                "PlayingSurface": "Artificial"
            }
        })
    }

    #[test]
    fn array_access_and_iteration() {
        let result = ResultCollection::new(json!([team(), team()]));
        assert_eq!(result.len(), 2);
        assert_eq!(result.get(1).and_then(|t| t.get("Key")), Some(&json!("NE")));
        assert!(result.get(2).is_none());
        assert!(result.get("Key").is_none());

        let keys: Vec<EntryKey> = result.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, [EntryKey::Index(0), EntryKey::Index(1)]);
        assert_eq!(result.entries().size_hint(), (2, Some(2)));
    }

    #[test]
    fn object_entries_keep_server_order_and_restart() {
        let result = ResultCollection::new(team());
        let names: Vec<&str> = result
            .entries()
            .map(|(k, _)| match k {
                EntryKey::Name(n) => n,
                EntryKey::Index(_) => unreachable!(),
            })
            .collect();
        assert_eq!(
            names,
            [
                "Key",
                "City",
                "Name",
                "Conference",
                "Division",
                "FullName",
                "StadiumID",
                "StadiumDetails"
            ]
        );

        let first: Vec<_> = result.entries().collect();
        let second: Vec<_> = (&result).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(result.get("StadiumDetails").map(|s| s.as_object().unwrap().len()), Some(7));
    }

    #[test]
    fn plain_structure_round_trips() {
        let raw = r#"{"z":1,"a":[{"y":true,"b":null}],"m":{"k2":"v","k1":2.5}}"#;
        let decoded: Value = serde_json::from_str(raw).unwrap();
        let result = ResultCollection::new(decoded.clone());
        assert_eq!(serde_json::to_string(&result).unwrap(), raw);
        assert_eq!(result.into_value(), decoded);
    }

    #[test]
    fn scalars_have_no_entries() {
        let result = ResultCollection::from(json!(false));
        assert_eq!(result.len(), 0);
        assert!(result.is_empty());
        assert_eq!(result.entries().count(), 0);
        assert_eq!(result.as_bool(), Some(false));
    }
}
