use rendezvous_core::{SERVER_TIMESTAMP_KEY, StorePath};
use serde_json::{Map, Value};

pub(crate) fn lookup<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    (!node.is_null()).then_some(node)
}

/// Write `value` at `path`, creating intermediate objects. `None` removes the key and prunes
/// parents left empty.
pub(crate) fn write(root: &mut Value, path: &StorePath, value: Option<Value>) {
    let segments: Vec<&str> = path.segments().collect();
    if segments.is_empty() {
        *root = match value {
            Some(v @ Value::Object(_)) => v,
            _ => Value::Object(Map::new()),
        };
        return;
    }
    write_at(root, &segments, value);
}

fn write_at(node: &mut Value, segments: &[&str], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    if rest.is_empty() {
        match value {
            Some(v) => {
                map.insert((*head).to_owned(), v);
            }
            None => {
                map.remove(*head);
            }
        }
        return;
    }

    match value {
        Some(_) => {
            let child = map
                .entry((*head).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            write_at(child, rest, value);
        }
        None => {
            let Some(child) = map.get_mut(*head) else {
                return;
            };
            write_at(child, rest, None);
            if child.as_object().is_some_and(Map::is_empty) {
                map.remove(*head);
            }
        }
    }
}

/// Resolve server timestamps and strip nulls. An object left with no children collapses to
/// `None`, same as writing null.
pub(crate) fn normalize(value: Value, now_ms: u64) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) if is_timestamp_sentinel(&map) => Some(Value::from(now_ms)),
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v, now_ms).map(|v| (k, v)))
                .collect();
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        other => Some(other),
    }
}

fn is_timestamp_sentinel(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.get(SERVER_TIMESTAMP_KEY).and_then(Value::as_str) == Some("timestamp")
}

/// True when a write at one path can change what is visible at the other.
pub(crate) fn overlaps(a: &StorePath, b: &StorePath) -> bool {
    a.segments().zip(b.segments()).all(|(x, y)| x == y)
}
