//! Attribute resolution over opaque subjects
//!
//! Subject shapes differ between host builds, so every logical attribute is
//! described by an ordered list of candidate names. The first candidate that
//! exists *and* coerces to the requested kind wins; a candidate that exists
//! but fails coercion counts as a miss and the scan continues.
//!
//! Candidate names may be dotted paths (`healthHaver.currentHealth`). Each
//! intermediate segment must resolve to [`Value::Object`].
//!
//! [`AttributeSlot`] memoizes the candidate that succeeded last time. It is
//! tried first on the next lookup; if it misses, the full list is rescanned
//! and the slot is updated to the new winner or cleared.

use super::subject::{Subject, Value};
use crate::types::{Scalar, ScalarKind, Vec2};

/// Read a (possibly dotted) path from a subject
pub fn lookup_path(subject: &dyn Subject, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = subject.try_get(first)?;
    for segment in segments {
        let next = match &current {
            Value::Object(obj) => obj.try_get(segment)?,
            _ => return None,
        };
        current = next;
    }
    Some(current)
}

/// Coerce a raw value to a scalar kind
///
/// Returns `None` when the value cannot be represented in `kind`.
pub fn coerce(value: &Value, kind: ScalarKind) -> Option<Scalar> {
    match kind {
        ScalarKind::Int => coerce_int(value).map(Scalar::Int),
        ScalarKind::Float => coerce_float(value).map(Scalar::Float),
        ScalarKind::Str => coerce_str(value).map(Scalar::Str),
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::I32(v) => Some(i64::from(*v)),
        Value::I64(v) => Some(*v),
        Value::U32(v) => Some(i64::from(*v)),
        Value::U64(v) => i64::try_from(*v).ok(),
        Value::F32(v) => float_to_int(f64::from(*v)),
        Value::F64(v) => float_to_int(*v),
        Value::Str(s) => parse_int(s),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null | Value::Vec2(_) | Value::Object(_) | Value::List(_) => None,
    }
}

// Non-finite values count as a miss.
fn coerce_float(value: &Value) -> Option<f64> {
    let v = match value {
        Value::I32(v) => Some(f64::from(*v)),
        Value::I64(v) => Some(*v as f64),
        Value::U32(v) => Some(f64::from(*v)),
        Value::U64(v) => Some(*v as f64),
        Value::F32(v) => Some(f64::from(*v)),
        Value::F64(v) => Some(*v),
        Value::Str(s) => parse_float(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Vec2(_) | Value::Object(_) | Value::List(_) => None,
    };
    v.filter(|v| v.is_finite())
}

fn coerce_str(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::I32(v) => Some(v.to_string()),
        Value::I64(v) => Some(v.to_string()),
        Value::U32(v) => Some(v.to_string()),
        Value::U64(v) => Some(v.to_string()),
        Value::F32(v) => Some(v.to_string()),
        Value::F64(v) => Some(v.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Vec2(_) | Value::Object(_) | Value::List(_) => None,
    }
}

fn float_to_int(v: f64) -> Option<i64> {
    if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

// Integer parse first; decimal strings fall back to a float parse.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .map(|v| v as f64)
        .or_else(|| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Extract two axes from a composite value
///
/// Accepts a native [`Value::Vec2`], an object exposing `x`/`y`, or a
/// two-element list of numbers.
pub fn coerce_vec2(value: &Value) -> Option<Vec2> {
    match value {
        Value::Vec2(v) if v.x.is_finite() && v.y.is_finite() => Some(*v),
        Value::Object(obj) => {
            let x = resolve(obj.as_ref(), &["x", "X"], ScalarKind::Float)?.as_f64()?;
            let y = resolve(obj.as_ref(), &["y", "Y"], ScalarKind::Float)?.as_f64()?;
            Some(Vec2::new(x, y))
        }
        Value::List(items) if items.len() == 2 => {
            Some(Vec2::new(coerce_float(&items[0])?, coerce_float(&items[1])?))
        }
        _ => None,
    }
}

/// Scan candidates in order, returning the index and extracted value of the
/// first one that resolves
pub fn scan<T>(
    subject: &dyn Subject,
    candidates: &[&str],
    mut extract: impl FnMut(Value) -> Option<T>,
) -> Option<(usize, T)> {
    candidates.iter().enumerate().find_map(|(i, name)| {
        lookup_path(subject, name)
            .and_then(&mut extract)
            .map(|v| (i, v))
    })
}

/// Resolve the first candidate that exists and coerces to `kind`
pub fn resolve(subject: &dyn Subject, candidates: &[&str], kind: ScalarKind) -> Option<Scalar> {
    scan(subject, candidates, |v| coerce(&v, kind)).map(|(_, v)| v)
}

/// Memoized resolution for one logical attribute
#[derive(Debug, Clone, Default)]
pub struct AttributeSlot {
    cached: Option<String>,
}

impl AttributeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate name that succeeded on the most recent lookup
    pub fn cached(&self) -> Option<&str> {
        self.cached.as_deref()
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }

    /// Resolve with the cached candidate first, rescanning on a miss
    pub fn resolve_with<T>(
        &mut self,
        subject: &dyn Subject,
        candidates: &[&str],
        mut extract: impl FnMut(Value) -> Option<T>,
    ) -> Option<T> {
        if let Some(name) = self.cached.as_deref() {
            if let Some(v) = lookup_path(subject, name).and_then(&mut extract) {
                return Some(v);
            }
        }

        let failed = self.cached.take();
        for name in candidates {
            if failed.as_deref() == Some(*name) {
                continue;
            }
            if let Some(v) = lookup_path(subject, name).and_then(&mut extract) {
                self.cached = Some((*name).to_string());
                return Some(v);
            }
        }
        None
    }

    /// Resolve a scalar of the given kind
    pub fn resolve(
        &mut self,
        subject: &dyn Subject,
        candidates: &[&str],
        kind: ScalarKind,
    ) -> Option<Scalar> {
        self.resolve_with(subject, candidates, |v| coerce(&v, kind))
    }

    pub fn resolve_f64(&mut self, subject: &dyn Subject, candidates: &[&str]) -> Option<f64> {
        self.resolve_with(subject, candidates, |v| coerce_float(&v))
    }

    pub fn resolve_i64(&mut self, subject: &dyn Subject, candidates: &[&str]) -> Option<i64> {
        self.resolve_with(subject, candidates, |v| coerce_int(&v))
    }

    pub fn resolve_string(&mut self, subject: &dyn Subject, candidates: &[&str]) -> Option<String> {
        self.resolve_with(subject, candidates, |v| coerce_str(&v))
    }

    /// Resolve a truthy value (any integer-coercible value, non-zero is true)
    pub fn resolve_bool(&mut self, subject: &dyn Subject, candidates: &[&str]) -> Option<bool> {
        self.resolve_i64(subject, candidates).map(|v| v != 0)
    }

    /// Resolve a single composite attribute and extract both axes from it
    pub fn resolve_vec2(&mut self, subject: &dyn Subject, candidates: &[&str]) -> Option<Vec2> {
        self.resolve_with(subject, candidates, |v| coerce_vec2(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::subject::MapSubject;

    #[test]
    fn test_first_candidate_in_list_order_wins() {
        let s = MapSubject::new().with_property("B", 2).with_property("C", 3);
        let v = resolve(&s, &["A", "B", "C"], ScalarKind::Int);
        assert_eq!(v, Some(Scalar::Int(2)));
    }

    #[test]
    fn test_property_probed_before_field() {
        let s = MapSubject::new()
            .with_field("hp", 1.0)
            .with_property("hp", 9.0);
        assert_eq!(resolve(&s, &["hp"], ScalarKind::Float), Some(Scalar::Float(9.0)));
    }

    #[test]
    fn test_coercion_failure_continues_scan() {
        let s = MapSubject::new()
            .with_property("A", "not a number")
            .with_property("B", 7u32);
        assert_eq!(resolve(&s, &["A", "B"], ScalarKind::Int), Some(Scalar::Int(7)));
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(coerce(&Value::from(" 42 "), ScalarKind::Int), Some(Scalar::Int(42)));
        assert_eq!(coerce(&Value::from("3.75"), ScalarKind::Int), Some(Scalar::Int(3)));
        assert_eq!(coerce(&Value::from("3.75"), ScalarKind::Float), Some(Scalar::Float(3.75)));
        assert_eq!(coerce(&Value::from("abc"), ScalarKind::Float), None);
    }

    #[test]
    fn test_width_conversions() {
        assert_eq!(coerce(&Value::F32(2.5), ScalarKind::Float), Some(Scalar::Float(2.5)));
        assert_eq!(coerce(&Value::U64(u64::MAX), ScalarKind::Int), None);
        assert_eq!(coerce(&Value::F64(f64::NAN), ScalarKind::Int), None);
        assert_eq!(coerce(&Value::Bool(true), ScalarKind::Int), Some(Scalar::Int(1)));
        assert_eq!(coerce(&Value::I32(-4), ScalarKind::Str), Some(Scalar::Str("-4".into())));
        assert_eq!(coerce(&Value::Null, ScalarKind::Str), None);
    }

    #[test]
    fn test_non_finite_floats_are_misses() {
        assert_eq!(coerce(&Value::F64(f64::NAN), ScalarKind::Float), None);
        assert_eq!(coerce(&Value::F32(f32::INFINITY), ScalarKind::Float), None);
        assert_eq!(coerce(&Value::from("NaN"), ScalarKind::Float), None);
        assert_eq!(coerce(&Value::from("-inf"), ScalarKind::Float), None);
        assert_eq!(coerce_vec2(&Value::Vec2(Vec2::new(f64::NAN, 1.0))), None);

        let s = MapSubject::new()
            .with_property("Health", f64::NAN)
            .with_field("health", 2.0);
        assert_eq!(
            resolve(&s, &["Health", "health"], ScalarKind::Float),
            Some(Scalar::Float(2.0))
        );
    }

    #[test]
    fn test_dotted_path() {
        let hh = MapSubject::new().with_field("currentHealth", 3.5);
        let player = MapSubject::new().with_property("healthHaver", hh);
        assert_eq!(
            resolve(&player, &["healthHaver.currentHealth"], ScalarKind::Float),
            Some(Scalar::Float(3.5))
        );
        assert_eq!(resolve(&player, &["healthHaver.missing"], ScalarKind::Float), None);
        // non-object intermediate
        let flat = MapSubject::new().with_property("healthHaver", 1);
        assert!(lookup_path(&flat, "healthHaver.currentHealth").is_none());
    }

    #[test]
    fn test_vec2_shapes() {
        let obj = MapSubject::new().with_property("x", 1.0).with_field("y", 2);
        assert_eq!(coerce_vec2(&Value::from(obj)), Some(Vec2::new(1.0, 2.0)));
        let list = Value::List(vec![Value::I32(3), Value::from("4.5")]);
        assert_eq!(coerce_vec2(&list), Some(Vec2::new(3.0, 4.5)));
        assert_eq!(coerce_vec2(&Value::F64(1.0)), None);
    }

    #[test]
    fn test_slot_caches_winner() {
        let s = MapSubject::new().with_property("C", 10);
        let mut slot = AttributeSlot::new();
        assert_eq!(slot.resolve_i64(&s, &["A", "B", "C"]), Some(10));
        assert_eq!(slot.cached(), Some("C"));
    }

    #[test]
    fn test_slot_rescans_when_cached_candidate_fails() {
        let mut s = MapSubject::new().with_property("C", 10);
        let mut slot = AttributeSlot::new();
        slot.resolve_i64(&s, &["A", "B", "C"]);

        s.remove("C");
        s.set_property("A", 1);
        assert_eq!(slot.resolve_i64(&s, &["A", "B", "C"]), Some(1));
        assert_eq!(slot.cached(), Some("A"));
    }

    #[test]
    fn test_slot_clears_when_nothing_resolves() {
        let mut s = MapSubject::new().with_property("B", 10);
        let mut slot = AttributeSlot::new();
        slot.resolve_i64(&s, &["A", "B"]);
        s.remove("B");
        assert_eq!(slot.resolve_i64(&s, &["A", "B"]), None);
        assert_eq!(slot.cached(), None);

        // recovers once a candidate reappears
        s.set_property("A", 5);
        assert_eq!(slot.resolve_i64(&s, &["A", "B"]), Some(5));
    }

    #[test]
    fn test_slot_short_circuits_on_cached_hit() {
        let mut s = MapSubject::new().with_property("B", 2);
        let mut slot = AttributeSlot::new();
        slot.resolve_i64(&s, &["A", "B"]);
        s.set_property("A", 1);
        // cached B still resolves, so the earlier A is not consulted
        assert_eq!(slot.resolve_i64(&s, &["A", "B"]), Some(2));
    }
}
