//! Conversion of raw form input into typed storage values.
//!
//! The policy is permissive: bad input for a dynamic field degrades to "not set"
//! instead of failing the whole save. Required-ness is not enforced here.

use std::collections::BTreeMap;

use crate::types::{AbstractType, FieldDefinition, TypedValue};

/// Raw submitted values keyed by field name. Absent keys mean "not submitted".
pub type FormValues = BTreeMap<String, String>;

/// Tokens a checkbox or boolean input submits when set.
const TRUTHY_TOKENS: &[&str] = &["on", "1", "true", "True"];

/// Coerces one raw value according to its declared type.
pub fn coerce(raw: Option<&str>, field_type: AbstractType) -> TypedValue {
    let present = raw.filter(|value| !value.is_empty());

    match (field_type, present) {
        (AbstractType::Boolean, _) => {
            let set = raw.is_some_and(|value| TRUTHY_TOKENS.contains(&value));
            TypedValue::Integer(i64::from(set))
        }
        (_, None) => TypedValue::Null,
        (AbstractType::Integer, Some(raw)) => {
            raw.trim().parse::<i64>().map(TypedValue::Integer).unwrap_or(TypedValue::Null)
        }
        (AbstractType::Decimal, Some(raw)) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(TypedValue::Real)
            .unwrap_or(TypedValue::Null),
        // Format checks for dates belong to storage.
        (_, Some(raw)) => TypedValue::Text(raw.to_string()),
    }
}

/// Coerces the submitted value of every field in `fields`, in registry order.
pub fn coerce_fields<'f>(fields: &'f [FieldDefinition], form: &FormValues) -> Vec<(&'f FieldDefinition, TypedValue)> {
    fields
        .iter()
        .map(|field| {
            let raw = form.get(&field.field_name).map(String::as_str);
            (field, coerce(raw, field.field_type))
        })
        .collect()
}
