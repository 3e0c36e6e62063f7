//! Renders compile-time values as Rhai source literals.

use std::fmt::Write;

use rhai::{Array, Dynamic, ImmutableString, Map};

use crate::error::TemplateError;
use crate::escape::quote;

/// Rhai source that evaluates to a value equal to `value`.
///
/// Unit, booleans, integers, finite floats, characters, strings, arrays and
/// object maps are supported. Anything else has no literal form and yields
/// an evaluation error.
pub fn to_literal(value: &Dynamic) -> Result<String, TemplateError> {
    let mut out = String::new();
    write_literal(&mut out, value)?;
    Ok(out)
}

fn write_literal(out: &mut String, value: &Dynamic) -> Result<(), TemplateError> {
    // Values captured by a closure arrive shared.
    let value = &value.flatten_clone();
    if value.is_unit() {
        out.push_str("()");
    } else if let Ok(b) = value.as_bool() {
        out.push_str(if b { "true" } else { "false" });
    } else if let Ok(i) = value.as_int() {
        let _ = write!(out, "{i}");
    } else if let Ok(f) = value.as_float() {
        if !f.is_finite() {
            return Err(TemplateError::evaluation(format!(
                "{f} has no literal form"
            )));
        }
        // Debug keeps the decimal point so the literal reads back as a float,
        // except in exponent form.
        let text = format!("{f:?}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => {
                let _ = write!(out, "{mantissa}.0e{exponent}");
            }
            _ => out.push_str(&text),
        }
    } else if let Ok(c) = value.as_char() {
        match c {
            '\'' => out.push_str("'\\''"),
            '\\' => out.push_str("'\\\\'"),
            c if c.is_control() => {
                let _ = write!(out, "'\\u{:04x}'", c as u32);
            }
            c => {
                let _ = write!(out, "'{c}'");
            }
        }
    } else if let Some(s) = value.clone().try_cast::<ImmutableString>() {
        out.push_str(&quote(&s));
    } else if let Some(items) = value.clone().try_cast::<Array>() {
        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_literal(out, item)?;
        }
        out.push(']');
    } else if let Some(map) = value.clone().try_cast::<Map>() {
        out.push_str("#{");
        for (i, (key, item)) in map.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&quote(key.as_str()));
            out.push_str(": ");
            write_literal(out, item)?;
        }
        out.push('}');
    } else {
        return Err(TemplateError::evaluation(format!(
            "values of type `{}` have no literal form",
            value.type_name()
        )));
    }
    Ok(())
}
