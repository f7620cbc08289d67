//! Built-in functions available to expressions
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::value::Datum;
use std::cmp::Ordering;
use uuid::Uuid;

/// Functions of the restricted evaluator
pub const RESTRICTED_FUNCTIONS: &[&str] = &[
    "max", "min", "len", "str", "int", "float", "bool", "abs", "round", "strlen", "case", "uuid5",
];

/// Additional functions of the permissive evaluator
pub const PERMISSIVE_FUNCTIONS: &[&str] = &["sorted", "sum", "list", "any", "all", "set"];

type FnResult = Result<Datum, String>;

/// Call a named function with evaluated arguments
pub fn call_function(name: &str, args: Vec<Datum>, permissive: bool) -> FnResult {
    if !RESTRICTED_FUNCTIONS.contains(&name)
        && !(permissive && PERMISSIVE_FUNCTIONS.contains(&name))
    {
        return Err(format!("unknown function '{}'", name));
    }

    match name {
        "max" => extremum(args, Ordering::Greater),
        "min" => extremum(args, Ordering::Less),
        "len" => {
            let [arg] = exactly::<1>(name, args)?;
            length(&arg)
        }
        "case" => case(args),
        "uuid5" => {
            let [namespace, value] = exactly::<2>(name, args)?;
            uuid5(&namespace, &value)
        }
        "sorted" => {
            let [arg] = exactly::<1>(name, args)?;
            let mut items = iterate(arg)?;
            let mut failure = None;
            items.sort_by(|a, b| {
                compare(a, b).unwrap_or_else(|e| {
                    failure.get_or_insert(e);
                    Ordering::Equal
                })
            });
            match failure {
                Some(e) => Err(e),
                None => Ok(Datum::List(items)),
            }
        }
        "sum" => {
            let [arg] = exactly::<1>(name, args)?;
            let mut total = Datum::Int(0);
            for item in iterate(arg)? {
                total = add_numbers(&total, &item)?;
            }
            Ok(total)
        }
        "list" => {
            let [arg] = exactly::<1>(name, args)?;
            iterate(arg).map(Datum::List)
        }
        "set" => {
            let [arg] = exactly::<1>(name, args)?;
            let mut unique: Vec<Datum> = Vec::new();
            for item in iterate(arg)? {
                if !unique.iter().any(|u| equals(u, &item)) {
                    unique.push(item);
                }
            }
            Ok(Datum::List(unique))
        }
        "any" => {
            let [arg] = exactly::<1>(name, args)?;
            Ok(Datum::Bool(iterate(arg)?.iter().any(Datum::truthy)))
        }
        "all" => {
            let [arg] = exactly::<1>(name, args)?;
            Ok(Datum::Bool(iterate(arg)?.iter().all(Datum::truthy)))
        }
        // scalar functions distribute over a single list argument
        _ => {
            if let [Datum::List(items)] = args.as_slice() {
                return items
                    .iter()
                    .map(|item| scalar_function(name, vec![item.clone()]))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Datum::List);
            }
            scalar_function(name, args)
        }
    }
}

fn scalar_function(name: &str, args: Vec<Datum>) -> FnResult {
    match name {
        "str" => {
            let [arg] = exactly::<1>(name, args)?;
            Ok(Datum::Str(arg.to_display_string()))
        }
        "strlen" => {
            let [arg] = exactly::<1>(name, args)?;
            match arg {
                Datum::Str(s) => Ok(Datum::Int(s.chars().count() as i64)),
                other => Ok(Datum::Int(other.to_display_string().chars().count() as i64)),
            }
        }
        "int" => {
            let [arg] = exactly::<1>(name, args)?;
            to_int(&arg)
        }
        "float" => {
            let [arg] = exactly::<1>(name, args)?;
            to_float(&arg)
        }
        "bool" => {
            let [arg] = exactly::<1>(name, args)?;
            Ok(Datum::Bool(arg.truthy()))
        }
        "abs" => {
            let [arg] = exactly::<1>(name, args)?;
            match arg {
                Datum::Int(i) => Ok(Datum::Int(i.saturating_abs())),
                Datum::Float(f) => Ok(Datum::Float(f.abs())),
                Datum::Bool(b) => Ok(Datum::Int(b as i64)),
                other => Err(format!("bad operand type for abs(): '{}'", other.type_name())),
            }
        }
        "round" => round(args),
        other => Err(format!("unknown function '{}'", other)),
    }
}

fn exactly<const N: usize>(name: &str, args: Vec<Datum>) -> Result<[Datum; N], String> {
    let count = args.len();
    args.try_into()
        .map_err(|_| format!("{}() takes {} argument(s), {} given", name, N, count))
}

/// Items of an iterable value
pub fn iterate(value: Datum) -> Result<Vec<Datum>, String> {
    match value {
        Datum::List(items) => Ok(items),
        Datum::Str(s) => Ok(s.chars().map(|c| Datum::Str(c.to_string())).collect()),
        Datum::Map(map) => Ok(map.into_keys().map(Datum::Str).collect()),
        other => Err(format!("'{}' object is not iterable", other.type_name())),
    }
}

fn extremum(args: Vec<Datum>, wanted: Ordering) -> FnResult {
    let items = match args.len() {
        0 => return Err("expected at least 1 argument, got 0".to_string()),
        1 => iterate(args.into_iter().next().unwrap_or(Datum::Null))?,
        _ => args,
    };
    let mut best: Option<Datum> = None;
    for item in items.into_iter().filter(|i| !i.is_null()) {
        best = match best {
            None => Some(item),
            Some(current) => {
                if compare(&item, &current)? == wanted {
                    Some(item)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.ok_or_else(|| "arg is an empty sequence".to_string())
}

fn length(arg: &Datum) -> FnResult {
    match arg {
        Datum::Str(s) => Ok(Datum::Int(s.chars().count() as i64)),
        Datum::List(items) => Ok(Datum::Int(items.len() as i64)),
        Datum::Map(map) => Ok(Datum::Int(map.len() as i64)),
        other => Err(format!("object of type '{}' has no len()", other.type_name())),
    }
}

fn case(args: Vec<Datum>) -> FnResult {
    for arg in args {
        match arg {
            Datum::List(pair) if pair.len() == 2 => {
                if pair[0].truthy() {
                    return Ok(pair[1].clone());
                }
            }
            other => {
                return Err(format!(
                    "case() expects (condition, value) pairs, got {}",
                    other
                ))
            }
        }
    }
    Ok(Datum::Null)
}

fn uuid5(namespace: &Datum, value: &Datum) -> FnResult {
    let namespace = match namespace {
        Datum::Str(ns) => match ns.to_lowercase().as_str() {
            "dns" => Uuid::NAMESPACE_DNS,
            "url" => Uuid::NAMESPACE_URL,
            "oid" => Uuid::NAMESPACE_OID,
            "x500" => Uuid::NAMESPACE_X500,
            _ => Uuid::parse_str(ns)
                .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_URL, ns.as_bytes())),
        },
        other => return Err(format!("uuid5() namespace must be a string, got {}", other.type_name())),
    };
    if value.is_null() {
        return Ok(Datum::Null);
    }
    let name = value.to_display_string();
    Ok(Datum::Str(Uuid::new_v5(&namespace, name.as_bytes()).to_string()))
}

fn round(args: Vec<Datum>) -> FnResult {
    let mut args = args.into_iter();
    let value = args.next().ok_or("round() missing required argument")?;
    let digits = args.next();
    if args.next().is_some() {
        return Err("round() takes at most 2 arguments".to_string());
    }
    let x = value
        .as_f64()
        .ok_or_else(|| format!("type {} doesn't define round()", value.type_name()))?;
    match digits {
        None | Some(Datum::Null) => match value {
            Datum::Int(i) => Ok(Datum::Int(i)),
            _ => Ok(Datum::Int(x.round_ties_even() as i64)),
        },
        Some(Datum::Int(n)) => {
            let factor = 10f64.powi(n as i32);
            let rounded = (x * factor).round_ties_even() / factor;
            match value {
                Datum::Int(i) if n >= 0 => Ok(Datum::Int(i)),
                Datum::Int(_) => Ok(Datum::Int(rounded as i64)),
                _ => Ok(Datum::Float(rounded)),
            }
        }
        Some(other) => Err(format!("'{}' cannot be interpreted as an integer", other.type_name())),
    }
}

fn to_int(arg: &Datum) -> FnResult {
    match arg {
        Datum::Int(i) => Ok(Datum::Int(*i)),
        Datum::Bool(b) => Ok(Datum::Int(*b as i64)),
        Datum::Float(f) if f.is_finite() => Ok(Datum::Int(f.trunc() as i64)),
        Datum::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Datum::Int)
            .map_err(|_| format!("invalid literal for int(): '{}'", s)),
        other => Err(format!("int() argument must be a string or a number, not '{}'", other.type_name())),
    }
}

fn to_float(arg: &Datum) -> FnResult {
    match arg {
        Datum::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Datum::Float)
            .map_err(|_| format!("could not convert string to float: '{}'", s)),
        other => other
            .as_f64()
            .map(Datum::Float)
            .ok_or_else(|| format!("float() argument must be a string or a number, not '{}'", other.type_name())),
    }
}

/// Numeric addition with int overflow promotion
pub fn add_numbers(a: &Datum, b: &Datum) -> FnResult {
    if let (Some(x), Some(y)) = (as_int(a), as_int(b)) {
        return Ok(x
            .checked_add(y)
            .map(Datum::Int)
            .unwrap_or(Datum::Float(x as f64 + y as f64)));
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(Datum::Float(x + y)),
        _ => Err(format!(
            "unsupported operand type(s) for +: '{}' and '{}'",
            a.type_name(),
            b.type_name()
        )),
    }
}

/// Integer view of ints and bools
pub fn as_int(value: &Datum) -> Option<i64> {
    match value {
        Datum::Int(i) => Some(*i),
        Datum::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Equality with numeric cross-type comparison
pub fn equals(a: &Datum, b: &Datum) -> bool {
    match (a, b) {
        (Datum::List(x), Datum::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| equals(p, q))
        }
        (Datum::Map(x), Datum::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map(|w| equals(v, w)).unwrap_or(false))
        }
        (Datum::Str(x), Datum::Str(y)) => x == y,
        (Datum::Null, Datum::Null) => true,
        (Datum::Object(x), Datum::Object(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Ordering for `<`, `max`, `sorted`
pub fn compare(a: &Datum, b: &Datum) -> Result<Ordering, String> {
    match (a, b) {
        (Datum::Str(x), Datum::Str(y)) => Ok(x.cmp(y)),
        (Datum::List(x), Datum::List(y)) => {
            for (p, q) in x.iter().zip(y) {
                let ord = compare(p, q)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x
                .partial_cmp(&y)
                .ok_or_else(|| "cannot order NaN".to_string()),
            _ => Err(format!(
                "'<' not supported between instances of '{}' and '{}'",
                a.type_name(),
                b.type_name()
            )),
        },
    }
}

/// Call a method on a value (permissive evaluator only)
pub fn call_method(receiver: Datum, method: &str, args: Vec<Datum>) -> FnResult {
    match (&receiver, method) {
        (Datum::Str(s), "upper") => Ok(Datum::Str(s.to_uppercase())),
        (Datum::Str(s), "lower") => Ok(Datum::Str(s.to_lowercase())),
        (Datum::Str(s), "strip") => Ok(Datum::Str(s.trim().to_string())),
        (Datum::Str(s), "lstrip") => Ok(Datum::Str(s.trim_start().to_string())),
        (Datum::Str(s), "rstrip") => Ok(Datum::Str(s.trim_end().to_string())),
        (Datum::Str(s), "title") => Ok(Datum::Str(title_case(s))),
        (Datum::Str(s), "capitalize") => {
            let mut chars = s.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            };
            Ok(Datum::Str(capitalized))
        }
        (Datum::Str(s), "split") => {
            let parts: Vec<Datum> = match args.first() {
                None | Some(Datum::Null) => s.split_whitespace().map(Datum::from).collect(),
                Some(Datum::Str(sep)) if !sep.is_empty() => s.split(sep.as_str()).map(Datum::from).collect(),
                Some(other) => return Err(format!("invalid separator {}", other)),
            };
            Ok(Datum::List(parts))
        }
        (Datum::Str(s), "replace") => match args.as_slice() {
            [Datum::Str(old), Datum::Str(new)] => Ok(Datum::Str(s.replace(old.as_str(), new))),
            _ => Err("replace() expects two string arguments".to_string()),
        },
        (Datum::Str(s), "startswith") => match args.as_slice() {
            [Datum::Str(prefix)] => Ok(Datum::Bool(s.starts_with(prefix.as_str()))),
            _ => Err("startswith() expects a string".to_string()),
        },
        (Datum::Str(s), "endswith") => match args.as_slice() {
            [Datum::Str(suffix)] => Ok(Datum::Bool(s.ends_with(suffix.as_str()))),
            _ => Err("endswith() expects a string".to_string()),
        },
        (Datum::Str(sep), "join") => {
            let [items] = exactly::<1>("join", args)?;
            let parts = iterate(items)?
                .into_iter()
                .map(|item| match item {
                    Datum::Str(s) => Ok(s),
                    other => Err(format!("sequence item: expected str instance, {} found", other.type_name())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Datum::Str(parts.join(sep)))
        }
        (Datum::List(items), "count") => {
            let [needle] = exactly::<1>("count", args)?;
            Ok(Datum::Int(items.iter().filter(|i| equals(i, &needle)).count() as i64))
        }
        (Datum::List(items), "index") => {
            let [needle] = exactly::<1>("index", args)?;
            items
                .iter()
                .position(|i| equals(i, &needle))
                .map(|p| Datum::Int(p as i64))
                .ok_or_else(|| format!("{} is not in list", needle))
        }
        (Datum::Map(map), "get") => {
            let mut args = args.into_iter();
            let key = args.next().ok_or("get() expects a key")?;
            let default = args.next().unwrap_or(Datum::Null);
            Ok(map
                .get(&key.to_display_string())
                .cloned()
                .unwrap_or(default))
        }
        (Datum::Map(map), "keys") => Ok(Datum::List(map.keys().cloned().map(Datum::Str).collect())),
        (Datum::Map(map), "values") => Ok(Datum::List(map.values().cloned().collect())),
        (Datum::Map(map), "items") => Ok(Datum::List(
            map.iter()
                .map(|(k, v)| Datum::List(vec![Datum::Str(k.clone()), v.clone()]))
                .collect(),
        )),
        _ => Err(format!(
            "'{}' object has no method '{}'",
            receiver.type_name(),
            method
        )),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Datum>) -> Datum {
        call_function(name, args, false).unwrap()
    }

    #[test]
    fn test_list_functions_do_not_distribute() {
        let items = Datum::List(vec![Datum::Int(3), Datum::Int(7), Datum::Int(5)]);
        assert_eq!(call("max", vec![items.clone()]), Datum::Int(7));
        assert_eq!(call("min", vec![items.clone()]), Datum::Int(3));
        assert_eq!(call("len", vec![items]), Datum::Int(3));
        assert_eq!(call("max", vec![Datum::Int(1), Datum::Float(2.5)]), Datum::Float(2.5));
    }

    #[test]
    fn test_scalar_functions_distribute() {
        let items = Datum::List(vec![Datum::Int(1), Datum::Int(22)]);
        assert_eq!(
            call("str", vec![items.clone()]),
            Datum::List(vec!["1".into(), "22".into()])
        );
        assert_eq!(
            call("strlen", vec![Datum::List(vec!["ab".into(), "c".into()])]),
            Datum::List(vec![Datum::Int(2), Datum::Int(1)])
        );
    }

    #[test]
    fn test_round_uses_bankers_rounding() {
        assert_eq!(call("round", vec![Datum::Float(2.5)]), Datum::Int(2));
        assert_eq!(call("round", vec![Datum::Float(3.5)]), Datum::Int(4));
        assert_eq!(
            call("round", vec![Datum::Float(1.23456), Datum::Int(2)]),
            Datum::Float(1.23)
        );
    }

    #[test]
    fn test_case_picks_first_truthy() {
        let result = call(
            "case",
            vec![
                Datum::List(vec![Datum::Bool(false), "low".into()]),
                Datum::List(vec![Datum::Bool(true), "high".into()]),
            ],
        );
        assert_eq!(result, Datum::from("high"));
        assert_eq!(call("case", vec![]), Datum::Null);
    }

    #[test]
    fn test_uuid5_is_deterministic() {
        let a = call("uuid5", vec!["dns".into(), "python.org".into()]);
        let b = call("uuid5", vec!["dns".into(), "python.org".into()]);
        assert_eq!(a, b);
        assert_eq!(a, Datum::from("886313e1-3b8a-5372-9b90-0c9aee199e5d"));
    }

    #[test]
    fn test_permissive_functions_gated() {
        let items = Datum::List(vec![Datum::Int(2), Datum::Int(1)]);
        assert!(call_function("sorted", vec![items.clone()], false).is_err());
        assert_eq!(
            call_function("sorted", vec![items.clone()], true).unwrap(),
            Datum::List(vec![Datum::Int(1), Datum::Int(2)])
        );
        assert_eq!(call_function("sum", vec![items], true).unwrap(), Datum::Int(3));
        assert!(call_function("eval", vec![], true).is_err());
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(
            call_method("a|b".into(), "split", vec!["|".into()]).unwrap(),
            Datum::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            call_method(", ".into(), "join", vec![Datum::List(vec!["x".into(), "y".into()])]).unwrap(),
            Datum::from("x, y")
        );
        assert_eq!(call_method("abc".into(), "upper", vec![]).unwrap(), Datum::from("ABC"));
        assert!(call_method(Datum::Int(1), "upper", vec![]).is_err());
    }
}
