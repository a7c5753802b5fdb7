//! # Valores en la Frontera del Script
//! src/engine/value.rs
//!
//! Tipo de valor que cruza la frontera entre el runtime y el entorno de
//! scripts. Las primitivas `print` y `syncCallBack` aceptan un valor de
//! cualquier tipo, así que necesitan una representación dinámica.

use std::collections::HashMap;
use std::fmt;

/// Valor dinámico del entorno de scripts
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                // Enteros sin parte decimal
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, map[*key])?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_number_integer() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
    }

    #[test]
    fn test_display_number_fractional() {
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::from("hola").to_string(), "hola");
    }

    #[test]
    fn test_display_object_sorted_keys() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), Value::Number(2.0));
        map.insert("a".to_string(), Value::Number(1.0));
        assert_eq!(Value::Object(map).to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn test_display_list() {
        let list = Value::List(vec![Value::from(1i64), Value::from("x")]);
        assert_eq!(list.to_string(), "[1, x]");
    }
}
