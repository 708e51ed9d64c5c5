use std::{fmt, rc::Rc};

use crate::{callable::LoxCallable, token::LiteralValue};

#[derive(Clone)]
pub enum RuntimeValue {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Rc<dyn LoxCallable>),
}

impl RuntimeValue {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, RuntimeValue::Nil | RuntimeValue::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Nil => "nil",
            RuntimeValue::Bool(_) => "boolean",
            RuntimeValue::Number(_) => "number",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Callable(_) => "function",
        }
    }
}

impl From<&LiteralValue> for RuntimeValue {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Nil => RuntimeValue::Nil,
            LiteralValue::Bool(value) => RuntimeValue::Bool(*value),
            LiteralValue::Number(value) => RuntimeValue::Number(*value),
            LiteralValue::String(value) => RuntimeValue::String(Rc::from(value.as_str())),
        }
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        RuntimeValue::String(Rc::from(value))
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        RuntimeValue::Number(value)
    }
}

impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        RuntimeValue::Bool(value)
    }
}

/// Values of different variants are never equal. Functions compare by
/// identity.
impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        use RuntimeValue::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(left), Bool(right)) => left == right,
            (Number(left), Number(right)) => left == right,
            (String(left), String(right)) => left == right,
            (Callable(left), Callable(right)) => {
                Rc::as_ptr(left) as *const () == Rc::as_ptr(right) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RuntimeValue::*;
        match self {
            Nil => write!(f, "nil"),
            Bool(value) => write!(f, "{}", value),
            Number(value) if value.is_infinite() => match value.is_sign_positive() {
                true => write!(f, "Infinity"),
                false => write!(f, "-Infinity"),
            },
            // Integral values print without a decimal point.
            Number(value) => write!(f, "{}", value),
            String(value) => write!(f, "{}", value),
            Callable(value) => write!(f, "{}", value),
        }
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::String(value) => write!(f, "{:?}", value),
            value => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::callable::BuiltinFunction;

    #[test]
    fn only_nil_and_false_are_falsy() {
        assert!(!RuntimeValue::Nil.is_truthy());
        assert!(!RuntimeValue::Bool(false).is_truthy());
        assert!(RuntimeValue::Bool(true).is_truthy());
        assert!(RuntimeValue::Number(0.0).is_truthy());
        assert!(RuntimeValue::from("").is_truthy());
    }

    #[test]
    fn equality_never_coerces() {
        assert_eq!(RuntimeValue::Nil, RuntimeValue::Nil);
        assert_ne!(RuntimeValue::Nil, RuntimeValue::Bool(false));
        assert_ne!(RuntimeValue::Number(0.0), RuntimeValue::Bool(false));
        assert_ne!(RuntimeValue::from("1"), RuntimeValue::Number(1.0));
        assert_eq!(RuntimeValue::from("ab"), RuntimeValue::from("ab"));
    }

    #[test]
    fn functions_compare_by_identity() {
        let clock: Rc<dyn LoxCallable> = Rc::new(BuiltinFunction::clock());
        let same = RuntimeValue::Callable(Rc::clone(&clock));
        let other = RuntimeValue::Callable(Rc::new(BuiltinFunction::clock()));
        assert_eq!(RuntimeValue::Callable(clock), same);
        assert_ne!(same, other);
    }

    #[test]
    fn numbers_display_like_source() {
        assert_eq!(RuntimeValue::Number(7.0).to_string(), "7");
        assert_eq!(RuntimeValue::Number(0.5).to_string(), "0.5");
        assert_eq!(RuntimeValue::Number(-3.25).to_string(), "-3.25");
        assert_eq!(RuntimeValue::Number(1.0 / 0.0).to_string(), "Infinity");
    }
}
