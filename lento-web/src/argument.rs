//! Bound handler arguments.

use crate::dto::Dto;
use crate::http::{Request, ResponseHandle};
use lento_router::descriptor::PrimitiveType;

/// Coerced primitive value.
#[derive(Clone, PartialEq, Debug)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl Scalar {
    /// Coerces a raw value to given type. Missing or unparsable values become the zero value of
    /// the type. Booleans are true only for `1`, `true`, `yes` and `on`, ignoring case.
    pub fn coerce(value: Option<&str>, primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Int => Scalar::Int(
                value
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or_default(),
            ),
            PrimitiveType::Float => Scalar::Float(
                value
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or_default(),
            ),
            PrimitiveType::Bool => Scalar::Bool(
                value
                    .map(|value| {
                        matches!(
                            value.trim().to_ascii_lowercase().as_str(),
                            "1" | "true" | "yes" | "on"
                        )
                    })
                    .unwrap_or_default(),
            ),
            PrimitiveType::String => Scalar::String(value.unwrap_or_default().to_string()),
        }
    }
}

#[derive(Debug)]
pub enum Argument {
    Request(Request),
    Response(ResponseHandle),
    /// Route or query parameter.
    Text(Option<String>),
    Scalar(Scalar),
    Body(Box<dyn Dto>),
    Null,
}

/// Handler arguments, in parameter declaration order.
#[derive(Debug, Default)]
pub struct Arguments {
    arguments: Vec<Argument>,
}

impl Arguments {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self { arguments }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }

    pub fn request(&self, index: usize) -> Option<&Request> {
        match self.get(index)? {
            Argument::Request(request) => Some(request),
            _ => None,
        }
    }

    pub fn response(&self, index: usize) -> Option<&ResponseHandle> {
        match self.get(index)? {
            Argument::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Returns the textual value of a route/query parameter or a string scalar.
    pub fn text(&self, index: usize) -> Option<&str> {
        match self.get(index)? {
            Argument::Text(text) => text.as_deref(),
            Argument::Scalar(Scalar::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        match self.get(index)? {
            Argument::Scalar(Scalar::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn float(&self, index: usize) -> Option<f64> {
        match self.get(index)? {
            Argument::Scalar(Scalar::Float(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bool(&self, index: usize) -> Option<bool> {
        match self.get(index)? {
            Argument::Scalar(Scalar::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn body<T: Dto + 'static>(&self, index: usize) -> Option<&T> {
        match self.get(index)? {
            Argument::Body(dto) => dto.downcast_ref(),
            _ => None,
        }
    }

    /// Takes ownership of a body argument, leaving [Argument::Null] in its place.
    pub fn take_body<T: Dto + 'static>(&mut self, index: usize) -> Option<T> {
        let argument = self.arguments.get_mut(index)?;
        if !matches!(argument, Argument::Body(dto) if dto.downcast_ref::<T>().is_some()) {
            return None;
        }

        match std::mem::replace(argument, Argument::Null) {
            Argument::Body(dto) => dto.downcast(),
            _ => None,
        }
    }

    pub fn is_null(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Argument::Null) | Some(Argument::Text(None)))
    }
}

impl IntoIterator for Arguments {
    type Item = Argument;
    type IntoIter = std::vec::IntoIter<Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.arguments.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::argument::{Argument, Arguments, Scalar};
    use crate::dto::Dto;
    use lento_router::descriptor::PrimitiveType;

    #[test]
    fn should_coerce_numbers() {
        assert_eq!(Scalar::coerce(Some("42"), PrimitiveType::Int), Scalar::Int(42));
        assert_eq!(Scalar::coerce(Some(" 7 "), PrimitiveType::Int), Scalar::Int(7));
        assert_eq!(Scalar::coerce(Some("abc"), PrimitiveType::Int), Scalar::Int(0));
        assert_eq!(Scalar::coerce(None, PrimitiveType::Int), Scalar::Int(0));
        assert_eq!(
            Scalar::coerce(Some("1.5"), PrimitiveType::Float),
            Scalar::Float(1.5)
        );
        assert_eq!(
            Scalar::coerce(Some("x"), PrimitiveType::Float),
            Scalar::Float(0.0)
        );
    }

    #[test]
    fn should_coerce_booleans() {
        for value in ["1", "true", "YES", "On"] {
            assert_eq!(
                Scalar::coerce(Some(value), PrimitiveType::Bool),
                Scalar::Bool(true)
            );
        }

        for value in ["0", "false", "no", "maybe", ""] {
            assert_eq!(
                Scalar::coerce(Some(value), PrimitiveType::Bool),
                Scalar::Bool(false)
            );
        }
    }

    #[test]
    fn should_coerce_strings() {
        assert_eq!(
            Scalar::coerce(Some("abc"), PrimitiveType::String),
            Scalar::String("abc".to_string())
        );
        assert_eq!(
            Scalar::coerce(None, PrimitiveType::String),
            Scalar::String(String::new())
        );
    }

    #[derive(Debug, PartialEq)]
    struct Payload(u8);

    impl Dto for Payload {}

    #[test]
    fn should_access_arguments_by_type() {
        let mut arguments = Arguments::new(vec![
            Argument::Scalar(Scalar::Int(3)),
            Argument::Text(Some("x".to_string())),
            Argument::Body(Box::new(Payload(1))),
            Argument::Null,
        ]);

        assert_eq!(arguments.int(0), Some(3));
        assert_eq!(arguments.text(0), None);
        assert_eq!(arguments.text(1), Some("x"));
        assert_eq!(arguments.body::<Payload>(2), Some(&Payload(1)));
        assert!(arguments.is_null(3));

        assert_eq!(arguments.take_body::<Payload>(2), Some(Payload(1)));
        assert!(arguments.is_null(2));
    }
}
