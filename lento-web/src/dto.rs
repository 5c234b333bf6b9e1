//! Request body value objects and their construction by declared type name.

use fxhash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt::Debug;

/// Declarative field constraint, checked by the
/// [ConstraintValidator](crate::validation::ConstraintValidator).
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Constraint {
    NotBlank,
    Email,
    Length { min: usize, max: usize },
    Regex(String),
}

impl Constraint {
    pub fn min_length(min: usize) -> Self {
        Constraint::Length {
            min,
            max: usize::MAX,
        }
    }

    pub fn max_length(max: usize) -> Self {
        Constraint::Length { min: 0, max }
    }
}

/// Constraints of a single field, along with its current value.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FieldConstraints {
    pub field: &'static str,
    /// Textual value, or [None] for absent values.
    pub value: Option<String>,
    pub constraints: Vec<Constraint>,
}

/// Field types which can be checked against constraints.
pub trait ConstraintValue {
    fn constraint_value(&self) -> Option<String>;
}

impl ConstraintValue for String {
    fn constraint_value(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl ConstraintValue for &str {
    fn constraint_value(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: ConstraintValue> ConstraintValue for Option<T> {
    fn constraint_value(&self) -> Option<String> {
        self.as_ref().and_then(ConstraintValue::constraint_value)
    }
}

macro_rules! display_constraint_value {
    ($($ty:ty),*) => {
        $(
            impl ConstraintValue for $ty {
                fn constraint_value(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

display_constraint_value!(i32, i64, u32, u64, f32, f64, bool);

/// Helper for accessing concrete DTO types.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Value object constructed from a request body. Use `#[derive(Dto)]` to declare constraints
/// with `#[validate(...)]` field attributes.
pub trait Dto: AsAny + Debug + Send + Sync {
    /// Declared field constraints. Fields without constraints can be omitted.
    fn constraints(&self) -> Vec<FieldConstraints> {
        Vec::new()
    }
}

impl dyn Dto {
    pub fn downcast_ref<T: Dto + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast<T: Dto + 'static>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast().ok().map(|dto| *dto)
    }
}

type DecodeFn = fn(&Value) -> Result<Box<dyn Dto>, serde_json::Error>;

fn decode<T: Dto + DeserializeOwned + 'static>(
    body: &Value,
) -> Result<Box<dyn Dto>, serde_json::Error> {
    T::deserialize(body).map(|dto| Box::new(dto) as Box<dyn Dto>)
}

/// Registry of DTO types which can be bound from request bodies, keyed by declared type name.
#[derive(Clone, Default)]
pub struct DtoRegistry {
    decoders: FxHashMap<String, DecodeFn>,
}

impl DtoRegistry {
    /// Registers a DTO under its type name, as returned by [std::any::type_name].
    pub fn register<T: Dto + DeserializeOwned + 'static>(&mut self) -> &mut Self {
        self.register_as::<T>(std::any::type_name::<T>())
    }

    /// Registers a DTO under a custom name.
    pub fn register_as<T: Dto + DeserializeOwned + 'static>(
        &mut self,
        name: impl Into<String>,
    ) -> &mut Self {
        self.decoders.insert(name.into(), decode::<T>);
        self
    }

    #[inline]
    pub fn is_registered(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Builds a DTO from a body. Returns [None] for unknown names.
    pub fn decode(
        &self,
        name: &str,
        body: &Value,
    ) -> Option<Result<Box<dyn Dto>, serde_json::Error>> {
        self.decoders.get(name).map(|decode| decode(body))
    }
}

#[cfg(test)]
mod tests {
    use crate::dto::{ConstraintValue, Dto, DtoRegistry};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct CreateUser {
        name: String,
    }

    impl Dto for CreateUser {}

    #[test]
    fn should_decode_registered_dto() {
        let mut registry = DtoRegistry::default();
        registry.register::<CreateUser>();

        let dto = registry
            .decode(std::any::type_name::<CreateUser>(), &json!({"name": "Ann"}))
            .unwrap()
            .unwrap();
        assert_eq!(dto.downcast_ref::<CreateUser>().unwrap().name, "Ann");
        assert_eq!(dto.downcast::<CreateUser>().unwrap().name, "Ann");
    }

    #[test]
    fn should_report_decode_errors() {
        let mut registry = DtoRegistry::default();
        registry.register_as::<CreateUser>("user");

        assert!(registry.decode("user", &json!({"name": 5})).unwrap().is_err());
        assert!(registry.decode("missing", &json!({})).is_none());
    }

    #[test]
    fn should_convert_constraint_values() {
        assert_eq!(Some("a".to_string()).constraint_value(), Some("a".to_string()));
        assert_eq!(None::<String>.constraint_value(), None);
        assert_eq!(5_u32.constraint_value(), Some("5".to_string()));
    }
}
