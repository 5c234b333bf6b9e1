//! Declarative endpoint metadata - the compiler input. Descriptors are produced once per boot by
//! whatever provides controller metadata and never inspected at request time.

use crate::method::HttpMethod;
use crate::path::normalize_prefix;
use lento_di::service::ServiceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primitive handler argument types, subject to scalar coercion.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Int,
    Float,
    Bool,
    String,
}

/// Type of handler parameter, as declared by the action signature.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredType {
    /// The request sentinel.
    Request,
    /// The response sentinel.
    Response,
    Primitive(PrimitiveType),
    /// Any other type, usually a DTO name.
    Named(String),
    Untyped,
}

/// Where a parameter value comes from, if flagged. Optional names override the parameter name.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    Body,
    Query(Option<String>),
    Route(Option<String>),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParameterDescriptor {
    pub name: String,
    pub declared_type: DeclaredType,
    pub source: Option<ParameterSource>,
}

impl ParameterDescriptor {
    pub fn new<N: Into<String>>(name: N, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            source: None,
        }
    }

    pub fn request<N: Into<String>>(name: N) -> Self {
        Self::new(name, DeclaredType::Request)
    }

    pub fn response<N: Into<String>>(name: N) -> Self {
        Self::new(name, DeclaredType::Response)
    }

    pub fn primitive<N: Into<String>>(name: N, primitive: PrimitiveType) -> Self {
        Self::new(name, DeclaredType::Primitive(primitive))
    }

    pub fn named<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self::new(name, DeclaredType::Named(type_name.into()))
    }

    pub fn untyped<N: Into<String>>(name: N) -> Self {
        Self::new(name, DeclaredType::Untyped)
    }

    pub fn from_body(mut self) -> Self {
        self.source = Some(ParameterSource::Body);
        self
    }

    pub fn from_query(mut self) -> Self {
        self.source = Some(ParameterSource::Query(None));
        self
    }

    pub fn from_query_named<N: Into<String>>(mut self, name: N) -> Self {
        self.source = Some(ParameterSource::Query(Some(name.into())));
        self
    }

    pub fn from_route(mut self) -> Self {
        self.source = Some(ParameterSource::Route(None));
        self
    }

    pub fn from_route_named<N: Into<String>>(mut self, name: N) -> Self {
        self.source = Some(ParameterSource::Route(Some(name.into())));
        self
    }
}

/// Controller field populated before invocation. The declared type is resolved at injection time.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct PropertyInjection {
    pub field: String,
    pub declared_type: ServiceId,
}

impl PropertyInjection {
    pub fn new<F: Into<String>>(field: F, declared_type: ServiceId) -> Self {
        Self {
            field: field.into(),
            declared_type,
        }
    }
}

#[derive(Clone, Default, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct FormatterOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub download: bool,
    /// Options for custom formatters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Output formatter selection for a route. Kinds without a registered formatter fall back to JSON.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct FormatterSpec {
    pub kind: String,
    #[serde(default)]
    pub options: FormatterOptions,
}

impl FormatterSpec {
    pub const JSON: &'static str = "json";
    pub const FILE: &'static str = "file";
    pub const XML: &'static str = "xml";
    pub const VIEW: &'static str = "view";

    pub fn new<K: Into<String>>(kind: K) -> Self {
        Self {
            kind: kind.into(),
            options: FormatterOptions::default(),
        }
    }

    pub fn json() -> Self {
        Self::new(Self::JSON)
    }

    pub fn xml() -> Self {
        Self::new(Self::XML)
    }

    pub fn view() -> Self {
        Self::new(Self::VIEW)
    }

    pub fn file() -> Self {
        Self::new(Self::FILE)
    }

    pub fn with_mimetype<M: Into<String>>(mut self, mimetype: M) -> Self {
        self.options.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_filename<F: Into<String>>(mut self, filename: F) -> Self {
        self.options.filename = Some(filename.into());
        self
    }

    pub fn as_download(mut self) -> Self {
        self.options.download = true;
        self
    }

    pub fn with_option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.extra.insert(key.into(), value.into());
        self
    }
}

impl Default for FormatterSpec {
    fn default() -> Self {
        Self::json()
    }
}

/// Declared error an action may produce. Carried for documentation only.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct ThrowsDescriptor {
    pub error: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ThrowsDescriptor {
    pub fn new<E: Into<String>>(error: E, status: u16) -> Self {
        Self {
            error: error.into(),
            status,
            description: None,
        }
    }

    pub fn with_description<D: Into<String>>(mut self, description: D) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One controller action.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EndpointDescriptor {
    pub controller: ServiceId,
    /// Normalized controller prefix - empty or starting with a single slash.
    pub prefix: String,
    pub action: String,
    pub method: HttpMethod,
    /// Raw action path template.
    pub path: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub properties: Vec<PropertyInjection>,
    pub formatter: FormatterSpec,
    pub throws: Vec<ThrowsDescriptor>,
}

impl EndpointDescriptor {
    pub fn new<P: Into<String>, A: Into<String>>(
        controller: ServiceId,
        method: HttpMethod,
        path: P,
        action: A,
    ) -> Self {
        Self {
            controller,
            prefix: String::new(),
            action: action.into(),
            method,
            path: path.into(),
            parameters: Vec::new(),
            properties: Vec::new(),
            formatter: FormatterSpec::default(),
            throws: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn property(mut self, property: PropertyInjection) -> Self {
        self.properties.push(property);
        self
    }

    /// Adds all given properties, e.g. the ones reported by a controller's wiring.
    pub fn properties<I: IntoIterator<Item = PropertyInjection>>(mut self, properties: I) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn formatter(mut self, formatter: FormatterSpec) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn throws(mut self, throws: ThrowsDescriptor) -> Self {
        self.throws.push(throws);
        self
    }
}
