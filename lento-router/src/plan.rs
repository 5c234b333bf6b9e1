//! Compiled, immutable route plans.

use crate::descriptor::{
    DeclaredType, FormatterSpec, ParameterDescriptor, ParameterSource, PrimitiveType,
    PropertyInjection, ThrowsDescriptor,
};
use crate::method::HttpMethod;
use crate::path::RoutePattern;
use lento_di::service::ServiceId;
use serde::{Deserialize, Serialize};

/// How a single handler argument gets its value at request time.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "bind", rename_all = "snake_case")]
pub enum ParameterBinding {
    Request,
    Response,
    RouteParam { name: String },
    QueryParam { name: String },
    Body { dto: String, validate: bool },
    Scalar { name: String, primitive: PrimitiveType },
    Unbound,
}

impl ParameterBinding {
    /// Derives the binding purely from declared metadata.
    pub fn derive(parameter: &ParameterDescriptor) -> Self {
        match (&parameter.declared_type, &parameter.source) {
            (DeclaredType::Request, _) => ParameterBinding::Request,
            (DeclaredType::Response, _) => ParameterBinding::Response,
            (DeclaredType::Named(dto), Some(ParameterSource::Body)) => ParameterBinding::Body {
                dto: dto.clone(),
                validate: true,
            },
            (_, Some(ParameterSource::Query(name))) => ParameterBinding::QueryParam {
                name: name.clone().unwrap_or_else(|| parameter.name.clone()),
            },
            (_, Some(ParameterSource::Route(name))) => ParameterBinding::RouteParam {
                name: name.clone().unwrap_or_else(|| parameter.name.clone()),
            },
            (DeclaredType::Primitive(primitive), _) => ParameterBinding::Scalar {
                name: parameter.name.clone(),
                primitive: *primitive,
            },
            _ => ParameterBinding::Unbound,
        }
    }
}

/// Static plans are keyed by their exact path, dynamic ones carry a compiled pattern.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Exact,
    Pattern(RoutePattern),
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct RoutePlan {
    pub method: HttpMethod,
    /// Normalized effective path (prefix + template).
    pub path: String,
    pub matcher: Matcher,
    pub controller: ServiceId,
    pub action: String,
    pub arguments: Vec<ParameterBinding>,
    pub properties: Vec<PropertyInjection>,
    pub formatter: FormatterSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub throws: Vec<ThrowsDescriptor>,
}

impl RoutePlan {
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        matches!(self.matcher, Matcher::Pattern(_))
    }
}
