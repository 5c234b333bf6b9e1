//! Server-rendered views. Only the rendering contract lives here - template engines are plugged in
//! via [TemplateRenderer].

use lento_di::ErrorPtr;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// View result returned by handlers.
#[derive(Clone, PartialEq, Debug)]
pub struct View {
    pub name: String,
    pub model: Value,
    /// Render without the surrounding layout.
    pub partial: bool,
}

impl View {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            model: Value::Null,
            partial: false,
        }
    }

    pub fn with_model<M: Serialize>(mut self, model: &M) -> Result<Self, serde_json::Error> {
        self.model = serde_json::to_value(model)?;
        Ok(self)
    }

    pub fn as_partial(mut self) -> Self {
        self.partial = true;
        self
    }
}

#[cfg_attr(test, automock)]
pub trait TemplateRenderer {
    fn render(&self, view: &str, model: &Value, partial: bool) -> Result<String, ErrorPtr>;
}

pub type TemplateRendererPtr = Arc<dyn TemplateRenderer + Send + Sync>;
