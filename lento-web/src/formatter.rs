//! Output formatting of handler replies, selected by the route [FormatterSpec].
//!
//! Built-in kinds are `json` (also the fallback for unknown kinds), `file` and `xml`. Views are
//! detected structurally and always rendered via the configured [TemplateRenderer].

use crate::controller::Reply;
use crate::http::{Request, JSON_CONTENT_TYPE};
use crate::view::{TemplateRenderer, TemplateRendererPtr, View};
use axum::http::header::{InvalidHeaderValue, CONTENT_DISPOSITION};
use axum::http::{HeaderMap, HeaderValue};
use bytes::Bytes;
use fxhash::FxHashMap;
use lento_di::ErrorPtr;
use lento_router::descriptor::{FormatterOptions, FormatterSpec};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const OCTET_STREAM: &str = "application/octet-stream";
const XML_CONTENT_TYPE: &str = "application/xml";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const DEFAULT_DOWNLOAD_NAME: &str = "download.bin";
const XML_ROOT: &str = "root";
const XML_ITEM: &str = "item";

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Error reading file: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("No template renderer configured to render view: {0}")]
    MissingRenderer(String),
    #[error("Error rendering view {view}: {source}")]
    Render {
        view: String,
        #[source]
        source: ErrorPtr,
    },
}

/// Formatted response body with its content type and additional headers.
#[derive(Clone, Debug)]
pub struct Formatted {
    pub content_type: HeaderValue,
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl Formatted {
    pub fn new<B: Into<Bytes>>(content_type: HeaderValue, body: B) -> Self {
        Self {
            content_type,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }
}

/// Strategy for converting handler return values to response bodies.
pub trait Formatter {
    fn format(
        &self,
        value: Value,
        options: &FormatterOptions,
        request: &Request,
    ) -> Result<Formatted, FormatError>;
}

pub type FormatterPtr = Arc<dyn Formatter + Send + Sync>;

/// Serializes values directly.
#[derive(Clone, Copy, Default, Debug)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(
        &self,
        value: Value,
        _options: &FormatterOptions,
        _request: &Request,
    ) -> Result<Formatted, FormatError> {
        Ok(Formatted::new(
            HeaderValue::from_static(JSON_CONTENT_TYPE),
            serde_json::to_vec(&value)?,
        ))
    }
}

/// Streams files for string values naming existing files, otherwise writes the value itself.
/// Optionally marks the response as a download.
#[derive(Clone, Copy, Default, Debug)]
pub struct FileFormatter;

impl FileFormatter {
    fn download_name(value: &Value, options: &FormatterOptions) -> String {
        if let Some(filename) = &options.filename {
            return filename.clone();
        }

        match value {
            Value::String(path) => Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string()),
            _ => DEFAULT_DOWNLOAD_NAME.to_string(),
        }
    }

    fn body(value: &Value) -> Result<Vec<u8>, FormatError> {
        Ok(match value {
            Value::String(path) if Path::new(path).is_file() => fs::read(path)?,
            Value::String(text) => text.as_bytes().to_vec(),
            Value::Number(number) => number.to_string().into_bytes(),
            Value::Bool(flag) => flag.to_string().into_bytes(),
            value => serde_json::to_vec(value)?,
        })
    }
}

impl Formatter for FileFormatter {
    fn format(
        &self,
        value: Value,
        options: &FormatterOptions,
        _request: &Request,
    ) -> Result<Formatted, FormatError> {
        let content_type =
            HeaderValue::from_str(options.mimetype.as_deref().unwrap_or(OCTET_STREAM))?;
        let mut formatted = Formatted::new(content_type, Self::body(&value)?);

        if options.download {
            let filename = Self::download_name(&value, options);
            formatted.headers.insert(
                CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))?,
            );
        }

        Ok(formatted)
    }
}

/// Flattens values into a single-root XML document. Every scalar leaf becomes a child element
/// named after its nearest object key, list indices are dropped.
#[derive(Clone, Copy, Default, Debug)]
pub struct XmlFormatter;

fn element_name(key: Option<&str>) -> String {
    let Some(key) = key else {
        return XML_ITEM.to_string();
    };

    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match name.chars().next() {
        None => XML_ITEM.to_string(),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            name.insert(0, '_');
            name
        }
        Some(_) => name,
    }
}

fn collect_leaves(value: &Value, key: Option<&str>, leaves: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                collect_leaves(value, Some(key), leaves);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_leaves(item, key, leaves);
            }
        }
        Value::Null => leaves.push((element_name(key), String::new())),
        Value::Bool(flag) => leaves.push((element_name(key), flag.to_string())),
        Value::Number(number) => leaves.push((element_name(key), number.to_string())),
        Value::String(text) => leaves.push((element_name(key), text.clone())),
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), FormatError> {
    writer
        .write_event(event)
        .map_err(|error| FormatError::Xml(error.to_string()))
}

impl XmlFormatter {
    pub fn to_xml(value: &Value) -> Result<Vec<u8>, FormatError> {
        let mut leaves = Vec::new();
        collect_leaves(value, None, &mut leaves);

        let mut writer = Writer::new(Vec::new());
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write_event(&mut writer, Event::Start(BytesStart::new(XML_ROOT)))?;
        for (name, text) in &leaves {
            write_event(&mut writer, Event::Start(BytesStart::new(name.as_str())))?;
            write_event(&mut writer, Event::Text(BytesText::new(text)))?;
            write_event(&mut writer, Event::End(BytesEnd::new(name.as_str())))?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new(XML_ROOT)))?;

        Ok(writer.into_inner())
    }
}

impl Formatter for XmlFormatter {
    fn format(
        &self,
        value: Value,
        _options: &FormatterOptions,
        _request: &Request,
    ) -> Result<Formatted, FormatError> {
        Ok(Formatted::new(
            HeaderValue::from_static(XML_CONTENT_TYPE),
            Self::to_xml(&value)?,
        ))
    }
}

/// Formatters by kind.
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: FxHashMap<String, FormatterPtr>,
    renderer: Option<TemplateRendererPtr>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        let mut registry = Self {
            formatters: Default::default(),
            renderer: None,
        };

        registry.register(FormatterSpec::JSON, Arc::new(JsonFormatter));
        registry.register(FormatterSpec::FILE, Arc::new(FileFormatter));
        registry.register(FormatterSpec::XML, Arc::new(XmlFormatter));
        registry
    }
}

impl FormatterRegistry {
    /// Registers a formatter for given kind, returning the replaced one.
    pub fn register<K: Into<String>>(
        &mut self,
        kind: K,
        formatter: FormatterPtr,
    ) -> Option<FormatterPtr> {
        self.formatters.insert(kind.into(), formatter)
    }

    pub fn set_renderer(&mut self, renderer: TemplateRendererPtr) {
        self.renderer = Some(renderer);
    }

    #[inline]
    pub fn renderer(&self) -> Option<&TemplateRendererPtr> {
        self.renderer.as_ref()
    }

    pub fn format(
        &self,
        reply: Reply,
        spec: &FormatterSpec,
        request: &Request,
    ) -> Result<Formatted, FormatError> {
        match reply {
            Reply::View(view) => self.render_view(&view, request),
            Reply::Value(value) => {
                let formatter = match self.formatters.get(&spec.kind) {
                    Some(formatter) => formatter,
                    None => {
                        debug!(kind = %spec.kind, "Unknown formatter kind - using JSON.");
                        return JsonFormatter.format(value, &spec.options, request);
                    }
                };

                formatter.format(value, &spec.options, request)
            }
        }
    }

    fn render_view(&self, view: &View, request: &Request) -> Result<Formatted, FormatError> {
        let renderer: &dyn TemplateRenderer = self
            .renderer
            .as_deref()
            .ok_or_else(|| FormatError::MissingRenderer(view.name.clone()))?;

        let html = renderer
            .render(
                &view.name,
                &view.model,
                view.partial || request.accepts_partial(),
            )
            .map_err(|source| FormatError::Render {
                view: view.name.clone(),
                source,
            })?;

        Ok(Formatted::new(HeaderValue::from_static(HTML_CONTENT_TYPE), html))
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::Reply;
    use crate::formatter::{
        element_name, FormatError, Formatted, Formatter, FormatterRegistry, XmlFormatter,
    };
    use crate::http::{Request, ACCEPT_HEADER};
    use crate::view::{MockTemplateRenderer, View};
    use axum::http::header::CONTENT_DISPOSITION;
    use axum::http::HeaderValue;
    use lento_router::descriptor::{FormatterOptions, FormatterSpec};
    use lento_router::method::HttpMethod;
    use mockall::predicate::{always, eq};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn request() -> Request {
        Request::new(HttpMethod::Get, "/")
    }

    fn format(value: Value, spec: FormatterSpec) -> Formatted {
        FormatterRegistry::default()
            .format(Reply::Value(value), &spec, &request())
            .unwrap()
    }

    #[test]
    fn should_format_json_by_default() {
        let formatted = format(json!({"a": 1}), FormatterSpec::json());
        assert_eq!(formatted.content_type, "application/json");
        assert_eq!(formatted.body, r#"{"a":1}"#);
    }

    #[test]
    fn should_fall_back_to_json_for_unknown_kind() {
        let formatted = format(json!([1, 2]), FormatterSpec::new("yaml"));
        assert_eq!(formatted.content_type, "application/json");
        assert_eq!(formatted.body, "[1,2]");
    }

    #[test]
    fn should_flatten_xml() {
        let xml = XmlFormatter::to_xml(&json!({
            "user": {"name": "Ann", "tags": ["a", "b"]},
            "count": 2
        }))
        .unwrap();

        assert_eq!(
            String::from_utf8(xml).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root><count>2</count>\
             <name>Ann</name><tags>a</tags><tags>b</tags></root>"
        );
    }

    #[test]
    fn should_escape_xml_text_and_name_bare_leaves() {
        let xml = XmlFormatter::to_xml(&json!(["a<b", null])).unwrap();
        assert_eq!(
            String::from_utf8(xml).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root><item>a&lt;b</item>\
             <item></item></root>"
        );
    }

    #[test]
    fn should_sanitize_element_names() {
        assert_eq!(element_name(Some("first name")), "first_name");
        assert_eq!(element_name(Some("1st")), "_1st");
        assert_eq!(element_name(Some("")), "item");
        assert_eq!(element_name(None), "item");
    }

    #[test]
    fn should_stream_file_as_download() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("report.csv");
        std::fs::write(&path, "a,b").unwrap();

        let formatted = format(
            json!(path.to_string_lossy()),
            FormatterSpec::file().with_mimetype("text/csv").as_download(),
        );

        assert_eq!(formatted.content_type, "text/csv");
        assert_eq!(formatted.body, "a,b");
        assert_eq!(
            formatted.headers.get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"report.csv\""
        );
    }

    #[test]
    fn should_write_non_file_values() {
        let formatted = format(
            json!({"a": 1}),
            FormatterSpec::file().with_filename("data.json").as_download(),
        );

        assert_eq!(formatted.content_type, "application/octet-stream");
        assert_eq!(formatted.body, r#"{"a":1}"#);
        assert_eq!(
            formatted.headers.get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"data.json\""
        );

        let formatted = format(json!(5), FormatterSpec::file().as_download());
        assert_eq!(formatted.body, "5");
        assert_eq!(
            formatted.headers.get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"download.bin\""
        );
    }

    #[test]
    fn should_use_custom_formatter() {
        struct TextFormatter;

        impl Formatter for TextFormatter {
            fn format(
                &self,
                value: Value,
                options: &FormatterOptions,
                _request: &Request,
            ) -> Result<Formatted, FormatError> {
                let prefix = options.extra.get("prefix").cloned().unwrap_or_default();
                Ok(Formatted::new(
                    HeaderValue::from_static("text/plain"),
                    format!("{prefix}{value}"),
                ))
            }
        }

        let mut registry = FormatterRegistry::default();
        registry.register("text", Arc::new(TextFormatter));

        let formatted = registry
            .format(
                Reply::Value(json!(1)),
                &FormatterSpec::new("text").with_option("prefix", "n="),
                &request(),
            )
            .unwrap();
        assert_eq!(formatted.body, "n=1");
    }

    #[test]
    fn should_render_view_regardless_of_kind() {
        let mut renderer = MockTemplateRenderer::new();
        renderer
            .expect_render()
            .with(eq("home"), always(), eq(true))
            .times(1)
            .returning(|_, model, _| Ok(format!("<p>{}</p>", model["name"])));

        let mut registry = FormatterRegistry::default();
        registry.set_renderer(Arc::new(renderer));

        let view = View::new("home")
            .with_model(&json!({"name": "Ann"}))
            .unwrap();
        let formatted = registry
            .format(
                Reply::View(view),
                &FormatterSpec::xml(),
                &request().with_header(ACCEPT_HEADER, "partial"),
            )
            .unwrap();

        assert_eq!(formatted.content_type, "text/html; charset=utf-8");
        assert_eq!(formatted.body, "<p>\"Ann\"</p>");
    }

    #[test]
    fn should_fail_view_without_renderer() {
        assert!(matches!(
            FormatterRegistry::default()
                .format(
                    Reply::View(View::new("home")),
                    &FormatterSpec::json(),
                    &request()
                )
                .unwrap_err(),
            FormatError::MissingRenderer(_)
        ));
    }
}
