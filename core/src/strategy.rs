//! Writer and reader strategies and the ordered registry that holds them.
//!
//! # Design
//! A writer serializes an outgoing body, a reader decodes a response body.
//! Both are selected by content negotiation: the registry scans its list in
//! registration order and returns the first strategy whose `can_*` check
//! accepts the (runtime type, content type) pair. Selection has no side
//! effects, so the same registry always picks the same strategy for the same
//! input.
//!
//! Bodies and targets are type-erased. A body is any `Serialize + Debug`
//! value seen through [`Body`]; a target is described by [`TargetType`],
//! which carries a JSON decode function monomorphized for the requested type
//! so that a reader can build the value without being generic itself.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BoxError;
use crate::http::{is_json, is_text, HttpRequest};

/// Runtime identity of an outgoing body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyType {
    pub id: TypeId,
    pub name: &'static str,
}

impl BodyType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// A request body as seen by writer strategies.
///
/// Implemented for every `Serialize + Debug + Send + Sync + 'static` type.
pub trait Body: fmt::Debug + Send + Sync + 'static {
    fn body_type(&self) -> BodyType;

    fn as_any(&self) -> &dyn Any;

    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T> Body for T
where
    T: Serialize + fmt::Debug + Send + Sync + 'static,
{
    fn body_type(&self) -> BodyType {
        BodyType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Decoded value handed back from a reader; downcast by the engine.
pub type Decoded = Box<dyn Any + Send>;

/// Runtime description of the type a response body should decode into.
///
/// Only serde-decodable types can be described, since the JSON decode
/// function is captured here whichever reader ends up handling the body.
#[derive(Clone, Copy)]
pub struct TargetType {
    pub id: TypeId,
    pub name: &'static str,
    decode_json: fn(&[u8]) -> serde_json::Result<Decoded>,
}

impl TargetType {
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            decode_json: decode_json::<T>,
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Deserialize `bytes` as JSON into the described type.
    pub fn decode_json(&self, bytes: &[u8]) -> serde_json::Result<Decoded> {
        (self.decode_json)(bytes)
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetType").field(&self.name).finish()
    }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

fn decode_json<T: DeserializeOwned + Send + 'static>(bytes: &[u8]) -> serde_json::Result<Decoded> {
    serde_json::from_slice::<T>(bytes).map(|value| Box::new(value) as Decoded)
}

pub trait WriterStrategy: Send + Sync {
    /// Whether this strategy can serialize a body of `body_type` (`None` when
    /// there is no body) under the outgoing `content_type`.
    fn can_write(&self, body_type: Option<BodyType>, content_type: Option<&str>) -> bool;

    /// Attach `body` to `request`.
    fn write(&self, request: &mut HttpRequest, body: Option<&dyn Body>) -> Result<(), BoxError>;

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

#[async_trait]
pub trait ReaderStrategy: Send + Sync {
    /// Whether this strategy can produce `target` from a response with the
    /// given `content_type`.
    fn can_read(&self, target: &TargetType, content_type: Option<&str>) -> bool;

    async fn read(&self, content: Bytes, target: &TargetType) -> Result<Decoded, BoxError>;

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Ordered writer and reader lists.
#[derive(Clone, Default)]
pub struct ExchangeStrategies {
    writers: Vec<Arc<dyn WriterStrategy>>,
    readers: Vec<Arc<dyn ReaderStrategy>>,
}

impl ExchangeStrategies {
    pub fn new(writers: Vec<Arc<dyn WriterStrategy>>, readers: Vec<Arc<dyn ReaderStrategy>>) -> Self {
        Self { writers, readers }
    }

    /// Empty, text and JSON strategies, in that order.
    pub fn json_default() -> Self {
        Self::default()
            .writer(EmptyWriterStrategy)
            .writer(JsonWriterStrategy)
            .writer(TextWriterStrategy)
            .reader(EmptyReaderStrategy)
            .reader(TextReaderStrategy)
            .reader(JsonReaderStrategy)
    }

    pub fn writer(mut self, writer: impl WriterStrategy + 'static) -> Self {
        self.writers.push(Arc::new(writer));
        self
    }

    pub fn reader(mut self, reader: impl ReaderStrategy + 'static) -> Self {
        self.readers.push(Arc::new(reader));
        self
    }

    pub fn writers(&self) -> &[Arc<dyn WriterStrategy>] {
        &self.writers
    }

    pub fn readers(&self) -> &[Arc<dyn ReaderStrategy>] {
        &self.readers
    }

    pub fn find_writer(&self, body_type: Option<BodyType>, content_type: Option<&str>) -> Option<&dyn WriterStrategy> {
        self.writers
            .iter()
            .find(|writer| writer.can_write(body_type, content_type))
            .map(|writer| writer.as_ref())
    }

    pub fn find_reader(&self, target: &TargetType, content_type: Option<&str>) -> Option<&dyn ReaderStrategy> {
        self.readers
            .iter()
            .find(|reader| reader.can_read(target, content_type))
            .map(|reader| reader.as_ref())
    }
}

impl fmt::Debug for ExchangeStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeStrategies")
            .field("writers", &self.writers.iter().map(|w| w.name()).collect::<Vec<_>>())
            .field("readers", &self.readers.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Sends no body. Matches only when the body is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWriterStrategy;

impl WriterStrategy for EmptyWriterStrategy {
    fn can_write(&self, body_type: Option<BodyType>, _content_type: Option<&str>) -> bool {
        body_type.is_none()
    }

    fn write(&self, request: &mut HttpRequest, _body: Option<&dyn Body>) -> Result<(), BoxError> {
        request.body = Bytes::new();
        Ok(())
    }
}

/// Serializes any body as JSON when the content type is JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriterStrategy;

impl WriterStrategy for JsonWriterStrategy {
    fn can_write(&self, body_type: Option<BodyType>, content_type: Option<&str>) -> bool {
        body_type.is_some() && is_json(content_type)
    }

    fn write(&self, request: &mut HttpRequest, body: Option<&dyn Body>) -> Result<(), BoxError> {
        let body = body.ok_or("json writer selected without a body")?;
        request.body = Bytes::from(body.to_json()?);
        Ok(())
    }
}

/// Sends `String` and `&'static str` bodies verbatim under a `text/*`
/// content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextWriterStrategy;

impl WriterStrategy for TextWriterStrategy {
    fn can_write(&self, body_type: Option<BodyType>, content_type: Option<&str>) -> bool {
        body_type.is_some_and(|t| t.is::<String>() || t.is::<&'static str>()) && is_text(content_type)
    }

    fn write(&self, request: &mut HttpRequest, body: Option<&dyn Body>) -> Result<(), BoxError> {
        let any = body.ok_or("text writer selected without a body")?.as_any();
        let text = if let Some(text) = any.downcast_ref::<String>() {
            text.clone()
        } else if let Some(text) = any.downcast_ref::<&'static str>() {
            (*text).to_string()
        } else {
            return Err("text writer expects a String body".into());
        };
        request.body = Bytes::from(text);
        Ok(())
    }
}

/// Produces `()` for any response, ignoring its content.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyReaderStrategy;

#[async_trait]
impl ReaderStrategy for EmptyReaderStrategy {
    fn can_read(&self, target: &TargetType, _content_type: Option<&str>) -> bool {
        target.is::<()>()
    }

    async fn read(&self, _content: Bytes, _target: &TargetType) -> Result<Decoded, BoxError> {
        Ok(Box::new(()))
    }
}

/// Decodes JSON responses (`application/json`, `application/*+json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReaderStrategy;

#[async_trait]
impl ReaderStrategy for JsonReaderStrategy {
    fn can_read(&self, _target: &TargetType, content_type: Option<&str>) -> bool {
        is_json(content_type)
    }

    async fn read(&self, content: Bytes, target: &TargetType) -> Result<Decoded, BoxError> {
        Ok(target.decode_json(&content)?)
    }
}

/// Reads `text/*` responses into a `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReaderStrategy;

#[async_trait]
impl ReaderStrategy for TextReaderStrategy {
    fn can_read(&self, target: &TargetType, content_type: Option<&str>) -> bool {
        target.is::<String>() && is_text(content_type)
    }

    async fn read(&self, content: Bytes, _target: &TargetType) -> Result<Decoded, BoxError> {
        let text = String::from_utf8(content.to_vec())?;
        Ok(Box::new(text))
    }
}
