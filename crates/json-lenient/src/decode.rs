//! Decode adapter: the entry point that wraps a destination value.
//!
//! Without a leniency option, input decodes straight into the destination.
//! Otherwise the destination is copied into a proxy value whose identifier
//! leaves are text, the input decodes into the proxy, and the proxy is copied
//! back, converting identifier text under the policy. Either way the caller's
//! value is only replaced once the whole decode succeeded.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, DeserializeSeed, Deserializer};

use crate::cache::SchemaCache;
use crate::de::{decode_slice, DecodeContext, Place};
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::error::DecodeError;
use crate::options::Options;
use crate::proxy::{ProxyBuilder, ProxySchema};
use crate::shape::TypeShape;
use crate::value::Value;

/// Wraps `target`, a value of `shape`, for decoding under `options`.
pub fn wrap<'a>(shape: &'a TypeShape, target: &'a mut Value, options: Options) -> Lenient<'a> {
    Lenient {
        shape,
        target,
        options,
        sink: None,
        cache: None,
    }
}

/// A destination value prepared for lenient decoding.
///
/// Also usable as a [`DeserializeSeed`], so it can sit inside any serde
/// deserializer's data.
pub struct Lenient<'a> {
    shape: &'a TypeShape,
    target: &'a mut Value,
    options: Options,
    sink: Option<Arc<dyn DiagnosticSink>>,
    cache: Option<&'a SchemaCache>,
}

enum Failure<E> {
    Decode(E),
    Lenient(DecodeError),
}

impl<'a> Lenient<'a> {
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Looks the proxy schema up in `cache` instead of building it per call.
    /// Copy diagnostics then go to the cache's sink.
    pub fn cached(mut self, cache: &'a SchemaCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Decodes one JSON document from `bytes` into the wrapped value.
    pub fn decode(self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.decode_with(|shape, slot| decode_slice(bytes, shape, slot))
            .map_err(|failure| match failure {
                Failure::Decode(err) | Failure::Lenient(err) => err,
            })
    }

    fn decode_with<E>(
        self,
        decode: impl FnOnce(&TypeShape, &mut Value) -> Result<(), E>,
    ) -> Result<(), Failure<E>> {
        let diag = Diagnostics::new(self.options, self.sink.clone());
        diag.trace(format_args!("decode"));
        self.check_target().map_err(Failure::Lenient)?;

        if !self.options.is_lenient() {
            let mut scratch = self.target.clone();
            decode(self.shape, &mut scratch).map_err(Failure::Decode)?;
            *self.target = scratch;
            return Ok(());
        }

        let schema = self.schema(diag.clone());
        diag.debug(format_args!(
            "value type: {}, proxy type: {}",
            schema.shape(),
            schema.proxy()
        ));

        let mut proxy = Value::zero(schema.proxy());
        schema
            .copy(&mut proxy, self.target)
            .map_err(Failure::Lenient)?;

        decode(schema.proxy(), &mut proxy).map_err(Failure::Decode)?;

        let mut staged = self.target.clone();
        schema
            .copy(&mut staged, &proxy)
            .map_err(Failure::Lenient)?;
        *self.target = staged;
        Ok(())
    }

    fn check_target(&self) -> Result<(), DecodeError> {
        self.shape.validate()?;
        if !self.target.conforms_to(self.shape) {
            return Err(DecodeError::Usage(format!(
                "{} value does not match shape {}",
                self.target.kind(),
                self.shape
            )));
        }
        Ok(())
    }

    fn schema(&self, diag: Diagnostics) -> Arc<ProxySchema> {
        match self.cache {
            Some(cache) => cache.get(self.shape, self.options),
            None => Arc::new(ProxyBuilder::from_diagnostics(diag).build(self.shape)),
        }
    }
}

impl fmt::Debug for Lenient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lenient")
            .field("shape", self.shape)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'de> DeserializeSeed<'de> for Lenient<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        let ctx = DecodeContext::default();
        self.decode_with(|shape, slot| Place::new(shape, slot, &ctx).deserialize(deserializer))
            .map_err(|failure| match failure {
                Failure::Decode(err) => err,
                Failure::Lenient(err) => de::Error::custom(err),
            })
    }
}
