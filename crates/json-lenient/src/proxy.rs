//! Proxy schema builder.
//!
//! For a [`TypeShape`], builds the isomorphic proxy shape in which every
//! identifier leaf is a text leaf, together with a [`CopyFn`] moving values
//! between the two. Composite cases recurse into their children and wrap the
//! child copy functions, so copy functions compose leaves first.
//!
//! A copy function has no fixed direction. `copy(to, from)` writes the image
//! of `from` into `to`; only identifier leaves look at which side they were
//! handed. The destination is reused where it already has the matching kind
//! (present maps are merged into, present optionals keep their allocation)
//! and otherwise replaced.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::error::DecodeError;
use crate::identifier::{identifier_from_text, render_identifier};
use crate::options::Options;
use crate::shape::{Field, LeafKind, RecordShape, TypeShape};
use crate::value::Value;

/// Copies `from` into `to`, converting between a shape and its proxy.
pub type CopyFn = Arc<dyn Fn(&mut Value, &Value) -> Result<(), DecodeError> + Send + Sync>;

/// A shape, its proxy shape and the copy function pairing them.
#[derive(Clone)]
pub struct ProxySchema {
    shape: TypeShape,
    proxy: TypeShape,
    copy: CopyFn,
}

impl ProxySchema {
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn proxy(&self) -> &TypeShape {
        &self.proxy
    }

    pub fn copy(&self, to: &mut Value, from: &Value) -> Result<(), DecodeError> {
        (self.copy)(to, from)
    }
}

impl fmt::Debug for ProxySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySchema")
            .field("shape", &self.shape)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

/// Builds [`ProxySchema`]s for one set of options.
#[derive(Clone)]
pub struct ProxyBuilder {
    diag: Diagnostics,
}

impl ProxyBuilder {
    pub fn new(options: Options) -> Self {
        Self {
            diag: Diagnostics::new(options, None),
        }
    }

    pub fn with_sink(self, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            diag: Diagnostics::new(self.diag.options(), Some(sink)),
        }
    }

    pub(crate) fn from_diagnostics(diag: Diagnostics) -> Self {
        Self { diag }
    }

    pub fn build(&self, shape: &TypeShape) -> ProxySchema {
        let (proxy, copy) = proxy_type(shape, &self.diag);
        ProxySchema {
            shape: shape.clone(),
            proxy,
            copy,
        }
    }
}

/// Builds the proxy shape and copy function for `shape`.
pub fn build(shape: &TypeShape, options: Options) -> (TypeShape, CopyFn) {
    proxy_type(shape, &Diagnostics::new(options, None))
}

fn proxy_type(shape: &TypeShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    diag.trace(format_args!("proxy: {shape}"));

    match shape {
        TypeShape::Leaf(LeafKind::Identifier) => proxy_identifier(false, diag),
        TypeShape::Optional(inner) if inner.is_identifier() => proxy_identifier(true, diag),
        TypeShape::FixedArray(len, elem) => proxy_array(*len, elem, diag),
        TypeShape::Map(key, value) => proxy_map(key, value, diag),
        TypeShape::Optional(inner) => proxy_optional(inner, diag),
        TypeShape::Sequence(elem) => proxy_sequence(elem, diag),
        TypeShape::Record(record) => proxy_record(record, diag),
        TypeShape::Leaf(_) => proxy_leaf(shape, diag),
    }
}

fn proxy_array(len: usize, elem: &TypeShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let (proxy, assign) = proxy_type(elem, diag);
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);

        let Value::Array(source) = from else {
            return Err(DecodeError::unexpected("array", from));
        };
        if source.len() != len {
            return Err(DecodeError::InternalConsistency(format!(
                "array of length {} where {len} is required",
                source.len()
            )));
        }
        if !matches!(&*to, Value::Array(items) if items.len() == len) {
            *to = Value::Array(vec![Value::placeholder(); len]);
        }
        if let Value::Array(items) = to {
            for (item, source) in items.iter_mut().zip(source) {
                assign(item, source)?;
            }
        }
        Ok(())
    });

    (TypeShape::array(len, proxy), copy)
}

fn proxy_map(key: &TypeShape, value: &TypeShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let (proxy_key, assign_key) = proxy_type(key, diag);
    let (proxy_value, assign_value) = proxy_type(value, diag);
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);

        let Value::Map(source) = from else {
            return Err(DecodeError::unexpected("map", from));
        };
        let Some(source) = source else {
            *to = Value::Map(None);
            return Ok(());
        };
        if !matches!(&*to, Value::Map(Some(_))) {
            *to = Value::Map(Some(BTreeMap::new()));
        }
        if let Value::Map(Some(entries)) = to {
            for (source_key, source_value) in source {
                let mut key = Value::placeholder();
                assign_key(&mut key, source_key)?;

                let mut value = Value::placeholder();
                assign_value(&mut value, source_value)?;

                entries.insert(key, value);
            }
        }
        Ok(())
    });

    (TypeShape::map(proxy_key, proxy_value), copy)
}

fn proxy_optional(inner: &TypeShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let (proxy, assign) = proxy_type(inner, diag);
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);

        let Value::Optional(source) = from else {
            return Err(DecodeError::unexpected("optional", from));
        };
        let Some(source) = source else {
            *to = Value::Optional(None);
            return Ok(());
        };
        match to {
            Value::Optional(Some(existing)) => assign(&mut **existing, &**source),
            other => {
                let mut fresh = Box::new(Value::placeholder());
                assign(&mut *fresh, &**source)?;
                *other = Value::Optional(Some(fresh));
                Ok(())
            }
        }
    });

    (TypeShape::optional(proxy), copy)
}

fn proxy_sequence(elem: &TypeShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let (proxy, assign) = proxy_type(elem, diag);
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);

        let Value::Sequence(source) = from else {
            return Err(DecodeError::unexpected("sequence", from));
        };
        let Some(source) = source else {
            *to = Value::Sequence(None);
            return Ok(());
        };
        let mut items = Vec::with_capacity(source.len());
        for source in source {
            let mut item = Value::placeholder();
            assign(&mut item, source)?;
            items.push(item);
        }
        *to = Value::Sequence(Some(items));
        Ok(())
    });

    (TypeShape::sequence(proxy), copy)
}

fn proxy_record(record: &RecordShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let n = record.fields.len();

    let mut proxies = Vec::with_capacity(n);
    let mut assigns = Vec::with_capacity(n);
    for field in &record.fields {
        let (proxy, assign) = proxy_type(&field.shape, diag);
        proxies.push(Field {
            name: field.name.clone(),
            tag: field.tag.clone(),
            shape: proxy,
        });
        assigns.push(assign);
    }
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);

        let Value::Record(source) = from else {
            return Err(DecodeError::unexpected("record", from));
        };
        if source.len() != n {
            return Err(DecodeError::InternalConsistency(format!(
                "record with {} fields where {n} are required",
                source.len()
            )));
        }
        if !matches!(&*to, Value::Record(fields) if fields.len() == n) {
            *to = Value::Record(vec![Value::placeholder(); n]);
        }
        if let Value::Record(fields) = to {
            for ((field, source), assign) in fields.iter_mut().zip(source).zip(&assigns) {
                assign(field, source)?;
            }
        }
        Ok(())
    });

    (TypeShape::record(record.name.clone(), proxies), copy)
}

/// Identifier leaves, bare or optional. The proxy side is text.
fn proxy_identifier(optional: bool, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);

        if !optional {
            *to = convert_identifier(from, diag.options())?;
            return Ok(());
        }
        match from {
            Value::Optional(None) => {
                *to = Value::Optional(None);
                Ok(())
            }
            Value::Optional(Some(source)) => {
                let converted = convert_identifier(source, diag.options())?;
                match to {
                    Value::Optional(Some(existing)) => **existing = converted,
                    other => *other = Value::Optional(Some(Box::new(converted))),
                }
                Ok(())
            }
            other => Err(DecodeError::unexpected("optional identifier or text", other)),
        }
    });

    let proxy = if optional {
        TypeShape::optional(TypeShape::text())
    } else {
        TypeShape::text()
    };
    (proxy, copy)
}

/// Identifier to text always renders; text to identifier applies the policy.
fn convert_identifier(from: &Value, options: Options) -> Result<Value, DecodeError> {
    match from {
        Value::Identifier(id) => Ok(Value::Text(render_identifier(id))),
        Value::Text(text) => identifier_from_text(text, options).map(Value::Identifier),
        other => Err(DecodeError::unexpected("identifier or text", other)),
    }
}

fn proxy_leaf(shape: &TypeShape, diag: &Diagnostics) -> (TypeShape, CopyFn) {
    let diag = diag.clone();

    let copy: CopyFn = Arc::new(move |to: &mut Value, from: &Value| {
        diag.trace_assign(from, to);
        *to = from.clone();
        Ok(())
    });

    (shape.clone(), copy)
}
