//! Attribute value converters and the ordered chain that applies them.
//!
//! Converters run on every attribute value after it has been turned into
//! JSON and before it is placed in the resource's `attributes` member. The
//! first converter in chain order that accepts a value converts it; the
//! rest are skipped.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Where a value being converted comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTarget<'a> {
    /// Type name of the owning resource.
    pub resource: &'a str,
    /// Wire name of the attribute.
    pub attribute: &'a str,
}

/// A transformation applied to attribute values.
pub trait AttributeConverter: Send + Sync {
    fn can_convert(&self, target: &AttributeTarget<'_>, value: &Value) -> bool;

    fn convert(&self, target: &AttributeTarget<'_>, value: Value) -> Value;
}

/// How a newly registered item is placed relative to existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPolicy {
    /// Run before every existing item.
    InsertAtStart,
    /// Run after every existing item.
    #[default]
    InsertAtEnd,
    /// Discard the existing items first.
    OverwriteExisting,
}

impl RegistrationPolicy {
    /// Place `item` in `items` according to the policy.
    pub fn apply<T>(self, items: &mut Vec<T>, item: T) {
        match self {
            RegistrationPolicy::InsertAtStart => items.insert(0, item),
            RegistrationPolicy::InsertAtEnd => items.push(item),
            RegistrationPolicy::OverwriteExisting => {
                items.clear();
                items.push(item);
            }
        }
    }
}

/// An ordered set of converters. Cheap to clone.
#[derive(Clone, Default)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn AttributeConverter>>,
}

impl ConverterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, converter: impl AttributeConverter + 'static, policy: RegistrationPolicy) {
        policy.apply(&mut self.converters, Arc::new(converter));
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Convert `value` with the first converter that accepts it, or return
    /// it unchanged.
    pub fn convert(&self, target: &AttributeTarget<'_>, value: Value) -> Value {
        match self.converters.iter().find(|c| c.can_convert(target, &value)) {
            Some(converter) => converter.convert(target, value),
            None => value,
        }
    }
}

impl fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterChain")
            .field("len", &self.converters.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Shipped converters
// ---------------------------------------------------------------------------

/// Renders an integer enum discriminant as the variant's name.
///
/// Applies to one attribute, optionally restricted to one resource type.
/// Discriminants without a name are left as numbers.
#[derive(Debug, Clone)]
pub struct EnumNameConverter {
    resource: Option<String>,
    attribute: String,
    names: Vec<(i64, String)>,
}

impl EnumNameConverter {
    pub fn new<N, S>(attribute: impl Into<String>, names: N) -> Self
    where
        N: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self {
            resource: None,
            attribute: attribute.into(),
            names: names.into_iter().map(|(d, n)| (d, n.into())).collect(),
        }
    }

    /// Only convert the attribute on resources of `type_name`.
    pub fn for_resource(mut self, type_name: impl Into<String>) -> Self {
        self.resource = Some(type_name.into());
        self
    }

    fn name_of(&self, value: &Value) -> Option<&str> {
        let discriminant = value.as_i64()?;
        self.names
            .iter()
            .find(|(d, _)| *d == discriminant)
            .map(|(_, n)| n.as_str())
    }
}

impl AttributeConverter for EnumNameConverter {
    fn can_convert(&self, target: &AttributeTarget<'_>, value: &Value) -> bool {
        target.attribute == self.attribute
            && self.resource.as_deref().map_or(true, |r| r == target.resource)
            && self.name_of(value).is_some()
    }

    fn convert(&self, _target: &AttributeTarget<'_>, value: Value) -> Value {
        match self.name_of(&value) {
            Some(name) => Value::String(name.to_string()),
            None => value,
        }
    }
}

type Predicate = dyn Fn(&AttributeTarget<'_>, &Value) -> bool + Send + Sync;
type Transform = dyn Fn(&AttributeTarget<'_>, Value) -> Value + Send + Sync;

/// A converter built from two closures.
pub struct FnConverter {
    predicate: Box<Predicate>,
    transform: Box<Transform>,
}

impl FnConverter {
    pub fn new<P, F>(predicate: P, transform: F) -> Self
    where
        P: Fn(&AttributeTarget<'_>, &Value) -> bool + Send + Sync + 'static,
        F: Fn(&AttributeTarget<'_>, Value) -> Value + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            transform: Box::new(transform),
        }
    }

    /// Convert every value of the attribute named `attribute`.
    pub fn for_attribute<F>(attribute: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let attribute = attribute.into();
        Self::new(
            move |target: &AttributeTarget<'_>, _: &Value| target.attribute == attribute,
            move |_: &AttributeTarget<'_>, value: Value| transform(value),
        )
    }
}

impl AttributeConverter for FnConverter {
    fn can_convert(&self, target: &AttributeTarget<'_>, value: &Value) -> bool {
        (self.predicate)(target, value)
    }

    fn convert(&self, target: &AttributeTarget<'_>, value: Value) -> Value {
        (self.transform)(target, value)
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnConverter")
    }
}

// --- tests -------------------------------------------------------------------
