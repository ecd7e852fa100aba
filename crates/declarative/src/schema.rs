//! Resource schemas
//!
//! A [`ResourceSchema`] declares the attributes and nested blocks of a
//! resource kind, their value types and their role (who supplies the
//! value). Schemas are built once at startup and read-only afterwards.

use crate::error::{Error, Result};
use crate::value::{AttributePath, AttributeValue, Attributes, Scalar};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attribute name reserved for the external identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// Declared type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    String,
    Bool,
    Number,
    List(Box<ValueType>),
}

impl ValueType {
    pub fn list_of(element: ValueType) -> Self {
        Self::List(Box::new(element))
    }

    /// Check that `value` conforms to this type.
    ///
    /// `Unknown` conforms to every type. `Null` is accepted at the top
    /// level but not as a list element.
    pub fn check(&self, value: &AttributeValue, path: &AttributePath) -> Result<()> {
        match (self, value) {
            (_, AttributeValue::Null | AttributeValue::Unknown)
            | (Self::String, AttributeValue::Scalar(Scalar::String(_)))
            | (Self::Bool, AttributeValue::Scalar(Scalar::Bool(_)))
            | (Self::Number, AttributeValue::Scalar(Scalar::Number(_))) => Ok(()),
            (Self::List(element), AttributeValue::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = path.index(i);
                    if item.is_null() {
                        return Err(Error::invalid(&item_path, "list elements cannot be null"));
                    }
                    element.check(item, &item_path)?;
                }
                Ok(())
            }
            (expected, found) => Err(Error::invalid(
                path,
                format!("expected {expected}, found {}", found.type_name()),
            )),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::List(element) => write!(f, "list({element})"),
        }
    }
}

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Caller must supply a value
    Required,
    /// Caller may supply a value; otherwise null
    Optional,
    /// Caller may supply a value; otherwise the remote computes one
    OptionalComputed,
    /// Only the remote supplies the value
    Computed,
}

impl Role {
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }

    pub fn is_optional(self) -> bool {
        matches!(self, Self::Optional | Self::OptionalComputed)
    }

    pub fn is_computed(self) -> bool {
        matches!(self, Self::OptionalComputed | Self::Computed)
    }

    /// Whether configuration may set a value.
    pub fn accepts_config(self) -> bool {
        !matches!(self, Self::Computed)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::OptionalComputed => "optional, computed",
            Self::Computed => "computed",
        };
        write!(f, "{label}")
    }
}

/// Convert a snake_case attribute name to the camelCase native field name.
pub fn native_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Declaration of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: String,
    pub value_type: ValueType,
    pub role: Role,
    /// Field name in the remote's native representation
    pub native: String,
    /// Closed set of permitted string values, if any
    pub allowed: Option<Vec<String>>,
    pub description: Option<String>,
}

impl AttributeSpec {
    pub fn new(name: &str, value_type: ValueType, role: Role) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            role,
            native: native_name(name),
            allowed: None,
            description: None,
        }
    }

    pub fn required(name: &str, value_type: ValueType) -> Self {
        Self::new(name, value_type, Role::Required)
    }

    pub fn optional(name: &str, value_type: ValueType) -> Self {
        Self::new(name, value_type, Role::Optional)
    }

    pub fn optional_computed(name: &str, value_type: ValueType) -> Self {
        Self::new(name, value_type, Role::OptionalComputed)
    }

    pub fn computed(name: &str, value_type: ValueType) -> Self {
        Self::new(name, value_type, Role::Computed)
    }

    /// Override the native field name.
    #[must_use]
    pub fn native(mut self, native: &str) -> Self {
        self.native = native.to_string();
        self
    }

    /// Restrict string values to a closed set.
    #[must_use]
    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| (*v).to_string()).collect());
        self
    }

    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn is_required(&self) -> bool {
        self.role.is_required()
    }

    pub fn is_optional(&self) -> bool {
        self.role.is_optional()
    }

    pub fn is_computed(&self) -> bool {
        self.role.is_computed()
    }

    /// Check a value's type and, for restricted attributes, its membership.
    pub fn check(&self, value: &AttributeValue, path: &AttributePath) -> Result<()> {
        self.value_type.check(value, path)?;
        if let (Some(allowed), Some(s)) = (&self.allowed, value.as_str())
            && !allowed.iter().any(|a| a == s)
        {
            return Err(Error::invalid(
                path,
                format!("{s:?} is not one of: {}", allowed.join(", ")),
            ));
        }
        Ok(())
    }
}

/// Arity of a nested block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// At most one instance, an object
    Single,
    /// Any number of instances, a list of objects
    List,
}

/// Shape of a nested block's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockShape {
    Fixed(ResourceSchema),
    /// Schema chosen by the value of a string attribute in the enclosing object
    Selected {
        discriminator: String,
        variants: BTreeMap<String, ResourceSchema>,
    },
}

/// Result of resolving a block's schema against its enclosing object.
#[derive(Debug)]
pub enum Selection<'a> {
    Schema(&'a ResourceSchema),
    /// Discriminator is not known yet
    Pending,
    /// Discriminator is null
    Unselected,
    /// Discriminator names no variant
    NoVariant(String),
}

impl BlockShape {
    /// Resolve the schema for a block whose siblings are `parent`.
    pub fn select(&self, parent: &Attributes) -> Selection<'_> {
        match self {
            Self::Fixed(schema) => Selection::Schema(schema),
            Self::Selected {
                discriminator,
                variants,
            } => match parent.get(discriminator) {
                Some(AttributeValue::Unknown) => Selection::Pending,
                Some(AttributeValue::Scalar(Scalar::String(tag))) => variants
                    .get(tag)
                    .map_or_else(|| Selection::NoVariant(tag.clone()), Selection::Schema),
                _ => Selection::Unselected,
            },
        }
    }

    /// The discriminator attribute, for selected shapes.
    pub fn discriminator(&self) -> Option<&str> {
        match self {
            Self::Fixed(_) => None,
            Self::Selected { discriminator, .. } => Some(discriminator),
        }
    }
}

/// Declaration of a nested block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub name: String,
    pub nesting: Nesting,
    pub role: Role,
    pub shape: BlockShape,
    pub native: String,
}

impl BlockSpec {
    pub fn new(name: &str, nesting: Nesting, role: Role, schema: ResourceSchema) -> Self {
        Self {
            name: name.to_string(),
            nesting,
            role,
            shape: BlockShape::Fixed(schema),
            native: native_name(name),
        }
    }

    /// A single block whose schema is picked by `discriminator`.
    pub fn selected<I>(name: &str, role: Role, discriminator: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, ResourceSchema)>,
    {
        Self {
            name: name.to_string(),
            nesting: Nesting::Single,
            role,
            shape: BlockShape::Selected {
                discriminator: discriminator.to_string(),
                variants: variants
                    .into_iter()
                    .map(|(tag, schema)| (tag.to_string(), schema))
                    .collect(),
            },
            native: native_name(name),
        }
    }

    #[must_use]
    pub fn native(mut self, native: &str) -> Self {
        self.native = native.to_string();
        self
    }
}

/// Attributes and nested blocks of a resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSchema {
    pub attributes: Vec<AttributeSpec>,
    pub blocks: Vec<BlockSpec>,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    #[must_use]
    pub fn block(mut self, spec: BlockSpec) -> Self {
        self.blocks.push(spec);
        self
    }

    pub fn find_attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn find_block(&self, name: &str) -> Option<&BlockSpec> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Whether `name` is a declared attribute or block.
    pub fn declares(&self, name: &str) -> bool {
        self.find_attribute(name).is_some() || self.find_block(name).is_some()
    }

    /// Declared names, attributes first, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.blocks.iter().map(|b| b.name.as_str()))
    }

    /// Whether configuration must supply something at this level.
    pub fn has_required(&self) -> bool {
        self.attributes.iter().any(AttributeSpec::is_required)
            || self.blocks.iter().any(|b| b.role.is_required())
    }

    /// Check the schema itself for declaration mistakes.
    pub fn validate(&self, kind: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSchema {
            kind: kind.to_string(),
            reason,
        };

        let mut seen = BTreeSet::new();
        let mut native_seen = BTreeSet::new();
        for name in self.names() {
            if name == ID_ATTRIBUTE {
                return Err(invalid(format!("'{ID_ATTRIBUTE}' is reserved")));
            }
            if !seen.insert(name) {
                return Err(invalid(format!("'{name}' is declared twice")));
            }
        }
        let natives = self
            .attributes
            .iter()
            .map(|a| a.native.as_str())
            .chain(self.blocks.iter().map(|b| b.native.as_str()));
        for native in natives {
            if !native_seen.insert(native) {
                return Err(invalid(format!("native field '{native}' is mapped twice")));
            }
        }

        for attr in &self.attributes {
            if attr.allowed.is_some() && attr.value_type != ValueType::String {
                return Err(invalid(format!(
                    "'{}' restricts values but is not a string",
                    attr.name
                )));
            }
        }

        for block in &self.blocks {
            if block.role == Role::Computed {
                return Err(invalid(format!("block '{}' cannot be computed-only", block.name)));
            }
            match &block.shape {
                BlockShape::Fixed(schema) => schema.validate(kind)?,
                BlockShape::Selected {
                    discriminator,
                    variants,
                } => {
                    let tag = self.find_attribute(discriminator).ok_or_else(|| {
                        invalid(format!(
                            "block '{}' is selected by undeclared '{discriminator}'",
                            block.name
                        ))
                    })?;
                    if tag.value_type != ValueType::String || block.nesting != Nesting::Single {
                        return Err(invalid(format!(
                            "block '{}' must be a single block selected by a string",
                            block.name
                        )));
                    }
                    for schema in variants.values() {
                        schema.validate(kind)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Check that `attrs` has exactly the declared keys with conforming
    /// values, and that no required attribute is null.
    pub fn validate_state(&self, attrs: &Attributes) -> Result<()> {
        let mut errors = Vec::new();
        self.check_object(attrs, &AttributePath::root(), true, &mut errors);
        Error::collect(errors).map_or(Ok(()), Err)
    }

    /// Like [`ResourceSchema::validate_state`] but allows null required
    /// attributes, as found in records read back from the remote.
    pub fn validate_shape(&self, attrs: &Attributes) -> Result<()> {
        let mut errors = Vec::new();
        self.check_object(attrs, &AttributePath::root(), false, &mut errors);
        Error::collect(errors).map_or(Ok(()), Err)
    }

    fn check_object(
        &self,
        attrs: &Attributes,
        path: &AttributePath,
        strict: bool,
        errors: &mut Vec<Error>,
    ) {
        for name in attrs.keys() {
            if !self.declares(name) {
                errors.push(Error::invalid(
                    &path.child(name),
                    "attribute is not declared by the schema",
                ));
            }
        }

        for spec in &self.attributes {
            let attr_path = path.child(&spec.name);
            match attrs.get(&spec.name) {
                None => errors.push(Error::invalid(&attr_path, "attribute is missing")),
                Some(AttributeValue::Null) if strict && spec.is_required() => {
                    errors.push(Error::MissingRequiredAttribute { path: attr_path });
                }
                Some(value) => {
                    if let Err(e) = spec.value_type.check(value, &attr_path) {
                        errors.push(e);
                    }
                }
            }
        }

        for block in &self.blocks {
            let block_path = path.child(&block.name);
            let Some(value) = attrs.get(&block.name) else {
                errors.push(Error::invalid(&block_path, "block is missing"));
                continue;
            };
            let schema = match block.shape.select(attrs) {
                Selection::Schema(schema) => schema,
                Selection::NoVariant(tag) => {
                    errors.push(Error::invalid(
                        &block_path,
                        format!("no variant for {tag:?}"),
                    ));
                    continue;
                }
                Selection::Pending | Selection::Unselected => continue,
            };
            match (block.nesting, value) {
                (_, AttributeValue::Unknown) => {}
                (_, AttributeValue::Null) => {
                    if strict && block.role.is_required() {
                        errors.push(Error::MissingRequiredAttribute { path: block_path });
                    }
                }
                // A computed block may come back without its required values.
                (Nesting::Single, AttributeValue::Object(inner)) => {
                    let strict = strict && block.role != Role::OptionalComputed;
                    schema.check_object(inner, &block_path, strict, errors);
                }
                (Nesting::List, AttributeValue::List(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        let item_path = block_path.index(i);
                        match item {
                            AttributeValue::Object(inner) => {
                                schema.check_object(inner, &item_path, strict, errors);
                            }
                            other => errors.push(Error::invalid(
                                &item_path,
                                format!("expected block, found {}", other.type_name()),
                            )),
                        }
                    }
                }
                (_, other) => errors.push(Error::invalid(
                    &block_path,
                    format!("expected block, found {}", other.type_name()),
                )),
            }
        }
    }
}
