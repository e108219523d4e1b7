//! Element descriptors
//!
//! Declarative descriptions of the program elements a bean class exposes:
//! fields, methods, and the constructor, each carrying the markers that
//! extensions recognize. Descriptors are plain data built by the declaring
//! layer (the DSL surface, out of scope here); the hook protocol consumes
//! them and never inspects concrete Rust types at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use crate::arena::SharedValue;
use crate::error::Result;
use crate::key::BindingKey;

/// What kind of program element a descriptor names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// An injectable member
    Field,
    /// A callable method
    Method,
    /// The instance-creation entry point
    Constructor,
}

/// A declarative marker placed on an element
///
/// Markers are keyed by the extension that owns them plus a kind name
/// within that extension, e.g. `lifecycle.init`.
#[derive(Debug, Clone)]
pub struct Marker {
    extension: String,
    kind: String,
    attrs: HashMap<String, String>,
}

impl Marker {
    /// Create a marker owned by `extension` with the given kind
    pub fn new(extension: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            kind: kind.into(),
            attrs: HashMap::new(),
        }
    }

    /// Attach an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// The owning extension
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The marker kind within its extension
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Fully qualified marker name, `extension.kind`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.extension, self.kind)
    }

    /// Look up an attribute
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// A declared parameter or variable of an element
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    name: String,
    key: BindingKey,
    optional: bool,
}

impl ParamDescriptor {
    /// Declare a required parameter
    pub fn new(name: impl Into<String>, key: BindingKey) -> Self {
        Self {
            name: name.into(),
            key,
            optional: false,
        }
    }

    /// Mark the parameter optional (defaultable)
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key the parameter asks for
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    /// Whether an unresolved binding may fall back to a default
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// The callable behind an element
///
/// Arguments arrive in parameter order; a defaulted optional parameter is
/// `None`. The declaring layer supplies the closure, the compiled
/// operation invokes it.
pub type ElementBody = Arc<dyn Fn(&[Option<SharedValue>]) -> Result<SharedValue> + Send + Sync>;

/// One marked program element of a class
#[derive(Clone)]
pub struct ElementDescriptor {
    name: String,
    kind: ElementKind,
    markers: Vec<Marker>,
    params: Vec<ParamDescriptor>,
    body: Option<ElementBody>,
}

impl ElementDescriptor {
    /// Describe an element
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            markers: Vec::new(),
            params: Vec::new(),
            body: None,
        }
    }

    /// Attach a marker
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Declare a parameter
    pub fn with_param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Supply the callable
    pub fn with_body(mut self, body: ElementBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element kind
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Markers placed on this element
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Declared parameters, in order
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// The callable, if supplied
    pub fn body(&self) -> Option<&ElementBody> {
        self.body.as_ref()
    }
}

impl std::fmt::Debug for ElementDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("markers", &self.markers)
            .field("params", &self.params)
            .finish()
    }
}

/// A described bean class: a name plus its marked elements
#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
    name: String,
    elements: Vec<ElementDescriptor>,
}

impl ClassDescriptor {
    /// Describe a class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    /// Attach an element
    pub fn with_element(mut self, element: ElementDescriptor) -> Self {
        self.elements.push(element);
        self
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class's elements, in declaration order
    pub fn elements(&self) -> &[ElementDescriptor] {
        &self.elements
    }

    /// The constructor element, if declared
    pub fn constructor(&self) -> Option<&ElementDescriptor> {
        self.elements
            .iter()
            .find(|e| e.kind() == ElementKind::Constructor)
    }

    /// Element path for diagnostics, `Class#element`
    pub fn path(&self, element: &ElementDescriptor) -> String {
        format!("{}#{}", self.name, element.name())
    }
}
