//! Structural-analysis cache
//!
//! Which markers sit on which elements of a class, and with what parameter
//! shapes, is computed once per concrete class and shared across every
//! build in the process. The cache is guarded by one coarse mutex held for
//! the duration of computing an entry, so concurrent builds touching the
//! same class never duplicate the analysis.
//!
//! Compiled operations are never cached here; they are always
//! per-bean-site.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use trellis_core::element::{ClassDescriptor, ElementKind, ParamDescriptor};

/// Structural summary of one element
#[derive(Debug, Clone)]
pub struct ElementAnalysis {
    /// Element name within the class
    pub name: String,
    /// Element path, `Class#element`
    pub path: String,
    /// Element kind
    pub kind: ElementKind,
    /// Qualified marker names, in declaration order
    pub markers: Vec<String>,
    /// Declared parameters
    pub params: Vec<ParamDescriptor>,
}

/// Structural summary of one class: its marked elements only
#[derive(Debug)]
pub struct ClassAnalysis {
    /// The analyzed class name
    pub class: String,
    /// Elements carrying at least one marker, declaration order
    pub elements: Vec<ElementAnalysis>,
}

static CACHE: Lazy<Mutex<HashMap<String, Arc<ClassAnalysis>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Fetch or compute the structural analysis of a class
///
/// The mutex spans the computation, not just the map access: compute at
/// most once per class, shared across all users of that class.
pub fn class_analysis(class: &ClassDescriptor) -> Arc<ClassAnalysis> {
    let mut cache = CACHE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(analysis) = cache.get(class.name()) {
        return Arc::clone(analysis);
    }
    let analysis = Arc::new(compute(class));
    cache.insert(class.name().to_string(), Arc::clone(&analysis));
    analysis
}

fn compute(class: &ClassDescriptor) -> ClassAnalysis {
    let elements = class
        .elements()
        .iter()
        .filter(|element| !element.markers().is_empty() || element.kind() == ElementKind::Constructor)
        .map(|element| ElementAnalysis {
            name: element.name().to_string(),
            path: class.path(element),
            kind: element.kind(),
            markers: element.markers().iter().map(|m| m.qualified()).collect(),
            params: element.params().to_vec(),
        })
        .collect();
    ClassAnalysis {
        class: class.name().to_string(),
        elements,
    }
}
