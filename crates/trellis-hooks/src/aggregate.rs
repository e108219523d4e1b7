//! Per-element aggregation
//!
//! When several recognized markers sit on one element, every matching
//! handler is collected before any runs, and they all contribute to a
//! single [`AggregateBuilder`]. The builder computes the element's
//! structural shape at most once no matter how many handlers ask for it,
//! which is the point: introspecting an element is the expensive step and
//! several independent concerns may need it.
//!
//! Whether the collected contributions are compatible is decided by a
//! pluggable [`CombinePolicy`]; the default rejects two handlers that both
//! claim the element's invocation.

use std::collections::{HashMap, HashSet};

use trellis_core::arena::SharedValue;
use trellis_core::element::{ElementDescriptor, ParamDescriptor};
use trellis_core::error::{Error, Result};
use trellis_core::key::BindingKey;

/// How a claiming extension wants the compiled operation invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeMode {
    /// Run once after the bean instance is created, result discarded
    PostConstruct,
    /// Run once in dependency order; the result is stored in its own
    /// arena slot and published as a producer under `key`
    Produces {
        /// The key the produced value answers to
        key: BindingKey,
    },
}

/// One handler's claim on the element's invocation
#[derive(Debug, Clone)]
pub struct Claim {
    /// The claiming extension
    pub extension: String,
    /// Requested invocation mode
    pub mode: InvokeMode,
}

/// The element's structural shape, computed at most once per aggregate
#[derive(Debug, Clone)]
pub struct ElementShape {
    /// Declared parameters in order
    pub params: Vec<ParamDescriptor>,
    /// Qualified marker names on the element
    pub markers: Vec<String>,
}

/// Shared per-element builder the matching handlers cooperate through
pub struct AggregateBuilder {
    path: String,
    element: ElementDescriptor,
    shape: Option<ElementShape>,
    shape_computations: usize,
    constants: HashMap<BindingKey, SharedValue>,
    context_keys: HashSet<BindingKey>,
    claims: Vec<Claim>,
}

impl AggregateBuilder {
    /// Start an aggregate for one element
    pub fn new(path: impl Into<String>, element: &ElementDescriptor) -> Self {
        Self {
            path: path.into(),
            element: element.clone(),
            shape: None,
            shape_computations: 0,
            constants: HashMap::new(),
            context_keys: HashSet::new(),
            claims: Vec::new(),
        }
    }

    /// Element path, `Class#element`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The element's structural shape, computed on first access
    pub fn shape(&mut self) -> &ElementShape {
        if self.shape.is_none() {
            self.shape_computations += 1;
            self.shape = Some(ElementShape {
                params: self.element.params().to_vec(),
                markers: self.element.markers().iter().map(|m| m.qualified()).collect(),
            });
        }
        self.shape.as_ref().unwrap_or_else(|| unreachable!())
    }

    /// How many times the shape was actually computed
    pub fn shape_computations(&self) -> usize {
        self.shape_computations
    }

    /// Bind a build-time constant for a key
    pub fn bind_constant(&mut self, key: BindingKey, value: SharedValue) {
        self.constants.insert(key, value);
    }

    /// Declare that a key is supplied at invocation time
    pub fn expect_context(&mut self, key: BindingKey) {
        self.context_keys.insert(key);
    }

    /// Claim the element's invocation
    pub fn claim(&mut self, extension: impl Into<String>, mode: InvokeMode) {
        self.claims.push(Claim {
            extension: extension.into(),
            mode,
        });
    }

    /// Seal the aggregate into one combined result
    ///
    /// Applies the combine policy; an incompatible handler combination
    /// fails the build here.
    pub fn seal(self, policy: &dyn CombinePolicy) -> Result<AggregateResult> {
        policy.check(&self.path, &self.claims)?;
        Ok(AggregateResult {
            constants: self.constants,
            context_keys: self.context_keys,
            claims: self.claims,
        })
    }
}

/// One combined result per element, however many handlers contributed
#[derive(Default)]
pub struct AggregateResult {
    /// Build-time constants bound by extensions
    pub constants: HashMap<BindingKey, SharedValue>,
    /// Keys resolved from invocation arguments rather than the graph
    pub context_keys: HashSet<BindingKey>,
    /// Invocation claims, already policy-checked
    pub claims: Vec<Claim>,
}

impl AggregateResult {
    /// The single invocation claim, if any handler made one
    pub fn claim(&self) -> Option<&Claim> {
        self.claims.first()
    }
}

/// Decides whether the handlers collected on one element can cooperate
///
/// The compatibility rule is extension-defined; the protocol only detects
/// that a conflict occurred.
pub trait CombinePolicy: Send + Sync {
    /// Fail with [`Error::IncompatibleHooks`] if the claims conflict
    fn check(&self, element: &str, claims: &[Claim]) -> Result<()>;
}

/// Default policy: at most one handler may claim the invocation
///
/// Any number of handlers may contribute constants or context keys.
#[derive(Debug, Default)]
pub struct SingleOwnerPolicy;

impl CombinePolicy for SingleOwnerPolicy {
    fn check(&self, element: &str, claims: &[Claim]) -> Result<()> {
        if claims.len() > 1 {
            let owners: Vec<&str> = claims.iter().map(|c| c.extension.as_str()).collect();
            return Err(Error::incompatible(
                element,
                format!("multiple invocation claims: {}", owners.join(", ")),
            ));
        }
        Ok(())
    }
}
