//! Built-in hook handlers
//!
//! The handlers every build gets for free, registered through the
//! [`HOOK_HANDLERS`](crate::registry::HOOK_HANDLERS) distributed slice:
//!
//! - `lifecycle.init`: post-construct callback, runs once after the
//!   instance is stored, result discarded
//! - `lifecycle.inject`: member injection, same invocation window
//! - `produces.value`: the element's result becomes a producer under the
//!   key named by the marker's `key` attribute
//! - `config.constant`: binds a build-time string constant for a key
//! - `context.param`: declares a key as supplied at invocation time

use std::sync::Arc;

use trellis_core::element::{ElementDescriptor, Marker};
use trellis_core::error::{Error, Result};
use trellis_core::key::BindingKey;

use crate::aggregate::{AggregateBuilder, InvokeMode};
use crate::registry::{HookHandler, HookHandlerEntry, HOOK_HANDLERS};

fn marker_key(marker: &Marker, element: &ElementDescriptor) -> Result<BindingKey> {
    let name = marker.attr("key").ok_or_else(|| {
        Error::config(format!(
            "marker '{}' on element '{}' requires a 'key' attribute",
            marker.qualified(),
            element.name()
        ))
    })?;
    let key = BindingKey::named(name);
    Ok(match marker.attr("qualifier") {
        Some(qualifier) => key.with_qualifier(qualifier),
        None => key,
    })
}

/// Post-construct callbacks: `lifecycle.init`
pub struct InitHandler;

impl HookHandler for InitHandler {
    fn extension(&self) -> &'static str {
        "lifecycle"
    }

    fn marker(&self) -> &'static str {
        "lifecycle.init"
    }

    fn contribute(
        &self,
        _element: &ElementDescriptor,
        _marker: &Marker,
        builder: &mut AggregateBuilder,
    ) -> Result<()> {
        builder.claim("lifecycle", InvokeMode::PostConstruct);
        Ok(())
    }
}

#[linkme::distributed_slice(HOOK_HANDLERS)]
static INIT_HANDLER: HookHandlerEntry = HookHandlerEntry {
    marker: "lifecycle.init",
    description: "Post-construct callback, invoked once after instance creation",
    factory: || Arc::new(InitHandler),
};

/// Member injection: `lifecycle.inject`
///
/// The element body receives the instance and the injected values; it runs
/// in the same window as `lifecycle.init`.
pub struct InjectHandler;

impl HookHandler for InjectHandler {
    fn extension(&self) -> &'static str {
        "lifecycle"
    }

    fn marker(&self) -> &'static str {
        "lifecycle.inject"
    }

    fn contribute(
        &self,
        _element: &ElementDescriptor,
        _marker: &Marker,
        builder: &mut AggregateBuilder,
    ) -> Result<()> {
        builder.claim("lifecycle", InvokeMode::PostConstruct);
        Ok(())
    }
}

#[linkme::distributed_slice(HOOK_HANDLERS)]
static INJECT_HANDLER: HookHandlerEntry = HookHandlerEntry {
    marker: "lifecycle.inject",
    description: "Member injection, invoked once after instance creation",
    factory: || Arc::new(InjectHandler),
};

/// Producer methods: `produces.value`
pub struct ProducesHandler;

impl HookHandler for ProducesHandler {
    fn extension(&self) -> &'static str {
        "produces"
    }

    fn marker(&self) -> &'static str {
        "produces.value"
    }

    fn contribute(
        &self,
        element: &ElementDescriptor,
        marker: &Marker,
        builder: &mut AggregateBuilder,
    ) -> Result<()> {
        let key = marker_key(marker, element)?;
        builder.claim("produces", InvokeMode::Produces { key });
        Ok(())
    }
}

#[linkme::distributed_slice(HOOK_HANDLERS)]
static PRODUCES_HANDLER: HookHandlerEntry = HookHandlerEntry {
    marker: "produces.value",
    description: "Publishes the element's result as a graph producer",
    factory: || Arc::new(ProducesHandler),
};

/// Build-time constants: `config.constant`
///
/// Contribution-only: cooperates with whichever handler owns the
/// element's invocation.
pub struct ConstantHandler;

impl HookHandler for ConstantHandler {
    fn extension(&self) -> &'static str {
        "config"
    }

    fn marker(&self) -> &'static str {
        "config.constant"
    }

    fn contribute(
        &self,
        element: &ElementDescriptor,
        marker: &Marker,
        builder: &mut AggregateBuilder,
    ) -> Result<()> {
        let key = marker_key(marker, element)?;
        let value = marker.attr("value").ok_or_else(|| {
            Error::config(format!(
                "marker 'config.constant' on element '{}' requires a 'value' attribute",
                element.name()
            ))
        })?;
        builder.bind_constant(key, Arc::new(value.to_string()));
        Ok(())
    }
}

#[linkme::distributed_slice(HOOK_HANDLERS)]
static CONSTANT_HANDLER: HookHandlerEntry = HookHandlerEntry {
    marker: "config.constant",
    description: "Binds a build-time string constant for a key",
    factory: || Arc::new(ConstantHandler),
};

/// Invocation-time parameters: `context.param`
pub struct ContextHandler;

impl HookHandler for ContextHandler {
    fn extension(&self) -> &'static str {
        "context"
    }

    fn marker(&self) -> &'static str {
        "context.param"
    }

    fn contribute(
        &self,
        element: &ElementDescriptor,
        marker: &Marker,
        builder: &mut AggregateBuilder,
    ) -> Result<()> {
        let key = marker_key(marker, element)?;
        builder.expect_context(key);
        Ok(())
    }
}

#[linkme::distributed_slice(HOOK_HANDLERS)]
static CONTEXT_HANDLER: HookHandlerEntry = HookHandlerEntry {
    marker: "context.param",
    description: "Declares a key as supplied at invocation time",
    factory: || Arc::new(ContextHandler),
};

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::element::ElementKind;

    #[test]
    fn test_produces_requires_key_attribute() {
        let element = ElementDescriptor::new("make", ElementKind::Method);
        let marker = Marker::new("produces", "value");
        let mut builder = AggregateBuilder::new("Factory#make", &element);
        assert!(ProducesHandler
            .contribute(&element, &marker, &mut builder)
            .is_err());
    }

    #[test]
    fn test_constant_contributes_to_shared_builder() {
        let element = ElementDescriptor::new("make", ElementKind::Method);
        let marker = Marker::new("config", "constant")
            .with_attr("key", "app.name")
            .with_attr("value", "trellis");
        let mut builder = AggregateBuilder::new("Factory#make", &element);
        ConstantHandler
            .contribute(&element, &marker, &mut builder)
            .unwrap();
        let result = builder.seal(&crate::aggregate::SingleOwnerPolicy).unwrap();
        let bound = result.constants.get(&BindingKey::named("app.name")).unwrap();
        assert_eq!(
            *bound.clone().downcast::<String>().unwrap(),
            "trellis".to_string()
        );
    }

    #[test]
    fn test_qualifier_attribute_qualifies_key() {
        let element = ElementDescriptor::new("make", ElementKind::Method);
        let marker = Marker::new("produces", "value")
            .with_attr("key", "db.Pool")
            .with_attr("qualifier", "replica");
        let key = marker_key(&marker, &element).unwrap();
        assert_eq!(key.to_string(), "db.Pool@replica");
    }
}
