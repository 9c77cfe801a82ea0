//! The deserializer facade and its builder.

use std::fmt;
use std::sync::Arc;

use crate::binder::{BindSettings, ObjectGraphBuilder};
use crate::compose::{compose_all, compose_str};
use crate::descriptor::{EnumDescriptor, ObjectDescriptor, TypeDescriptor, TypeRegistry};
use crate::error::Error;
use crate::mapping::TypeMappingRegistry;
use crate::naming::{NamingConvention, NullNaming};
use crate::node::Document;
use crate::options::Options;
use crate::scalar::{ScalarConverter, ScalarConverterChain};
use crate::value::{Bound, FromValue};

/// Collects the configuration of a [`Deserializer`].
///
/// Everything registered here is frozen by [`DeserializerBuilder::build`]; the built
/// deserializer never changes afterwards.
///
/// ```rust
/// use saphyr_bind::naming::CamelCase;
/// use saphyr_bind::{Deserializer, ObjectDescriptor, TypeDescriptor};
///
/// let deserializer = Deserializer::builder()
///     .with_naming_convention(CamelCase)
///     .with_object(
///         ObjectDescriptor::new("Car")
///             .member("Name", TypeDescriptor::string())
///             .member("Year", TypeDescriptor::i32()),
///     )
///     .with_type_mapping("ICar", "Car")
///     .build();
///
/// let bound = deserializer
///     .deserialize("name: Honda\nyear: 2021\n", &TypeDescriptor::capability("ICar"))
///     .unwrap();
/// let car = bound.root_object().unwrap();
/// assert_eq!(car.get::<i32>("Year").unwrap(), 2021);
/// ```
#[derive(Clone)]
pub struct DeserializerBuilder {
    types: TypeRegistry,
    mappings: TypeMappingRegistry,
    naming: Arc<dyn NamingConvention>,
    converters: ScalarConverterChain,
    options: Options,
}

impl Default for DeserializerBuilder {
    fn default() -> Self {
        Self {
            types: TypeRegistry::new(),
            mappings: TypeMappingRegistry::new(),
            naming: Arc::new(NullNaming),
            converters: ScalarConverterChain::new(),
            options: Options::default(),
        }
    }
}

impl DeserializerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Naming convention applied to member names (and enum variants) to obtain YAML keys.
    /// Defaults to [`NullNaming`].
    pub fn with_naming_convention<N: NamingConvention + 'static>(mut self, naming: N) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    /// Build `concrete` whenever `capability` is requested. Repeatable; a later mapping for
    /// the same capability replaces the earlier one.
    pub fn with_type_mapping(mut self, capability: &str, concrete: &str) -> Self {
        self.mappings.register(capability, concrete);
        self
    }

    pub fn with_object(mut self, descriptor: ObjectDescriptor) -> Self {
        self.types.register_object(descriptor);
        self
    }

    pub fn with_enum(mut self, descriptor: EnumDescriptor) -> Self {
        self.types.register_enum(descriptor);
        self
    }

    /// Add a scalar converter. Converters added here take precedence over the built-ins.
    pub fn with_scalar_converter<C: ScalarConverter + 'static>(mut self, converter: C) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    pub fn with_strict_members(mut self, strict: bool) -> Self {
        self.options.strict_members = strict;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Replace all options, including any strictness or depth set before.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Deserializer {
        Deserializer {
            inner: Arc::new(Inner {
                types: self.types,
                mappings: self.mappings,
                naming: self.naming,
                converters: self.converters,
                options: self.options,
            }),
        }
    }
}

struct Inner {
    types: TypeRegistry,
    mappings: TypeMappingRegistry,
    naming: Arc<dyn NamingConvention>,
    converters: ScalarConverterChain,
    options: Options,
}

/// Parses YAML and binds it to a requested type.
///
/// Cheap to clone and safe to share: concurrent calls each get their own resolution
/// context and never observe each other.
#[derive(Clone)]
pub struct Deserializer {
    inner: Arc<Inner>,
}

impl fmt::Debug for Deserializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deserializer")
            .field("naming", &self.inner.naming)
            .field("mappings", &self.inner.mappings.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Default for Deserializer {
    fn default() -> Self {
        DeserializerBuilder::new().build()
    }
}

impl Deserializer {
    pub fn builder() -> DeserializerBuilder {
        DeserializerBuilder::new()
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    fn settings(&self) -> BindSettings<'_> {
        BindSettings {
            types: &self.inner.types,
            mappings: &self.inner.mappings,
            naming: self.inner.naming.as_ref(),
            converters: &self.inner.converters,
            options: &self.inner.options,
        }
    }

    /// Bind an already composed document.
    pub fn deserialize_document(
        &self,
        document: &Document,
        root: &TypeDescriptor,
    ) -> Result<Bound, Error> {
        tracing::debug!(root = %root, nodes = document.len(), "binding document");
        let bound = ObjectGraphBuilder::new(document, self.settings()).bind_root(root)?;
        tracing::debug!(objects = bound.graph.len(), "document bound");
        Ok(bound)
    }

    /// Parse a single-document YAML string and bind its root as `root`.
    ///
    /// Empty input binds to `Null`. Input with more than one document fails with
    /// [`Error::MultipleDocuments`].
    pub fn deserialize(&self, input: &str, root: &TypeDescriptor) -> Result<Bound, Error> {
        let result = compose_str(input, &self.inner.options).and_then(|document| {
            let document = document.unwrap_or_default();
            self.deserialize_document(&document, root)
        });
        result.map_err(|err| self.maybe_with_snippet(err, input))
    }

    /// Parse a multi-document stream and bind every non-empty document as `root`.
    pub fn deserialize_all(&self, input: &str, root: &TypeDescriptor) -> Result<Vec<Bound>, Error> {
        let result = compose_all(input, &self.inner.options).and_then(|documents| {
            documents
                .iter()
                .map(|document| self.deserialize_document(document, root))
                .collect()
        });
        result.map_err(|err| self.maybe_with_snippet(err, input))
    }

    /// Parse, bind and convert the root into `T`.
    pub fn deserialize_into<T: FromValue>(
        &self,
        input: &str,
        root: &TypeDescriptor,
    ) -> Result<T, Error> {
        self.deserialize(input, root)?.extract()
    }

    fn maybe_with_snippet(&self, err: Error, input: &str) -> Error {
        if self.inner.options.with_snippet {
            err.with_snippet(input, self.inner.options.crop_radius)
        } else {
            err
        }
    }
}
