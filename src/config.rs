//! Loader configuration for class decoding.
//!
//! [`LoaderConfig`] controls how eagerly method bodies are materialized, how many of
//! them are memoized per class, and a couple of structural limits. The presets mirror
//! the typical usage patterns: lazy structural browsing (the default), whole-class
//! decompilation (`eager`), and memory-constrained batch scans (`uncached`).

/// Options applied while reading a class file and materializing its method bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Decode every method body while the class is loaded.
    ///
    /// Bytecode errors then surface from the load call instead of from
    /// [`crate::metadata::method::MethodDefinition::body`].
    pub eager_bodies: bool,

    /// Maximum number of decoded method bodies kept per class. `0` disables memoization.
    pub body_cache_capacity: usize,

    /// Adopt local-variable-table names for parameters without `MethodParameters` names.
    pub infer_parameter_names: bool,

    /// Largest accepted `code_length` of a `Code` attribute.
    pub max_code_length: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            eager_bodies: false,
            body_cache_capacity: 64,
            infer_parameter_names: true,
            max_code_length: 65535,
        }
    }
}

impl LoaderConfig {
    /// Decode all bodies up front and keep every one of them.
    #[must_use]
    pub fn eager() -> Self {
        Self {
            eager_bodies: true,
            body_cache_capacity: usize::MAX,
            ..Self::default()
        }
    }

    /// Never memoize bodies; each access decodes again.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            body_cache_capacity: 0,
            ..Self::default()
        }
    }
}
