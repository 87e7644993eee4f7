//! The shared built-in function registry.
//!
//! Units compile calls to prototyped-but-undefined functions into external
//! references; the linker resolves those names here. The registry is built
//! once, before any unit is compiled, and read-only afterwards.

use std::collections::BTreeSet;

/// Registry of built-in function names resolvable at link time.
#[derive(Clone, Debug, Default)]
pub struct BuiltinRegistry {
    names: BTreeSet<String>,
}

impl BuiltinRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the standard library of
    /// link-resolved built-ins (texturing, derivatives, fixed-function
    /// helpers — everything the frontend does not lower to an intrinsic).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in [
            "texture",
            "texture2D",
            "texture2DLod",
            "texture2DProj",
            "textureCube",
            "textureCubeLod",
            "texelFetch",
            "shadow2D",
            "dFdx",
            "dFdy",
            "fwidth",
            "ftransform",
            "noise1",
            "noise2",
            "noise3",
            "noise4",
        ] {
            registry.register(name);
        }
        registry
    }

    /// Adds a name to the registry.
    pub fn register(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Resolves a required built-in, returning its canonical name.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(|s| s.as_str())
    }

    /// Returns the number of registered names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_texturing() {
        let registry = BuiltinRegistry::with_defaults();
        assert_eq!(registry.resolve("texture2D"), Some("texture2D"));
        assert_eq!(registry.resolve("dFdx"), Some("dFdx"));
        assert_eq!(registry.resolve("my_custom_fn"), None);
    }

    #[test]
    fn custom_registration() {
        let mut registry = BuiltinRegistry::new();
        assert!(registry.is_empty());
        registry.register("sample_env");
        assert_eq!(registry.resolve("sample_env"), Some("sample_env"));
        assert_eq!(registry.len(), 1);
    }
}
