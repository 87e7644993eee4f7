//! Module-scope variables and storage qualifiers.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::types::Type;

/// How a module-scope variable is stored and who may see it.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StorageQualifier {
    /// Stage input (`in` / `attribute` / fragment-side `varying`).
    Input,
    /// Stage output (`out` / vertex-side `varying`).
    Output,
    /// Uniform state shared by all stages.
    Uniform,
    /// Compile-time constant.
    Constant,
    /// Module-private scratch storage (unqualified global).
    Private,
}

impl StorageQualifier {
    /// Returns `true` if variables with this qualifier participate in the
    /// program's cross-stage interface.
    pub fn is_interface(self) -> bool {
        matches!(self, Self::Input | Self::Output | Self::Uniform)
    }
}

/// A module-scope variable.
#[derive(Clone, Debug)]
pub struct GlobalVariable {
    pub name: String,
    pub qualifier: StorageQualifier,
    pub ty: Handle<Type>,
    /// Initializer, as a handle into the module's constant expression arena.
    pub init: Option<Handle<Expression>>,
    /// `layout(location = N)` qualifier, when present.
    pub location: Option<u32>,
    /// `true` for predeclared `gl_*` variables; excluded from interface
    /// matching at link time.
    pub builtin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_qualifiers() {
        assert!(StorageQualifier::Input.is_interface());
        assert!(StorageQualifier::Output.is_interface());
        assert!(StorageQualifier::Uniform.is_interface());
        assert!(!StorageQualifier::Constant.is_interface());
        assert!(!StorageQualifier::Private.is_interface());
    }
}
