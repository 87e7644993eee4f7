//! Frontend for the glint shader compiler.
//!
//! Takes a shading-language source string through three adapters, each with
//! a narrow interface the pipeline driver composes:
//!
//! 1. [`preprocess`] — macro expansion, conditionals, `#version` and
//!    `#extension` handling; returns expanded text or a diagnostic.
//! 2. [`parse`] — recursive-descent parse of the expanded text into an
//!    [`ast::Ast`].
//! 3. [`lower`] — AST to [`glint_ir::Module`], extracting exported symbols
//!    and the built-ins the unit needs resolved at link time.

pub mod ast;
mod lex;
mod lower;
mod parse;
mod preprocess;

pub use ast::dump_ast;
pub use lower::{lower, LowerError, LoweredUnit};
pub use parse::parse;
pub use preprocess::{preprocess, ExpandedSource};

use std::fmt;

/// The source dialect variant selected on the command line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Dialect {
    /// Desktop GLSL; sources default to `#version 110`.
    #[default]
    Core,
    /// OpenGL ES GLSL; sources default to `#version 100 es` and the
    /// preprocessor predefines `GL_ES`.
    Es,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Core => "core",
            Self::Es => "es",
        })
    }
}

/// The language version a unit was written against, from its `#version`
/// directive (or the dialect default when the directive is absent).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LanguageVersion {
    pub number: u16,
    pub es: bool,
}

impl LanguageVersion {
    /// The implied version for sources without a `#version` directive.
    pub fn default_for(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Core => Self {
                number: 110,
                es: false,
            },
            Dialect::Es => Self {
                number: 100,
                es: true,
            },
        }
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.es {
            write!(f, "{} es", self.number)
        } else {
            write!(f, "{}", self.number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_defaults() {
        let core = LanguageVersion::default_for(Dialect::Core);
        assert_eq!(core.number, 110);
        assert!(!core.es);
        assert_eq!(core.to_string(), "110");

        let es = LanguageVersion::default_for(Dialect::Es);
        assert_eq!(es.number, 100);
        assert!(es.es);
        assert_eq!(es.to_string(), "100 es");
    }
}
