//! Display implementations and the IR text dump.

use std::fmt;

use crate::arena::{Arena, Handle, UniqueArena};
use crate::expr::{BinaryOp, Expression, Literal, MathFunction, SwizzleComponent, UnaryOp};
use crate::func::Function;
use crate::global::StorageQualifier;
use crate::stmt::{Callee, Statement};
use crate::types::{Scalar, ScalarKind, Type, TypeInner};
use crate::Module;

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.kind {
            ScalarKind::Bool => "bool",
            ScalarKind::Sint => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
        })
    }
}

impl fmt::Display for StorageQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "in",
            Self::Output => "out",
            Self::Uniform => "uniform",
            Self::Constant => "const",
            Self::Private => "private",
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "-",
            Self::LogicalNot => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        })
    }
}

impl fmt::Display for MathFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for SwizzleComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::W => "w",
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}u"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// Formats a type as its canonical GLSL signature.
pub fn format_type(ty: &Type, types: &UniqueArena<Type>) -> String {
    if let Some(ref name) = ty.name {
        return name.clone();
    }
    format_type_inner(&ty.inner, types)
}

/// Formats a [`TypeInner`] as its canonical GLSL signature.
pub fn format_type_inner(inner: &TypeInner, types: &UniqueArena<Type>) -> String {
    match *inner {
        TypeInner::Scalar(s) => s.to_string(),
        TypeInner::Vector { size, scalar } => {
            let prefix = match scalar.kind {
                ScalarKind::Bool => "bvec",
                ScalarKind::Sint => "ivec",
                ScalarKind::Uint => "uvec",
                ScalarKind::Float => "vec",
            };
            format!("{prefix}{}", size as u32)
        }
        TypeInner::Matrix { columns, rows } => {
            if columns == rows {
                format!("mat{}", columns as u32)
            } else {
                format!("mat{}x{}", columns as u32, rows as u32)
            }
        }
        TypeInner::Array { base, size } => {
            let base_str = format_type(&types[base], types);
            format!("{base_str}[{size}]")
        }
        TypeInner::Sampler { dim } => match dim {
            crate::TextureDimension::D2 => "sampler2D".to_string(),
            crate::TextureDimension::Cube => "samplerCube".to_string(),
        },
    }
}

fn format_expr(handle: Handle<Expression>, exprs: &Arena<Expression>) -> String {
    match &exprs[handle] {
        Expression::Literal(lit) => format!("{lit}"),
        Expression::Compose { ty, components } => {
            let args: Vec<_> = components.iter().map(|h| format!("{h:?}")).collect();
            format!("Compose({ty:?}, [{}])", args.join(", "))
        }
        Expression::FunctionArgument(i) => format!("Argument({i})"),
        Expression::GlobalVariable(h) => format!("Global({h:?})"),
        Expression::LocalVariable(h) => format!("Local({h:?})"),
        Expression::Load { pointer } => format!("Load({pointer:?})"),
        Expression::Access { base, index } => format!("Access({base:?}, {index:?})"),
        Expression::AccessIndex { base, index } => format!("AccessIndex({base:?}, {index})"),
        Expression::Swizzle { vector, pattern } => {
            let comps: Vec<_> = pattern.iter().map(|c| c.to_string()).collect();
            format!("Swizzle({vector:?}).{}", comps.join(""))
        }
        Expression::Unary { op, expr } => format!("{op}{expr:?}"),
        Expression::Binary { op, left, right } => format!("{left:?} {op} {right:?}"),
        Expression::Select {
            condition,
            accept,
            reject,
        } => format!("Select({condition:?}, {accept:?}, {reject:?})"),
        Expression::Math {
            fun,
            arg,
            arg1,
            arg2,
        } => {
            let mut args = format!("{arg:?}");
            if let Some(a1) = arg1 {
                args += &format!(", {a1:?}");
            }
            if let Some(a2) = arg2 {
                args += &format!(", {a2:?}");
            }
            format!("{fun}({args})")
        }
        Expression::CallResult(f) => format!("CallResult({f:?})"),
        Expression::ExternalCallResult(f) => format!("ExternalCallResult({f:?})"),
    }
}

fn write_stmt(out: &mut String, stmt: &Statement, indent: usize) {
    let pad = " ".repeat(indent);
    match stmt {
        Statement::Store { pointer, value } => {
            out.push_str(&format!("{pad}Store {pointer:?} = {value:?}\n"));
        }
        Statement::If {
            condition,
            accept,
            reject,
        } => {
            out.push_str(&format!("{pad}If ({condition:?}) {{\n"));
            for s in accept {
                write_stmt(out, s, indent + 4);
            }
            if !reject.is_empty() {
                out.push_str(&format!("{pad}}} else {{\n"));
                for s in reject {
                    write_stmt(out, s, indent + 4);
                }
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Loop { body, continuing } => {
            out.push_str(&format!("{pad}Loop {{\n"));
            for s in body {
                write_stmt(out, s, indent + 4);
            }
            if !continuing.is_empty() {
                out.push_str(&format!("{pad}  Continuing {{\n"));
                for s in continuing {
                    write_stmt(out, s, indent + 8);
                }
                out.push_str(&format!("{pad}  }}\n"));
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Call {
            callee,
            arguments,
            result,
        } => {
            let args: Vec<_> = arguments.iter().map(|h| format!("{h:?}")).collect();
            let res = match result {
                Some(r) => format!(" -> {r:?}"),
                None => String::new(),
            };
            let target = match callee {
                Callee::Defined(h) => format!("fn {h:?}"),
                Callee::External(h) => format!("external {h:?}"),
            };
            out.push_str(&format!("{pad}Call {target}({}){res}\n", args.join(", ")));
        }
        Statement::Break => {
            out.push_str(&format!("{pad}Break\n"));
        }
        Statement::Continue => {
            out.push_str(&format!("{pad}Continue\n"));
        }
        Statement::Return { value } => match value {
            Some(v) => out.push_str(&format!("{pad}Return {v:?}\n")),
            None => out.push_str(&format!("{pad}Return\n")),
        },
        Statement::Discard => {
            out.push_str(&format!("{pad}Discard\n"));
        }
    }
}

fn write_function(out: &mut String, func: &Function, module: &Module) {
    let result = match func.result {
        Some(ty) => format_type(&module.types[ty], &module.types),
        None => "void".to_string(),
    };
    let args: Vec<_> = func
        .arguments
        .iter()
        .map(|a| {
            format!(
                "{}: {}",
                if a.name.is_empty() { "_" } else { a.name.as_str() },
                format_type(&module.types[a.ty], &module.types)
            )
        })
        .collect();
    out.push_str(&format!("fn {}({}) -> {} {{\n", func.name, args.join(", "), result));

    for (handle, local) in func.local_variables.iter() {
        let init = match local.init {
            Some(i) => format!(" = {i:?}"),
            None => String::new(),
        };
        out.push_str(&format!(
            "  local {handle:?} {}: {}{init}\n",
            local.name,
            format_type(&module.types[local.ty], &module.types)
        ));
    }

    for (handle, _) in func.expressions.iter() {
        out.push_str(&format!(
            "  expr {handle:?} = {}\n",
            format_expr(handle, &func.expressions)
        ));
    }

    out.push_str("  body:\n");
    for stmt in &func.body {
        write_stmt(out, stmt, 4);
    }
    out.push_str("}\n");
}

/// Renders a module as text, for `--dump-hir` / `--dump-lir` output.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("Stage: {}\n", module.stage));

    out.push_str("\nGlobals:\n");
    for (handle, var) in module.global_variables.iter() {
        let location = match var.location {
            Some(loc) => format!(" (location {loc})"),
            None => String::new(),
        };
        let builtin = if var.builtin { " (builtin)" } else { "" };
        let init = match var.init {
            Some(i) => format!(" = {i:?}"),
            None => String::new(),
        };
        out.push_str(&format!(
            "  {handle:?} {} {}: {}{location}{builtin}{init}\n",
            var.qualifier,
            var.name,
            format_type(&module.types[var.ty], &module.types)
        ));
    }

    if !module.global_expressions.is_empty() {
        out.push_str("\nConstants:\n");
        for (handle, _) in module.global_expressions.iter() {
            out.push_str(&format!(
                "  {handle:?} = {}\n",
                format_expr(handle, &module.global_expressions)
            ));
        }
    }

    if !module.external_functions.is_empty() {
        out.push_str("\nExternal functions:\n");
        for (handle, ext) in module.external_functions.iter() {
            let args: Vec<_> = ext
                .arg_types
                .iter()
                .map(|&t| format_type(&module.types[t], &module.types))
                .collect();
            let result = match ext.result {
                Some(ty) => format_type(&module.types[ty], &module.types),
                None => "void".to_string(),
            };
            out.push_str(&format!(
                "  {handle:?} {}({}) -> {result}\n",
                ext.name,
                args.join(", ")
            ));
        }
    }

    out.push('\n');
    for (handle, func) in module.functions.iter() {
        if module.entry_point == Some(handle) {
            out.push_str("entry ");
        }
        write_function(&mut out, func, module);
    }

    out
}
