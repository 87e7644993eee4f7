//! Abstract syntax tree produced by the parser and consumed by the lowerer.

use std::fmt::Write;

use glint_ir::{BinaryOp, UnaryOp};

/// A parsed translation unit.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    pub decls: Vec<Decl>,
}

impl Ast {
    /// Returns `true` if the unit declares nothing. Structurally empty units
    /// skip lowering and compile to an empty IR module.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// A top-level declaration.
#[derive(Clone, Debug)]
pub enum Decl {
    Variable(VarDecl),
    Function(FunctionDecl),
}

/// A storage qualifier as written in the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Qualifier {
    Const,
    Uniform,
    In,
    Out,
    /// Legacy vertex input (maps to `in`).
    Attribute,
    /// Legacy cross-stage variable (maps to `out` in a vertex shader and
    /// `in` in a fragment shader).
    Varying,
}

impl Qualifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Uniform => "uniform",
            Self::In => "in",
            Self::Out => "out",
            Self::Attribute => "attribute",
            Self::Varying => "varying",
        }
    }
}

/// A type as written in the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeSpec {
    Void,
    Float,
    Int,
    Uint,
    Bool,
    /// `vecN`, N in 2..=4.
    Vec(u8),
    /// `ivecN`.
    IVec(u8),
    /// `uvecN`.
    UVec(u8),
    /// `bvecN`.
    BVec(u8),
    /// `matN` (square).
    Mat(u8),
    Sampler2D,
    SamplerCube,
}

impl TypeSpec {
    /// Maps a type keyword to its spec.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Self::Void,
            "float" => Self::Float,
            "int" => Self::Int,
            "uint" => Self::Uint,
            "bool" => Self::Bool,
            "vec2" => Self::Vec(2),
            "vec3" => Self::Vec(3),
            "vec4" => Self::Vec(4),
            "ivec2" => Self::IVec(2),
            "ivec3" => Self::IVec(3),
            "ivec4" => Self::IVec(4),
            "uvec2" => Self::UVec(2),
            "uvec3" => Self::UVec(3),
            "uvec4" => Self::UVec(4),
            "bvec2" => Self::BVec(2),
            "bvec3" => Self::BVec(3),
            "bvec4" => Self::BVec(4),
            "mat2" => Self::Mat(2),
            "mat3" => Self::Mat(3),
            "mat4" => Self::Mat(4),
            "sampler2D" => Self::Sampler2D,
            "samplerCube" => Self::SamplerCube,
            _ => return None,
        })
    }

    pub fn name(self) -> String {
        match self {
            Self::Void => "void".into(),
            Self::Float => "float".into(),
            Self::Int => "int".into(),
            Self::Uint => "uint".into(),
            Self::Bool => "bool".into(),
            Self::Vec(n) => format!("vec{n}"),
            Self::IVec(n) => format!("ivec{n}"),
            Self::UVec(n) => format!("uvec{n}"),
            Self::BVec(n) => format!("bvec{n}"),
            Self::Mat(n) => format!("mat{n}"),
            Self::Sampler2D => "sampler2D".into(),
            Self::SamplerCube => "samplerCube".into(),
        }
    }
}

/// A variable declaration (global or local).
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub qualifier: Option<Qualifier>,
    pub ty: TypeSpec,
    pub name: String,
    /// Constant array size, when declared as `T name[N]`.
    pub array_size: Option<u32>,
    pub init: Option<Expr>,
    /// `layout(location = N)` value, when present.
    pub location: Option<u32>,
    pub line: u32,
}

/// A function parameter.
#[derive(Clone, Debug)]
pub struct Param {
    /// Empty for unnamed prototype parameters.
    pub name: String,
    pub ty: TypeSpec,
    pub line: u32,
}

/// A function definition or prototype.
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub result: TypeSpec,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` for a prototype (declaration without a body).
    pub body: Option<Vec<Stmt>>,
    pub line: u32,
}

/// An assignment operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

/// A statement.
#[derive(Clone, Debug)]
pub enum Stmt {
    Decl(VarDecl),
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
        line: u32,
    },
    Expr {
        expr: Expr,
        line: u32,
    },
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
        line: u32,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        line: u32,
    },
    Return {
        value: Option<Expr>,
        line: u32,
    },
    Break {
        line: u32,
    },
    Continue {
        line: u32,
    },
    Discard {
        line: u32,
    },
    Block(Vec<Stmt>),
}

/// An expression.
#[derive(Clone, Debug)]
pub enum Expr {
    FloatLit {
        value: f32,
        line: u32,
    },
    IntLit {
        value: i32,
        line: u32,
    },
    UintLit {
        value: u32,
        line: u32,
    },
    BoolLit {
        value: bool,
        line: u32,
    },
    Ident {
        name: String,
        line: u32,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        line: u32,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: u32,
    },
    Ternary {
        condition: Box<Expr>,
        accept: Box<Expr>,
        reject: Box<Expr>,
        line: u32,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        line: u32,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        line: u32,
    },
    Member {
        base: Box<Expr>,
        member: String,
        line: u32,
    },
    /// `target++` / `++target` / `target--` / `--target`; only meaningful as
    /// a statement, where it desugars to a store.
    IncDec {
        target: Box<Expr>,
        increment: bool,
        line: u32,
    },
}

impl Expr {
    /// The source line this expression started on.
    pub fn line(&self) -> u32 {
        match self {
            Self::FloatLit { line, .. }
            | Self::IntLit { line, .. }
            | Self::UintLit { line, .. }
            | Self::BoolLit { line, .. }
            | Self::Ident { line, .. }
            | Self::Unary { line, .. }
            | Self::Binary { line, .. }
            | Self::Ternary { line, .. }
            | Self::Call { line, .. }
            | Self::Index { line, .. }
            | Self::Member { line, .. }
            | Self::IncDec { line, .. } => *line,
        }
    }
}

/// Renders a parsed unit as indented text, for `--dump-ast` output.
pub fn dump_ast(ast: &Ast) -> String {
    let mut out = String::new();
    for decl in &ast.decls {
        match decl {
            Decl::Variable(var) => {
                out.push_str(&format_var_decl(var));
                out.push('\n');
            }
            Decl::Function(func) => {
                let params: Vec<_> = func
                    .params
                    .iter()
                    .map(|p| {
                        if p.name.is_empty() {
                            p.ty.name()
                        } else {
                            format!("{} {}", p.ty.name(), p.name)
                        }
                    })
                    .collect();
                let _ = write!(
                    out,
                    "fn {}({}) -> {}",
                    func.name,
                    params.join(", "),
                    func.result.name()
                );
                match &func.body {
                    None => out.push_str(" (prototype)\n"),
                    Some(body) => {
                        out.push('\n');
                        for stmt in body {
                            write_stmt(&mut out, stmt, 1);
                        }
                    }
                }
            }
        }
    }
    out
}

fn format_var_decl(var: &VarDecl) -> String {
    let mut text = String::new();
    if let Some(loc) = var.location {
        let _ = write!(text, "layout(location = {loc}) ");
    }
    if let Some(q) = var.qualifier {
        let _ = write!(text, "{} ", q.keyword());
    }
    let _ = write!(text, "{} {}", var.ty.name(), var.name);
    if let Some(n) = var.array_size {
        let _ = write!(text, "[{n}]");
    }
    if let Some(init) = &var.init {
        let _ = write!(text, " = {}", format_expr(init));
    }
    text
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = "  ".repeat(depth);
    match stmt {
        Stmt::Decl(var) => {
            let _ = writeln!(out, "{pad}{}", format_var_decl(var));
        }
        Stmt::Assign {
            target, op, value, ..
        } => {
            let op_text = match op {
                AssignOp::Assign => "=",
                AssignOp::Add => "+=",
                AssignOp::Sub => "-=",
                AssignOp::Mul => "*=",
                AssignOp::Div => "/=",
            };
            let _ = writeln!(
                out,
                "{pad}{} {op_text} {}",
                format_expr(target),
                format_expr(value)
            );
        }
        Stmt::Expr { expr, .. } => {
            let _ = writeln!(out, "{pad}{}", format_expr(expr));
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let _ = writeln!(out, "{pad}if {}", format_expr(condition));
            for s in then_branch {
                write_stmt(out, s, depth + 1);
            }
            if !else_branch.is_empty() {
                let _ = writeln!(out, "{pad}else");
                for s in else_branch {
                    write_stmt(out, s, depth + 1);
                }
            }
        }
        Stmt::While {
            condition, body, ..
        } => {
            let _ = writeln!(out, "{pad}while {}", format_expr(condition));
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        Stmt::For {
            init,
            condition,
            step,
            body,
            ..
        } => {
            let _ = writeln!(out, "{pad}for");
            if let Some(init) = init {
                write_stmt(out, init, depth + 1);
            }
            if let Some(cond) = condition {
                let _ = writeln!(out, "{pad}  cond {}", format_expr(cond));
            }
            if let Some(step) = step {
                write_stmt(out, step, depth + 1);
            }
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        Stmt::Return { value, .. } => match value {
            Some(v) => {
                let _ = writeln!(out, "{pad}return {}", format_expr(v));
            }
            None => {
                let _ = writeln!(out, "{pad}return");
            }
        },
        Stmt::Break { .. } => {
            let _ = writeln!(out, "{pad}break");
        }
        Stmt::Continue { .. } => {
            let _ = writeln!(out, "{pad}continue");
        }
        Stmt::Discard { .. } => {
            let _ = writeln!(out, "{pad}discard");
        }
        Stmt::Block(stmts) => {
            let _ = writeln!(out, "{pad}block");
            for s in stmts {
                write_stmt(out, s, depth + 1);
            }
        }
    }
}

fn format_expr(expr: &Expr) -> String {
    match expr {
        Expr::FloatLit { value, .. } => format!("{value:?}"),
        Expr::IntLit { value, .. } => value.to_string(),
        Expr::UintLit { value, .. } => format!("{value}u"),
        Expr::BoolLit { value, .. } => value.to_string(),
        Expr::Ident { name, .. } => name.clone(),
        Expr::Unary { op, expr, .. } => format!("({op}{})", format_expr(expr)),
        Expr::Binary {
            op, left, right, ..
        } => format!("({} {op} {})", format_expr(left), format_expr(right)),
        Expr::Ternary {
            condition,
            accept,
            reject,
            ..
        } => format!(
            "({} ? {} : {})",
            format_expr(condition),
            format_expr(accept),
            format_expr(reject)
        ),
        Expr::Call { name, args, .. } => {
            let args: Vec<_> = args.iter().map(format_expr).collect();
            format!("{name}({})", args.join(", "))
        }
        Expr::Index { base, index, .. } => {
            format!("{}[{}]", format_expr(base), format_expr(index))
        }
        Expr::Member { base, member, .. } => format!("{}.{member}", format_expr(base)),
        Expr::IncDec {
            target, increment, ..
        } => format!(
            "({}{})",
            format_expr(target),
            if *increment { "++" } else { "--" }
        ),
    }
}
