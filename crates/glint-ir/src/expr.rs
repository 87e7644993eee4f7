//! Expressions: pure values referenced by handle.

use crate::arena::Handle;
use crate::types::{Scalar, Type};

/// A vector swizzle component.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SwizzleComponent {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

impl SwizzleComponent {
    /// Maps a GLSL component character (`xyzw`, `rgba`, or `stpq`) to a component.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'x' | 'r' | 's' => Some(Self::X),
            'y' | 'g' | 't' => Some(Self::Y),
            'z' | 'b' | 'p' => Some(Self::Z),
            'w' | 'a' | 'q' => Some(Self::W),
            _ => None,
        }
    }
}

/// A literal constant value.
#[derive(Clone, Copy, Debug)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
}

impl Literal {
    /// Returns the scalar type of this literal.
    pub fn scalar(&self) -> Scalar {
        match *self {
            Self::Bool(_) => Scalar::BOOL,
            Self::Int(_) => Scalar::I32,
            Self::Uint(_) => Scalar::U32,
            Self::Float(_) => Scalar::F32,
        }
    }
}

/// A unary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
}

/// A built-in math function lowered to an IR intrinsic.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MathFunction {
    // Component-wise
    Abs,
    Sign,
    Min,
    Max,
    Clamp,
    // Rounding
    Floor,
    Ceil,
    Fract,
    Mod,
    // Trigonometric
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    // Exponential
    Pow,
    Exp,
    Exp2,
    Log,
    Log2,
    Sqrt,
    InverseSqrt,
    // Geometric
    Dot,
    Cross,
    Normalize,
    Length,
    Distance,
    Reflect,
    // Interpolation
    Mix,
    Step,
    SmoothStep,
}

impl MathFunction {
    /// Maps a GLSL built-in function name to an intrinsic.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "sign" => Self::Sign,
            "min" => Self::Min,
            "max" => Self::Max,
            "clamp" => Self::Clamp,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "fract" => Self::Fract,
            "mod" => Self::Mod,
            "radians" => Self::Radians,
            "degrees" => Self::Degrees,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "pow" => Self::Pow,
            "exp" => Self::Exp,
            "exp2" => Self::Exp2,
            "log" => Self::Log,
            "log2" => Self::Log2,
            "sqrt" => Self::Sqrt,
            "inversesqrt" => Self::InverseSqrt,
            "dot" => Self::Dot,
            "cross" => Self::Cross,
            "normalize" => Self::Normalize,
            "length" => Self::Length,
            "distance" => Self::Distance,
            "reflect" => Self::Reflect,
            "mix" => Self::Mix,
            "step" => Self::Step,
            "smoothstep" => Self::SmoothStep,
            _ => return None,
        })
    }

    /// The GLSL spelling of this intrinsic.
    pub fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Sign => "sign",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Fract => "fract",
            Self::Mod => "mod",
            Self::Radians => "radians",
            Self::Degrees => "degrees",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Pow => "pow",
            Self::Exp => "exp",
            Self::Exp2 => "exp2",
            Self::Log => "log",
            Self::Log2 => "log2",
            Self::Sqrt => "sqrt",
            Self::InverseSqrt => "inversesqrt",
            Self::Dot => "dot",
            Self::Cross => "cross",
            Self::Normalize => "normalize",
            Self::Length => "length",
            Self::Distance => "distance",
            Self::Reflect => "reflect",
            Self::Mix => "mix",
            Self::Step => "step",
            Self::SmoothStep => "smoothstep",
        }
    }

    /// Accepted argument counts as an inclusive `(min, max)` range.
    ///
    /// `atan` has both one- and two-argument forms.
    pub fn argument_range(self) -> (usize, usize) {
        match self {
            Self::Abs
            | Self::Sign
            | Self::Floor
            | Self::Ceil
            | Self::Fract
            | Self::Radians
            | Self::Degrees
            | Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::Asin
            | Self::Acos
            | Self::Exp
            | Self::Exp2
            | Self::Log
            | Self::Log2
            | Self::Sqrt
            | Self::InverseSqrt
            | Self::Normalize
            | Self::Length => (1, 1),
            Self::Atan => (1, 2),
            Self::Min
            | Self::Max
            | Self::Mod
            | Self::Pow
            | Self::Dot
            | Self::Cross
            | Self::Distance
            | Self::Reflect
            | Self::Step => (2, 2),
            Self::Clamp | Self::Mix | Self::SmoothStep => (3, 3),
        }
    }
}

/// An expression — a pure SSA value referenced by [`Handle`].
///
/// Expressions live in per-function arenas (or the module-level constant
/// arena) and never have side effects; calls are statements that deposit
/// their value in a `CallResult`/`ExternalCallResult` expression.
#[derive(Clone, Debug)]
pub enum Expression {
    /// A literal constant.
    Literal(Literal),
    /// Construct a vector or matrix from components (`vec4(...)`).
    Compose {
        ty: Handle<Type>,
        components: Vec<Handle<Expression>>,
    },
    /// Reference to a function argument by index.
    FunctionArgument(u32),
    /// Reference to a global variable (produces a pointer).
    GlobalVariable(Handle<crate::GlobalVariable>),
    /// Reference to a local variable (produces a pointer).
    LocalVariable(Handle<crate::LocalVariable>),
    /// Load a value through a pointer.
    Load { pointer: Handle<Expression> },
    /// Dynamic index into an array or vector.
    Access {
        base: Handle<Expression>,
        index: Handle<Expression>,
    },
    /// Static index into a composite (single swizzle component, array slot).
    AccessIndex {
        base: Handle<Expression>,
        index: u32,
    },
    /// Select 2–4 vector components (`v.xyz`).
    Swizzle {
        vector: Handle<Expression>,
        pattern: Vec<SwizzleComponent>,
    },
    /// Apply a unary operator.
    Unary {
        op: UnaryOp,
        expr: Handle<Expression>,
    },
    /// Apply a binary operator.
    Binary {
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
    },
    /// Select between two values based on a condition (`c ? a : b`).
    Select {
        condition: Handle<Expression>,
        accept: Handle<Expression>,
        reject: Handle<Expression>,
    },
    /// Call a built-in math intrinsic.
    Math {
        fun: MathFunction,
        arg: Handle<Expression>,
        arg1: Option<Handle<Expression>>,
        arg2: Option<Handle<Expression>>,
    },
    /// The result of a user function call (paired with a `Call` statement).
    CallResult(Handle<crate::Function>),
    /// The result of a call to a link-resolved built-in (paired with a `Call`
    /// statement whose callee is external).
    ExternalCallResult(Handle<crate::ExternalFunction>),
}

/// Returns all expression handles directly referenced by an expression.
pub fn operands(expr: &Expression) -> Vec<Handle<Expression>> {
    match expr {
        Expression::Literal(_)
        | Expression::FunctionArgument(_)
        | Expression::GlobalVariable(_)
        | Expression::LocalVariable(_)
        | Expression::CallResult(_)
        | Expression::ExternalCallResult(_) => vec![],

        Expression::Load { pointer } => vec![*pointer],
        Expression::Unary { expr, .. } => vec![*expr],
        Expression::AccessIndex { base, .. } => vec![*base],
        Expression::Swizzle { vector, .. } => vec![*vector],

        Expression::Binary { left, right, .. } => vec![*left, *right],
        Expression::Access { base, index } => vec![*base, *index],
        Expression::Select {
            condition,
            accept,
            reject,
        } => vec![*condition, *accept, *reject],

        Expression::Compose { components, .. } => components.clone(),
        Expression::Math {
            arg, arg1, arg2, ..
        } => {
            let mut ops = vec![*arg];
            if let Some(a) = arg1 {
                ops.push(*a);
            }
            if let Some(a) = arg2 {
                ops.push(*a);
            }
            ops
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::types::ScalarKind;

    #[test]
    fn literal_scalars() {
        assert_eq!(Literal::Float(1.0).scalar().kind, ScalarKind::Float);
        assert_eq!(Literal::Int(-1).scalar().kind, ScalarKind::Sint);
        assert_eq!(Literal::Uint(2).scalar().kind, ScalarKind::Uint);
        assert_eq!(Literal::Bool(true).scalar().kind, ScalarKind::Bool);
    }

    #[test]
    fn swizzle_component_aliases() {
        assert_eq!(SwizzleComponent::from_char('x'), Some(SwizzleComponent::X));
        assert_eq!(SwizzleComponent::from_char('r'), Some(SwizzleComponent::X));
        assert_eq!(SwizzleComponent::from_char('q'), Some(SwizzleComponent::W));
        assert_eq!(SwizzleComponent::from_char('m'), None);
    }

    #[test]
    fn math_function_names_round_trip() {
        for name in ["abs", "inversesqrt", "smoothstep", "atan"] {
            let fun = MathFunction::from_name(name).unwrap();
            assert_eq!(fun.name(), name);
        }
        assert_eq!(MathFunction::from_name("texture2D"), None);
    }

    #[test]
    fn operand_collection() {
        let mut exprs = Arena::new();
        let a = exprs.append(Expression::Literal(Literal::Float(1.0)));
        let b = exprs.append(Expression::Literal(Literal::Float(2.0)));
        let add = exprs.append(Expression::Binary {
            op: BinaryOp::Add,
            left: a,
            right: b,
        });
        assert_eq!(operands(&exprs[add]), vec![a, b]);
        assert!(operands(&exprs[a]).is_empty());
    }
}
