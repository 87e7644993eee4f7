//! Constant folding pass.
//!
//! Evaluates operators and math intrinsics whose operands are literals,
//! replacing the expression with the resulting literal in place. Division by
//! zero and overflowing integer arithmetic are left unfolded.

use glint_ir::{Arena, BinaryOp, Expression, Handle, Literal, MathFunction, Module, UnaryOp};

use crate::Pass;

/// Folds constant expressions at compile time.
#[derive(Debug)]
pub struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &str {
        "const-fold"
    }

    fn run(&self, module: &mut Module) -> bool {
        let mut changed = fold_arena(&mut module.global_expressions);
        for (_, func) in module.functions.iter_mut() {
            changed |= fold_arena(&mut func.expressions);
        }
        changed
    }
}

fn fold_arena(exprs: &mut Arena<Expression>) -> bool {
    let mut changed = false;

    // Collect handles first so the arena is not borrowed while rewriting.
    let handles: Vec<Handle<Expression>> = exprs.iter().map(|(h, _)| h).collect();

    for handle in handles {
        let replacement = match &exprs[handle] {
            Expression::Binary { op, left, right } => {
                match (&exprs[*left], &exprs[*right]) {
                    (Expression::Literal(l), Expression::Literal(r)) => {
                        fold_binary(*op, *l, *r).map(Expression::Literal)
                    }
                    _ => None,
                }
            }
            Expression::Unary { op, expr } => match &exprs[*expr] {
                Expression::Literal(lit) => fold_unary(*op, *lit).map(Expression::Literal),
                _ => None,
            },
            Expression::Select {
                condition,
                accept,
                reject,
            } => match &exprs[*condition] {
                // Operands always precede their uses in the arena, so the
                // clone cannot be self-referential.
                Expression::Literal(Literal::Bool(c)) => {
                    Some(exprs[if *c { *accept } else { *reject }].clone())
                }
                _ => None,
            },
            Expression::Math {
                fun,
                arg,
                arg1,
                arg2,
            } => fold_math(
                *fun,
                &exprs[*arg],
                arg1.map(|h| &exprs[h]),
                arg2.map(|h| &exprs[h]),
            )
            .map(Expression::Literal),
            _ => None,
        };

        if let Some(new_expr) = replacement {
            exprs[handle] = new_expr;
            changed = true;
        }
    }

    changed
}

fn fold_binary(op: BinaryOp, left: Literal, right: Literal) -> Option<Literal> {
    match (left, right) {
        (Literal::Float(l), Literal::Float(r)) => fold_float(op, l, r),
        (Literal::Int(l), Literal::Int(r)) => fold_int(op, l, r),
        (Literal::Uint(l), Literal::Uint(r)) => fold_uint(op, l, r),
        (Literal::Bool(l), Literal::Bool(r)) => fold_bool(op, l, r),
        _ => None,
    }
}

fn fold_float(op: BinaryOp, l: f32, r: f32) -> Option<Literal> {
    match op {
        BinaryOp::Add => Some(Literal::Float(l + r)),
        BinaryOp::Subtract => Some(Literal::Float(l - r)),
        BinaryOp::Multiply => Some(Literal::Float(l * r)),
        BinaryOp::Divide if r != 0.0 => Some(Literal::Float(l / r)),
        BinaryOp::Modulo if r != 0.0 => Some(Literal::Float(l % r)),
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::Less => Some(Literal::Bool(l < r)),
        BinaryOp::LessEqual => Some(Literal::Bool(l <= r)),
        BinaryOp::Greater => Some(Literal::Bool(l > r)),
        BinaryOp::GreaterEqual => Some(Literal::Bool(l >= r)),
        _ => None,
    }
}

fn fold_int(op: BinaryOp, l: i32, r: i32) -> Option<Literal> {
    match op {
        BinaryOp::Add => l.checked_add(r).map(Literal::Int),
        BinaryOp::Subtract => l.checked_sub(r).map(Literal::Int),
        BinaryOp::Multiply => l.checked_mul(r).map(Literal::Int),
        BinaryOp::Divide => l.checked_div(r).map(Literal::Int),
        BinaryOp::Modulo => l.checked_rem(r).map(Literal::Int),
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::Less => Some(Literal::Bool(l < r)),
        BinaryOp::LessEqual => Some(Literal::Bool(l <= r)),
        BinaryOp::Greater => Some(Literal::Bool(l > r)),
        BinaryOp::GreaterEqual => Some(Literal::Bool(l >= r)),
        _ => None,
    }
}

fn fold_uint(op: BinaryOp, l: u32, r: u32) -> Option<Literal> {
    match op {
        BinaryOp::Add => l.checked_add(r).map(Literal::Uint),
        BinaryOp::Subtract => l.checked_sub(r).map(Literal::Uint),
        BinaryOp::Multiply => l.checked_mul(r).map(Literal::Uint),
        BinaryOp::Divide => l.checked_div(r).map(Literal::Uint),
        BinaryOp::Modulo => l.checked_rem(r).map(Literal::Uint),
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::Less => Some(Literal::Bool(l < r)),
        BinaryOp::LessEqual => Some(Literal::Bool(l <= r)),
        BinaryOp::Greater => Some(Literal::Bool(l > r)),
        BinaryOp::GreaterEqual => Some(Literal::Bool(l >= r)),
        _ => None,
    }
}

fn fold_bool(op: BinaryOp, l: bool, r: bool) -> Option<Literal> {
    match op {
        BinaryOp::Equal => Some(Literal::Bool(l == r)),
        BinaryOp::NotEqual => Some(Literal::Bool(l != r)),
        BinaryOp::LogicalAnd => Some(Literal::Bool(l && r)),
        BinaryOp::LogicalOr => Some(Literal::Bool(l || r)),
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, lit: Literal) -> Option<Literal> {
    match (op, lit) {
        (UnaryOp::Negate, Literal::Float(v)) => Some(Literal::Float(-v)),
        (UnaryOp::Negate, Literal::Int(v)) => v.checked_neg().map(Literal::Int),
        (UnaryOp::LogicalNot, Literal::Bool(v)) => Some(Literal::Bool(!v)),
        _ => None,
    }
}

fn float_of(expr: &Expression) -> Option<f32> {
    match expr {
        Expression::Literal(Literal::Float(v)) => Some(*v),
        _ => None,
    }
}

fn fold_math(
    fun: MathFunction,
    arg: &Expression,
    arg1: Option<&Expression>,
    arg2: Option<&Expression>,
) -> Option<Literal> {
    let x = float_of(arg)?;
    let folded = match fun {
        MathFunction::Abs => x.abs(),
        MathFunction::Floor => x.floor(),
        MathFunction::Ceil => x.ceil(),
        MathFunction::Fract => x - x.floor(),
        MathFunction::Sin => x.sin(),
        MathFunction::Cos => x.cos(),
        MathFunction::Tan => x.tan(),
        MathFunction::Exp => x.exp(),
        MathFunction::Exp2 => x.exp2(),
        MathFunction::Sqrt if x >= 0.0 => x.sqrt(),
        MathFunction::InverseSqrt if x > 0.0 => 1.0 / x.sqrt(),
        MathFunction::Log if x > 0.0 => x.ln(),
        MathFunction::Log2 if x > 0.0 => x.log2(),
        MathFunction::Radians => x.to_radians(),
        MathFunction::Degrees => x.to_degrees(),

        MathFunction::Min => x.min(float_of(arg1?)?),
        MathFunction::Max => x.max(float_of(arg1?)?),
        MathFunction::Pow => {
            let result = x.powf(float_of(arg1?)?);
            if !result.is_finite() {
                return None;
            }
            result
        }
        MathFunction::Mod => {
            let y = float_of(arg1?)?;
            if y == 0.0 {
                return None;
            }
            x - y * (x / y).floor()
        }
        MathFunction::Step => {
            let edge = x;
            let v = float_of(arg1?)?;
            if v < edge {
                0.0
            } else {
                1.0
            }
        }

        MathFunction::Clamp => {
            let lo = float_of(arg1?)?;
            let hi = float_of(arg2?)?;
            if lo > hi {
                return None;
            }
            x.clamp(lo, hi)
        }
        MathFunction::Mix => {
            let y = float_of(arg1?)?;
            let t = float_of(arg2?)?;
            x * (1.0 - t) + y * t
        }

        _ => return None,
    };
    Some(Literal::Float(folded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ir::Function;

    fn literal(func: &Function, handle: Handle<Expression>) -> Literal {
        match func.expressions[handle] {
            Expression::Literal(lit) => lit,
            ref other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn folds_float_addition() {
        let mut func = Function::new("test");
        let a = func.expressions.append(Expression::Literal(Literal::Float(1.5)));
        let b = func.expressions.append(Expression::Literal(Literal::Float(2.5)));
        let add = func.expressions.append(Expression::Binary {
            op: BinaryOp::Add,
            left: a,
            right: b,
        });

        assert!(fold_arena(&mut func.expressions));
        match literal(&func, add) {
            Literal::Float(v) => assert_eq!(v, 4.0),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn int_division_by_zero_is_not_folded() {
        let mut func = Function::new("test");
        let a = func.expressions.append(Expression::Literal(Literal::Int(4)));
        let b = func.expressions.append(Expression::Literal(Literal::Int(0)));
        let div = func.expressions.append(Expression::Binary {
            op: BinaryOp::Divide,
            left: a,
            right: b,
        });

        assert!(!fold_arena(&mut func.expressions));
        assert!(matches!(
            func.expressions[div],
            Expression::Binary { .. }
        ));
    }

    #[test]
    fn folds_comparison_to_bool() {
        let mut func = Function::new("test");
        let a = func.expressions.append(Expression::Literal(Literal::Int(1)));
        let b = func.expressions.append(Expression::Literal(Literal::Int(2)));
        let cmp = func.expressions.append(Expression::Binary {
            op: BinaryOp::Less,
            left: a,
            right: b,
        });

        assert!(fold_arena(&mut func.expressions));
        assert!(matches!(literal(&func, cmp), Literal::Bool(true)));
    }

    #[test]
    fn folds_select_with_literal_condition() {
        let mut func = Function::new("test");
        let cond = func.expressions.append(Expression::Literal(Literal::Bool(false)));
        let a = func.expressions.append(Expression::Literal(Literal::Float(1.0)));
        let b = func.expressions.append(Expression::Literal(Literal::Float(2.0)));
        let select = func.expressions.append(Expression::Select {
            condition: cond,
            accept: a,
            reject: b,
        });

        assert!(fold_arena(&mut func.expressions));
        match literal(&func, select) {
            Literal::Float(v) => assert_eq!(v, 2.0),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn folds_math_intrinsics() {
        let mut func = Function::new("test");
        let x = func.expressions.append(Expression::Literal(Literal::Float(9.0)));
        let sqrt = func.expressions.append(Expression::Math {
            fun: MathFunction::Sqrt,
            arg: x,
            arg1: None,
            arg2: None,
        });
        let lo = func.expressions.append(Expression::Literal(Literal::Float(0.0)));
        let hi = func.expressions.append(Expression::Literal(Literal::Float(2.0)));
        let clamp = func.expressions.append(Expression::Math {
            fun: MathFunction::Clamp,
            arg: sqrt,
            arg1: Some(lo),
            arg2: Some(hi),
        });

        assert!(fold_arena(&mut func.expressions));
        match literal(&func, sqrt) {
            Literal::Float(v) => assert_eq!(v, 3.0),
            other => panic!("expected float, got {other:?}"),
        }
        // The clamp folds once its argument is a literal (same sweep, since
        // the argument precedes it in the arena).
        match literal(&func, clamp) {
            Literal::Float(v) => assert_eq!(v, 2.0),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn sqrt_of_negative_is_not_folded() {
        let mut func = Function::new("test");
        let x = func.expressions.append(Expression::Literal(Literal::Float(-1.0)));
        func.expressions.append(Expression::Math {
            fun: MathFunction::Sqrt,
            arg: x,
            arg1: None,
            arg2: None,
        });
        assert!(!fold_arena(&mut func.expressions));
    }

    #[test]
    fn folding_is_idempotent() {
        let mut func = Function::new("test");
        let a = func.expressions.append(Expression::Literal(Literal::Float(1.0)));
        let b = func.expressions.append(Expression::Literal(Literal::Float(2.0)));
        func.expressions.append(Expression::Binary {
            op: BinaryOp::Multiply,
            left: a,
            right: b,
        });

        assert!(fold_arena(&mut func.expressions));
        assert!(!fold_arena(&mut func.expressions));
    }
}
