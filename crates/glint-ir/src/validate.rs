//! Structural IR validation.
//!
//! Checks the invariants every well-formed module must satisfy: all handles
//! resolve within their arenas, and control flow is structured (`break` and
//! `continue` only inside loops, `discard` only in fragment shaders).
//! A violation is an [`IrError`] — an internal compiler defect — not a user
//! diagnostic.

use crate::arena::{Arena, Handle};
use crate::error::IrError;
use crate::expr::{operands, Expression};
use crate::func::Function;
use crate::stmt::{Callee, Statement};
use crate::{Module, Stage};

/// Validates the structural invariants of a module.
pub fn validate(module: &Module) -> Result<(), IrError> {
    if let Some(ep) = module.entry_point {
        if module.functions.try_get(ep).is_none() {
            return Err(IrError::BadEntryPoint);
        }
    }

    let type_count = module.types.len();

    for (handle, var) in module.global_variables.iter() {
        let context = format!("global `{}` {handle:?}", var.name);
        ensure(var.ty.index(), type_count, &context)?;
        if let Some(init) = var.init {
            ensure(init.index(), module.global_expressions.len(), &context)?;
        }
    }

    validate_expressions(&module.global_expressions, module, "module constants")?;

    for (handle, ext) in module.external_functions.iter() {
        let context = format!("external function `{}` {handle:?}", ext.name);
        if let Some(result) = ext.result {
            ensure(result.index(), type_count, &context)?;
        }
        for ty in &ext.arg_types {
            ensure(ty.index(), type_count, &context)?;
        }
    }

    for (_, func) in module.functions.iter() {
        validate_function(func, module)?;
    }

    Ok(())
}

fn validate_function(func: &Function, module: &Module) -> Result<(), IrError> {
    let context = format!("function '{}'", func.name);
    let type_count = module.types.len();
    let expr_count = func.expressions.len();

    for arg in &func.arguments {
        ensure(arg.ty.index(), type_count, &context)?;
    }
    for (_, local) in func.local_variables.iter() {
        ensure(local.ty.index(), type_count, &context)?;
        if let Some(init) = local.init {
            ensure(init.index(), expr_count, &context)?;
        }
    }

    validate_expressions(&func.expressions, module, &context)?;

    // References out of the expression arena into other arenas.
    for (_, expr) in func.expressions.iter() {
        match *expr {
            Expression::GlobalVariable(h) => {
                ensure(h.index(), module.global_variables.len(), &context)?;
            }
            Expression::LocalVariable(h) => {
                ensure(h.index(), func.local_variables.len(), &context)?;
            }
            Expression::CallResult(h) => {
                ensure(h.index(), module.functions.len(), &context)?;
            }
            Expression::ExternalCallResult(h) => {
                ensure(h.index(), module.external_functions.len(), &context)?;
            }
            Expression::Compose { ty, .. } => {
                ensure(ty.index(), type_count, &context)?;
            }
            Expression::Swizzle { ref pattern, .. } => {
                if pattern.is_empty() || pattern.len() > 4 {
                    return Err(IrError::BadSwizzle {
                        function: func.name.clone(),
                        len: pattern.len(),
                    });
                }
            }
            _ => {}
        }
    }

    validate_block(&func.body, func, module, 0)
}

fn validate_expressions(
    exprs: &Arena<Expression>,
    _module: &Module,
    context: &str,
) -> Result<(), IrError> {
    let len = exprs.len();
    for (_, expr) in exprs.iter() {
        for operand in operands(expr) {
            ensure(operand.index(), len, context)?;
        }
    }
    Ok(())
}

fn validate_block(
    block: &[Statement],
    func: &Function,
    module: &Module,
    loop_depth: u32,
) -> Result<(), IrError> {
    let context = format!("function '{}'", func.name);
    let expr_count = func.expressions.len();
    let check = |h: Handle<Expression>| ensure(h.index(), expr_count, &context);

    for stmt in block {
        match stmt {
            Statement::Store { pointer, value } => {
                check(*pointer)?;
                check(*value)?;
            }
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                check(*condition)?;
                validate_block(accept, func, module, loop_depth)?;
                validate_block(reject, func, module, loop_depth)?;
            }
            Statement::Loop { body, continuing } => {
                validate_block(body, func, module, loop_depth + 1)?;
                validate_block(continuing, func, module, loop_depth + 1)?;
            }
            Statement::Call {
                callee,
                arguments,
                result,
            } => {
                match *callee {
                    Callee::Defined(h) => {
                        ensure(h.index(), module.functions.len(), &context)?;
                    }
                    Callee::External(h) => {
                        ensure(h.index(), module.external_functions.len(), &context)?;
                    }
                }
                for arg in arguments {
                    check(*arg)?;
                }
                if let Some(r) = result {
                    check(*r)?;
                }
            }
            Statement::Break => {
                if loop_depth == 0 {
                    return Err(IrError::MisplacedBreak {
                        function: func.name.clone(),
                    });
                }
            }
            Statement::Continue => {
                if loop_depth == 0 {
                    return Err(IrError::MisplacedContinue {
                        function: func.name.clone(),
                    });
                }
            }
            Statement::Return { value } => {
                if let Some(v) = value {
                    check(*v)?;
                }
            }
            Statement::Discard => {
                if module.stage != Stage::Fragment {
                    return Err(IrError::MisplacedDiscard {
                        function: func.name.clone(),
                        stage: module.stage,
                    });
                }
            }
        }
    }
    Ok(())
}

fn ensure(index: usize, size: usize, context: &str) -> Result<(), IrError> {
    if index < size {
        Ok(())
    } else {
        Err(IrError::BadHandle {
            context: context.to_string(),
            index,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;

    fn module_with_main(stage: Stage) -> (Module, Function) {
        let module = Module::new(stage);
        let func = Function::new("main");
        (module, func)
    }

    #[test]
    fn empty_module_is_valid() {
        let module = Module::new(Stage::Vertex);
        assert!(validate(&module).is_ok());
    }

    #[test]
    fn valid_function_passes() {
        let (mut module, mut func) = module_with_main(Stage::Vertex);
        let lit = func.expressions.append(Expression::Literal(Literal::Float(1.0)));
        func.body.push(Statement::Return { value: Some(lit) });
        let h = module.functions.append(func);
        module.entry_point = Some(h);
        assert!(validate(&module).is_ok());
    }

    #[test]
    fn out_of_bounds_operand_is_reported() {
        let (mut module, mut func) = module_with_main(Stage::Vertex);
        // Mint a handle in a scratch arena larger than the real one.
        let mut scratch = Arena::new();
        for _ in 0..4 {
            scratch.append(Expression::Literal(Literal::Float(0.0)));
        }
        let stale = scratch.append(Expression::Literal(Literal::Float(0.0)));
        func.expressions.append(Expression::Load { pointer: stale });
        module.functions.append(func);
        assert!(matches!(
            validate(&module),
            Err(IrError::BadHandle { .. })
        ));
    }

    #[test]
    fn break_outside_loop_is_reported() {
        let (mut module, mut func) = module_with_main(Stage::Vertex);
        func.body.push(Statement::Break);
        module.functions.append(func);
        assert!(matches!(
            validate(&module),
            Err(IrError::MisplacedBreak { .. })
        ));
    }

    #[test]
    fn break_inside_loop_is_fine() {
        let (mut module, mut func) = module_with_main(Stage::Vertex);
        func.body.push(Statement::Loop {
            body: vec![Statement::Break],
            continuing: vec![],
        });
        module.functions.append(func);
        assert!(validate(&module).is_ok());
    }

    #[test]
    fn discard_requires_fragment_stage() {
        let (mut module, mut func) = module_with_main(Stage::Vertex);
        func.body.push(Statement::Discard);
        module.functions.append(func);
        assert!(matches!(
            validate(&module),
            Err(IrError::MisplacedDiscard { .. })
        ));

        let (mut module, mut func) = module_with_main(Stage::Fragment);
        func.body.push(Statement::Discard);
        module.functions.append(func);
        assert!(validate(&module).is_ok());
    }
}
