//! Dead code elimination pass.
//!
//! Removes statements that cannot execute or cannot be observed: code after
//! a terminator, branches of `if`s with literal conditions, empty `if`s, and
//! stores to locals that are never loaded.

use std::collections::HashSet;

use glint_ir::{
    operands, Arena, Expression, Function, Handle, Literal, LocalVariable, Module, Statement,
};

use crate::copy_prop::pointer_root;
use crate::Pass;

/// Removes unreachable statements and unobservable stores.
#[derive(Debug)]
pub struct DeadCodeElimination;

impl Pass for DeadCodeElimination {
    fn name(&self) -> &str {
        "dce"
    }

    fn run(&self, module: &mut Module) -> bool {
        let mut changed = false;
        for (_, func) in module.functions.iter_mut() {
            changed |= run_on_function(func);
        }
        changed
    }
}

fn run_on_function(func: &mut Function) -> bool {
    let mut body = std::mem::take(&mut func.body);
    let mut changed = simplify_block(&mut body, &func.expressions);

    // Liveness over what remains: statement roots plus local initializers,
    // closed over operands.
    let used = collect_used(&body, &func.local_variables, &func.expressions);
    let loaded = loaded_locals(&used, &func.expressions);
    changed |= remove_dead_stores(&mut body, &loaded, &func.expressions);

    func.body = body;
    changed
}

/// Collapses constant `if`s, drops empty `if`s, and truncates blocks after a
/// terminator.
fn simplify_block(block: &mut Vec<Statement>, exprs: &Arena<Expression>) -> bool {
    let old = std::mem::take(block);
    let mut changed = false;

    for stmt in old {
        match stmt {
            Statement::If {
                condition,
                mut accept,
                mut reject,
            } => {
                changed |= simplify_block(&mut accept, exprs);
                changed |= simplify_block(&mut reject, exprs);
                if let Expression::Literal(Literal::Bool(c)) = &exprs[condition] {
                    changed = true;
                    block.extend(if *c { accept } else { reject });
                } else if accept.is_empty() && reject.is_empty() {
                    // The condition is pure, so an empty if has no effect.
                    changed = true;
                } else {
                    block.push(Statement::If {
                        condition,
                        accept,
                        reject,
                    });
                }
            }
            Statement::Loop {
                mut body,
                mut continuing,
            } => {
                changed |= simplify_block(&mut body, exprs);
                changed |= simplify_block(&mut continuing, exprs);
                // Loops are never dropped: an empty loop body is an
                // intentional infinite loop.
                block.push(Statement::Loop { body, continuing });
            }
            other => block.push(other),
        }
    }

    if let Some(pos) = block.iter().position(|s| s.is_terminator()) {
        if pos + 1 < block.len() {
            block.truncate(pos + 1);
            changed = true;
        }
    }
    changed
}

fn collect_used(
    block: &[Statement],
    locals: &Arena<LocalVariable>,
    exprs: &Arena<Expression>,
) -> HashSet<Handle<Expression>> {
    let mut used = HashSet::new();
    collect_roots(block, &mut used);
    for (_, local) in locals.iter() {
        if let Some(init) = local.init {
            used.insert(init);
        }
    }

    // Transitive closure over operands.
    let mut worklist: Vec<Handle<Expression>> = used.iter().copied().collect();
    while let Some(handle) = worklist.pop() {
        if let Some(expr) = exprs.try_get(handle) {
            for operand in operands(expr) {
                if used.insert(operand) {
                    worklist.push(operand);
                }
            }
        }
    }
    used
}

fn collect_roots(block: &[Statement], used: &mut HashSet<Handle<Expression>>) {
    for stmt in block {
        match stmt {
            Statement::Store { pointer, value } => {
                used.insert(*pointer);
                used.insert(*value);
            }
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                used.insert(*condition);
                collect_roots(accept, used);
                collect_roots(reject, used);
            }
            Statement::Loop { body, continuing } => {
                collect_roots(body, used);
                collect_roots(continuing, used);
            }
            Statement::Call {
                arguments, result, ..
            } => {
                for arg in arguments {
                    used.insert(*arg);
                }
                if let Some(r) = result {
                    used.insert(*r);
                }
            }
            Statement::Return { value } => {
                if let Some(v) = value {
                    used.insert(*v);
                }
            }
            Statement::Break | Statement::Continue | Statement::Discard => {}
        }
    }
}

fn loaded_locals(
    used: &HashSet<Handle<Expression>>,
    exprs: &Arena<Expression>,
) -> HashSet<Handle<LocalVariable>> {
    let mut loaded = HashSet::new();
    for &handle in used {
        if let Some(Expression::Load { pointer }) = exprs.try_get(handle) {
            if let Some(local) = pointer_root(exprs, *pointer) {
                loaded.insert(local);
            }
        }
    }
    loaded
}

fn remove_dead_stores(
    block: &mut Vec<Statement>,
    loaded: &HashSet<Handle<LocalVariable>>,
    exprs: &Arena<Expression>,
) -> bool {
    let old = std::mem::take(block);
    let mut changed = false;

    for stmt in old {
        match stmt {
            Statement::Store { pointer, value } => match pointer_root(exprs, pointer) {
                Some(local) if !loaded.contains(&local) => {
                    changed = true;
                }
                _ => block.push(Statement::Store { pointer, value }),
            },
            Statement::If {
                condition,
                mut accept,
                mut reject,
            } => {
                changed |= remove_dead_stores(&mut accept, loaded, exprs);
                changed |= remove_dead_stores(&mut reject, loaded, exprs);
                block.push(Statement::If {
                    condition,
                    accept,
                    reject,
                });
            }
            Statement::Loop {
                mut body,
                mut continuing,
            } => {
                changed |= remove_dead_stores(&mut body, loaded, exprs);
                changed |= remove_dead_stores(&mut continuing, loaded, exprs);
                block.push(Statement::Loop { body, continuing });
            }
            other => block.push(other),
        }
    }
    changed
}
