//! Copy propagation pass.
//!
//! A local whose initializer is a literal and that is never stored to holds
//! the same value for its whole lifetime; every load of it can be replaced
//! by the literal, which unblocks further constant folding.

use std::collections::{HashMap, HashSet};

use glint_ir::{
    Arena, Expression, Function, Handle, Literal, LocalVariable, Module, Statement,
};

use crate::Pass;

/// Replaces loads of single-assignment literal locals with the literal.
#[derive(Debug)]
pub struct CopyPropagation;

impl Pass for CopyPropagation {
    fn name(&self) -> &str {
        "copy-prop"
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
    let mut stored = HashSet::new();
    collect_stored(&func.body, &func.expressions, &mut stored);

    let mut literals: HashMap<Handle<LocalVariable>, Literal> = HashMap::new();
    for (handle, local) in func.local_variables.iter() {
        if stored.contains(&handle) {
            continue;
        }
        if let Some(init) = local.init {
            if let Expression::Literal(lit) = func.expressions[init] {
                literals.insert(handle, lit);
            }
        }
    }
    if literals.is_empty() {
        return false;
    }

    let handles: Vec<Handle<Expression>> = func.expressions.iter().map(|(h, _)| h).collect();
    let mut changed = false;
    for handle in handles {
        let replacement = match &func.expressions[handle] {
            Expression::Load { pointer } => match &func.expressions[*pointer] {
                Expression::LocalVariable(local) => {
                    literals.get(local).copied().map(Expression::Literal)
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(new_expr) = replacement {
            func.expressions[handle] = new_expr;
            changed = true;
        }
    }
    changed
}

/// Records the root local of every stored-through pointer, including stores
/// through `Access` chains (a partial store disqualifies the whole local).
fn collect_stored(
    block: &[Statement],
    exprs: &Arena<Expression>,
    out: &mut HashSet<Handle<LocalVariable>>,
) {
    for stmt in block {
        match stmt {
            Statement::Store { pointer, .. } => {
                if let Some(local) = pointer_root(exprs, *pointer) {
                    out.insert(local);
                }
            }
            Statement::If { accept, reject, .. } => {
                collect_stored(accept, exprs, out);
                collect_stored(reject, exprs, out);
            }
            Statement::Loop { body, continuing } => {
                collect_stored(body, exprs, out);
                collect_stored(continuing, exprs, out);
            }
            _ => {}
        }
    }
}

/// Follows `Access`/`AccessIndex` chains back to the local a pointer names,
/// if any.
pub(crate) fn pointer_root(
    exprs: &Arena<Expression>,
    mut handle: Handle<Expression>,
) -> Option<Handle<LocalVariable>> {
    loop {
        match &exprs[handle] {
            Expression::LocalVariable(local) => return Some(*local),
            Expression::Access { base, .. } | Expression::AccessIndex { base, .. } => {
                handle = *base;
            }
            _ => return None,
        }
    }
}
