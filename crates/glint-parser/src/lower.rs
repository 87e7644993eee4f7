//! Lowering pass: AST → `glint_ir::Module`.
//!
//! Walks declarations in source order, so anything referenced must already
//! be declared. Besides the module itself, lowering extracts the unit's
//! exported symbols (interface variables) and the names of declared-but-
//! undefined functions it needs the linker to resolve.

use std::collections::HashMap;

use glint_ir::{
    self as ir, Callee, Diagnostic, DiagnosticLog, Expression, ExportedSymbol, Handle, Literal,
    MathFunction, Scalar, Stage, Statement, StorageQualifier, SwizzleComponent, SymbolTable,
    TextureDimension, TypeInner, UnaryOp, VectorSize,
};

use crate::ast::{AssignOp, Ast, Decl, Expr, FunctionDecl, Qualifier, Stmt, TypeSpec, VarDecl};

/// The output of a successful lowering pass.
#[derive(Debug)]
pub struct LoweredUnit {
    pub module: ir::Module,
    pub symbols: SymbolTable,
    /// Names the linker must resolve against the built-in registry, in
    /// first-use order.
    pub required_builtins: Vec<String>,
}

/// Lowering hit an error; the details are in the diagnostic log.
#[derive(Debug, thiserror::Error)]
#[error("lowering aborted after an error diagnostic")]
pub struct LowerError;

/// Lowers a parsed unit for the given stage. Error diagnostics are pushed
/// onto `diags` before `Err` is returned.
pub fn lower(
    ast: &Ast,
    stage: Stage,
    diags: &mut DiagnosticLog,
) -> Result<LoweredUnit, LowerError> {
    let mut ctx = LowerCtx {
        stage,
        module: ir::Module::new(stage),
        symbols: SymbolTable::new(),
        required_builtins: Vec::new(),
        globals: HashMap::new(),
        functions: HashMap::new(),
        prototypes: HashMap::new(),
        externals: HashMap::new(),
        diags,
    };

    for decl in &ast.decls {
        match decl {
            Decl::Variable(var) => ctx.lower_global(var)?,
            Decl::Function(func) => ctx.lower_function_decl(func)?,
        }
    }

    log::debug!(
        "lowered {} stage: {} function(s), {} global(s), {} required built-in(s)",
        stage,
        ctx.module.functions.len(),
        ctx.module.global_variables.len(),
        ctx.required_builtins.len()
    );

    Ok(LoweredUnit {
        module: ctx.module,
        symbols: ctx.symbols,
        required_builtins: ctx.required_builtins,
    })
}

#[derive(Clone)]
struct Prototype {
    result: Option<Handle<ir::Type>>,
    arg_types: Vec<Handle<ir::Type>>,
}

struct LowerCtx<'a> {
    stage: Stage,
    module: ir::Module,
    symbols: SymbolTable,
    required_builtins: Vec<String>,
    globals: HashMap<String, Handle<ir::GlobalVariable>>,
    functions: HashMap<String, Handle<ir::Function>>,
    prototypes: HashMap<String, Prototype>,
    externals: HashMap<String, Handle<ir::ExternalFunction>>,
    diags: &'a mut DiagnosticLog,
}

/// Per-function lowering state: the function under construction plus name
/// resolution scopes.
struct FuncCtx {
    function: ir::Function,
    args: HashMap<String, u32>,
    scopes: Vec<HashMap<String, Handle<ir::LocalVariable>>>,
    loop_depth: u32,
}

impl FuncCtx {
    fn add_expr(&mut self, expr: Expression) -> Handle<Expression> {
        self.function.expressions.append(expr)
    }

    fn lookup_local(&self, name: &str) -> Option<Handle<ir::LocalVariable>> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declares a name in the innermost scope; `false` on redefinition.
    fn declare(&mut self, name: String, handle: Handle<ir::LocalVariable>) -> bool {
        match self.scopes.last_mut() {
            Some(scope) => scope.insert(name, handle).is_none(),
            None => false,
        }
    }
}

fn vec_size(n: u8) -> VectorSize {
    match n {
        2 => VectorSize::Bi,
        3 => VectorSize::Tri,
        _ => VectorSize::Quad,
    }
}

fn type_inner(spec: TypeSpec) -> Option<TypeInner> {
    Some(match spec {
        TypeSpec::Void => return None,
        TypeSpec::Float => TypeInner::Scalar(Scalar::F32),
        TypeSpec::Int => TypeInner::Scalar(Scalar::I32),
        TypeSpec::Uint => TypeInner::Scalar(Scalar::U32),
        TypeSpec::Bool => TypeInner::Scalar(Scalar::BOOL),
        TypeSpec::Vec(n) => TypeInner::Vector {
            size: vec_size(n),
            scalar: Scalar::F32,
        },
        TypeSpec::IVec(n) => TypeInner::Vector {
            size: vec_size(n),
            scalar: Scalar::I32,
        },
        TypeSpec::UVec(n) => TypeInner::Vector {
            size: vec_size(n),
            scalar: Scalar::U32,
        },
        TypeSpec::BVec(n) => TypeInner::Vector {
            size: vec_size(n),
            scalar: Scalar::BOOL,
        },
        TypeSpec::Mat(n) => TypeInner::Matrix {
            columns: vec_size(n),
            rows: vec_size(n),
        },
        TypeSpec::Sampler2D => TypeInner::Sampler {
            dim: TextureDimension::D2,
        },
        TypeSpec::SamplerCube => TypeInner::Sampler {
            dim: TextureDimension::Cube,
        },
    })
}

/// Predeclared `gl_*` variables, by stage.
fn builtin_variable(name: &str, stage: Stage) -> Option<(TypeInner, StorageQualifier)> {
    let vec4 = TypeInner::Vector {
        size: VectorSize::Quad,
        scalar: Scalar::F32,
    };
    match (name, stage) {
        ("gl_Position", Stage::Vertex | Stage::Geometry) => Some((vec4, StorageQualifier::Output)),
        ("gl_PointSize", Stage::Vertex) => {
            Some((TypeInner::Scalar(Scalar::F32), StorageQualifier::Output))
        }
        ("gl_VertexID", Stage::Vertex) => {
            Some((TypeInner::Scalar(Scalar::I32), StorageQualifier::Input))
        }
        ("gl_FragCoord", Stage::Fragment) => Some((vec4, StorageQualifier::Input)),
        ("gl_FrontFacing", Stage::Fragment) => {
            Some((TypeInner::Scalar(Scalar::BOOL), StorageQualifier::Input))
        }
        ("gl_FragColor", Stage::Fragment) => Some((vec4, StorageQualifier::Output)),
        ("gl_FragDepth", Stage::Fragment) => {
            Some((TypeInner::Scalar(Scalar::F32), StorageQualifier::Output))
        }
        _ => None,
    }
}

impl LowerCtx<'_> {
    fn err(&mut self, line: u32, message: impl Into<String>) -> LowerError {
        self.diags.push(Diagnostic::error(message).with_line(line));
        LowerError
    }

    fn type_handle(&mut self, spec: TypeSpec) -> Option<Handle<ir::Type>> {
        let inner = type_inner(spec)?;
        Some(self.module.types.insert(ir::Type { name: None, inner }))
    }

    /// Resolves a declaration's type, wrapping arrays.
    fn var_type(
        &mut self,
        spec: TypeSpec,
        array_size: Option<u32>,
        line: u32,
    ) -> Result<Handle<ir::Type>, LowerError> {
        let base = match self.type_handle(spec) {
            Some(handle) => handle,
            None => return Err(self.err(line, "variables cannot be declared `void`")),
        };
        match array_size {
            None => Ok(base),
            Some(size) => Ok(self.module.types.insert(ir::Type {
                name: None,
                inner: TypeInner::Array { base, size },
            })),
        }
    }

    // -----------------------------------------------------------------------
    // Globals
    // -----------------------------------------------------------------------

    fn lower_global(&mut self, var: &VarDecl) -> Result<(), LowerError> {
        if self.globals.contains_key(&var.name)
            || self.functions.contains_key(&var.name)
            || self.prototypes.contains_key(&var.name)
        {
            return Err(self.err(var.line, format!("redefinition of `{}`", var.name)));
        }

        let qualifier = match var.qualifier {
            None => StorageQualifier::Private,
            Some(Qualifier::Const) => StorageQualifier::Constant,
            Some(Qualifier::Uniform) => StorageQualifier::Uniform,
            Some(Qualifier::In) | Some(Qualifier::Attribute) => StorageQualifier::Input,
            Some(Qualifier::Out) => StorageQualifier::Output,
            Some(Qualifier::Varying) => match self.stage {
                Stage::Vertex => StorageQualifier::Output,
                _ => StorageQualifier::Input,
            },
        };

        let ty = self.var_type(var.ty, var.array_size, var.line)?;

        let init = match (qualifier, &var.init) {
            (StorageQualifier::Constant, None) => {
                return Err(self.err(
                    var.line,
                    format!("const variable `{}` requires an initializer", var.name),
                ));
            }
            (StorageQualifier::Constant | StorageQualifier::Private, Some(expr)) => {
                Some(self.lower_const_expr(expr)?)
            }
            (StorageQualifier::Private, None) => None,
            (_, Some(_)) => {
                return Err(self.err(
                    var.line,
                    format!(
                        "`{}` variable `{}` cannot have an initializer",
                        qualifier, var.name
                    ),
                ));
            }
            (_, None) => None,
        };

        let handle = self.module.global_variables.append(ir::GlobalVariable {
            name: var.name.clone(),
            qualifier,
            ty,
            init,
            location: var.location,
            builtin: false,
        });
        self.globals.insert(var.name.clone(), handle);

        if qualifier.is_interface() {
            let ty_string = ir::format_type(&self.module.types[ty], &self.module.types);
            self.symbols.insert(ExportedSymbol {
                name: var.name.clone(),
                qualifier,
                ty: ty_string,
                location: var.location,
            });
        }
        Ok(())
    }

    /// Lowers a constant expression into the module's constant arena.
    fn lower_const_expr(&mut self, expr: &Expr) -> Result<Handle<Expression>, LowerError> {
        let lowered = match expr {
            Expr::FloatLit { value, .. } => Expression::Literal(Literal::Float(*value)),
            Expr::IntLit { value, .. } => Expression::Literal(Literal::Int(*value)),
            Expr::UintLit { value, .. } => Expression::Literal(Literal::Uint(*value)),
            Expr::BoolLit { value, .. } => Expression::Literal(Literal::Bool(*value)),
            Expr::Unary { op, expr, .. } => {
                let operand = self.lower_const_expr(expr)?;
                Expression::Unary {
                    op: *op,
                    expr: operand,
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.lower_const_expr(left)?;
                let right = self.lower_const_expr(right)?;
                Expression::Binary {
                    op: *op,
                    left,
                    right,
                }
            }
            other => {
                return Err(self.err(
                    other.line(),
                    "global initializers must be constant expressions",
                ));
            }
        };
        Ok(self.module.global_expressions.append(lowered))
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    fn lower_function_decl(&mut self, decl: &FunctionDecl) -> Result<(), LowerError> {
        let result = self.type_handle(decl.result);

        let mut arg_types = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            match self.type_handle(param.ty) {
                Some(handle) => arg_types.push(handle),
                None => {
                    return Err(self.err(param.line, "parameters cannot be `void`"));
                }
            }
        }

        if decl.body.is_none() {
            // A prototype; redundant after a definition, otherwise recorded
            // for call resolution.
            if !self.functions.contains_key(&decl.name) {
                self.prototypes
                    .insert(decl.name.clone(), Prototype { result, arg_types });
            }
            return Ok(());
        }

        if self.functions.contains_key(&decl.name) || self.globals.contains_key(&decl.name) {
            return Err(self.err(decl.line, format!("redefinition of `{}`", decl.name)));
        }
        if decl.name == "main" && (result.is_some() || !decl.params.is_empty()) {
            return Err(self.err(decl.line, "main must be declared as `void main()`"));
        }

        let mut function = ir::Function::new(decl.name.clone());
        function.result = result;
        let mut args = HashMap::new();
        for (index, param) in decl.params.iter().enumerate() {
            function.arguments.push(ir::FunctionArgument {
                name: param.name.clone(),
                ty: arg_types[index],
            });
            if !param.name.is_empty()
                && args.insert(param.name.clone(), index as u32).is_some()
            {
                return Err(self.err(
                    param.line,
                    format!("duplicate parameter name `{}`", param.name),
                ));
            }
        }

        let mut fctx = FuncCtx {
            function,
            args,
            scopes: Vec::new(),
            loop_depth: 0,
        };
        fctx.push_scope();
        let mut body = ir::Block::new();
        for stmt in decl.body.as_deref().unwrap_or_default() {
            self.lower_stmt(&mut fctx, stmt, &mut body)?;
        }
        fctx.pop_scope();
        fctx.function.body = body;

        let handle = self.module.functions.append(fctx.function);
        self.functions.insert(decl.name.clone(), handle);
        self.prototypes.remove(&decl.name);
        if decl.name == "main" {
            self.module.entry_point = Some(handle);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn lower_stmt(
        &mut self,
        fctx: &mut FuncCtx,
        stmt: &Stmt,
        block: &mut ir::Block,
    ) -> Result<(), LowerError> {
        match stmt {
            Stmt::Decl(var) => {
                if let Some(qualifier) = var.qualifier {
                    if qualifier != Qualifier::Const {
                        return Err(self.err(
                            var.line,
                            format!(
                                "storage qualifier `{}` not allowed on a local variable",
                                qualifier.keyword()
                            ),
                        ));
                    }
                }
                let ty = self.var_type(var.ty, var.array_size, var.line)?;
                let init = match &var.init {
                    Some(expr) => Some(self.lower_expr(fctx, expr, block)?),
                    None => None,
                };
                let handle = fctx.function.local_variables.append(ir::LocalVariable {
                    name: var.name.clone(),
                    ty,
                    init,
                });
                if !fctx.declare(var.name.clone(), handle) {
                    return Err(self.err(var.line, format!("redefinition of `{}`", var.name)));
                }
            }
            Stmt::Assign {
                target, op, value, ..
            } => {
                let pointer = self.lower_lvalue(fctx, target, block)?;
                let mut value_handle = self.lower_expr(fctx, value, block)?;
                if *op != AssignOp::Assign {
                    let load = fctx.add_expr(Expression::Load { pointer });
                    let bin_op = match op {
                        AssignOp::Add => ir::BinaryOp::Add,
                        AssignOp::Sub => ir::BinaryOp::Subtract,
                        AssignOp::Mul => ir::BinaryOp::Multiply,
                        AssignOp::Div => ir::BinaryOp::Divide,
                        AssignOp::Assign => unreachable!(),
                    };
                    value_handle = fctx.add_expr(Expression::Binary {
                        op: bin_op,
                        left: load,
                        right: value_handle,
                    });
                }
                block.push(Statement::Store {
                    pointer,
                    value: value_handle,
                });
            }
            Stmt::Expr { expr, .. } => match expr {
                Expr::Call {
                    name, args, line, ..
                } => {
                    // Call statements may discard their value.
                    let _ = self.lower_call(fctx, name, args, *line, block)?;
                }
                Expr::IncDec {
                    target, increment, ..
                } => {
                    self.lower_incdec(fctx, target, *increment, block)?;
                }
                other => {
                    // A value-producing expression statement has no effect;
                    // lower it anyway so its diagnostics still fire.
                    let _ = self.lower_expr(fctx, other, block)?;
                }
            },
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.lower_expr(fctx, condition, block)?;
                let accept = self.lower_scoped_block(fctx, then_branch)?;
                let reject = self.lower_scoped_block(fctx, else_branch)?;
                block.push(Statement::If {
                    condition: cond,
                    accept,
                    reject,
                });
            }
            Stmt::While {
                condition, body, ..
            } => {
                let mut loop_body = ir::Block::new();
                let cond = self.lower_expr(fctx, condition, &mut loop_body)?;
                let exit = fctx.add_expr(Expression::Unary {
                    op: UnaryOp::LogicalNot,
                    expr: cond,
                });
                loop_body.push(Statement::If {
                    condition: exit,
                    accept: vec![Statement::Break],
                    reject: vec![],
                });

                fctx.push_scope();
                fctx.loop_depth += 1;
                for stmt in body {
                    self.lower_stmt(fctx, stmt, &mut loop_body)?;
                }
                fctx.loop_depth -= 1;
                fctx.pop_scope();

                block.push(Statement::Loop {
                    body: loop_body,
                    continuing: vec![],
                });
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                // The initializer's scope covers the whole loop.
                fctx.push_scope();
                if let Some(init) = init {
                    self.lower_stmt(fctx, init, block)?;
                }

                let mut loop_body = ir::Block::new();
                if let Some(condition) = condition {
                    let cond = self.lower_expr(fctx, condition, &mut loop_body)?;
                    let exit = fctx.add_expr(Expression::Unary {
                        op: UnaryOp::LogicalNot,
                        expr: cond,
                    });
                    loop_body.push(Statement::If {
                        condition: exit,
                        accept: vec![Statement::Break],
                        reject: vec![],
                    });
                }

                fctx.push_scope();
                fctx.loop_depth += 1;
                for stmt in body {
                    self.lower_stmt(fctx, stmt, &mut loop_body)?;
                }
                let mut continuing = ir::Block::new();
                if let Some(step) = step {
                    self.lower_stmt(fctx, step, &mut continuing)?;
                }
                fctx.loop_depth -= 1;
                fctx.pop_scope();
                fctx.pop_scope();

                block.push(Statement::Loop {
                    body: loop_body,
                    continuing,
                });
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => Some(self.lower_expr(fctx, expr, block)?),
                    None => None,
                };
                block.push(Statement::Return { value });
            }
            Stmt::Break { line } => {
                if fctx.loop_depth == 0 {
                    return Err(self.err(*line, "`break` outside of a loop"));
                }
                block.push(Statement::Break);
            }
            Stmt::Continue { line } => {
                if fctx.loop_depth == 0 {
                    return Err(self.err(*line, "`continue` outside of a loop"));
                }
                block.push(Statement::Continue);
            }
            Stmt::Discard { line } => {
                if self.stage != Stage::Fragment {
                    return Err(
                        self.err(*line, "`discard` is only allowed in fragment shaders")
                    );
                }
                block.push(Statement::Discard);
            }
            Stmt::Block(stmts) => {
                fctx.push_scope();
                for stmt in stmts {
                    self.lower_stmt(fctx, stmt, block)?;
                }
                fctx.pop_scope();
            }
        }
        Ok(())
    }

    fn lower_scoped_block(
        &mut self,
        fctx: &mut FuncCtx,
        stmts: &[Stmt],
    ) -> Result<ir::Block, LowerError> {
        fctx.push_scope();
        let mut block = ir::Block::new();
        for stmt in stmts {
            self.lower_stmt(fctx, stmt, &mut block)?;
        }
        fctx.pop_scope();
        Ok(block)
    }

    fn lower_incdec(
        &mut self,
        fctx: &mut FuncCtx,
        target: &Expr,
        increment: bool,
        block: &mut ir::Block,
    ) -> Result<(), LowerError> {
        let pointer = self.lower_lvalue(fctx, target, block)?;
        let load = fctx.add_expr(Expression::Load { pointer });
        let one = fctx.add_expr(Expression::Literal(Literal::Int(1)));
        let op = if increment {
            ir::BinaryOp::Add
        } else {
            ir::BinaryOp::Subtract
        };
        let next = fctx.add_expr(Expression::Binary {
            op,
            left: load,
            right: one,
        });
        block.push(Statement::Store {
            pointer,
            value: next,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn lower_expr(
        &mut self,
        fctx: &mut FuncCtx,
        expr: &Expr,
        block: &mut ir::Block,
    ) -> Result<Handle<Expression>, LowerError> {
        match expr {
            Expr::FloatLit { value, .. } => {
                Ok(fctx.add_expr(Expression::Literal(Literal::Float(*value))))
            }
            Expr::IntLit { value, .. } => {
                Ok(fctx.add_expr(Expression::Literal(Literal::Int(*value))))
            }
            Expr::UintLit { value, .. } => {
                Ok(fctx.add_expr(Expression::Literal(Literal::Uint(*value))))
            }
            Expr::BoolLit { value, .. } => {
                Ok(fctx.add_expr(Expression::Literal(Literal::Bool(*value))))
            }
            Expr::Ident { name, line } => {
                let pointer = self.lower_variable_ref(fctx, name, *line)?;
                match pointer {
                    VariableRef::Pointer(ptr) => {
                        Ok(fctx.add_expr(Expression::Load { pointer: ptr }))
                    }
                    VariableRef::Argument(index) => {
                        Ok(fctx.add_expr(Expression::FunctionArgument(index)))
                    }
                }
            }
            Expr::Unary { op, expr, .. } => {
                let operand = self.lower_expr(fctx, expr, block)?;
                Ok(fctx.add_expr(Expression::Unary {
                    op: *op,
                    expr: operand,
                }))
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.lower_expr(fctx, left, block)?;
                let right = self.lower_expr(fctx, right, block)?;
                Ok(fctx.add_expr(Expression::Binary {
                    op: *op,
                    left,
                    right,
                }))
            }
            Expr::Ternary {
                condition,
                accept,
                reject,
                ..
            } => {
                let condition = self.lower_expr(fctx, condition, block)?;
                let accept = self.lower_expr(fctx, accept, block)?;
                let reject = self.lower_expr(fctx, reject, block)?;
                Ok(fctx.add_expr(Expression::Select {
                    condition,
                    accept,
                    reject,
                }))
            }
            Expr::Call { name, args, line } => {
                match self.lower_call(fctx, name, args, *line, block)? {
                    Some(result) => Ok(result),
                    None => Err(self.err(
                        *line,
                        format!("void function `{name}` cannot be used as a value"),
                    )),
                }
            }
            Expr::Index { base, index, .. } => {
                let base = self.lower_expr(fctx, base, block)?;
                let index = self.lower_expr(fctx, index, block)?;
                Ok(fctx.add_expr(Expression::Access { base, index }))
            }
            Expr::Member { base, member, line } => {
                let base = self.lower_expr(fctx, base, block)?;
                self.lower_swizzle(fctx, base, member, *line)
            }
            Expr::IncDec { line, .. } => Err(self.err(
                *line,
                "`++`/`--` can only be used as a statement",
            )),
        }
    }

    fn lower_swizzle(
        &mut self,
        fctx: &mut FuncCtx,
        base: Handle<Expression>,
        member: &str,
        line: u32,
    ) -> Result<Handle<Expression>, LowerError> {
        let pattern = match swizzle_pattern(member) {
            Some(pattern) => pattern,
            None => {
                return Err(self.err(line, format!("invalid swizzle `{member}`")));
            }
        };
        if pattern.len() == 1 {
            Ok(fctx.add_expr(Expression::AccessIndex {
                base,
                index: pattern[0] as u32,
            }))
        } else {
            Ok(fctx.add_expr(Expression::Swizzle {
                vector: base,
                pattern,
            }))
        }
    }

    fn lower_variable_ref(
        &mut self,
        fctx: &mut FuncCtx,
        name: &str,
        line: u32,
    ) -> Result<VariableRef, LowerError> {
        if let Some(local) = fctx.lookup_local(name) {
            let pointer = fctx.add_expr(Expression::LocalVariable(local));
            return Ok(VariableRef::Pointer(pointer));
        }
        if let Some(&index) = fctx.args.get(name) {
            return Ok(VariableRef::Argument(index));
        }
        if let Some(&global) = self.globals.get(name) {
            let pointer = fctx.add_expr(Expression::GlobalVariable(global));
            return Ok(VariableRef::Pointer(pointer));
        }
        if let Some((inner, qualifier)) = builtin_variable(name, self.stage) {
            let global = self.materialize_builtin(name, inner, qualifier);
            let pointer = fctx.add_expr(Expression::GlobalVariable(global));
            return Ok(VariableRef::Pointer(pointer));
        }
        Err(self.err(line, format!("undeclared identifier `{name}`")))
    }

    fn materialize_builtin(
        &mut self,
        name: &str,
        inner: TypeInner,
        qualifier: StorageQualifier,
    ) -> Handle<ir::GlobalVariable> {
        let ty = self.module.types.insert(ir::Type { name: None, inner });
        let handle = self.module.global_variables.append(ir::GlobalVariable {
            name: name.to_string(),
            qualifier,
            ty,
            init: None,
            location: None,
            builtin: true,
        });
        self.globals.insert(name.to_string(), handle);
        handle
    }

    fn lower_lvalue(
        &mut self,
        fctx: &mut FuncCtx,
        target: &Expr,
        block: &mut ir::Block,
    ) -> Result<Handle<Expression>, LowerError> {
        match target {
            Expr::Ident { name, line } => {
                let pointer = match self.lower_variable_ref(fctx, name, *line)? {
                    VariableRef::Pointer(ptr) => ptr,
                    VariableRef::Argument(_) => {
                        return Err(
                            self.err(*line, format!("cannot assign to parameter `{name}`"))
                        );
                    }
                };
                // Locals shadow globals, so check writability on whatever the
                // pointer actually resolved to.
                if let Expression::GlobalVariable(global) = fctx.function.expressions[pointer] {
                    match self.module.global_variables[global].qualifier {
                        StorageQualifier::Input => {
                            return Err(self.err(
                                *line,
                                format!("cannot assign to input variable `{name}`"),
                            ));
                        }
                        StorageQualifier::Uniform => {
                            return Err(
                                self.err(*line, format!("cannot assign to uniform `{name}`"))
                            );
                        }
                        StorageQualifier::Constant => {
                            return Err(
                                self.err(*line, format!("cannot assign to constant `{name}`"))
                            );
                        }
                        StorageQualifier::Output | StorageQualifier::Private => {}
                    }
                }
                Ok(pointer)
            }
            Expr::Index { base, index, .. } => {
                let base = self.lower_lvalue(fctx, base, block)?;
                let index = self.lower_expr(fctx, index, block)?;
                Ok(fctx.add_expr(Expression::Access { base, index }))
            }
            Expr::Member { base, member, line } => {
                let pattern = match swizzle_pattern(member) {
                    Some(pattern) => pattern,
                    None => {
                        return Err(self.err(*line, format!("invalid swizzle `{member}`")));
                    }
                };
                if pattern.len() != 1 {
                    return Err(self.err(
                        *line,
                        "cannot assign to a multi-component swizzle",
                    ));
                }
                let base = self.lower_lvalue(fctx, base, block)?;
                Ok(fctx.add_expr(Expression::AccessIndex {
                    base,
                    index: pattern[0] as u32,
                }))
            }
            other => Err(self.err(other.line(), "invalid assignment target")),
        }
    }

    /// Lowers a call; `Ok(None)` means the callee returns void.
    fn lower_call(
        &mut self,
        fctx: &mut FuncCtx,
        name: &str,
        args: &[Expr],
        line: u32,
        block: &mut ir::Block,
    ) -> Result<Option<Handle<Expression>>, LowerError> {
        // Constructors: `vec4(...)`, `float(...)`, ...
        if let Some(spec) = TypeSpec::from_name(name) {
            let ty = match self.type_handle(spec) {
                Some(ty) => ty,
                None => return Err(self.err(line, "cannot construct a `void` value")),
            };
            if args.is_empty() {
                return Err(self.err(
                    line,
                    format!("constructor `{name}` requires at least one argument"),
                ));
            }
            let mut components = Vec::with_capacity(args.len());
            for arg in args {
                components.push(self.lower_expr(fctx, arg, block)?);
            }
            return Ok(Some(fctx.add_expr(Expression::Compose { ty, components })));
        }

        // Built-in math intrinsics.
        if let Some(fun) = MathFunction::from_name(name) {
            let (min, max) = fun.argument_range();
            if args.len() < min || args.len() > max {
                let expected = if min == max {
                    min.to_string()
                } else {
                    format!("{min} to {max}")
                };
                return Err(self.err(
                    line,
                    format!(
                        "wrong number of arguments to `{name}` (expected {expected}, got {})",
                        args.len()
                    ),
                ));
            }
            let mut lowered = Vec::with_capacity(args.len());
            for arg in args {
                lowered.push(self.lower_expr(fctx, arg, block)?);
            }
            return Ok(Some(fctx.add_expr(Expression::Math {
                fun,
                arg: lowered[0],
                arg1: lowered.get(1).copied(),
                arg2: lowered.get(2).copied(),
            })));
        }

        // Functions defined in this unit.
        if let Some(&func) = self.functions.get(name) {
            let expected = self.module.functions[func].arguments.len();
            if args.len() != expected {
                return Err(self.err(
                    line,
                    format!(
                        "wrong number of arguments in call to `{name}` (expected {expected}, got {})",
                        args.len()
                    ),
                ));
            }
            let mut arguments = Vec::with_capacity(args.len());
            for arg in args {
                arguments.push(self.lower_expr(fctx, arg, block)?);
            }
            let result = self.module.functions[func]
                .result
                .map(|_| fctx.add_expr(Expression::CallResult(func)));
            block.push(Statement::Call {
                callee: Callee::Defined(func),
                arguments,
                result,
            });
            return Ok(result);
        }

        // Prototyped but not defined: the linker resolves it.
        if let Some(proto) = self.prototypes.get(name).cloned() {
            let expected = proto.arg_types.len();
            if args.len() != expected {
                return Err(self.err(
                    line,
                    format!(
                        "wrong number of arguments in call to `{name}` (expected {expected}, got {})",
                        args.len()
                    ),
                ));
            }
            let external = match self.externals.get(name) {
                Some(&handle) => handle,
                None => {
                    let handle = self.module.external_functions.append(ir::ExternalFunction {
                        name: name.to_string(),
                        result: proto.result,
                        arg_types: proto.arg_types.clone(),
                    });
                    self.externals.insert(name.to_string(), handle);
                    self.required_builtins.push(name.to_string());
                    handle
                }
            };
            let mut arguments = Vec::with_capacity(args.len());
            for arg in args {
                arguments.push(self.lower_expr(fctx, arg, block)?);
            }
            let result = proto
                .result
                .map(|_| fctx.add_expr(Expression::ExternalCallResult(external)));
            block.push(Statement::Call {
                callee: Callee::External(external),
                arguments,
                result,
            });
            return Ok(result);
        }

        Err(self.err(line, format!("call to undeclared function `{name}`")))
    }
}

enum VariableRef {
    Pointer(Handle<Expression>),
    Argument(u32),
}

fn swizzle_pattern(member: &str) -> Option<Vec<SwizzleComponent>> {
    if member.is_empty() || member.len() > 4 {
        return None;
    }
    member.chars().map(SwizzleComponent::from_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn lower_source(source: &str, stage: Stage) -> (Result<LoweredUnit, LowerError>, DiagnosticLog) {
        let ast = parse(source).expect("parse failed");
        let mut diags = DiagnosticLog::new();
        let result = lower(&ast, stage, &mut diags);
        (result, diags)
    }

    fn lower_ok(source: &str, stage: Stage) -> LoweredUnit {
        let (result, diags) = lower_source(source, stage);
        match result {
            Ok(unit) => unit,
            Err(_) => panic!("lowering failed: {diags}"),
        }
    }

    fn lower_err(source: &str, stage: Stage) -> DiagnosticLog {
        let (result, diags) = lower_source(source, stage);
        assert!(result.is_err(), "expected lowering to fail");
        assert!(diags.has_errors());
        diags
    }

    #[test]
    fn empty_main_sets_entry_point() {
        let unit = lower_ok("void main() {}", Stage::Vertex);
        assert!(unit.module.entry_point.is_some());
        assert_eq!(unit.module.functions.len(), 1);
        assert!(unit.required_builtins.is_empty());
    }

    #[test]
    fn interface_variables_are_exported() {
        let unit = lower_ok(
            "uniform mat4 mvp;\nin vec3 position;\nout vec2 uv;\nfloat scratch;\nvoid main() {}",
            Stage::Vertex,
        );
        assert_eq!(unit.symbols.len(), 3);
        assert_eq!(unit.symbols.get("mvp").unwrap().ty, "mat4");
        assert_eq!(
            unit.symbols.get("uv").unwrap().qualifier,
            StorageQualifier::Output
        );
        // Private globals are not part of the interface.
        assert!(unit.symbols.get("scratch").is_none());
    }

    #[test]
    fn varying_maps_by_stage() {
        let unit = lower_ok("varying vec2 uv;\nvoid main() {}", Stage::Vertex);
        assert_eq!(
            unit.symbols.get("uv").unwrap().qualifier,
            StorageQualifier::Output
        );
        let unit = lower_ok("varying vec2 uv;\nvoid main() {}", Stage::Fragment);
        assert_eq!(
            unit.symbols.get("uv").unwrap().qualifier,
            StorageQualifier::Input
        );
    }

    #[test]
    fn prototype_call_records_required_builtin() {
        let unit = lower_ok(
            "vec4 sample_env(vec3 dir);\nvoid main() { gl_Position = sample_env(vec3(1.0)); }",
            Stage::Vertex,
        );
        assert_eq!(unit.required_builtins, vec!["sample_env".to_string()]);
        assert_eq!(unit.module.external_functions.len(), 1);
    }

    #[test]
    fn defined_function_is_not_a_required_builtin() {
        let unit = lower_ok(
            "float helper(float x) { return x; }\nvoid main() { float y = helper(1.0); }",
            Stage::Vertex,
        );
        assert!(unit.required_builtins.is_empty());
        assert_eq!(unit.module.functions.len(), 2);
    }

    #[test]
    fn undeclared_function_is_an_error() {
        let diags = lower_err("void main() { float x = mystery(1.0); }", Stage::Vertex);
        let text = diags.to_string();
        assert!(text.contains("mystery"));
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let diags = lower_err("void main() { float x = nope; }", Stage::Vertex);
        assert!(diags.to_string().contains("nope"));
    }

    #[test]
    fn builtin_variables_materialize() {
        let unit = lower_ok("void main() { gl_Position = vec4(0.0); }", Stage::Vertex);
        let glpos = unit
            .module
            .global_variables
            .iter()
            .find(|(_, v)| v.name == "gl_Position")
            .map(|(_, v)| v)
            .expect("gl_Position not materialized");
        assert!(glpos.builtin);
        assert_eq!(glpos.qualifier, StorageQualifier::Output);
        // Builtins never join the exported interface.
        assert!(unit.symbols.get("gl_Position").is_none());
    }

    #[test]
    fn unknown_builtin_for_stage_is_an_error() {
        let diags = lower_err("void main() { gl_FragColor = vec4(1.0); }", Stage::Vertex);
        assert!(diags.to_string().contains("gl_FragColor"));
    }

    #[test]
    fn discard_requires_fragment() {
        lower_ok("void main() { discard; }", Stage::Fragment);
        let diags = lower_err("void main() { discard; }", Stage::Vertex);
        assert!(diags.to_string().contains("discard"));
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let diags = lower_err("void main() { break; }", Stage::Vertex);
        assert!(diags.to_string().contains("break"));
    }

    #[test]
    fn const_global_requires_initializer() {
        let diags = lower_err("const float k;\nvoid main() {}", Stage::Vertex);
        assert!(diags.to_string().contains("initializer"));
        let unit = lower_ok("const float k = 1.0 + 2.0;\nvoid main() {}", Stage::Vertex);
        assert_eq!(unit.module.global_expressions.len(), 3);
    }

    #[test]
    fn uniform_initializer_is_an_error() {
        let diags = lower_err("uniform float u = 1.0;\nvoid main() {}", Stage::Vertex);
        assert!(diags.to_string().contains("initializer"));
    }

    #[test]
    fn assignment_to_uniform_is_an_error() {
        let diags = lower_err(
            "uniform float u;\nvoid main() { u = 1.0; }",
            Stage::Vertex,
        );
        assert!(diags.to_string().contains("uniform"));
    }

    #[test]
    fn main_signature_is_enforced() {
        let diags = lower_err("float main() { return 1.0; }", Stage::Vertex);
        assert!(diags.to_string().contains("main"));
    }

    #[test]
    fn loops_lower_to_structured_ir() {
        let unit = lower_ok(
            "void main() { float acc = 0.0; for (int i = 0; i < 4; i++) { acc += 1.0; } }",
            Stage::Vertex,
        );
        let main = &unit.module.functions[unit.module.entry_point.unwrap()];
        assert!(main
            .body
            .iter()
            .any(|s| matches!(s, Statement::Loop { continuing, .. } if !continuing.is_empty())));
    }

    #[test]
    fn swizzles_lower() {
        let unit = lower_ok(
            "void main() { vec4 v = vec4(1.0); float x = v.x; vec2 xy = v.xy; }",
            Stage::Vertex,
        );
        let main = &unit.module.functions[unit.module.entry_point.unwrap()];
        let has_access_index = main
            .expressions
            .iter()
            .any(|(_, e)| matches!(e, Expression::AccessIndex { .. }));
        let has_swizzle = main
            .expressions
            .iter()
            .any(|(_, e)| matches!(e, Expression::Swizzle { .. }));
        assert!(has_access_index);
        assert!(has_swizzle);
    }

    #[test]
    fn redefinition_is_an_error() {
        let diags = lower_err("float a;\nfloat a;\nvoid main() {}", Stage::Vertex);
        assert!(diags.to_string().contains("redefinition"));
    }
}
