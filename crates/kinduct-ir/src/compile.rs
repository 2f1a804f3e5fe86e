//! AST to program compiler.
//!
//! Compilation runs in passes: collect every top-level name and signature,
//! close the macro table (inline and sort-check each body), lower systems,
//! flatten them, then lower properties, relations and `verify` commands.
//! Every term that reaches a [`Program`] is macro-free and sort-checked.

use crate::error::{CompileError, CompileResult};
use crate::flatten::Flattener;
use crate::program::{Program, VerifyCommand};
use crate::store::{Entry, Property, Relation, RelationMode, Store};
use crate::system::{Actual, Instantiation, System};
use indexmap::IndexMap;
use kinduct_syntax::{
    parse, Command, Expr, ExprKind, FunDecl, Ident, RelMode, Script, SortExpr, Span, StageTag,
    SysDecl,
};
use kinduct_term::{
    elaborate_formula, inline_macros, Macro, MacroTable, Op, Sort, SortContext, Stage,
    StateSignature, StateVar, Term, TermError, Value, Variable,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Parse and compile script source.
pub fn compile_source(source: &str) -> CompileResult<Program> {
    let script = parse(source)?;
    compile(&script)
}

/// Compile a parsed script.
pub fn compile(script: &Script) -> CompileResult<Program> {
    let mut compiler = Compiler::default();
    compiler.collect(script)?;
    compiler.compile_macros()?;
    compiler.compile_systems(script)?;

    let mut flattener = Flattener::new(&compiler.systems);
    for name in compiler.systems.keys() {
        flattener.flatten(name)?;
    }
    let flat = flattener.into_flat_systems();

    compiler.compile_formulas(script)?;
    let verifies = compiler.compile_verifies(script)?;

    Ok(Program {
        macros: compiler.macros,
        constants: compiler.constants,
        systems: compiler.systems,
        store: compiler.store,
        verifies,
        flat,
    })
}

/// Names visible while lowering one expression.
struct Scope<'c> {
    /// Owning system and its signature; `None` inside macro bodies.
    system: Option<(&'c str, &'c StateSignature)>,
    locals: Vec<String>,
}

impl<'c> Scope<'c> {
    fn system(name: &'c str, signature: &'c StateSignature) -> Self {
        Self {
            system: Some((name, signature)),
            locals: Vec::new(),
        }
    }

    fn macro_body(params: Vec<String>) -> Self {
        Self {
            system: None,
            locals: params,
        }
    }
}

#[derive(Default)]
struct Compiler {
    /// Every top-level name with the kind of its declaration.
    names: HashMap<String, &'static str>,
    /// Macro declarations awaiting lowering.
    macro_decls: IndexMap<String, FunDecl>,
    macros: MacroTable,
    constants: IndexMap<String, Sort>,
    signatures: IndexMap<String, StateSignature>,
    systems: IndexMap<String, System>,
    store: Store,
}

impl Compiler {
    // === Pass 1: names and signatures ===

    fn collect(&mut self, script: &Script) -> CompileResult<()> {
        for command in &script.commands {
            match command {
                Command::DefineFun(d) => {
                    self.declare(&d.name, "macro")?;
                    self.macro_decls.insert(d.name.name.clone(), d.clone());
                }
                Command::DeclareFun(d) => {
                    self.declare(&d.name, "constant")?;
                    let sort = resolve_sort(&d.sort)?;
                    self.constants.insert(d.name.name.clone(), sort);
                }
                Command::DefineSys(d) => {
                    self.declare(&d.name, "system")?;
                    let signature = build_signature(d)?;
                    self.signatures.insert(d.name.name.clone(), signature);
                }
                Command::DefineProp(d) => self.declare(&d.name, "property")?,
                Command::DefineRel(d) => self.declare(&d.name, "relation")?,
                Command::Verify(_) => {}
            }
        }
        Ok(())
    }

    fn declare(&mut self, name: &Ident, kind: &'static str) -> CompileResult<()> {
        if is_builtin(&name.name) {
            return Err(CompileError::DuplicateName {
                name: name.name.clone(),
                kind: "built-in",
                span: name.span,
            });
        }
        if let Some(previous) = self.names.insert(name.name.clone(), kind) {
            return Err(CompileError::DuplicateName {
                name: name.name.clone(),
                kind: previous,
                span: name.span,
            });
        }
        Ok(())
    }

    // === Pass 2: macro table ===

    fn compile_macros(&mut self) -> CompileResult<()> {
        let mut raw = MacroTable::new();
        for decl in self.macro_decls.values() {
            let params = decl
                .params
                .iter()
                .map(|p| Ok((p.name.name.clone(), resolve_sort(&p.sort)?)))
                .collect::<CompileResult<Vec<_>>>()?;
            let mut scope = Scope::macro_body(params.iter().map(|(n, _)| n.clone()).collect());
            let body = self.lower_expr(&decl.body, &mut scope)?;
            raw.insert(Macro {
                name: decl.name.name.clone(),
                params,
                ret: resolve_sort(&decl.ret)?,
                body,
            });
        }

        let empty = StateSignature::default();
        for m in raw.iter() {
            let decl = &self.macro_decls[&m.name];
            let term_error = |source: TermError| CompileError::Term {
                decl: m.name.clone(),
                source,
                span: decl.body.span,
            };
            let inlined = inline_macros(&m.body, &raw).map_err(term_error)?;
            let (body, sort) = SortContext::new(&empty, &self.constants)
                .with_locals(m.params.iter().cloned())
                .elaborate(&inlined)
                .map_err(term_error)?;
            let body = if sort == m.ret {
                body
            } else if let (Sort::Int, Sort::Real, Term::Lit(v)) = (sort, m.ret, &body) {
                Term::Lit(v.to_real())
            } else {
                return Err(term_error(TermError::Sort {
                    term: body.to_string(),
                    message: format!("macro returns {}, declared {}", sort, m.ret),
                }));
            };
            debug!(decl = %m.name, kind = "macro", "lowered declaration");
            self.macros.insert(Macro {
                body,
                ..m.clone()
            });
        }
        Ok(())
    }

    // === Pass 3: systems ===

    fn compile_systems(&mut self, script: &Script) -> CompileResult<()> {
        for command in &script.commands {
            if let Command::DefineSys(d) = command {
                let system = self.compile_system(d)?;
                debug!(
                    decl = %system.name,
                    kind = "system",
                    vars = system.signature.len(),
                    instances = system.instances.len(),
                    "lowered declaration"
                );
                self.systems.insert(system.name.clone(), system);
            }
        }
        Ok(())
    }

    fn compile_system(&self, d: &SysDecl) -> CompileResult<System> {
        let name = d.name.name.as_str();
        let signature = &self.signatures[name];

        let init = self.compile_formula(name, name, signature, &d.init)?;
        if init.uses_next() {
            return Err(CompileError::Stage {
                decl: name.to_string(),
                message: "initial condition must reference curr variables only".to_string(),
                span: d.init.span,
            });
        }
        let trans = self.compile_formula(name, name, signature, &d.trans)?;

        let mut instances = Vec::with_capacity(d.subsystems.len());
        for call in &d.subsystems {
            let mut actuals = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                let mut scope = Scope::system(name, signature);
                let term = self.lower_expr(arg, &mut scope)?;
                let term = self.inline(name, arg.span, &term)?;
                let (term, sort) = SortContext::new(signature, &self.constants)
                    .elaborate(&term)
                    .map_err(|source| CompileError::Term {
                        decl: name.to_string(),
                        source,
                        span: arg.span,
                    })?;
                if term.uses_next() {
                    return Err(CompileError::Stage {
                        decl: name.to_string(),
                        message: format!(
                            "subsystem argument `{}` must reference curr variables only",
                            term
                        ),
                        span: arg.span,
                    });
                }
                actuals.push(Actual { term, sort });
            }
            instances.push(Instantiation {
                system: call.system.name.clone(),
                actuals,
                span: call.span,
            });
        }

        Ok(System {
            name: name.to_string(),
            signature: signature.clone(),
            init,
            trans,
            instances,
            doc: d.doc.clone(),
            span: d.span,
        })
    }

    // === Pass 4: properties and relations ===

    fn compile_formulas(&mut self, script: &Script) -> CompileResult<()> {
        for command in &script.commands {
            let entry = match command {
                Command::DefineProp(d) => {
                    let signature = self.owner_signature(&d.system)?;
                    let formula =
                        self.compile_formula(&d.name.name, &d.system.name, signature, &d.body)?;
                    if formula.uses_next() {
                        return Err(CompileError::Stage {
                            decl: d.name.name.clone(),
                            message: "property must reference curr variables only".to_string(),
                            span: d.body.span,
                        });
                    }
                    Entry::Property(Property {
                        name: d.name.name.clone(),
                        system: d.system.name.clone(),
                        formula,
                        doc: d.doc.clone(),
                        span: d.span,
                    })
                }
                Command::DefineRel(d) => {
                    let signature = self.owner_signature(&d.system)?;
                    let formula =
                        self.compile_formula(&d.name.name, &d.system.name, signature, &d.body)?;
                    Entry::Relation(Relation {
                        name: d.name.name.clone(),
                        system: d.system.name.clone(),
                        formula,
                        mode: match d.mode {
                            Some(RelMode::Assume) => RelationMode::Assume,
                            Some(RelMode::Prove) | None => RelationMode::Prove,
                        },
                        doc: d.doc.clone(),
                        span: d.span,
                    })
                }
                _ => continue,
            };
            debug!(decl = entry.name(), system = entry.system(), "lowered declaration");
            self.store.insert(entry);
        }
        Ok(())
    }

    fn owner_signature(&self, system: &Ident) -> CompileResult<&StateSignature> {
        self.signatures
            .get(&system.name)
            .ok_or_else(|| CompileError::UnknownSystem {
                name: system.name.clone(),
                span: system.span,
            })
    }

    // === Pass 5: verify commands ===

    fn compile_verifies(&self, script: &Script) -> CompileResult<Vec<VerifyCommand>> {
        let mut verifies = Vec::new();
        for command in &script.commands {
            let Command::Verify(v) = command else {
                continue;
            };
            if !self.systems.contains_key(&v.system.name) {
                return Err(CompileError::UnknownSystem {
                    name: v.system.name.clone(),
                    span: v.system.span,
                });
            }
            let mut seen = HashSet::new();
            for name in &v.names {
                let entry = self
                    .store
                    .get(&name.name)
                    .ok_or_else(|| CompileError::UnknownGoal {
                        name: name.name.clone(),
                        span: name.span,
                    })?;
                if entry.system() != v.system.name {
                    return Err(CompileError::WrongSystem {
                        name: name.name.clone(),
                        owner: entry.system().to_string(),
                        system: v.system.name.clone(),
                        span: name.span,
                    });
                }
                if !seen.insert(name.name.as_str()) {
                    return Err(CompileError::DuplicateName {
                        name: name.name.clone(),
                        kind: "verify target",
                        span: name.span,
                    });
                }
            }
            verifies.push(VerifyCommand {
                system: v.system.name.clone(),
                names: v.names.iter().map(|n| n.name.clone()).collect(),
                doc: v.doc.clone(),
                span: v.span,
            });
        }
        Ok(verifies)
    }

    // === Lowering ===

    /// Lower, inline and sort-check a Bool formula of `system`.
    fn compile_formula(
        &self,
        decl: &str,
        system: &str,
        signature: &StateSignature,
        expr: &Expr,
    ) -> CompileResult<Term> {
        let mut scope = Scope::system(system, signature);
        let term = self.lower_expr(expr, &mut scope)?;
        let term = self.inline(decl, expr.span, &term)?;
        elaborate_formula(&term, signature, &self.constants).map_err(|source| {
            CompileError::Term {
                decl: decl.to_string(),
                source,
                span: expr.span,
            }
        })
    }

    fn inline(&self, decl: &str, span: Span, term: &Term) -> CompileResult<Term> {
        inline_macros(term, &self.macros).map_err(|source| CompileError::Term {
            decl: decl.to_string(),
            source,
            span,
        })
    }

    fn lower_expr(&self, expr: &Expr, scope: &mut Scope<'_>) -> CompileResult<Term> {
        match &expr.kind {
            ExprKind::Numeral(n) => Ok(Term::Lit(Value::Int(n.clone()))),
            ExprKind::Decimal(r) => Ok(Term::Lit(Value::Real(r.clone()))),
            ExprKind::Symbol(name) => self.lower_symbol(name, expr.span, scope),
            ExprKind::Staged { stage, var } => {
                let Some((system, signature)) = scope.system else {
                    return Err(CompileError::UnknownName {
                        name: format!("(_ {} {})", stage_name(*stage), var.name),
                        span: expr.span,
                    });
                };
                if !signature.contains(&var.name) {
                    return Err(CompileError::UnknownVariable {
                        name: var.name.clone(),
                        system: system.to_string(),
                        span: var.span,
                    });
                }
                Ok(Term::State(StateVar {
                    name: var.name.clone(),
                    stage: match stage {
                        StageTag::Curr => Stage::Curr,
                        StageTag::Next => Stage::Next,
                    },
                }))
            }
            ExprKind::Let { bindings, body } => {
                let mut lowered = Vec::with_capacity(bindings.len());
                for (name, value) in bindings {
                    lowered.push((name.name.clone(), self.lower_expr(value, scope)?));
                }
                let mark = scope.locals.len();
                scope.locals.extend(bindings.iter().map(|(n, _)| n.name.clone()));
                let body = self.lower_expr(body, scope);
                scope.locals.truncate(mark);
                Ok(Term::Let(lowered, Box::new(body?)))
            }
            ExprKind::App { head, args } => {
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a, scope))
                    .collect::<CompileResult<Vec<_>>>()?;
                self.lower_app(head, args)
            }
        }
    }

    fn lower_symbol(&self, name: &str, span: Span, scope: &Scope<'_>) -> CompileResult<Term> {
        if scope.locals.iter().any(|l| l == name) {
            return Ok(Term::Local(name.to_string()));
        }
        match name {
            "true" => return Ok(Term::bool(true)),
            "false" => return Ok(Term::bool(false)),
            _ => {}
        }
        if self.macro_decls.contains_key(name) {
            return Ok(Term::Call(name.to_string(), vec![]));
        }
        if self.constants.contains_key(name) {
            return Ok(Term::Const(name.to_string()));
        }
        Err(CompileError::UnknownName {
            name: name.to_string(),
            span,
        })
    }

    fn lower_app(&self, head: &Ident, args: Vec<Term>) -> CompileResult<Term> {
        if let Some(op) = Op::from_symbol(&head.name) {
            return Ok(fold_literals(op, args));
        }
        if self.macro_decls.contains_key(&head.name) {
            return Ok(Term::Call(head.name.clone(), args));
        }
        Err(CompileError::UnknownName {
            name: head.name.clone(),
            span: head.span,
        })
    }
}

/// Fold negated literals and literal fractions, e.g. `(- 5)` and `(/ 1 3)`.
fn fold_literals(op: Op, args: Vec<Term>) -> Term {
    let folded = match (op, args.as_slice()) {
        (Op::Sub, [Term::Lit(Value::Int(n))]) => Some(Value::Int(-n)),
        (Op::Sub, [Term::Lit(Value::Real(r))]) => Some(Value::Real(-r)),
        (Op::Div, [Term::Lit(a), Term::Lit(b)]) if !b.is_zero() => a
            .as_rational()
            .zip(b.as_rational())
            .map(|(a, b)| Value::Real(a / b)),
        _ => None,
    };
    match folded {
        Some(value) => Term::Lit(value),
        None if op == Op::Sub && args.len() == 1 => Term::App(Op::Neg, args),
        None => Term::App(op, args),
    }
}

fn stage_name(stage: StageTag) -> &'static str {
    match stage {
        StageTag::Curr => "curr",
        StageTag::Next => "next",
    }
}

fn is_builtin(name: &str) -> bool {
    name == "true" || name == "false" || Op::from_symbol(name).is_some()
}

fn resolve_sort(sort: &SortExpr) -> CompileResult<Sort> {
    Sort::from_name(&sort.name.name).ok_or_else(|| CompileError::UnknownSort {
        name: sort.name.name.clone(),
        span: sort.name.span,
    })
}

fn build_signature(d: &SysDecl) -> CompileResult<StateSignature> {
    let mut signature = StateSignature::default();
    for var in &d.state {
        let sort = resolve_sort(&var.sort)?;
        signature
            .push(Variable::new(var.name.name.clone(), sort))
            .map_err(|_| CompileError::DuplicateName {
                name: var.name.name.clone(),
                kind: "state variable",
                span: var.name.span,
            })?;
    }
    Ok(signature)
}
