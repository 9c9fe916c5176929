//! Name resolution for constant references
//!
//! Resolution runs in two passes: the first collects every constant
//! declaration in the program, the second walks every expression and checks
//! each `Access` against the completed environment. Forward references are
//! therefore legal; only names that no declaration binds are reported, and
//! all of them are reported, not just the first.

pub mod error;
pub mod suggest;

pub use error::CheckError;

use crate::ast::{Decl, Expr, ExprKind, Loc, Program, Type};
use rustc_hash::FxHashMap;

/// A declared constant
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Declared type
    pub ty: Type,
    /// Location of the declaration
    pub loc: Loc,
}

/// Every constant declared in a program
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: FxHashMap<String, Binding>,
    /// Names in declaration order
    order: Vec<String>,
}

impl Env {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a binding
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Check if a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Declared names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|n| n.as_str())
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no constant is declared
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn declare(&mut self, name: &str, binding: Binding) -> Result<(), CheckError> {
        if let Some(original) = self.bindings.get(name) {
            return Err(CheckError::Redeclared {
                name: name.to_string(),
                original: original.loc,
                duplicate: binding.loc,
            });
        }
        self.bindings.insert(name.to_string(), binding);
        self.order.push(name.to_string());
        Ok(())
    }
}

/// Resolves every constant reference in a program
pub struct Resolver {
    env: Env,
    errors: Vec<CheckError>,
}

impl Resolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self {
            env: Env::new(),
            errors: Vec::new(),
        }
    }

    /// Resolve a whole program
    pub fn resolve_program(mut self, program: &Program) -> Result<Env, Vec<CheckError>> {
        // Pre-pass: collect all declarations so forward references resolve
        for decl in &program.decls {
            self.collect_decl(decl);
        }

        // Main pass: check every reference against the completed environment
        for decl in &program.decls {
            self.resolve_decl(decl);
        }

        if self.errors.is_empty() {
            log::debug!("resolved {} constant(s)", self.env.len());
            Ok(self.env)
        } else {
            Err(self.errors)
        }
    }

    fn collect_decl(&mut self, decl: &Decl) {
        if let Decl::Consts { members } = decl {
            for member in members {
                let binding = Binding {
                    ty: member.ty.clone(),
                    loc: member.loc,
                };
                if let Err(err) = self.env.declare(&member.name, binding) {
                    self.errors.push(err);
                }
            }
        }
    }

    fn resolve_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Consts { members } => {
                for member in members {
                    self.resolve_expr(&member.expr);
                }
            }
            Decl::Print { expr, .. } | Decl::Expr(expr) => self.resolve_expr(expr),
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Access(name) => {
                if !self.env.contains(name) {
                    let suggestions = suggest::suggestions(name, self.env.names());
                    self.errors.push(CheckError::NeverBound {
                        name: name.clone(),
                        loc: expr.loc,
                        suggestions,
                    });
                }
            }
            ExprKind::Parens(inner) | ExprKind::Show(inner) => self.resolve_expr(inner),
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Table { keys, vals } => {
                for e in keys.iter().chain(vals) {
                    self.resolve_expr(e);
                }
            }
            ExprKind::Interpol { expr, next, .. } => {
                self.resolve_expr(expr);
                if let Some(next) = next {
                    self.resolve_expr(next);
                }
            }
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Nil => {}
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve every constant reference in `program`
pub fn resolve(program: &Program) -> Result<Env, Vec<CheckError>> {
    Resolver::new().resolve_program(program)
}
