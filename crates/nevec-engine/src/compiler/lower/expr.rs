//! Expression lowering

use super::{ensure_resolved, Lowerer};
use crate::ast::{Expr, ExprKind, Loc, Type};
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{BinaryOp, IrConstant, IrExpr, SymId, UnaryOp};

impl<'p> Lowerer<'p> {
    /// Lower an expression, returning the symbol holding its value
    ///
    /// `hint` names the destination when the expression initializes a constant.
    pub(super) fn lower_expr(&mut self, expr: &'p Expr, hint: Option<&str>) -> CompileResult<SymId> {
        ensure_resolved(&expr.ty, expr.loc)?;
        let ty = expr.ty.clone();
        let loc = expr.loc;

        match &expr.kind {
            ExprKind::Parens(inner) => self.lower_expr(inner, hint),
            ExprKind::Access(name) => self.lookup_const(name, loc),

            ExprKind::Int(v) => self.define(hint, IrExpr::Const(IrConstant::Int(*v)), ty, loc),
            ExprKind::Float(v) => self.define(hint, IrExpr::Const(IrConstant::Float(*v)), ty, loc),
            ExprKind::Bool(v) => self.define(hint, IrExpr::Const(IrConstant::Bool(*v)), ty, loc),
            ExprKind::Str(s) => {
                self.define(hint, IrExpr::Const(IrConstant::Str(s.clone())), ty, loc)
            }
            ExprKind::Nil => self.define(hint, IrExpr::Const(IrConstant::Nil), ty, loc),

            ExprKind::Unary { op, operand } => {
                let operand = self.lower_operand(operand)?;
                let op = UnaryOp::from(*op);
                self.define(hint, IrExpr::Unary { op, operand }, ty, loc)
            }
            ExprKind::Show(inner) => {
                let operand = self.lower_operand(inner)?;
                self.define(
                    hint,
                    IrExpr::Unary {
                        op: UnaryOp::Show,
                        operand,
                    },
                    ty,
                    loc,
                )
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.lower_operand(left)?;
                let right = self.lower_operand(right)?;
                let expr = match BinaryOp::from_ast(*op) {
                    Some(op) => IrExpr::Binary { op, left, right },
                    None => IrExpr::Concat { left, right },
                };
                self.define(hint, expr, ty, loc)
            }

            ExprKind::Table { keys, vals } => self.lower_table(keys, vals, hint, ty, loc),
            ExprKind::Call { callee, args } => self.lower_call(callee, args, hint, ty, loc),
            ExprKind::Interpol { left, expr, next } => {
                self.lower_interpol(left, expr, next.as_deref(), hint, ty, loc)
            }
        }
    }

    /// Lower an expression consumed as an operand, counting the use
    fn lower_operand(&mut self, expr: &'p Expr) -> CompileResult<SymId> {
        let sym = self.lower_expr(expr, None)?;
        self.use_sym(sym)?;
        Ok(sym)
    }

    fn lower_table(
        &mut self,
        keys: &'p [Expr],
        vals: &'p [Expr],
        hint: Option<&str>,
        ty: Type,
        loc: Loc,
    ) -> CompileResult<SymId> {
        if keys.len() != vals.len() {
            return Err(CompileError::malformed(
                "table",
                loc,
                format!("has {} key(s) but {} value(s)", keys.len(), vals.len()),
            ));
        }

        let mut entries = Vec::with_capacity(keys.len());
        for (key, val) in keys.iter().zip(vals) {
            let key = self.lower_operand(key)?;
            let val = self.lower_operand(val)?;
            entries.push((key, val));
        }
        self.define(hint, IrExpr::Table { entries }, ty, loc)
    }

    /// `table(key)` is a lookup; nothing else is callable
    fn lower_call(
        &mut self,
        callee: &'p Expr,
        args: &'p [Expr],
        hint: Option<&str>,
        ty: Type,
        loc: Loc,
    ) -> CompileResult<SymId> {
        match (&callee.ty, args) {
            (Type::Table { .. }, [key]) => {
                let table = self.lower_operand(callee)?;
                let key = self.lower_operand(key)?;
                self.define(hint, IrExpr::Lookup { table, key }, ty, loc)
            }
            (Type::Table { .. }, _) => Err(CompileError::UnsupportedConstruct {
                message: format!("a table lookup takes exactly one key, got {}", args.len()),
                loc,
            }),
            (other, _) => Err(CompileError::UnsupportedConstruct {
                message: format!("a value of type {} cannot be called", other),
                loc,
            }),
        }
    }

    /// `"left#{expr}next"` becomes `(left .. show expr) .. next`
    fn lower_interpol(
        &mut self,
        left: &str,
        expr: &'p Expr,
        next: Option<&'p Expr>,
        hint: Option<&str>,
        ty: Type,
        loc: Loc,
    ) -> CompileResult<SymId> {
        let left_ty = Type::str_for(left);
        let left = self.define(None, IrExpr::Const(IrConstant::Str(left.to_string())), left_ty, loc)?;
        self.use_sym(left)?;

        let shown = if expr.ty.is_str() {
            self.lower_operand(expr)?
        } else {
            let value = self.lower_operand(expr)?;
            let shown = self.define(
                None,
                IrExpr::Unary {
                    op: UnaryOp::Show,
                    operand: value,
                },
                Type::Str,
                expr.loc,
            )?;
            self.use_sym(shown)?;
            shown
        };

        match next {
            None => self.define(hint, IrExpr::Concat { left, right: shown }, ty, loc),
            Some(next) => {
                let head = self.define(None, IrExpr::Concat { left, right: shown }, ty.clone(), loc)?;
                self.use_sym(head)?;
                let rest = self.lower_operand(next)?;
                self.define(hint, IrExpr::Concat { left: head, right: rest }, ty, loc)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, Decl, Expr, Program, Type, UnaryOp};
    use crate::compiler::error::CompileError;
    use crate::compiler::ir::PrettyPrint;
    use crate::compiler::lower::build_ir;

    fn render(program: &Program) -> String {
        let (blocks, syms) = build_ir(program).unwrap();
        blocks.pretty_print(&syms)
    }

    #[test]
    fn test_unary_and_show() {
        let program = Program::new(vec![Decl::print(Expr::show(Expr::unary(
            UnaryOp::Neg,
            Expr::float(1.5),
            Type::Float,
        )))]);
        assert_eq!(
            render(&program),
            "bb0: ; entry\n  t0 = 1.5\n  t1 = -t0\n  t2 = show t1\n  print t2\n"
        );
    }

    #[test]
    fn test_concat_lowering() {
        let program = Program::new(vec![Decl::print(Expr::binary(
            BinaryOp::Concat,
            Expr::str("a"),
            Expr::str("b"),
            Type::Str,
        ))]);
        assert_eq!(
            render(&program),
            "bb0: ; entry\n  t0 = \"a\"\n  t1 = \"b\"\n  t2 = t0 .. t1\n  print t2\n"
        );
    }

    #[test]
    fn test_table_and_lookup() {
        let table_ty = Type::table(Type::Str, Type::Int);
        let program = Program::new(vec![
            Decl::constant(
                "t",
                table_ty.clone(),
                Expr::table(vec![Expr::str("k")], vec![Expr::int(1)], table_ty.clone()),
            ),
            Decl::print(Expr::call(
                Expr::access("t", table_ty),
                vec![Expr::str("k")],
                Type::Int,
            )),
        ]);
        assert_eq!(
            render(&program),
            "bb0: ; entry\n  t0 = \"k\"\n  t1 = 1\n  t = [t0: t1]\n  t2 = \"k\"\n  t3 = t[t2]\n  print t3\n"
        );
    }

    #[test]
    fn test_interpolation() {
        let program = Program::new(vec![Decl::print(Expr::interpol(
            "n = ",
            Expr::int(4),
            Some(Expr::str("!")),
        ))]);
        assert_eq!(
            render(&program),
            "bb0: ; entry\n  t0 = \"n = \"\n  t1 = 4\n  t2 = show t1\n  t3 = t0 .. t2\n  t4 = \"!\"\n  t5 = t3 .. t4\n  print t5\n"
        );
    }

    #[test]
    fn test_calling_a_string_is_unsupported() {
        let program = Program::new(vec![Decl::print(Expr::call(
            Expr::str("f"),
            vec![Expr::int(1), Expr::int(2)],
            Type::Str,
        ))]);
        assert!(matches!(
            build_ir(&program),
            Err(CompileError::UnsupportedConstruct { .. })
        ));
    }
}
