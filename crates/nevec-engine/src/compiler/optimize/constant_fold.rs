//! Constant Folding Optimization
//!
//! Evaluates operations over literal operands at compile time. The block is
//! walked in definition order with a map of the literals defined so far, so
//! one linear pass folds every chain whose inputs are all known. Operand
//! definitions left without uses are elided on the spot.

use super::{consume_operands, KnownConsts, Pass};
use crate::ast::{Loc, Type};
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{BinaryOp, Block, IrConstant, IrExpr, Syms, Tac, UnaryOp};
use std::cmp::Ordering;

/// Constant folding pass
pub struct ConstantFolder {
    folded: usize,
}

impl ConstantFolder {
    /// Create a new constant folder
    pub fn new() -> Self {
        Self { folded: 0 }
    }

    /// Instructions folded over the lifetime of this pass
    pub fn folded(&self) -> usize {
        self.folded
    }

    fn fold_block(&mut self, block: &mut Block, syms: &mut Syms) -> CompileResult<bool> {
        let mut known = KnownConsts::default();
        let mut out: Vec<Tac> = Vec::with_capacity(block.instrs.len());
        let mut changed = false;

        for tac in std::mem::take(&mut block.instrs) {
            let value = match &tac.expr {
                IrExpr::Const(c) => {
                    known.insert(tac.dest, c.clone());
                    out.push(tac);
                    continue;
                }
                IrExpr::Binary { op, left, right } => match (known.get(left), known.get(right)) {
                    (Some(l), Some(r)) => eval_binary(*op, l, r, &tac.ty, tac.loc)?,
                    _ => None,
                },
                IrExpr::Concat { left, right } => match (known.get(left), known.get(right)) {
                    (Some(l), Some(r)) => Some(eval_concat(l, r, tac.loc)?),
                    _ => None,
                },
                IrExpr::Unary { op, operand } => match known.get(operand) {
                    Some(c) => {
                        let operand_ty = syms.ty(*operand)?.clone();
                        Some(eval_unary(*op, c, &operand_ty, &tac.ty, tac.loc)?)
                    }
                    None => None,
                },
                _ => None,
            };

            let Some(value) = value else {
                out.push(tac);
                continue;
            };

            if !value.matches_type(&tac.ty) {
                return Err(CompileError::malformed(
                    tac.expr.op_name(),
                    tac.loc,
                    format!("folds to a {} but the result type is {}", value.kind_name(), tac.ty),
                ));
            }

            log::trace!("folded {} to {}", syms.name(tac.dest), value);
            let operands = tac.operands();
            known.insert(tac.dest, value.clone());
            out.push(tac.folded(value));
            consume_operands(&operands, &mut out, syms)?;
            self.folded += 1;
            changed = true;
        }

        block.instrs = out;
        Ok(changed)
    }
}

impl Default for ConstantFolder {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ConstantFolder {
    fn name(&self) -> &'static str {
        "constant-fold"
    }

    fn run(&mut self, block: &mut Block, syms: &mut Syms) -> CompileResult<bool> {
        self.fold_block(block, syms)
    }
}

/// Evaluate a binary operation on literals
///
/// `Ok(None)` leaves the instruction for runtime (division by zero, shift
/// counts outside 0..64, table equality).
fn eval_binary(
    op: BinaryOp,
    left: &IrConstant,
    right: &IrConstant,
    ty: &Type,
    loc: Loc,
) -> CompileResult<Option<IrConstant>> {
    match ty {
        Type::Int => eval_int(op, left, right, loc),
        Type::Float => eval_float(op, left, right, loc).map(Some),
        Type::Bool => eval_comparison(op, left, right, loc),
        other => Err(CompileError::malformed(
            op,
            loc,
            format!("cannot produce a value of type {}", other),
        )),
    }
}

fn eval_int(op: BinaryOp, left: &IrConstant, right: &IrConstant, loc: Loc) -> CompileResult<Option<IrConstant>> {
    let (IrConstant::Int(a), IrConstant::Int(b)) = (left, right) else {
        return Err(CompileError::malformed(
            op,
            loc,
            format!("expects int operands, got {} and {}", left.kind_name(), right.kind_name()),
        ));
    };
    let (a, b) = (*a, *b);

    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div if b == 0 => return Ok(None),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Shl | BinaryOp::Shr if !(0..64).contains(&b) => return Ok(None),
        BinaryOp::Shl => a << b,
        BinaryOp::Shr => a >> b,
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::BitOr => a | b,
        _ => {
            return Err(CompileError::malformed(op, loc, "does not produce an int"));
        }
    };
    Ok(Some(IrConstant::Int(value)))
}

fn eval_float(op: BinaryOp, left: &IrConstant, right: &IrConstant, loc: Loc) -> CompileResult<IrConstant> {
    if op.is_bitwise() {
        return Err(CompileError::malformed(op, loc, "is not defined over floats"));
    }
    let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) else {
        return Err(CompileError::malformed(
            op,
            loc,
            format!("expects numeric operands, got {} and {}", left.kind_name(), right.kind_name()),
        ));
    };

    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => return Err(CompileError::malformed(op, loc, "does not produce a float")),
    };
    Ok(IrConstant::Float(value))
}

fn eval_comparison(
    op: BinaryOp,
    left: &IrConstant,
    right: &IrConstant,
    loc: Loc,
) -> CompileResult<Option<IrConstant>> {
    if !op.is_comparison() {
        return Err(CompileError::malformed(op, loc, "does not produce a bool"));
    }

    let ordering = match (left, right) {
        (IrConstant::Int(a), IrConstant::Int(b)) => Some(a.cmp(b)),
        (IrConstant::Str(a), IrConstant::Str(b)) => Some(a.cmp(b)),
        (IrConstant::Bool(a), IrConstant::Bool(b)) => Some(a.cmp(b)),
        (IrConstant::Nil, IrConstant::Nil) => Some(Ordering::Equal),
        (IrConstant::Table(_), _) | (_, IrConstant::Table(_)) => {
            if matches!(op, BinaryOp::Eq | BinaryOp::Neq) {
                return Ok(None);
            }
            return Err(CompileError::malformed(op, loc, "cannot order tables"));
        }
        _ => match (as_f64(left), as_f64(right)) {
            // NaN compares unordered: only `!=` holds
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ if left.kind_name() != right.kind_name() => {
                if matches!(op, BinaryOp::Eq | BinaryOp::Neq) {
                    return Ok(Some(IrConstant::Bool(op == BinaryOp::Neq)));
                }
                return Err(CompileError::malformed(
                    op,
                    loc,
                    format!("cannot compare {} with {}", left.kind_name(), right.kind_name()),
                ));
            }
            _ => None,
        },
    };

    let result = match ordering {
        Some(ord) => match op {
            BinaryOp::Eq => ord == Ordering::Equal,
            BinaryOp::Neq => ord != Ordering::Equal,
            BinaryOp::Gt => ord == Ordering::Greater,
            BinaryOp::Gte => ord != Ordering::Less,
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::Lte => ord != Ordering::Greater,
            _ => false,
        },
        None => op == BinaryOp::Neq,
    };
    Ok(Some(IrConstant::Bool(result)))
}

fn eval_concat(left: &IrConstant, right: &IrConstant, loc: Loc) -> CompileResult<IrConstant> {
    match (left, right) {
        (IrConstant::Str(a), IrConstant::Str(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(IrConstant::Str(s))
        }
        _ => Err(CompileError::malformed(
            "..",
            loc,
            format!("expects string operands, got {} and {}", left.kind_name(), right.kind_name()),
        )),
    }
}

/// Evaluate a unary operation on a literal
///
/// `IS_NIL` and `IS_NOT_NIL` look at the operand's static type.
fn eval_unary(
    op: UnaryOp,
    operand: &IrConstant,
    operand_ty: &Type,
    ty: &Type,
    loc: Loc,
) -> CompileResult<IrConstant> {
    let mismatch = || {
        CompileError::malformed(
            op.to_string().trim_end(),
            loc,
            format!("is not defined over {}", operand.kind_name()),
        )
    };

    match (op, ty) {
        (UnaryOp::Neg, Type::Int | Type::Float) => match operand {
            IrConstant::Int(v) => Ok(IrConstant::Int(v.wrapping_neg())),
            IrConstant::Float(v) => Ok(IrConstant::Float(-v)),
            _ => Err(mismatch()),
        },
        (UnaryOp::Not, Type::Bool) => match operand {
            IrConstant::Bool(v) => Ok(IrConstant::Bool(!v)),
            _ => Err(mismatch()),
        },
        (UnaryOp::IsZero, Type::Bool) => match operand {
            IrConstant::Int(v) => Ok(IrConstant::Bool(*v == 0)),
            IrConstant::Float(v) => Ok(IrConstant::Bool(*v == 0.0)),
            _ => Err(mismatch()),
        },
        (UnaryOp::IsNil, Type::Bool) => Ok(IrConstant::Bool(*operand_ty == Type::Nil)),
        (UnaryOp::IsNotNil, Type::Bool) => Ok(IrConstant::Bool(*operand_ty != Type::Nil)),
        (UnaryOp::Show, t) if t.is_str() => Ok(IrConstant::Str(operand.show())),
        (op, ty) => Err(CompileError::UnimplementedOperator {
            op: op.to_string().trim_end().to_string(),
            ty: ty.clone(),
            loc,
        }),
    }
}

fn as_f64(c: &IrConstant) -> Option<f64> {
    match c {
        IrConstant::Int(v) => Some(*v as f64),
        IrConstant::Float(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{BlockId, PrettyPrint, SymId};

    /// Builds a block of literal definitions feeding one operation
    struct Fixture {
        syms: Syms,
        block: Block,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                syms: Syms::new(),
                block: Block::with_label(BlockId(0), "entry"),
            }
        }

        fn lit(&mut self, value: IrConstant, ty: Type) -> SymId {
            let sym = self.syms.fresh(ty.clone());
            self.block.push(Tac::new(sym, IrExpr::Const(value), ty, Loc::default()));
            sym
        }

        fn op(&mut self, name: Option<&str>, expr: IrExpr, ty: Type) -> SymId {
            for operand in expr.operands() {
                self.syms.add_use(operand).unwrap();
            }
            let sym = match name {
                Some(name) => self.syms.named(name, ty.clone()),
                None => self.syms.fresh(ty.clone()),
            };
            self.block.push(Tac::new(sym, expr, ty, Loc::new(1, 1)));
            sym
        }

        fn print(&mut self, operand: SymId) {
            self.op(None, IrExpr::Print { operand }, Type::Nil);
        }

        fn fold(&mut self) -> CompileResult<bool> {
            ConstantFolder::new().run(&mut self.block, &mut self.syms)
        }

        fn binary(op: BinaryOp, a: IrConstant, b: IrConstant, operand_ty: Type, ty: Type) -> CompileResult<Block> {
            let mut fx = Fixture::new();
            let l = fx.lit(a, operand_ty.clone());
            let r = fx.lit(b, operand_ty);
            let dest = fx.op(None, IrExpr::Binary { op, left: l, right: r }, ty);
            fx.print(dest);
            fx.fold()?;
            Ok(fx.block)
        }
    }

    fn folded_value(block: &Block) -> IrConstant {
        block.instrs[0].expr.as_const().cloned().unwrap()
    }

    #[test]
    fn test_fold_and_elide_scenario() {
        let mut fx = Fixture::new();
        let a = fx.lit(IrConstant::Int(2), Type::Int);
        let b = fx.lit(IrConstant::Int(3), Type::Int);
        let x = fx.op(
            Some("x"),
            IrExpr::Binary {
                op: BinaryOp::Add,
                left: a,
                right: b,
            },
            Type::Int,
        );
        fx.print(x);

        assert!(fx.fold().unwrap());
        assert_eq!(fx.block.pretty_print(&fx.syms), "bb0: ; entry\n  x = 5\n  print x\n");
        assert!(!fx.syms.contains(a));
        assert!(!fx.syms.contains(b));
        assert_eq!(fx.block.instrs[0].loc, Loc::new(1, 1));
    }

    #[test]
    fn test_int_arithmetic() {
        let cases = [
            (BinaryOp::Add, 3, 4, 7),
            (BinaryOp::Sub, 3, 4, -1),
            (BinaryOp::Mul, -6, 7, -42),
            (BinaryOp::Div, 7, 2, 3),
            (BinaryOp::Shr, 6, 1, 3),
            (BinaryOp::Shl, 1, 10, 1024),
            (BinaryOp::BitAnd, 12, 10, 8),
            (BinaryOp::BitOr, 12, 10, 14),
            (BinaryOp::BitXor, 12, 10, 6),
        ];
        for (op, a, b, expected) in cases {
            let block = Fixture::binary(op, IrConstant::Int(a), IrConstant::Int(b), Type::Int, Type::Int).unwrap();
            assert_eq!(folded_value(&block), IrConstant::Int(expected), "{} {} {}", a, op, b);
        }
    }

    #[test]
    fn test_int_overflow_wraps() {
        let block = Fixture::binary(
            BinaryOp::Add,
            IrConstant::Int(i64::MAX),
            IrConstant::Int(1),
            Type::Int,
            Type::Int,
        )
        .unwrap();
        assert_eq!(folded_value(&block), IrConstant::Int(i64::MIN));
    }

    #[test]
    fn test_division_by_zero_left_for_runtime() {
        let block = Fixture::binary(BinaryOp::Div, IrConstant::Int(1), IrConstant::Int(0), Type::Int, Type::Int).unwrap();
        assert_eq!(block.len(), 4);
        assert!(matches!(block.instrs[2].expr, IrExpr::Binary { .. }));

        let block = Fixture::binary(BinaryOp::Shl, IrConstant::Int(1), IrConstant::Int(64), Type::Int, Type::Int).unwrap();
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn test_float_arithmetic() {
        let block = Fixture::binary(
            BinaryOp::Div,
            IrConstant::Float(1.0),
            IrConstant::Float(4.0),
            Type::Float,
            Type::Float,
        )
        .unwrap();
        assert_eq!(folded_value(&block), IrConstant::Float(0.25));

        let block = Fixture::binary(
            BinaryOp::Div,
            IrConstant::Float(1.0),
            IrConstant::Float(0.0),
            Type::Float,
            Type::Float,
        )
        .unwrap();
        assert_eq!(folded_value(&block), IrConstant::Float(f64::INFINITY));
    }

    #[test]
    fn test_bitwise_on_float_is_malformed() {
        let err = Fixture::binary(
            BinaryOp::BitAnd,
            IrConstant::Float(1.0),
            IrConstant::Float(2.0),
            Type::Float,
            Type::Float,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MalformedIr { .. }));
    }

    #[test]
    fn test_comparisons() {
        let block = Fixture::binary(
            BinaryOp::Eq,
            IrConstant::Str("ab".into()),
            IrConstant::Str("ab".into()),
            Type::Str,
            Type::Bool,
        )
        .unwrap();
        assert_eq!(folded_value(&block), IrConstant::Bool(true));

        let block = Fixture::binary(
            BinaryOp::Lt,
            IrConstant::Str("ab".into()),
            IrConstant::Str("b".into()),
            Type::Str,
            Type::Bool,
        )
        .unwrap();
        assert_eq!(folded_value(&block), IrConstant::Bool(true));

        let block = Fixture::binary(BinaryOp::Gte, IrConstant::Int(2), IrConstant::Int(3), Type::Int, Type::Bool).unwrap();
        assert_eq!(folded_value(&block), IrConstant::Bool(false));

        let block = Fixture::binary(
            BinaryOp::Eq,
            IrConstant::Float(f64::NAN),
            IrConstant::Float(f64::NAN),
            Type::Float,
            Type::Bool,
        )
        .unwrap();
        assert_eq!(folded_value(&block), IrConstant::Bool(false));
    }

    #[test]
    fn test_string_result_of_arithmetic_is_malformed() {
        let err = Fixture::binary(BinaryOp::Add, IrConstant::Int(1), IrConstant::Int(2), Type::Int, Type::Str).unwrap_err();
        assert!(matches!(err, CompileError::MalformedIr { .. }));
    }

    #[test]
    fn test_concat() {
        let mut fx = Fixture::new();
        let a = fx.lit(IrConstant::Str("foo".into()), Type::Str);
        let b = fx.lit(IrConstant::Str("bar".into()), Type::Str);
        let c = fx.op(None, IrExpr::Concat { left: a, right: b }, Type::Str);
        fx.print(c);
        fx.fold().unwrap();
        assert_eq!(folded_value(&fx.block), IrConstant::Str("foobar".into()));
        assert_eq!(fx.block.len(), 2);
    }

    #[test]
    fn test_unary_rules() {
        let mut fx = Fixture::new();
        let n = fx.lit(IrConstant::Float(2.5), Type::Float);
        let neg = fx.op(
            None,
            IrExpr::Unary {
                op: UnaryOp::Neg,
                operand: n,
            },
            Type::Float,
        );
        let shown = fx.op(
            None,
            IrExpr::Unary {
                op: UnaryOp::Show,
                operand: neg,
            },
            Type::Str,
        );
        fx.print(shown);
        fx.fold().unwrap();
        assert_eq!(fx.block.pretty_print(&fx.syms), "bb0: ; entry\n  t2 = \"-2.5\"\n  print t2\n");

        let mut fx = Fixture::new();
        let nil = fx.lit(IrConstant::Nil, Type::Nil);
        let is_nil = fx.op(
            None,
            IrExpr::Unary {
                op: UnaryOp::IsNil,
                operand: nil,
            },
            Type::Bool,
        );
        let not = fx.op(
            None,
            IrExpr::Unary {
                op: UnaryOp::Not,
                operand: is_nil,
            },
            Type::Bool,
        );
        fx.print(not);
        fx.fold().unwrap();
        assert_eq!(folded_value(&fx.block), IrConstant::Bool(false));
    }

    #[test]
    fn test_unary_without_rule_is_unimplemented() {
        let mut fx = Fixture::new();
        let b = fx.lit(IrConstant::Bool(true), Type::Bool);
        fx.op(
            None,
            IrExpr::Unary {
                op: UnaryOp::Neg,
                operand: b,
            },
            Type::Bool,
        );
        assert!(matches!(fx.fold(), Err(CompileError::UnimplementedOperator { .. })));
    }

    #[test]
    fn test_shared_operand_survives_until_last_use() {
        let mut fx = Fixture::new();
        let a = fx.lit(IrConstant::Int(2), Type::Int);
        let sum = fx.op(
            None,
            IrExpr::Binary {
                op: BinaryOp::Add,
                left: a,
                right: a,
            },
            Type::Int,
        );
        fx.print(sum);
        fx.print(a);
        fx.fold().unwrap();

        assert!(fx.syms.contains(a));
        assert_eq!(fx.syms.uses(a), 1);
        assert_eq!(
            fx.block.pretty_print(&fx.syms),
            "bb0: ; entry\n  t0 = 2\n  t1 = 4\n  print t1\n  print t0\n"
        );
    }

    #[test]
    fn test_unknown_operand_left_alone() {
        let mut fx = Fixture::new();
        let a = fx.lit(IrConstant::Int(2), Type::Int);
        let t = fx.op(None, IrExpr::Table { entries: vec![] }, Type::table(Type::Int, Type::Int));
        let v = fx.op(None, IrExpr::Lookup { table: t, key: a }, Type::Int);
        fx.print(v);
        let before = fx.block.clone();
        assert!(!fx.fold().unwrap());
        assert_eq!(fx.block, before);
    }
}
