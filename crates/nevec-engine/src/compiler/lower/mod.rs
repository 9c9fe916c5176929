//! Typed tree to IR lowering
//!
//! Converts the resolved, type-annotated tree into a list of blocks of
//! three-address code. Expressions lower post-order: operands first, then
//! one instruction for the operator whose destination has the node's type.
//!
//! The builder trusts the front end. A node whose type is `Unknown` or
//! `Unresolved` means that contract was broken and lowering stops with
//! `CompileError::UnresolvedType`.

mod expr;

use crate::ast::{ConstMember, Decl, Loc, Program, Type};
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{Block, BlockId, IrExpr, SymId, Syms, Tac};
use rustc_hash::{FxHashMap, FxHashSet};

/// Lowers a typed program into IR
pub struct Lowerer<'p> {
    syms: Syms,
    blocks: Vec<Block>,
    current_block: BlockId,
    next_block: u32,
    /// Constant name -> symbol holding its value
    env: FxHashMap<&'p str, SymId>,
    /// Every constant member, for lowering forward references on demand
    members: FxHashMap<&'p str, &'p ConstMember>,
    /// Constants whose initializer is being lowered right now
    in_progress: FxHashSet<&'p str>,
}

impl<'p> Lowerer<'p> {
    /// Create a new lowerer
    pub fn new() -> Self {
        Self {
            syms: Syms::new(),
            blocks: Vec::new(),
            current_block: BlockId(0),
            next_block: 0,
            env: FxHashMap::default(),
            members: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    /// Lower a whole program into blocks
    pub fn lower_program(&mut self, program: &'p Program) -> CompileResult<Vec<Block>> {
        let entry = self.alloc_block();
        self.blocks.push(Block::with_label(entry, "entry"));
        self.current_block = entry;

        // Collect constants first so a reference may precede its declaration
        for decl in &program.decls {
            if let Decl::Consts { members } = decl {
                for member in members {
                    self.members.insert(member.name.as_str(), member);
                }
            }
        }

        for decl in &program.decls {
            self.lower_decl(decl)?;
        }

        log::debug!(
            "lowered {} declaration(s) into {} instruction(s)",
            program.decls.len(),
            self.blocks.iter().map(Block::len).sum::<usize>()
        );
        Ok(std::mem::take(&mut self.blocks))
    }

    /// The symbol table built so far
    pub fn syms(&self) -> &Syms {
        &self.syms
    }

    /// Consume the lowerer, keeping its symbol table
    pub fn into_syms(self) -> Syms {
        self.syms
    }

    fn lower_decl(&mut self, decl: &'p Decl) -> CompileResult<()> {
        match decl {
            Decl::Consts { members } => {
                for member in members {
                    if !self.env.contains_key(member.name.as_str()) {
                        self.lower_member(member)?;
                    }
                }
            }
            Decl::Print { expr, loc } => {
                let value = self.lower_expr(expr, None)?;
                self.use_sym(value)?;
                let dest = self.syms.fresh(Type::Nil);
                self.emit(Tac::new(dest, IrExpr::Print { operand: value }, Type::Nil, *loc))?;
            }
            Decl::Expr(expr) => {
                self.lower_expr(expr, None)?;
            }
        }
        Ok(())
    }

    fn lower_member(&mut self, member: &'p ConstMember) -> CompileResult<SymId> {
        let name = member.name.as_str();
        if !self.in_progress.insert(name) {
            return Err(CompileError::UnsupportedConstruct {
                message: format!("constant '{}' is defined in terms of itself", name),
                loc: member.loc,
            });
        }
        ensure_resolved(&member.ty, member.loc)?;

        let sym = self.lower_expr(&member.expr, Some(name))?;
        self.in_progress.remove(name);
        self.env.insert(name, sym);
        Ok(sym)
    }

    /// Resolve a constant reference, lowering a forward-referenced constant now
    fn lookup_const(&mut self, name: &str, loc: Loc) -> CompileResult<SymId> {
        if let Some(sym) = self.env.get(name) {
            return Ok(*sym);
        }
        match self.members.get(name).copied() {
            Some(member) => self.lower_member(member),
            None => Err(CompileError::UndefinedSymbol {
                name: name.to_string(),
                loc,
            }),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn alloc_block(&mut self) -> BlockId {
        let id = BlockId::new(self.next_block);
        self.next_block += 1;
        id
    }

    fn current_block_mut(&mut self) -> CompileResult<&mut Block> {
        let id = self.current_block;
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| CompileError::internal(format!("current block {} not found", id)))
    }

    /// Add an instruction to the current block
    fn emit(&mut self, tac: Tac) -> CompileResult<()> {
        self.current_block_mut()?.push(tac);
        Ok(())
    }

    /// Define a new symbol (named after the constant being declared, if any)
    fn define(
        &mut self,
        hint: Option<&str>,
        expr: IrExpr,
        ty: Type,
        loc: Loc,
    ) -> CompileResult<SymId> {
        let dest = match hint {
            Some(name) => self.syms.named(name, ty.clone()),
            None => self.syms.fresh(ty.clone()),
        };
        self.emit(Tac::new(dest, expr, ty, loc))?;
        Ok(dest)
    }

    fn use_sym(&mut self, sym: SymId) -> CompileResult<()> {
        self.syms.add_use(sym)
    }
}

impl Default for Lowerer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_resolved(ty: &Type, loc: Loc) -> CompileResult<()> {
    if ty.is_resolved() {
        Ok(())
    } else {
        Err(CompileError::UnresolvedType {
            ty: ty.clone(),
            loc,
        })
    }
}

/// Lower `program`, returning its blocks and symbol table
pub fn build_ir(program: &Program) -> CompileResult<(Vec<Block>, Syms)> {
    let mut lowerer = Lowerer::new();
    let blocks = lowerer.lower_program(program)?;
    Ok((blocks, lowerer.into_syms()))
}
