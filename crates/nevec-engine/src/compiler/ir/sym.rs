//! Symbol table
//!
//! Symbols live in a dense arena and are referenced everywhere else by a
//! `SymId` handle. Passes mutate symbol state (propagation, use counts,
//! removal) through the table only, so a removed symbol can be detected
//! instead of silently aliased.

use crate::ast::{Loc, Type};
use crate::compiler::error::{CompileError, CompileResult};

/// Handle to a symbol in `Syms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymId(pub u32);

impl SymId {
    /// Create a new symbol handle
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SymId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// An IR-level symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Sym {
    /// Handle of this symbol
    pub id: SymId,
    /// Display name (a constant's name, or `tN` for temporaries)
    pub name: String,
    /// Resolved type
    pub ty: Type,
    propagated: bool,
    uses: u32,
    removed: bool,
}

impl Sym {
    /// Whether the defining value was inlined at a use site
    pub fn is_propagated(&self) -> bool {
        self.propagated
    }

    /// Remaining live uses
    pub fn uses(&self) -> u32 {
        self.uses
    }

    /// Whether the symbol was removed and awaits `cleanup`
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

impl std::fmt::Display for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Arena owning every symbol of a program
#[derive(Debug, Clone, Default)]
pub struct Syms {
    slots: Vec<Option<Sym>>,
    temps: u32,
}

impl Syms {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh temporary
    pub fn fresh(&mut self, ty: Type) -> SymId {
        let name = format!("t{}", self.temps);
        self.temps += 1;
        self.insert(name, ty)
    }

    /// Allocate a symbol with a user-visible name
    pub fn named(&mut self, name: impl Into<String>, ty: Type) -> SymId {
        self.insert(name.into(), ty)
    }

    fn insert(&mut self, name: String, ty: Type) -> SymId {
        let id = SymId(self.slots.len() as u32);
        self.slots.push(Some(Sym {
            id,
            name,
            ty,
            propagated: false,
            uses: 0,
            removed: false,
        }));
        id
    }

    /// Look up a symbol that has not been cleaned up
    pub fn get(&self, id: SymId) -> Option<&Sym> {
        self.slots.get(id.index()).and_then(|s| s.as_ref())
    }

    /// Look up a live symbol, failing on removed or unknown handles
    pub fn sym(&self, id: SymId) -> CompileResult<&Sym> {
        match self.get(id) {
            Some(sym) if !sym.removed => Ok(sym),
            _ => Err(CompileError::UndefinedSymbol {
                name: id.to_string(),
                loc: Loc::default(),
            }),
        }
    }

    fn sym_mut(&mut self, id: SymId) -> CompileResult<&mut Sym> {
        match self.slots.get_mut(id.index()).and_then(|s| s.as_mut()) {
            Some(sym) if !sym.removed => Ok(sym),
            _ => Err(CompileError::UndefinedSymbol {
                name: id.to_string(),
                loc: Loc::default(),
            }),
        }
    }

    /// Display name of a symbol, falling back to its handle
    pub fn name(&self, id: SymId) -> String {
        match self.get(id) {
            Some(sym) => sym.name.clone(),
            None => id.to_string(),
        }
    }

    /// Type of a live symbol
    pub fn ty(&self, id: SymId) -> CompileResult<&Type> {
        Ok(&self.sym(id)?.ty)
    }

    /// Remaining uses of a symbol (0 for removed symbols)
    pub fn uses(&self, id: SymId) -> u32 {
        self.get(id).map_or(0, |s| s.uses)
    }

    /// Record one more use
    pub fn add_use(&mut self, id: SymId) -> CompileResult<()> {
        self.sym_mut(id)?.uses += 1;
        Ok(())
    }

    /// Drop one use, returning the remaining count
    pub fn unuse(&mut self, id: SymId) -> CompileResult<u32> {
        let sym = self.sym_mut(id)?;
        if sym.uses == 0 {
            return Err(CompileError::internal(format!(
                "use count of '{}' would go negative",
                sym.name
            )));
        }
        sym.uses -= 1;
        Ok(sym.uses)
    }

    /// Mark a symbol's defining value as inlined into a use
    pub fn propagate(&mut self, id: SymId) -> CompileResult<()> {
        self.sym_mut(id)?.propagated = true;
        Ok(())
    }

    /// Check if the symbol has been propagated
    pub fn is_propagated(&self, id: SymId) -> bool {
        self.get(id).is_some_and(|s| s.propagated)
    }

    /// Propagated with no uses left: its definition may go
    pub fn is_dead(&self, id: SymId) -> bool {
        self.get(id)
            .is_some_and(|s| !s.removed && s.propagated && s.uses == 0)
    }

    /// Remove a symbol whose definition was deleted
    pub fn remove(&mut self, id: SymId) -> CompileResult<()> {
        let sym = self.sym_mut(id)?;
        if sym.uses != 0 {
            return Err(CompileError::internal(format!(
                "removing '{}' with {} use(s) left",
                sym.name, sym.uses
            )));
        }
        sym.removed = true;
        Ok(())
    }

    /// Drop removed symbols from the arena, returning how many were dropped
    ///
    /// Handles of surviving symbols stay valid.
    pub fn cleanup(&mut self) -> usize {
        let mut dropped = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|s| s.removed) {
                *slot = None;
                dropped += 1;
            }
        }
        dropped
    }

    /// Live symbols in creation order
    pub fn values(&self) -> impl Iterator<Item = &Sym> {
        self.slots.iter().flatten().filter(|s| !s.removed)
    }

    /// Check if a handle refers to a live symbol
    pub fn contains(&self, id: SymId) -> bool {
        self.get(id).is_some_and(|s| !s.removed)
    }

    /// Number of live symbols
    pub fn len(&self) -> usize {
        self.values().count()
    }

    /// Check if no symbol is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
