//! `nevec disasm` — Print a .geada program image.

use anyhow::Context;
use nevec_engine::{disassemble, Program};
use std::path::Path;

pub fn execute(file: &Path) -> anyhow::Result<()> {
    let text = render(file)?;
    print!("{}", text);
    Ok(())
}

fn render(file: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let program =
        Program::decode(&bytes).with_context(|| format!("{} is not a valid program image", file.display()))?;
    Ok(disassemble(&program)?)
}
