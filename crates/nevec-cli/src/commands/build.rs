//! `nevec build` — Compile a typed tree to .geada bytecode.

use anyhow::{anyhow, Context};
use nevec_engine::ast::Program as Tree;
use nevec_engine::ir::PrettyPrint;
use nevec_engine::{output_path_for, resolve, CompileOptions, Compiler};
use std::path::{Path, PathBuf};

/// Configuration file picked up from the working directory
const DEFAULT_CONFIG: &str = "nevec.toml";

pub struct BuildArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub no_opt: bool,
    pub registers: Option<u8>,
    pub debug_graph: bool,
    pub emit_ir: bool,
}

pub fn execute(args: BuildArgs) -> anyhow::Result<()> {
    let output = build(&args)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn build(args: &BuildArgs) -> anyhow::Result<PathBuf> {
    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let tree = Tree::from_json(&source)
        .with_context(|| format!("{} is not a valid typed tree", args.input.display()))?;

    if let Err(errors) = resolve(&tree) {
        for error in &errors {
            eprintln!("error: {}", error);
        }
        return Err(anyhow!("{} name resolution error(s)", errors.len()));
    }

    let options = load_options(args)?;
    log::debug!("compile options: {:?}", options);

    let compiled = Compiler::new(options).compile(&tree)?;
    if args.emit_ir {
        print!("{}", compiled.blocks.pretty_print(&compiled.syms));
    }
    log::info!(
        "{} -> {} instruction(s), {} register(s), {} slot(s)",
        compiled.stats.instrs_before,
        compiled.stats.instrs_after,
        compiled.program.register_count,
        compiled.program.slot_count
    );

    let output = args.output.clone().unwrap_or_else(|| output_path_for(&args.input));
    std::fs::write(&output, compiled.program.encode())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}

/// File options (explicit `--config`, else `nevec.toml` if present) with flags on top
fn load_options(args: &BuildArgs) -> anyhow::Result<CompileOptions> {
    let mut options = match &args.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => read_config(Path::new(DEFAULT_CONFIG))?,
        None => CompileOptions::default(),
    };

    if args.no_opt {
        options.optimize = false;
    }
    if let Some(registers) = args.registers {
        options.registers = registers;
    }
    if args.debug_graph {
        options.debug_graph = true;
    }
    options.validate()?;
    Ok(options)
}

fn read_config(path: &Path) -> anyhow::Result<CompileOptions> {
    CompileOptions::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nevec_engine::ast::{BinaryOp, Decl, Expr, Type};
    use nevec_engine::Program;

    fn args(input: PathBuf) -> BuildArgs {
        BuildArgs {
            input,
            output: None,
            config: None,
            no_opt: false,
            registers: None,
            debug_graph: false,
            emit_ir: false,
        }
    }

    fn write_tree(dir: &Path, tree: &Tree) -> PathBuf {
        let path = dir.join("prog.neve.json");
        std::fs::write(&path, serde_json::to_string(tree).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_build_writes_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let tree = Tree::new(vec![
            Decl::constant(
                "x",
                Type::Int,
                Expr::binary(BinaryOp::Plus, Expr::int(2), Expr::int(3), Type::Int),
            ),
            Decl::print(Expr::access("x", Type::Int)),
        ]);
        let input = write_tree(dir.path(), &tree);

        let output = build(&args(input)).unwrap();
        assert_eq!(output, dir.path().join("prog.geada"));

        let program = Program::decode(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(program.code.len(), 3);
    }

    #[test]
    fn test_unbound_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tree = Tree::new(vec![Decl::print(Expr::access("missing", Type::Int))]);
        let input = write_tree(dir.path(), &tree);

        let err = build(&args(input)).unwrap_err();
        assert!(err.to_string().contains("name resolution"));
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("custom.toml");
        std::fs::write(&config, "[compile]\nregisters = 4\noptimize = true\n").unwrap();

        let mut build_args = args(dir.path().join("unused.json"));
        build_args.config = Some(config);
        build_args.no_opt = true;
        let options = load_options(&build_args).unwrap();
        assert_eq!(options.registers, 4);
        assert!(!options.optimize);

        build_args.registers = Some(0);
        assert!(load_options(&build_args).is_err());
    }
}
