//! Ballistic model demo — binary entry point.
//!
//! Hand-rolls two symbolic functions over a `[height, velocity]` state, asks
//! the engine to generate a single C file for them, and shows constant
//! deduplication and auxiliary inclusion along the way.
//!
//! Usage:
//!   cargo run -p ballistic -- [--out-dir DIR] [--with-main] [--with-mex] [--with-header]

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use nabla_codegen::{
    new_function_id, CodeGenerator, FunctionId, GraphFunction, OptionValue, Options,
};
use nabla_core::Sparsity;

const GRAVITY: f64 = 9.81;
const TIME_STEP: f64 = 0.01;

#[derive(Parser)]
#[command(name = "ballistic", about = "Generate C for a small ballistic model")]
struct Cli {
    /// Output directory for the generated files
    #[arg(long, default_value = "/tmp/ballistic")]
    out_dir: PathBuf,
    /// Emit a command-line dispatch wrapper
    #[arg(long)]
    with_main: bool,
    /// Emit the host-interop dispatch wrapper
    #[arg(long)]
    with_mex: bool,
    /// Also produce a declarations file
    #[arg(long)]
    with_header: bool,
}

/// One explicit Euler step of the state under gravity and linear drag.
struct StepFunction {
    id: FunctionId,
    sp_in: Vec<Sparsity>,
    sp_out: Vec<Sparsity>,
}

impl StepFunction {
    fn new() -> Self {
        Self {
            id: new_function_id(),
            sp_in: vec![Sparsity::dense(2, 1), Sparsity::dense(1, 1)],
            sp_out: vec![Sparsity::dense(2, 1)],
        }
    }
}

impl GraphFunction for StepFunction {
    fn id(&self) -> FunctionId {
        self.id
    }

    fn name(&self) -> &str {
        "step"
    }

    fn signature(&self, fname: &str) -> String {
        format!("int {fname}(const nabla_real** arg, nabla_real** res, int* iw, nabla_real* w, int mem)")
    }

    fn codegen(&self, g: &mut CodeGenerator, fname: &str) -> nabla_codegen::Result<()> {
        let sig = self.signature(fname);
        let consts = g.constant_real(&[GRAVITY, TIME_STEP]);
        g.local("a", "nabla_real", "")?;
        let decls = g.local_declarations();

        g.emit(&format!("static {sig} {{\n"))?;
        g.emit(&decls)?;
        g.comment("acceleration under gravity and linear drag")?;
        g.emit(&format!("a = -{consts}[0] - arg[1][0]*arg[0][1];\n"))?;
        g.emit("if (res[0]) {\n")?;
        let copy = g.copy("arg[0]", 2, "res[0]");
        g.emit(&copy)?;
        g.emit("\n")?;
        g.emit(&format!("res[0][0] += {consts}[1]*arg[0][1];\n"))?;
        g.emit(&format!("res[0][1] += {consts}[1]*a;\n"))?;
        g.emit("}\n")?;
        g.emit("return 0;\n")?;
        g.emit("}\n\n")?;
        Ok(())
    }

    fn sparsity_in(&self) -> &[Sparsity] {
        &self.sp_in
    }

    fn sparsity_out(&self) -> &[Sparsity] {
        &self.sp_out
    }
}

/// Specific mechanical energy of the state.
struct EnergyFunction {
    id: FunctionId,
    sp_in: Vec<Sparsity>,
    sp_out: Vec<Sparsity>,
}

impl EnergyFunction {
    fn new() -> Self {
        Self {
            id: new_function_id(),
            sp_in: vec![Sparsity::dense(2, 1)],
            sp_out: vec![Sparsity::dense(1, 1)],
        }
    }
}

impl GraphFunction for EnergyFunction {
    fn id(&self) -> FunctionId {
        self.id
    }

    fn name(&self) -> &str {
        "energy"
    }

    fn signature(&self, fname: &str) -> String {
        format!("int {fname}(const nabla_real** arg, nabla_real** res, int* iw, nabla_real* w, int mem)")
    }

    fn codegen(&self, g: &mut CodeGenerator, fname: &str) -> nabla_codegen::Result<()> {
        let sig = self.signature(fname);
        let consts = g.constant_real(&[GRAVITY, TIME_STEP]);

        g.emit(&format!("static {sig} {{\n"))?;
        g.comment("kinetic plus potential energy, per unit mass")?;
        g.emit("if (res[0]) {\n")?;
        g.emit(&format!(
            "res[0][0] = 0.5*sq(arg[0][1]) + {consts}[0]*arg[0][0];\n"
        ))?;
        g.emit("}\n")?;
        g.emit("return 0;\n")?;
        g.emit("}\n\n")?;
        Ok(())
    }

    fn sparsity_in(&self) -> &[Sparsity] {
        &self.sp_in
    }

    fn sparsity_out(&self) -> &[Sparsity] {
        &self.sp_out
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let opts = Options::from_pairs(vec![
        ("main", OptionValue::Bool(cli.with_main)),
        ("mex", OptionValue::Bool(cli.with_mex)),
        ("with_header", OptionValue::Bool(cli.with_header)),
    ])?;
    let mut g = CodeGenerator::new("ballistic", opts)?;

    g.expose(&StepFunction::new(), true)?;
    g.expose(&EnergyFunction::new(), false)?;

    let prefix = format!("{}/", cli.out_dir.display());
    let filename = g.generate(&prefix).context("writing generated source")?;
    println!("wrote {filename}");
    if cli.with_header {
        println!("wrote {prefix}ballistic.h");
    }
    Ok(())
}
