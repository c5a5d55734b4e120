//! The code-generation session.
//!
//! A [`CodeGenerator`] is bound to one output target (one source/header file
//! pair) for its whole life: the graph front end declares signatures, interns
//! constants, requests auxiliary routines, and appends statements; at the end
//! the assembler concatenates all sections in a fixed order and optionally
//! appends dispatch wrappers. The whole state is discarded after the final
//! dump.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use nabla_core::Sparsity;

use crate::auxiliary::{sanitize_template, Auxiliary};
use crate::buffer::SourceBuffer;
use crate::error::{CodegenError, Result};
use crate::function::{FunctionId, GraphFunction};
use crate::options::Options;
use crate::pool::{real_literal, ConstantPool};
use crate::symbols::SymbolRegistry;

/// Name of the generated floating scalar typedef. Auxiliary templates are
/// instantiated with this type unless told otherwise.
pub const REAL_SCALAR: &str = "nabla_real";

/// The ordered output sections; their concatenation order is fixed by
/// [`CodeGenerator::render`], not by insertion order.
#[derive(Debug, Default)]
struct Sections {
    includes: String,
    header: String,
    auxiliaries: String,
    body: String,
}

/// One generated sub-function, keyed by collaborator identity.
#[derive(Debug)]
struct FunctionRecord {
    id: FunctionId,
    codegen_name: String,
}

/// A single generation session for one output target.
#[derive(Debug)]
pub struct CodeGenerator {
    opts: Options,
    name: String,
    suffix: String,
    dll_export: &'static str,
    buffer: SourceBuffer,
    sections: Sections,
    symbols: SymbolRegistry,
    int_pool: ConstantPool<i64>,
    real_pool: ConstantPool<f64>,
    added_auxiliaries: HashSet<(Auxiliary, Vec<String>)>,
    added_functions: Vec<FunctionRecord>,
    exposed: Vec<String>,
    sparsity_meta: HashSet<String>,
    locals: BTreeMap<String, (String, String)>,
    local_default: BTreeMap<String, String>,
}

impl CodeGenerator {
    /// Create a session for the output `name`, which may carry an explicit
    /// file suffix; otherwise the suffix follows the linkage option.
    pub fn new(name: &str, opts: Options) -> Result<Self> {
        let (base, suffix) = match name.rfind('.') {
            None => (
                name.to_string(),
                if opts.cpp { ".cpp" } else { ".c" }.to_string(),
            ),
            Some(pos) => (name[..pos].to_string(), name[pos..].to_string()),
        };
        check_name(&base)?;

        let dll_export = if opts.with_export {
            "NABLA_SYMBOL_EXPORT "
        } else {
            ""
        };
        let indent = opts.indent;
        let mut g = Self {
            opts,
            name: base,
            suffix,
            dll_export,
            buffer: SourceBuffer::new(indent),
            sections: Sections::default(),
            symbols: SymbolRegistry::new(),
            int_pool: ConstantPool::new(),
            real_pool: ConstantPool::new(),
            added_auxiliaries: HashSet::new(),
            added_functions: Vec::new(),
            exposed: Vec::new(),
            sparsity_meta: HashSet::new(),
            locals: BTreeMap::new(),
            local_default: BTreeMap::new(),
        };

        // Includes needed by every output
        g.add_include("math.h", false, None);
        if g.opts.main {
            g.add_include("stdio.h", false, None);
        }
        if g.opts.mex || g.opts.main {
            g.add_include("string.h", false, None);
        }
        if g.opts.with_mem {
            g.add_include("nabla/mem.h", true, None);
            g.sections.header.push_str("#include <nabla/mem.h>\n");
        }
        if g.opts.mex {
            g.add_include("mex.h", false, Some("MATLAB_MEX_FILE"));
        }
        Ok(g)
    }

    /// Output base name, without prefix or suffix.
    pub fn base_name(&self) -> &str {
        &self.name
    }

    /// Output file suffix, including the dot.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The session options.
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Names exposed so far, in `expose` order.
    pub fn exposed_names(&self) -> &[String] {
        &self.exposed
    }

    // ------------------------------------------------------------------
    // Buffered emission
    // ------------------------------------------------------------------

    /// Append text to the transient buffer, tracking indentation.
    pub fn emit(&mut self, text: &str) -> Result<()> {
        self.buffer.emit(text)
    }

    /// Emit a comment annotation, when verbose output is enabled.
    pub fn comment(&mut self, text: &str) -> Result<()> {
        if self.opts.verbose {
            self.emit(&format!("/* {text} */\n"))?;
        }
        Ok(())
    }

    /// Atomically move all buffered text into the main-body section.
    pub fn flush_to_body(&mut self) {
        self.buffer.flush_into(&mut self.sections.body);
    }

    // ------------------------------------------------------------------
    // Symbols, includes, externals
    // ------------------------------------------------------------------

    /// Register a shorthand symbol (idempotent) and return its namespaced
    /// name.
    pub fn shorthand(&mut self, short: &str) -> String {
        self.symbols.define(short)
    }

    /// Register a shorthand symbol, failing on a duplicate.
    pub fn shorthand_unique(&mut self, short: &str) -> Result<String> {
        self.symbols.define_unique(short)
    }

    /// Resolve a previously registered shorthand.
    pub fn resolve_shorthand(&self, short: &str) -> Result<String> {
        self.symbols.resolve(short)
    }

    /// Request a header for inclusion, once per distinct name.
    pub fn add_include(&mut self, header: &str, relative: bool, guard: Option<&str>) {
        if !self.symbols.note_include(header) {
            return;
        }
        let inc = &mut self.sections.includes;
        if let Some(g) = guard {
            inc.push_str(&format!("#ifdef {g}\n"));
        }
        if relative {
            inc.push_str(&format!("#include \"{header}\"\n"));
        } else {
            inc.push_str(&format!("#include <{header}>\n"));
        }
        if guard.is_some() {
            inc.push_str("#endif\n");
        }
    }

    /// Forward-declare an external symbol, deduplicated by exact text.
    pub fn add_external(&mut self, declaration: &str) {
        self.symbols.add_external(declaration);
    }

    /// Declare a function signature: appended to the header section when a
    /// declarations file was requested, and returned with the linkage and
    /// visibility qualifiers for use at the definition site.
    pub fn declare(&mut self, signature: &str) -> String {
        let cpp_prefix = if self.opts.cpp { "extern \"C\" " } else { "" };
        if self.opts.with_header {
            self.sections.header.push_str(cpp_prefix);
            self.sections.header.push_str(signature);
            self.sections.header.push_str(";\n");
        }
        format!("{cpp_prefix}{}{signature}", self.dll_export)
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    /// Intern a floating constant array and return its symbol.
    pub fn constant_real(&mut self, values: &[f64]) -> String {
        let index = self.real_pool.intern(values);
        self.shorthand(&format!("c{index}"))
    }

    /// Intern an integer constant array and return its symbol.
    pub fn constant_int(&mut self, values: &[i64]) -> String {
        let index = self.int_pool.intern(values);
        self.shorthand(&format!("s{index}"))
    }

    /// Look up a floating constant that must already exist.
    pub fn get_constant_real(&self, values: &[f64]) -> Result<usize> {
        self.real_pool.find(values)
    }

    /// Look up an integer constant that must already exist.
    pub fn get_constant_int(&self, values: &[i64]) -> Result<usize> {
        self.int_pool.find(values)
    }

    /// Intern a sparsity pattern and return its pool index.
    pub fn add_sparsity(&mut self, sp: &Sparsity) -> usize {
        self.int_pool.intern(&sp.compress())
    }

    /// Intern a sparsity pattern and return its symbol.
    pub fn sparsity(&mut self, sp: &Sparsity) -> String {
        let index = self.add_sparsity(sp);
        self.shorthand(&format!("s{index}"))
    }

    /// Look up a sparsity pattern that must already exist.
    pub fn get_sparsity(&self, sp: &Sparsity) -> Result<usize> {
        self.int_pool.find(&sp.compress())
    }

    // ------------------------------------------------------------------
    // Auxiliary routines
    // ------------------------------------------------------------------

    /// Request an auxiliary routine for the default scalar type.
    pub fn add_auxiliary(&mut self, kind: Auxiliary) {
        self.add_auxiliary_impl(kind, vec![REAL_SCALAR.to_string()]);
    }

    /// Request an auxiliary routine for explicit type parameters.
    pub fn add_auxiliary_inst(&mut self, kind: Auxiliary, inst: &[&str]) {
        self.add_auxiliary_impl(kind, inst.iter().map(|s| s.to_string()).collect());
    }

    fn add_auxiliary_impl(&mut self, kind: Auxiliary, inst: Vec<String>) {
        if !self.added_auxiliaries.insert((kind, inst.clone())) {
            return;
        }
        debug!("instantiating auxiliary {kind:?} for {inst:?}");

        // Dependencies first, with their own type parameters
        for dep in kind.deps() {
            let dep_inst = match dep.inst {
                None => vec![REAL_SCALAR.to_string()],
                Some(list) => list.iter().map(|s| s.to_string()).collect(),
            };
            self.add_auxiliary_impl(dep.kind, dep_inst);
        }

        // A densify over a single type expands into both slots
        let mut inst = inst;
        if kind == Auxiliary::Densify && inst.len() == 1 {
            inst.push(inst[0].clone());
        }

        let sanitized = sanitize_template(kind.template(), &inst, REAL_SCALAR);
        for sym in &sanitized.symbols {
            self.symbols.define(sym);
        }
        if kind.mex_guarded() {
            self.sections.auxiliaries.push_str("#ifdef MATLAB_MEX_FILE\n");
            self.sections.auxiliaries.push_str(&sanitized.text);
            self.sections.auxiliaries.push_str("#endif\n\n");
        } else {
            self.sections.auxiliaries.push_str(&sanitized.text);
        }
    }

    // ------------------------------------------------------------------
    // Calls into the numeric library
    // ------------------------------------------------------------------

    /// Copy statement.
    pub fn copy(&mut self, arg: &str, n: usize, res: &str) -> String {
        self.add_auxiliary(Auxiliary::Copy);
        format!("nabla_copy({arg}, {n}, {res});")
    }

    /// Fill statement.
    pub fn fill(&mut self, res: &str, n: usize, value: &str) -> String {
        self.add_auxiliary(Auxiliary::Fill);
        format!("nabla_fill({res}, {n}, {value});")
    }

    /// Inner product expression.
    pub fn dot(&mut self, n: usize, x: &str, y: &str) -> String {
        self.add_auxiliary(Auxiliary::Dot);
        format!("nabla_dot({n}, {x}, {y})")
    }

    /// `y += alpha*x` statement.
    pub fn axpy(&mut self, n: usize, alpha: &str, x: &str, y: &str) -> String {
        self.add_auxiliary(Auxiliary::Axpy);
        format!("nabla_axpy({n}, {alpha}, {x}, {y});")
    }

    /// In-place scaling statement.
    pub fn scal(&mut self, n: usize, alpha: &str, x: &str) -> String {
        self.add_auxiliary(Auxiliary::Scal);
        format!("nabla_scal({n}, {alpha}, {x});")
    }

    /// Bilinear form expression.
    pub fn bilin(&mut self, a: &str, sp_a: &Sparsity, x: &str, y: &str) -> String {
        self.add_auxiliary(Auxiliary::Bilin);
        let sp = self.sparsity(sp_a);
        format!("nabla_bilin({a}, {sp}, {x}, {y})")
    }

    /// Sparse rank-1 update statement.
    pub fn rank1(&mut self, a: &str, sp_a: &Sparsity, alpha: &str, x: &str, y: &str) -> String {
        self.add_auxiliary(Auxiliary::Rank1);
        let sp = self.sparsity(sp_a);
        format!("nabla_rank1({a}, {sp}, {alpha}, {x}, {y});")
    }

    /// Sparse matrix-vector product statement.
    pub fn mv(&mut self, x: &str, sp_x: &Sparsity, y: &str, z: &str, tr: bool) -> String {
        self.add_auxiliary(Auxiliary::Mv);
        let sp = self.sparsity(sp_x);
        format!("nabla_mv({x}, {sp}, {y}, {z}, {});", if tr { 1 } else { 0 })
    }

    /// Dense matrix-vector product statement.
    pub fn mv_dense(
        &mut self,
        x: &str,
        nrow_x: usize,
        ncol_x: usize,
        y: &str,
        z: &str,
        tr: bool,
    ) -> String {
        self.add_auxiliary(Auxiliary::MvDense);
        format!(
            "nabla_mv_dense({x}, {nrow_x}, {ncol_x}, {y}, {z}, {});",
            if tr { 1 } else { 0 }
        )
    }

    /// Sparse matrix-matrix product statement.
    #[allow(clippy::too_many_arguments)]
    pub fn mtimes(
        &mut self,
        x: &str,
        sp_x: &Sparsity,
        y: &str,
        sp_y: &Sparsity,
        z: &str,
        sp_z: &Sparsity,
        w: &str,
        tr: bool,
    ) -> String {
        self.add_auxiliary(Auxiliary::Mtimes);
        let spx = self.sparsity(sp_x);
        let spy = self.sparsity(sp_y);
        let spz = self.sparsity(sp_z);
        format!(
            "nabla_mtimes({x}, {spx}, {y}, {spy}, {z}, {spz}, {w}, {});",
            if tr { 1 } else { 0 }
        )
    }

    /// Projection between sparsity patterns; a plain copy when they match.
    pub fn project(
        &mut self,
        arg: &str,
        sp_arg: &Sparsity,
        res: &str,
        sp_res: &Sparsity,
        w: &str,
    ) -> String {
        if sp_arg == sp_res {
            return self.copy(arg, sp_arg.nnz(), res);
        }
        self.add_auxiliary(Auxiliary::Project);
        let spa = self.sparsity(sp_arg);
        let spr = self.sparsity(sp_res);
        format!("nabla_project({arg}, {spa}, {res}, {spr}, {w});")
    }

    /// Sparse transpose expression.
    pub fn trans(&mut self, x: &str, sp_x: &Sparsity, y: &str, sp_y: &Sparsity, iw: &str) -> String {
        self.add_auxiliary(Auxiliary::Trans);
        let spx = self.sparsity(sp_x);
        let spy = self.sparsity(sp_y);
        format!("nabla_trans({x}, {spx}, {y}, {spy}, {iw})")
    }

    /// Multilinear interpolation statement.
    #[allow(clippy::too_many_arguments)]
    pub fn interpn(
        &mut self,
        ndim: usize,
        grid: &str,
        offset: &str,
        values: &str,
        x: &str,
        lookup_mode: &str,
        iw: &str,
        w: &str,
    ) -> String {
        self.add_auxiliary(Auxiliary::Interpn);
        format!("nabla_interpn({ndim}, {grid}, {offset}, {values}, {x}, {lookup_mode}, {iw}, {w});")
    }

    /// Gradient of the multilinear interpolation, statement.
    #[allow(clippy::too_many_arguments)]
    pub fn interpn_grad(
        &mut self,
        grad: &str,
        ndim: usize,
        grid: &str,
        offset: &str,
        values: &str,
        x: &str,
        lookup_mode: &str,
        iw: &str,
        w: &str,
    ) -> String {
        self.add_auxiliary(Auxiliary::InterpnGrad);
        format!(
            "nabla_interpn_grad({grad}, {ndim}, {grid}, {offset}, {values}, {x}, {lookup_mode}, {iw}, {w});"
        )
    }

    /// Marshal a sparse result to the host interop type.
    pub fn to_mex(&mut self, sp: &Sparsity, arg: &str) -> String {
        self.add_auxiliary(Auxiliary::ToMex);
        let sym = self.sparsity(sp);
        format!("nabla_to_mex({sym}, {arg});")
    }

    /// Marshal a host interop value into sparse storage. A nonzero result
    /// offset is folded into the result expression up front.
    pub fn from_mex(
        &mut self,
        arg: &str,
        res: &str,
        res_off: usize,
        sp_res: &Sparsity,
        w: &str,
    ) -> String {
        let res = if res_off != 0 {
            format!("{res}+{res_off}")
        } else {
            res.to_string()
        };
        self.add_auxiliary(Auxiliary::FromMex);
        let sym = self.sparsity(sp_res);
        format!("nabla_from_mex({arg}, {res}, {sym}, {w});")
    }

    /// Print statement through the `PRINTF` macro.
    pub fn printf_call(&mut self, fmt: &str, args: &[&str]) -> String {
        self.add_include("stdio.h", false, None);
        let mut s = format!("PRINTF(\"{fmt}\"");
        for arg in args {
            s.push_str(", ");
            s.push_str(arg);
        }
        s.push_str(");");
        s
    }

    /// A call to a generated function.
    pub fn call(&self, fname: &str, args: &[&str]) -> String {
        format!("{fname}({})", args.join(", "))
    }

    // ------------------------------------------------------------------
    // Work vectors and locals
    // ------------------------------------------------------------------

    /// Address of work vector `n` holding `sz` elements; `None` renders a
    /// null pointer.
    pub fn work(&self, n: Option<usize>, sz: usize) -> String {
        match n {
            None => "0".to_string(),
            Some(_) if sz == 0 => "0".to_string(),
            Some(n) if sz == 1 && !self.opts.codegen_scalars => format!("(&w{n})"),
            Some(n) => format!("w{n}"),
        }
    }

    /// Element access to the single-element work vector `n`.
    pub fn work_element(&self, n: Option<usize>) -> String {
        match n {
            None => "0".to_string(),
            Some(n) if self.opts.codegen_scalars => format!("*w{n}"),
            Some(n) => format!("w{n}"),
        }
    }

    /// Record a local variable binding; re-declaring identically is a no-op.
    pub fn local(&mut self, name: &str, ty: &str, reference: &str) -> Result<()> {
        match self.locals.get(name) {
            None => {
                self.locals
                    .insert(name.to_string(), (ty.to_string(), reference.to_string()));
                Ok(())
            }
            Some((have_ty, have_ref)) => {
                if have_ty != ty || have_ref != reference {
                    return Err(CodegenError::TypeMismatch {
                        name: name.to_string(),
                        have: format!("{have_ty} {have_ref}"),
                        requested: format!("{ty} {reference}"),
                    });
                }
                Ok(())
            }
        }
    }

    /// Record an initial value for a local variable.
    pub fn init_local(&mut self, name: &str, def: &str) -> Result<()> {
        if self.local_default.contains_key(name) {
            return Err(CodegenError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        self.local_default.insert(name.to_string(), def.to_string());
        Ok(())
    }

    /// Render and drain the recorded local declarations, sorted by name.
    pub fn local_declarations(&mut self) -> String {
        let mut s = String::new();
        for (name, (ty, reference)) in &self.locals {
            match self.local_default.get(name) {
                Some(def) => s.push_str(&format!("{ty} {reference}{name} = {def};\n")),
                None => s.push_str(&format!("{ty} {reference}{name};\n")),
            }
        }
        self.locals.clear();
        self.local_default.clear();
        s
    }

    // ------------------------------------------------------------------
    // Static array rendering
    // ------------------------------------------------------------------

    /// Render an array declaration; zero-length arrays become null pointers.
    pub fn array(ty: &str, name: &str, len: usize, def: &str) -> String {
        if len == 0 {
            format!("{ty} *{name} = 0;\n")
        } else if def.is_empty() {
            format!("{ty} {name}[{len}];\n")
        } else {
            format!("{ty} {name}[{len}] = {def};\n")
        }
    }

    /// Brace initializer for an integer array.
    pub fn initializer_ints(values: &[i64]) -> String {
        let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        format!("{{{}}}", items.join(", "))
    }

    /// Brace initializer for a floating array.
    pub fn initializer_reals(values: &[f64]) -> String {
        let items: Vec<String> = values.iter().map(|&v| real_literal(v)).collect();
        format!("{{{}}}", items.join(", "))
    }

    // ------------------------------------------------------------------
    // Dependency management
    // ------------------------------------------------------------------

    /// Generate `f` at most once, returning its generated name. A repeated
    /// request with the same identity returns the stored name without
    /// emitting anything.
    pub fn ensure_generated(&mut self, f: &dyn GraphFunction) -> Result<String> {
        if let Some(record) = self.added_functions.iter().find(|r| r.id == f.id()) {
            debug!("function '{}' already generated", f.name());
            return Ok(record.codegen_name.clone());
        }

        let fname = self.shorthand(&format!("f{}", self.added_functions.len()));
        self.added_functions.push(FunctionRecord {
            id: f.id(),
            codegen_name: fname.clone(),
        });

        f.codegen_declarations(self)?;
        f.codegen(self, &fname)?;

        if f.has_refcount() {
            self.emit(&format!("void {fname}_incref(void) {{\n"))?;
            f.codegen_incref(self)?;
            self.emit("}\n\n")?;

            self.emit(&format!("void {fname}_decref(void) {{\n"))?;
            f.codegen_decref(self)?;
            self.emit("}\n\n")?;
        }

        self.flush_to_body();
        self.locals.clear();
        self.local_default.clear();
        Ok(fname)
    }

    /// Generate `f` and expose it: a public wrapper forwarding to the
    /// generated name, metadata, optionally the Jacobian sparsity accessors,
    /// and an entry in the dispatch tables. Duplicate exposed names are
    /// rejected.
    pub fn expose(&mut self, f: &dyn GraphFunction, with_jac_sparsity: bool) -> Result<()> {
        if self.exposed.iter().any(|n| n == f.name()) {
            return Err(CodegenError::DuplicateSymbol {
                name: f.name().to_string(),
            });
        }

        let codegen_name = self.ensure_generated(f)?;

        let decl = self.declare(&f.signature(f.name()));
        self.emit(&decl)?;
        self.emit(" {\n")?;
        self.emit(&format!("return {codegen_name}(arg, res, iw, w, mem);\n"))?;
        self.emit("}\n\n")?;

        f.codegen_meta(self)?;

        if with_jac_sparsity {
            let jac = f.jacobian_sparsity();
            let name = format!("jac_{}", f.name());
            self.add_io_sparsities(&name, f.sparsity_in(), std::slice::from_ref(&jac))?;
        }

        self.flush_to_body();
        self.exposed.push(f.name().to_string());
        Ok(())
    }

    /// Emit paired sparsity accessor functions for `name`, once per name.
    pub fn add_io_sparsities(
        &mut self,
        name: &str,
        sp_in: &[Sparsity],
        sp_out: &[Sparsity],
    ) -> Result<()> {
        if !self.sparsity_meta.insert(name.to_string()) {
            return Ok(());
        }

        let decl = self.declare(&format!("const int* {name}_sparsity_in(int i)"));
        self.emit(&decl)?;
        self.emit(" {\n")?;
        self.emit("switch (i) {\n")?;
        for (i, sp) in sp_in.iter().enumerate() {
            let sym = self.sparsity(sp);
            self.emit(&format!("case {i}: return {sym};\n"))?;
        }
        self.emit("default: return 0;\n}\n")?;
        self.emit("}\n\n")?;

        let decl = self.declare(&format!("const int* {name}_sparsity_out(int i)"));
        self.emit(&decl)?;
        self.emit(" {\n")?;
        self.emit("switch (i) {\n")?;
        for (i, sp) in sp_out.iter().enumerate() {
            let sym = self.sparsity(sp);
            self.emit(&format!("case {i}: return {sym};\n"))?;
        }
        self.emit("default: return 0;\n}\n")?;
        self.emit("}\n\n")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    /// Concatenate all sections in their fixed order.
    pub fn render(&self) -> Result<String> {
        self.buffer.finalize()?;

        let mut s = String::new();

        s.push_str("/* How to prefix internal symbols */\n");
        s.push_str("#ifdef CODEGEN_PREFIX\n");
        s.push_str("  #define NAMESPACE_CONCAT(NS, ID) _NAMESPACE_CONCAT(NS, ID)\n");
        s.push_str("  #define _NAMESPACE_CONCAT(NS, ID) NS ## ID\n");
        s.push_str("  #define NABLA_PREFIX(ID) NAMESPACE_CONCAT(CODEGEN_PREFIX, ID)\n");
        s.push_str("#else\n");
        s.push_str(&format!("  #define NABLA_PREFIX(ID) {}_ ## ID\n", self.name));
        s.push_str("#endif\n\n");

        s.push_str(&self.sections.includes);
        s.push('\n');

        self.render_real_type(&mut s);

        let (to_double, to_int, cast) = if self.opts.cpp {
            (
                "static_cast<double>(x)",
                "static_cast<int>(x)",
                "static_cast<x>(y)",
            )
        } else {
            ("(double) x", "(int) x", "(x) y")
        };
        s.push_str(&format!("#define to_double(x) {to_double}\n"));
        s.push_str(&format!("#define to_int(x) {to_int}\n"));
        s.push_str(&format!("#define NABLA_CAST(x,y) {cast}\n\n"));

        s.push_str("/* Pre-c99 compatibility */\n");
        s.push_str("#if __STDC_VERSION__ < 199901L\n");
        s.push_str("  #define fmin NABLA_PREFIX(fmin)\n");
        s.push_str("  nabla_real fmin(nabla_real x, nabla_real y) { return x<y ? x : y;}\n");
        s.push_str("  #define fmax NABLA_PREFIX(fmax)\n");
        s.push_str("  nabla_real fmax(nabla_real x, nabla_real y) { return x>y ? x : y;}\n");
        s.push_str("#endif\n\n");

        s.push_str("/* Numeric extensions */\n");
        s.push_str("#define sq NABLA_PREFIX(sq)\n");
        s.push_str("nabla_real sq(nabla_real x) { return x*x;}\n");
        s.push_str("#define sign NABLA_PREFIX(sign)\n");
        s.push_str("nabla_real sign(nabla_real x) { return x<0 ? -1 : x>0 ? 1 : x;}\n");
        s.push_str("#define twice NABLA_PREFIX(twice)\n");
        s.push_str("nabla_real twice(nabla_real x) { return x+x;}\n\n");

        if self.symbols.has_shorthands() {
            s.push_str("/* Add prefix to internal symbols */\n");
            for short in self.symbols.shorthands() {
                s.push_str(&format!("#define nabla_{short} NABLA_PREFIX({short})\n"));
            }
            s.push('\n');
        }

        s.push_str("/* Printing routine */\n");
        if self.opts.mex {
            s.push_str("#ifdef MATLAB_MEX_FILE\n");
            s.push_str("  #define PRINTF mexPrintf\n");
            s.push_str("#else\n");
            s.push_str("  #define PRINTF printf\n");
            s.push_str("#endif\n");
        } else {
            s.push_str("#define PRINTF printf\n");
        }
        s.push('\n');

        if self.opts.with_export {
            s.push_str("/* Symbol visibility in DLLs */\n");
            s.push_str("#ifndef NABLA_SYMBOL_EXPORT\n");
            s.push_str("  #if defined(_WIN32) || defined(__WIN32__) || defined(__CYGWIN__)\n");
            s.push_str("    #if defined(STATIC_LINKED)\n");
            s.push_str("      #define NABLA_SYMBOL_EXPORT\n");
            s.push_str("    #else\n");
            s.push_str("      #define NABLA_SYMBOL_EXPORT __declspec(dllexport)\n");
            s.push_str("    #endif\n");
            s.push_str("  #elif defined(__GNUC__) && defined(GCC_HASCLASSVISIBILITY)\n");
            s.push_str("    #define NABLA_SYMBOL_EXPORT __attribute__ ((visibility (\"default\")))\n");
            s.push_str("  #else\n");
            s.push_str("    #define NABLA_SYMBOL_EXPORT\n");
            s.push_str("  #endif\n");
            s.push_str("#endif\n\n");
        }

        if !self.int_pool.is_empty() {
            for (i, values) in self.int_pool.iter().enumerate() {
                s.push_str(&Self::array(
                    "static const int",
                    &format!("nabla_s{i}"),
                    values.len(),
                    &Self::initializer_ints(values),
                ));
            }
            s.push('\n');
        }

        if !self.real_pool.is_empty() {
            for (i, values) in self.real_pool.iter().enumerate() {
                s.push_str(&Self::array(
                    "static const nabla_real",
                    &format!("nabla_c{i}"),
                    values.len(),
                    &Self::initializer_reals(values),
                ));
            }
            s.push('\n');
        }

        if self.symbols.has_externals() {
            s.push_str("/* External functions */\n");
            for decl in self.symbols.externals() {
                s.push_str(decl);
                s.push('\n');
            }
            s.push_str("\n\n");
        }

        s.push_str(&self.sections.auxiliaries);
        s.push_str(&self.sections.body);
        s.push('\n');
        Ok(s)
    }

    /// Render the complete source file, wrapped with the banner, linkage
    /// guard, and any requested dispatch wrappers.
    pub fn render_source(&self) -> Result<String> {
        let mut s = String::new();
        self.file_banner(&mut s);
        s.push_str(&self.render()?);
        if self.opts.mex {
            self.dispatch_mex(&mut s);
        }
        if self.opts.main {
            self.dispatch_main(&mut s);
        }
        self.file_footer(&mut s);
        Ok(s)
    }

    /// Render the declarations file.
    pub fn render_header(&self) -> Result<String> {
        let mut s = String::new();
        self.file_banner(&mut s);
        self.render_real_type(&mut s);
        s.push_str(&self.sections.header);
        self.file_footer(&mut s);
        Ok(s)
    }

    /// Write the source file (and the header, when requested) under the
    /// given path prefix. Returns the source filename.
    pub fn generate(&self, prefix: &str) -> Result<String> {
        let output_name = format!("{}{}", self.name, self.suffix);
        if prefix.contains(&output_name) {
            return Err(CodegenError::StaleInterfaceUsage {
                detail: format!(
                    "prefix '{prefix}' contains the output filename '{output_name}'; \
                     provide only a path prefix"
                ),
            });
        }

        let fullname = format!("{prefix}{output_name}");
        std::fs::write(&fullname, self.render_source()?)?;

        if self.opts.with_header {
            let header_name = format!("{prefix}{}.h", self.name);
            std::fs::write(header_name, self.render_header()?)?;
        }
        Ok(fullname)
    }

    fn render_real_type(&self, s: &mut String) {
        s.push_str(&format!(
            "#ifndef nabla_real\n#define nabla_real {}\n#endif\n\n",
            self.opts.real_type
        ));
    }

    fn file_banner(&self, s: &mut String) {
        s.push_str("/* This file was automatically generated by nabla.\n");
        s.push_str("   The nabla copyright holders make no ownership claim of its contents. */\n");
        if !self.opts.cpp {
            s.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
        }
    }

    fn file_footer(&self, s: &mut String) {
        if !self.opts.cpp {
            s.push_str("#ifdef __cplusplus\n} /* extern \"C\" */\n#endif\n");
        }
    }

    /// Host-interop entry point: route a runtime command string to the
    /// matching `mex_<name>` wrapper, first match wins.
    fn dispatch_mex(&self, s: &mut String) {
        s.push_str("#ifdef MATLAB_MEX_FILE\n");
        if self.opts.cpp {
            s.push_str("extern \"C\"\n");
        }
        s.push_str("void mexFunction(int resc, mxArray *resv[], int argc, const mxArray *argv[]) {\n");

        let buf_len = self.exposed.iter().map(String::len).max().unwrap_or(0);
        s.push_str(&format!("  char buf[{}];\n", buf_len + 1));
        s.push_str("  int buf_ok = --argc >= 0 && !mxGetString(*argv++, buf, sizeof(buf));\n");

        s.push_str("  if (!buf_ok) {\n");
        s.push_str("    /* name error */\n");
        for name in &self.exposed {
            s.push_str(&format!("  }} else if (strcmp(buf, \"{name}\")==0) {{\n"));
            s.push_str(&format!("    return mex_{name}(resc, resv, argc, argv);\n"));
        }
        s.push_str("  }\n");

        s.push_str("  mexErrMsgTxt(\"First input should be a command string. Possible values:");
        for name in &self.exposed {
            s.push_str(&format!(" '{name}'"));
        }
        s.push_str("\");\n");

        s.push_str("}\n");
        s.push_str("#endif\n");
    }

    /// Command-line entry point: route `argv[1]` to the matching
    /// `main_<name>` wrapper, first match wins.
    fn dispatch_main(&self, s: &mut String) {
        s.push_str("int main(int argc, char* argv[]) {\n");

        s.push_str("  if (argc<2) {\n");
        s.push_str("    /* name error */\n");
        for name in &self.exposed {
            s.push_str(&format!("  }} else if (strcmp(argv[1], \"{name}\")==0) {{\n"));
            s.push_str(&format!("    return main_{name}(argc-2, argv+2);\n"));
        }
        s.push_str("  }\n");

        s.push_str("  fprintf(stderr, \"First input should be a command string. Possible values:");
        for name in &self.exposed {
            s.push_str(&format!(" '{name}'"));
        }
        s.push_str("\\n\");\n");

        s.push_str("  return 1;\n");
        s.push_str("}\n");
    }
}

/// Check that a base name is usable as a symbol prefix.
fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(CodegenError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
