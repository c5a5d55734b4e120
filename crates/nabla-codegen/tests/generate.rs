//! End-to-end generation tests with a hand-rolled collaborator.

use nabla_codegen::{
    new_function_id, CodeGenerator, CodegenError, FunctionId, GraphFunction, OptionValue, Options,
};
use nabla_core::Sparsity;

/// A minimal symbolic function: scales the dot product of its input with a
/// constant vector.
struct ScaledDot {
    id: FunctionId,
    name: String,
    weights: Vec<f64>,
    sp_in: Vec<Sparsity>,
    sp_out: Vec<Sparsity>,
}

impl ScaledDot {
    fn new(name: &str, weights: Vec<f64>) -> Self {
        let n = weights.len();
        Self {
            id: new_function_id(),
            name: name.to_string(),
            weights,
            sp_in: vec![Sparsity::dense(n, 1)],
            sp_out: vec![Sparsity::dense(1, 1)],
        }
    }
}

impl GraphFunction for ScaledDot {
    fn id(&self) -> FunctionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self, fname: &str) -> String {
        format!("int {fname}(const nabla_real** arg, nabla_real** res, int* iw, nabla_real* w, int mem)")
    }

    fn codegen(&self, g: &mut CodeGenerator, fname: &str) -> nabla_codegen::Result<()> {
        let n = self.weights.len();
        let sig = self.signature(fname);
        let weights = g.constant_real(&self.weights);
        let dot = g.dot(n, "arg[0]", &weights);
        g.emit(&format!("static {sig} {{\n"))?;
        g.comment("scaled inner product")?;
        g.emit(&format!("if (res[0]) *res[0] = {dot};\n"))?;
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

/// Wraps a shared inner function under a second public name.
struct Alias<'a> {
    inner: &'a ScaledDot,
    name: String,
}

impl GraphFunction for Alias<'_> {
    fn id(&self) -> FunctionId {
        self.inner.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self, fname: &str) -> String {
        self.inner.signature(fname)
    }

    fn codegen(&self, g: &mut CodeGenerator, fname: &str) -> nabla_codegen::Result<()> {
        self.inner.codegen(g, fname)
    }

    fn sparsity_in(&self) -> &[Sparsity] {
        self.inner.sparsity_in()
    }

    fn sparsity_out(&self) -> &[Sparsity] {
        self.inner.sparsity_out()
    }
}

#[test]
fn shared_subfunction_is_generated_once() {
    let mut g = CodeGenerator::new("shared", Options::default()).unwrap();
    let f = ScaledDot::new("objective", vec![1.0, 2.0]);

    let first = g.ensure_generated(&f).unwrap();
    let second = g.ensure_generated(&f).unwrap();
    assert_eq!(first, "nabla_f0");
    assert_eq!(second, "nabla_f0");

    let out = g.render().unwrap();
    assert_eq!(out.matches("static int nabla_f0(").count(), 1);
}

#[test]
fn expose_emits_wrapper_and_dispatch_entry() {
    let opts = Options::from_pairs(vec![
        ("main", OptionValue::Bool(true)),
        ("with_header", OptionValue::Bool(true)),
    ])
    .unwrap();
    let mut g = CodeGenerator::new("rocket", opts).unwrap();

    let f = ScaledDot::new("thrust", vec![0.5, 0.25]);
    g.expose(&f, true).unwrap();
    assert_eq!(g.exposed_names(), &["thrust".to_string()]);

    let out = g.render_source().unwrap();
    // Public wrapper forwards to the generated name
    assert!(out.contains("NABLA_SYMBOL_EXPORT int thrust(const nabla_real** arg"));
    assert!(out.contains("return nabla_f0(arg, res, iw, w, mem);"));
    // Jacobian sparsity accessors are keyed by the public name
    assert!(out.contains("const int* jac_thrust_sparsity_in(int i)"));
    assert!(out.contains("const int* jac_thrust_sparsity_out(int i)"));
    // Dispatch table routes by name to the conventional wrapper symbol
    assert!(out.contains("strcmp(argv[1], \"thrust\")==0"));
    assert!(out.contains("return main_thrust(argc-2, argv+2);"));

    let header = g.render_header().unwrap();
    assert!(header.contains("#define nabla_real double"));
    assert!(header.contains("int thrust(const nabla_real** arg"));
}

#[test]
fn duplicate_exposed_names_are_rejected() {
    let mut g = CodeGenerator::new("dup", Options::default()).unwrap();
    let a = ScaledDot::new("eval", vec![1.0]);
    let b = ScaledDot::new("eval", vec![2.0]);

    g.expose(&a, false).unwrap();
    let err = g.expose(&b, false).unwrap_err();
    assert!(matches!(err, CodegenError::DuplicateSymbol { .. }));
    assert_eq!(g.exposed_names().len(), 1);
}

#[test]
fn two_functions_share_interned_constants() {
    let mut g = CodeGenerator::new("pair", Options::default()).unwrap();
    let a = ScaledDot::new("first", vec![3.0, 4.0]);
    let b = ScaledDot::new("second", vec![3.0, 4.0]);

    g.expose(&a, false).unwrap();
    g.expose(&b, false).unwrap();

    let out = g.render().unwrap();
    // Same weights, one constant array; two generated bodies
    assert_eq!(out.matches("static const nabla_real nabla_c0[2]").count(), 1);
    assert!(!out.contains("nabla_c1"));
    assert!(out.contains("nabla_f0"));
    assert!(out.contains("nabla_f1"));
}

#[test]
fn alias_with_same_identity_reuses_generated_body() {
    let mut g = CodeGenerator::new("alias", Options::default()).unwrap();
    let inner = ScaledDot::new("inner", vec![1.0, 1.0]);
    let alias = Alias {
        inner: &inner,
        name: "outer".to_string(),
    };

    g.expose(&inner, false).unwrap();
    g.expose(&alias, false).unwrap();

    let out = g.render_source().unwrap();
    assert_eq!(out.matches("static int nabla_f0(").count(), 1);
    assert!(!out.contains("nabla_f1"));
    assert!(out.contains("int inner(const nabla_real** arg"));
    assert!(out.contains("int outer(const nabla_real** arg"));
}

#[test]
fn generated_source_is_brace_balanced() {
    let opts = Options::from_pairs(vec![
        ("main", OptionValue::Bool(true)),
        ("mex", OptionValue::Bool(true)),
    ])
    .unwrap();
    let mut g = CodeGenerator::new("balance", opts).unwrap();
    let f = ScaledDot::new("step", vec![1.0, 2.0, 3.0]);
    g.expose(&f, true).unwrap();

    let out = g.render_source().unwrap();
    assert_eq!(out.matches('{').count(), out.matches('}').count());
}

#[test]
fn refcount_wrappers_are_emitted_on_request() {
    struct Counted(ScaledDot);

    impl GraphFunction for Counted {
        fn id(&self) -> FunctionId {
            self.0.id
        }
        fn name(&self) -> &str {
            self.0.name()
        }
        fn signature(&self, fname: &str) -> String {
            self.0.signature(fname)
        }
        fn codegen(&self, g: &mut CodeGenerator, fname: &str) -> nabla_codegen::Result<()> {
            self.0.codegen(g, fname)
        }
        fn has_refcount(&self) -> bool {
            true
        }
        fn codegen_incref(&self, g: &mut CodeGenerator) -> nabla_codegen::Result<()> {
            g.emit("solver_incref();\n")
        }
        fn codegen_decref(&self, g: &mut CodeGenerator) -> nabla_codegen::Result<()> {
            g.emit("solver_decref();\n")
        }
        fn sparsity_in(&self) -> &[Sparsity] {
            self.0.sparsity_in()
        }
        fn sparsity_out(&self) -> &[Sparsity] {
            self.0.sparsity_out()
        }
    }

    let mut g = CodeGenerator::new("counted", Options::default()).unwrap();
    let f = Counted(ScaledDot::new("ode", vec![1.0]));
    g.ensure_generated(&f).unwrap();

    let out = g.render().unwrap();
    assert!(out.contains("void nabla_f0_incref(void) {"));
    assert!(out.contains("solver_incref();"));
    assert!(out.contains("void nabla_f0_decref(void) {"));
}

#[test]
fn generate_writes_source_and_header() {
    let opts = Options::from_pairs(vec![("with_header", OptionValue::Bool(true))]).unwrap();
    let mut g = CodeGenerator::new("disk", opts).unwrap();
    let f = ScaledDot::new("eval", vec![2.0]);
    g.expose(&f, false).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let prefix = format!("{}/", dir.path().display());
    let fullname = g.generate(&prefix).unwrap();
    assert!(fullname.ends_with("disk.c"));

    let source = std::fs::read_to_string(&fullname).unwrap();
    assert!(source.starts_with("/* This file was automatically generated by nabla."));
    assert!(source.contains("#ifdef __cplusplus"));

    let header = std::fs::read_to_string(dir.path().join("disk.h")).unwrap();
    assert!(header.contains("int eval(const nabla_real** arg"));
}

#[test]
fn verbose_annotations_can_be_disabled() {
    let run = |verbose: bool| {
        let opts = Options::from_pairs(vec![("verbose", OptionValue::Bool(verbose))]).unwrap();
        let mut g = CodeGenerator::new("quiet", opts).unwrap();
        let f = ScaledDot::new("eval", vec![1.0]);
        g.expose(&f, false).unwrap();
        g.render().unwrap()
    };
    assert!(run(true).contains("/* scaled inner product */"));
    assert!(!run(false).contains("/* scaled inner product */"));
}
