//! Catalog of reusable numeric routines.
//!
//! Each routine kind owns a generic source template, kept as a stand-alone
//! compilable C++ header under `src/runtime/`, and a static list of other
//! kinds that must be emitted first. The generator instantiates a template by
//! textual rewriting: scaffolding lines are dropped, type placeholders `T1`,
//! `T2`, … are substituted with concrete type names, and the routine's symbol
//! is suffixed when instantiated for anything other than the default scalar,
//! so one template serves every required type combination.
//!
//! Two line directives drive the rewrite:
//!
//! - `// SYMBOL "name"` declares the routine's shorthand symbol;
//! - `// C-REPLACE "key" "replacement"` applies a literal substitution to all
//!   following lines of this instance.

/// A reusable numeric routine kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Auxiliary {
    /// Vector copy, zero-filling on a null source.
    Copy,
    /// Strided vector swap.
    Swap,
    /// In-place vector scaling.
    Scal,
    /// `y += alpha*x`.
    Axpy,
    /// Inner product.
    Dot,
    /// Bilinear form `x'*A*y` over a sparse `A`.
    Bilin,
    /// Sparse rank-1 update `A += alpha*x*y'`.
    Rank1,
    /// Index of the entry with the largest magnitude.
    Iamax,
    /// Vector fill.
    Fill,
    /// Sparse matrix-vector product.
    Mv,
    /// Dense matrix-vector product.
    MvDense,
    /// Sparse matrix-matrix product.
    Mtimes,
    /// Projection between sparsity patterns.
    Project,
    /// Expand a sparse vector into dense storage.
    Densify,
    /// Sparse transpose.
    Trans,
    /// 1-norm.
    Norm1,
    /// 2-norm.
    Norm2,
    /// Infinity-norm.
    NormInf,
    /// Locate the grid interval containing a query point.
    Low,
    /// Advance a corner of the interpolation hypercube.
    Flip,
    /// Interpolation weights per dimension.
    InterpnWeights,
    /// Evaluate one corner contribution of the interpolation.
    InterpnInterpolate,
    /// Multilinear grid interpolation.
    Interpn,
    /// Gradient of the multilinear grid interpolation.
    InterpnGrad,
    /// Cox-de Boor recursion over a knot span.
    DeBoor,
    /// Tensor-product B-spline evaluation.
    NdBoorEval,
    /// Finite-difference derivative estimate.
    FiniteDiff,
    /// Marshal a sparse result to the host interop type.
    ToMex,
    /// Marshal a host interop value into sparse storage.
    FromMex,
}

/// A dependency of a routine kind: the kind to pull in first, with `None`
/// meaning the default scalar instantiation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dep {
    pub kind: Auxiliary,
    pub inst: Option<&'static [&'static str]>,
}

impl Auxiliary {
    /// The generic source template of this kind.
    pub(crate) fn template(self) -> &'static str {
        match self {
            Auxiliary::Copy => include_str!("runtime/copy.hpp"),
            Auxiliary::Swap => include_str!("runtime/swap.hpp"),
            Auxiliary::Scal => include_str!("runtime/scal.hpp"),
            Auxiliary::Axpy => include_str!("runtime/axpy.hpp"),
            Auxiliary::Dot => include_str!("runtime/dot.hpp"),
            Auxiliary::Bilin => include_str!("runtime/bilin.hpp"),
            Auxiliary::Rank1 => include_str!("runtime/rank1.hpp"),
            Auxiliary::Iamax => include_str!("runtime/iamax.hpp"),
            Auxiliary::Fill => include_str!("runtime/fill.hpp"),
            Auxiliary::Mv => include_str!("runtime/mv.hpp"),
            Auxiliary::MvDense => include_str!("runtime/mv_dense.hpp"),
            Auxiliary::Mtimes => include_str!("runtime/mtimes.hpp"),
            Auxiliary::Project => include_str!("runtime/project.hpp"),
            Auxiliary::Densify => include_str!("runtime/densify.hpp"),
            Auxiliary::Trans => include_str!("runtime/trans.hpp"),
            Auxiliary::Norm1 => include_str!("runtime/norm_1.hpp"),
            Auxiliary::Norm2 => include_str!("runtime/norm_2.hpp"),
            Auxiliary::NormInf => include_str!("runtime/norm_inf.hpp"),
            Auxiliary::Low => include_str!("runtime/low.hpp"),
            Auxiliary::Flip => include_str!("runtime/flip.hpp"),
            Auxiliary::InterpnWeights => include_str!("runtime/interpn_weights.hpp"),
            Auxiliary::InterpnInterpolate => include_str!("runtime/interpn_interpolate.hpp"),
            Auxiliary::Interpn => include_str!("runtime/interpn.hpp"),
            Auxiliary::InterpnGrad => include_str!("runtime/interpn_grad.hpp"),
            Auxiliary::DeBoor => include_str!("runtime/de_boor.hpp"),
            Auxiliary::NdBoorEval => include_str!("runtime/nd_boor_eval.hpp"),
            Auxiliary::FiniteDiff => include_str!("runtime/finite_diff.hpp"),
            Auxiliary::ToMex => include_str!("runtime/to_mex.hpp"),
            Auxiliary::FromMex => include_str!("runtime/from_mex.hpp"),
        }
    }

    /// Other kinds this one requires, emitted before or alongside it.
    pub(crate) fn deps(self) -> &'static [Dep] {
        match self {
            Auxiliary::Interpn => &[
                Dep {
                    kind: Auxiliary::InterpnWeights,
                    inst: None,
                },
                Dep {
                    kind: Auxiliary::InterpnInterpolate,
                    inst: None,
                },
                Dep {
                    kind: Auxiliary::Flip,
                    inst: Some(&[]),
                },
                Dep {
                    kind: Auxiliary::Fill,
                    inst: None,
                },
                Dep {
                    kind: Auxiliary::Fill,
                    inst: Some(&["int"]),
                },
            ],
            Auxiliary::InterpnGrad => &[Dep {
                kind: Auxiliary::Interpn,
                inst: None,
            }],
            Auxiliary::InterpnWeights => &[Dep {
                kind: Auxiliary::Low,
                inst: None,
            }],
            Auxiliary::NdBoorEval => &[
                Dep {
                    kind: Auxiliary::DeBoor,
                    inst: None,
                },
                Dep {
                    kind: Auxiliary::Fill,
                    inst: None,
                },
                Dep {
                    kind: Auxiliary::Fill,
                    inst: Some(&["int"]),
                },
                Dep {
                    kind: Auxiliary::Low,
                    inst: None,
                },
            ],
            Auxiliary::Densify => &[Dep {
                kind: Auxiliary::Fill,
                inst: None,
            }],
            Auxiliary::FromMex => &[Dep {
                kind: Auxiliary::Fill,
                inst: None,
            }],
            _ => &[],
        }
    }

    /// Whether the instantiated body must be wrapped in the host-interop
    /// compilation guard.
    pub(crate) fn mex_guarded(self) -> bool {
        matches!(self, Auxiliary::ToMex | Auxiliary::FromMex)
    }
}

/// Result of sanitizing a template: the concrete body and the shorthand
/// symbols it declared (already suffixed).
#[derive(Debug)]
pub(crate) struct Sanitized {
    pub text: String,
    pub symbols: Vec<String>,
}

/// Rewrite a generic template into a concrete routine body.
///
/// `inst` supplies the concrete name for each type placeholder in declaration
/// order; `default_scalar` is the engine's default scalar type name. When any
/// type parameter differs from the default, declared symbols are suffixed
/// with the underscore-joined parameter list so distinct instantiations get
/// distinct names.
pub(crate) fn sanitize_template(src: &str, inst: &[String], default_scalar: &str) -> Sanitized {
    let mut suffix = String::new();
    if inst.iter().any(|s| s != default_scalar) {
        for s in inst {
            suffix.push('_');
            suffix.push_str(s);
        }
    }

    let mut rep: Vec<(String, String)> = inst
        .iter()
        .enumerate()
        .map(|(i, s)| (format!("T{}", i + 1), s.clone()))
        .collect();

    let mut symbols = Vec::new();
    let mut out = String::new();
    for line in src.lines() {
        // Scaffolding that only keeps the generic form compilable
        if line.starts_with("template") || line.starts_with("#define") || line.starts_with("#undef")
        {
            continue;
        }
        if line == "inline" {
            continue;
        }

        if let Some(rest) = line.strip_prefix("// SYMBOL") {
            let parts = quoted_parts(rest);
            if let Some(sym) = parts.first() {
                symbols.push(format!("{sym}{suffix}"));
                if !suffix.is_empty() {
                    rep.push((sym.clone(), format!("{sym}{suffix}")));
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("// C-REPLACE") {
            let parts = quoted_parts(rest);
            if parts.len() >= 2 {
                rep.push((parts[0].clone(), parts[1].clone()));
            }
            continue;
        }

        let line = match line.find("//") {
            Some(n) => &line[..n],
            None => line,
        };
        let mut line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }

        // Later-declared replacements first, so T2 is substituted before T1
        for (key, value) in rep.iter().rev() {
            line = line.replace(key, value);
        }

        out.push_str(&line);
        out.push('\n');
    }

    // Separate instantiations with a blank line
    out.push('\n');
    Sanitized { text: out, symbols }
}

/// Extract the contents of each `"..."` pair in `s`, in order.
fn quoted_parts(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find('"') {
        let tail = &rest[start + 1..];
        let end = match tail.find('"') {
            Some(e) => e,
            None => break,
        };
        parts.push(tail[..end].to_string());
        rest = &tail[end + 1..];
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALAR: &str = "nabla_real";

    fn inst(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scaffolding_lines_are_dropped() {
        let src = "#define GUARD 1\n// SYMBOL \"thing\"\ntemplate<typename T1>\ninline\nvoid nabla_thing(T1 x) {\n}\n";
        let s = sanitize_template(src, &inst(&[SCALAR]), SCALAR);
        assert!(!s.text.contains("#define"));
        assert!(!s.text.contains("template"));
        assert!(!s.text.contains("inline"));
        assert!(!s.text.contains("SYMBOL"));
        assert_eq!(s.text, "void nabla_thing(nabla_real x) {\n}\n\n");
    }

    #[test]
    fn default_instantiation_keeps_plain_symbol() {
        let src = "// SYMBOL \"fill\"\ntemplate<typename T1>\nvoid nabla_fill(T1* x) {\n}\n";
        let s = sanitize_template(src, &inst(&[SCALAR]), SCALAR);
        assert_eq!(s.symbols, vec!["fill".to_string()]);
        assert!(s.text.contains("void nabla_fill(nabla_real* x) {"));
    }

    #[test]
    fn non_default_instantiation_is_suffixed() {
        let src = "// SYMBOL \"fill\"\ntemplate<typename T1>\nvoid nabla_fill(T1* x) {\n}\n";
        let s = sanitize_template(src, &inst(&["int"]), SCALAR);
        assert_eq!(s.symbols, vec!["fill_int".to_string()]);
        assert!(s.text.contains("void nabla_fill_int(int* x) {"));
    }

    #[test]
    fn replace_directive_applies_to_following_lines() {
        let src = "// C-REPLACE \"HALF\" \"0.5\"\nT1 r = HALF;\n";
        let s = sanitize_template(src, &inst(&[SCALAR]), SCALAR);
        assert!(!s.text.contains("C-REPLACE"));
        assert!(!s.text.contains("HALF"));
        assert!(s.text.contains("nabla_real r = 0.5;"));
    }

    #[test]
    fn later_placeholders_substituted_first() {
        let src = "void f(T1 a, T2 b) {\n}\n";
        let s = sanitize_template(src, &inst(&["double", "int"]), SCALAR);
        assert!(s.text.contains("void f(double a, int b) {"));
    }

    #[test]
    fn trailing_comments_and_blank_lines_dropped() {
        let src = "int x; // counter\n   \ny = x;   \n";
        let s = sanitize_template(src, &[], SCALAR);
        assert_eq!(s.text, "int x;\ny = x;\n\n");
    }

    #[test]
    fn output_ends_with_blank_line() {
        let s = sanitize_template("x;\n", &[], SCALAR);
        assert!(s.text.ends_with(";\n\n"));
    }

    #[test]
    fn hygiene_over_a_full_directive_set() {
        let src = "template<typename T1>\n#define TMP 1\n// SYMBOL \"scale_all\"\n// C-REPLACE \"TWO\" \"2\"\nvoid nabla_scale_all(T1* x) {\n  *x *= TWO;\n}\n";
        let s = sanitize_template(src, &inst(&["float"]), SCALAR);
        assert!(!s.text.contains("template<typename T1>"));
        assert!(!s.text.contains("#define TMP 1"));
        assert!(!s.text.contains("SYMBOL"));
        assert!(!s.text.contains("C-REPLACE"));
        assert!(s.text.contains("*x *= 2;"));
        assert!(s.text.contains("void nabla_scale_all_float(float* x) {"));
        assert_eq!(s.symbols, vec!["scale_all_float".to_string()]);
    }

    #[test]
    fn every_catalog_template_sanitizes_cleanly() {
        // Each catalog template must parse cleanly under default instantiation.
        let kinds = [
            Auxiliary::Copy,
            Auxiliary::Swap,
            Auxiliary::Scal,
            Auxiliary::Axpy,
            Auxiliary::Dot,
            Auxiliary::Bilin,
            Auxiliary::Rank1,
            Auxiliary::Iamax,
            Auxiliary::Fill,
            Auxiliary::Mv,
            Auxiliary::MvDense,
            Auxiliary::Mtimes,
            Auxiliary::Project,
            Auxiliary::Densify,
            Auxiliary::Trans,
            Auxiliary::Norm1,
            Auxiliary::Norm2,
            Auxiliary::NormInf,
            Auxiliary::Low,
            Auxiliary::Flip,
            Auxiliary::InterpnWeights,
            Auxiliary::InterpnInterpolate,
            Auxiliary::Interpn,
            Auxiliary::InterpnGrad,
            Auxiliary::DeBoor,
            Auxiliary::NdBoorEval,
            Auxiliary::FiniteDiff,
            Auxiliary::ToMex,
            Auxiliary::FromMex,
        ];
        for kind in kinds {
            let s = sanitize_template(kind.template(), &inst(&[SCALAR]), SCALAR);
            assert!(!s.symbols.is_empty(), "{kind:?} declares no symbol");
            assert!(!s.text.trim().is_empty(), "{kind:?} has an empty body");
            assert!(!s.text.contains("template"), "{kind:?} leaks scaffolding");
            let opens = s.text.matches('{').count();
            let closes = s.text.matches('}').count();
            assert_eq!(opens, closes, "{kind:?} body is brace-unbalanced");
        }
    }
}
