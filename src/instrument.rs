use std::ops::Range;

use swc_core::common::{sync::Lrc, SourceMap, Spanned};
use swc_core::ecma::ast::*;
use tracing::{debug, trace, warn};

use crate::activation::{build_activation_statements, program_insertion_index, splice_at};
use crate::annotations::TraceAnnotations;
use crate::config::InstrumentConfig;
use crate::error::{InstrumentError, Result};
use crate::trace::trace_identifier;
use crate::writer::{GeneratedOutput, RewriteCounts, TreeWriter, WriterHooks};

/// Function bodies get their activation record after this many statements.
pub const FUNCTION_PREAMBLE_LEN: usize = 2;

/// Hooks that open an activation record in every program and function
/// declaration and rewrite annotated identifier references.
pub struct Instrumenter<'a> {
    config: &'a InstrumentConfig,
    annotations: &'a mut TraceAnnotations,
    rewritten: usize,
    activations: usize,
}

impl<'a> Instrumenter<'a> {
    pub fn new(config: &'a InstrumentConfig, annotations: &'a mut TraceAnnotations) -> Self {
        Self {
            config,
            annotations,
            rewritten: 0,
            activations: 0,
        }
    }

}

impl WriterHooks for Instrumenter<'_> {
    fn enter_program(&mut self, program: &mut Program) -> Result<Range<usize>> {
        let span = program.span();
        let stmts = build_activation_statements(self.config, span)?;
        let at = match program {
            Program::Script(script) => {
                let index = program_insertion_index(script.body.iter().map(Some));
                splice_at(&mut script.body, index, stmts)
            }
            Program::Module(module) => {
                let index = program_insertion_index(module.body.iter().map(|item| match item {
                    ModuleItem::Stmt(stmt) => Some(stmt),
                    ModuleItem::ModuleDecl(_) => None,
                }));
                splice_at(&mut module.body, index, stmts.map(ModuleItem::Stmt))
            }
        };
        self.activations += 1;
        debug!(index = at, "inserted program activation");
        Ok(at..at + 2)
    }

    fn enter_function(&mut self, decl: &mut FnDecl) -> Result<Range<usize>> {
        let span = decl.function.span;
        let Some(body) = decl.function.body.as_mut() else {
            return Err(InstrumentError::InputShape {
                what: "function declaration without a body",
                span,
            });
        };
        let stmts = build_activation_statements(self.config, span)?;
        let at = splice_at(&mut body.stmts, FUNCTION_PREAMBLE_LEN, stmts);
        self.activations += 1;
        debug!(
            function = %decl.ident.sym,
            index = at,
            body_len = body.stmts.len(),
            "inserted function activation"
        );
        Ok(at..at + 2)
    }

    fn enter_identifier(&mut self, expr: &mut Expr) -> Result<()> {
        let Expr::Ident(ident) = expr else {
            return Ok(());
        };
        let Some(slot) = self.annotations.take(ident.span) else {
            return Ok(());
        };
        trace!(name = %ident.sym, %slot, "tracing identifier");
        *expr = trace_identifier(self.config, ident.clone(), &slot)?;
        self.rewritten += 1;
        Ok(())
    }

    fn counts(&self) -> RewriteCounts {
        RewriteCounts {
            rewritten: self.rewritten,
            activations: self.activations,
            unmatched_annotations: self.annotations.len(),
        }
    }
}

/// Instruments `program` and prints it.
///
/// `cm` is the source map `program` was parsed with. Every annotation that
/// matches an identifier reference is consumed; leftovers stay in
/// `annotations` and are counted in the output. On error the tree may be
/// partly rewritten and must be discarded.
pub fn instrument(
    cm: Lrc<SourceMap>,
    config: &InstrumentConfig,
    program: &mut Program,
    annotations: &mut TraceAnnotations,
) -> Result<GeneratedOutput> {
    let hooks = Instrumenter::new(config, annotations);
    let output = TreeWriter::new(cm, config.clone(), hooks).generate(program)?;

    for (span, slot) in annotations.iter() {
        warn!(?span, %slot, "trace annotation matched no identifier reference");
    }

    debug!(
        rewritten = output.rewritten,
        activations = output.activations,
        unmatched = output.unmatched_annotations,
        "instrumented program"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mark_all, parse, squash};
    use pretty_assertions::assert_eq;

    fn fn_body(program: &Program) -> &[Stmt] {
        let Program::Script(script) = program else {
            panic!("expected a script");
        };
        script
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Decl(Decl::Fn(f)) => f.function.body.as_ref(),
                _ => None,
            })
            .map(|body| body.stmts.as_slice())
            .expect("function declaration")
    }

    fn is_activation_decl(stmt: &Stmt) -> bool {
        matches!(stmt, Stmt::Decl(Decl::Var(var))
            if matches!(&var.decls[0].name, Pat::Ident(b) if &*b.id.sym == "__qp_activation"))
    }

    fn is_push(stmt: &Stmt) -> bool {
        matches!(stmt, Stmt::Expr(ExprStmt { expr, .. }) if matches!(&**expr, Expr::Seq(_)))
    }

    #[test]
    fn function_activation_lands_at_offset_two() {
        let (cm, mut program) = parse("function f() { one(); two(); three(); }");
        let mut annotations = TraceAnnotations::new();
        instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations).unwrap();

        let body = fn_body(&program);
        assert_eq!(body.len(), 5);
        assert!(is_activation_decl(&body[2]));
        assert!(is_push(&body[3]));
    }

    #[test]
    fn short_function_body_appends() {
        let (cm, mut program) = parse("function f() { one(); }");
        let mut annotations = TraceAnnotations::new();
        instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations).unwrap();

        let body = fn_body(&program);
        assert_eq!(body.len(), 3);
        assert!(is_activation_decl(&body[1]));
        assert!(is_push(&body[2]));
    }

    #[test]
    fn empty_function_body_gets_both_statements() {
        let (cm, mut program) = parse("function f() {}");
        let mut annotations = TraceAnnotations::new();
        instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations).unwrap();

        let body = fn_body(&program);
        assert_eq!(body.len(), 2);
        assert!(is_activation_decl(&body[0]));
        assert!(is_push(&body[1]));
    }

    #[test]
    fn program_activation_follows_first_var() {
        let (cm, mut program) = parse("foo();\nvar a = 1;\nvar b = 2;\nbar();");
        let mut annotations = TraceAnnotations::new();
        instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations).unwrap();

        let Program::Script(script) = &program else {
            panic!("expected a script");
        };
        assert_eq!(script.body.len(), 6);
        assert!(is_activation_decl(&script.body[2]));
        assert!(is_push(&script.body[3]));
    }

    #[test]
    fn program_without_var_gets_activation_first() {
        let (cm, mut program) = parse("foo();\nbar();");
        let mut annotations = TraceAnnotations::new();
        instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations).unwrap();

        let Program::Script(script) = &program else {
            panic!("expected a script");
        };
        assert_eq!(script.body.len(), 4);
        assert!(is_activation_decl(&script.body[0]));
        assert!(is_push(&script.body[1]));
    }

    #[test]
    fn module_scan_skips_module_declarations() {
        let (cm, mut program) = parse("import x from 'x';\nexport var a = 1;\nlet b = x;\n");
        let mut annotations = TraceAnnotations::new();
        instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations).unwrap();

        let Program::Module(module) = &program else {
            panic!("expected a module");
        };
        assert_eq!(module.body.len(), 5);
        assert!(matches!(&module.body[3], ModuleItem::Stmt(stmt) if is_activation_decl(stmt)));
        assert!(matches!(&module.body[4], ModuleItem::Stmt(stmt) if is_push(stmt)));
    }

    #[test]
    fn rewrites_annotated_reference() {
        let (cm, mut program) = parse("function f(a){ return a + b; }");
        let mut annotations = TraceAnnotations::new();
        assert_eq!(mark_all(&program, &mut annotations, "b", "slot"), 1);

        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();
        assert_eq!(out.rewritten, 1);
        assert_eq!(out.unmatched_annotations, 0);
        assert!(annotations.is_empty());
        assert!(
            squash(&out.generated_source)
                .contains("returna+((__qp_activation.slot=window.__qp.trace(b)),b);"),
            "{}",
            out.generated_source
        );
    }

    #[test]
    fn unannotated_references_print_unchanged() {
        let (cm, mut program) = parse("function f(a){ return a + b; }");
        let mut annotations = TraceAnnotations::new();
        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();
        assert_eq!(out.rewritten, 0);
        assert!(squash(&out.generated_source).contains("returna+b;"));
        assert!(!out.generated_source.contains("trace("));
    }

    #[test]
    fn second_pass_leaves_rewritten_reference_alone() {
        let (cm, mut program) = parse("b;");
        let mut annotations = TraceAnnotations::new();
        mark_all(&program, &mut annotations, "b", "_0");
        let config = InstrumentConfig::default();

        let first = instrument(cm.clone(), &config, &mut program, &mut annotations).unwrap();
        assert_eq!(first.rewritten, 1);
        let second = instrument(cm, &config, &mut program, &mut annotations).unwrap();
        assert_eq!(second.rewritten, 0);
        assert_eq!(
            squash(&second.generated_source)
                .matches("window.__qp.trace(b)")
                .count(),
            1
        );
    }

    #[test]
    fn stale_annotation_is_counted() {
        let (cm, mut program) = parse("a;");
        let mut annotations = TraceAnnotations::new();
        annotations.mark(
            swc_core::common::Span::new(
                swc_core::common::BytePos(900),
                swc_core::common::BytePos(901),
            ),
            "_900",
        );
        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();
        assert_eq!(out.unmatched_annotations, 1);
        assert_eq!(annotations.len(), 1);
    }

    #[test]
    fn runtime_global_reference_is_traced() {
        let (cm, mut program) = parse("function f() { return window.innerWidth; }");
        let mut annotations = TraceAnnotations::new();
        assert_eq!(mark_all(&program, &mut annotations, "window", "_22"), 1);
        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();
        assert_eq!(out.rewritten, 1);
        assert_eq!(out.unmatched_annotations, 0);
        assert!(
            squash(&out.generated_source)
                .contains("return((__qp_activation._22=window.__qp.trace(window)),window).innerWidth;"),
            "{}",
            out.generated_source
        );
    }

    #[test]
    fn bare_identifier_program_is_traced_once() {
        // the injected statements share the program's span with `x`
        let (cm, mut program) = parse("x");
        let mut annotations = TraceAnnotations::new();
        assert_eq!(mark_all(&program, &mut annotations, "x", "_0"), 1);
        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();
        assert_eq!(out.rewritten, 1);
        let text = squash(&out.generated_source);
        assert_eq!(text.matches("window.__qp.trace(").count(), 1, "{text}");
        assert!(text.contains("var__qp_activation={turn:window.__qp.turn};"), "{text}");
        assert!(text.contains("__qp_function.push(__qp_activation),void0;"), "{text}");
    }

    #[test]
    fn directive_prologue_stays_first() {
        let (cm, mut program) = parse("'use strict';\nfoo();");
        let mut annotations = TraceAnnotations::new();
        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();

        let Program::Script(script) = &program else {
            panic!("expected a script");
        };
        assert_eq!(script.body.len(), 4);
        assert!(matches!(&script.body[0], Stmt::Expr(ExprStmt { expr, .. })
            if matches!(&**expr, Expr::Lit(Lit::Str(_)))));
        assert!(is_activation_decl(&script.body[1]));
        assert!(is_push(&script.body[2]));

        let text = squash(&out.generated_source);
        let directive = text.find("usestrict").expect("directive in output");
        let record = text.find("var__qp_activation").expect("activation in output");
        assert!(directive < record, "{}", out.generated_source);
    }

    #[test]
    fn counts_activations() {
        let (cm, mut program) = parse("function f() {}\nfunction g() { function h() {} }");
        let mut annotations = TraceAnnotations::new();
        let out = instrument(cm, &InstrumentConfig::default(), &mut program, &mut annotations)
            .unwrap();
        assert_eq!(out.activations, 4);
    }
}
