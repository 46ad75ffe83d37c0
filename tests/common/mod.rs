#![allow(dead_code)]

use swc_core::common::{sync::Lrc, FileName, SourceMap, Span};
use swc_core::ecma::ast::{EsVersion, Expr, Program};
use swc_core::ecma::parser::{parse_file_as_program, Syntax};
use swc_core::ecma::visit::{Visit, VisitWith};

use querypoint_instrument::TraceAnnotations;

pub fn parse_named(name: &str, src: &str) -> (Lrc<SourceMap>, Program) {
    let cm: Lrc<SourceMap> = Default::default();
    let program = parse_into(&cm, name, src);
    (cm, program)
}

pub fn parse(src: &str) -> (Lrc<SourceMap>, Program) {
    parse_named("input.js", src)
}

pub fn parse_into(cm: &Lrc<SourceMap>, name: &str, src: &str) -> Program {
    let fm = cm.new_source_file(FileName::Custom(name.into()).into(), src.to_string());
    parse_file_as_program(
        &fm,
        Syntax::Es(Default::default()),
        EsVersion::latest(),
        None,
        &mut vec![],
    )
    .unwrap_or_else(|err| panic!("failed to parse {name}: {err:?}\n{src}"))
}

struct RefCollector<'a> {
    name: &'a str,
    spans: Vec<Span>,
}

impl Visit for RefCollector<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Ident(ident) = expr {
            if &*ident.sym == self.name {
                self.spans.push(ident.span);
            }
        }
        expr.visit_children_with(self);
    }
}

pub fn reference_spans(program: &Program, name: &str) -> Vec<Span> {
    let mut collector = RefCollector {
        name,
        spans: vec![],
    };
    program.visit_with(&mut collector);
    collector.spans
}

/// Marks every reference to `name` with a slot named after its offset.
pub fn mark_refs(program: &Program, annotations: &mut TraceAnnotations, name: &str) -> Vec<Span> {
    let spans = reference_spans(program, name);
    for span in &spans {
        annotations.mark(*span, format!("_{}", span.lo.0));
    }
    spans
}

pub fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
