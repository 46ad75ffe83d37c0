use swc_core::common::{sync::Lrc, FileName, SourceMap};
use swc_core::ecma::ast::{EsVersion, Expr, Program};
use swc_core::ecma::parser::{parse_file_as_program, Syntax};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::annotations::TraceAnnotations;

pub(crate) fn parse(src: &str) -> (Lrc<SourceMap>, Program) {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Custom("input.js".into()).into(), src.to_string());
    let program = parse_file_as_program(
        &fm,
        Syntax::Es(Default::default()),
        EsVersion::latest(),
        None,
        &mut vec![],
    )
    .expect("test source parses");
    (cm, program)
}

struct RefCollector<'a> {
    name: &'a str,
    spans: Vec<swc_core::common::Span>,
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

/// Marks every reference to `name`, the way the upstream annotator would.
pub(crate) fn mark_all(
    program: &Program,
    annotations: &mut TraceAnnotations,
    name: &str,
    slot: &str,
) -> usize {
    let mut collector = RefCollector {
        name,
        spans: vec![],
    };
    program.visit_with(&mut collector);
    for span in &collector.spans {
        annotations.mark(*span, slot);
    }
    collector.spans.len()
}

pub(crate) fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
