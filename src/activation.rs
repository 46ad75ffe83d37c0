use swc_core::common::{Span, SyntaxContext};
use swc_core::ecma::ast::*;

use crate::config::InstrumentConfig;
use crate::error::Result;
use crate::validate;

// -----------------------------------------------------------------------------
// Synthesized node helpers
// -----------------------------------------------------------------------------

pub(crate) fn ident_expr(name: &str, span: Span) -> Box<Expr> {
    Box::new(Expr::Ident(Ident::new(
        name.into(),
        span,
        SyntaxContext::empty(),
    )))
}

/// `a.b.c` from `["a", "b", "c"]`.
pub(crate) fn member_path(segments: &[String], span: Span) -> Box<Expr> {
    let Some((root, rest)) = segments.split_first() else {
        return ident_expr("undefined", span);
    };
    rest.iter().fold(ident_expr(root, span), |obj, seg| {
        Box::new(Expr::Member(MemberExpr {
            span,
            obj,
            prop: MemberProp::Ident(IdentName::new(seg.as_str().into(), span)),
        }))
    })
}

pub(crate) fn call(callee: Box<Expr>, args: Vec<Box<Expr>>, span: Span) -> Box<Expr> {
    Box::new(Expr::Call(CallExpr {
        span,
        callee: Callee::Expr(callee),
        args: args
            .into_iter()
            .map(|expr| ExprOrSpread { spread: None, expr })
            .collect(),
        type_args: None,
        ctxt: SyntaxContext::empty(),
    }))
}

fn void_zero(span: Span) -> Box<Expr> {
    Box::new(Expr::Unary(UnaryExpr {
        span,
        op: UnaryOp::Void,
        arg: Box::new(Expr::Lit(Lit::Num(Number {
            span,
            value: 0.0,
            raw: None,
        }))),
    }))
}

// -----------------------------------------------------------------------------
// Activation statements
// -----------------------------------------------------------------------------

/// Builds the statements that open an activation record:
///
/// ```js
/// var __qp_activation = {turn: window.__qp.turn};
/// __qp_function.push(__qp_activation), void 0;
/// ```
///
/// Every node carries `span`, the location of the scope that triggered the
/// insertion, so the source map points injected code back at it.
pub fn build_activation_statements(config: &InstrumentConfig, span: Span) -> Result<[Stmt; 2]> {
    let record = Expr::Object(ObjectLit {
        span,
        props: vec![PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
            key: PropName::Ident(IdentName::new("turn".into(), span)),
            value: member_path(&config.turn_path, span),
        })))],
    });

    let declaration = Stmt::Decl(Decl::Var(Box::new(VarDecl {
        span,
        kind: VarDeclKind::Var,
        declare: false,
        decls: vec![VarDeclarator {
            span,
            name: Pat::Ident(BindingIdent {
                id: Ident::new(
                    config.activation_name.as_str().into(),
                    span,
                    SyntaxContext::empty(),
                ),
                type_ann: None,
            }),
            init: Some(Box::new(record)),
            definite: false,
        }],
        ctxt: SyntaxContext::empty(),
    })));

    let push = call(
        Box::new(Expr::Member(MemberExpr {
            span,
            obj: ident_expr(&config.frame_stack_name, span),
            prop: MemberProp::Ident(IdentName::new("push".into(), span)),
        })),
        vec![ident_expr(&config.activation_name, span)],
        span,
    );

    // Sequencing with `void 0` keeps push()'s return value out of the statement.
    let push_statement = Stmt::Expr(ExprStmt {
        span,
        expr: Box::new(Expr::Seq(SeqExpr {
            span,
            exprs: vec![push, void_zero(span)],
        })),
    });

    if config.validate {
        validate::statement_before_splice("activation declaration", &declaration)?;
        validate::statement_before_splice("activation push", &push_statement)?;
    }

    Ok([declaration, push_statement])
}

// -----------------------------------------------------------------------------
// Splicing
// -----------------------------------------------------------------------------

/// Inserts `items` at `index`, clamped to the container's length. Returns the
/// index the first item actually landed at.
pub(crate) fn splice_at<T>(container: &mut Vec<T>, index: usize, items: impl IntoIterator<Item = T>) -> usize {
    let at = index.min(container.len());
    container.splice(at..at, items);
    at
}

fn is_directive(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(ExprStmt { expr, .. }) if matches!(&**expr, Expr::Lit(Lit::Str(_))))
}

/// Index just past the first top-level variable statement. Without one, the
/// index just past the directive prologue, so `'use strict'` stays a
/// directive.
pub(crate) fn program_insertion_index<'a, I>(stmts: I) -> usize
where
    I: IntoIterator<Item = Option<&'a Stmt>>,
{
    let mut prologue = 0;
    let mut in_prologue = true;
    for (index, stmt) in stmts.into_iter().enumerate() {
        if matches!(stmt, Some(Stmt::Decl(Decl::Var(_)))) {
            return index + 1;
        }
        if in_prologue && stmt.is_some_and(is_directive) {
            prologue = index + 1;
        } else {
            in_prologue = false;
        }
    }
    prologue
}
