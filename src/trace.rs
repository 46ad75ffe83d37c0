use swc_core::ecma::ast::*;

use crate::activation::{call, ident_expr, member_path};
use crate::annotations::TraceSlot;
use crate::config::{is_identifier, InstrumentConfig};
use crate::error::{InstrumentError, Result};
use crate::validate;

/// Rewrites a traced identifier reference `x` into
///
/// ```js
/// ((__qp_activation.<slot> = window.__qp.trace(x)), x)
/// ```
///
/// The assignment runs first and the comma expression yields `x`, so the
/// surrounding expression sees the same value. The outer parentheses keep
/// the comma from binding to whatever operator the reference sat under.
pub fn trace_identifier(config: &InstrumentConfig, ident: Ident, slot: &TraceSlot) -> Result<Expr> {
    if slot.as_str().is_empty() {
        return Err(InstrumentError::construction(
            "trace expression",
            format!("empty trace slot for `{}`", ident.sym),
        ));
    }
    let span = ident.span;

    let slot_prop = if is_identifier(slot.as_str()) {
        MemberProp::Ident(IdentName::new(slot.as_str().into(), span))
    } else {
        MemberProp::Computed(ComputedPropName {
            span,
            expr: Box::new(Expr::Lit(Lit::Str(Str {
                span,
                value: slot.as_str().into(),
                raw: None,
            }))),
        })
    };

    let record = Expr::Assign(AssignExpr {
        span,
        op: AssignOp::Assign,
        left: AssignTarget::Simple(SimpleAssignTarget::Member(MemberExpr {
            span,
            obj: ident_expr(&config.activation_name, span),
            prop: slot_prop,
        })),
        right: call(
            member_path(&config.trace_path, span),
            vec![Box::new(Expr::Ident(ident.clone()))],
            span,
        ),
    });

    let traced = Expr::Paren(ParenExpr {
        span,
        expr: Box::new(Expr::Seq(SeqExpr {
            span,
            exprs: vec![
                Box::new(Expr::Paren(ParenExpr {
                    span,
                    expr: Box::new(record),
                })),
                Box::new(Expr::Ident(ident)),
            ],
        })),
    });

    if config.validate {
        validate::expression_before_splice("trace expression", &traced)?;
    }
    Ok(traced)
}
