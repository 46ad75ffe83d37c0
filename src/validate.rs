//! Well-formedness gate for subtrees the writer synthesizes.
//!
//! Only the node kinds the injector and rewriter build are accepted. Anything
//! else reaching this check means the construction code is wrong, so the
//! caller turns the failure into a fatal [`InstrumentError::Construction`].

use swc_core::ecma::ast::*;

use crate::config::is_identifier;
use crate::error::{InstrumentError, Result};

type Check = std::result::Result<(), String>;

/// Validates a statement right before it is spliced into the tree.
pub(crate) fn statement_before_splice(what: &'static str, stmt: &Stmt) -> Result<()> {
    check_stmt(stmt).map_err(|reason| InstrumentError::construction(what, reason))
}

/// Validates a replacement expression before it takes the original's place.
pub(crate) fn expression_before_splice(what: &'static str, expr: &Expr) -> Result<()> {
    check_expr(expr).map_err(|reason| InstrumentError::construction(what, reason))
}

fn check_stmt(stmt: &Stmt) -> Check {
    match stmt {
        Stmt::Decl(Decl::Var(var)) => {
            if var.decls.is_empty() {
                return Err("variable statement without declarators".into());
            }
            for decl in &var.decls {
                match &decl.name {
                    Pat::Ident(binding) => check_ident(&binding.id)?,
                    _ => return Err("declarator binds a pattern".into()),
                }
                match &decl.init {
                    Some(init) => check_expr(init)?,
                    None => return Err("declarator without initializer".into()),
                }
            }
            Ok(())
        }
        Stmt::Expr(stmt) => check_expr(&stmt.expr),
        _ => Err("unsupported statement kind".into()),
    }
}

fn check_expr(expr: &Expr) -> Check {
    match expr {
        Expr::Ident(ident) => check_ident(ident),
        Expr::Object(object) => {
            for prop in &object.props {
                let PropOrSpread::Prop(prop) = prop else {
                    return Err("spread in object literal".into());
                };
                let Prop::KeyValue(kv) = &**prop else {
                    return Err("object literal property is not key: value".into());
                };
                match &kv.key {
                    PropName::Ident(name) => check_name(&name.sym)?,
                    PropName::Str(_) => {}
                    _ => return Err("unsupported property key".into()),
                }
                check_expr(&kv.value)?;
            }
            Ok(())
        }
        Expr::Member(member) => check_member(member),
        Expr::Call(call) => {
            let Callee::Expr(callee) = &call.callee else {
                return Err("call without an expression callee".into());
            };
            check_expr(callee)?;
            for arg in &call.args {
                if arg.spread.is_some() {
                    return Err("spread argument".into());
                }
                check_expr(&arg.expr)?;
            }
            Ok(())
        }
        Expr::Seq(seq) => {
            if seq.exprs.len() < 2 {
                return Err(format!(
                    "comma expression with {} operand(s)",
                    seq.exprs.len()
                ));
            }
            seq.exprs.iter().try_for_each(|e| check_expr(e))
        }
        Expr::Paren(paren) => check_expr(&paren.expr),
        Expr::Assign(assign) => {
            if assign.op != AssignOp::Assign {
                return Err("compound assignment".into());
            }
            match &assign.left {
                AssignTarget::Simple(SimpleAssignTarget::Member(member)) => check_member(member)?,
                AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                    check_ident(&binding.id)?
                }
                _ => return Err("unsupported assignment target".into()),
            }
            check_expr(&assign.right)
        }
        Expr::Unary(unary) if unary.op == UnaryOp::Void => check_expr(&unary.arg),
        Expr::Lit(Lit::Num(_)) | Expr::Lit(Lit::Str(_)) => Ok(()),
        _ => Err("unsupported expression kind".into()),
    }
}

fn check_member(member: &MemberExpr) -> Check {
    check_expr(&member.obj)?;
    match &member.prop {
        MemberProp::Ident(name) => {
            if name.sym.is_empty() {
                Err("empty member name".into())
            } else {
                Ok(())
            }
        }
        MemberProp::Computed(computed) => check_expr(&computed.expr),
        MemberProp::PrivateName(_) => Err("private member".into()),
    }
}

fn check_ident(ident: &Ident) -> Check {
    check_name(&ident.sym)
}

fn check_name(name: &str) -> Check {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(format!("`{name}` is not a valid identifier"))
    }
}
