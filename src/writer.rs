use std::ops::Range;

use serde::Serialize;
use swc_core::common::{sync::Lrc, SourceMap};
use swc_core::ecma::{
    ast::{Expr, FnDecl, Program},
    visit::{VisitMut, VisitMutWith},
};
use tracing::debug;

use crate::config::InstrumentConfig;
use crate::error::{InstrumentError, Result};
use crate::printer::print_program;
use crate::sourcemap::SourceMapBuilder;

// -----------------------------------------------------------------------------
// Hooks
// -----------------------------------------------------------------------------

/// What a set of hooks did to the tree, reported once the walk is over.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteCounts {
    /// Identifier references rewritten into trace expressions.
    pub rewritten: usize,
    /// Activation records injected (programs plus function declarations).
    pub activations: usize,
    /// Annotations that matched no identifier in the tree.
    pub unmatched_annotations: usize,
}

/// The three traversal points a [`TreeWriter`] hands to its caller before the
/// node is printed. The defaults leave the node as it is, so an
/// implementation only overrides what it rewrites.
///
/// `enter_program` and `enter_function` return the index range of the
/// statements they inserted into the program or function body. Those
/// statements are printed but not walked, so no hook ever sees them.
pub trait WriterHooks {
    fn enter_program(&mut self, _program: &mut Program) -> Result<Range<usize>> {
        Ok(0..0)
    }

    fn enter_function(&mut self, _decl: &mut FnDecl) -> Result<Range<usize>> {
        Ok(0..0)
    }

    /// Called with an `Expr::Ident`. The hook may replace the whole
    /// expression; the replacement is printed but not visited again.
    fn enter_identifier(&mut self, _expr: &mut Expr) -> Result<()> {
        Ok(())
    }

    fn counts(&self) -> RewriteCounts {
        RewriteCounts::default()
    }
}

/// Prints the tree untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl WriterHooks for PassThrough {}

impl<H: WriterHooks + ?Sized> WriterHooks for &mut H {
    fn enter_program(&mut self, program: &mut Program) -> Result<Range<usize>> {
        (**self).enter_program(program)
    }

    fn enter_function(&mut self, decl: &mut FnDecl) -> Result<Range<usize>> {
        (**self).enter_function(decl)
    }

    fn enter_identifier(&mut self, expr: &mut Expr) -> Result<()> {
        (**self).enter_identifier(expr)
    }

    fn counts(&self) -> RewriteCounts {
        (**self).counts()
    }
}

/// Walks the tree in pre-order and calls the hooks. The first failing hook
/// stops the walk; nothing is visited after it.
struct HookDriver<'a, H> {
    hooks: &'a mut H,
    error: Option<InstrumentError>,
}

impl<'a, H: WriterHooks> HookDriver<'a, H> {
    fn new(hooks: &'a mut H) -> Self {
        Self { hooks, error: None }
    }

    fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }

    fn visit_except<T>(&mut self, items: &mut [T], inserted: &Range<usize>)
    where
        T: VisitMutWith<Self>,
    {
        for (index, item) in items.iter_mut().enumerate() {
            if !inserted.contains(&index) {
                item.visit_mut_with(self);
            }
        }
    }

    fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<H: WriterHooks> VisitMut for HookDriver<'_, H> {
    fn visit_mut_program(&mut self, n: &mut Program) {
        if self.error.is_some() {
            return;
        }
        let result = self.hooks.enter_program(n);
        let Some(inserted) = self.record(result) else {
            return;
        };
        match n {
            Program::Script(script) => self.visit_except(&mut script.body, &inserted),
            Program::Module(module) => self.visit_except(&mut module.body, &inserted),
        }
    }

    fn visit_mut_fn_decl(&mut self, n: &mut FnDecl) {
        if self.error.is_some() {
            return;
        }
        let result = self.hooks.enter_function(n);
        let Some(inserted) = self.record(result) else {
            return;
        };
        let function = &mut *n.function;
        for param in &mut function.params {
            param.visit_mut_with(self);
        }
        for decorator in &mut function.decorators {
            decorator.visit_mut_with(self);
        }
        if let Some(body) = function.body.as_mut() {
            self.visit_except(&mut body.stmts, &inserted);
        }
    }

    fn visit_mut_expr(&mut self, n: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        if matches!(n, Expr::Ident(_)) {
            let result = self.hooks.enter_identifier(n);
            self.record(result);
            return;
        }
        n.visit_mut_children_with(self);
    }
}

// -----------------------------------------------------------------------------
// Output
// -----------------------------------------------------------------------------

/// Text and source map of one instrumentation pass, plus the counts the
/// hooks reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOutput {
    pub generated_source: String,
    /// Source Map v3 JSON.
    pub source_map: String,
    pub mapping_count: usize,
    /// Identifier references rewritten into trace expressions.
    pub rewritten: usize,
    /// Activation records injected (programs plus function declarations).
    pub activations: usize,
    /// Annotations that matched no identifier in the tree.
    pub unmatched_annotations: usize,
}

// -----------------------------------------------------------------------------
// Writer
// -----------------------------------------------------------------------------

/// Turns a tree into generated text plus a source map, giving `hooks` the
/// chance to rewrite the tree on the way.
///
/// `generate` consumes the writer: the hooks mutate the tree in place, so a
/// finished (or failed) pass cannot be resumed.
pub struct TreeWriter<H> {
    cm: Lrc<SourceMap>,
    config: InstrumentConfig,
    hooks: H,
}

impl<H: WriterHooks> TreeWriter<H> {
    /// `cm` must be the source map the tree was parsed with.
    pub fn new(cm: Lrc<SourceMap>, config: InstrumentConfig, hooks: H) -> Self {
        Self { cm, config, hooks }
    }

    pub fn generate(mut self, program: &mut Program) -> Result<GeneratedOutput> {
        let mut driver = HookDriver::new(&mut self.hooks);
        program.visit_mut_with(&mut driver);
        driver.finish()?;

        let printed = print_program(&self.cm, &self.config.new_line, program)?;

        let mut generated_source = printed.text;
        if !generated_source.is_empty() && !generated_source.ends_with('\n') {
            generated_source.push_str(&self.config.new_line);
        }

        let mut map = SourceMapBuilder::new(self.config.output_name.clone());
        map.add_recorded(&self.cm, &printed.positions);
        let source_map = map.to_json()?;

        let counts = self.hooks.counts();
        debug!(
            bytes = generated_source.len(),
            mappings = map.len(),
            rewritten = counts.rewritten,
            file = %self.config.output_name,
            "generated source"
        );

        Ok(GeneratedOutput {
            generated_source,
            source_map,
            mapping_count: map.len(),
            rewritten: counts.rewritten,
            activations: counts.activations,
            unmatched_annotations: counts.unmatched_annotations,
        })
    }
}
