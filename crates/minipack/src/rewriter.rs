//! Import-call rewriting.
//!
//! Parses a module, rewrites every `require("<specifier>")` call into a
//! call against the bundle's runtime accessor with a canonical
//! root-relative specifier, and re-renders the module. The canonical
//! specifiers double as the discovered dependency list, in encounter
//! order.

use std::{cell::RefCell, path::Path};

use ruff_python_ast::{
    AtomicNodeIndex, Expr, ExprStringLiteral, Stmt, StringLiteralValue,
    name::Name,
    str::Quote,
    visitor::transformer::{Transformer, walk_expr},
};
use ruff_python_codegen::{Generator, Stylist};
use ruff_python_parser::parse_module;
use ruff_text_size::TextRange;

use crate::errors::BundleError;

/// The call-expression callee that declares a same-project dependency.
pub const IMPORT_KEYWORD: &str = "require";

/// The callee name every import call is rewritten to; resolved by the
/// emitted bundle's runtime.
pub const RUNTIME_ACCESSOR: &str = "__minipack_require__";

/// Project-source subdirectory joined into every canonical specifier.
pub const SOURCE_DIR: &str = "src";

/// Result of rewriting one module.
#[derive(Debug)]
pub struct RewriteOutput {
    /// The re-rendered module source.
    pub source: String,
    /// Canonical specifiers of every dependency, in encounter order.
    pub dependencies: Vec<String>,
}

/// Canonical module specifier for a declared one: root-relative,
/// forward-slash normalized, under the fixed source directory.
pub fn canonical_specifier(specifier: &str) -> String {
    let normalized = specifier.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./");
    format!("./{SOURCE_DIR}/{trimmed}")
}

struct RequireRewriter {
    dependencies: RefCell<Vec<String>>,
    quote: Quote,
}

impl RequireRewriter {
    fn rewrite_call(&self, expr: &mut Expr) {
        let Expr::Call(call) = expr else { return };
        let Expr::Name(callee) = call.func.as_mut() else {
            return;
        };
        if callee.id.as_str() != IMPORT_KEYWORD {
            return;
        }
        let Some(argument) = call.arguments.args.first_mut() else {
            return;
        };
        // Non-literal specifiers cannot be resolved statically; leave the
        // call untouched.
        let Expr::StringLiteral(literal) = argument else {
            return;
        };

        let canonical = canonical_specifier(literal.value.to_str());
        callee.id = Name::new(RUNTIME_ACCESSOR);
        *argument = string_literal(&canonical, self.quote);
        self.dependencies.borrow_mut().push(canonical);
    }
}

impl Transformer for RequireRewriter {
    fn visit_expr(&self, expr: &mut Expr) {
        // Rewrite before walking so dependencies land in encounter order.
        self.rewrite_call(expr);
        walk_expr(self, expr);
    }
}

/// Parse, rewrite, and re-render one module's source.
pub fn rewrite(module_path: &Path, source: &str) -> Result<RewriteOutput, BundleError> {
    let parsed = parse_module(source).map_err(|err| BundleError::Parse {
        path: module_path.to_path_buf(),
        message: err.to_string(),
    })?;
    let stylist = Stylist::from_tokens(parsed.tokens(), source);
    let mut module = parsed.syntax().clone();

    let rewriter = RequireRewriter {
        dependencies: RefCell::new(Vec::new()),
        quote: stylist.quote(),
    };
    for stmt in &mut module.body {
        rewriter.visit_stmt(stmt);
    }

    let dependencies = rewriter.dependencies.into_inner();
    log::debug!(
        "rewrote {} ({} dependencies)",
        module_path.display(),
        dependencies.len()
    );
    Ok(RewriteOutput {
        source: render_body(&stylist, &module.body),
        dependencies,
    })
}

fn render_body(stylist: &Stylist<'_>, body: &[Stmt]) -> String {
    let rendered: Vec<String> = body
        .iter()
        .map(|stmt| Generator::from(stylist).stmt(stmt))
        .collect();
    rendered.join("\n")
}

/// Synthetic string literal expression; default ranges mark it as
/// generated. The module's preferred quote style is carried on the
/// flags, since the generator takes quoting from each literal.
fn string_literal(value: &str, quote: Quote) -> Expr {
    Expr::StringLiteral(ExprStringLiteral {
        node_index: AtomicNodeIndex::NONE,
        value: StringLiteralValue::single(ruff_python_ast::StringLiteral {
            node_index: AtomicNodeIndex::NONE,
            value: value.to_string().into(),
            flags: ruff_python_ast::StringLiteralFlags::empty().with_quote_style(quote),
            range: TextRange::default(),
        }),
        range: TextRange::default(),
    })
}
