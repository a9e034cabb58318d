//! Lowering of function bodies into the inference tree.
//!
//! Every function, method, constant and trait default in the file gets a
//! [`SymbolId`] before any body is lowered, so calls resolve regardless of
//! declaration order. `let` bindings become symbols of their own whose body
//! is the initializer; references to them are followed during inference and
//! folded during constant evaluation.

use std::collections::BTreeMap;

use heron_core::LiteralValue;
use heron_infer::{
    CallTarget, Callee, HandlerBody, SymbolId, SymbolRef, SymbolSource, SymbolTable, SyntaxNode,
};
use syn::{
    punctuated::Punctuated, Block, Expr, File, FnArg, GenericParam, ImplItem, Item, ItemFn, Lit,
    Macro, Pat, Signature, Stmt, Token, TraitItem, Type, TypeParamBound, WherePredicate,
};
use tracing::trace;

use crate::catalog::{last_segment, single_arg, spell};

/// Wrappers looked through when deciding whether a parameter is trait typed.
const POINTERS: &[&str] = &["Arc", "Box", "Rc", "Inject"];

#[derive(Debug, Clone, Default)]
struct Local {
    symbol: Option<SymbolId>,
    trait_name: Option<String>,
}

enum Pending<'a> {
    Fn {
        sig: &'a Signature,
        block: &'a Block,
        self_ty: Option<String>,
    },
    Value(&'a Expr),
}

/// Symbols of one source file and their lowered bodies.
#[derive(Debug, Default)]
pub(crate) struct BodyIndex {
    next: u32,
    table: SymbolTable,
    /// Free functions, constants and statics by name.
    items: BTreeMap<String, SymbolId>,
    /// Associated items keyed `Type::name`.
    members: BTreeMap<String, SymbolId>,
    /// Inherent and trait-impl methods by method name.
    methods: BTreeMap<String, Vec<SymbolId>>,
    /// Trait methods; `None` when the method has no default body.
    traits: BTreeMap<String, BTreeMap<String, Option<SymbolId>>>,
}

impl BodyIndex {
    /// Indexes every item of `file` and lowers all bodies.
    pub(crate) fn build(file: &File) -> Self {
        let mut index = Self::default();
        let mut pending = Vec::new();
        index.declare(&file.items, &mut pending);

        for (id, item) in pending {
            let body = match item {
                Pending::Fn {
                    sig,
                    block,
                    self_ty,
                } => Lowerer::for_fn(&mut index, sig, self_ty).block(block),
                Pending::Value(expr) => Lowerer::new(&mut index, None).expr(expr),
            };
            index.table.insert(id, body);
        }

        trace!(
            symbols = index.table.len(),
            traits = index.traits.len(),
            "indexed symbols"
        );
        index
    }

    /// Lowers a handler and keeps only the symbols its body can reach.
    pub(crate) fn handler_body(&mut self, item: &ItemFn) -> HandlerBody {
        let root = Lowerer::for_fn(self, &item.sig, None).block(&item.block);
        let symbols = reachable(&root, &self.table);
        HandlerBody::new(root).with_symbols(symbols)
    }

    fn alloc(&mut self) -> SymbolId {
        let id = SymbolId(self.next);
        self.next += 1;
        id
    }

    fn declare<'a>(&mut self, items: &'a [Item], pending: &mut Vec<(SymbolId, Pending<'a>)>) {
        for item in items {
            match item {
                Item::Fn(f) => {
                    let id = self.alloc();
                    self.items.insert(f.sig.ident.to_string(), id);
                    pending.push((
                        id,
                        Pending::Fn {
                            sig: &f.sig,
                            block: &f.block,
                            self_ty: None,
                        },
                    ));
                }
                Item::Const(c) => {
                    let id = self.alloc();
                    self.items.insert(c.ident.to_string(), id);
                    pending.push((id, Pending::Value(&c.expr)));
                }
                Item::Static(s) => {
                    let id = self.alloc();
                    self.items.insert(s.ident.to_string(), id);
                    pending.push((id, Pending::Value(&s.expr)));
                }
                Item::Impl(imp) => {
                    let Some(self_ty) = last_segment(&imp.self_ty).map(|s| s.ident.to_string())
                    else {
                        continue;
                    };
                    for member in &imp.items {
                        match member {
                            ImplItem::Fn(f) => {
                                let id = self.alloc();
                                let name = f.sig.ident.to_string();
                                self.members.insert(format!("{self_ty}::{name}"), id);
                                self.methods.entry(name).or_default().push(id);
                                pending.push((
                                    id,
                                    Pending::Fn {
                                        sig: &f.sig,
                                        block: &f.block,
                                        self_ty: Some(self_ty.clone()),
                                    },
                                ));
                            }
                            ImplItem::Const(c) => {
                                let id = self.alloc();
                                self.members.insert(format!("{self_ty}::{}", c.ident), id);
                                pending.push((id, Pending::Value(&c.expr)));
                            }
                            _ => {}
                        }
                    }
                }
                Item::Trait(t) => {
                    let trait_name = t.ident.to_string();
                    let mut methods = BTreeMap::new();
                    for member in &t.items {
                        if let TraitItem::Fn(f) = member {
                            let default = f.default.as_ref().map(|block| {
                                let id = self.alloc();
                                pending.push((
                                    id,
                                    Pending::Fn {
                                        sig: &f.sig,
                                        block,
                                        self_ty: Some(trait_name.clone()),
                                    },
                                ));
                                id
                            });
                            if let Some(id) = default {
                                self.members
                                    .insert(format!("{trait_name}::{}", f.sig.ident), id);
                            }
                            methods.insert(f.sig.ident.to_string(), default);
                        }
                    }
                    self.traits.insert(trait_name, methods);
                }
                Item::Mod(m) => {
                    if let Some((_, items)) = &m.content {
                        self.declare(items, pending);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Collects the bodies reachable from `root`.
pub(crate) fn reachable(root: &SyntaxNode, all: &SymbolTable) -> SymbolTable {
    let mut out = SymbolTable::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let next = match node {
            SyntaxNode::Invocation {
                callee,
                receiver,
                args,
            } => {
                stack.extend(args);
                if let Some(receiver) = receiver {
                    stack.push(receiver);
                }
                match callee.target {
                    CallTarget::Local(id) => Some(id),
                    CallTarget::Opaque | CallTarget::External => None,
                }
            }
            SyntaxNode::Reference { symbol } => symbol.symbol,
            SyntaxNode::Literal { .. } => None,
            SyntaxNode::Concat { parts: items } | SyntaxNode::Group { items } => {
                stack.extend(items);
                None
            }
        };
        if let Some(id) = next {
            if out.body(id).is_none() {
                if let Some(body) = all.body(id) {
                    out.insert(id, body.clone());
                    stack.push(body);
                }
            }
        }
    }
    out
}

struct Lowerer<'i> {
    index: &'i mut BodyIndex,
    scopes: Vec<BTreeMap<String, Local>>,
    self_ty: Option<String>,
    bounds: BTreeMap<String, String>,
}

impl<'i> Lowerer<'i> {
    fn new(index: &'i mut BodyIndex, self_ty: Option<String>) -> Self {
        Self {
            index,
            scopes: vec![BTreeMap::new()],
            self_ty,
            bounds: BTreeMap::new(),
        }
    }

    fn for_fn(index: &'i mut BodyIndex, sig: &Signature, self_ty: Option<String>) -> Self {
        let mut lowerer = Self::new(index, self_ty);
        lowerer.bounds = generic_bounds(sig);
        for input in &sig.inputs {
            if let FnArg::Typed(pt) = input {
                let local = Local {
                    symbol: None,
                    trait_name: lowerer.trait_of(&pt.ty),
                };
                lowerer.bind_pat(&pt.pat, &local);
            }
        }
        lowerer
    }

    fn trait_of(&self, ty: &Type) -> Option<String> {
        match ty {
            Type::Reference(r) => self.trait_of(&r.elem),
            Type::Paren(p) => self.trait_of(&p.elem),
            Type::TraitObject(obj) => first_trait(&obj.bounds),
            Type::ImplTrait(imp) => first_trait(&imp.bounds),
            Type::Path(_) => {
                if let Some(inner) = single_arg(ty, POINTERS) {
                    return self.trait_of(inner);
                }
                let seg = last_segment(ty)?;
                self.bounds.get(&seg.ident.to_string()).cloned()
            }
            _ => None,
        }
    }

    fn bind_pat(&mut self, pat: &Pat, local: &Local) {
        match pat {
            Pat::Ident(p) => {
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(p.ident.to_string(), local.clone());
                }
            }
            Pat::Type(pt) => self.bind_pat(&pt.pat, local),
            Pat::Reference(r) => self.bind_pat(&r.pat, local),
            Pat::Tuple(t) => t.elems.iter().for_each(|p| self.bind_pat(p, local)),
            Pat::TupleStruct(t) => t.elems.iter().for_each(|p| self.bind_pat(p, local)),
            Pat::Struct(s) => s.fields.iter().for_each(|f| self.bind_pat(&f.pat, local)),
            Pat::Slice(s) => s.elems.iter().for_each(|p| self.bind_pat(p, local)),
            Pat::Or(o) => o.cases.iter().for_each(|p| self.bind_pat(p, local)),
            _ => {}
        }
    }

    fn local(&self, name: &str) -> Option<&Local> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(BTreeMap::new());
        let out = f(self);
        self.scopes.pop();
        out
    }

    fn block(&mut self, block: &Block) -> SyntaxNode {
        self.scoped(|this| SyntaxNode::group(this.stmts(&block.stmts)))
    }

    fn stmts(&mut self, stmts: &[Stmt]) -> Vec<SyntaxNode> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match stmt {
                Stmt::Local(local) => {
                    let Some(init) = &local.init else {
                        self.bind_pat(&local.pat, &Local::default());
                        continue;
                    };
                    let mut body = self.expr(&init.expr);
                    if let Some((_, diverge)) = &init.diverge {
                        body = SyntaxNode::group(vec![body, self.expr(diverge)]);
                    }
                    let id = self.index.alloc();
                    self.index.table.insert(id, body);

                    let trait_name = match &local.pat {
                        Pat::Type(pt) => self.trait_of(&pt.ty),
                        _ => None,
                    };
                    let binding = Local {
                        symbol: Some(id),
                        trait_name,
                    };
                    self.bind_pat(&local.pat, &binding);
                    out.push(SyntaxNode::reference(SymbolRef::resolved(
                        pat_name(&local.pat),
                        id,
                    )));
                }
                Stmt::Expr(expr, _) => out.push(self.expr(expr)),
                Stmt::Macro(m) => out.push(self.mac(&m.mac)),
                Stmt::Item(_) => {}
            }
        }
        out
    }

    fn exprs<'e>(&mut self, exprs: impl IntoIterator<Item = &'e Expr>) -> Vec<SyntaxNode> {
        exprs.into_iter().map(|e| self.expr(e)).collect()
    }

    fn expr(&mut self, expr: &Expr) -> SyntaxNode {
        match expr {
            Expr::Call(call) => {
                let args = self.exprs(&call.args);
                match &*call.func {
                    Expr::Path(p) if p.qself.is_none() => {
                        let path: Vec<String> =
                            p.path.segments.iter().map(|s| s.ident.to_string()).collect();
                        let target = self.resolve_call(&path);
                        SyntaxNode::call(callee(path, target), args)
                    }
                    func => {
                        let mut items = vec![self.expr(func)];
                        items.extend(args);
                        SyntaxNode::group(items)
                    }
                }
            }
            Expr::MethodCall(call) => {
                let receiver = self.expr(&call.receiver);
                let args = self.exprs(&call.args);
                let method = call.method.to_string();
                let (path, target) = self.resolve_method(&call.receiver, &method);
                SyntaxNode::method_call(receiver, callee(path, target), args)
            }
            Expr::Path(p) if p.qself.is_none() => {
                let path: Vec<String> =
                    p.path.segments.iter().map(|s| s.ident.to_string()).collect();
                let name = path.join("::");
                match self.resolve_value(&path) {
                    Some(id) => SyntaxNode::reference(SymbolRef::resolved(name, id)),
                    None => SyntaxNode::reference(SymbolRef::unresolved(name)),
                }
            }
            Expr::Lit(lit) => lower_lit(&lit.lit),
            Expr::Macro(m) => self.mac(&m.mac),
            Expr::Block(b) => self.block(&b.block),
            Expr::Async(b) => self.block(&b.block),
            Expr::Unsafe(b) => self.block(&b.block),
            Expr::TryBlock(b) => self.block(&b.block),
            Expr::Const(b) => self.block(&b.block),
            Expr::Loop(l) => self.block(&l.body),
            Expr::If(i) => {
                let mut items = vec![self.expr(&i.cond), self.block(&i.then_branch)];
                if let Some((_, other)) = &i.else_branch {
                    items.push(self.expr(other));
                }
                SyntaxNode::group(items)
            }
            Expr::Match(m) => {
                let mut items = vec![self.expr(&m.expr)];
                for arm in &m.arms {
                    let node = self.scoped(|this| {
                        this.bind_pat(&arm.pat, &Local::default());
                        let mut arm_items = Vec::new();
                        if let Some((_, guard)) = &arm.guard {
                            arm_items.push(this.expr(guard));
                        }
                        arm_items.push(this.expr(&arm.body));
                        SyntaxNode::group(arm_items)
                    });
                    items.push(node);
                }
                SyntaxNode::group(items)
            }
            Expr::While(w) => {
                let cond = self.expr(&w.cond);
                SyntaxNode::group(vec![cond, self.block(&w.body)])
            }
            Expr::ForLoop(f) => {
                let iter = self.expr(&f.expr);
                let body = self.scoped(|this| {
                    this.bind_pat(&f.pat, &Local::default());
                    this.block(&f.body)
                });
                SyntaxNode::group(vec![iter, body])
            }
            Expr::Closure(c) => self.scoped(|this| {
                for input in &c.inputs {
                    this.bind_pat(input, &Local::default());
                }
                this.expr(&c.body)
            }),
            Expr::Let(l) => {
                let value = self.expr(&l.expr);
                self.bind_pat(&l.pat, &Local::default());
                value
            }
            Expr::Try(t) => self.expr(&t.expr),
            Expr::Await(a) => self.expr(&a.base),
            Expr::Paren(p) => self.expr(&p.expr),
            Expr::Group(g) => self.expr(&g.expr),
            Expr::Reference(r) => self.expr(&r.expr),
            Expr::Unary(u) => self.expr(&u.expr),
            Expr::Cast(c) => self.expr(&c.expr),
            Expr::Field(f) => self.expr(&f.base),
            Expr::Return(r) => r.expr.as_deref().map_or_else(SyntaxNode::empty, |e| self.expr(e)),
            Expr::Break(b) => b.expr.as_deref().map_or_else(SyntaxNode::empty, |e| self.expr(e)),
            Expr::Yield(y) => y.expr.as_deref().map_or_else(SyntaxNode::empty, |e| self.expr(e)),
            Expr::Binary(b) => {
                let left = self.expr(&b.left);
                SyntaxNode::group(vec![left, self.expr(&b.right)])
            }
            Expr::Assign(a) => {
                let left = self.expr(&a.left);
                SyntaxNode::group(vec![left, self.expr(&a.right)])
            }
            Expr::Index(i) => {
                let base = self.expr(&i.expr);
                SyntaxNode::group(vec![base, self.expr(&i.index)])
            }
            Expr::Range(r) => {
                let items = [r.start.as_deref(), r.end.as_deref()]
                    .into_iter()
                    .flatten()
                    .map(|e| self.expr(e))
                    .collect();
                SyntaxNode::group(items)
            }
            Expr::Tuple(t) => SyntaxNode::group(self.exprs(&t.elems)),
            Expr::Array(a) => SyntaxNode::group(self.exprs(&a.elems)),
            Expr::Repeat(r) => self.expr(&r.expr),
            Expr::Struct(s) => {
                let mut items = self.exprs(s.fields.iter().map(|f| &f.expr));
                if let Some(rest) = &s.rest {
                    items.push(self.expr(rest));
                }
                SyntaxNode::group(items)
            }
            _ => SyntaxNode::empty(),
        }
    }

    fn mac(&mut self, mac: &Macro) -> SyntaxNode {
        let name = mac
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_default();
        let Ok(args) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) else {
            return SyntaxNode::empty();
        };

        match name.as_str() {
            "format" | "format_args" => self.format(&args),
            "concat" => SyntaxNode::Concat {
                parts: self.exprs(&args),
            },
            _ => SyntaxNode::group(self.exprs(&args)),
        }
    }

    fn format(&mut self, args: &Punctuated<Expr, Token![,]>) -> SyntaxNode {
        let mut iter = args.iter();
        let Some(Expr::Lit(syn::ExprLit {
            lit: Lit::Str(template),
            ..
        })) = iter.next()
        else {
            return SyntaxNode::group(self.exprs(args));
        };

        let mut positional = Vec::new();
        let mut named = BTreeMap::new();
        for arg in iter {
            match arg {
                Expr::Assign(a) => {
                    if let Expr::Path(p) = &*a.left {
                        if let Some(ident) = p.path.get_ident() {
                            named.insert(ident.to_string(), self.expr(&a.right));
                            continue;
                        }
                    }
                    positional.push(self.expr(arg));
                }
                _ => positional.push(self.expr(arg)),
            }
        }

        let mut next = 0;
        let parts = format_pieces(&template.value())
            .into_iter()
            .map(|piece| match piece {
                FormatPiece::Text(text) => SyntaxNode::literal(text),
                FormatPiece::Next => {
                    let node = positional.get(next).cloned();
                    next += 1;
                    node.unwrap_or_default()
                }
                FormatPiece::Index(i) => positional.get(i).cloned().unwrap_or_default(),
                FormatPiece::Named(name) => named.get(&name).cloned().unwrap_or_else(|| {
                    let path = vec![name.clone()];
                    match self.resolve_value(&path) {
                        Some(id) => SyntaxNode::reference(SymbolRef::resolved(name, id)),
                        None => SyntaxNode::reference(SymbolRef::unresolved(name)),
                    }
                }),
            })
            .collect();
        SyntaxNode::Concat { parts }
    }

    /// Resolves a path used as a value.
    fn resolve_value(&self, path: &[String]) -> Option<SymbolId> {
        if let [name] = path {
            if let Some(local) = self.local(name) {
                return local.symbol;
            }
            return self.index.items.get(name).copied();
        }
        self.member(path)
    }

    fn resolve_call(&self, path: &[String]) -> CallTarget {
        if let [name] = path {
            if let Some(local) = self.local(name) {
                return local.symbol.map_or(CallTarget::External, CallTarget::Local);
            }
        }
        if let Some(id) = self.resolve_value(path) {
            return CallTarget::Local(id);
        }
        if let [.., owner, method] = path {
            if let Some(methods) = self.index.traits.get(owner) {
                return match methods.get(method) {
                    Some(Some(id)) => CallTarget::Local(*id),
                    _ => CallTarget::Opaque,
                };
            }
        }
        CallTarget::External
    }

    fn resolve_method(&self, receiver: &Expr, method: &str) -> (Vec<String>, CallTarget) {
        let receiver_name = match receiver {
            Expr::Path(p) => p.path.get_ident().map(ToString::to_string),
            _ => None,
        };

        if let Some(name) = &receiver_name {
            if name == "self" {
                if let Some(self_ty) = &self.self_ty {
                    let key = format!("{self_ty}::{method}");
                    if let Some(id) = self.index.members.get(&key) {
                        return (vec![self_ty.clone(), method.to_string()], CallTarget::Local(*id));
                    }
                    if let Some(methods) = self.index.traits.get(self_ty) {
                        let target = match methods.get(method) {
                            Some(Some(id)) => CallTarget::Local(*id),
                            _ => CallTarget::Opaque,
                        };
                        return (vec![self_ty.clone(), method.to_string()], target);
                    }
                }
            } else if let Some(trait_name) = self.local(name).and_then(|l| l.trait_name.clone()) {
                let target = match self
                    .index
                    .traits
                    .get(&trait_name)
                    .and_then(|methods| methods.get(method))
                {
                    Some(Some(id)) => CallTarget::Local(*id),
                    _ => CallTarget::Opaque,
                };
                return (vec![trait_name, method.to_string()], target);
            }
        }

        let target = match self.index.methods.get(method).map(Vec::as_slice) {
            Some([id]) => CallTarget::Local(*id),
            _ => CallTarget::External,
        };
        (vec![method.to_string()], target)
    }

    fn member(&self, path: &[String]) -> Option<SymbolId> {
        let [.., owner, item] = path else {
            return None;
        };
        if matches!(owner.as_str(), "crate" | "self" | "super") {
            return self.index.items.get(item).copied();
        }
        let owner = match (owner.as_str(), &self.self_ty) {
            ("Self", Some(self_ty)) => self_ty.clone(),
            _ => owner.clone(),
        };
        self.index.members.get(&format!("{owner}::{item}")).copied()
    }
}

fn callee(path: Vec<String>, target: CallTarget) -> Callee {
    Callee { path, target }
}

fn lower_lit(lit: &Lit) -> SyntaxNode {
    match lit {
        Lit::Str(s) => SyntaxNode::literal(s.value()),
        Lit::Int(i) => i
            .base10_parse::<i64>()
            .map_or_else(|_| SyntaxNode::empty(), |v| SyntaxNode::literal(LiteralValue::Int(v))),
        Lit::Bool(b) => SyntaxNode::literal(b.value),
        _ => SyntaxNode::empty(),
    }
}

fn pat_name(pat: &Pat) -> String {
    match pat {
        Pat::Ident(p) => p.ident.to_string(),
        Pat::Type(pt) => pat_name(&pt.pat),
        _ => "_".to_string(),
    }
}

fn first_trait(bounds: &Punctuated<TypeParamBound, Token![+]>) -> Option<String> {
    bounds.iter().find_map(|bound| match bound {
        TypeParamBound::Trait(t) => t.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    })
}

fn generic_bounds(sig: &Signature) -> BTreeMap<String, String> {
    let mut bounds = BTreeMap::new();
    for param in &sig.generics.params {
        if let GenericParam::Type(tp) = param {
            if let Some(name) = first_trait(&tp.bounds) {
                bounds.insert(tp.ident.to_string(), name);
            }
        }
    }
    if let Some(where_clause) = &sig.generics.where_clause {
        for predicate in &where_clause.predicates {
            if let WherePredicate::Type(pt) = predicate {
                if let (Some(name), Type::Path(_)) = (first_trait(&pt.bounds), &pt.bounded_ty) {
                    bounds.entry(spell(&pt.bounded_ty)).or_insert(name);
                }
            }
        }
    }
    bounds
}

#[derive(Debug, PartialEq, Eq)]
enum FormatPiece {
    Text(String),
    Next,
    Index(usize),
    Named(String),
}

/// Splits a format string into text and placeholders.
fn format_pieces(template: &str) -> Vec<FormatPiece> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    placeholder.push(c);
                }
                if !text.is_empty() {
                    pieces.push(FormatPiece::Text(std::mem::take(&mut text)));
                }
                let arg = placeholder.split(':').next().unwrap_or_default().trim();
                pieces.push(if arg.is_empty() {
                    FormatPiece::Next
                } else if let Ok(i) = arg.parse() {
                    FormatPiece::Index(i)
                } else {
                    FormatPiece::Named(arg.to_string())
                });
            }
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        pieces.push(FormatPiece::Text(text));
    }
    pieces
}
