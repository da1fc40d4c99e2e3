//! Argument substitution for lambda application.

use rustc_hash::FxHashMap;

use crate::VarId;
use crate::term::{Lambda, Term, TermNode};
use crate::value::{ListCell, Value};

/// Replace every occurrence of the free variable `var` in `term`.
///
/// Sub-terms that do not mention `var` are returned as the same node, and a
/// shared sub-term is rebuilt once, so the result keeps the sharing of the
/// input.
pub(crate) fn substitute(term: &Term, var: VarId, replacement: &Term) -> Term {
    let mut substituter = Substituter {
        var,
        replacement,
        memo: FxHashMap::default(),
    };
    substituter.visit(term)
}

struct Substituter<'a> {
    var: VarId,
    replacement: &'a Term,
    memo: FxHashMap<usize, Term>,
}

impl Substituter<'_> {
    fn visit(&mut self, term: &Term) -> Term {
        if let Some(done) = self.memo.get(&term.address()) {
            return done.clone();
        }
        let rebuilt = self.rebuild(term);
        self.memo.insert(term.address(), rebuilt.clone());
        rebuilt
    }

    fn rebuild(&mut self, term: &Term) -> Term {
        match term.node() {
            TermNode::FreeVar(v) if v.id == self.var => self.replacement.clone(),
            TermNode::Apply(app) => {
                let function = self.visit(app.function());
                let argument = self.visit(app.argument());
                if Term::ptr_eq(&function, app.function()) && Term::ptr_eq(&argument, app.argument()) {
                    term.clone()
                } else {
                    Term::apply(function, argument)
                }
            }
            TermNode::Closure(c) => match self.visit_all(c.arguments()) {
                Some(arguments) => Term::closure_boxed(c.with_arguments(arguments)),
                None => term.clone(),
            },
            // an inner binder for the same variable shadows it
            TermNode::Lambda(l) if l.param == self.var => term.clone(),
            TermNode::Lambda(l) => {
                let body = self.visit(&l.body);
                let argument = l.argument.as_ref().map(|a| self.visit(a));
                let same_arg = match (&argument, &l.argument) {
                    (Some(a), Some(b)) => Term::ptr_eq(a, b),
                    _ => true,
                };
                if Term::ptr_eq(&body, &l.body) && same_arg {
                    term.clone()
                } else {
                    let mut lambda = Lambda::new(l.param, l.param_ty.clone(), body);
                    lambda.argument = argument;
                    Term::from_node(TermNode::Lambda(lambda))
                }
            }
            TermNode::Fix(f) => {
                let inner = self.visit(f);
                if Term::ptr_eq(&inner, f) {
                    term.clone()
                } else {
                    Term::fix(inner)
                }
            }
            TermNode::Value(Value::List(ListCell::Cons(head, tail))) => {
                let h = self.visit(head);
                let t = self.visit(tail);
                if Term::ptr_eq(&h, head) && Term::ptr_eq(&t, tail) {
                    term.clone()
                } else {
                    Term::cons(h, t)
                }
            }
            TermNode::Value(Value::Tuple(items)) => match self.visit_all(items) {
                Some(items) => Term::value(Value::Tuple(items.into())),
                None => term.clone(),
            },
            _ => term.clone(),
        }
    }

    /// Visit each term; `None` when nothing changed.
    fn visit_all(&mut self, terms: &[Term]) -> Option<Vec<Term>> {
        let visited: Vec<Term> = terms.iter().map(|t| self.visit(t)).collect();
        let changed = visited
            .iter()
            .zip(terms)
            .any(|(new, old)| !Term::ptr_eq(new, old));
        changed.then_some(visited)
    }
}
