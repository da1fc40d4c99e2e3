//! Generalisation, specialisation and unification over [`Type`].
//!
//! - [`generalize`] computes the least general type every input is an
//!   instance of, introducing fresh variables where inputs disagree.
//! - [`specializable`] is the one-directional check "can `specific` be
//!   obtained from `general` by consistently substituting `general`'s
//!   variables". Variables on the specific side are rigid.
//! - [`unify`] is the two-sided most general unifier, used to thread argument
//!   bindings through a resolved node.
//!
//! The resolver ranks overloads with the first two and binds with the third.

use rustc_hash::FxHashMap;

use super::{Type, TypeVar};

/// A mapping from type variables to types.
///
/// Substitutions built by [`unify`] are kept idempotent, so [`apply`](Self::apply)
/// is a single pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    map: FxHashMap<TypeVar, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: TypeVar) -> Option<&Type> {
        self.map.get(&var)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeVar, &Type)> {
        self.map.iter()
    }

    /// Replace every bound variable in `ty`.
    pub fn apply(&self, ty: &Type) -> Type {
        if self.map.is_empty() {
            return ty.clone();
        }
        ty.map_vars(&mut |v| {
            self.map
                .get(&v)
                .cloned()
                .unwrap_or(Type::Variable(v))
        })
    }

    /// Bind `var` to `ty`, rewriting existing bindings so the map stays idempotent.
    ///
    /// `ty` must already have this substitution applied.
    fn bind(&mut self, var: TypeVar, ty: Type) {
        let single = Substitution {
            map: std::iter::once((var, ty.clone())).collect(),
        };
        for bound in self.map.values_mut() {
            *bound = single.apply(bound);
        }
        self.map.insert(var, ty);
    }

    /// `self` followed by `other`: `compose(a, b).apply(t) == b.apply(&a.apply(t))`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut map: FxHashMap<TypeVar, Type> = self
            .map
            .iter()
            .map(|(v, t)| (*v, other.apply(t)))
            .collect();
        for (v, t) in &other.map {
            map.entry(*v).or_insert_with(|| t.clone());
        }
        Substitution { map }
    }
}

/// Least general common type of `types`.
///
/// Folds left to right with a pairwise merge. Each merge reuses one fresh
/// variable per distinct disagreeing `(t1, t2)` pair; the table is reset
/// between merges so variable identity never leaks across folds. An empty
/// input yields a fresh variable.
///
/// ```
/// use weave_core::{Type, generalize, specializable};
///
/// let g = generalize(&[Type::list(Type::int()), Type::list(Type::float())]);
/// assert!(matches!(g, Type::List(_)));
/// assert!(specializable(&g, &Type::list(Type::int())));
/// ```
pub fn generalize(types: &[Type]) -> Type {
    let mut iter = types.iter();
    let Some(first) = iter.next() else {
        return Type::fresh();
    };
    let mut table = FxHashMap::default();
    let mut acc = first.clone();
    for ty in iter {
        table.clear();
        acc = merge(&acc, ty, &mut table);
    }
    acc
}

fn merge(a: &Type, b: &Type, table: &mut FxHashMap<(Type, Type), Type>) -> Type {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (Type::Arrow(a1, a2), Type::Arrow(b1, b2)) => {
            let captured = merge(a1, b1, table);
            let returns = merge(a2, b2, table);
            Type::arrow(captured, returns)
        }
        (Type::List(x), Type::List(y)) => Type::list(merge(x, y, table)),
        _ => table
            .entry((a.clone(), b.clone()))
            .or_insert_with(Type::fresh)
            .clone(),
    }
}

/// Can `specific` be obtained from `general` by substituting `general`'s variables?
///
/// ```
/// use weave_core::{Type, specializable};
///
/// let ident = Type::arrow(Type::var(0), Type::var(0));
/// assert!(specializable(&ident, &Type::arrow(Type::int(), Type::int())));
/// assert!(!specializable(&ident, &Type::arrow(Type::int(), Type::float())));
/// ```
pub fn specializable(general: &Type, specific: &Type) -> bool {
    matching(general, specific).is_some()
}

/// The substitution witnessing [`specializable`], if any.
///
/// The returned bindings map variables of `general` to parts of `specific`.
pub fn matching(general: &Type, specific: &Type) -> Option<Substitution> {
    let mut bindings: FxHashMap<TypeVar, Type> = FxHashMap::default();
    let mut constraints: Vec<(&Type, &Type)> = vec![(general, specific)];

    while let Some((g, s)) = constraints.pop() {
        match (g, s) {
            (Type::Variable(v), _) => match bindings.get(v) {
                Some(bound) if bound != s => return None,
                Some(_) => {}
                None => {
                    bindings.insert(*v, s.clone());
                }
            },
            (Type::Arrow(g1, g2), Type::Arrow(s1, s2)) => {
                constraints.push((g2.as_ref(), s2.as_ref()));
                constraints.push((g1.as_ref(), s1.as_ref()));
            }
            (Type::List(ge), Type::List(se)) => constraints.push((ge.as_ref(), se.as_ref())),
            (Type::Value(a), Type::Value(b)) if a == b => {}
            _ => return None,
        }
    }

    Some(Substitution { map: bindings })
}

/// `a` is strictly more general than `b`.
pub fn more_general(a: &Type, b: &Type) -> bool {
    specializable(a, b) && !specializable(b, a)
}

/// Most general unifier of `a` and `b`.
pub fn unify(a: &Type, b: &Type) -> Option<Substitution> {
    let mut subst = Substitution::new();
    unify_into(a, b, &mut subst).then_some(subst)
}

/// Extend `subst` so that it unifies `a` and `b`. On failure `subst` may hold
/// partial bindings and should be discarded.
pub fn unify_into(a: &Type, b: &Type, subst: &mut Substitution) -> bool {
    let a = subst.apply(a);
    let b = subst.apply(b);
    match (&a, &b) {
        _ if a == b => true,
        (Type::Variable(v), other) | (other, Type::Variable(v)) => {
            if other.contains_var(*v) {
                return false;
            }
            subst.bind(*v, other.clone());
            true
        }
        (Type::Arrow(a1, a2), Type::Arrow(b1, b2)) => {
            unify_into(a1, b1, subst) && unify_into(a2, b2, subst)
        }
        (Type::List(x), Type::List(y)) => unify_into(x, y, subst),
        _ => false,
    }
}

/// Copy of `ty` with every variable replaced by a fresh one.
pub fn instantiate(ty: &Type) -> Type {
    let mut renames: FxHashMap<TypeVar, Type> = FxHashMap::default();
    ty.map_vars(&mut |v| renames.entry(v).or_insert_with(Type::fresh).clone())
}

/// Copy of `ty` with variables renamed `a, b, ...` by first appearance.
///
/// Two types are equal up to renaming exactly when their normal forms are equal.
pub fn normalize(ty: &Type) -> Type {
    let mut renames: FxHashMap<TypeVar, Type> = FxHashMap::default();
    let mut next = 0u32;
    ty.map_vars(&mut |v| {
        renames
            .entry(v)
            .or_insert_with(|| {
                let t = Type::var(next);
                next += 1;
                t
            })
            .clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Type {
        Type::var(0)
    }

    fn b() -> Type {
        Type::var(1)
    }

    #[test]
    fn generalize_single_is_identity() {
        let t = Type::function([Type::int()], Type::list(Type::float()));
        assert_eq!(generalize(&[t.clone()]), t);
    }

    #[test]
    fn generalize_duplicates_is_identity() {
        let t = Type::arrow(a(), Type::list(a()));
        assert_eq!(generalize(&[t.clone(), t.clone()]), t);
    }

    #[test]
    fn generalize_empty_is_variable() {
        assert!(generalize(&[]).is_variable());
    }

    #[test]
    fn generalize_reuses_variable_for_same_pair() {
        // int -> int  vs  float -> float  ==>  x -> x
        let g = generalize(&[
            Type::arrow(Type::int(), Type::int()),
            Type::arrow(Type::float(), Type::float()),
        ]);
        assert_eq!(normalize(&g), Type::arrow(a(), a()));
    }

    #[test]
    fn generalize_distinct_pairs_get_distinct_variables() {
        let g = generalize(&[
            Type::arrow(Type::int(), Type::float()),
            Type::arrow(Type::float(), Type::int()),
        ]);
        assert_eq!(normalize(&g), Type::arrow(a(), b()));
    }

    #[test]
    fn generalize_is_commutative_up_to_renaming() {
        let x = Type::function([Type::int(), Type::list(Type::int())], Type::bool());
        let y = Type::function([Type::string(), Type::list(Type::float())], Type::bool());
        assert_eq!(
            normalize(&generalize(&[x.clone(), y.clone()])),
            normalize(&generalize(&[y, x]))
        );
    }

    #[test]
    fn generalize_shape_mismatch_is_variable() {
        let g = generalize(&[Type::list(Type::int()), Type::arrow(Type::int(), Type::int())]);
        assert!(g.is_variable());
    }

    #[test]
    fn generalize_result_specializes_to_every_input() {
        let inputs = [
            Type::function([Type::int(), Type::int()], Type::int()),
            Type::function([Type::float(), Type::float()], Type::float()),
            Type::function([Type::string(), Type::string()], Type::string()),
        ];
        let g = generalize(&inputs);
        for t in &inputs {
            assert!(specializable(&g, t), "{g} should specialize to {t}");
        }
    }

    #[test]
    fn specializable_is_reflexive() {
        for t in [
            Type::int(),
            a(),
            Type::list(a()),
            Type::function([a(), Type::list(a())], Type::list(a())),
            Type::arrow(Type::arrow(a(), b()), Type::list(b())),
        ] {
            assert!(specializable(&t, &t), "{t}");
        }
    }

    #[test]
    fn specializable_rejects_shape_mismatch() {
        let arrow = Type::arrow(Type::int(), Type::int());
        assert!(!specializable(&arrow, &Type::int()));
        assert!(!specializable(&Type::int(), &arrow));
        assert!(!specializable(&Type::list(Type::int()), &arrow));
        assert!(!specializable(&arrow, &Type::list(Type::int())));
    }

    #[test]
    fn specializable_requires_consistent_bindings() {
        let pair = Type::function([a()], a());
        assert!(specializable(&pair, &Type::arrow(Type::int(), Type::int())));
        assert!(!specializable(&pair, &Type::arrow(Type::int(), Type::bool())));
    }

    #[test]
    fn specific_side_variables_are_rigid() {
        assert!(!specializable(&Type::int(), &a()));
        assert!(specializable(&a(), &b()));
        assert!(!specializable(&Type::arrow(a(), a()), &Type::arrow(a(), b())));
    }

    #[test]
    fn matching_returns_bindings() {
        let subst = matching(&Type::list(a()), &Type::list(Type::int())).unwrap();
        assert_eq!(subst.apply(&a()), Type::int());
    }

    #[test]
    fn more_general_is_strict() {
        assert!(more_general(&Type::list(a()), &Type::list(Type::int())));
        assert!(!more_general(&Type::list(Type::int()), &Type::list(a())));
        assert!(!more_general(&a(), &b()));
    }

    #[test]
    fn unify_binds_both_sides() {
        let x = Type::arrow(a(), Type::int());
        let y = Type::arrow(Type::float(), b());
        let subst = unify(&x, &y).unwrap();
        assert_eq!(subst.apply(&x), Type::arrow(Type::float(), Type::int()));
        assert_eq!(subst.apply(&x), subst.apply(&y));
    }

    #[test]
    fn unify_occurs_check() {
        assert!(unify(&a(), &Type::list(a())).is_none());
    }

    #[test]
    fn unify_chains_stay_idempotent() {
        let mut subst = Substitution::new();
        assert!(unify_into(&a(), &b(), &mut subst));
        assert!(unify_into(&b(), &Type::int(), &mut subst));
        assert_eq!(subst.apply(&a()), Type::int());
        assert_eq!(subst.apply(&b()), Type::int());
    }

    #[test]
    fn instantiate_renames_consistently() {
        let t = Type::function([a()], Type::list(a()));
        let fresh = instantiate(&t);
        assert_ne!(fresh, t);
        assert_eq!(normalize(&fresh), t);
    }

    #[test]
    fn compose_applies_in_order() {
        let first = matching(&a(), &b()).unwrap();
        let second = matching(&b(), &Type::int()).unwrap();
        let both = first.compose(&second);
        assert_eq!(both.apply(&a()), Type::int());
        assert_eq!(both.apply(&b()), Type::int());
    }
}
