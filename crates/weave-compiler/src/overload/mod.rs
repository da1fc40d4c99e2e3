//! Overload selection for one output socket.
//!
//! Every definition registered for a `(name, output)` pair is a candidate.
//! Selection first keeps candidates whose output type fits the demanded
//! type ([`filter_by_output`]). The rest depends on the demand.
//!
//! For a ground demand:
//!
//! 1. Keep the most specific survivors: those whose full signature is not
//!    strictly more general than another survivor's ([`minimal`]).
//! 2. If several remain, drop those whose parameters cannot accept the
//!    argument types actually connected ([`narrow_by_arguments`]) and take
//!    the most specific again.
//!
//! For a generic demand the working demand is the generalisation of the
//! survivors' outputs. Several survivors are narrowed by their arguments
//! against it first, then the most specific is taken.
//!
//! Anything still tied at the end is ambiguous. The resolver reports it
//! rather than picking one.

mod ranking;

pub use ranking::minimal;

use weave_core::{Substitution, Type, Value, generalize, instantiate, specializable, unify, unify_into};
use weave_registry::Definition;

/// A definition instantiated for one request.
///
/// The signature carries fresh type variables, so two candidates never share
/// a variable and the parameters of one candidate share the variables of its
/// own signature.
#[derive(Debug, Clone)]
pub struct Candidate<'r> {
    pub definition: &'r Definition,
    pub signature: Type,
    /// The first `inputs` curried parameter types.
    pub params: Vec<Type>,
    /// What remains after consuming `params`.
    pub output: Type,
}

impl<'r> Candidate<'r> {
    /// Instantiate `definition` for a node with `inputs` inputs and
    /// `literals`. `None` when a derived signature rejects the literals or is
    /// too short for the node.
    pub fn new(definition: &'r Definition, literals: &[Value], inputs: usize) -> Option<Self> {
        let signature = instantiate(&definition.signature_for(literals)?);
        let (all_params, _) = signature.uncurry();
        if all_params.len() < inputs {
            return None;
        }
        let params = all_params[..inputs].iter().map(|&t| t.clone()).collect();
        let output = signature.result_after(inputs)?.clone();
        Some(Self {
            definition,
            signature,
            params,
            output,
        })
    }
}

/// Survivors of the output filter.
#[derive(Debug, Clone)]
pub struct OutputFilter<'r> {
    pub survivors: Vec<Candidate<'r>>,
    /// Common shape of the survivors' outputs.
    pub working: Type,
}

/// Keep candidates whose output can serve `demand`.
///
/// A ground demand must be a specialization of the candidate's output. A
/// demand that still has variables only needs to unify with it.
pub fn filter_by_output<'r>(candidates: Vec<Candidate<'r>>, demand: &Type) -> OutputFilter<'r> {
    let ground = demand.is_ground();
    let survivors: Vec<Candidate<'r>> = candidates
        .into_iter()
        .filter(|c| {
            if ground {
                specializable(&c.output, demand)
            } else {
                unify(&c.output, demand).is_some()
            }
        })
        .collect();
    let outputs: Vec<Type> = survivors.iter().map(|c| c.output.clone()).collect();
    OutputFilter {
        working: generalize(&outputs),
        survivors,
    }
}

/// Common shape of the survivors' parameter at `index`.
pub fn generalized_param(candidates: &[Candidate<'_>], index: usize) -> Type {
    let params: Vec<Type> = candidates
        .iter()
        .filter_map(|c| c.params.get(index).cloned())
        .collect();
    generalize(&params)
}

/// Keep candidates that accept `demand` as output and the `actual` argument
/// types at once. `None` entries are unknown arguments and accept anything.
pub fn narrow_by_arguments<'r>(
    candidates: Vec<Candidate<'r>>,
    demand: &Type,
    actual: &[Option<Type>],
) -> Vec<Candidate<'r>> {
    candidates
        .into_iter()
        .filter(|c| accepts(c, demand, actual))
        .collect()
}

fn accepts(candidate: &Candidate<'_>, demand: &Type, actual: &[Option<Type>]) -> bool {
    let mut subst = Substitution::new();
    if !unify_into(&candidate.output, demand, &mut subst) {
        return false;
    }
    candidate
        .params
        .iter()
        .zip(actual)
        .all(|(param, arg)| match arg {
            Some(arg) => unify_into(param, arg, &mut subst),
            None => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::Term;

    fn binary(name: &str, ty: Type) -> Definition {
        Definition::native(name, 0, Type::function([ty.clone(), ty.clone()], ty), |_| {
            Ok(Term::unit())
        })
    }

    #[test]
    fn candidate_splits_params_and_output() {
        let def = binary("add", Type::int());
        let c = Candidate::new(&def, &[], 2).unwrap();
        assert_eq!(c.params, vec![Type::int(), Type::int()]);
        assert_eq!(c.output, Type::int());

        // One input consumed leaves a function as the output.
        let c = Candidate::new(&def, &[], 1).unwrap();
        assert_eq!(c.output, Type::arrow(Type::int(), Type::int()));
    }

    #[test]
    fn candidate_rejects_short_derived_signature() {
        let def = Definition::derived("value", 0, |lits| lits.first().map(Value::ty), |_| {
            Ok(Term::unit())
        });
        assert!(Candidate::new(&def, &[Value::Int(1)], 0).is_some());
        assert!(Candidate::new(&def, &[Value::Int(1)], 1).is_none());
        assert!(Candidate::new(&def, &[], 0).is_none());
    }

    #[test]
    fn ground_demand_filters_by_specialization() {
        let int = binary("add", Type::int());
        let float = binary("add", Type::float());
        let cands = vec![
            Candidate::new(&int, &[], 2).unwrap(),
            Candidate::new(&float, &[], 2).unwrap(),
        ];
        let f = filter_by_output(cands, &Type::float());
        assert_eq!(f.survivors.len(), 1);
        assert_eq!(f.survivors[0].output, Type::float());
        assert_eq!(f.working, Type::float());
    }

    #[test]
    fn generic_demand_keeps_unifiable_outputs() {
        let int = binary("add", Type::int());
        let float = binary("add", Type::float());
        let cands = vec![
            Candidate::new(&int, &[], 2).unwrap(),
            Candidate::new(&float, &[], 2).unwrap(),
        ];
        let f = filter_by_output(cands, &Type::fresh());
        assert_eq!(f.survivors.len(), 2);
        assert!(f.working.is_variable());
    }

    #[test]
    fn generic_output_serves_ground_demand() {
        let nil = Definition::constant("nil", 0, Value::nil());
        let cands = vec![Candidate::new(&nil, &[], 0).unwrap()];
        let f = filter_by_output(cands, &Type::list(Type::int()));
        assert_eq!(f.survivors.len(), 1);
    }

    #[test]
    fn arguments_narrow_survivors() {
        let int = binary("add", Type::int());
        let float = binary("add", Type::float());
        let cands = vec![
            Candidate::new(&int, &[], 2).unwrap(),
            Candidate::new(&float, &[], 2).unwrap(),
        ];
        let kept = narrow_by_arguments(cands, &Type::fresh(), &[Some(Type::float()), None]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].output, Type::float());
    }

    #[test]
    fn arguments_must_agree_with_each_other() {
        let pair = Definition::native(
            "same",
            0,
            Type::function([Type::var(0), Type::var(0)], Type::bool()),
            |_| Ok(Term::unit()),
        );
        let cands = vec![Candidate::new(&pair, &[], 2).unwrap()];
        let kept = narrow_by_arguments(
            cands,
            &Type::bool(),
            &[Some(Type::int()), Some(Type::float())],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn generalized_param_finds_common_shape() {
        let a = Definition::native("len", 0, Type::function([Type::list(Type::int())], Type::int()), |_| {
            Ok(Term::unit())
        });
        let b = Definition::native(
            "len",
            0,
            Type::function([Type::list(Type::float())], Type::int()),
            |_| Ok(Term::unit()),
        );
        let cands = vec![
            Candidate::new(&a, &[], 1).unwrap(),
            Candidate::new(&b, &[], 1).unwrap(),
        ];
        assert!(matches!(generalized_param(&cands, 0), Type::List(_)));
    }
}
