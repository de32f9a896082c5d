//! Tests for constraints as seen through the strategies.

use approx::assert_relative_eq;
use symfit_rs::constraint::encode;
use symfit_rs::{
    Bindings, Constraint, ConstraintKind, FitStrategy, Minimize, MinimizeParameters, Model,
    OptimizeOver, Parameter, Relation, Strategy, StrategyKind, Symbolic, SymfitError, Variable,
};

#[test]
fn test_relations_display_and_strictness() {
    let x = Variable::named("x");
    let c = Constraint::new(x.pow(2.0), Relation::Lt, 4.0);
    let shown = c.to_string();
    assert!(shown.contains(" < "));
    assert!(shown.starts_with(&c.lhs().to_string()));
    assert!(shown.ends_with(&c.rhs().to_string()));
    assert!(c.relation().is_strict());
    assert!(!Relation::Ge.is_strict());
}

#[test]
fn test_strict_inequality_collapsed_and_flagged() {
    let x = Variable::named("x");
    let model = Model::new((&x - 5.0).pow(2.0)).unwrap();
    let upper = Constraint::lt(&x, 2.0);

    let encoded = encode(&upper, &model, OptimizeOver::Variables).unwrap();
    assert_eq!(encoded.kind, ConstraintKind::Ineq);
    assert!(encoded.strict);

    // the optimum lands on the boundary the strict relation excludes
    let results = Minimize::new(&model)
        .unwrap()
        .with_constraints(&[upper])
        .unwrap()
        .execute()
        .unwrap();
    assert!(results.success(), "{}", results.message());
    assert_relative_eq!(results.get_value(&x).unwrap(), 2.0, epsilon = 1e-6);
}

#[test]
fn test_not_equal_rejected_by_every_strategy() {
    let a = Parameter::named("a");
    let x = Variable::named("x");
    let model = Model::new(&a * &x).unwrap();
    let data = Bindings::new().bind("x", vec![1.0, 2.0]).bind("y", vec![2.0, 4.0]);

    assert!(matches!(
        Strategy::for_data(&model, data.clone(), &[Constraint::ne(&a, 0.0)]),
        Err(SymfitError::UnsupportedConstraint(_))
    ));
    assert!(matches!(
        Minimize::new(&model)
            .unwrap()
            .with_constraints(&[Constraint::ne(&x, 0.0)]),
        Err(SymfitError::UnsupportedConstraint(_))
    ));
    assert!(MinimizeParameters::new(&model, data)
        .unwrap()
        .with_constraints(&[Constraint::ne(&a, 1.0)])
        .is_err());
}

#[test]
fn test_dispatch_on_problem_shape() {
    let a = Parameter::named("a");
    let b = Parameter::named("b");
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &b).unwrap();
    let data = Bindings::new()
        .bind("x", vec![0.0, 1.0, 2.0, 3.0])
        .bind("y", vec![1.0, 3.0, 5.0, 7.0]);

    let plain = Strategy::for_data(&model, data.clone(), &[]).unwrap();
    assert_eq!(plain.kind(), StrategyKind::LeastSquares);

    // a + b == 2 moves the fit away from (2, 1)
    let constrained =
        Strategy::for_data(&model, data, &[Constraint::eq(&a + &b, 2.0)]).unwrap();
    assert_eq!(constrained.kind(), StrategyKind::MinimizeParameters);
    assert_eq!(constrained.optimize_over(), OptimizeOver::Parameters);

    let results = constrained.execute().unwrap();
    assert!(results.success(), "{}", results.message());
    let (fa, fb) = (results.get_value(&a).unwrap(), results.get_value(&b).unwrap());
    assert_relative_eq!(fa + fb, 2.0, epsilon = 1e-6);
    // min over a of sum (a x + 2 - a - y)^2 -> a = 7/3
    assert_relative_eq!(fa, 7.0 / 3.0, epsilon = 1e-5);
    assert_eq!(results.get_stdev(&a).unwrap(), None);
}
