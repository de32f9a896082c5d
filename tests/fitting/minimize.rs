//! Direct optimization of model expressions over their variables.

use approx::assert_relative_eq;
use symfit_rs::options::options;
use symfit_rs::{
    Constraint, FitStrategy, Maximize, Minimize, Model, OptimizeOver, Parameter, Strategy,
    StrategyKind, Symbolic, SymfitError, Variable,
};

fn saddle_free_quadratic() -> (Variable, Variable, Model) {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let model = Model::new(2.0 * &x * &y + 2.0 * &x - x.pow(2.0) - 2.0 * y.pow(2.0)).unwrap();
    (x, y, model)
}

#[test]
fn test_maximize_with_equality_and_inequality() {
    let (x, y, model) = saddle_free_quadratic();
    let constraints = [
        Constraint::eq(x.pow(3.0) - &y, 0.0),
        Constraint::ge(&y - 1.0, 0.0),
    ];
    let strategy: Strategy = Maximize::new(&model)
        .unwrap()
        .with_constraints(&constraints)
        .unwrap()
        .into();
    assert_eq!(strategy.optimize_over(), OptimizeOver::Variables);
    assert_eq!(strategy.free_arguments().len(), 2);

    let results = strategy.execute().unwrap();
    assert!(results.success(), "{}", results.message());
    assert_eq!(results.strategy(), StrategyKind::Maximize);
    assert_relative_eq!(results.get_value(&x).unwrap(), 1.0, epsilon = 1e-5);
    assert_relative_eq!(results.get_value(&y).unwrap(), 1.0, epsilon = 1e-5);
    // reported with the sign of the maximized expression
    assert_relative_eq!(results.objective_value(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_minimize_equals_negated_maximize() {
    let (x, y, model) = saddle_free_quadratic();
    let negated = Model::new(-(2.0 * &x * &y + 2.0 * &x - x.pow(2.0) - 2.0 * y.pow(2.0))).unwrap();

    let max = Maximize::new(&model).unwrap().execute().unwrap();
    let min = Minimize::new(&negated).unwrap().execute().unwrap();

    assert_relative_eq!(max.objective_value(), -min.objective_value(), epsilon = 1e-9);
    assert_relative_eq!(max.get_value(&x).unwrap(), min.get_value(&x).unwrap(), epsilon = 1e-6);
    assert_relative_eq!(max.get_value(&y).unwrap(), min.get_value(&y).unwrap(), epsilon = 1e-6);
}

#[test]
fn test_initial_guess_selects_local_minimum() {
    // double well with minima at -1 and +1
    let x = Variable::named("x");
    let model = Model::new((x.pow(2.0) - 1.0).pow(2.0)).unwrap();

    let left = Minimize::new(&model)
        .unwrap()
        .with_initial_guess(&x, -1.1)
        .unwrap()
        .execute()
        .unwrap();
    let right = Minimize::new(&model)
        .unwrap()
        .with_initial_guess(&x, 0.5)
        .unwrap()
        .execute()
        .unwrap();

    assert_relative_eq!(left.get_value(&x).unwrap(), -1.0, epsilon = 1e-5);
    assert_relative_eq!(right.get_value(&x).unwrap(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_fixed_parameter_reported() {
    let c = Parameter::builder().name("c").value(5.0).fixed(true).build().unwrap();
    let x = Variable::named("x");
    let model = Model::new((&x - &c).pow(2.0) + 1.0).unwrap();

    let results = Minimize::new(&model).unwrap().execute().unwrap();
    assert_eq!(results.get_value(&c).unwrap(), 5.0);
    assert_eq!(results.get_stdev(&c).unwrap(), None);
    assert_relative_eq!(results.objective_value(), 1.0, epsilon = 1e-10);
}

#[test]
fn test_option_errors() {
    let (_, _, model) = saddle_free_quadratic();
    let strategy = Maximize::new(&model).unwrap();
    assert!(matches!(
        strategy.execute_with(&options([("lambda_up_factor", 2.0.into())])),
        Err(SymfitError::InvalidOption(_))
    ));
    let limited = strategy
        .execute_with(&options([("max_inner_iterations", 1.into())]))
        .unwrap();
    assert!(!limited.success());
}
