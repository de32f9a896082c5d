//! Tests for model evaluation, binding and derivative caching.

use approx::assert_relative_eq;
use ndarray::array;
use symfit_rs::{
    Argument, BindingError, Bindings, Expr, Model, Parameter, Symbolic, SymfitError, Value,
    Variable,
};

fn gaussian() -> (Parameter, Parameter, Parameter, Variable, Model) {
    let amp = Parameter::named("amp");
    let mu = Parameter::named("mu");
    let sig = Parameter::builder().name("sig").value(2.0).fixed(true).build().unwrap();
    let x = Variable::named("x");
    let model = Model::new(&amp * (-((&x - &mu).pow(2.0)) / (2.0 * sig.pow(2.0))).exp()).unwrap();
    (amp, mu, sig, x, model)
}

#[test]
fn test_complete_binding_never_fails() {
    let (_, _, _, _, model) = gaussian();
    let bindings = Bindings::new()
        .bind("x", array![-1.0, 0.0, 1.0])
        .bind("amp", 3.0)
        .bind("mu", 0.0);
    let y = model.evaluate(&bindings).unwrap();
    let y = y[0].as_array().unwrap();
    assert_relative_eq!(y[1], 3.0);
    assert_relative_eq!(y[0], 3.0 * (-1.0f64 / 8.0).exp(), epsilon = 1e-12);
}

#[test]
fn test_omitting_any_required_keyword_fails() {
    let (_, _, _, _, model) = gaussian();
    let full = [("x", Value::from(1.0)), ("amp", 2.0.into()), ("mu", 0.5.into())];

    for skip in 0..full.len() {
        let partial: Bindings = full
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, (name, value))| (*name, value.clone()))
            .collect();
        match model.evaluate(&partial) {
            Err(SymfitError::Binding(BindingError::Missing { name })) => {
                assert_eq!(name, full[skip].0)
            }
            other => panic!("expected a missing binding, got {:?}", other),
        }
    }
}

#[test]
fn test_jacobian_reference_identical() {
    let (amp, mu, _, _, model) = gaussian();
    let first = model.jacobian().unwrap();
    let second = model.jacobian().unwrap();
    assert!(std::ptr::eq(first, second));
    // one entry per non-fixed parameter
    assert_eq!(first[0].len(), 2);
    assert_eq!(model.free_params(), vec![&amp, &mu]);

    let compiled = model.compiled_jacobian().unwrap();
    assert!(std::ptr::eq(compiled, model.compiled_jacobian().unwrap()));
}

#[test]
fn test_jacobian_matches_finite_differences() {
    let (_, _, _, _, model) = gaussian();
    let at = |amp: f64, mu: f64| {
        Bindings::new()
            .bind("x", 0.7)
            .bind("amp", amp)
            .bind("mu", mu)
    };
    let jac = model.evaluate_jacobian(&at(1.5, 0.2)).unwrap();
    let f = |amp: f64, mu: f64| model.evaluate(&at(amp, mu)).unwrap()[0].as_scalar().unwrap();

    let h = 1e-6;
    let d_amp = (f(1.5 + h, 0.2) - f(1.5 - h, 0.2)) / (2.0 * h);
    let d_mu = (f(1.5, 0.2 + h) - f(1.5, 0.2 - h)) / (2.0 * h);
    assert_relative_eq!(jac[0][0].as_scalar().unwrap(), d_amp, epsilon = 1e-8);
    assert_relative_eq!(jac[0][1].as_scalar().unwrap(), d_mu, epsilon = 1e-8);
}

#[test]
fn test_fixed_parameter_override() {
    let (_, _, _, _, model) = gaussian();
    let base = Bindings::new().bind("x", 2.0).bind("amp", 1.0).bind("mu", 0.0);
    let narrow = model.evaluate(&base.clone().bind("sig", 1.0)).unwrap();
    let default = model.evaluate(&base).unwrap();
    assert_relative_eq!(default[0].as_scalar().unwrap(), (-0.5f64).exp());
    assert_relative_eq!(narrow[0].as_scalar().unwrap(), (-2.0f64).exp());
}

#[test]
fn test_parsed_expression_equals_composed() {
    let (amp, mu, sig, x, composed) = gaussian();
    let symbols: Vec<Argument> = vec![(&amp).into(), (&mu).into(), (&sig).into(), (&x).into()];
    let parsed = Model::new(
        Expr::parse("amp * exp(-(x - mu)^2 / (2 * sig^2))", &symbols).unwrap(),
    )
    .unwrap();

    let bindings = Bindings::new()
        .bind("x", array![-2.0, 0.3, 4.0])
        .bind("amp", 1.7)
        .bind("mu", 0.4);
    let expected = composed.evaluate(&bindings).unwrap();
    let actual = parsed.evaluate(&bindings).unwrap();
    for (e, a) in expected[0]
        .as_array()
        .unwrap()
        .iter()
        .zip(actual[0].as_array().unwrap())
    {
        assert_relative_eq!(e, a, epsilon = 1e-12);
    }

    let jac_expected = composed.evaluate_jacobian(&bindings).unwrap();
    let jac_actual = parsed.evaluate_jacobian(&bindings).unwrap();
    for (e, a) in jac_expected[0].iter().zip(&jac_actual[0]) {
        let (e, a) = (e.as_array().unwrap(), a.as_array().unwrap());
        assert!(e.iter().zip(a).all(|(e, a)| (e - a).abs() < 1e-12));
    }
}

#[test]
fn test_model_shared_between_threads() {
    let (_, _, _, _, model) = gaussian();
    let bindings = Bindings::new().bind("x", 0.0).bind("amp", 2.0).bind("mu", 0.0);
    let results: Vec<f64> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| model.evaluate(&bindings).unwrap()[0].as_scalar().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(results.iter().all(|&y| y == 2.0));
}
