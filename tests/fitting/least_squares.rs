//! Least-squares fits through the public API.

use approx::assert_relative_eq;
use ndarray::Array1;
use symfit_rs::options::options;
use symfit_rs::{
    Bindings, Fit, FitStrategy, LeastSquares, Model, Parameter, Symbolic, SymfitError, Variable,
};

use crate::test_helpers::noisy_samples;

#[test]
fn test_linear_exact_data() {
    let a = Parameter::named("a");
    let b = Parameter::named("b");
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &b).unwrap();

    let results = Fit::xy(&model, vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0])
        .unwrap()
        .execute()
        .unwrap();

    assert!(results.success());
    assert_relative_eq!(results.get_value(&a).unwrap(), 2.0, epsilon = 1e-6);
    assert_relative_eq!(results.get_value(&b).unwrap(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(results.r_squared().unwrap().unwrap(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(results.get_stdev(&a).unwrap().unwrap(), 0.0, epsilon = 1e-6);
    assert_relative_eq!(results.get_stdev(&b).unwrap().unwrap(), 0.0, epsilon = 1e-6);
}

#[test]
fn test_noiseless_round_trip() {
    let amp = Parameter::builder().name("amp").value(1.0).build().unwrap();
    let mu = Parameter::builder().name("mu").value(0.5).build().unwrap();
    let sig = Parameter::builder().name("sig").value(1.0).min(0.1).build().unwrap();
    let x = Variable::named("x");
    let model =
        Model::new(&amp * (-((&x - &mu).pow(2.0)) / (2.0 * sig.pow(2.0))).exp()).unwrap();

    let xs = Array1::linspace(-5.0, 5.0, 41);
    let ys = xs.mapv(|x| 2.5 * (-(x - 1.2f64).powi(2) / (2.0 * 0.8f64.powi(2))).exp());
    let results = Fit::xy(&model, xs, ys).unwrap().execute().unwrap();

    assert!(results.success(), "{}", results.message());
    assert_relative_eq!(results.get_value(&amp).unwrap(), 2.5, epsilon = 1e-6);
    assert_relative_eq!(results.get_value(&mu).unwrap(), 1.2, epsilon = 1e-6);
    assert_relative_eq!(results.get_value(&sig).unwrap(), 0.8, epsilon = 1e-6);
    assert_relative_eq!(results.r_squared().unwrap().unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_noisy_fit_has_sensible_errors() {
    let a = Parameter::named("a");
    let b = Parameter::named("b");
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &b).unwrap();

    let (xs, ys) = noisy_samples(|x| 3.0 * x - 2.0, 0.0, 10.0, 50, 0.5, 7);
    let results = Fit::xy(&model, xs, ys).unwrap().execute().unwrap();

    let (va, sa) = (
        results.get_value(&a).unwrap(),
        results.get_stdev(&a).unwrap().unwrap(),
    );
    assert!(sa > 0.0 && sa < 0.1);
    assert!((va - 3.0).abs() < 5.0 * sa);
    assert!(results.r_squared().unwrap().unwrap() > 0.99);
    assert_eq!(results.degrees_of_freedom().unwrap(), 48);

    let reduced = results.reduced_chi_squared().unwrap().unwrap();
    assert!(reduced > 0.1 && reduced < 0.5, "reduced chi2 {}", reduced);
}

#[test]
fn test_bounds_respected() {
    let a = Parameter::builder().name("a").value(1.0).max(1.5).build().unwrap();
    let b = Parameter::named("b");
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &b).unwrap();

    let results = Fit::xy(&model, vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0])
        .unwrap()
        .execute()
        .unwrap();
    let va = results.get_value(&a).unwrap();
    assert!(va <= 1.5 + 1e-12);
    assert_relative_eq!(va, 1.5, epsilon = 1e-4);
}

#[test]
fn test_start_on_lower_bound_is_not_stuck() {
    let a = Parameter::builder().name("a").value(0.0).min(0.0).build().unwrap();
    let x = Variable::named("x");
    let model = Model::new(&a * &x).unwrap();

    let xs: Vec<f64> = (0..10).map(f64::from).collect();
    let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x).collect();
    let results = Fit::xy(&model, xs, ys).unwrap().execute().unwrap();

    assert!(results.success(), "{}", results.message());
    assert_relative_eq!(results.get_value(&a).unwrap(), 2.0, epsilon = 1e-6);
}

#[test]
fn test_infinite_derivative_at_start_is_not_success() {
    let a = Parameter::builder().name("a").value(0.0).build().unwrap();
    let x = Variable::named("x");
    let model = Model::new(a.sqrt() * &x).unwrap();

    let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x).collect();
    let results = Fit::xy(&model, xs, ys).unwrap().execute().unwrap();

    assert!(!results.success(), "{}", results.message());
}

#[test]
fn test_fixed_parameter_never_optimized() {
    let a = Parameter::named("a");
    let c = Parameter::builder().name("c").value(5.0).fixed(true).build().unwrap();
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &c).unwrap();

    let fit = Fit::xy(&model, vec![0.0, 1.0, 2.0], vec![4.0, 6.0, 8.0]).unwrap();
    assert_eq!(fit.free_arguments().len(), 1);

    let results = fit.execute().unwrap();
    assert_eq!(results.get_value(&c).unwrap(), 5.0);
    assert_eq!(results.get_stdev(&c).unwrap(), None);
    assert_eq!(results.covariance_matrix().unwrap().shape(), &[1, 1]);
}

#[test]
fn test_multiple_outputs_share_parameters() {
    let k = Parameter::builder().name("k").value(0.3).build().unwrap();
    let t = Variable::named("t");
    let model = Model::with_outputs([("u", (-(&k * &t)).exp()), ("v", 1.0 - (-(&k * &t)).exp())])
        .unwrap();

    let ts = Array1::linspace(0.0, 4.0, 9);
    let data = Bindings::new()
        .bind("t", ts.clone())
        .bind("u", ts.mapv(|t| (-0.9 * t).exp()))
        .bind("v", ts.mapv(|t| 1.0 - (-0.9 * t).exp()));
    let results = LeastSquares::new(&model, data).unwrap().execute().unwrap();

    assert_relative_eq!(results.get_value(&k).unwrap(), 0.9, epsilon = 1e-6);
    assert_eq!(results.degrees_of_freedom().unwrap(), 17);
}

#[test]
fn test_unknown_option_rejected() {
    let a = Parameter::named("a");
    let x = Variable::named("x");
    let model = Model::new(&a * &x).unwrap();
    let fit = Fit::xy(&model, vec![1.0, 2.0], vec![2.0, 4.0]).unwrap();

    assert!(fit
        .execute_with(&options([("ftol", 1e-12.into())]))
        .unwrap()
        .success());
    assert!(matches!(
        fit.execute_with(&options([("method", "SLSQP".into())])),
        Err(SymfitError::InvalidOption(_))
    ));
}
