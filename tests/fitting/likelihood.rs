//! Maximum likelihood fits.

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use symfit_rs::{
    Bindings, Constraint, FitStrategy, Likelihood, Model, Parameter, Symbolic, SymfitError,
    Variable,
};

fn exponential_density() -> (Parameter, Variable, Model) {
    let beta = Parameter::builder().name("beta").value(1.0).min(1e-3).build().unwrap();
    let x = Variable::named("x");
    let model = Model::new((-(&x / &beta)).exp() / &beta).unwrap();
    (beta, x, model)
}

#[test]
fn test_recovers_sample_mean() {
    let (beta, _, model) = exponential_density();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let dist = Exp::new(1.0 / 2.5).unwrap();
    let samples: Vec<f64> = (0..200).map(|_| dist.sample(&mut rng)).collect();
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;

    let results = Likelihood::new(&model, Bindings::new().bind("x", samples.clone()))
        .unwrap()
        .execute()
        .unwrap();

    assert!(results.success(), "{}", results.message());
    assert_relative_eq!(results.get_value(&beta).unwrap(), mean, max_relative = 1e-5);
    // inverse Fisher information: beta^2 / n
    let expected_stdev = mean / (samples.len() as f64).sqrt();
    assert_relative_eq!(
        results.get_stdev(&beta).unwrap().unwrap(),
        expected_stdev,
        max_relative = 1e-3
    );

    let log_likelihood = -(samples.len() as f64) * mean.ln() - samples.len() as f64;
    assert_relative_eq!(results.log_likelihood().unwrap(), log_likelihood, max_relative = 1e-8);
}

#[test]
fn test_constrained_likelihood() {
    let (beta, _, model) = exponential_density();
    let samples = vec![0.5, 1.0, 1.5, 2.0, 3.0];

    let results = Likelihood::new(&model, Bindings::new().bind("x", samples))
        .unwrap()
        .with_constraints(&[Constraint::le(&beta, 1.2)])
        .unwrap()
        .execute()
        .unwrap();

    assert!(results.success(), "{}", results.message());
    assert_relative_eq!(results.get_value(&beta).unwrap(), 1.2, epsilon = 1e-6);
}

#[test]
fn test_no_goodness_of_fit_statistics() {
    let (_, _, model) = exponential_density();
    let results = Likelihood::new(&model, Bindings::new().bind("x", vec![1.0, 2.0]))
        .unwrap()
        .execute()
        .unwrap();
    for err in [
        results.r_squared().map(|_| ()),
        results.chi_squared().map(|_| ()),
    ] {
        assert!(matches!(err, Err(SymfitError::UnsupportedStatistic { .. })));
    }
}

#[test]
fn test_dependent_data_rejected() {
    let (_, _, model) = exponential_density();
    assert!(Likelihood::new(
        &model,
        Bindings::new().bind("x", vec![1.0]).bind("y", vec![1.0])
    )
    .is_err());
}
