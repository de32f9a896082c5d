//! Lookup, statistics and serialization of fit results.

use symfit_rs::{
    Fit, FitStrategy, Minimize, Model, Parameter, Statistics, StrategyKind, Symbolic,
    SymfitError, Variable,
};

fn linear_results() -> (Parameter, Parameter, Variable, symfit_rs::FitResults) {
    let a = Parameter::named("a");
    let b = Parameter::named("b");
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &b).unwrap();
    let results = Fit::xy(&model, vec![0.0, 1.0, 2.0, 3.0], vec![1.1, 2.9, 5.2, 6.8])
        .unwrap()
        .execute()
        .unwrap();
    (a, b, x, results)
}

#[test]
fn test_undeclared_argument_is_an_error() {
    let (_, _, x, results) = linear_results();
    let undeclared = Parameter::named("a");

    assert!(matches!(
        results.get_stdev(&undeclared),
        Err(SymfitError::NoSuchParameter(_))
    ));
    assert!(matches!(
        results.get_value(&x),
        Err(SymfitError::NoSuchParameter(_))
    ));
    assert!(matches!(
        results.stdev("intercept"),
        Err(SymfitError::NoSuchParameter(_))
    ));
}

#[test]
fn test_name_and_identity_lookups_agree() {
    let (a, b, _, results) = linear_results();
    assert_eq!(results.value("a").unwrap(), results.get_value(&a).unwrap());
    assert_eq!(results.stdev("b").unwrap(), results.get_stdev(&b).unwrap());
    assert_eq!(results.strategy(), StrategyKind::LeastSquares);
    assert!(results.iterations() > 0);
    assert!(results.func_evals() >= results.iterations());
}

#[test]
fn test_covariance_and_correlation() {
    let (a, b, _, results) = linear_results();
    let cov = results.covariance_matrix().unwrap();
    assert_eq!(cov.shape(), &[2, 2]);
    assert_eq!(results.covariance(&a, &b).unwrap(), Some(cov[[0, 1]]));

    let stdev = results.get_stdev(&a).unwrap().unwrap();
    assert!((stdev * stdev - cov[[0, 0]]).abs() < 1e-15);

    let corr = results.correlation_matrix().unwrap();
    assert!((corr[[0, 0]] - 1.0).abs() < 1e-12);
    // slope and intercept are anti-correlated for x >= 0
    assert!(corr[[0, 1]] < 0.0);
}

#[test]
fn test_statistics_consistent() {
    let (_, _, _, results) = linear_results();
    let chi2 = results.chi_squared().unwrap();
    assert_eq!(results.objective_value(), chi2);
    assert_eq!(
        results.reduced_chi_squared().unwrap(),
        Some(chi2 / results.degrees_of_freedom().unwrap() as f64)
    );
    assert!(matches!(results.statistics(), Statistics::Residuals { .. }));
    assert!(matches!(
        results.log_likelihood(),
        Err(SymfitError::UnsupportedStatistic { .. })
    ));
}

#[test]
fn test_minimize_has_no_statistics() {
    let x = Variable::named("x");
    let model = Model::new(x.pow(2.0)).unwrap();
    let results = Minimize::new(&model).unwrap().execute().unwrap();
    let err = results.r_squared().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Statistic 'r_squared' is not available for Minimize fits"
    );
}

#[test]
fn test_report_and_json() {
    let (_, _, _, results) = linear_results();
    let report = results.to_string();
    assert!(report.contains("Parameter Value"));
    assert!(report.contains("Regression Coefficient"));

    let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
    assert_eq!(json["strategy"], "LeastSquares");
    assert_eq!(json["estimates"][0]["name"], "a");
    assert_eq!(json["estimates"].as_array().unwrap().len(), 2);
    assert!(json["statistics"]["r_squared"].as_f64().unwrap() > 0.99);
}
