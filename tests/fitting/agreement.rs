//! Least squares through Levenberg-Marquardt and through the general
//! minimizer must agree on unconstrained problems.

use approx::assert_relative_eq;
use symfit_rs::{Fit, FitStrategy, MinimizeParameters, Model, Parameter, Symbolic, Variable};

use crate::test_helpers::{noisy_samples, rel_diff};

#[test]
fn test_linear_values_and_errors_agree() {
    let a = Parameter::named("a");
    let b = Parameter::named("b");
    let x = Variable::named("x");
    let model = Model::new(&a * &x + &b).unwrap();
    let (xs, ys) = noisy_samples(|x| 0.7 * x + 3.0, 0.0, 20.0, 40, 1.0, 11);

    let lm = Fit::xy(&model, xs.clone(), ys.clone()).unwrap().execute().unwrap();
    let general = MinimizeParameters::xy(&model, xs, ys).unwrap().execute().unwrap();
    assert!(lm.success() && general.success(), "{}", general.message());

    for p in [&a, &b] {
        assert_relative_eq!(
            lm.get_value(p).unwrap(),
            general.get_value(p).unwrap(),
            epsilon = 1e-6
        );
        let (s1, s2) = (
            lm.get_stdev(p).unwrap().unwrap(),
            general.get_stdev(p).unwrap().unwrap(),
        );
        assert!(rel_diff(s1, s2) < 1e-4, "{} vs {}", s1, s2);
    }
    assert_relative_eq!(
        lm.r_squared().unwrap().unwrap(),
        general.r_squared().unwrap().unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn test_nonlinear_values_agree() {
    let a = Parameter::builder().name("a").value(1.0).build().unwrap();
    let k = Parameter::builder().name("k").value(0.5).min(0.0).build().unwrap();
    let t = Variable::named("t");
    let model = Model::new(&a * (-(&k * &t)).exp()).unwrap();
    let (ts, ys) = noisy_samples(|t| 4.0 * (-1.5 * t).exp(), 0.0, 3.0, 30, 0.02, 3);

    let lm = Fit::xy(&model, ts.clone(), ys.clone()).unwrap().execute().unwrap();
    let general = MinimizeParameters::xy(&model, ts, ys).unwrap().execute().unwrap();

    assert_relative_eq!(lm.get_value(&a).unwrap(), general.get_value(&a).unwrap(), epsilon = 1e-5);
    assert_relative_eq!(lm.get_value(&k).unwrap(), general.get_value(&k).unwrap(), epsilon = 1e-5);
    // full Hessian against Gauss-Newton: close but not identical
    let (s1, s2) = (
        lm.get_stdev(&k).unwrap().unwrap(),
        general.get_stdev(&k).unwrap().unwrap(),
    );
    assert!(rel_diff(s1, s2) < 0.1, "{} vs {}", s1, s2);
}
