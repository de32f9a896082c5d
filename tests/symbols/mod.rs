//! Tests for parameters, variables and their identities.

use std::collections::HashSet;

use symfit_rs::{parameters, variables, Argument, Parameter, SymfitError, Variable};

#[test]
fn test_fixed_and_bounded_rejected() {
    let err = Parameter::builder()
        .name("a")
        .fixed(true)
        .min(0.0)
        .build()
        .unwrap_err();
    assert!(matches!(err, SymfitError::Configuration(_)));
}

#[test]
fn test_identical_arguments_are_distinct() {
    let first = Parameter::builder().name("a").value(2.0).build().unwrap();
    let second = Parameter::builder().name("a").value(2.0).build().unwrap();
    assert_ne!(first, second);

    let set: HashSet<Argument> = [
        Argument::from(&first),
        Argument::from(&second),
        Argument::from(first.clone()),
    ]
    .into_iter()
    .collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_auto_names_never_collide() {
    let names: HashSet<String> = (0..100)
        .map(|i| {
            if i % 2 == 0 {
                Parameter::new().name().to_string()
            } else {
                Variable::new().name().to_string()
            }
        })
        .collect();
    assert_eq!(names.len(), 100);
}

#[test]
fn test_ids_follow_creation_order() {
    let params = parameters("p, q, r");
    let vars = variables("u, v");
    assert!(params.windows(2).all(|w| w[0].id() < w[1].id()));
    assert!(params[2].id() < vars[0].id());
}

#[test]
fn test_symbols_shared_across_threads() {
    let a = Parameter::named("a");
    let ids: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| (a.id(), Parameter::new().id())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(ids.iter().all(|(shared, _)| *shared == a.id()));
    let fresh: HashSet<_> = ids.iter().map(|(_, fresh)| *fresh).collect();
    assert_eq!(fresh.len(), 4);
}
