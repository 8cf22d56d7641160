use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::testing::{key, keys, orchestrator, orchestrator_with, probe, Journal};
use modlife_config::{KernelConfig, ServiceSection};
use modlife_protocols::error::{LifecycleError, ServiceError};
use modlife_protocols::{ServiceDescriptor, ServiceState};

fn abc(journal: &Journal) -> Vec<ServiceDescriptor> {
    vec![
        probe("a", journal),
        probe("b", journal).depends_on("a"),
        probe("c", journal).depends_on("b"),
    ]
}

#[test]
fn test_restart_chain_with_callback() {
    let journal = Journal::default();
    let orchestrator = orchestrator(abc(&journal));
    orchestrator.start_up(&key("c")).unwrap();
    journal.clear();

    let callback_journal = journal.clone();
    orchestrator
        .restart_with(&key("a"), || {
            callback_journal.record("callback");
            Ok(())
        })
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec!["stop:c", "stop:b", "stop:a", "callback", "start:a", "start:b", "start:c"]
    );
    assert_eq!(journal.count("callback"), 1);
    assert_eq!(orchestrator.active_services(), keys(&["a", "b", "c"]));
}

#[test]
fn test_restart_records_topmost_dependents_only() {
    let journal = Journal::default();
    let orchestrator = orchestrator(vec![
        probe("f", &journal),
        probe("g", &journal).depends_on("f"),
        probe("h", &journal).depends_on("g").depends_on("f"),
        probe("j", &journal).depends_on("g"),
    ]);
    orchestrator.start_up(&key("h")).unwrap();
    orchestrator.start_up(&key("j")).unwrap();
    journal.clear();

    orchestrator.restart(&key("f")).unwrap();

    // h and j cover g and f; nothing is started twice.
    for name in ["f", "g", "h", "j"] {
        assert_eq!(journal.count(&format!("start:{name}")), 1, "{name}");
        assert!(orchestrator.is_active(&key(name)));
    }
}

#[test]
fn test_restart_after_dependent_was_stopped() {
    let journal = Journal::default();
    let orchestrator = orchestrator(vec![probe("f", &journal), probe("g", &journal).depends_on("f")]);
    orchestrator.start_up(&key("g")).unwrap();
    orchestrator.shut_down(&key("g"));

    orchestrator.restart(&key("f")).unwrap();

    assert!(orchestrator.is_active(&key("f")), "restarted although its dependent is gone");
    assert!(!orchestrator.is_active(&key("g")));
}

#[test]
fn test_restart_inactive_service_fails() {
    let journal = Journal::default();
    let orchestrator = orchestrator(abc(&journal));

    let err = orchestrator.restart(&key("a")).unwrap_err();
    assert!(matches!(err, LifecycleError::NotActive(k) if k == key("a")));
}

#[test]
fn test_failed_callback_allows_manual_recovery() {
    let journal = Journal::default();
    let orchestrator = orchestrator(vec![probe("f", &journal), probe("g", &journal).depends_on("f")]);
    orchestrator.start_up(&key("g")).unwrap();

    let err = orchestrator
        .restart_with(&key("f"), || Err(ServiceError::Custom("Test failing callback.".to_string())))
        .unwrap_err();

    let restart = match err {
        LifecycleError::Restart(restart) => restart,
        other => panic!("unexpected error: {other:?}"),
    };
    assert_eq!(restart.service, key("f"));
    assert_eq!(restart.to_restart, keys(&["g"]));
    assert_eq!(restart.active_before, keys(&["f", "g"]));
    assert!(matches!(
        restart.source,
        LifecycleError::CallbackFailed(ServiceError::Custom(ref message)) if message == "Test failing callback."
    ));
    assert!(orchestrator.active_services().is_empty());

    for dependent in &restart.to_restart {
        orchestrator.start_up(dependent).unwrap();
    }
    assert!(orchestrator.is_active(&key("f")));
    assert!(orchestrator.is_active(&key("g")));
}

#[test]
fn test_failed_restart_of_dependent() {
    let journal = Journal::default();
    let orchestrator = orchestrator(vec![
        probe("db", &journal),
        probe("web", &journal).depends_on("db"),
    ]);
    orchestrator.start_up(&key("web")).unwrap();

    // The callback swaps in a configuration under which web cannot resolve.
    let config = orchestrator.config().clone();
    let err = orchestrator
        .restart_with(&key("db"), move || {
            config.update(|config| {
                config.services.insert(
                    "web".to_string(),
                    ServiceSection {
                        dependencies: vec!["missing".to_string()],
                        extends: None,
                    },
                );
            });
            Ok(())
        })
        .unwrap_err();

    match err {
        LifecycleError::Restart(restart) => {
            assert!(matches!(restart.source, LifecycleError::Configuration { .. }));
            assert_eq!(restart.to_restart, keys(&["web"]));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!orchestrator.is_active(&key("web")));
}

#[test]
fn test_restart_configuration_root_first() {
    let journal = Journal::default();
    let mut config = KernelConfig::default();
    config.configuration_root = Some("cfg".to_string());
    config.services.insert(
        "web".to_string(),
        ServiceSection {
            dependencies: vec!["cfg".to_string()],
            extends: None,
        },
    );
    let orchestrator = orchestrator_with(
        config,
        vec![probe("cfg", &journal), probe("audit", &journal), probe("web", &journal)],
    );
    orchestrator.start_up(&key("web")).unwrap();
    journal.clear();

    // Reconfigure: web now also needs audit.
    let handle = orchestrator.config().clone();
    orchestrator
        .restart_with(&key("cfg"), move || {
            handle.update(|config| {
                if let Some(section) = config.services.get_mut("web") {
                    section.dependencies.push("audit".to_string());
                }
            });
            Ok(())
        })
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec!["stop:web", "stop:cfg", "start:cfg", "start:audit", "start:web"]
    );
    assert_eq!(orchestrator.state(&key("audit")), ServiceState::Active);
}

#[test]
fn test_restart_is_not_recorded_in_open_context() {
    let journal = Journal::default();
    let orchestrator = orchestrator(abc(&journal));
    orchestrator.start_up(&key("c")).unwrap();

    {
        let mut context = orchestrator.begin_context();
        orchestrator.restart(&key("a")).unwrap();
        context.close().unwrap();
    }

    assert_eq!(orchestrator.active_services(), keys(&["a", "b", "c"]));
    assert_eq!(orchestrator.context_depth(), 0);
}

#[test]
fn test_failed_restart_start() {
    let journal = Journal::default();
    let broken = Arc::new(AtomicBool::new(false));
    let factory_broken = broken.clone();
    let inner = probe("b", &journal).depends_on("a");
    let orchestrator = orchestrator(vec![
        probe("a", &journal),
        ServiceDescriptor::from_fn("b", move |ctx| {
            if factory_broken.load(Ordering::SeqCst) {
                return Err(ServiceError::InitializationFailed("b is broken".to_string()));
            }
            inner.factory().create(ctx)
        })
        .depends_on("a"),
    ]);
    orchestrator.start_up(&key("b")).unwrap();

    let err = orchestrator
        .restart_with(&key("a"), || {
            broken.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap_err();

    match err {
        LifecycleError::Restart(restart) => {
            assert_eq!(restart.source.service(), Some(&key("b")));
            assert!(matches!(restart.source, LifecycleError::StartupFailed { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(orchestrator.is_active(&key("a")));
    assert!(!orchestrator.is_active(&key("b")));
}
